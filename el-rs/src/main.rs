use std::process::ExitCode;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use el::cli::{self, CliArgs};
use el::config;
use el::el::{eval_str, interpolate, ParserMode};
use el::var::{LayeredVariableStore, VariableStore, VariableTable};

/// Log to stderr, filtered by `EL_LOG` (default `warn`, `debug` with `-d`).
fn init_tracing(debug: bool) {
    let default = if debug { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_env("EL_LOG").unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(filter)
        .init();
}

/// Variables file first, then `-D` definitions layered in front of it.
fn build_store(args: &CliArgs) -> Result<LayeredVariableStore, String> {
    let mut file_vars = VariableTable::new();
    if let Some(path) = &args.vars_file {
        let (vars, errors) = config::load_file(path).map_err(|e| format!("{}: {e}", path.display()))?;
        for e in errors {
            eprintln!("el: {}: {e}", path.display());
        }
        file_vars = vars;
    }

    let mut defines = VariableTable::new();
    for (name, src) in &args.defines {
        let store = LayeredVariableStore::new()
            .with_layer(defines.clone())
            .with_layer(file_vars.clone());
        let value = eval_str(src, ParserMode::Strict, &store).map_err(|e| format!("-D{name}: {e}"))?;
        defines.set(name.as_str(), value);
    }

    Ok(LayeredVariableStore::new().with_layer(defines).with_layer(file_vars))
}

fn process(args: &CliArgs, store: &dyn VariableStore, input: &str) -> el::el::Result<String> {
    if args.interpolate {
        return interpolate(store, input);
    }
    let mode = if args.lenient { ParserMode::Lenient } else { ParserMode::Strict };
    Ok(eval_str(input, mode, store)?.to_string())
}

fn main() -> ExitCode {
    let args = match cli::parse_args() {
        Ok(a) => a,
        Err(e) => {
            eprintln!("el: {e}");
            eprintln!("Usage: el [-dli] [-f<file>] [-D<name>=<expr>]... <input>...");
            return ExitCode::FAILURE;
        }
    };

    init_tracing(args.debug);

    let store = match build_store(&args) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("el: {e}");
            return ExitCode::FAILURE;
        }
    };

    let mut failed = false;
    for input in &args.inputs {
        match process(&args, &store, input) {
            Ok(out) => println!("{out}"),
            Err(e) => {
                eprintln!("el: {e}");
                failed = true;
            }
        }
    }

    if failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
