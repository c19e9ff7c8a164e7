//! Command-line argument parsing.
//!
//! Usage:
//!   el [-dli] [-f<file>] [-D<name>=<expr>]... <input>...

use std::path::PathBuf;

// ── Public types ──────────────────────────────────────────────────────────────

/// Parsed command-line arguments.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct CliArgs {
    /// Variables file (`-f<file>`).
    pub vars_file: Option<PathBuf>,
    /// Variable definitions (`-D<name>=<expr>`), in command-line order.
    pub defines: Vec<(String, String)>,
    /// Treat inputs as text to interpolate (`-i`).
    pub interpolate: bool,
    /// Parse expressions leniently (`-l`).
    pub lenient: bool,
    /// Debug logging (`-d`).
    pub debug: bool,
    /// Expressions, or texts with `-i`.
    pub inputs: Vec<String>,
}

// ── Parsing ───────────────────────────────────────────────────────────────────

/// Parse `std::env::args()` and return [`CliArgs`] or an error message.
pub fn parse_args() -> Result<CliArgs, String> {
    let raw: Vec<String> = std::env::args().collect();
    parse_argv(raw.get(1..).unwrap_or_default())
}

fn parse_define(def: &str) -> Result<(String, String), String> {
    match def.split_once('=') {
        Some((name, expr)) if !name.trim().is_empty() => {
            Ok((name.trim().to_owned(), expr.to_owned()))
        }
        _ => Err(format!("invalid definition '{def}', expected <name>=<expr>")),
    }
}

/// Parse a slice of argument strings (exposed for testing).
pub fn parse_argv(argv: &[String]) -> Result<CliArgs, String> {
    let mut args = CliArgs::default();
    let mut i = 0;

    while i < argv.len() {
        let arg = argv[i].as_str();

        // `--` ends flag processing.
        if arg == "--" {
            args.inputs.extend(argv[i + 1..].iter().cloned());
            break;
        }

        // Non-flag argument; a leading '-' followed by a digit is a negative number.
        let negative_number = arg
            .strip_prefix('-')
            .is_some_and(|rest| rest.starts_with(|c: char| c.is_ascii_digit() || c == '.'));
        if !arg.starts_with('-') || arg == "-" || negative_number {
            args.inputs.push(arg.to_owned());
            i += 1;
            continue;
        }

        // Flag argument: iterate over characters after the leading `-`.
        let chars: Vec<char> = arg[1..].chars().collect();
        let mut j = 0;
        while j < chars.len() {
            match chars[j] {
                'd' => args.debug = true,
                'l' => args.lenient = true,
                'i' => args.interpolate = true,

                // -f<file> / -D<name>=<expr>, attached or separate
                flag @ ('f' | 'D') => {
                    let value = if j + 1 < chars.len() {
                        let s: String = chars[j + 1..].iter().collect();
                        j = chars.len();
                        s
                    } else if i + 1 < argv.len() {
                        i += 1;
                        argv[i].clone()
                    } else if flag == 'f' {
                        return Err("-f requires a file argument".to_owned());
                    } else {
                        return Err("-D requires a <name>=<expr> argument".to_owned());
                    };
                    if flag == 'f' {
                        args.vars_file = Some(PathBuf::from(value));
                    } else {
                        args.defines.push(parse_define(&value)?);
                    }
                }

                c => return Err(format!("unknown option: -{c}")),
            }
            j += 1;
        }
        i += 1;
    }

    if args.inputs.is_empty() {
        return Err("no input given".to_owned());
    }
    Ok(args)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
