//! Variables available to map compilation profiles and game launches.
//!
//! Profile tasks refer to these through interpolation, e.g.
//! `${qbsp} ${WORK_DIR_PATH}/${MAP_FULL_NAME}`.

use std::path::{Path, PathBuf};

use crate::el::{interpolate, with_evaluation_context, Value};
use crate::var::{VariableStore, VariableTable};

pub mod names {
    pub const WORK_DIR_PATH: &str = "WORK_DIR_PATH";
    pub const MAP_DIR_PATH: &str = "MAP_DIR_PATH";
    pub const MAP_BASE_NAME: &str = "MAP_BASE_NAME";
    pub const MAP_FULL_NAME: &str = "MAP_FULL_NAME";
    pub const CPU_COUNT: &str = "CPU_COUNT";
    pub const GAME_DIR_PATH: &str = "GAME_DIR_PATH";
    pub const MODS: &str = "MODS";
    pub const APP_DIR_PATH: &str = "APP_DIR_PATH";
}

/// A compilation tool configured for the game, e.g. `qbsp`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompilationTool {
    pub name: String,
    pub path: PathBuf,
}

impl CompilationTool {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        CompilationTool {
            name: name.into(),
            path: path.into(),
        }
    }
}

/// The map being compiled and the game it belongs to.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompilationEnvironment {
    pub map_path: PathBuf,
    pub game_path: PathBuf,
    pub default_mod: String,
    pub mods: Vec<String>,
    pub tools: Vec<CompilationTool>,
    pub app_dir: PathBuf,
}

fn path_value(path: &Path) -> Value {
    Value::String(path.to_string_lossy().into_owned())
}

fn file_part(part: Option<&std::ffi::OsStr>) -> Value {
    Value::String(part.map(|s| s.to_string_lossy().into_owned()).unwrap_or_default())
}

/// Variables shared by compilation and game launches.
pub fn common_variables(env: &CompilationEnvironment) -> VariableTable {
    let mut vars = VariableTable::new();
    vars.set(names::MAP_BASE_NAME, file_part(env.map_path.file_stem()));
    vars.set(names::GAME_DIR_PATH, path_value(&env.game_path));
    let mods: Value = std::iter::once(&env.default_mod)
        .chain(&env.mods)
        .map(|m| Value::from(m.as_str()))
        .collect();
    vars.set(names::MODS, mods);
    for tool in &env.tools {
        vars.set(tool.name.as_str(), path_value(&tool.path));
    }
    vars
}

pub fn common_compilation_variables(env: &CompilationEnvironment) -> VariableTable {
    let mut vars = common_variables(env);
    vars.set(names::MAP_FULL_NAME, file_part(env.map_path.file_name()));
    vars.set(
        names::MAP_DIR_PATH,
        env.map_path.parent().map(path_value).unwrap_or_else(|| Value::from("")),
    );
    vars.set(names::APP_DIR_PATH, path_value(&env.app_dir));
    vars
}

/// Variables usable in a profile's work directory setting.
pub fn compilation_work_dir_variables(env: &CompilationEnvironment) -> VariableTable {
    common_compilation_variables(env)
}

/// Variables usable in compilation tasks.
pub fn compilation_variables(env: &CompilationEnvironment, work_dir: &str) -> VariableTable {
    let mut vars = common_compilation_variables(env);
    let cpu_count = std::thread::available_parallelism().map_or(1, |n| n.get());
    vars.set(names::CPU_COUNT, cpu_count);
    vars.set(names::WORK_DIR_PATH, work_dir);
    vars
}

/// Variables usable in game engine launch parameters.
pub fn launch_game_engine_variables(env: &CompilationEnvironment) -> VariableTable {
    common_variables(env)
}

/// State of one compilation run.
///
/// The context owns a snapshot of the variables it was created with.
#[derive(Debug, Clone)]
pub struct CompilationContext {
    variables: Box<dyn VariableStore>,
    test: bool,
}

impl CompilationContext {
    pub fn new(variables: &dyn VariableStore, test: bool) -> Self {
        CompilationContext {
            variables: variables.clone_store(),
            test,
        }
    }

    /// Whether this is a dry run that only reports what it would do.
    pub fn is_test(&self) -> bool {
        self.test
    }

    pub fn variables(&self) -> &dyn VariableStore {
        self.variables.as_ref()
    }

    pub fn interpolate(&self, input: &str) -> crate::el::Result<String> {
        interpolate(self.variables.as_ref(), input)
    }

    /// The variable converted to a String; missing variables are empty.
    pub fn variable_value(&self, name: &str) -> crate::el::Result<String> {
        with_evaluation_context(self.variables.as_ref(), |ctx| {
            Ok(ctx.variable_value(name).string_value()?)
        })
    }
}
