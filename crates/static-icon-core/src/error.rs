use thiserror::Error;

/// Why the icon store could not produce an icon pair.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum IconError {
    #[error("custom icon source selected but no path is configured")]
    EmptyPath,
    #[error("could not locate the system icon file")]
    SystemPathUnavailable,
    #[error("no icon could be loaded from {0}")]
    LoadFailed(String),
}

/// Why a hook set or entry point could not be installed.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum HookError {
    #[error("module {0} is not loaded")]
    ModuleNotFound(String),
    #[error("symbol resolution failed: {0}")]
    Resolver(String),
    #[error("unresolved symbol: {0}")]
    UnresolvedSymbol(String),
    #[error("export {module}!{name} not found")]
    ExportNotFound { module: String, name: String },
    #[error("patching {target:#x} failed: {reason}")]
    Patch { target: usize, reason: String },
    #[error("entry point {0} is already intercepted")]
    AlreadyInstalled(String),
}

pub type HookResult<T> = Result<T, HookError>;

/// Why the lifecycle controller refused to become active.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum InitError {
    #[error("controller was already initialized")]
    AlreadyInitialized,
    #[error("taskbar hooks unavailable: {0}")]
    TaskbarHooks(HookError),
    #[error("{} entry point interception(s) failed: {}", .0.len(), describe(.0))]
    EntryPoints(Vec<(String, HookError)>),
}

fn describe(failures: &[(String, HookError)]) -> String {
    failures
        .iter()
        .map(|(id, e)| format!("{id}: {e}"))
        .collect::<Vec<_>>()
        .join("; ")
}
