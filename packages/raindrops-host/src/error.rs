use std::path::PathBuf;

/// Errors raised while loading, instantiating or calling a raindrops module.
///
/// Wasmtime reports failures as `anyhow` errors, which carry no concrete
/// type; those are flattened into their message chain.
#[derive(Debug, thiserror::Error)]
pub enum HostError {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to create engine: {0}")]
    Engine(String),

    #[error("failed to compile module: {0}")]
    Compile(String),

    #[error("failed to instantiate module: {0}")]
    Instantiate(String),

    #[error("module has no export named '{0}'")]
    MissingExport(String),

    #[error("module neither imports nor exports a linear memory")]
    MissingMemory,

    #[error("export '{export}' has unsupported signature {found}; expected (i32) -> (i32, i32) or (i32) -> i64")]
    UnsupportedSignature { export: String, found: String },

    #[error("failed to refuel instance: {0}")]
    Fuel(String),

    #[error("input must be a positive integer, got {0}")]
    InvalidInput(u32),

    #[error("module trapped: {0}")]
    Trap(String),

    #[error("module rejected input {0}")]
    Rejected(u32),

    #[error("span {offset}+{len} is outside linear memory of {memory_size} bytes")]
    OutOfBounds {
        offset: u32,
        len: u32,
        memory_size: usize,
    },

    #[error("output is not valid UTF-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),
}

/// Render a wasmtime error with its full context chain.
pub(crate) fn chain(err: wasmtime::Error) -> String {
    format!("{err:#}")
}
