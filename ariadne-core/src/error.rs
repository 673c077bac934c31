/// Top-level Ariadne error type.
#[derive(thiserror::Error, Debug)]
pub enum AriadneError {
    #[error("Graph engine error: {0}")]
    Graph(#[from] ariadne_graphs::GraphError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Unsupported language for {0}")]
    UnsupportedLanguage(String),

    #[error("File {path} exceeds the parser limit ({size} bytes) and has no safe split boundary")]
    OversizeFile { path: String, size: usize },

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Internal invariant violation: {0}")]
    Invariant(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("Config file not found: {0}")]
    NotFound(String),

    #[error("Invalid config: {0}")]
    Invalid(String),

    #[error("Parse error: {0}")]
    Parse(String),
}

pub type Result<T> = std::result::Result<T, AriadneError>;
