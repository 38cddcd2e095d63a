use thiserror::Error;

pub type Result<T> = std::result::Result<T, VetError>;

#[derive(Error, Debug)]
pub enum VetError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl VetError {
    pub fn exit_code(&self) -> i32 {
        2
    }
}
