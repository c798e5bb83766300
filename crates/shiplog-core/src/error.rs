pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Error reading backup: {message}")]
    InvalidJson { message: String },

    #[error("Invalid or corrupted backup: missing `{field}` array")]
    MissingCollection { field: &'static str },

    #[error("Invalid node at index {index}: {message}")]
    InvalidNode { index: usize, message: String },

    #[error("Invalid edge at index {index}: {message}")]
    InvalidEdge { index: usize, message: String },

    #[error("Failed to encode backup: {message}")]
    Encode { message: String },

    #[error("Invalid editor config: {message}")]
    InvalidConfig { message: String },
}
