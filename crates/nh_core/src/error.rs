use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Malformed batch input: missing embeddings, mixed dimensions, empty batch.
    #[error("Input error: {0}")]
    Input(String),

    /// A single embedding, classification or store call failed for one item.
    #[error("Collaborator error: {0}")]
    Collaborator(String),

    /// A single document write failed.
    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Inference error: {0}")]
    Inference(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("External error: {0}")]
    External(#[from] anyhow::Error),
}

impl Error {
    /// Whether the error should abort the whole batch rather than a single item.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Error::Collaborator(_) | Error::Persistence(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
