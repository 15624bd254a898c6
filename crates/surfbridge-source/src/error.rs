use surfbridge_core::{BridgeError, TextureName};

#[derive(thiserror::Error, Debug)]
pub enum SourceError {
    #[error("failed to bind producer to {texture}: {reason}")]
    Bind { texture: TextureName, reason: String },

    #[error("producer error: {0}")]
    Producer(String),

    #[error("invalid config: {0}")]
    InvalidConfig(String),
}

impl From<SourceError> for BridgeError {
    fn from(e: SourceError) -> Self {
        BridgeError::Source(Box::new(e))
    }
}
