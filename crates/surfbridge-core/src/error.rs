use std::fmt;
use std::path::PathBuf;

/// Bridge-level errors used across surfbridge crates.
///
/// Contract rule: this type lives in `surfbridge-core` and is re-exported by the runtime.
#[derive(Debug)]
pub enum BridgeError {
    // ---- Config ----
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    Json {
        path: Option<PathBuf>,
        source: serde_json::Error,
    },

    InvalidConfig {
        msg: String,
    },

    // ---- GPU (render thread) ----
    /// No GPU context is current on the calling thread.
    NoContext,
    VertexCompile(String),
    FragmentCompile(String),
    Link(String),
    GlCreate(String),

    // ---- Producer side ----
    /// The platform producer could not be bound or operated.
    Source(Box<dyn std::error::Error + Send + Sync + 'static>),

    // ---- Fallback ----
    Other(String),
}

impl BridgeError {
    pub fn other<T: Into<String>>(s: T) -> Self {
        BridgeError::Other(s.into())
    }

    pub fn invalid_config<T: Into<String>>(msg: T) -> Self {
        BridgeError::InvalidConfig { msg: msg.into() }
    }
}

impl fmt::Display for BridgeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BridgeError::Io { path, source } => {
                write!(f, "io error at {}: {}", path.display(), source)
            }
            BridgeError::Json { path: Some(path), source } => {
                write!(f, "json parse error at {}: {}", path.display(), source)
            }
            BridgeError::Json { path: None, source } => write!(f, "json parse error: {source}"),
            BridgeError::InvalidConfig { msg } => write!(f, "invalid config: {msg}"),

            BridgeError::NoContext => write!(f, "no GPU context is current on this thread"),
            BridgeError::VertexCompile(msg) => write!(f, "vertex shader compile error: {msg}"),
            BridgeError::FragmentCompile(msg) => write!(f, "fragment shader compile error: {msg}"),
            BridgeError::Link(msg) => write!(f, "program link error: {msg}"),
            BridgeError::GlCreate(msg) => write!(f, "backend object creation failed: {msg}"),

            BridgeError::Source(e) => write!(f, "frame source error: {e}"),

            BridgeError::Other(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for BridgeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            BridgeError::Io { source, .. } => Some(source),
            BridgeError::Json { source, .. } => Some(source),
            BridgeError::Source(e) => Some(e.as_ref()),
            _ => None,
        }
    }
}
