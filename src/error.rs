use thiserror::Error;

/// Everything that can go wrong before rendering starts. Once a frame is in
/// flight the only outcomes are "completed" and "stopped": the tracing inner
/// loops never fail, they only miss.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid camera definition: {0}")]
    CameraDefinition(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("unknown scene index {0}")]
    UnknownScene(i32),

    #[error("scene contains no geometry")]
    EmptyScene,

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, Error>;
