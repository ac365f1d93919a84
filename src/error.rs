pub type FlipResult<T> = Result<T, FlipError>;

#[derive(thiserror::Error, Debug)]
pub enum FlipError {
    #[error("config error: {0}")]
    Config(String),

    #[error("geometry error: {0}")]
    Geometry(String),

    #[error("host error: {0}")]
    Host(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl FlipError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn geometry(msg: impl Into<String>) -> Self {
        Self::Geometry(msg.into())
    }

    pub fn host(msg: impl Into<String>) -> Self {
        Self::Host(msg.into())
    }
}
