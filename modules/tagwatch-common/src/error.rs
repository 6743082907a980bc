use thiserror::Error;

#[derive(Error, Debug)]
pub enum TagwatchError {
    #[error("Store error: {0}")]
    Store(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}
