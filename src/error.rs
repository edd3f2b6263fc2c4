use thiserror::Error;

#[derive(Error, Debug)]
pub enum TraceError {
    #[error("failed to load image: {0}")]
    ImageLoad(String),

    #[error("failed to write output: {0}")]
    OutputWrite(String),
}
