use crate::markup::ParseError;
use crate::node::ClassifyError;
use thiserror::Error;

/// A comprehensive error type for the whole banner rendering pipeline.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("parsing failed: {0}")]
    Parse(#[from] ParseError),

    #[error("classification failed: {0}")]
    Classify(#[from] ClassifyError),

    /// A `create` call arrived while another run was in flight. The
    /// in-flight run is left untouched.
    #[error("a banner is already being created")]
    AlreadyInProgress,

    #[error("pipeline stage failed: {0}")]
    StageFailed(String),
}
