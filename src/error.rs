use thiserror::Error;

/// Failure of a single `select_next` call.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SelectionError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

/// The stage at which a pipeline run stopped.
///
/// Collaborators report `anyhow` errors internally; the orchestrator wraps
/// them here so callers can match on the failing stage.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("setup failed: {0:#}")]
    Setup(#[source] anyhow::Error),

    #[error("topic catalog unusable: {0:#}")]
    Catalog(#[source] anyhow::Error),

    #[error("selection failed: {0}")]
    Selection(#[from] SelectionError),

    #[error("script generation failed: {0:#}")]
    Script(#[source] anyhow::Error),

    #[error("speech synthesis failed: {0:#}")]
    Speech(#[source] anyhow::Error),

    #[error("caption generation failed: {0:#}")]
    Captions(#[source] anyhow::Error),

    #[error("video build failed: {0:#}")]
    Video(#[source] anyhow::Error),

    #[error("publishing failed: {0:#}")]
    Publish(#[source] anyhow::Error),
}

impl PipelineError {
    /// Short stage label used in log banners.
    pub fn stage(&self) -> &'static str {
        match self {
            PipelineError::Setup(_) => "setup",
            PipelineError::Catalog(_) => "catalog",
            PipelineError::Selection(_) => "selection",
            PipelineError::Script(_) => "script",
            PipelineError::Speech(_) => "speech",
            PipelineError::Captions(_) => "captions",
            PipelineError::Video(_) => "video",
            PipelineError::Publish(_) => "publish",
        }
    }
}

pub type PipelineResult<T> = std::result::Result<T, PipelineError>;
