//! Error types for the PPTX codec.

/// Fatal, document-level failures.
///
/// Per-correction problems (a missing page part, an `original` that no
/// longer matches) are not errors: they are recorded as skips in the
/// [`PatchReport`](crate::patch::PatchReport) and processing continues.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// The buffer is not a readable archive, a slide part is not valid
    /// XML, or no slide parts were found at all.
    #[error("container corrupt: {0}")]
    ContainerCorrupt(String),

    /// The output archive could not be rebuilt. Nothing is returned;
    /// a half-written archive is unusable.
    #[error("serialization failure: {0}")]
    SerializationFailure(String),
}

pub type Result<T> = std::result::Result<T, CodecError>;
