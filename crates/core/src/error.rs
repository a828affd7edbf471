//! Error type shared by the corpus pipeline and the context encoder.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while preparing or reading corpora.
///
/// Decoding model output never produces one of these; the decoders in
/// [`crate::values`] degrade instead of failing.
#[derive(Debug, Error)]
pub enum SerializerError {
    #[error("failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse dialogues in {path:?}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error("unknown domain setting '{0}' (expected all, seen, unseen or custom)")]
    UnknownDomainSetting(String),

    #[error("unknown step '{0}' (expected train, dev or test)")]
    UnknownStep(String),

    #[error("context has no current user utterance")]
    MissingUserUtterance,

    #[error("no dialogue files found under {0:?}")]
    NoDialogueFiles(PathBuf),
}

pub type Result<T> = std::result::Result<T, SerializerError>;
