use std::{error::Error as StdError, time::Duration};

pub type Result<T> = std::result::Result<T, Error>;

/// Typed failures from a fetch attempt.
///
/// The request pipeline branches on these to pick the user-visible status
/// text, so every distinguishable outcome gets its own variant instead of
/// a flat error string.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The extraction tool does not recognize the source URL.
    #[error("unsupported source: {url}")]
    UnsupportedSource { url: String },

    /// The tool ran to completion but produced no file.
    #[error("no media produced for {url}")]
    NotFound { url: String },

    /// Network-level failure while probing or downloading.
    #[error("network failure: {message}")]
    Network { message: String },

    /// Probed duration exceeds the configured limit.
    #[error("duration {}s exceeds limit of {}s", actual.as_secs(), limit.as_secs())]
    DurationExceeded { actual: Duration, limit: Duration },

    /// The media exceeds the configured size limit.
    #[error("media exceeds size limit of {limit} bytes")]
    SizeExceeded { limit: u64 },

    /// The tool exited nonzero for a reason we don't classify further.
    #[error("fetch tool failed: {stderr}")]
    Tool { stderr: String },

    /// The fetch tool binary is not installed.
    #[error("fetch tool not found: {binary}")]
    MissingTool { binary: &'static str },

    /// Wrapped source error from a dependency.
    #[error("{context}: {source}")]
    External {
        context: String,
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Tool metadata output could not be parsed.
    #[error("invalid tool metadata: {0}")]
    Metadata(#[from] serde_json::Error),
}

impl Error {
    #[must_use]
    pub fn external<E>(context: impl Into<String>, source: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        Self::External {
            context: context.into(),
            source: Box::new(source),
        }
    }
}
