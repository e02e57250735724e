use std::time::Duration;

use crate::error::{Error, Result};

/// Immutable fetch policy: the caps a fetched artifact must satisfy.
///
/// The size limit is enforced twice — as a hint to the fetch tool and as a
/// mandatory post-download check — because probed duration and encoded
/// size do not correlate reliably.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchLimits {
    pub max_duration: Duration,
    pub max_file_size_bytes: u64,
}

impl FetchLimits {
    /// Pre-download check against a probed duration.
    ///
    /// Advisory: a missing duration (live streams, some extractors) passes
    /// and the size check after download still governs.
    pub fn check_duration(&self, probed: Option<Duration>) -> Result<()> {
        if let Some(actual) = probed
            && actual > self.max_duration
        {
            return Err(Error::DurationExceeded {
                actual,
                limit: self.max_duration,
            });
        }
        Ok(())
    }

    /// Post-download check against the on-disk size. Mandatory.
    pub fn check_size(&self, actual_bytes: u64) -> Result<()> {
        if actual_bytes > self.max_file_size_bytes {
            return Err(Error::SizeExceeded {
                limit: self.max_file_size_bytes,
            });
        }
        Ok(())
    }
}
