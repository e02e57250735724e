use clipferry_media::Error as FetchError;

/// Lifecycle states of a single media-fetch request.
///
/// Transitions are strictly sequential for one request; `Failed` absorbs
/// from any non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestState {
    Received,
    Validated,
    Fetching,
    Verified,
    Delivering,
    Done,
    Failed(FailureKind),
}

impl RequestState {
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Failed(_))
    }
}

/// Closed set of request failure classes.
///
/// The pipeline branches on these — never on error strings — to pick the
/// user-visible status text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// The inbound text is not a recognized media link.
    InvalidUrl,
    /// Probed duration exceeds the configured limit.
    DurationExceeded,
    /// The media exceeds the configured size limit.
    SizeExceeded,
    /// The tool ran but produced no media.
    NotFound,
    /// Network failure while probing or downloading.
    Network,
    /// The extraction tool does not handle this source.
    UnsupportedSource,
    /// The transport rejected the upload or a status operation.
    Delivery,
    /// Anything unexpected; detail goes to the log, not the user.
    Internal,
}

impl From<&FetchError> for FailureKind {
    fn from(error: &FetchError) -> Self {
        match error {
            FetchError::UnsupportedSource { .. } => Self::UnsupportedSource,
            FetchError::NotFound { .. } => Self::NotFound,
            FetchError::Network { .. } => Self::Network,
            FetchError::DurationExceeded { .. } => Self::DurationExceeded,
            FetchError::SizeExceeded { .. } => Self::SizeExceeded,
            FetchError::Tool { .. }
            | FetchError::MissingTool { .. }
            | FetchError::External { .. }
            | FetchError::Io(_)
            | FetchError::Metadata(_) => Self::Internal,
        }
    }
}

/// Outcome of one handled request, for logging and tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestReport {
    pub chat_id: String,
    /// Every state the request passed through, in order.
    pub transitions: Vec<RequestState>,
}

impl RequestReport {
    #[must_use]
    pub fn new(chat_id: impl Into<String>) -> Self {
        Self {
            chat_id: chat_id.into(),
            transitions: vec![RequestState::Received],
        }
    }

    pub fn transition(&mut self, state: RequestState) {
        self.transitions.push(state);
    }

    pub fn fail(&mut self, kind: FailureKind) {
        self.transitions.push(RequestState::Failed(kind));
    }

    /// The state the request ended in.
    #[must_use]
    pub fn terminal(&self) -> RequestState {
        self.transitions
            .last()
            .copied()
            .unwrap_or(RequestState::Received)
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_tracks_transitions_in_order() {
        let mut report = RequestReport::new("42");
        report.transition(RequestState::Validated);
        report.transition(RequestState::Fetching);
        report.fail(FailureKind::Network);
        assert_eq!(
            report.transitions,
            vec![
                RequestState::Received,
                RequestState::Validated,
                RequestState::Fetching,
                RequestState::Failed(FailureKind::Network),
            ]
        );
        assert_eq!(report.terminal(), RequestState::Failed(FailureKind::Network));
        assert!(report.terminal().is_terminal());
    }

    #[test]
    fn fetch_errors_map_onto_failure_kinds() {
        use std::time::Duration;
        let err = FetchError::DurationExceeded {
            actual: Duration::from_secs(1200),
            limit: Duration::from_secs(900),
        };
        assert_eq!(FailureKind::from(&err), FailureKind::DurationExceeded);

        let err = FetchError::Tool {
            stderr: "boom".into(),
        };
        assert_eq!(FailureKind::from(&err), FailureKind::Internal);
    }
}
