use std::sync::Arc;

use tracing::{debug, error, info, warn};

use {
    clipferry_channels::{Delivery, InboundMessage, MessageHandle},
    clipferry_media::{ArtifactPrefix, ArtifactStore, FetchLimits, MediaFetcher},
};

use crate::{
    request::{FailureKind, RequestReport, RequestState},
    validate,
};

/// Posted as soon as a link is accepted, then edited in place.
const STATUS_PROCESSING: &str = "Processing link…";
const STATUS_UPLOADING: &str = "Uploading…";

/// Orchestrates one request from inbound text to cleanup.
///
/// One `handle` call per request; concurrent requests share nothing but
/// the artifact store and the delivery channel, both safe under
/// concurrent use.
pub struct Pipeline {
    delivery: Arc<dyn Delivery>,
    fetcher: Arc<dyn MediaFetcher>,
    artifacts: Arc<ArtifactStore>,
    limits: FetchLimits,
}

impl Pipeline {
    #[must_use]
    pub fn new(
        delivery: Arc<dyn Delivery>,
        fetcher: Arc<dyn MediaFetcher>,
        artifacts: Arc<ArtifactStore>,
        limits: FetchLimits,
    ) -> Self {
        Self {
            delivery,
            fetcher,
            artifacts,
            limits,
        }
    }

    /// Run the full request lifecycle for one inbound message.
    ///
    /// Never propagates an error: every failure ends as a status-message
    /// edit and a terminal `Failed` state in the returned report. Once an
    /// artifact namespace is allocated, it is purged exactly once before
    /// this method returns.
    pub async fn handle(&self, message: &InboundMessage) -> RequestReport {
        let mut report = RequestReport::new(&message.chat_id);
        let chat_id = message.chat_id.as_str();

        // Validate before any filesystem work: bad input must never
        // allocate an artifact namespace or touch the fetch executor.
        let Some(url) = validate::recognized_url(&message.text) else {
            debug!(chat_id, "inbound text is not a recognized media link");
            let text = self.failure_text(FailureKind::InvalidUrl);
            if let Err(e) = self.delivery.send_text(chat_id, &text).await {
                warn!(chat_id, error = %e, "failed to send invalid-link reply");
            }
            report.fail(FailureKind::InvalidUrl);
            return report;
        };
        report.transition(RequestState::Validated);
        info!(chat_id, url = %url, "request validated");

        let status = match self.delivery.send_text(chat_id, STATUS_PROCESSING).await {
            Ok(handle) => handle,
            Err(e) => {
                warn!(chat_id, error = %e, "failed to post status message");
                report.fail(FailureKind::Delivery);
                return report;
            },
        };

        let prefix = self.artifacts.allocate(chat_id);
        let outcome = self
            .run(chat_id, url.as_str(), &prefix, &status, &mut report)
            .await;

        // The one cleanup point: every exit path after allocation passes
        // here exactly once, and a failure message goes out only after the
        // namespace is clean.
        match self.artifacts.purge(&prefix) {
            Ok(removed) if removed > 0 => {
                debug!(chat_id, prefix = prefix.as_stem(), removed, "reclaimed artifacts");
            },
            Ok(_) => {},
            Err(e) => {
                error!(chat_id, prefix = prefix.as_stem(), error = %e, "artifact purge failed");
            },
        }

        match outcome {
            Ok(()) => {
                report.transition(RequestState::Done);
                info!(chat_id, "request complete");
            },
            Err(kind) => {
                report.fail(kind);
                self.update_status(&status, &self.failure_text(kind)).await;
            },
        }
        report
    }

    /// The fallible middle of the lifecycle: probe, download, verify,
    /// upload. Cleanup stays with the caller.
    async fn run(
        &self,
        chat_id: &str,
        url: &str,
        prefix: &ArtifactPrefix,
        status: &MessageHandle,
        report: &mut RequestReport,
    ) -> Result<(), FailureKind> {
        report.transition(RequestState::Fetching);

        let probe = self
            .fetcher
            .probe(url)
            .await
            .map_err(|e| self.fetch_failure(chat_id, "probe", &e))?;

        // Advisory pre-check: skip the download for media already known to
        // be over the duration limit.
        self.limits
            .check_duration(probe.duration)
            .map_err(|e| self.fetch_failure(chat_id, "duration check", &e))?;

        self.update_status(status, &format!("Downloading: {}…", probe.title))
            .await;

        let media = self
            .fetcher
            .download(url, prefix, &self.limits)
            .await
            .map_err(|e| self.fetch_failure(chat_id, "download", &e))?;
        report.transition(RequestState::Verified);

        self.update_status(status, STATUS_UPLOADING).await;
        report.transition(RequestState::Delivering);

        if let Err(e) = self
            .delivery
            .send_video(chat_id, &media.path, true)
            .await
        {
            warn!(chat_id, error = %e, "video upload failed");
            return Err(FailureKind::Delivery);
        }

        // Success: the status placeholder goes away entirely.
        if let Err(e) = self.delivery.delete_message(status).await {
            warn!(chat_id, error = %e, "failed to delete status message");
        }
        Ok(())
    }

    fn fetch_failure(
        &self,
        chat_id: &str,
        stage: &str,
        error: &clipferry_media::Error,
    ) -> FailureKind {
        let kind = FailureKind::from(error);
        if kind == FailureKind::Internal {
            error!(chat_id, stage, error = %error, "fetch failed unexpectedly");
        } else {
            info!(chat_id, stage, error = %error, "fetch rejected");
        }
        kind
    }

    /// Progress edits are best-effort; a failed edit never aborts the
    /// request.
    async fn update_status(&self, status: &MessageHandle, text: &str) {
        if let Err(e) = self.delivery.edit_text(status, text).await {
            warn!(chat_id = %status.chat_id, error = %e, "status edit failed");
        }
    }

    /// User-visible text for a terminal failure.
    fn failure_text(&self, kind: FailureKind) -> String {
        match kind {
            FailureKind::InvalidUrl => "Please send a valid YouTube link.".to_string(),
            FailureKind::DurationExceeded => format!(
                "Video is too long (limit {} minutes).",
                self.limits.max_duration.as_secs() / 60
            ),
            FailureKind::SizeExceeded => format!(
                "File is too large to upload (max {} MB).",
                self.limits.max_file_size_bytes / (1024 * 1024)
            ),
            FailureKind::NotFound => {
                "No downloadable media was found at that link.".to_string()
            },
            FailureKind::Network => {
                "Network error while fetching the video. Please try again.".to_string()
            },
            FailureKind::UnsupportedSource => {
                "That link is not a supported video source.".to_string()
            },
            FailureKind::Delivery => "Upload failed. Please try again.".to_string(),
            FailureKind::Internal => {
                "Something went wrong while processing your link.".to_string()
            },
        }
    }
}
