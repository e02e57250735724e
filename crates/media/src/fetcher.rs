//! yt-dlp fetch executor.
//!
//! Wraps the external `yt-dlp` CLI: a metadata-only probe first, then the
//! actual download into the request's artifact namespace. The tool may
//! rename its output during container negotiation, so the written file is
//! recovered with [`ArtifactStore::resolve`] rather than trusted by name,
//! and every failure path sweeps the namespace before propagating.

use {
    async_trait::async_trait,
    serde::Deserialize,
    std::{path::PathBuf, process::Stdio, sync::Arc, time::Duration},
    tokio::{process::Command, sync::Semaphore},
    tracing::{debug, warn},
};

use crate::{
    artifact::{ArtifactPrefix, ArtifactStore},
    error::{Error, Result},
    limits::FetchLimits,
};

/// Binary name for the extraction tool.
const BINARY_NAME: &str = "yt-dlp";

/// Prefer an mp4 container, which chat clients play inline.
const FORMAT_SELECTOR: &str = "best[ext=mp4]/best";

/// Metadata returned by a probe, before any download.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaProbe {
    pub title: String,
    /// Unknown for live streams and some extractors.
    pub duration: Option<Duration>,
}

/// A fetched artifact on local disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedMedia {
    pub path: PathBuf,
    pub size_bytes: u64,
}

/// Fetch-side contract consumed by the request pipeline.
#[async_trait]
pub trait MediaFetcher: Send + Sync {
    /// Metadata-only probe. Writes no file.
    async fn probe(&self, url: &str) -> Result<MediaProbe>;

    /// Download `url` into the namespace owned by `prefix`.
    ///
    /// Post-conditions: on success the returned file exists and satisfies
    /// `limits.max_file_size_bytes`; on any failure no file matching
    /// `prefix` remains on disk.
    async fn download(
        &self,
        url: &str,
        prefix: &ArtifactPrefix,
        limits: &FetchLimits,
    ) -> Result<FetchedMedia>;
}

/// `yt-dlp` executor with a bounded worker pool.
///
/// The subprocess runs off the dispatch loop via `tokio::process`; the
/// semaphore caps how many downloads are in flight at once, so a hung
/// fetch ties up one permit instead of unbounded resources.
pub struct YtDlpFetcher {
    store: Arc<ArtifactStore>,
    workers: Semaphore,
    cookie_file: Option<PathBuf>,
}

impl YtDlpFetcher {
    #[must_use]
    pub fn new(store: Arc<ArtifactStore>, max_workers: usize) -> Self {
        Self {
            store,
            workers: Semaphore::new(max_workers),
            cookie_file: None,
        }
    }

    /// Pass a cookie file through to the tool for authenticated sources.
    #[must_use]
    pub fn with_cookie_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.cookie_file = Some(path.into());
        self
    }

    fn binary(&self) -> Result<PathBuf> {
        which::which(BINARY_NAME).map_err(|_| Error::MissingTool {
            binary: BINARY_NAME,
        })
    }

    fn command(&self) -> Result<Command> {
        let mut cmd = Command::new(self.binary()?);
        cmd.arg("--no-warnings").arg("--no-playlist");
        if let Some(cookies) = &self.cookie_file {
            cmd.arg("--cookies").arg(cookies);
        }
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        Ok(cmd)
    }

    async fn run_download(
        &self,
        url: &str,
        prefix: &ArtifactPrefix,
        limits: &FetchLimits,
    ) -> Result<FetchedMedia> {
        let template = format!("{}.%(ext)s", self.store.template_path(prefix).display());

        let mut cmd = self.command()?;
        cmd.arg("-f").arg(FORMAT_SELECTOR);
        cmd.arg("--max-filesize")
            .arg(limits.max_file_size_bytes.to_string());
        cmd.arg("--merge-output-format").arg("mp4");
        cmd.arg("-o").arg(&template);
        cmd.arg("--").arg(url);

        debug!(url, template, "starting yt-dlp download");
        let output = cmd.output().await?;
        let stderr = String::from_utf8_lossy(&output.stderr);

        if !output.status.success() {
            return Err(classify_tool_failure(url, &stderr));
        }

        // The tool reports an over-limit file on stdout and skips the
        // download with a zero exit status.
        let stdout = String::from_utf8_lossy(&output.stdout);
        if exceeded_max_filesize(&stdout) || exceeded_max_filesize(&stderr) {
            return Err(Error::SizeExceeded {
                limit: limits.max_file_size_bytes,
            });
        }

        let Some(path) = self.store.resolve(prefix)? else {
            return Err(Error::NotFound {
                url: url.to_string(),
            });
        };

        let size_bytes = tokio::fs::metadata(&path).await?.len();
        limits.check_size(size_bytes)?;

        debug!(path = %path.display(), size_bytes, "yt-dlp download complete");
        Ok(FetchedMedia { path, size_bytes })
    }
}

#[async_trait]
impl MediaFetcher for YtDlpFetcher {
    async fn probe(&self, url: &str) -> Result<MediaProbe> {
        let mut cmd = self.command()?;
        cmd.arg("--dump-json").arg("--skip-download");
        cmd.arg("--").arg(url);

        debug!(url, "probing media metadata");
        let output = cmd.output().await?;
        if !output.status.success() {
            return Err(classify_tool_failure(
                url,
                &String::from_utf8_lossy(&output.stderr),
            ));
        }

        let metadata: ProbeMetadata =
            serde_json::from_str(String::from_utf8_lossy(&output.stdout).trim())?;
        Ok(metadata.into())
    }

    async fn download(
        &self,
        url: &str,
        prefix: &ArtifactPrefix,
        limits: &FetchLimits,
    ) -> Result<FetchedMedia> {
        let _permit = self
            .workers
            .acquire()
            .await
            .map_err(|e| Error::external("fetch worker pool", e))?;

        match self.run_download(url, prefix, limits).await {
            Ok(media) => Ok(media),
            Err(e) => {
                // Partial output must not survive a failed attempt.
                if let Err(sweep) = self.store.purge(prefix) {
                    warn!(
                        prefix = prefix.as_stem(),
                        error = %sweep,
                        "failed to sweep artifacts after fetch error"
                    );
                }
                Err(e)
            },
        }
    }
}

// ── Tool output ─────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct ProbeMetadata {
    #[serde(default)]
    title: Option<String>,
    /// Seconds; fractional for some extractors.
    #[serde(default)]
    duration: Option<f64>,
}

impl From<ProbeMetadata> for MediaProbe {
    fn from(metadata: ProbeMetadata) -> Self {
        Self {
            title: metadata.title.unwrap_or_else(|| "video".to_string()),
            duration: metadata
                .duration
                .filter(|secs| secs.is_finite() && *secs >= 0.0)
                .map(Duration::from_secs_f64),
        }
    }
}

/// True when the tool skipped or aborted the file for exceeding
/// `--max-filesize`.
fn exceeded_max_filesize(output: &str) -> bool {
    output.contains("larger than max-filesize")
        || output.contains("exceeds max-filesize")
        || output.contains("File is larger than the maximum")
}

/// Map a nonzero tool exit onto the typed failure set.
fn classify_tool_failure(url: &str, stderr: &str) -> Error {
    let lower = stderr.to_lowercase();
    if lower.contains("unsupported url") || lower.contains("is not a valid url") {
        Error::UnsupportedSource {
            url: url.to_string(),
        }
    } else if lower.contains("video unavailable")
        || lower.contains("content isn't available")
        || lower.contains("404")
    {
        Error::NotFound {
            url: url.to_string(),
        }
    } else if lower.contains("unable to download")
        || lower.contains("connection")
        || lower.contains("timed out")
        || lower.contains("network")
        || lower.contains("getaddrinfo")
    {
        Error::Network {
            message: last_error_line(stderr),
        }
    } else {
        Error::Tool {
            stderr: last_error_line(stderr),
        }
    }
}

/// The most useful single line of tool stderr: the last `ERROR:` line if
/// present, otherwise the last non-empty line.
fn last_error_line(stderr: &str) -> String {
    let lines: Vec<&str> = stderr.lines().map(str::trim).filter(|l| !l.is_empty()).collect();
    lines
        .iter()
        .rev()
        .find(|l| l.starts_with("ERROR:"))
        .or_else(|| lines.last())
        .map_or_else(|| "unknown tool failure".to_string(), |l| (*l).to_string())
}
