//! Per-request artifact namespace over one explicit root directory.
//!
//! All filesystem access for fetched media goes through [`ArtifactStore`]
//! so concurrent requests cannot collide on a path and every file created
//! by a fetch attempt can be reclaimed by a single `purge` call.

use std::{
    fs, io,
    path::{Path, PathBuf},
    sync::atomic::{AtomicU64, Ordering},
};

/// Unique path fragment identifying all files belonging to one request.
///
/// The fetch tool appends the negotiated container extension, so a prefix
/// may resolve to `media-42-0.mp4`, `media-42-0.webm`, etc.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPrefix {
    stem: String,
}

impl ArtifactPrefix {
    /// The filename stem shared by every file in this namespace.
    #[must_use]
    pub fn as_stem(&self) -> &str {
        &self.stem
    }
}

impl std::fmt::Display for ArtifactPrefix {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.stem)
    }
}

/// Owns the on-disk namespace for fetched media.
pub struct ArtifactStore {
    root: PathBuf,
    counter: AtomicU64,
}

impl ArtifactStore {
    /// Open a store rooted at `root`, creating the directory if needed.
    ///
    /// The root is always explicit; the store never falls back to the
    /// process working directory.
    pub fn open(root: impl Into<PathBuf>) -> io::Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self {
            root,
            counter: AtomicU64::new(0),
        })
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Reserve a fresh namespace for one request.
    ///
    /// The prefix combines the sanitized chat identity with a process-wide
    /// counter, so concurrent requests — including several from the same
    /// chat — never share a prefix.
    pub fn allocate(&self, chat_id: &str) -> ArtifactPrefix {
        let seq = self.counter.fetch_add(1, Ordering::Relaxed);
        ArtifactPrefix {
            stem: format!("media-{}-{seq}", sanitize(chat_id)),
        }
    }

    /// Absolute path template for the fetch tool: `<root>/<stem>`.
    #[must_use]
    pub fn template_path(&self, prefix: &ArtifactPrefix) -> PathBuf {
        self.root.join(&prefix.stem)
    }

    /// Locate the file the fetch tool actually wrote for `prefix`.
    ///
    /// The tool negotiates the container format, so the final extension is
    /// not known up front; resolution scans the root for an entry whose
    /// name matches the prefix stem.
    pub fn resolve(&self, prefix: &ArtifactPrefix) -> io::Result<Option<PathBuf>> {
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            let name = entry.file_name();
            if in_namespace(&name.to_string_lossy(), &prefix.stem) && entry.file_type()?.is_file() {
                return Ok(Some(entry.path()));
            }
        }
        Ok(None)
    }

    /// Delete every file in this request's namespace.
    ///
    /// Idempotent: zero matches is a successful no-op. Returns the number
    /// of files removed.
    pub fn purge(&self, prefix: &ArtifactPrefix) -> io::Result<usize> {
        let mut removed = 0;
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            let name = entry.file_name();
            if in_namespace(&name.to_string_lossy(), &prefix.stem) {
                match fs::remove_file(entry.path()) {
                    Ok(()) => removed += 1,
                    // Lost a race with another sweep of the same prefix.
                    Err(e) if e.kind() == io::ErrorKind::NotFound => {},
                    Err(e) => return Err(e),
                }
            }
        }
        Ok(removed)
    }
}

/// True when `name` belongs to the namespace identified by `stem`.
///
/// Requires the stem to be followed by a `.` (or nothing), so the prefix
/// `media-5-1` does not claim `media-5-10.mp4`.
fn in_namespace(name: &str, stem: &str) -> bool {
    name.strip_prefix(stem)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with('.'))
}

/// Keep only filesystem-safe characters from a chat identity.
fn sanitize(chat_id: &str) -> String {
    chat_id
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, std::collections::HashSet, tempfile::TempDir};

    fn store() -> (TempDir, ArtifactStore) {
        let dir = TempDir::new().unwrap();
        let store = ArtifactStore::open(dir.path()).unwrap();
        (dir, store)
    }

    #[test]
    fn open_creates_missing_root() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("nested").join("artifacts");
        let store = ArtifactStore::open(&root).unwrap();
        assert!(store.root().is_dir());
    }

    #[test]
    fn allocate_yields_distinct_prefixes_for_distinct_chats() {
        let (_dir, store) = store();
        let a = store.allocate("100");
        let b = store.allocate("200");
        assert_ne!(a.as_stem(), b.as_stem());
    }

    #[test]
    fn allocate_yields_distinct_prefixes_for_same_chat() {
        let (_dir, store) = store();
        let a = store.allocate("100");
        let b = store.allocate("100");
        assert_ne!(a.as_stem(), b.as_stem());
    }

    #[test]
    fn concurrent_allocations_never_collide() {
        let (_dir, store) = store();
        let store = std::sync::Arc::new(store);
        let mut handles = Vec::new();
        for chat in 0..8 {
            let store = std::sync::Arc::clone(&store);
            handles.push(std::thread::spawn(move || {
                (0..50)
                    .map(|_| store.allocate(&chat.to_string()).as_stem().to_owned())
                    .collect::<Vec<_>>()
            }));
        }
        let all: Vec<String> = handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect();
        let unique: HashSet<&String> = all.iter().collect();
        assert_eq!(unique.len(), all.len());
    }

    #[test]
    fn resolve_finds_renamed_extension() {
        let (_dir, store) = store();
        let prefix = store.allocate("7");
        // The tool negotiated webm instead of the requested mp4.
        let written = store.root().join(format!("{}.webm", prefix.as_stem()));
        fs::write(&written, b"media").unwrap();
        assert_eq!(store.resolve(&prefix).unwrap(), Some(written));
    }

    #[test]
    fn resolve_ignores_other_namespaces() {
        let (_dir, store) = store();
        let first = store.allocate("7");
        let second = store.allocate("7");
        fs::write(
            store.root().join(format!("{}.mp4", second.as_stem())),
            b"other",
        )
        .unwrap();
        assert_eq!(store.resolve(&first).unwrap(), None);
    }

    #[test]
    fn prefix_does_not_claim_longer_sequence_numbers() {
        assert!(in_namespace("media-5-1.mp4", "media-5-1"));
        assert!(in_namespace("media-5-1.part.mp4", "media-5-1"));
        assert!(!in_namespace("media-5-10.mp4", "media-5-1"));
        assert!(!in_namespace("media-5-1x.mp4", "media-5-1"));
    }

    #[test]
    fn purge_removes_every_matching_file() {
        let (_dir, store) = store();
        let prefix = store.allocate("9");
        for ext in ["mp4", "part", "ytdl"] {
            fs::write(
                store.root().join(format!("{}.{ext}", prefix.as_stem())),
                b"x",
            )
            .unwrap();
        }
        assert_eq!(store.purge(&prefix).unwrap(), 3);
        assert_eq!(store.resolve(&prefix).unwrap(), None);
    }

    #[test]
    fn purge_with_no_matches_is_a_noop() {
        let (_dir, store) = store();
        let prefix = store.allocate("9");
        assert_eq!(store.purge(&prefix).unwrap(), 0);
        // And again, after a purge already ran.
        assert_eq!(store.purge(&prefix).unwrap(), 0);
    }

    #[test]
    fn purge_leaves_unrelated_files_alone() {
        let (_dir, store) = store();
        let prefix = store.allocate("9");
        let other = store.allocate("9");
        let kept = store.root().join(format!("{}.mp4", other.as_stem()));
        fs::write(&kept, b"keep").unwrap();
        fs::write(
            store.root().join(format!("{}.mp4", prefix.as_stem())),
            b"drop",
        )
        .unwrap();
        store.purge(&prefix).unwrap();
        assert!(kept.exists());
    }

    #[test]
    fn sanitize_preserves_negative_chat_ids() {
        assert_eq!(sanitize("-100123"), "-100123");
        assert_eq!(sanitize("user@host"), "user_host");
    }
}
