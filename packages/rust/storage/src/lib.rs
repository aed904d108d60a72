//! Known-URL ledger for cross-run suppression.
//!
//! The [`KnownUrlLedger`] wraps a plain text file with one posted URL per
//! line. Blank lines and `#` comments are ignored. The file only grows:
//! entries are appended, never rewritten.
//!
//! **Access rules:**
//! - `run` (delivering): read-write via [`KnownUrlLedger::open`]
//! - `run --dry-run`: read-only via [`KnownUrlLedger::open_readonly`]

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use eventdigest_shared::{EventDigestError, Result};
use tokio::io::AsyncWriteExt;

/// Handle on the known-URL file plus its in-memory set.
#[derive(Debug)]
pub struct KnownUrlLedger {
    path: PathBuf,
    urls: HashSet<String>,
    /// File order, for listing.
    ordered: Vec<String>,
    /// The file exists but does not end in a newline.
    needs_newline: bool,
    readonly: bool,
}

impl KnownUrlLedger {
    /// Load the ledger at `path` in read-write mode. A missing file is an
    /// empty ledger.
    pub async fn open(path: &Path) -> Result<Self> {
        Self::load(path, false).await
    }

    /// Load the ledger at `path` in read-only mode (for dry runs).
    pub async fn open_readonly(path: &Path) -> Result<Self> {
        Self::load(path, true).await
    }

    async fn load(path: &Path, readonly: bool) -> Result<Self> {
        let content = match tokio::fs::read_to_string(path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(?path, "known-URL file not found, starting empty");
                String::new()
            }
            Err(e) => return Err(EventDigestError::io(path, e)),
        };

        let mut urls = HashSet::new();
        let mut ordered = Vec::new();
        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            if urls.insert(line.to_string()) {
                ordered.push(line.to_string());
            }
        }

        tracing::debug!(?path, count = urls.len(), readonly, "loaded known URLs");

        Ok(Self {
            path: path.to_path_buf(),
            urls,
            ordered,
            needs_newline: !content.is_empty() && !content.ends_with('\n'),
            readonly,
        })
    }

    /// Ensure we're in read-write mode before writing.
    fn check_writable(&self) -> Result<()> {
        if self.readonly {
            return Err(EventDigestError::Storage(
                "known-URL ledger is opened in read-only mode".into(),
            ));
        }
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn contains(&self, url: &str) -> bool {
        self.urls.contains(url.trim())
    }

    /// The set of known URLs, as consumed by consolidation.
    pub fn urls(&self) -> &HashSet<String> {
        &self.urls
    }

    /// Known URLs in file order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.ordered.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }

    /// Append the URLs not yet in the ledger. Returns how many were added.
    ///
    /// Creates the file and its parent directory when needed. Nothing is
    /// written when every URL is already known.
    pub async fn append<I, S>(&mut self, urls: I) -> Result<usize>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.check_writable()?;

        let mut fresh: Vec<String> = Vec::new();
        for url in urls {
            let url = url.as_ref().trim();
            if url.is_empty() || self.urls.contains(url) || fresh.iter().any(|f| f == url) {
                continue;
            }
            fresh.push(url.to_string());
        }

        if fresh.is_empty() {
            return Ok(0);
        }

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| EventDigestError::io(parent, e))?;
        }

        let mut buf = String::new();
        if self.needs_newline {
            buf.push('\n');
        }
        for url in &fresh {
            buf.push_str(url);
            buf.push('\n');
        }

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| EventDigestError::io(&self.path, e))?;
        file.write_all(buf.as_bytes())
            .await
            .map_err(|e| EventDigestError::io(&self.path, e))?;
        file.flush()
            .await
            .map_err(|e| EventDigestError::io(&self.path, e))?;

        self.needs_newline = false;
        for url in &fresh {
            self.urls.insert(url.clone());
            self.ordered.push(url.clone());
        }

        tracing::info!(path = ?self.path, added = fresh.len(), "appended known URLs");
        Ok(fresh.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn temp_path() -> PathBuf {
        std::env::temp_dir()
            .join(format!("ed-ledger-{}", Uuid::now_v7()))
            .join("posted_urls.txt")
    }

    #[tokio::test]
    async fn missing_file_is_empty() {
        let ledger = KnownUrlLedger::open(&temp_path()).await.unwrap();
        assert!(ledger.is_empty());
        assert!(!ledger.contains("https://x.com/e"));
    }

    #[tokio::test]
    async fn append_and_reopen() {
        let path = temp_path();
        let mut ledger = KnownUrlLedger::open(&path).await.unwrap();

        let added = ledger
            .append(["https://x.com/a", "https://x.com/b", "https://x.com/a"])
            .await
            .unwrap();
        assert_eq!(added, 2);
        assert!(ledger.contains("https://x.com/a"));

        let added = ledger
            .append(vec!["https://x.com/b".to_string(), "https://x.com/c".to_string()])
            .await
            .unwrap();
        assert_eq!(added, 1);

        let reopened = KnownUrlLedger::open(&path).await.unwrap();
        assert_eq!(reopened.len(), 3);
        let urls: Vec<&str> = reopened.iter().collect();
        assert_eq!(urls, vec!["https://x.com/a", "https://x.com/b", "https://x.com/c"]);

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "https://x.com/a\nhttps://x.com/b\nhttps://x.com/c\n");
    }

    #[tokio::test]
    async fn skips_comments_and_blank_lines() {
        let path = temp_path();
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "# posted by eventdigest\n\n  https://x.com/a  \nhttps://x.com/b").unwrap();

        let mut ledger = KnownUrlLedger::open(&path).await.unwrap();
        assert_eq!(ledger.len(), 2);
        assert!(ledger.contains("https://x.com/a"));

        // Missing trailing newline must not glue entries together.
        ledger.append(["https://x.com/c"]).await.unwrap();
        let reopened = KnownUrlLedger::open(&path).await.unwrap();
        assert!(reopened.contains("https://x.com/b"));
        assert!(reopened.contains("https://x.com/c"));
    }

    #[tokio::test]
    async fn nothing_new_writes_nothing() {
        let path = temp_path();
        let mut ledger = KnownUrlLedger::open(&path).await.unwrap();
        assert_eq!(ledger.append(["", "   "]).await.unwrap(), 0);
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn readonly_rejects_writes() {
        let path = temp_path();
        let mut ledger = KnownUrlLedger::open_readonly(&path).await.unwrap();
        let err = ledger.append(["https://x.com/a"]).await.unwrap_err();
        assert!(matches!(err, EventDigestError::Storage(_)));
        assert!(!path.exists());
    }
}
