use crate::domain::model::DisplayTarget;
use crate::domain::ports::Display;
use crate::utils::error::{PollerError, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;

/// In-process set of named regions. Clones share the same regions.
#[derive(Debug, Clone, Default)]
pub struct MemoryDisplay {
    regions: Arc<Mutex<HashMap<DisplayTarget, String>>>,
}

impl MemoryDisplay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Display with one empty region already present.
    pub fn with_region(target: &DisplayTarget) -> Self {
        let mut regions = HashMap::new();
        regions.insert(target.clone(), String::new());
        Self {
            regions: Arc::new(Mutex::new(regions)),
        }
    }

    pub async fn add_region(&self, target: &DisplayTarget, initial: &str) {
        let mut regions = self.regions.lock().await;
        regions.insert(target.clone(), initial.to_string());
    }

    pub async fn remove_region(&self, target: &DisplayTarget) -> Option<String> {
        let mut regions = self.regions.lock().await;
        regions.remove(target)
    }
}

impl Display for MemoryDisplay {
    async fn replace_content(&self, target: &DisplayTarget, markup: &str) -> Result<()> {
        let mut regions = self.regions.lock().await;
        let region = regions
            .get_mut(target)
            .ok_or_else(|| PollerError::TargetNotFound {
                id: target.id().to_string(),
            })?;
        region.clear();
        region.push_str(markup);
        Ok(())
    }

    async fn content(&self, target: &DisplayTarget) -> Result<String> {
        let regions = self.regions.lock().await;
        regions
            .get(target)
            .cloned()
            .ok_or_else(|| PollerError::TargetNotFound {
                id: target.id().to_string(),
            })
    }
}

/// Regions backed by `<base_path>/<id>.html`.
///
/// A region exists as long as the base directory exists; the directory is never
/// created here. Clones share the temp-file counter, so any number of chains may
/// write the same region.
#[derive(Debug, Clone)]
pub struct FileDisplay {
    base_path: PathBuf,
    write_seq: Arc<AtomicU64>,
}

impl FileDisplay {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
            write_seq: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Unique per write: two writers never share a temp file.
    fn temp_path(&self, target: &DisplayTarget) -> PathBuf {
        let seq = self.write_seq.fetch_add(1, Ordering::Relaxed);
        self.base_path.join(format!(
            ".{}.{}.{}.html.tmp",
            target.id(),
            std::process::id(),
            seq
        ))
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Locate the file behind `target`, failing when the region cannot exist.
    pub fn region_path(&self, target: &DisplayTarget) -> Result<PathBuf> {
        let id = target.id();
        let well_formed = !id.is_empty()
            && !id.contains(['/', '\\', '\0'])
            && id != "."
            && id != "..";

        if !well_formed || !self.base_path.is_dir() {
            return Err(PollerError::TargetNotFound { id: id.to_string() });
        }

        Ok(self.base_path.join(format!("{}.html", id)))
    }
}

impl Display for FileDisplay {
    async fn replace_content(&self, target: &DisplayTarget, markup: &str) -> Result<()> {
        let path = self.region_path(target)?;
        let tmp_path = self.temp_path(target);

        // rename keeps readers from ever seeing a half-written region
        if let Err(e) = tokio::fs::write(&tmp_path, markup.as_bytes()).await {
            let _ = tokio::fs::remove_file(&tmp_path).await;
            return Err(e.into());
        }
        if let Err(e) = tokio::fs::rename(&tmp_path, &path).await {
            let _ = tokio::fs::remove_file(&tmp_path).await;
            return Err(e.into());
        }

        tracing::debug!("Wrote {} bytes to {}", markup.len(), path.display());
        Ok(())
    }

    async fn content(&self, target: &DisplayTarget) -> Result<String> {
        let path = self.region_path(target)?;
        match tokio::fs::read_to_string(&path).await {
            Ok(content) => Ok(content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(String::new()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_memory_display_replaces_whole_content() {
        let target = DisplayTarget::new("container");
        let display = MemoryDisplay::new();
        display.add_region(&target, "<p>old</p><p>stuff</p>").await;

        display.replace_content(&target, "<p>5</p>").await.unwrap();

        assert_eq!(display.content(&target).await.unwrap(), "<p>5</p>");
    }

    #[tokio::test]
    async fn test_memory_display_missing_region() {
        let display = MemoryDisplay::with_region(&DisplayTarget::new("container"));
        let missing = DisplayTarget::new("sidebar");

        let err = display.replace_content(&missing, "x").await.unwrap_err();
        assert!(matches!(err, PollerError::TargetNotFound { id } if id == "sidebar"));
    }

    #[tokio::test]
    async fn test_memory_display_clones_share_regions() {
        let target = DisplayTarget::default();
        let display = MemoryDisplay::with_region(&target);
        let other = display.clone();

        other.replace_content(&target, "<b>shared</b>").await.unwrap();

        assert_eq!(display.content(&target).await.unwrap(), "<b>shared</b>");
    }

    #[tokio::test]
    async fn test_file_display_writes_region_file() {
        let temp_dir = TempDir::new().unwrap();
        let display = FileDisplay::new(temp_dir.path());
        let target = DisplayTarget::new("container");

        assert_eq!(display.content(&target).await.unwrap(), "");

        display.replace_content(&target, "<p>1</p>").await.unwrap();
        display.replace_content(&target, "<p>2</p>").await.unwrap();

        let on_disk = std::fs::read_to_string(temp_dir.path().join("container.html")).unwrap();
        assert_eq!(on_disk, "<p>2</p>");
        let leftovers: Vec<_> = std::fs::read_dir(temp_dir.path())
            .unwrap()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_file_display_concurrent_writers_on_one_region() {
        let temp_dir = TempDir::new().unwrap();
        let display = FileDisplay::new(temp_dir.path());
        let target = DisplayTarget::new("container");

        let writers: Vec<_> = (0..4)
            .map(|writer| {
                let display = display.clone();
                let target = target.clone();
                tokio::spawn(async move {
                    let mut errors = 0;
                    for i in 0..200 {
                        let markup = format!("<p>{}-{}</p>", writer, i);
                        if display.replace_content(&target, &markup).await.is_err() {
                            errors += 1;
                        }
                    }
                    errors
                })
            })
            .collect();

        let mut total_errors = 0;
        for writer in writers {
            total_errors += writer.await.unwrap();
        }
        assert_eq!(total_errors, 0);

        // the surviving content is always one complete write
        let content = display.content(&target).await.unwrap();
        assert!(content.starts_with("<p>") && content.ends_with("</p>"));
        assert!(content.ends_with("-199</p>"));
    }

    #[tokio::test]
    async fn test_file_display_requires_existing_directory() {
        let temp_dir = TempDir::new().unwrap();
        let display = FileDisplay::new(temp_dir.path().join("missing"));

        let err = display
            .replace_content(&DisplayTarget::default(), "x")
            .await
            .unwrap_err();
        assert!(matches!(err, PollerError::TargetNotFound { .. }));
    }

    #[test]
    fn test_file_display_rejects_path_like_ids() {
        let temp_dir = TempDir::new().unwrap();
        let display = FileDisplay::new(temp_dir.path());

        assert!(display.region_path(&DisplayTarget::new("../etc")).is_err());
        assert!(display.region_path(&DisplayTarget::new("..")).is_err());
        assert!(display.region_path(&DisplayTarget::new("")).is_err());
        assert!(display.region_path(&DisplayTarget::new("container")).is_ok());
    }
}
