//! Local file helpers: hashing, guarded writes and rotating backups

use crate::error::{CoreError, Result};
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncReadExt;

pub const DEFAULT_BACKUP_TIME_FORMAT: &str = "%Y%m%d%H%M%S";
pub const DEFAULT_MAX_BACKUPS: usize = 10;

/// Hex-encoded SHA-256 of a byte slice
pub fn hash_bytes(content: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content);
    format!("{:x}", hasher.finalize())
}

/// Hex-encoded SHA-256 of a file's content
pub async fn hash_file(path: &Path) -> Result<String> {
    let mut file = fs::File::open(path).await?;
    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; 8192];

    loop {
        let n = file.read(&mut buffer).await?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
    }

    Ok(format!("{:x}", hasher.finalize()))
}

pub async fn exists(path: &Path) -> bool {
    fs::try_exists(path).await.unwrap_or(false)
}

pub async fn read_file(path: &Path) -> Result<Vec<u8>> {
    fs::read(path)
        .await
        .map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => {
                CoreError::NotFound(format!("file {}", path.display()))
            }
            _ => CoreError::Io(e),
        })
}

#[derive(Debug, Clone, Copy)]
pub struct WriteOptions {
    pub create_dirs: bool,
    pub overwrite: bool,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            create_dirs: true,
            overwrite: true,
        }
    }
}

/// Writes `content` through a sibling temp file and a rename.
pub async fn write_file(path: &Path, content: &[u8], options: WriteOptions) -> Result<()> {
    if !options.overwrite && exists(path).await {
        return Err(CoreError::AlreadyExists(format!(
            "file {}",
            path.display()
        )));
    }

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
        && !exists(parent).await
    {
        if !options.create_dirs {
            return Err(CoreError::NotFound(format!(
                "directory {}",
                parent.display()
            )));
        }
        fs::create_dir_all(parent).await?;
    }

    let file_name = path
        .file_name()
        .ok_or_else(|| CoreError::Validation(format!("not a file path: {}", path.display())))?;
    let staging = path.with_file_name(format!(".{}.tmp", file_name.to_string_lossy()));
    fs::write(&staging, content).await?;
    if let Err(e) = fs::rename(&staging, path).await {
        let _ = fs::remove_file(&staging).await;
        return Err(e.into());
    }

    tracing::debug!("Wrote {} bytes to {}", content.len(), path.display());
    Ok(())
}

#[derive(Debug, Clone)]
pub struct BackupOptions {
    /// Directory receiving the copies
    pub base_path: PathBuf,
    /// chrono format string embedded in the backup name
    pub time_format: String,
    /// Oldest copies beyond this count are deleted; 0 keeps everything
    pub max_backups: usize,
}

impl BackupOptions {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
            time_format: DEFAULT_BACKUP_TIME_FORMAT.to_string(),
            max_backups: DEFAULT_MAX_BACKUPS,
        }
    }
}

/// Copies `path` to `<base>/<file>.<timestamp>.bak` and prunes old copies.
pub async fn create_backup(path: &Path, options: &BackupOptions) -> Result<PathBuf> {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .ok_or_else(|| CoreError::Validation(format!("not a file path: {}", path.display())))?;

    fs::create_dir_all(&options.base_path).await?;

    let stamp = Utc::now().format(&options.time_format).to_string();
    let backup_path = options
        .base_path
        .join(format!("{}.{}.bak", file_name, stamp));
    fs::copy(path, &backup_path).await?;
    tracing::debug!("Backed up {} to {}", path.display(), backup_path.display());

    if options.max_backups > 0 {
        prune_backups(&options.base_path, &file_name, options.max_backups).await?;
    }

    Ok(backup_path)
}

/// Backups of `file_name` in `dir`, oldest first
pub async fn list_backups(dir: &Path, file_name: &str) -> Result<Vec<PathBuf>> {
    if !exists(dir).await {
        return Ok(Vec::new());
    }

    let prefix = format!("{}.", file_name);
    let mut backups = Vec::new();
    let mut entries = fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name().to_string_lossy().to_string();
        if name.starts_with(&prefix) && name.ends_with(".bak") {
            backups.push(entry.path());
        }
    }
    backups.sort();
    Ok(backups)
}

async fn prune_backups(dir: &Path, file_name: &str, max_backups: usize) -> Result<()> {
    let backups = list_backups(dir, file_name).await?;
    if backups.len() <= max_backups {
        return Ok(());
    }

    let excess = backups.len() - max_backups;
    for old in backups.iter().take(excess) {
        fs::remove_file(old).await?;
        tracing::debug!("Pruned backup {}", old.display());
    }
    Ok(())
}

#[derive(Debug, Clone)]
pub struct FileInfo {
    pub path: PathBuf,
    pub size: u64,
    pub modified: Option<DateTime<Utc>>,
    pub hash: String,
}

pub async fn file_info(path: &Path) -> Result<FileInfo> {
    let metadata = fs::metadata(path).await?;
    Ok(FileInfo {
        path: path.to_path_buf(),
        size: metadata.len(),
        modified: metadata.modified().ok().map(DateTime::<Utc>::from),
        hash: hash_file(path).await?,
    })
}
