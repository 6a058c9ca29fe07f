//! The `.tfvarenv.json` registry
//!
//! One file in the project root maps environment names to their
//! definitions. Every mutation rewrites the file wholesale while the
//! in-process lock is held.

use crate::error::{RegistryError, Result};
use crate::model::{DEFAULT_REGION, Environment};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

pub const REGISTRY_FILE: &str = ".tfvarenv.json";
pub const REGISTRY_VERSION: &str = "1.0";
pub const CONFIG_ENV_VAR: &str = "TFVARENV_CONFIG";

/// On-disk registry content
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryFile {
    pub version: String,
    pub default_region: String,
    #[serde(default)]
    pub environments: BTreeMap<String, Environment>,
}

impl Default for RegistryFile {
    fn default() -> Self {
        Self {
            version: REGISTRY_VERSION.to_string(),
            default_region: DEFAULT_REGION.to_string(),
            environments: BTreeMap::new(),
        }
    }
}

pub struct Registry {
    path: PathBuf,
    inner: Mutex<RegistryFile>,
}

impl Registry {
    /// Loads the registry at `path`. A missing file yields an empty registry.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            let file: RegistryFile = serde_json::from_str(&content)?;
            tracing::debug!(
                "Loaded registry {} with {} environments",
                path.display(),
                file.environments.len()
            );
            file
        } else {
            tracing::debug!("Registry {} not found, using empty registry", path.display());
            RegistryFile::default()
        };

        Ok(Self {
            path,
            inner: Mutex::new(file),
        })
    }

    /// Resolves the registry path.
    ///
    /// Search order:
    /// 1. `TFVARENV_CONFIG` environment variable
    /// 2. `.tfvarenv.json` in the current directory
    pub fn locate() -> Result<PathBuf> {
        if let Ok(config_path) = std::env::var(CONFIG_ENV_VAR)
            && !config_path.is_empty()
        {
            return Ok(PathBuf::from(config_path));
        }
        Ok(std::env::current_dir()?.join(REGISTRY_FILE))
    }

    pub fn discover() -> Result<Self> {
        Self::open(Self::locate()?)
    }

    /// Creates a fresh registry file. Fails if one already exists.
    pub fn init(path: impl AsRef<Path>, default_region: &str) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if path.exists() {
            return Err(RegistryError::AlreadyInitialized(
                path.display().to_string(),
            ));
        }

        let file = RegistryFile {
            default_region: if default_region.is_empty() {
                DEFAULT_REGION.to_string()
            } else {
                default_region.to_string()
            },
            ..Default::default()
        };
        write_file(&path, &file)?;
        tracing::info!("Initialized registry at {}", path.display());

        Ok(Self {
            path,
            inner: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Directory containing the registry file; relative environment paths resolve against it.
    pub fn project_root(&self) -> PathBuf {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        }
    }

    pub fn default_region(&self) -> Result<String> {
        Ok(self.lock()?.default_region.clone())
    }

    pub fn add_environment(&self, name: &str, env: Environment) -> Result<Environment> {
        let mut guard = self.lock()?;
        let mut env = env;
        env.name = name.to_string();
        env.normalize(&guard.default_region)?;

        if guard.environments.contains_key(&env.name) {
            return Err(RegistryError::AlreadyExists(env.name));
        }

        let mut next = guard.clone();
        next.environments.insert(env.name.clone(), env.clone());
        self.commit(&mut guard, next)?;

        tracing::info!("Added environment {}", env.name);
        Ok(env)
    }

    pub fn get_environment(&self, name: &str) -> Result<Environment> {
        self.lock()?
            .environments
            .get(name)
            .cloned()
            .ok_or_else(|| RegistryError::NotFound(name.to_string()))
    }

    /// Registered names in sorted order. An empty registry yields an empty list.
    pub fn list_environments(&self) -> Result<Vec<String>> {
        Ok(self.lock()?.environments.keys().cloned().collect())
    }

    pub fn remove_environment(&self, name: &str) -> Result<Environment> {
        let mut guard = self.lock()?;
        let mut next = guard.clone();
        let removed = next
            .environments
            .remove(name)
            .ok_or_else(|| RegistryError::NotFound(name.to_string()))?;
        self.commit(&mut guard, next)?;

        tracing::info!("Removed environment {}", name);
        Ok(removed)
    }

    /// Replaces `name` with `env`. A different `env.name` renames the entry.
    pub fn update_environment(&self, name: &str, env: Environment) -> Result<Environment> {
        let mut guard = self.lock()?;
        if !guard.environments.contains_key(name) {
            return Err(RegistryError::NotFound(name.to_string()));
        }

        let mut env = env;
        if env.name.is_empty() {
            env.name = name.to_string();
        }
        env.normalize(&guard.default_region)?;

        if env.name != name && guard.environments.contains_key(&env.name) {
            return Err(RegistryError::AlreadyExists(env.name));
        }

        let mut next = guard.clone();
        next.environments.remove(name);
        next.environments.insert(env.name.clone(), env.clone());
        self.commit(&mut guard, next)?;

        if env.name != name {
            tracing::info!("Renamed environment {} -> {}", name, env.name);
        } else {
            tracing::info!("Updated environment {}", name);
        }
        Ok(env)
    }

    fn lock(&self) -> Result<MutexGuard<'_, RegistryFile>> {
        self.inner.lock().map_err(|_| RegistryError::LockPoisoned)
    }

    /// Persists `next` and only then swaps it into memory.
    fn commit(&self, guard: &mut MutexGuard<'_, RegistryFile>, next: RegistryFile) -> Result<()> {
        write_file(&self.path, &next)?;
        **guard = next;
        Ok(())
    }
}

fn write_file(path: &Path, file: &RegistryFile) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
        && !parent.exists()
    {
        std::fs::create_dir_all(parent)?;
    }
    let mut content = serde_json::to_string_pretty(file)?;
    content.push('\n');

    // A crash mid-write leaves the staging file, never a truncated registry.
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| REGISTRY_FILE.to_string());
    let staging = path.with_file_name(format!(".{}.tmp", name));
    std::fs::write(&staging, content)?;
    if let Err(e) = std::fs::rename(&staging, path) {
        let _ = std::fs::remove_file(&staging);
        return Err(e.into());
    }
    tracing::debug!("Saved registry {}", path.display());
    Ok(())
}
