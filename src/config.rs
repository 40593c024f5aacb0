// Runtime configuration
//
// Resolved per setting with precedence: command-line flag, then environment,
// then the library's persisted settings, then the built-in default.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::constants::{
    DEFAULT_LIBRARY_DIR, DEFAULT_PROGRESS_INTERVAL_MS, ENV_BACKEND, ENV_LIBRARY,
    ENV_PROGRESS_INTERVAL_MS, ENV_REMOTE_ROOT, SETTING_BACKEND, SETTING_REMOTE_ROOT,
};
use crate::db::{library_exists, settings, Store};
use crate::error::{Result, VidShelfError};
use crate::library::{PersistenceFacade, VideoLibrary};
use crate::storage::{DirectoryObjectStore, LocalBackend, MediaBackend, RemoteBackend};

/// Where media bytes are kept
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendKind {
    /// Blob tables inside the library database
    Local,
    /// An object store rooted at `root`
    Remote { root: PathBuf },
}

impl BackendKind {
    pub fn name(&self) -> &'static str {
        match self {
            BackendKind::Local => "local",
            BackendKind::Remote { .. } => "remote",
        }
    }
}

/// Values given explicitly on the command line
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub library: Option<PathBuf>,
    pub backend: Option<String>,
    pub remote_root: Option<PathBuf>,
    pub progress_interval_ms: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub library_root: PathBuf,
    pub backend: BackendKind,
    /// Object store root known for this library, even when the active
    /// backend is local. Records written remotely are deleted through it.
    pub remote_root: Option<PathBuf>,
    pub progress_interval: Duration,
}

impl Config {
    /// Resolve against the process environment.
    pub fn resolve(overrides: &ConfigOverrides) -> Result<Self> {
        Self::resolve_with(overrides, |name| std::env::var(name).ok())
    }

    /// Resolve with an explicit environment lookup.
    pub fn resolve_with<F>(overrides: &ConfigOverrides, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = |name: &str| env(name).filter(|v| !v.trim().is_empty());

        let library_root = match overrides.library.clone().or_else(|| env(ENV_LIBRARY).map(PathBuf::from)) {
            Some(root) => root,
            None => default_library_root()?,
        };

        // Persisted settings are only read from a library that already exists
        let persisted = |key: &str| -> Result<Option<String>> {
            if !library_exists(&library_root) {
                return Ok(None);
            }
            let store = Store::open(&library_root)?;
            let conn = store.connect()?;
            settings::get_setting(&conn, key)
        };

        let backend_name = match overrides.backend.clone().or_else(|| env(ENV_BACKEND)) {
            Some(name) => name,
            None => persisted(SETTING_BACKEND)?.unwrap_or_else(|| BackendKind::Local.name().to_string()),
        };

        let remote_root = match overrides
            .remote_root
            .clone()
            .or_else(|| env(ENV_REMOTE_ROOT).map(PathBuf::from))
        {
            Some(root) => Some(root),
            None => persisted(SETTING_REMOTE_ROOT)?.map(PathBuf::from),
        };

        let backend = match backend_name.trim().to_ascii_lowercase().as_str() {
            "local" => BackendKind::Local,
            "remote" => {
                let root = remote_root.clone().ok_or_else(|| {
                    VidShelfError::Config(format!(
                        "The remote backend needs a remote root (--remote-root or {})",
                        ENV_REMOTE_ROOT
                    ))
                })?;
                BackendKind::Remote { root }
            }
            other => {
                return Err(VidShelfError::Config(format!(
                    "Unknown storage backend '{}' (expected local or remote)",
                    other
                )))
            }
        };

        let interval_ms = match overrides.progress_interval_ms {
            Some(ms) => ms,
            None => match env(ENV_PROGRESS_INTERVAL_MS) {
                Some(raw) => raw.trim().parse::<u64>().map_err(|_| {
                    VidShelfError::Config(format!("{} must be a number of milliseconds, got '{}'", ENV_PROGRESS_INTERVAL_MS, raw))
                })?,
                None => DEFAULT_PROGRESS_INTERVAL_MS,
            },
        };
        if interval_ms == 0 {
            return Err(VidShelfError::Config("Progress interval must be above zero".to_string()));
        }

        Ok(Self {
            library_root,
            backend,
            remote_root,
            progress_interval: Duration::from_millis(interval_ms),
        })
    }

    /// Open the library database, creating it if needed.
    pub fn open_store(&self) -> Result<Store> {
        Store::open(&self.library_root)
    }

    pub fn build_backend(&self, store: &Store) -> Result<Arc<dyn MediaBackend>> {
        let backend: Arc<dyn MediaBackend> = match &self.backend {
            BackendKind::Local => Arc::new(LocalBackend::new(store.clone(), self.progress_interval)),
            BackendKind::Remote { root } => {
                let objects = DirectoryObjectStore::new(root)?;
                Arc::new(RemoteBackend::new(Arc::new(objects)))
            }
        };
        Ok(backend)
    }

    pub fn open_library(&self) -> Result<VideoLibrary> {
        let store = self.open_store()?;
        let backend = self.build_backend(&store)?;
        log::debug!(
            "Opened library at {} with {} backend",
            self.library_root.display(),
            backend.name()
        );

        let mut facade = PersistenceFacade::new(store, backend);
        if let (BackendKind::Local, Some(root)) = (&self.backend, &self.remote_root) {
            // A root that was never created holds no objects
            if root.is_dir() {
                let objects = DirectoryObjectStore::new(root)?;
                facade = facade.with_remote(Arc::new(RemoteBackend::new(Arc::new(objects))));
            }
        }
        Ok(VideoLibrary::from_facade(facade))
    }

    /// Save the backend choice into the library so later runs pick it up.
    pub fn persist(&self, store: &Store) -> Result<()> {
        let conn = store.connect()?;
        settings::set_setting(&conn, SETTING_BACKEND, self.backend.name())?;
        if let BackendKind::Remote { root } = &self.backend {
            settings::set_setting(&conn, SETTING_REMOTE_ROOT, &root.to_string_lossy())?;
        }
        Ok(())
    }
}

fn default_library_root() -> Result<PathBuf> {
    directories::BaseDirs::new()
        .map(|dirs| dirs.home_dir().join(DEFAULT_LIBRARY_DIR))
        .ok_or_else(|| VidShelfError::Config("Could not determine home directory".to_string()))
}
