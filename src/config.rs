use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

#[derive(Debug, Clone)]
pub struct Config {
    /// Real photo tree (canonical)
    pub root: PathBuf,
    /// Where the virtual filesystem is mounted
    pub mount: PathBuf,
    /// Directory holding the per-root index databases
    pub data_dir: PathBuf,
    /// Seconds between full cache rebuilds
    pub cache_rebuild_interval_secs: u64,
    /// Tag marking a photo as one of its album's selects
    pub select_tag: String,
}

fn default_data_dir() -> PathBuf {
    dirs::home_dir()
        .map(|home| home.join(".photofs"))
        .unwrap_or_else(|| PathBuf::from(".photofs"))
}

impl Config {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn load_from(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let required = |key: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| ConfigError::ValidationError(format!("{key} is required")))
        };

        let root = PathBuf::from(required("PHOTOFS_ROOT")?);
        let mount = PathBuf::from(required("PHOTOFS_MOUNT")?);

        let data_dir = lookup("DATA_DIR")
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(default_data_dir);

        let cache_rebuild_interval_secs = lookup("CACHE_REBUILD_INTERVAL_SECS")
            .and_then(|s| s.parse().ok())
            .unwrap_or(300);

        let select_tag = lookup("SELECT_TAG")
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| "select".to_string());

        let mut config = Config {
            root,
            mount,
            data_dir,
            cache_rebuild_interval_secs,
            select_tag,
        };

        config.validate()?;
        config.root = canonical(&config.root)?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if !self.root.is_dir() {
            return Err(ConfigError::ValidationError(format!(
                "PHOTOFS_ROOT {} is not an existing directory",
                self.root.display()
            )));
        }

        if !self.mount.is_dir() {
            return Err(ConfigError::ValidationError(format!(
                "PHOTOFS_MOUNT {} is not an existing directory",
                self.mount.display()
            )));
        }

        if self.cache_rebuild_interval_secs == 0 {
            return Err(ConfigError::ValidationError(
                "CACHE_REBUILD_INTERVAL_SECS must be greater than zero".to_string(),
            ));
        }

        if self.select_tag.contains('/') {
            return Err(ConfigError::ValidationError(
                "SELECT_TAG cannot contain '/'".to_string(),
            ));
        }

        if canonical(&self.mount)?.starts_with(canonical(&self.root)?) {
            tracing::warn!(
                "Mount point {} is inside the photo tree; the watcher will see its own mount",
                self.mount.display()
            );
        }

        Ok(())
    }
}

fn canonical(path: &Path) -> Result<PathBuf, ConfigError> {
    path.canonicalize().map_err(|e| {
        ConfigError::ValidationError(format!("Cannot resolve {}: {e}", path.display()))
    })
}
