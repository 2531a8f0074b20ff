//! Intake configuration management.
//!
//! Reads/writes JSON at `~/.config/ycloud-intake/config.json`.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// On-disk config format. Missing fields fall back to their defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConfigFile {
    #[serde(default)]
    storage_dir: String,
    #[serde(default)]
    write_chunk_size: usize,
    #[serde(default = "default_true")]
    verify_checksum: bool,
    #[serde(default = "default_true")]
    send_checksum: bool,
}

fn default_true() -> bool {
    true
}

/// Intake configuration.
#[derive(Debug, Clone)]
pub struct IntakeConfig {
    /// Directory the local backend stores uploads in.
    pub storage_dir: PathBuf,
    /// Write chunk size in bytes; 0 selects the backend default.
    pub write_chunk_size: usize,
    /// Whether the backend verifies upload checksums.
    pub verify_checksum: bool,
    /// Whether the client sends a checksum with each upload.
    pub send_checksum: bool,
    file_path: PathBuf,
}

fn default_storage_dir() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".into());
    PathBuf::from(home).join("ycloud").join("uploads")
}

impl Default for IntakeConfig {
    fn default() -> Self {
        Self {
            storage_dir: default_storage_dir(),
            write_chunk_size: 0,
            verify_checksum: true,
            send_checksum: true,
            file_path: config_file_path().unwrap_or_else(|_| PathBuf::from("/tmp/config.json")),
        }
    }
}

impl IntakeConfig {
    /// Loads configuration from the default location.
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(&config_file_path()?)
    }

    /// Loads configuration from `file_path`.
    ///
    /// A missing file yields defaults; an unparsable one is logged and
    /// ignored.
    pub fn load_from(file_path: &Path) -> anyhow::Result<Self> {
        let mut config = IntakeConfig {
            file_path: file_path.to_path_buf(),
            ..Default::default()
        };

        if file_path.exists() {
            let content = std::fs::read_to_string(file_path)?;
            if let Ok(file) = serde_json::from_str::<ConfigFile>(&content) {
                if !file.storage_dir.is_empty() {
                    config.storage_dir = PathBuf::from(file.storage_dir);
                }
                config.write_chunk_size = file.write_chunk_size;
                config.verify_checksum = file.verify_checksum;
                config.send_checksum = file.send_checksum;
            } else {
                tracing::warn!(
                    path = %file_path.display(),
                    "failed to parse intake config, using defaults"
                );
            }
        }

        Ok(config)
    }

    /// Saves configuration to the path it was loaded from.
    pub fn save(&self) -> anyhow::Result<()> {
        if let Some(parent) = self.file_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = ConfigFile {
            storage_dir: self.storage_dir.display().to_string(),
            write_chunk_size: self.write_chunk_size,
            verify_checksum: self.verify_checksum,
            send_checksum: self.send_checksum,
        };

        let json = serde_json::to_string_pretty(&file)?;
        std::fs::write(&self.file_path, &json)?;
        set_permissions_0600(&self.file_path);

        tracing::debug!(path = %self.file_path.display(), "intake configuration saved");
        Ok(())
    }

    /// Path the configuration is read from and saved to.
    pub fn file_path(&self) -> &Path {
        &self.file_path
    }
}

fn set_permissions_0600(path: &Path) {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let _ = std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600));
    }
    #[cfg(not(unix))]
    {
        let _ = path;
    }
}

fn config_file_path() -> anyhow::Result<PathBuf> {
    let config_dir = config_base_dir()?;
    Ok(config_dir.join("ycloud-intake").join("config.json"))
}

fn config_base_dir() -> anyhow::Result<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        let appdata =
            std::env::var("APPDATA").unwrap_or_else(|_| "C:\\Users\\Default\\AppData".into());
        Ok(PathBuf::from(appdata))
    }

    #[cfg(not(target_os = "windows"))]
    {
        let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".into());
        Ok(PathBuf::from(home).join(".config"))
    }
}
