//! YAML settings file discovery and loading.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::domain::SettingsError;
use crate::domain::settings::{SETTINGS_FILE_NAME, Settings};

/// Environment variable naming an explicit settings file.
pub const CONFIG_ENV: &str = "DOTD_CONFIG";

/// Loads [`Settings`] from the first settings file found.
///
/// Lookup order: explicit path, `DOTD_CONFIG`, the working directory, then
/// the home directory.
#[derive(Debug, Default)]
pub struct YamlSettingsStore {
    explicit: Option<PathBuf>,
}

impl YamlSettingsStore {
    #[must_use]
    pub fn new(explicit: Option<PathBuf>) -> Self {
        Self { explicit }
    }

    /// Candidate locations in lookup order.
    #[must_use]
    pub fn candidates(&self) -> Vec<PathBuf> {
        if let Some(path) = &self.explicit {
            return vec![path.clone()];
        }
        if let Some(path) = std::env::var_os(CONFIG_ENV).filter(|v| !v.is_empty()) {
            return vec![PathBuf::from(path)];
        }
        let mut dirs = Vec::new();
        if let Ok(cwd) = std::env::current_dir() {
            dirs.push(cwd);
        }
        if let Some(home) = dirs::home_dir() {
            dirs.push(home);
        }
        dirs.into_iter().map(|d| d.join(SETTINGS_FILE_NAME)).collect()
    }

    /// Resolve the settings file to use.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::NotFound`] listing every searched path.
    pub fn path(&self) -> Result<PathBuf> {
        let candidates = self.candidates();
        if let Some(found) = candidates.iter().find(|p| p.is_file()) {
            return Ok(found.clone());
        }
        let searched = candidates
            .iter()
            .map(|p| format!("  {}", p.display()))
            .collect::<Vec<_>>()
            .join("\n");
        Err(SettingsError::NotFound { searched }.into())
    }

    /// Resolve, read and parse the settings file.
    ///
    /// # Errors
    ///
    /// Returns an error if no file is found, the extension is not YAML, or
    /// the content does not parse.
    pub fn load(&self) -> Result<(PathBuf, Settings)> {
        let path = self.path()?;
        let settings = read_settings(&path)?;
        Ok((path, settings))
    }
}

/// Read and parse one settings file, expanding `~` in local paths.
///
/// # Errors
///
/// Returns an error if the extension is not `.yml`/`.yaml` or the file
/// cannot be read or parsed.
pub fn read_settings(path: &Path) -> Result<Settings> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default();
    if !matches!(ext, "yml" | "yaml") {
        return Err(SettingsError::UnsupportedFormat(path.display().to_string()).into());
    }
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read {}", path.display()))?;
    let mut settings: Settings = serde_yaml::from_str(&content)
        .with_context(|| format!("cannot parse {}", path.display()))?;
    if let Some(home) = dirs::home_dir() {
        settings.ssh_private_key_path = expand_home(&settings.ssh_private_key_path, &home);
        settings.download_dir = expand_home(&settings.download_dir, &home);
    }
    Ok(settings)
}

/// Replace a leading `~` component with `home`.
#[must_use]
pub fn expand_home(path: &Path, home: &Path) -> PathBuf {
    match path.strip_prefix("~") {
        Ok(rest) => home.join(rest),
        Err(_) => path.to_path_buf(),
    }
}
