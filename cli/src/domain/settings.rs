//! Settings schema for `do-torrent-downloader.yml`.
//!
//! Pure types and validators only; file discovery lives in `crate::infra::config`.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Deserializer};

use crate::domain::error::SettingsError;
use crate::domain::instance::InstanceSpec;
use crate::domain::retry::RetryPolicy;

/// Default settings file name looked up in the working and home directories.
pub const SETTINGS_FILE_NAME: &str = "do-torrent-downloader.yml";

/// Fully populated run settings.
#[derive(Debug, Deserialize)]
pub struct Settings {
    pub size: String,
    pub image_slug: String,
    pub droplet_name: String,
    pub region: String,
    /// Catalog name of the public key installed on the droplet.
    pub ssh_key: String,
    pub ssh_private_key_path: PathBuf,
    pub download_dir: PathBuf,
    #[serde(deserialize_with = "secret")]
    pub digital_ocean_pat: SecretString,
    pub qbittorrent_version: String,
    #[serde(deserialize_with = "secret")]
    pub qbittorrent_password: SecretString,
    #[serde(default)]
    pub droplet_tag: String,
    pub qbit: QbitDirs,
    #[serde(default = "default_ssh_user")]
    pub ssh_user: String,
    #[serde(default = "default_ssh_port")]
    pub ssh_port: u16,
    #[serde(default)]
    pub policy: PolicySettings,
}

/// Host directories the agent downloads into.
#[derive(Debug, Clone, Deserialize)]
pub struct QbitDirs {
    pub incoming_dir: String,
    pub completed_dir: String,
}

/// Tunable orchestration policy.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PolicySettings {
    pub on_auth_failure: AuthFailurePolicy,
    pub monitor: MonitorSettings,
}

/// What to do with an already provisioned instance when login fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthFailurePolicy {
    /// Abort and leave the instance up for manual recovery.
    #[default]
    LeaveRunning,
    /// Abort and delete the instance.
    Teardown,
}

/// Monitoring loop tunables.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MonitorSettings {
    /// Consecutive failed or empty polls tolerated before giving up.
    pub max_attempts: u32,
    pub interval_secs: u64,
    /// Upper bound on in-progress polls. `None` polls until completion.
    pub max_in_progress_polls: Option<u32>,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            max_attempts: RetryPolicy::MONITOR.max_attempts,
            interval_secs: RetryPolicy::MONITOR.interval.as_secs(),
            max_in_progress_polls: None,
        }
    }
}

impl MonitorSettings {
    #[must_use]
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_attempts, Duration::from_secs(self.interval_secs))
    }
}

/// Command-line values that take precedence over the file.
#[derive(Debug, Default)]
pub struct SettingsOverrides {
    pub size: Option<String>,
    pub download_dir: Option<PathBuf>,
}

impl Settings {
    /// Apply CLI overrides on top of file values.
    pub fn apply(&mut self, overrides: SettingsOverrides) {
        if let Some(size) = overrides.size {
            self.size = size;
        }
        if let Some(dir) = overrides.download_dir {
            self.download_dir = dir;
        }
    }

    /// Check that every field needed for a run is populated.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::MissingField`] naming the first empty field.
    pub fn validate(&self) -> Result<()> {
        self.validate_api_token()?;
        let required: [(&'static str, bool); 11] = [
            ("size", self.size.is_empty()),
            ("image_slug", self.image_slug.is_empty()),
            ("droplet_name", self.droplet_name.is_empty()),
            ("region", self.region.is_empty()),
            ("ssh_key", self.ssh_key.is_empty()),
            (
                "ssh_private_key_path",
                self.ssh_private_key_path.as_os_str().is_empty(),
            ),
            ("download_dir", self.download_dir.as_os_str().is_empty()),
            ("qbittorrent_version", self.qbittorrent_version.is_empty()),
            (
                "qbittorrent_password",
                self.qbittorrent_password.expose_secret().is_empty(),
            ),
            ("qbit.incoming_dir", self.qbit.incoming_dir.is_empty()),
            ("qbit.completed_dir", self.qbit.completed_dir.is_empty()),
        ];
        if let Some((name, _)) = required.iter().find(|(_, missing)| *missing) {
            return Err(SettingsError::MissingField(name).into());
        }
        Ok(())
    }

    /// Check the cloud API token, the only setting bulk cleanup needs.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::MissingField`] when the token is empty.
    pub fn validate_api_token(&self) -> Result<()> {
        if self.digital_ocean_pat.expose_secret().trim().is_empty() {
            return Err(SettingsError::MissingField("digital_ocean_pat").into());
        }
        Ok(())
    }

    /// Build the immutable creation request for a new droplet.
    #[must_use]
    pub fn instance_spec(&self) -> InstanceSpec {
        InstanceSpec {
            size: self.size.clone(),
            image: self.image_slug.clone(),
            name: self.droplet_name.clone(),
            region: self.region.clone(),
            ssh_key: self.ssh_key.clone(),
            tag: self.droplet_tag.clone(),
        }
    }

    /// Human-readable settings summary with secrets redacted.
    #[must_use]
    pub fn summary(&self) -> Vec<(&'static str, String)> {
        vec![
            ("size", self.size.clone()),
            ("image", self.image_slug.clone()),
            ("name", self.droplet_name.clone()),
            ("region", self.region.clone()),
            ("ssh key", self.ssh_key.clone()),
            ("tag", self.droplet_tag.clone()),
            ("qbittorrent", self.qbittorrent_version.clone()),
            ("download dir", self.download_dir.display().to_string()),
            ("api token", "[redacted]".to_string()),
        ]
    }
}

fn secret<'de, D: Deserializer<'de>>(deserializer: D) -> Result<SecretString, D::Error> {
    String::deserialize(deserializer).map(SecretString::from)
}

fn default_ssh_user() -> String {
    "root".to_string()
}

fn default_ssh_port() -> u16 {
    22
}

// ── Unit tests ───────────────────────────────────────────────────────────────
