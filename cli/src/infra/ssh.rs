//! Remote command channel over the system `ssh` client.
//!
//! Each call opens a fresh non-interactive session with key authentication.
//! Host keys are neither checked nor recorded: droplets are short-lived and
//! their keys are never seen twice.

use std::path::{Path, PathBuf};

use crate::application::ports::{CommandRunner, RemoteShell, ShellConnector};
use crate::domain::agent::redact;

#[cfg(windows)]
const DEVNULL: &str = "NUL";
#[cfg(not(windows))]
const DEVNULL: &str = "/dev/null";

/// Build the `ssh` argument vector for one remote command.
#[must_use]
pub fn ssh_args(user: &str, host: &str, port: u16, key: &Path, command: &str) -> Vec<String> {
    vec![
        "-i".to_string(),
        key.to_string_lossy().into_owned(),
        "-p".to_string(),
        port.to_string(),
        "-o".to_string(),
        "StrictHostKeyChecking=no".to_string(),
        "-o".to_string(),
        format!("UserKnownHostsFile={DEVNULL}"),
        "-o".to_string(),
        "LogLevel=ERROR".to_string(),
        "-o".to_string(),
        "BatchMode=yes".to_string(),
        "-o".to_string(),
        "ConnectTimeout=15".to_string(),
        format!("{user}@{host}"),
        command.to_string(),
    ]
}

/// A [`RemoteShell`] bound to one host.
pub struct SshChannel<'a, R> {
    runner: &'a R,
    user: String,
    host: String,
    port: u16,
    key: PathBuf,
}

impl<R: CommandRunner> RemoteShell for SshChannel<'_, R> {
    async fn execute(&self, command: &str) -> String {
        tracing::debug!(host = %self.host, "executing command: {}", log_line(command));
        let args = ssh_args(&self.user, &self.host, self.port, &self.key, command);
        let refs: Vec<&str> = args.iter().map(String::as_str).collect();
        match self.runner.run("ssh", &refs).await {
            Ok(out) => {
                if !out.status.success() {
                    tracing::warn!(
                        host = %self.host,
                        status = ?out.status.code(),
                        stderr = %String::from_utf8_lossy(&out.stderr).trim(),
                        "remote command failed"
                    );
                }
                String::from_utf8_lossy(&out.stdout).into_owned()
            }
            Err(e) => {
                tracing::error!(host = %self.host, "ssh session failed: {e:#}");
                String::new()
            }
        }
    }
}

/// Opens [`SshChannel`]s with fixed credentials.
pub struct SshConnector<'a, R> {
    runner: &'a R,
    user: String,
    port: u16,
    key: PathBuf,
}

impl<'a, R> SshConnector<'a, R> {
    #[must_use]
    pub fn new(runner: &'a R, user: impl Into<String>, port: u16, key: impl Into<PathBuf>) -> Self {
        Self {
            runner,
            user: user.into(),
            port,
            key: key.into(),
        }
    }
}

impl<'a, R: CommandRunner> ShellConnector for SshConnector<'a, R> {
    type Shell = SshChannel<'a, R>;

    fn connect(&self, address: &str) -> Self::Shell {
        SshChannel {
            runner: self.runner,
            user: self.user.clone(),
            host: address.to_string(),
            port: self.port,
            key: self.key.clone(),
        }
    }
}

/// First line of `command` with credentials masked.
fn log_line(command: &str) -> String {
    redact(command.lines().next().unwrap_or_default())
}
