//! Bulk transfer via the system `rsync` binary over ssh.

use std::path::Path;

use anyhow::{Context, Result};

use crate::application::ports::{CommandRunner, FileSync};
use crate::domain::agent::shell_quote;

/// Build the `rsync` argument vector. The remote directory itself is copied
/// into `destination`; partial transfers are kept so a rerun resumes.
///
/// rsync splits the `-e` value into words itself, so the key path is
/// shell-quoted inside it.
#[must_use]
pub fn rsync_args(
    source: &str,
    destination: &Path,
    private_key: &Path,
    port: u16,
) -> Vec<String> {
    vec![
        "-e".to_string(),
        format!(
            "ssh -o StrictHostKeyChecking=no -o UserKnownHostsFile=/dev/null -p {port} -i {}",
            shell_quote(&private_key.to_string_lossy())
        ),
        "-a".to_string(),
        "--partial".to_string(),
        "--progress".to_string(),
        source.to_string(),
        destination.to_string_lossy().into_owned(),
    ]
}

/// [`FileSync`] backed by `rsync`, with progress streamed to the terminal.
pub struct RsyncSync<'a, R> {
    runner: &'a R,
    port: u16,
}

impl<'a, R> RsyncSync<'a, R> {
    #[must_use]
    pub fn new(runner: &'a R, port: u16) -> Self {
        Self { runner, port }
    }
}

impl<R: CommandRunner> FileSync for RsyncSync<'_, R> {
    async fn sync_dir(&self, source: &str, destination: &Path, private_key: &Path) -> Result<()> {
        std::fs::create_dir_all(destination)
            .with_context(|| format!("cannot create {}", destination.display()))?;
        let args = rsync_args(source, destination, private_key, self.port);
        let refs: Vec<&str> = args.iter().map(String::as_str).collect();
        let status = self.runner.run_status("rsync", &refs).await?;
        anyhow::ensure!(status.success(), "rsync exited with {status}");
        Ok(())
    }
}
