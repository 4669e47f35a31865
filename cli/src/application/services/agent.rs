//! Agent controller: install, configure, start and stop the download agent,
//! and speak its control API through the remote command channel.
//!
//! Imports only from `crate::domain` and `crate::application::ports`.

use anyhow::Result;
use dotd_common::JobStatus;

use crate::application::ports::{ProgressReporter, RemoteShell};
use crate::application::services::poll::{self, Probe};
use crate::domain::agent::{self as protocol, SessionToken};
use crate::domain::{AgentError, JobBatch, RetryPolicy, secret};

/// Host-side layout and credentials for the agent container.
pub struct AgentSetup<'a> {
    pub incoming_dir: &'a str,
    pub completed_dir: &'a str,
    pub version: &'a str,
    pub password: &'a str,
}

/// Prepare directories, write the config file, pull the image and
/// (re)start the container.
///
/// Each step is a single remote command; output is only logged because the
/// channel cannot distinguish failure from silence.
pub async fn install(
    shell: &impl RemoteShell,
    setup: &AgentSetup<'_>,
    reporter: &impl ProgressReporter,
) {
    reporter.step(&format!(
        "creating directories {} {}",
        setup.incoming_dir, setup.completed_dir
    ));
    shell
        .execute(&protocol::mkdir_command(setup.incoming_dir, setup.completed_dir))
        .await;

    reporter.step("configuring qBittorrent...");
    let digest = secret::derive(setup.password);
    shell
        .execute(&protocol::write_config_command(&protocol::render_config(&digest)))
        .await;

    reporter.step(&format!(
        "pulling image {}:{}",
        protocol::IMAGE_REPO,
        setup.version
    ));
    shell.execute(&protocol::pull_command(setup.version)).await;

    shell.execute(&protocol::stop_command()).await;

    reporter.step("starting qBittorrent container...");
    let out = shell
        .execute(&protocol::run_command(
            setup.incoming_dir,
            setup.completed_dir,
            setup.version,
        ))
        .await;
    tracing::debug!(container = out.trim(), "container start output");
}

/// Stop and remove the agent container so finished jobs stop seeding.
pub async fn stop(shell: &impl RemoteShell, reporter: &impl ProgressReporter) {
    reporter.step("stopping qBittorrent container...");
    shell.execute(&protocol::stop_command()).await;
    reporter.success("qBittorrent container removed");
}

/// Wait for the control API, then log in and return the session token.
///
/// An API that never answers the liveness probe is not fatal on its own;
/// the login attempt decides.
///
/// # Errors
///
/// Returns [`AgentError::AuthenticationFailed`] if the login response
/// carries no session cookie.
pub async fn authenticate(
    shell: &impl RemoteShell,
    password: &str,
    liveness: RetryPolicy,
    reporter: &impl ProgressReporter,
) -> Result<SessionToken, AgentError> {
    reporter.step("waiting for qBittorrent to initialize...");
    let probe = protocol::liveness_command();
    let live = poll::retry(liveness, |attempt| {
        let probe = probe.as_str();
        async move {
            if shell.execute(probe).await.trim().is_empty() {
                tracing::debug!(attempt, "control API not answering yet");
                Probe::Pending(None)
            } else {
                Probe::Ready(())
            }
        }
    })
    .await;
    if let Err(exhausted) = live {
        tracing::warn!(
            attempts = exhausted.attempts,
            "control API did not answer liveness probe; trying login anyway"
        );
    }

    reporter.step("authenticating...");
    let response = shell.execute(&protocol::login_command(password)).await;
    let token = protocol::parse_session_cookie(&response)?;
    reporter.success("authenticated");
    Ok(token)
}

/// Submit every locator in the batch. Fire-and-forget.
pub async fn submit(
    shell: &impl RemoteShell,
    token: &SessionToken,
    batch: &JobBatch,
    reporter: &impl ProgressReporter,
) {
    reporter.step(&format!("adding {} torrent(s)...", batch.len()));
    for locator in batch.locators() {
        shell
            .execute(&protocol::add_job_command(token, locator))
            .await;
    }
    reporter.success("torrents added");
}

/// Fetch the current job list.
///
/// # Errors
///
/// Returns [`AgentError::MalformedStatus`] when the response is not a JSON
/// array, including the empty output of a failed channel call.
pub async fn status(
    shell: &impl RemoteShell,
    token: &SessionToken,
) -> Result<Vec<JobStatus>, AgentError> {
    let body = shell.execute(&protocol::status_command(token)).await;
    protocol::parse_status(&body)
}
