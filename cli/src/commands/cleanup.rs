//! Cleanup command: delete every droplet carrying the ownership tag.

use anyhow::Result;
use secrecy::{ExposeSecret, SecretString};

use crate::application::services::instance::CleanupOutcome;
use crate::application::services::orchestrator::{Orchestrator, RunPolicy};
use crate::domain::Settings;
use crate::infra::command_runner::TokioCommandRunner;
use crate::infra::digitalocean::DigitalOceanClient;
use crate::infra::prompt::DialoguerPrompt;
use crate::infra::rsync::RsyncSync;
use crate::infra::ssh::SshConnector;
use crate::output::{OutputContext, TerminalReporter};

/// Bulk teardown by tag, after interactive confirmation.
///
/// # Errors
///
/// Returns an error if the API token is missing or the droplet listing
/// fails.
pub async fn run(ctx: &OutputContext, settings: &Settings, tag: Option<&str>) -> Result<()> {
    settings.validate_api_token()?;
    let tag = tag.unwrap_or(&settings.droplet_tag);
    let cloud = DigitalOceanClient::new(SecretString::from(
        settings.digital_ocean_pat.expose_secret().to_owned(),
    ))?;
    let runner = TokioCommandRunner::default();
    let connector = SshConnector::new(
        &runner,
        settings.ssh_user.as_str(),
        settings.ssh_port,
        settings.ssh_private_key_path.clone(),
    );
    let sync = RsyncSync::new(&runner, settings.ssh_port);
    let reporter = TerminalReporter::new(ctx);

    let orchestrator = Orchestrator {
        cloud: &cloud,
        connector: &connector,
        sync: &sync,
        reporter: &reporter,
        settings,
        policy: RunPolicy::from_settings(settings),
    };
    let outcome = orchestrator.cleanup(tag, &DialoguerPrompt).await?;
    if let CleanupOutcome::Deleted { failed, .. } = outcome
        && failed > 0
    {
        ctx.error(&format!("{failed} droplet(s) could not be deleted"));
    }
    Ok(())
}
