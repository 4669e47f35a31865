//! Run command: lease a droplet, download the requested jobs, sync them
//! back and release the droplet.

use anyhow::Result;
use secrecy::{ExposeSecret, SecretString};

use crate::application::services::orchestrator::{
    MonitorOutcome, Orchestrator, RunContext, RunPolicy, RunRequest,
};
use crate::domain::{JobBatch, Settings};
use crate::infra::command_runner::TokioCommandRunner;
use crate::infra::digitalocean::DigitalOceanClient;
use crate::infra::rsync::RsyncSync;
use crate::infra::ssh::SshConnector;
use crate::output::{OutputContext, TerminalReporter};

/// Caller input that does not live in the settings file.
#[derive(Debug, Default)]
pub struct RunArgs {
    pub magnets: Vec<String>,
    pub ip: Option<String>,
}

/// Entry point for a download run.
///
/// # Errors
///
/// Returns an error if settings are incomplete or the orchestrator fails.
pub async fn run(ctx: &OutputContext, settings: &Settings, args: RunArgs) -> Result<()> {
    settings.validate()?;
    for (key, value) in settings.summary() {
        ctx.kv(key, &value);
    }

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
    let report = orchestrator
        .run(&RunRequest {
            jobs: JobBatch::new(args.magnets),
            existing_address: args.ip,
        })
        .await?;
    drop(reporter);

    summarize(ctx, &report);
    Ok(())
}

fn summarize(ctx: &OutputContext, report: &RunContext) {
    let verdict = match report.monitor_outcome() {
        Some(MonitorOutcome::Complete) => "all downloads completed",
        Some(MonitorOutcome::NoJobs) | None => "nothing was downloaded",
        Some(MonitorOutcome::GaveUp { .. } | MonitorOutcome::PollLimit { .. }) => {
            "monitoring stopped early; downloads may be incomplete"
        }
    };
    ctx.kv("result", verdict);
    ctx.kv("synced", if report.synced() { "yes" } else { "no" });
}
