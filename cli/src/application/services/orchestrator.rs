//! Run orchestration: the state machine that leases one droplet, drives the
//! download agent on it, pulls the results back and releases the droplet.
//!
//! ```text
//! Init → Provisioning → Configuring → Submitting → Monitoring → Syncing → Teardown → Done
//!   └──────────────────────────────────────────────────────────────→ CleanupOnly
//! ```
//!
//! All collaborators are injected as port traits; the only state carried
//! between steps lives in [`RunContext`].

use std::time::Duration;

use anyhow::Result;
use dotd_common::JobStatus;
use secrecy::ExposeSecret;

use crate::application::ports::{
    CloudProvider, FileSync, ProgressReporter, Prompt, RemoteShell, ShellConnector,
};
use crate::application::services::agent::{self, AgentSetup};
use crate::application::services::instance::{self, CleanupOutcome};
use crate::domain::agent::{PEER_PORT, SessionToken, WEBUI_PORT, webui_url};
use crate::domain::{
    AuthFailurePolicy, BudgetState, Instance, JobBatch, RetryPolicy, RunError, SETTLE_DELAY,
    Settings, is_batch_complete,
};

/// Orchestrator states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Init,
    Provisioning,
    Configuring,
    Submitting,
    Monitoring,
    Syncing,
    Teardown,
    Done,
    CleanupOnly,
}

/// How the monitoring loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorOutcome {
    /// Every job reported complete.
    Complete,
    /// Nothing was submitted.
    NoJobs,
    /// Consecutive failed or empty polls exhausted the retry budget.
    GaveUp { attempts: u32 },
    /// The optional in-progress poll ceiling was reached.
    PollLimit { polls: u32 },
}

/// What the caller asked for.
#[derive(Debug, Clone, Default)]
pub struct RunRequest {
    pub jobs: JobBatch,
    /// Reuse a running droplet at this address instead of creating one.
    pub existing_address: Option<String>,
}

/// Timing and failure policy for a run.
#[derive(Debug, Clone, Copy)]
pub struct RunPolicy {
    pub instance_active: RetryPolicy,
    pub settle: Duration,
    pub liveness: RetryPolicy,
    pub monitor: RetryPolicy,
    /// `None` keeps polling in-progress jobs until they complete.
    pub max_in_progress_polls: Option<u32>,
    pub on_auth_failure: AuthFailurePolicy,
}

impl RunPolicy {
    #[must_use]
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            instance_active: RetryPolicy::INSTANCE_ACTIVE,
            settle: SETTLE_DELAY,
            liveness: RetryPolicy::AGENT_LIVENESS,
            monitor: settings.policy.monitor.retry_policy(),
            max_in_progress_polls: settings.policy.monitor.max_in_progress_polls,
            on_auth_failure: settings.policy.on_auth_failure,
        }
    }
}

/// Explicit per-run state, returned to the caller as the run report.
#[derive(Debug)]
pub struct RunContext {
    state: RunState,
    history: Vec<RunState>,
    instance: Option<Instance>,
    /// Firewall opened for the instance, removed again on teardown.
    firewall: Option<String>,
    session: Option<SessionToken>,
    latest: Vec<JobStatus>,
    monitor: Option<MonitorOutcome>,
    synced: bool,
}

impl Default for RunContext {
    fn default() -> Self {
        Self {
            state: RunState::Init,
            history: vec![RunState::Init],
            instance: None,
            firewall: None,
            session: None,
            latest: Vec::new(),
            monitor: None,
            synced: false,
        }
    }
}

impl RunContext {
    fn transition(&mut self, next: RunState) {
        tracing::debug!(from = ?self.state, to = ?next, "run state");
        self.state = next;
        self.history.push(next);
    }

    #[must_use]
    pub fn state(&self) -> RunState {
        self.state
    }

    /// Every state entered, in order, starting with `Init`.
    #[must_use]
    pub fn history(&self) -> &[RunState] {
        &self.history
    }

    #[must_use]
    pub fn instance(&self) -> Option<&Instance> {
        self.instance.as_ref()
    }

    #[must_use]
    pub fn firewall(&self) -> Option<&str> {
        self.firewall.as_deref()
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.session.is_some()
    }

    /// Latest non-empty job snapshot.
    #[must_use]
    pub fn latest_jobs(&self) -> &[JobStatus] {
        &self.latest
    }

    #[must_use]
    pub fn monitor_outcome(&self) -> Option<MonitorOutcome> {
        self.monitor
    }

    #[must_use]
    pub fn synced(&self) -> bool {
        self.synced
    }
}

/// Top-level state machine over injected collaborators.
pub struct Orchestrator<'a, C, K, F, R> {
    pub cloud: &'a C,
    pub connector: &'a K,
    pub sync: &'a F,
    pub reporter: &'a R,
    pub settings: &'a Settings,
    pub policy: RunPolicy,
}

impl<C, K, F, R> Orchestrator<'_, C, K, F, R>
where
    C: CloudProvider,
    K: ShellConnector,
    F: FileSync,
    R: ProgressReporter,
{
    /// Execute one full run.
    ///
    /// Once an instance exists, every path reaches teardown except an
    /// authentication failure under [`AuthFailurePolicy::LeaveRunning`],
    /// which keeps the droplet and its firewall for `dotd --cleanup`.
    ///
    /// # Errors
    ///
    /// Returns an error if provisioning fails, no droplet matches the given
    /// address, the droplet never gets an address, or login fails.
    pub async fn run(&self, request: &RunRequest) -> Result<RunContext> {
        let mut ctx = RunContext::default();

        ctx.transition(RunState::Provisioning);
        let instance = self.provision(request).await?;
        ctx.instance = Some(instance.clone());

        let Some(address) = instance.address().map(str::to_owned) else {
            self.release(&mut ctx, &instance).await;
            return Err(RunError::AddressUnavailable(instance.id()).into());
        };
        self.reporter.step(&format!("droplet IPv4 {address}"));

        if let Err(e) = self.drive(&mut ctx, &instance, &address, &request.jobs).await {
            match self.policy.on_auth_failure {
                AuthFailurePolicy::Teardown => self.release(&mut ctx, &instance).await,
                AuthFailurePolicy::LeaveRunning => self.reporter.warn(&format!(
                    "droplet {} ({address}) left running; remove it with `dotd --cleanup`",
                    instance.id()
                )),
            }
            return Err(e);
        }

        self.release(&mut ctx, &instance).await;
        ctx.transition(RunState::Done);
        Ok(ctx)
    }

    /// The `CleanupOnly` branch: bulk teardown by ownership tag.
    ///
    /// # Errors
    ///
    /// Returns an error if listing instances fails.
    pub async fn cleanup(&self, tag: &str, prompt: &impl Prompt) -> Result<CleanupOutcome> {
        tracing::debug!(to = ?RunState::CleanupOnly, "run state");
        instance::teardown_by_tag(self.cloud, tag, prompt, self.reporter).await
    }

    async fn provision(&self, request: &RunRequest) -> Result<Instance> {
        if let Some(address) = &request.existing_address {
            self.reporter
                .step(&format!("looking up droplet with IP {address}..."));
            return instance::find_by_address(self.cloud, address)
                .await?
                .ok_or_else(|| RunError::NoInstanceAtAddress(address.clone()).into());
        }

        let created =
            instance::create(self.cloud, &self.settings.instance_spec(), self.reporter).await?;
        Ok(instance::await_active(
            self.cloud,
            created,
            self.policy.instance_active,
            self.policy.settle,
            self.reporter,
        )
        .await)
    }

    /// Configuring → Submitting → Monitoring → Syncing. Only login is fatal.
    async fn drive(
        &self,
        ctx: &mut RunContext,
        instance: &Instance,
        address: &str,
        jobs: &JobBatch,
    ) -> Result<()> {
        ctx.transition(RunState::Configuring);
        let ports = [self.settings.ssh_port, WEBUI_PORT, PEER_PORT];
        match self.cloud.allow_inbound(instance.id(), &ports).await {
            Ok(id) => ctx.firewall = Some(id),
            Err(e) => tracing::debug!("opening inbound ports failed (ignored): {e:#}"),
        }
        let shell = self.connector.connect(address);
        let password = self.settings.qbittorrent_password.expose_secret();
        agent::install(
            &shell,
            &AgentSetup {
                incoming_dir: &self.settings.qbit.incoming_dir,
                completed_dir: &self.settings.qbit.completed_dir,
                version: &self.settings.qbittorrent_version,
                password,
            },
            self.reporter,
        )
        .await;

        let token =
            agent::authenticate(&shell, password, self.policy.liveness, self.reporter).await?;
        ctx.session = Some(token.clone());

        ctx.transition(RunState::Submitting);
        if jobs.is_empty() {
            self.reporter
                .step("no magnet links provided; skipping torrent submission");
        } else {
            agent::submit(&shell, &token, jobs, self.reporter).await;
            self.reporter.step(&format!(
                "torrents will be downloaded. Follow at: {}",
                webui_url(address)
            ));
        }

        ctx.transition(RunState::Monitoring);
        let outcome = self.monitor(ctx, &shell, &token, jobs).await;
        ctx.monitor = Some(outcome);

        ctx.transition(RunState::Syncing);
        agent::stop(&shell, self.reporter).await;
        ctx.synced = self.sync_results(address).await;
        Ok(())
    }

    async fn monitor(
        &self,
        ctx: &mut RunContext,
        shell: &impl RemoteShell,
        token: &SessionToken,
        jobs: &JobBatch,
    ) -> MonitorOutcome {
        if jobs.is_empty() {
            self.reporter.step("no jobs to monitor");
            return MonitorOutcome::NoJobs;
        }

        let mut budget = self.policy.monitor.budget();
        let mut polls = 0u32;
        loop {
            let snapshot = match agent::status(shell, token).await {
                Ok(list) if !list.is_empty() => Some(list),
                Ok(_) => {
                    tracing::debug!("status list empty; jobs not visible yet");
                    None
                }
                Err(e) => {
                    tracing::warn!("status poll failed: {e}");
                    None
                }
            };

            match snapshot {
                Some(list) => {
                    budget.reset();
                    let complete = is_batch_complete(&list);
                    self.reporter.jobs(&list);
                    ctx.latest = list;
                    if complete {
                        self.reporter.success("downloads completed");
                        return MonitorOutcome::Complete;
                    }
                    polls += 1;
                    if self
                        .policy
                        .max_in_progress_polls
                        .is_some_and(|limit| polls >= limit)
                    {
                        self.reporter
                            .warn(&format!("stopped monitoring after {polls} polls"));
                        return MonitorOutcome::PollLimit { polls };
                    }
                }
                None => {
                    if budget.fail() == BudgetState::Exhausted {
                        let attempts = budget.failures();
                        self.reporter.warn(&format!(
                            "no usable status after {attempts} attempts; syncing what is there"
                        ));
                        return MonitorOutcome::GaveUp { attempts };
                    }
                }
            }
            tokio::time::sleep(self.policy.monitor.interval).await;
        }
    }

    async fn sync_results(&self, address: &str) -> bool {
        let source = format!(
            "{}@{address}:{}",
            self.settings.ssh_user, self.settings.qbit.completed_dir
        );
        self.reporter.step(&format!(
            "syncing files down to {}",
            self.settings.download_dir.display()
        ));
        match self
            .sync
            .sync_dir(
                &source,
                &self.settings.download_dir,
                &self.settings.ssh_private_key_path,
            )
            .await
        {
            Ok(()) => {
                self.reporter.success("files synced");
                true
            }
            Err(e) => {
                tracing::error!("sync failed: {e:#}");
                self.reporter.warn(&format!("sync failed: {e:#}"));
                false
            }
        }
    }

    /// Delete the droplet, then the firewall opened for it.
    async fn release(&self, ctx: &mut RunContext, instance: &Instance) {
        ctx.transition(RunState::Teardown);
        instance::teardown(self.cloud, instance.id(), self.reporter).await;
        if let Some(id) = &ctx.firewall {
            instance::remove_firewall(self.cloud, id, self.reporter).await;
        }
    }
}
