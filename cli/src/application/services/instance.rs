//! Instance lifecycle: create, await active, resolve by address, teardown,
//! and removal of the firewalls opened for instances.
//!
//! Imports only from `crate::domain` and `crate::application::ports`.

use std::time::Duration;

use anyhow::{Context, Result};

use crate::application::ports::{CloudProvider, ProgressReporter, Prompt};
use crate::application::services::poll::{self, Probe};
use crate::domain::confirm::{Answer, parse_answer};
use crate::domain::{Firewall, Instance, InstanceSpec, RetryPolicy};

/// Outcome of a bulk teardown by tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CleanupOutcome {
    /// No tag configured; nothing was listed.
    NoTag,
    /// The tag matched no instances.
    NoneFound,
    /// The operator declined.
    Aborted,
    /// Deletion was attempted for every listed instance.
    Deleted { deleted: usize, failed: usize },
}

/// Resolve the key fingerprint and submit a creation request.
///
/// # Errors
///
/// Returns an error if the key cannot be resolved or the control plane
/// rejects the request.
pub async fn create(
    cloud: &impl CloudProvider,
    spec: &InstanceSpec,
    reporter: &impl ProgressReporter,
) -> Result<Instance> {
    let fingerprint = cloud
        .key_fingerprint(&spec.ssh_key)
        .await
        .with_context(|| format!("resolving ssh key '{}'", spec.ssh_key))?;
    reporter.step(&format!(
        "creating droplet '{}' in {}...",
        spec.name, spec.region
    ));
    let instance = cloud
        .create_instance(spec, &fingerprint)
        .await
        .context("creating droplet")?;
    tracing::info!(id = instance.id(), "droplet created");
    Ok(instance)
}

/// Poll until the instance is active, then wait `settle`.
///
/// Running out of attempts is not an error: the latest observation is
/// returned and the caller decides whether its address is usable. Failed
/// status lookups count as attempts.
pub async fn await_active(
    cloud: &impl CloudProvider,
    instance: Instance,
    policy: RetryPolicy,
    settle: Duration,
    reporter: &impl ProgressReporter,
) -> Instance {
    let id = instance.id();
    let outcome = poll::retry(policy, |attempt| async move {
        match cloud.get_instance(id).await {
            Ok(current) if current.is_active() => Probe::Ready(current),
            Ok(current) => {
                tracing::debug!(attempt, status = %current.status(), "droplet not active yet");
                Probe::Pending(Some(current))
            }
            Err(e) => {
                tracing::warn!(attempt, "droplet status lookup failed: {e:#}");
                Probe::Pending(None)
            }
        }
    })
    .await;

    let latest = match outcome {
        Ok(active) => {
            reporter.success("droplet is now active");
            active
        }
        Err(exhausted) => {
            reporter.warn(&format!(
                "droplet not active after {} checks; continuing",
                exhausted.attempts
            ));
            exhausted.last.unwrap_or(instance)
        }
    };
    tokio::time::sleep(settle).await;
    latest
}

/// Find a running instance by public address, walking every page.
///
/// # Errors
///
/// Returns an error if a listing call fails.
pub async fn find_by_address(
    cloud: &impl CloudProvider,
    address: &str,
) -> Result<Option<Instance>> {
    let mut page = 1;
    loop {
        let listing = cloud
            .list_instances(None, page)
            .await
            .context("listing droplets")?;
        if let Some(found) = listing
            .instances
            .into_iter()
            .find(|i| i.address() == Some(address))
        {
            return Ok(Some(found));
        }
        match listing.next_page {
            Some(next) => page = next,
            None => return Ok(None),
        }
    }
}

/// Collect every instance carrying `tag`.
///
/// # Errors
///
/// Returns an error if a listing call fails.
pub async fn list_by_tag(cloud: &impl CloudProvider, tag: &str) -> Result<Vec<Instance>> {
    let mut all = Vec::new();
    let mut page = 1;
    loop {
        let listing = cloud
            .list_instances(Some(tag), page)
            .await
            .context("listing droplets by tag")?;
        all.extend(listing.instances);
        match listing.next_page {
            Some(next) => page = next,
            None => return Ok(all),
        }
    }
}

/// Delete one instance. Never fails: errors are reported and logged.
pub async fn teardown(cloud: &impl CloudProvider, id: u64, reporter: &impl ProgressReporter) {
    reporter.step("deleting the droplet...");
    match cloud.delete_instance(id).await {
        Ok(()) => reporter.success("droplet deleted"),
        Err(e) => {
            tracing::error!(id, "droplet deletion failed: {e:#}");
            reporter.warn(&format!("could not delete droplet {id}: {e:#}"));
        }
    }
}

/// Delete one firewall. Never fails: errors are reported and logged.
pub async fn remove_firewall(
    cloud: &impl CloudProvider,
    id: &str,
    reporter: &impl ProgressReporter,
) {
    match cloud.delete_firewall(id).await {
        Ok(()) => tracing::debug!(id, "firewall deleted"),
        Err(e) => {
            tracing::warn!(id, "firewall deletion failed: {e:#}");
            reporter.warn(&format!("could not delete firewall {id}: {e:#}"));
        }
    }
}

/// Delete our firewalls that belong to `removed` instances or no longer
/// guard any instance. Returns how many were deleted.
///
/// Never fails: a failed listing or deletion is reported and skipped.
pub async fn sweep_firewalls(
    cloud: &impl CloudProvider,
    removed: &[u64],
    reporter: &impl ProgressReporter,
) -> usize {
    let firewalls = match cloud.list_firewalls().await {
        Ok(all) => all,
        Err(e) => {
            tracing::warn!("listing firewalls failed: {e:#}");
            reporter.warn(&format!("could not list firewalls: {e:#}"));
            return 0;
        }
    };
    let stale: Vec<&Firewall> = firewalls.iter().filter(|f| f.is_stale(removed)).collect();
    let mut swept = 0;
    for firewall in stale {
        match cloud.delete_firewall(&firewall.id).await {
            Ok(()) => swept += 1,
            Err(e) => reporter.warn(&format!("error deleting firewall {}: {e:#}", firewall.name)),
        }
    }
    if swept > 0 {
        reporter.success(&format!("deleted {swept} firewall(s)"));
    }
    swept
}

/// List instances by tag, ask for confirmation, and delete them together
/// with their firewalls.
///
/// Deletes nothing unless the listing is non-empty and the operator answers
/// `y` or `yes`. Unrecognized answers re-prompt; a failed read aborts.
///
/// # Errors
///
/// Returns an error if listing fails.
pub async fn teardown_by_tag(
    cloud: &impl CloudProvider,
    tag: &str,
    prompt: &impl Prompt,
    reporter: &impl ProgressReporter,
) -> Result<CleanupOutcome> {
    if tag.trim().is_empty() {
        reporter.warn("no tag specified, skipping cleanup");
        return Ok(CleanupOutcome::NoTag);
    }

    let instances = list_by_tag(cloud, tag).await?;
    if instances.is_empty() {
        reporter.step(&format!("no droplets found with tag '{tag}'"));
        return Ok(CleanupOutcome::NoneFound);
    }

    reporter.step(&format!("found {} droplet(s) with tag '{tag}':", instances.len()));
    for inst in &instances {
        reporter.step(&format!(
            "  {} (ID: {}, IP: {})",
            inst.name(),
            inst.id(),
            inst.address().unwrap_or("-")
        ));
    }

    loop {
        let answer = match prompt.ask("Are you sure you want to delete them? [y/n]") {
            Ok(raw) => parse_answer(&raw),
            Err(e) => {
                tracing::warn!("confirmation prompt failed: {e:#}");
                Answer::No
            }
        };
        match answer {
            Answer::Yes => break,
            Answer::No => {
                reporter.warn("aborted");
                return Ok(CleanupOutcome::Aborted);
            }
            Answer::Unrecognized => {}
        }
    }

    let mut removed = Vec::with_capacity(instances.len());
    let mut failed = 0;
    for inst in &instances {
        reporter.step(&format!("deleting droplet {} (ID: {})", inst.name(), inst.id()));
        match cloud.delete_instance(inst.id()).await {
            Ok(()) => removed.push(inst.id()),
            Err(e) => {
                failed += 1;
                reporter.warn(&format!("error deleting droplet {}: {e:#}", inst.id()));
            }
        }
    }
    let deleted = removed.len();
    reporter.success(&format!("deleted {deleted} droplet(s)"));
    sweep_firewalls(cloud, &removed, reporter).await;
    Ok(CleanupOutcome::Deleted { deleted, failed })
}
