//! Shared mock infrastructure for unit tests.
//!
//! In-memory implementations of every port so each test file drives the
//! services without network or ssh access.

#![allow(clippy::expect_used)]

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::path::Path;
use std::time::Duration;

use anyhow::Result;
use dotd_cli::application::ports::{
    CloudProvider, FileSync, ProgressReporter, Prompt, RemoteShell, ShellConnector,
};
use dotd_cli::application::services::orchestrator::RunPolicy;
use dotd_cli::domain::instance::firewall_name;
use dotd_cli::domain::{
    CloudError, Firewall, Instance, InstancePage, InstanceSpec, InstanceStatus, RetryPolicy,
    Settings,
};
use dotd_common::JobStatus;

pub const ADDRESS: &str = "203.0.113.10";
pub const INSTANCE_ID: u64 = 42;
pub const LOGIN_OK: &str = "HTTP/1.1 200 OK\r\nset-cookie: SID=tok123; HttpOnly; path=/\r\n\r\nOk.";

pub const SETTINGS_YAML: &str = "\
size: s-1vcpu-1gb
image_slug: docker-20-04
droplet_name: torrent-box
region: ams3
ssh_key: laptop
ssh_private_key_path: /home/op/.ssh/id_ed25519
download_dir: /srv/downloads
digital_ocean_pat: dop_v1_test
qbittorrent_version: 4.6.0
qbittorrent_password: s3cret
droplet_tag: dotd
qbit:
  incoming_dir: /root/incoming
  completed_dir: /root/completed
";

pub fn settings() -> Settings {
    serde_yaml::from_str(SETTINGS_YAML).expect("valid settings")
}

/// Policy with every wait collapsed to zero.
pub fn instant_policy(settings: &Settings) -> RunPolicy {
    RunPolicy {
        instance_active: RetryPolicy::INSTANCE_ACTIVE.with_interval(Duration::ZERO),
        settle: Duration::ZERO,
        liveness: RetryPolicy::AGENT_LIVENESS.with_interval(Duration::ZERO),
        monitor: RetryPolicy::MONITOR.with_interval(Duration::ZERO),
        ..RunPolicy::from_settings(settings)
    }
}

pub fn running(id: u64, address: &str) -> Instance {
    Instance::new(
        id,
        format!("box-{id}"),
        InstanceStatus::Active,
        Some(address.to_string()),
    )
}

// ── Remote shell ──────────────────────────────────────────────────────────────

/// Remote shell answering by substring. Each needle owns a reply queue whose
/// last entry repeats once the rest are drained.
#[derive(Default)]
pub struct ScriptedShell {
    rules: RefCell<Vec<(String, VecDeque<String>)>>,
    pub commands: RefCell<Vec<String>>,
    /// Addresses the connector opened this shell against.
    pub hosts: RefCell<Vec<String>>,
}

impl ScriptedShell {
    /// An agent that answers the liveness check and accepts the login.
    pub fn healthy() -> Self {
        Self::default()
            .on("curl -s -I", &["HTTP/1.1 200 OK"])
            .on("auth/login", &[LOGIN_OK])
    }

    pub fn on(self, needle: &str, replies: &[&str]) -> Self {
        self.rules.borrow_mut().push((
            needle.to_string(),
            replies.iter().map(ToString::to_string).collect(),
        ));
        self
    }

    pub fn count(&self, needle: &str) -> usize {
        self.commands
            .borrow()
            .iter()
            .filter(|c| c.contains(needle))
            .count()
    }

    /// Index of the last command containing `needle`.
    pub fn position(&self, needle: &str) -> Option<usize> {
        self.commands
            .borrow()
            .iter()
            .rposition(|c| c.contains(needle))
    }
}

impl RemoteShell for ScriptedShell {
    async fn execute(&self, command: &str) -> String {
        self.commands.borrow_mut().push(command.to_string());
        let mut rules = self.rules.borrow_mut();
        let Some((_, replies)) = rules.iter_mut().find(|(n, _)| command.contains(n.as_str()))
        else {
            return String::new();
        };
        let reply = if replies.len() > 1 {
            replies.pop_front()
        } else {
            replies.front().cloned()
        };
        reply.unwrap_or_default()
    }
}

pub struct Connector<'a>(pub &'a ScriptedShell);

impl<'a> ShellConnector for Connector<'a> {
    type Shell = &'a ScriptedShell;

    fn connect(&self, address: &str) -> Self::Shell {
        self.0.hosts.borrow_mut().push(address.to_string());
        self.0
    }
}

// ── Cloud ─────────────────────────────────────────────────────────────────────

/// In-memory cloud. `get_instance` replays `status_script` and reports `New`
/// once it runs out; active instances sit at [`ADDRESS`].
#[derive(Default)]
pub struct FakeCloud {
    pub instances: RefCell<Vec<Instance>>,
    pub status_script: RefCell<VecDeque<InstanceStatus>>,
    pub created: RefCell<Vec<(InstanceSpec, String)>>,
    pub deleted: RefCell<Vec<u64>>,
    pub fail_deletes: Cell<bool>,
    /// Zero lists everything on one page.
    pub page_size: Cell<usize>,
    pub opened: RefCell<Vec<(u64, Vec<u16>)>>,
    pub firewalls: RefCell<Vec<Firewall>>,
    pub removed_firewalls: RefCell<Vec<String>>,
    pub fail_firewalls: Cell<bool>,
}

impl FakeCloud {
    pub fn with_instances(instances: Vec<Instance>) -> Self {
        let cloud = Self::default();
        *cloud.instances.borrow_mut() = instances;
        cloud
    }

    /// A cloud whose new droplet turns active on the second status check.
    pub fn booting() -> Self {
        let cloud = Self::default();
        cloud
            .status_script
            .borrow_mut()
            .extend([InstanceStatus::New, InstanceStatus::Active]);
        cloud
    }

    /// Register a firewall as if an earlier run had opened it.
    pub fn with_firewall(self, id: &str, name: &str, instance_ids: &[u64]) -> Self {
        self.firewalls.borrow_mut().push(Firewall {
            id: id.to_string(),
            name: name.to_string(),
            instance_ids: instance_ids.to_vec(),
        });
        self
    }

    pub fn firewall_ids(&self) -> Vec<String> {
        self.firewalls
            .borrow()
            .iter()
            .map(|f| f.id.clone())
            .collect()
    }
}

impl CloudProvider for FakeCloud {
    async fn key_fingerprint(&self, name: &str) -> Result<String> {
        if name == "missing" {
            return Err(CloudError::KeyNotFound(name.to_string()).into());
        }
        Ok(format!("fp:{name}"))
    }

    async fn create_instance(&self, spec: &InstanceSpec, fingerprint: &str) -> Result<Instance> {
        self.created
            .borrow_mut()
            .push((spec.clone(), fingerprint.to_string()));
        let inst = Instance::new(INSTANCE_ID, spec.name.clone(), InstanceStatus::New, None);
        self.instances.borrow_mut().push(inst.clone());
        Ok(inst)
    }

    async fn get_instance(&self, id: u64) -> Result<Instance> {
        let status = self
            .status_script
            .borrow_mut()
            .pop_front()
            .unwrap_or(InstanceStatus::New);
        let address = (status == InstanceStatus::Active).then(|| ADDRESS.to_string());
        Ok(Instance::new(id, "torrent-box", status, address))
    }

    async fn list_instances(&self, _tag: Option<&str>, page: u32) -> Result<InstancePage> {
        let all = self.instances.borrow();
        let size = match self.page_size.get() {
            0 => all.len().max(1),
            n => n,
        };
        let start = (page as usize - 1) * size;
        let instances: Vec<Instance> = all.iter().skip(start).take(size).cloned().collect();
        let next_page = (start + size < all.len()).then_some(page + 1);
        Ok(InstancePage {
            instances,
            next_page,
        })
    }

    async fn delete_instance(&self, id: u64) -> Result<()> {
        if self.fail_deletes.get() {
            anyhow::bail!("cloud API returned 500: boom");
        }
        self.deleted.borrow_mut().push(id);
        for firewall in self.firewalls.borrow_mut().iter_mut() {
            firewall.instance_ids.retain(|attached| *attached != id);
        }
        Ok(())
    }

    async fn allow_inbound(&self, instance_id: u64, ports: &[u16]) -> Result<String> {
        if self.fail_firewalls.get() {
            anyhow::bail!("cloud API returned 403: firewalls disabled for this account");
        }
        self.opened.borrow_mut().push((instance_id, ports.to_vec()));
        let id = format!("fw-{instance_id}");
        self.firewalls.borrow_mut().push(Firewall {
            id: id.clone(),
            name: firewall_name(instance_id),
            instance_ids: vec![instance_id],
        });
        Ok(id)
    }

    async fn list_firewalls(&self) -> Result<Vec<Firewall>> {
        if self.fail_firewalls.get() {
            anyhow::bail!("cloud API returned 403: firewalls disabled for this account");
        }
        Ok(self.firewalls.borrow().clone())
    }

    async fn delete_firewall(&self, id: &str) -> Result<()> {
        if self.fail_deletes.get() {
            anyhow::bail!("cloud API returned 500: boom");
        }
        self.firewalls.borrow_mut().retain(|f| f.id != id);
        self.removed_firewalls.borrow_mut().push(id.to_string());
        Ok(())
    }
}

// ── Sync ──────────────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingSync {
    pub sources: RefCell<Vec<String>>,
    pub fail: Cell<bool>,
}

impl FileSync for RecordingSync {
    async fn sync_dir(&self, source: &str, _destination: &Path, _key: &Path) -> Result<()> {
        self.sources.borrow_mut().push(source.to_string());
        if self.fail.get() {
            anyhow::bail!("rsync exited with 23");
        }
        Ok(())
    }
}

// ── Reporter / prompt ─────────────────────────────────────────────────────────

/// Reporter that records every message and the size of each job table.
#[derive(Default)]
pub struct RecordingReporter {
    pub lines: RefCell<Vec<String>>,
    pub tables: RefCell<Vec<usize>>,
}

impl RecordingReporter {
    pub fn saw(&self, needle: &str) -> bool {
        self.lines.borrow().iter().any(|l| l.contains(needle))
    }
}

impl ProgressReporter for RecordingReporter {
    fn step(&self, message: &str) {
        self.lines.borrow_mut().push(format!("step: {message}"));
    }
    fn success(&self, message: &str) {
        self.lines.borrow_mut().push(format!("ok: {message}"));
    }
    fn warn(&self, message: &str) {
        self.lines.borrow_mut().push(format!("warn: {message}"));
    }
    fn jobs(&self, jobs: &[JobStatus]) {
        self.tables.borrow_mut().push(jobs.len());
    }
}

/// Prompt replaying canned answers; errors once they run out.
pub struct ScriptedPrompt {
    answers: RefCell<VecDeque<String>>,
    pub asked: Cell<usize>,
}

impl ScriptedPrompt {
    pub fn new(answers: &[&str]) -> Self {
        Self {
            answers: RefCell::new(answers.iter().map(ToString::to_string).collect()),
            asked: Cell::new(0),
        }
    }
}

impl Prompt for ScriptedPrompt {
    fn ask(&self, _message: &str) -> Result<String> {
        self.asked.set(self.asked.get() + 1);
        self.answers
            .borrow_mut()
            .pop_front()
            .ok_or_else(|| anyhow::anyhow!("no input provided"))
    }
}
