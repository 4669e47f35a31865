//! Port trait definitions for the Application layer.
//!
//! Ports are the interfaces (contracts) that infrastructure must fulfill.
//! This file imports only from `crate::domain` and `dotd_common`, never from
//! `crate::infra`, `crate::commands`, or `crate::output`.

use std::path::Path;
use std::process::Output;

use anyhow::Result;
use dotd_common::JobStatus;

use crate::domain::{Firewall, Instance, InstancePage, InstanceSpec};

// ── Command Runner Port ───────────────────────────────────────────────────────

/// Abstracts process execution so infrastructure can be swapped or mocked.
#[allow(async_fn_in_trait)]
pub trait CommandRunner {
    /// Run a program and capture its output.
    ///
    /// Implementations should delegate to `run_with_timeout` using the
    /// instance's configured default timeout.
    async fn run(&self, program: &str, args: &[&str]) -> Result<Output>;
    /// Run a program with a custom timeout override.
    ///
    /// # Errors
    ///
    /// Returns an error if the process cannot be spawned or exceeds `timeout`.
    /// On timeout, the child process must be killed (not left orphaned).
    async fn run_with_timeout(
        &self,
        program: &str,
        args: &[&str],
        timeout: std::time::Duration,
    ) -> Result<Output>;
    /// Run a program with inherited stdio and return only its exit status.
    async fn run_status(&self, program: &str, args: &[&str]) -> Result<std::process::ExitStatus>;
}

// ── Remote Command Channel ────────────────────────────────────────────────────

/// One authenticated shell session per call against a single remote host.
///
/// Never fails: connection or session errors are logged and an empty string
/// is returned. Callers must treat empty output as ambiguous.
#[allow(async_fn_in_trait)]
pub trait RemoteShell {
    /// Execute `command` and return its captured stdout.
    async fn execute(&self, command: &str) -> String;
}

impl<T: RemoteShell + ?Sized> RemoteShell for &T {
    async fn execute(&self, command: &str) -> String {
        (**self).execute(command).await
    }
}

/// Opens a [`RemoteShell`] once the instance address is known.
pub trait ShellConnector {
    type Shell: RemoteShell;

    /// Bind a command channel to `address`.
    fn connect(&self, address: &str) -> Self::Shell;
}

// ── Cloud Control Plane ───────────────────────────────────────────────────────

/// Cloud provider operations needed for one instance lease.
#[allow(async_fn_in_trait)]
pub trait CloudProvider {
    /// Resolve a public key's catalog name to its fingerprint.
    async fn key_fingerprint(&self, name: &str) -> Result<String>;
    /// Submit a creation request; the returned instance is usually `New`.
    async fn create_instance(&self, spec: &InstanceSpec, key_fingerprint: &str) -> Result<Instance>;
    /// Current status and address of an instance.
    async fn get_instance(&self, id: u64) -> Result<Instance>;
    /// One page of instances, optionally filtered by ownership tag.
    async fn list_instances(&self, tag: Option<&str>, page: u32) -> Result<InstancePage>;
    /// Delete an instance. Deleting an instance that no longer exists succeeds.
    async fn delete_instance(&self, id: u64) -> Result<()>;
    /// Open a firewall allowing inbound traffic on `ports` for the instance
    /// and return the firewall id.
    async fn allow_inbound(&self, instance_id: u64, ports: &[u16]) -> Result<String>;
    /// Every firewall in the account, across all pages.
    async fn list_firewalls(&self) -> Result<Vec<Firewall>>;
    /// Delete a firewall. Deleting a firewall that no longer exists succeeds.
    async fn delete_firewall(&self, id: &str) -> Result<()>;
}

// ── Bulk Transfer ─────────────────────────────────────────────────────────────

/// Opaque directory sync from the remote host to the local machine.
#[allow(async_fn_in_trait)]
pub trait FileSync {
    /// Copy `source` (`user@host:dir`) into `destination`, streaming progress
    /// to the console.
    async fn sync_dir(&self, source: &str, destination: &Path, private_key: &Path) -> Result<()>;
}

// ── Progress Reporting Port ───────────────────────────────────────────────────

/// Abstracts progress reporting so services can emit events without
/// depending on the Presentation layer. Sync trait; no async needed.
pub trait ProgressReporter {
    /// Emit an in-progress step message.
    fn step(&self, message: &str);
    /// Emit a success message.
    fn success(&self, message: &str);
    /// Emit a warning message.
    fn warn(&self, message: &str);
    /// Render the latest job snapshot. Display only.
    fn jobs(&self, jobs: &[JobStatus]);
}

// ── Operator Prompt ───────────────────────────────────────────────────────────

/// Reads one line of operator input.
pub trait Prompt {
    /// Show `message` and return the raw answer.
    ///
    /// # Errors
    ///
    /// Returns an error if the terminal cannot be read (e.g. no TTY, EOF).
    fn ask(&self, message: &str) -> Result<String>;
}
