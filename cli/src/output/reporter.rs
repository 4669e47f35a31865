//! `TerminalReporter`: presentation-layer implementation of `ProgressReporter`.
//!
//! - `step()` prints `"  → {message}"`
//! - `success()` prints `"  ✓ {message}"`
//! - `warn()` prints `"  ! {message}"`
//! - `jobs()` redraws the job table in place on a TTY, or prints it otherwise
//!
//! Everything except errors is suppressed when `ctx.quiet`.

use std::cell::RefCell;

use dotd_common::JobStatus;
use indicatif::ProgressBar;
use owo_colors::OwoColorize as _;

use crate::application::ports::ProgressReporter;
use crate::output::{OutputContext, progress, table};

/// Terminal progress reporter that wraps an `OutputContext`.
pub struct TerminalReporter<'a> {
    ctx: &'a OutputContext,
    live: RefCell<Option<ProgressBar>>,
}

impl<'a> TerminalReporter<'a> {
    /// Create a new `TerminalReporter` wrapping the given output context.
    #[must_use]
    pub fn new(ctx: &'a OutputContext) -> Self {
        Self {
            ctx,
            live: RefCell::new(None),
        }
    }

    /// Freeze the live job table so following lines print below it.
    fn settle(&self) {
        if let Some(pb) = self.live.borrow_mut().take() {
            progress::freeze(&pb);
        }
    }

    fn line(&self, marker: &str, style: owo_colors::Style, message: &str) {
        self.settle();
        if !self.ctx.quiet {
            println!("  {} {message}", marker.style(style));
        }
    }

    fn render_table(&self, jobs: &[JobStatus]) -> String {
        let lines = table::format_job_table(jobs, self.ctx.width().saturating_sub(4));
        let mut out = Vec::with_capacity(lines.len());
        let mut rows = lines.iter();
        if let Some(header) = rows.next() {
            out.push(format!("{}", header.style(self.ctx.styles.dim)));
        }
        for (row, job) in rows.zip(jobs) {
            out.push(format!("{}", row.style(self.ctx.styles.phase(job.state.phase()))));
        }
        out.join("\n")
    }
}

impl ProgressReporter for TerminalReporter<'_> {
    fn step(&self, message: &str) {
        self.line("→", self.ctx.styles.step, message);
    }

    fn success(&self, message: &str) {
        self.line("✓", self.ctx.styles.success, message);
    }

    fn warn(&self, message: &str) {
        self.line("!", self.ctx.styles.warning, message);
    }

    fn jobs(&self, jobs: &[JobStatus]) {
        if self.ctx.quiet {
            return;
        }
        let rendered = self.render_table(jobs);
        if self.ctx.show_progress() {
            let mut live = self.live.borrow_mut();
            match live.as_ref() {
                Some(pb) => pb.set_message(rendered),
                None => *live = Some(progress::spinner(&rendered)),
            }
        } else {
            println!("{rendered}");
        }
    }
}

impl Drop for TerminalReporter<'_> {
    fn drop(&mut self) {
        self.settle();
    }
}
