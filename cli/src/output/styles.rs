//! Output styles using owo-colors stylesheet pattern

use dotd_common::JobPhase;
use owo_colors::Style;

/// Centralized stylesheet for CLI output colors.
#[derive(Default, Clone)]
pub struct Styles {
    /// Success messages (green)
    pub success: Style,
    /// Warning messages (yellow)
    pub warning: Style,
    /// Error messages (red)
    pub error: Style,
    /// Step arrows (cyan)
    pub step: Style,
    /// Dimmed/secondary text
    pub dim: Style,
    /// Headers/section titles
    pub header: Style,
}

impl Styles {
    /// Apply colors to the stylesheet.
    pub fn colorize(&mut self) {
        self.success = Style::new().green();
        self.warning = Style::new().yellow();
        self.error = Style::new().red();
        self.step = Style::new().cyan();
        self.dim = Style::new().dimmed();
        self.header = Style::new().bold().cyan();
    }

    /// Style for a job's phase column.
    #[must_use]
    pub fn phase(&self, phase: JobPhase) -> Style {
        match phase {
            JobPhase::Fetching => self.step,
            JobPhase::Seeding => self.success,
            JobPhase::Stalled | JobPhase::Paused => self.warning,
            JobPhase::Error => self.error,
            JobPhase::Queued => self.dim,
        }
    }
}
