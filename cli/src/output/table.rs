//! Job status table formatting. Pure functions; no terminal access.

use dotd_common::JobStatus;

/// Narrowest the name column ever gets.
pub const MIN_NAME_WIDTH: usize = 10;

const PROGRESS_WIDTH: usize = 7;
const RATE_WIDTH: usize = 11;
const ETA_WIDTH: usize = 8;
const PHASE_WIDTH: usize = 8;
const GAP: &str = "  ";

/// Width left for the name column on a terminal `total` columns wide.
#[must_use]
pub fn name_width(total: usize) -> usize {
    let fixed = PROGRESS_WIDTH + RATE_WIDTH + ETA_WIDTH + PHASE_WIDTH + GAP.len() * 4;
    total.saturating_sub(fixed).max(MIN_NAME_WIDTH)
}

/// Shorten `name` to at most `width` characters, marking the cut with `…`.
#[must_use]
pub fn truncate(name: &str, width: usize) -> String {
    if name.chars().count() <= width {
        return name.to_string();
    }
    let mut out: String = name.chars().take(width.saturating_sub(1)).collect();
    out.push('…');
    out
}

/// Transfer rate in binary units, e.g. `1.5 MiB/s`.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn human_rate(bytes_per_sec: i64) -> String {
    const UNITS: [&str; 5] = ["B/s", "KiB/s", "MiB/s", "GiB/s", "TiB/s"];
    let mut value = bytes_per_sec.max(0) as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{value:.0} {}", UNITS[unit])
    } else {
        format!("{value:.1} {}", UNITS[unit])
    }
}

/// Remaining time, or `∞` when the agent does not know.
#[must_use]
pub fn human_eta(eta: Option<u64>) -> String {
    let Some(secs) = eta else {
        return "∞".to_string();
    };
    let (d, h, m, s) = (secs / 86_400, secs / 3_600 % 24, secs / 60 % 60, secs % 60);
    match (d, h, m) {
        (0, 0, 0) => format!("{s}s"),
        (0, 0, _) => format!("{m}m{s:02}s"),
        (0, _, _) => format!("{h}h{m:02}m"),
        _ => format!("{d}d{h:02}h"),
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn percent(progress: f64) -> String {
    let tenths = (progress.clamp(0.0, 1.0) * 1000.0).floor() as u32;
    format!("{}.{}%", tenths / 10, tenths % 10)
}

fn row(name_w: usize, [name, done, rate, eta, phase]: [&str; 5]) -> String {
    let left = format!("{name:<name_w$}{GAP}{done:>PROGRESS_WIDTH$}{GAP}{rate:>RATE_WIDTH$}");
    format!("{left}{GAP}{eta:>ETA_WIDTH$}{GAP}{phase:<PHASE_WIDTH$}")
}

/// One table row per job, preceded by a header, fitted to `width` columns.
#[must_use]
pub fn format_job_table(jobs: &[JobStatus], width: usize) -> Vec<String> {
    let name_w = name_width(width);
    let mut lines = Vec::with_capacity(jobs.len() + 1);
    lines.push(row(name_w, ["NAME", "DONE", "RATE", "ETA", "STATE"]));
    for job in jobs {
        lines.push(row(
            name_w,
            [
                &truncate(&job.name, name_w),
                &percent(job.progress),
                &human_rate(job.dlspeed),
                &human_eta(job.eta_secs()),
                &job.state.phase().to_string(),
            ],
        ));
    }
    lines
}
