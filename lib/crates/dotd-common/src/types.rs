use serde::{Deserialize, Serialize};

/// ETA value the agent reports when a job has no usable estimate.
pub const ETA_UNKNOWN_SECS: i64 = 8_640_000;

/// Raw lifecycle tag reported by the download agent for a single job.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum JobState {
    #[serde(rename = "error")]
    Error,
    #[serde(rename = "missingFiles")]
    MissingFiles,
    #[serde(rename = "uploading")]
    Uploading,
    #[serde(rename = "pausedUP")]
    PausedUp,
    #[serde(rename = "stoppedUP")]
    StoppedUp,
    #[serde(rename = "queuedUP")]
    QueuedUp,
    #[serde(rename = "stalledUP")]
    StalledUp,
    #[serde(rename = "checkingUP")]
    CheckingUp,
    #[serde(rename = "forcedUP")]
    ForcedUp,
    #[serde(rename = "allocating")]
    Allocating,
    #[serde(rename = "downloading")]
    Downloading,
    #[serde(rename = "metaDL")]
    MetaDl,
    #[serde(rename = "forcedMetaDL")]
    ForcedMetaDl,
    #[serde(rename = "pausedDL")]
    PausedDl,
    #[serde(rename = "stoppedDL")]
    StoppedDl,
    #[serde(rename = "queuedDL")]
    QueuedDl,
    #[serde(rename = "stalledDL")]
    StalledDl,
    #[serde(rename = "checkingDL")]
    CheckingDl,
    #[serde(rename = "forcedDL")]
    ForcedDl,
    #[serde(rename = "checkingResumeData")]
    CheckingResumeData,
    #[serde(rename = "moving")]
    Moving,
    #[default]
    #[serde(rename = "unknown", other)]
    Unknown,
}

/// Coarse job lifecycle family used for display and completion checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobPhase {
    Queued,
    Fetching,
    Stalled,
    Seeding,
    Paused,
    Error,
}

impl JobState {
    /// Collapse the agent's tag into its lifecycle family.
    #[must_use]
    pub fn phase(self) -> JobPhase {
        match self {
            Self::Error | Self::MissingFiles => JobPhase::Error,
            Self::Uploading
            | Self::PausedUp
            | Self::StoppedUp
            | Self::QueuedUp
            | Self::StalledUp
            | Self::CheckingUp
            | Self::ForcedUp => JobPhase::Seeding,
            Self::Downloading
            | Self::ForcedDl
            | Self::MetaDl
            | Self::ForcedMetaDl
            | Self::Allocating
            | Self::CheckingDl
            | Self::CheckingResumeData
            | Self::Moving => JobPhase::Fetching,
            Self::StalledDl => JobPhase::Stalled,
            Self::PausedDl | Self::StoppedDl => JobPhase::Paused,
            Self::QueuedDl | Self::Unknown => JobPhase::Queued,
        }
    }

    /// `true` for every state in the uploading/seeding family.
    #[must_use]
    pub fn is_seeding(self) -> bool {
        self.phase() == JobPhase::Seeding
    }
}

impl std::fmt::Display for JobPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Queued => "queued",
            Self::Fetching => "fetching",
            Self::Stalled => "stalled",
            Self::Seeding => "seeding",
            Self::Paused => "paused",
            Self::Error => "error",
        };
        f.write_str(label)
    }
}

/// One entry of the agent's `GET /torrents/info` response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct JobStatus {
    pub name: String,
    /// Fraction in `[0, 1]`.
    pub progress: f64,
    /// Download rate in bytes per second.
    pub dlspeed: i64,
    /// Seconds remaining; [`ETA_UNKNOWN_SECS`] or negative when unknown.
    pub eta: i64,
    pub state: JobState,
    pub size: i64,
    pub downloaded: i64,
}

impl JobStatus {
    /// A job is finished once fully fetched or once the agent moved it
    /// into the seeding family.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.progress >= 1.0 || self.state.is_seeding()
    }

    /// Remaining time in seconds, or `None` when the agent has no estimate.
    #[must_use]
    pub fn eta_secs(&self) -> Option<u64> {
        if self.eta < 0 || self.eta >= ETA_UNKNOWN_SECS {
            return None;
        }
        u64::try_from(self.eta).ok()
    }
}
