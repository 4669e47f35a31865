//! Remote instance model.

/// Name prefix of the firewall opened for each instance.
pub const FIREWALL_PREFIX: &str = "dotd-";

/// Name of the firewall opened for `instance_id`.
#[must_use]
pub fn firewall_name(instance_id: u64) -> String {
    format!("{FIREWALL_PREFIX}{instance_id}")
}

/// Immutable creation request derived from settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceSpec {
    /// Size class, e.g. `"s-1vcpu-1gb"`.
    pub size: String,
    /// Image slug, e.g. `"docker-20-04"`.
    pub image: String,
    pub name: String,
    pub region: String,
    /// Catalog name of the public key to install.
    pub ssh_key: String,
    /// Ownership tag used to find the instance again for bulk teardown.
    pub tag: String,
}

/// Lifecycle status as reported by the control plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstanceStatus {
    New,
    Active,
    Off,
    Archive,
    Terminated,
}

impl InstanceStatus {
    /// Parse the control plane's status string. Unknown values map to `New`.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        match raw {
            "active" => Self::Active,
            "off" => Self::Off,
            "archive" => Self::Archive,
            "terminated" => Self::Terminated,
            _ => Self::New,
        }
    }
}

impl std::fmt::Display for InstanceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::New => "new",
            Self::Active => "active",
            Self::Off => "off",
            Self::Archive => "archive",
            Self::Terminated => "terminated",
        };
        f.write_str(label)
    }
}

/// Handle to the leased remote machine.
///
/// Construction enforces that an `Active` instance always has an address:
/// an active report without one is downgraded to `New`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instance {
    id: u64,
    name: String,
    status: InstanceStatus,
    address: Option<String>,
}

impl Instance {
    #[must_use]
    pub fn new(
        id: u64,
        name: impl Into<String>,
        status: InstanceStatus,
        address: Option<String>,
    ) -> Self {
        let address = address.filter(|a| !a.trim().is_empty());
        let status = if status == InstanceStatus::Active && address.is_none() {
            InstanceStatus::New
        } else {
            status
        };
        Self {
            id,
            name: name.into(),
            status,
            address,
        }
    }

    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn status(&self) -> InstanceStatus {
        self.status
    }

    #[must_use]
    pub fn address(&self) -> Option<&str> {
        self.address.as_deref()
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status == InstanceStatus::Active
    }
}

/// One page of a paginated instance listing.
#[derive(Debug, Clone, Default)]
pub struct InstancePage {
    pub instances: Vec<Instance>,
    /// Page number to request next, `None` on the last page.
    pub next_page: Option<u32>,
}

/// A cloud firewall as listed by the control plane.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Firewall {
    pub id: String,
    pub name: String,
    /// Instances the firewall is currently attached to.
    pub instance_ids: Vec<u64>,
}

impl Firewall {
    /// Instance this firewall was opened for, if it is one of ours.
    #[must_use]
    pub fn owner(&self) -> Option<u64> {
        self.name.strip_prefix(FIREWALL_PREFIX)?.parse().ok()
    }

    /// One of ours whose instance is in `removed` or that no longer guards
    /// any instance.
    #[must_use]
    pub fn is_stale(&self, removed: &[u64]) -> bool {
        self.owner()
            .is_some_and(|id| self.instance_ids.is_empty() || removed.contains(&id))
    }
}
