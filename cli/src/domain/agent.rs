//! Download agent (qBittorrent in Docker) command and config rendering.
//!
//! Every function here is pure: it builds the shell text that the agent
//! controller sends through the remote command channel, or parses what
//! comes back.

use dotd_common::JobStatus;

use crate::domain::error::AgentError;

/// Container name used for start, stop and restart.
pub const CONTAINER_NAME: &str = "qbittorrent";
/// Container image repository; the tag comes from settings.
pub const IMAGE_REPO: &str = "linuxserver/qbittorrent";
/// Host directory bind-mounted as the agent's `/config`.
pub const HOST_CONFIG_ROOT: &str = "/root/config";
/// Agent config file path on the host.
pub const CONFIG_FILE: &str = "/root/config/qBittorrent/qBittorrent.conf";
/// Web UI / control API port, inside and outside the container.
pub const WEBUI_PORT: u16 = 8080;
/// Peer port, mapped for TCP and UDP.
pub const PEER_PORT: u16 = 6881;
/// Fixed Web UI login.
pub const WEBUI_USER: &str = "admin";
/// Cookie that carries the session token.
pub const SESSION_COOKIE: &str = "SID";

const CONTAINER_INCOMING: &str = "/downloads/incoming";
/// Form fields and cookies whose values never appear in logs.
const MASKED_FIELDS: [&str; 2] = ["password=", "SID="];
const MASK: &str = "***";
const CONTAINER_COMPLETED: &str = "/downloads/completed";

/// Opaque control API session token. Never persisted.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionToken(String);

impl SessionToken {
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SessionToken([REDACTED])")
    }
}

/// Wrap `value` in single quotes for a POSIX shell.
#[must_use]
pub fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}

fn api_url(path: &str) -> String {
    format!("http://localhost:{WEBUI_PORT}/api/v2/{path}")
}

fn cookie_arg(token: &SessionToken) -> String {
    shell_quote(&format!("{SESSION_COOKIE}={}", token.as_str()))
}

/// `mkdir -p` for the download directories and the config directory.
#[must_use]
pub fn mkdir_command(incoming: &str, completed: &str) -> String {
    format!(
        "mkdir -p {} {} {HOST_CONFIG_ROOT}/qBittorrent",
        shell_quote(incoming),
        shell_quote(completed)
    )
}

/// Render the agent's INI-style config file.
#[must_use]
pub fn render_config(password_digest: &str) -> String {
    format!(
        "[LegalNotice]\n\
         Accepted=true\n\
         \n\
         [BitTorrent]\n\
         Session\\TempPath={CONTAINER_INCOMING}\n\
         Session\\DefaultSavePath={CONTAINER_COMPLETED}\n\
         Session\\TempPathEnabled=true\n\
         \n\
         [Preferences]\n\
         Advanced\\DiskIOReadMode=DisableOSCache\n\
         Advanced\\DiskIOWriteMode=DisableOSCache\n\
         Advanced\\RecheckOnCompletion=true\n\
         WebUI\\Username={WEBUI_USER}\n\
         WebUI\\Password_PBKDF2=\"{password_digest}\""
    )
}

/// Write `content` to the agent config file through a quoted heredoc.
#[must_use]
pub fn write_config_command(content: &str) -> String {
    format!("cat <<'EOF' > {CONFIG_FILE}\n{content}\nEOF")
}

#[must_use]
pub fn pull_command(version: &str) -> String {
    let image = shell_quote(&format!("{IMAGE_REPO}:{version}"));
    format!("docker pull {image}")
}

/// Stop and remove any previous container; succeeds when none exists.
#[must_use]
pub fn stop_command() -> String {
    format!("docker stop {CONTAINER_NAME} || true && docker rm {CONTAINER_NAME} || true")
}

#[must_use]
pub fn run_command(incoming: &str, completed: &str, version: &str) -> String {
    [
        "docker run -d".to_string(),
        format!("--name={CONTAINER_NAME}"),
        "-e PUID=0".to_string(),
        "-e PGID=0".to_string(),
        "-e TZ=Etc/UTC".to_string(),
        format!("-e WEBUI_PORT={WEBUI_PORT}"),
        format!("-p {WEBUI_PORT}:{WEBUI_PORT}"),
        format!("-p {PEER_PORT}:{PEER_PORT}"),
        format!("-p {PEER_PORT}:{PEER_PORT}/udp"),
        volume(incoming, CONTAINER_INCOMING),
        volume(completed, CONTAINER_COMPLETED),
        format!("-v {HOST_CONFIG_ROOT}:/config"),
        "--restart unless-stopped".to_string(),
        shell_quote(&format!("{IMAGE_REPO}:{version}")),
    ]
    .join(" ")
}

fn volume(host: &str, container: &str) -> String {
    format!("-v {}", shell_quote(&format!("{host}:{container}")))
}

/// HEAD probe; prints response headers once the API is listening.
#[must_use]
pub fn liveness_command() -> String {
    format!("curl -s -I http://localhost:{WEBUI_PORT}")
}

#[must_use]
pub fn login_command(password: &str) -> String {
    format!(
        "curl -s -i -X POST --data-urlencode {} --data-urlencode {} {}",
        shell_quote(&format!("username={WEBUI_USER}")),
        shell_quote(&format!("password={password}")),
        api_url("auth/login")
    )
}

#[must_use]
pub fn add_job_command(token: &SessionToken, locator: &str) -> String {
    format!(
        "curl -s --cookie {} -X POST -F {} {}",
        cookie_arg(token),
        shell_quote(&format!("urls={locator}")),
        api_url("torrents/add")
    )
}

#[must_use]
pub fn status_command(token: &SessionToken) -> String {
    format!(
        "curl -s --cookie {} {}",
        cookie_arg(token),
        api_url("torrents/info")
    )
}

/// Extract the session token from a login response that includes headers.
///
/// Scans for a `Set-Cookie` line carrying the session cookie and takes the
/// text between `=` and the next `;`.
///
/// # Errors
///
/// Returns [`AgentError::AuthenticationFailed`] when no token is present.
pub fn parse_session_cookie(response: &str) -> Result<SessionToken, AgentError> {
    let marker = format!("{SESSION_COOKIE}=");
    response
        .lines()
        .map(str::trim)
        .filter(|line| line.to_ascii_lowercase().starts_with("set-cookie:"))
        .find_map(|line| {
            let (_, rest) = line.split_once(&marker)?;
            let value = rest.split(';').next().unwrap_or_default().trim();
            (!value.is_empty()).then(|| SessionToken::new(value))
        })
        .ok_or(AgentError::AuthenticationFailed)
}

/// Parse the `torrents/info` JSON array.
///
/// # Errors
///
/// Returns [`AgentError::MalformedStatus`] for anything that is not a JSON
/// array of job records, including empty output.
pub fn parse_status(body: &str) -> Result<Vec<JobStatus>, AgentError> {
    serde_json::from_str(body.trim()).map_err(|e| AgentError::MalformedStatus(e.to_string()))
}

/// Copy of `command` safe to log: the values of password fields and
/// session cookies are replaced with `***`.
///
/// A masked value runs to the end of its single-quoted shell word.
#[must_use]
pub fn redact(command: &str) -> String {
    let mut out = String::with_capacity(command.len());
    let mut rest = command;
    while let Some((at, field)) = MASKED_FIELDS
        .iter()
        .filter_map(|field| rest.find(field).map(|at| (at, *field)))
        .min_by_key(|(at, _)| *at)
    {
        let value_start = at + field.len();
        out.push_str(&rest[..value_start]);
        out.push_str(MASK);
        let value = &rest[value_start..];
        rest = &value[closing_quote(value)..];
    }
    out.push_str(rest);
    out
}

/// Offset of the quote that ends a single-quoted word, skipping the `'\''`
/// sequences [`shell_quote`] emits. Without one, the rest of the line.
fn closing_quote(value: &str) -> usize {
    let mut offset = 0;
    while let Some(found) = value[offset..].find(['\'', '\n']) {
        let at = offset + found;
        if value[at..].starts_with(r"'\''") {
            offset = at + 4;
        } else {
            return at;
        }
    }
    value.len()
}

/// Web UI address shown to the operator after submission.
#[must_use]
pub fn webui_url(address: &str) -> String {
    format!("http://{address}:{WEBUI_PORT}")
}
