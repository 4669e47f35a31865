//! DigitalOcean v2 REST client implementing the `CloudProvider` port.

use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::{Client, RequestBuilder, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::application::ports::CloudProvider;
use crate::domain::instance::firewall_name;
use crate::domain::{CloudError, Firewall, Instance, InstancePage, InstanceSpec, InstanceStatus};

pub const DEFAULT_API_BASE: &str = "https://api.digitalocean.com";

const PER_PAGE: u32 = 200;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

// ── Wire types ───────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct DropletEnvelope {
    droplet: Droplet,
}

#[derive(Debug, Deserialize)]
struct DropletList {
    #[serde(default)]
    droplets: Vec<Droplet>,
    #[serde(default)]
    links: Links,
}

#[derive(Debug, Deserialize)]
struct Droplet {
    id: u64,
    name: String,
    status: String,
    #[serde(default)]
    networks: Networks,
}

#[derive(Debug, Default, Deserialize)]
struct Networks {
    #[serde(default)]
    v4: Vec<NetworkV4>,
}

#[derive(Debug, Deserialize)]
struct NetworkV4 {
    ip_address: String,
    #[serde(rename = "type")]
    kind: String,
}

impl Droplet {
    fn public_ipv4(&self) -> Option<String> {
        self.networks
            .v4
            .iter()
            .find(|n| n.kind == "public")
            .map(|n| n.ip_address.clone())
    }

    fn into_instance(self) -> Instance {
        let address = self.public_ipv4();
        Instance::new(
            self.id,
            self.name,
            InstanceStatus::parse(&self.status),
            address,
        )
    }
}

#[derive(Debug, Default, Deserialize)]
struct Links {
    #[serde(default)]
    pages: Option<Pages>,
}

#[derive(Debug, Default, Deserialize)]
struct Pages {
    next: Option<String>,
}

#[derive(Debug, Deserialize)]
struct KeyList {
    #[serde(default)]
    ssh_keys: Vec<SshKey>,
    #[serde(default)]
    links: Links,
}

#[derive(Debug, Deserialize)]
struct SshKey {
    name: String,
    fingerprint: String,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    message: String,
}

#[derive(Debug, Serialize)]
struct CreateDroplet<'a> {
    name: &'a str,
    region: &'a str,
    size: &'a str,
    image: &'a str,
    ssh_keys: [&'a str; 1],
    tags: Vec<&'a str>,
}

impl<'a> CreateDroplet<'a> {
    fn from_spec(spec: &'a InstanceSpec, fingerprint: &'a str) -> Self {
        Self {
            name: &spec.name,
            region: &spec.region,
            size: &spec.size,
            image: &spec.image,
            ssh_keys: [fingerprint],
            tags: if spec.tag.is_empty() {
                Vec::new()
            } else {
                vec![spec.tag.as_str()]
            },
        }
    }
}

#[derive(Debug, Deserialize)]
struct FirewallEnvelope {
    firewall: FirewallBody,
}

#[derive(Debug, Deserialize)]
struct FirewallList {
    #[serde(default)]
    firewalls: Vec<FirewallBody>,
    #[serde(default)]
    links: Links,
}

#[derive(Debug, Deserialize)]
struct FirewallBody {
    id: String,
    name: String,
    #[serde(default)]
    droplet_ids: Vec<u64>,
}

impl From<FirewallBody> for Firewall {
    fn from(body: FirewallBody) -> Self {
        Self {
            id: body.id,
            name: body.name,
            instance_ids: body.droplet_ids,
        }
    }
}

#[derive(Debug, Serialize)]
struct CreateFirewall {
    name: String,
    inbound_rules: Vec<Rule>,
    outbound_rules: Vec<Rule>,
    droplet_ids: [u64; 1],
}

#[derive(Debug, Serialize)]
struct Rule {
    protocol: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    ports: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    sources: Option<Addresses>,
    #[serde(skip_serializing_if = "Option::is_none")]
    destinations: Option<Addresses>,
}

#[derive(Debug, Serialize)]
struct Addresses {
    addresses: [&'static str; 2],
}

const EVERYWHERE: Addresses = Addresses {
    addresses: ["0.0.0.0/0", "::/0"],
};

impl CreateFirewall {
    fn for_droplet(id: u64, ports: &[u16]) -> Self {
        let inbound_rules = ports
            .iter()
            .flat_map(|port| {
                ["tcp", "udp"].map(|protocol| Rule {
                    protocol,
                    ports: Some(port.to_string()),
                    sources: Some(EVERYWHERE),
                    destinations: None,
                })
            })
            .collect();
        let outbound_rules = ["tcp", "udp", "icmp"]
            .into_iter()
            .map(|protocol| Rule {
                protocol,
                ports: (protocol != "icmp").then(|| "all".to_string()),
                sources: None,
                destinations: Some(EVERYWHERE),
            })
            .collect();
        Self {
            name: firewall_name(id),
            inbound_rules,
            outbound_rules,
            droplet_ids: [id],
        }
    }
}

/// Extract the `page` query parameter from a `links.pages.next` URL.
fn page_param(url: &str) -> Option<u32> {
    let (_, query) = url.split_once('?')?;
    query
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(key, _)| *key == "page")
        .and_then(|(_, value)| value.parse().ok())
}

impl Links {
    fn next_page(&self) -> Option<u32> {
        self.pages.as_ref()?.next.as_deref().and_then(page_param)
    }
}

// ── Client ───────────────────────────────────────────────────────────────────

/// Authenticated DigitalOcean API client.
pub struct DigitalOceanClient {
    client: Client,
    base_url: String,
    token: SecretString,
}

impl DigitalOceanClient {
    /// Build a client against the public API.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(token: SecretString) -> Result<Self> {
        Self::with_base_url(token, DEFAULT_API_BASE)
    }

    /// Build a client against an alternative endpoint.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn with_base_url(token: SecretString, base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(concat!("dotd/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("building HTTP client")?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/v2/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn authed(&self, request: RequestBuilder) -> RequestBuilder {
        request.bearer_auth(self.token.expose_secret())
    }

    async fn send(&self, request: RequestBuilder) -> Result<(StatusCode, String)> {
        let response = self
            .authed(request)
            .send()
            .await
            .context("DigitalOcean API request failed")?;
        let status = response.status();
        let body = response
            .text()
            .await
            .context("reading DigitalOcean API response")?;
        tracing::debug!(%status, "DigitalOcean API response");
        Ok((status, body))
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let (status, body) = self.send(request).await?;
        if !status.is_success() {
            return Err(api_error(status, &body).into());
        }
        serde_json::from_str(&body).context("parsing DigitalOcean API response")
    }
}

/// How a DELETE request ended when it did not fail.
#[derive(Debug, PartialEq, Eq)]
enum Deletion {
    Deleted,
    AlreadyGone,
}

/// Classify a DELETE response. A missing resource counts as deleted.
fn deletion_result(status: StatusCode, body: &str) -> Result<Deletion, CloudError> {
    if status.is_success() {
        Ok(Deletion::Deleted)
    } else if status == StatusCode::NOT_FOUND {
        Ok(Deletion::AlreadyGone)
    } else {
        Err(api_error(status, body))
    }
}

fn api_error(status: StatusCode, body: &str) -> CloudError {
    let message = serde_json::from_str::<ApiErrorBody>(body)
        .map(|b| b.message)
        .unwrap_or_else(|_| body.trim().to_string());
    CloudError::Api {
        status: status.as_u16(),
        message,
    }
}

impl CloudProvider for DigitalOceanClient {
    async fn key_fingerprint(&self, name: &str) -> Result<String> {
        let mut page = 1;
        loop {
            let url = self.url("account/keys");
            let list: KeyList = self
                .send_json(
                    self.client
                        .get(&url)
                        .query(&[("page", page), ("per_page", PER_PAGE)]),
                )
                .await?;
            if let Some(key) = list.ssh_keys.into_iter().find(|k| k.name == name) {
                return Ok(key.fingerprint);
            }
            match list.links.next_page() {
                Some(next) => page = next,
                None => return Err(CloudError::KeyNotFound(name.to_string()).into()),
            }
        }
    }

    async fn create_instance(
        &self,
        spec: &InstanceSpec,
        key_fingerprint: &str,
    ) -> Result<Instance> {
        let body = CreateDroplet::from_spec(spec, key_fingerprint);
        let created: DropletEnvelope = self
            .send_json(self.client.post(self.url("droplets")).json(&body))
            .await?;
        Ok(created.droplet.into_instance())
    }

    async fn get_instance(&self, id: u64) -> Result<Instance> {
        let (status, body) = self
            .send(self.client.get(self.url(&format!("droplets/{id}"))))
            .await?;
        if status == StatusCode::NOT_FOUND {
            return Err(CloudError::InstanceNotFound(id).into());
        }
        if !status.is_success() {
            return Err(api_error(status, &body).into());
        }
        let envelope: DropletEnvelope =
            serde_json::from_str(&body).context("parsing droplet response")?;
        Ok(envelope.droplet.into_instance())
    }

    async fn list_instances(&self, tag: Option<&str>, page: u32) -> Result<InstancePage> {
        let mut request = self
            .client
            .get(self.url("droplets"))
            .query(&[("page", page), ("per_page", PER_PAGE)]);
        if let Some(tag) = tag {
            request = request.query(&[("tag_name", tag)]);
        }
        let list: DropletList = self.send_json(request).await?;
        let next_page = list.links.next_page();
        Ok(InstancePage {
            instances: list.droplets.into_iter().map(Droplet::into_instance).collect(),
            next_page,
        })
    }

    async fn delete_instance(&self, id: u64) -> Result<()> {
        let (status, body) = self
            .send(self.client.delete(self.url(&format!("droplets/{id}"))))
            .await?;
        if deletion_result(status, &body)? == Deletion::AlreadyGone {
            tracing::debug!(id, "droplet already gone");
        }
        Ok(())
    }

    async fn allow_inbound(&self, instance_id: u64, ports: &[u16]) -> Result<String> {
        let firewall = CreateFirewall::for_droplet(instance_id, ports);
        let created: FirewallEnvelope = self
            .send_json(self.client.post(self.url("firewalls")).json(&firewall))
            .await?;
        Ok(created.firewall.id)
    }

    async fn list_firewalls(&self) -> Result<Vec<Firewall>> {
        let mut firewalls = Vec::new();
        let mut page = 1;
        loop {
            let list: FirewallList = self
                .send_json(
                    self.client
                        .get(self.url("firewalls"))
                        .query(&[("page", page), ("per_page", PER_PAGE)]),
                )
                .await?;
            firewalls.extend(list.firewalls.into_iter().map(Firewall::from));
            match list.links.next_page() {
                Some(next) => page = next,
                None => return Ok(firewalls),
            }
        }
    }

    async fn delete_firewall(&self, id: &str) -> Result<()> {
        let (status, body) = self
            .send(self.client.delete(self.url(&format!("firewalls/{id}"))))
            .await?;
        if deletion_result(status, &body)? == Deletion::AlreadyGone {
            tracing::debug!(id, "firewall already gone");
        }
        Ok(())
    }
}
