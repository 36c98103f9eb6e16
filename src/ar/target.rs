use std::future::Future;

use serde::Deserialize;

use crate::errors::{Error, Result};
use crate::scene::NodeHandle;

/// What the target manager reports about a registered target.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TargetDescriptor {
    #[serde(default, alias = "targetUid", alias = "id")]
    pub uid: String,
    #[serde(default)]
    pub name: Option<String>,
    /// Physical width of the reference image, in millimeters
    #[serde(default)]
    pub width: Option<f32>,
    #[serde(default)]
    pub height: Option<f32>,
}

impl TargetDescriptor {
    #[must_use]
    pub fn new(uid: &str) -> Self {
        Self {
            uid: uid.to_string(),
            name: None,
            width: None,
            height: None,
        }
    }

    /// The last non-empty path segment of `uri`, used when the service does
    /// not echo a uid.
    #[must_use]
    pub fn uid_from_uri(uri: &str) -> Option<String> {
        let path = uri.split(['?', '#']).next().unwrap_or(uri);
        path.rsplit('/').find(|s| !s.is_empty()).map(str::to_string)
    }
}

/// A registered target and the scene node that follows it.
#[derive(Debug, Clone)]
pub struct TrackingTarget {
    pub descriptor: TargetDescriptor,
    pub node: NodeHandle,
}

impl TrackingTarget {
    #[inline]
    #[must_use]
    pub fn uid(&self) -> &str {
        &self.descriptor.uid
    }
}

/// Remote service that turns a target URI into a trackable target.
pub trait TargetRegistry {
    fn add_target(&self, uri: &str) -> impl Future<Output = Result<TargetDescriptor>>;
}

/// Registers targets by fetching their descriptor from the target manager.
pub struct HttpTargetRegistry {
    client: reqwest::Client,
}

impl Default for HttpTargetRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpTargetRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self { client: reqwest::Client::new() }
    }

    #[must_use]
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

/// Parses a descriptor body, filling in the uid from `uri` when absent.
pub fn parse_descriptor(uri: &str, body: &[u8]) -> Result<TargetDescriptor> {
    let mut descriptor: TargetDescriptor = serde_json::from_slice(body)?;
    if descriptor.uid.is_empty() {
        descriptor.uid = TargetDescriptor::uid_from_uri(uri)
            .ok_or_else(|| Error::TargetRegistration(format!("no target uid in '{uri}'")))?;
    }
    Ok(descriptor)
}

impl TargetRegistry for HttpTargetRegistry {
    async fn add_target(&self, uri: &str) -> Result<TargetDescriptor> {
        let url = url::Url::parse(uri)?;
        let resp = self.client.get(url).send().await?;
        if !resp.status().is_success() {
            return Err(Error::HttpResponse {
                status: resp.status().as_u16(),
                url: uri.to_string(),
            });
        }
        let body = resp.bytes().await?;
        let descriptor = parse_descriptor(uri, &body)?;
        log::info!("Registered target {}", descriptor.uid);
        Ok(descriptor)
    }
}
