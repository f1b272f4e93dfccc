//! Best-effort IP geolocation for audit records.
//!
//! Local addresses are classified without any network traffic. Public
//! addresses are looked up against an ip-api.com compatible endpoint under a
//! hard timeout; every failure degrades to [`UNKNOWN_LOCATION`].

use reqwest::Client;
use serde::Deserialize;
use std::net::IpAddr;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, instrument};

pub const LOCAL_NETWORK: &str = "Local Network";
pub const UNKNOWN_LOCATION: &str = "Unknown Location";
pub const DEFAULT_GEO_URL: &str = "http://ip-api.com";
pub const DEFAULT_GEO_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IpClass {
    Local,
    Public,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GeoRecord {
    pub ip: String,
    pub classification: IpClass,
    pub location: String,
}

#[derive(Deserialize)]
struct IpApiResponse {
    status: String,
    #[serde(default)]
    city: String,
    #[serde(default, rename = "regionName")]
    region_name: String,
    #[serde(default)]
    country: String,
}

/// Classify an address string. Unparsable input (including `unknown`) is
/// treated as public so it never short-circuits to "Local Network".
#[must_use]
pub fn classify(ip: &str) -> IpClass {
    let ip = ip.trim();
    if ip.eq_ignore_ascii_case("localhost") {
        return IpClass::Local;
    }
    match ip.parse::<IpAddr>() {
        Ok(IpAddr::V4(v4)) => {
            if v4.is_loopback() || v4.is_private() || v4.is_link_local() || v4.is_unspecified() {
                IpClass::Local
            } else {
                IpClass::Public
            }
        }
        Ok(IpAddr::V6(v6)) => {
            if let Some(mapped) = v6.to_ipv4_mapped() {
                return classify(&mapped.to_string());
            }
            let first = v6.segments()[0];
            let unique_local = (first & 0xfe00) == 0xfc00;
            let link_local = (first & 0xffc0) == 0xfe80;
            if v6.is_loopback() || v6.is_unspecified() || unique_local || link_local {
                IpClass::Local
            } else {
                IpClass::Public
            }
        }
        Err(_) => IpClass::Public,
    }
}

#[derive(Clone, Debug)]
pub struct GeoResolver {
    client: Client,
    base_url: String,
    timeout: Duration,
}

impl GeoResolver {
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(base_url: &str, lookup_timeout: Duration) -> reqwest::Result<Self> {
        let client = Client::builder()
            .user_agent(crate::APP_USER_AGENT)
            .timeout(lookup_timeout)
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout: lookup_timeout,
        })
    }

    /// Resolve an IP to a coarse location. Never fails.
    #[instrument(skip(self))]
    pub async fn resolve(&self, ip: &str) -> GeoRecord {
        let ip = ip.trim().to_string();
        if classify(&ip) == IpClass::Local {
            return GeoRecord {
                ip,
                classification: IpClass::Local,
                location: LOCAL_NETWORK.to_string(),
            };
        }

        let location = if ip.parse::<IpAddr>().is_ok() {
            match timeout(self.timeout, self.lookup(&ip)).await {
                Ok(Some(location)) => location,
                Ok(None) => UNKNOWN_LOCATION.to_string(),
                Err(_) => {
                    debug!("geo lookup timed out after {:?}", self.timeout);
                    UNKNOWN_LOCATION.to_string()
                }
            }
        } else {
            UNKNOWN_LOCATION.to_string()
        };

        GeoRecord {
            ip,
            classification: IpClass::Public,
            location,
        }
    }

    async fn lookup(&self, ip: &str) -> Option<String> {
        let url = format!("{}/json/{ip}", self.base_url);
        let response = match self.client.get(&url).send().await {
            Ok(response) => response,
            Err(err) => {
                debug!("geo lookup failed: {err}");
                return None;
            }
        };
        if !response.status().is_success() {
            debug!("geo lookup returned {}", response.status());
            return None;
        }
        let payload: IpApiResponse = match response.json().await {
            Ok(payload) => payload,
            Err(err) => {
                debug!("geo lookup payload malformed: {err}");
                return None;
            }
        };
        if payload.status != "success" {
            return None;
        }
        let location = [payload.city, payload.region_name, payload.country]
            .into_iter()
            .map(|part| part.trim().to_string())
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(", ");
        if location.is_empty() {
            None
        } else {
            Some(location)
        }
    }
}
