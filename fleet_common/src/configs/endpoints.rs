//! # Endpoint Selection
//!
//! Maps the host the dashboard is served from to the telemetry server's REST
//! and WebSocket bases. Local development talks to `127.0.0.1:8000`; every
//! other host talks to the fixed deployed origin. This is a pure lookup with
//! no I/O.

use url::Url;

use crate::errors::ConfigError;

/// REST base used when the dashboard is served locally.
pub const LOCAL_API_BASE: &str = "http://127.0.0.1:8000/";
/// Channel base used when the dashboard is served locally.
pub const LOCAL_WS_BASE: &str = "ws://127.0.0.1:8000/";
/// REST base of the deployed telemetry server.
pub const DEPLOYED_API_BASE: &str = "https://robot-backend-1.onrender.com/";
/// Channel base of the deployed telemetry server.
pub const DEPLOYED_WS_BASE: &str = "ws://robot-backend-1.onrender.com/";

const ROBOTS_PATH: &str = "robots";
const CHANNEL_PATH: &str = "ws";

/// Hosts that count as local development.
pub fn is_local_host(host: &str) -> bool {
    matches!(host, "localhost" | "127.0.0.1")
}

/// Resolved REST and channel bases.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    api_base: Url,
    ws_base: Url,
}

impl Endpoints {
    /// Picks the bases for the given page host.
    pub fn for_host(host: &str) -> Self {
        let (api, ws) = if is_local_host(host) {
            (LOCAL_API_BASE, LOCAL_WS_BASE)
        } else {
            (DEPLOYED_API_BASE, DEPLOYED_WS_BASE)
        };
        Self {
            api_base: Url::parse(api).expect("built-in api base is a valid URL"),
            ws_base: Url::parse(ws).expect("built-in ws base is a valid URL"),
        }
    }

    /// Uses explicit bases instead of the host lookup.
    pub fn custom(api_base: &str, ws_base: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            api_base: parse_base(api_base, &["http", "https"])?,
            ws_base: parse_base(ws_base, &["ws", "wss"])?,
        })
    }

    /// Host lookup, with either base optionally overridden.
    pub fn resolve(host: &str, api_base: Option<&str>, ws_base: Option<&str>) -> Result<Self, ConfigError> {
        let mut endpoints = Self::for_host(host);
        if let Some(api) = api_base {
            endpoints.api_base = parse_base(api, &["http", "https"])?;
        }
        if let Some(ws) = ws_base {
            endpoints.ws_base = parse_base(ws, &["ws", "wss"])?;
        }
        Ok(endpoints)
    }

    pub fn api_base(&self) -> &Url {
        &self.api_base
    }

    /// Path of the snapshot resource, relative to `api_base`.
    pub fn robots_path(&self) -> &'static str {
        ROBOTS_PATH
    }

    /// Full snapshot URL, e.g. `http://127.0.0.1:8000/robots`.
    pub fn robots_url(&self) -> Url {
        join(&self.api_base, ROBOTS_PATH)
    }

    /// Full channel URL, e.g. `ws://127.0.0.1:8000/ws`.
    pub fn channel_url(&self) -> Url {
        join(&self.ws_base, CHANNEL_PATH)
    }
}

fn join(base: &Url, path: &str) -> Url {
    let mut url = base.clone();
    if let Ok(mut segs) = url.path_segments_mut() {
        segs.pop_if_empty().push(path);
    }
    url
}

/// Parses a base URL, checks its scheme and makes sure the path is a
/// directory so relative joins append instead of replacing.
fn parse_base(input: &str, schemes: &[&str]) -> Result<Url, ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidUrl { url: input.to_string(), reason };

    let mut url = Url::parse(input).map_err(|e| invalid(e.to_string()))?;
    if !schemes.contains(&url.scheme()) {
        return Err(invalid(format!("expected scheme {}", schemes.join(" or "))));
    }
    if url.cannot_be_a_base() {
        return Err(invalid("not a base URL".to_string()));
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}
