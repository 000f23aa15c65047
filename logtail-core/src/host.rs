//! Host model and registry
//!
//! A host is one backend that serves `/alive`, `/list-files` and
//! `/stream-logs`. The registry holds the statically configured hosts and the
//! single active selection.

use std::collections::BTreeSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// Host used when neither an override nor a configured host is available
pub const DEFAULT_HOST: &str = "http://localhost:5005";

/// Environment variable carrying a JSON host list
pub const SERVERS_ENV: &str = "LOGTAIL_SERVERS";

/// A candidate backend host
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Host {
    /// Display name, unique within a registry
    pub name: String,
    /// Absolute, scheme-qualified base URL
    pub url: String,
}

impl Host {
    pub fn new(name: impl Into<String>, url: &str) -> Self {
        Self {
            name: name.into(),
            url: ensure_url_schema(url),
        }
    }

    /// Ad-hoc host named after its own URL
    pub fn ad_hoc(url: &str) -> Self {
        let url = ensure_url_schema(url);
        Self {
            name: url.clone(),
            url,
        }
    }

    /// Join an endpoint path onto the base URL
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.url, path.trim_start_matches('/'))
    }
}

/// Result of the latest liveness probe for a host
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum HostStatus {
    Online,
    #[default]
    Offline,
}

impl HostStatus {
    pub fn is_online(&self) -> bool {
        matches!(self, HostStatus::Online)
    }

    pub fn label(&self) -> &'static str {
        match self {
            HostStatus::Online => "online",
            HostStatus::Offline => "offline",
        }
    }
}

/// Prefix `http://` when the URL carries no scheme; trims trailing slashes.
pub fn ensure_url_schema(url: &str) -> String {
    let trimmed = url.trim().trim_end_matches('/');
    let lower = trimmed.to_ascii_lowercase();
    if lower.starts_with("http://") || lower.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("http://{}", trimmed)
    }
}

/// Where a host list comes from
#[derive(Clone, Copy, Debug)]
pub enum HostSource<'a> {
    /// JSON array of `{name, url}` objects on disk
    JsonFile(&'a Path),
    /// JSON array held in an environment variable
    Env(&'a str),
    /// Hosts already parsed from the config file
    Inline(&'a [Host]),
}

/// Parse a JSON host list
pub fn parse_host_list(json: &str) -> Result<Vec<Host>, serde_json::Error> {
    let hosts: Vec<Host> = serde_json::from_str(json)?;
    Ok(hosts
        .into_iter()
        .map(|h| Host::new(h.name, &h.url))
        .collect())
}

#[derive(Debug)]
pub struct HostRegistry {
    hosts: Vec<Host>,
    active: Option<Host>,
    generation: u64,
}

impl HostRegistry {
    /// Load hosts from a source. Never fails: problems are logged and yield
    /// an empty list, which callers treat as single implicit host mode.
    pub fn load(source: HostSource<'_>) -> Vec<Host> {
        let loaded = match source {
            HostSource::Inline(hosts) => Ok(hosts
                .iter()
                .map(|h| Host::new(h.name.clone(), &h.url))
                .collect()),
            HostSource::JsonFile(path) => std::fs::read_to_string(path)
                .map_err(|e| e.to_string())
                .and_then(|content| parse_host_list(&content).map_err(|e| e.to_string())),
            HostSource::Env(var) => match std::env::var(var) {
                Ok(content) => parse_host_list(&content).map_err(|e| e.to_string()),
                Err(_) => Ok(Vec::new()),
            },
        };

        match loaded {
            Ok(hosts) => hosts,
            Err(error) => {
                tracing::warn!(source = ?source, %error, "failed to load host list");
                Vec::new()
            }
        }
    }

    pub fn new(hosts: Vec<Host>) -> Self {
        let mut seen = BTreeSet::new();
        let hosts = hosts
            .into_iter()
            .filter(|h| {
                let fresh = seen.insert(h.name.clone());
                if !fresh {
                    tracing::warn!(host = %h.name, "duplicate host name ignored");
                }
                fresh
            })
            .collect();

        Self {
            hosts,
            active: None,
            generation: 0,
        }
    }

    pub fn hosts(&self) -> &[Host] {
        &self.hosts
    }

    /// No configured hosts: the UI shows a single implicit host
    pub fn is_implicit(&self) -> bool {
        self.hosts.is_empty()
    }

    pub fn active(&self) -> Option<&Host> {
        self.active.as_ref()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// True when `generation` still identifies the active selection
    pub fn is_current(&self, generation: u64) -> bool {
        self.generation == generation
    }

    /// Pick the startup host: override, then first configured, then default.
    pub fn resolve_initial(&self, host_override: Option<&str>) -> Host {
        if let Some(wanted) = host_override.map(str::trim).filter(|s| !s.is_empty()) {
            return self
                .find(wanted)
                .cloned()
                .unwrap_or_else(|| Host::ad_hoc(wanted));
        }

        self.hosts
            .first()
            .cloned()
            .unwrap_or_else(|| Host::ad_hoc(DEFAULT_HOST))
    }

    /// Look a host up by name or URL
    pub fn find(&self, key: &str) -> Option<&Host> {
        let as_url = ensure_url_schema(key);
        self.hosts
            .iter()
            .find(|h| h.name == key || h.url.eq_ignore_ascii_case(&as_url))
    }

    /// Make `host` active; returns the new selection generation
    pub fn select(&mut self, host: Host) -> u64 {
        self.generation += 1;
        tracing::info!(host = %host.name, url = %host.url, generation = self.generation, "active host selected");
        self.active = Some(host);
        self.generation
    }

    /// Host `offset` positions away from the active one, wrapping
    pub fn neighbour(&self, offset: isize) -> Option<&Host> {
        if self.hosts.is_empty() {
            return None;
        }
        let len = self.hosts.len() as isize;
        let current = self
            .active
            .as_ref()
            .and_then(|a| self.hosts.iter().position(|h| h == a))
            .map(|i| i as isize)
            .unwrap_or(-1);
        let next = (current + offset).rem_euclid(len);
        self.hosts.get(next as usize)
    }
}
