//! Identity resolution from the host environment.
//!
//! A mini-app can learn who its user is from several places, none of which
//! is guaranteed to be populated:
//!
//! 1. an override identity, honoured only when forcing is requested;
//! 2. an object the host injects into the global scope, probed under each
//!    name in [`HOST_PROBES`] in order;
//! 3. the `tgWebAppData` query parameter of the current URL;
//! 4. the same host object on the enclosing frame, when it is reachable.
//!
//! The first source that yields an identity wins and nothing is merged
//! across sources. A source that is missing, malformed or unreachable is
//! logged and skipped; [`IdentityResolver::resolve`] itself never fails.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info};
use url::Url;

use crate::domain::{DisplayName, ExternalId, parse_avatar_url};

/// Query parameter carrying serialized init data.
pub const INIT_DATA_PARAM: &str = "tgWebAppData";

/// A ranked probe for the host-injected object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostProbe {
    /// Name reported in logs.
    pub label: &'static str,
    /// Global to read.
    pub global: &'static str,
    /// Paths inside the global that may hold the user object.
    pub user_paths: &'static [&'static [&'static str]],
}

/// Host object names, most trusted first.
pub const HOST_PROBES: [HostProbe; 3] = [
    HostProbe {
        label: "Telegram.WebApp",
        global: "Telegram",
        user_paths: &[&["WebApp", "initDataUnsafe", "user"]],
    },
    HostProbe {
        label: "telegram",
        global: "telegram",
        user_paths: &[
            &["initDataUnsafe", "user"],
            &["WebApp", "initDataUnsafe", "user"],
        ],
    },
    HostProbe {
        label: "TelegramWebApp",
        global: "TelegramWebApp",
        user_paths: &[&["initDataUnsafe", "user"]],
    },
];

/// Only the primary object is looked for on the enclosing frame.
const PARENT_PROBE: HostProbe = HostProbe {
    label: "parent Telegram.WebApp",
    global: "Telegram",
    user_paths: &[&["WebApp", "initDataUnsafe", "user"]],
};

/// Identity extracted from one source, consumed once per session start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityCandidate {
    pub external_id: ExternalId,
    /// Empty when the source omits every name field.
    pub display_name: DisplayName,
    pub avatar_url: Option<Url>,
}

/// Why a source produced nothing. Never leaves this module except in logs.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SourceUnavailable {
    #[error("source is not populated")]
    Absent,
    #[error("source is malformed: {0}")]
    Malformed(String),
    #[error("enclosing frame denied access")]
    AccessDenied,
}

/// Read-only view of the environment the client runs in.
pub trait HostEnvironment: Send + Sync {
    /// Global object named `name`, if injected.
    fn global(&self, name: &str) -> Option<Value>;

    /// Query string of the current URL, without the leading `?`.
    fn query_string(&self) -> Option<String>;

    /// Global object named `name` on the enclosing frame.
    ///
    /// Returns [`SourceUnavailable::AccessDenied`] when the frame is
    /// cross-origin or there is no enclosing frame.
    fn parent_global(&self, name: &str) -> Result<Option<Value>, SourceUnavailable>;
}

/// Snapshot of a host environment, captured by the embedding shell.
#[derive(Debug, Clone, Default)]
pub struct StaticEnvironment {
    globals: HashMap<String, Value>,
    query: Option<String>,
    parent: Option<HashMap<String, Value>>,
}

impl StaticEnvironment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_global(mut self, name: impl Into<String>, value: Value) -> Self {
        self.globals.insert(name.into(), value);
        self
    }

    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }

    /// Make an enclosing frame reachable with the given global.
    pub fn with_parent_global(mut self, name: impl Into<String>, value: Value) -> Self {
        self.parent
            .get_or_insert_with(HashMap::new)
            .insert(name.into(), value);
        self
    }
}

impl HostEnvironment for StaticEnvironment {
    fn global(&self, name: &str) -> Option<Value> {
        self.globals.get(name).cloned()
    }

    fn query_string(&self) -> Option<String> {
        self.query.clone()
    }

    fn parent_global(&self, name: &str) -> Result<Option<Value>, SourceUnavailable> {
        self.parent
            .as_ref()
            .map(|globals| globals.get(name).cloned())
            .ok_or(SourceUnavailable::AccessDenied)
    }
}

/// Options for a single resolution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolveOptions {
    pub override_identity: Option<IdentityCandidate>,
    /// Use `override_identity` ahead of every other source.
    pub force_override: bool,
}

impl ResolveOptions {
    /// Options that always resolve to `identity`.
    pub fn forced(identity: IdentityCandidate) -> Self {
        Self {
            override_identity: Some(identity),
            force_override: true,
        }
    }
}

type SourceReader = fn(&IdentityResolver) -> Result<IdentityCandidate, SourceUnavailable>;

/// Produces at most one [`IdentityCandidate`] from the host environment.
#[derive(Clone)]
pub struct IdentityResolver {
    environment: Arc<dyn HostEnvironment>,
}

impl IdentityResolver {
    pub fn new(environment: Arc<dyn HostEnvironment>) -> Self {
        Self { environment }
    }

    /// Resolve an identity using the fixed source precedence.
    pub fn resolve(&self, options: &ResolveOptions) -> Option<IdentityCandidate> {
        if options.force_override {
            if let Some(identity) = &options.override_identity {
                info!(source = "override", external_id = %identity.external_id, "identity resolved");
                return Some(identity.clone());
            }
        }

        let sources: [(&str, SourceReader); 3] = [
            ("host", Self::from_host),
            ("url", Self::from_query),
            ("parent", Self::from_parent),
        ];
        for (source, read) in sources {
            match read(self) {
                Ok(identity) => {
                    info!(source, external_id = %identity.external_id, "identity resolved");
                    return Some(identity);
                }
                Err(reason) => debug!(source, %reason, "identity source unavailable"),
            }
        }
        None
    }

    fn from_host(&self) -> Result<IdentityCandidate, SourceUnavailable> {
        let mut last = SourceUnavailable::Absent;
        for probe in &HOST_PROBES {
            let Some(global) = self.environment.global(probe.global) else {
                continue;
            };
            match candidate_from_probe(probe, &global) {
                Ok(identity) => return Ok(identity),
                Err(reason) => {
                    debug!(probe = probe.label, %reason, "host probe yielded nothing");
                    last = reason;
                }
            }
        }
        Err(last)
    }

    fn from_query(&self) -> Result<IdentityCandidate, SourceUnavailable> {
        let query = self
            .environment
            .query_string()
            .ok_or(SourceUnavailable::Absent)?;
        let init_data = url::form_urlencoded::parse(query.trim_start_matches('?').as_bytes())
            .find(|(key, _)| key == INIT_DATA_PARAM)
            .map(|(_, value)| value.into_owned())
            .ok_or(SourceUnavailable::Absent)?;
        let user = user_from_init_data(&init_data)?;
        candidate_from_user(&user)
    }

    fn from_parent(&self) -> Result<IdentityCandidate, SourceUnavailable> {
        let global = self
            .environment
            .parent_global(PARENT_PROBE.global)?
            .ok_or(SourceUnavailable::Absent)?;
        candidate_from_probe(&PARENT_PROBE, &global)
    }
}

fn candidate_from_probe(
    probe: &HostProbe,
    global: &Value,
) -> Result<IdentityCandidate, SourceUnavailable> {
    let user = probe
        .user_paths
        .iter()
        .find_map(|path| path.iter().try_fold(global, |value, key| value.get(key)))
        .ok_or(SourceUnavailable::Absent)?;
    candidate_from_user(user)
}

/// Init data is either URL-encoded JSON (`{"user": {...}}`) or the
/// form-encoded string the host signs, whose `user` field holds JSON.
fn user_from_init_data(init_data: &str) -> Result<Value, SourceUnavailable> {
    let trimmed = init_data.trim();
    let payload: Value = if trimmed.starts_with('{') {
        serde_json::from_str(trimmed).map_err(|err| SourceUnavailable::Malformed(err.to_string()))?
    } else {
        let user = url::form_urlencoded::parse(trimmed.as_bytes())
            .find(|(key, _)| key == "user")
            .map(|(_, value)| value.into_owned())
            .ok_or(SourceUnavailable::Absent)?;
        let user: Value = serde_json::from_str(&user)
            .map_err(|err| SourceUnavailable::Malformed(err.to_string()))?;
        return Ok(user);
    };
    payload
        .get("user")
        .cloned()
        .ok_or_else(|| SourceUnavailable::Malformed("init data has no user".to_owned()))
}

fn candidate_from_user(user: &Value) -> Result<IdentityCandidate, SourceUnavailable> {
    let raw_id = match user.get("id") {
        Some(Value::Number(number)) => number.to_string(),
        Some(Value::String(text)) => text.clone(),
        Some(_) => return Err(SourceUnavailable::Malformed("user id has an unexpected type".to_owned())),
        None => return Err(SourceUnavailable::Malformed("user has no id".to_owned())),
    };
    let external_id =
        ExternalId::new(raw_id).map_err(|err| SourceUnavailable::Malformed(err.to_string()))?;

    let field = |key: &str| {
        user.get(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|value| !value.is_empty())
    };
    let name = match (field("first_name"), field("last_name")) {
        (Some(first), Some(last)) => format!("{first} {last}"),
        (Some(first), None) => first.to_owned(),
        (None, Some(last)) => last.to_owned(),
        (None, None) => field("username").unwrap_or_default().to_owned(),
    };
    // Names never block identity; an unusable one degrades to empty.
    let display_name = DisplayName::new(&name).unwrap_or_default();
    let avatar_url = field("photo_url").and_then(|raw| parse_avatar_url(raw).ok());

    Ok(IdentityCandidate {
        external_id,
        display_name,
        avatar_url,
    })
}

#[cfg(test)]
#[path = "identity_tests.rs"]
mod tests;
