//! Ward identity before it is resolved to an integer id.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Human-facing identity of a ward (place name, ONS code, authority, region).
///
/// Any subset of fields may be set; a `WardInfo` with all fields `None` is
/// "null" and cannot be used as a destination key. Two `WardInfo`s are equal
/// (and hash equal) only if every field matches exactly.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WardInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authority: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
}

impl WardInfo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn with_authority(mut self, authority: impl Into<String>) -> Self {
        self.authority = Some(authority.into());
        self
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    /// True if no field carries any identifying information.
    pub fn is_null(&self) -> bool {
        self.name.is_none() && self.code.is_none() && self.authority.is_none() && self.region.is_none()
    }
}

impl fmt::Display for WardInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if let Some(name) = &self.name {
            parts.push(format!("name={name}"));
        }
        if let Some(code) = &self.code {
            parts.push(format!("code={code}"));
        }
        if let Some(authority) = &self.authority {
            parts.push(format!("authority={authority}"));
        }
        if let Some(region) = &self.region {
            parts.push(format!("region={region}"));
        }
        if parts.is_empty() {
            write!(f, "<null ward info>")
        } else {
            write!(f, "{}", parts.join(", "))
        }
    }
}

/// A destination key in a ward's worker/player maps: either an already
/// resolved integer ward id, or a [`WardInfo`] waiting to be resolved against
/// a [`crate::ward::Wards`] collection.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DestKey {
    Resolved(u32),
    Unresolved(WardInfo),
}

impl DestKey {
    pub fn as_resolved(&self) -> Option<u32> {
        match self {
            DestKey::Resolved(id) => Some(*id),
            DestKey::Unresolved(_) => None,
        }
    }
}

impl fmt::Display for DestKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DestKey::Resolved(id) => write!(f, "{id}"),
            DestKey::Unresolved(info) => write!(f, "{info}"),
        }
    }
}

/// A destination as supplied by a caller of [`crate::ward::Ward`]'s mutators:
/// either a plain ward id, or a [`WardInfo`] to be resolved later.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Dest {
    Id(u32),
    Info(WardInfo),
}

impl From<u32> for Dest {
    fn from(id: u32) -> Self {
        Dest::Id(id)
    }
}

impl From<WardInfo> for Dest {
    fn from(info: WardInfo) -> Self {
        Dest::Info(info)
    }
}
