use std::borrow::Cow;

use serde::{Deserialize, Serialize};

/// Permission identifier, qualified as `resource.action`
/// (e.g. "requirement.approve").
///
/// Two wildcard forms exist in role grant lists: `"resource.*"` (every action
/// on one resource) and the bare `"*"` (every permission in the catalog).
/// Wildcards are grant-side patterns; an effective permission set only ever
/// contains concrete `resource.action` entries after expansion.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Permission(Cow<'static, str>);

impl Permission {
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The `resource` half of `resource.action`, if well-formed.
    pub fn resource(&self) -> Option<&str> {
        self.as_str().split_once('.').map(|(r, _)| r)
    }

    /// The `action` half of `resource.action`, if well-formed.
    pub fn action(&self) -> Option<&str> {
        self.as_str().split_once('.').map(|(_, a)| a)
    }

    /// The bare `"*"` pattern (grants everything in the catalog).
    pub fn is_wildcard(&self) -> bool {
        self.as_str() == "*"
    }

    /// A `"resource.*"` pattern; returns the resource it covers.
    pub fn resource_wildcard(&self) -> Option<&str> {
        self.as_str().strip_suffix(".*")
    }
}

impl core::fmt::Display for Permission {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}
