//! Structured cache keys: `prefix:service:version:identifier`

use serde::{Deserialize, Serialize};
use std::fmt;

/// Category of cached result; selects the key service segment and TTL
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheCategory {
    Planning,
    Triage,
    Composition,
    SessionTemplate,
}

impl CacheCategory {
    pub fn service(&self) -> &'static str {
        match self {
            CacheCategory::Planning => "planning",
            CacheCategory::Triage => "triage",
            CacheCategory::Composition => "composition",
            CacheCategory::SessionTemplate => "session_template",
        }
    }
}

/// Cache key identifying one stored result
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheKey {
    pub prefix: String,
    pub service: String,
    pub version: String,
    pub identifier: String,
}

impl CacheKey {
    pub fn new(
        prefix: impl Into<String>,
        service: impl Into<String>,
        version: impl Into<String>,
        identifier: impl Into<String>,
    ) -> Self {
        Self {
            prefix: prefix.into(),
            service: service.into(),
            version: version.into(),
            identifier: identifier.into(),
        }
    }

    /// Parse a `prefix:service:version:identifier` string.
    ///
    /// The identifier may itself contain `:`; only the first three
    /// separators are structural.
    pub fn parse(raw: &str) -> Option<Self> {
        let mut parts = raw.splitn(4, ':');
        let prefix = parts.next()?;
        let service = parts.next()?;
        let version = parts.next()?;
        let identifier = parts.next()?;
        if [prefix, service, version, identifier].iter().any(|p| p.is_empty()) {
            return None;
        }
        Some(Self::new(prefix, service, version, identifier))
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}:{}",
            self.prefix, self.service, self.version, self.identifier
        )
    }
}

/// Prefix and version shared by every key this process builds
#[derive(Debug, Clone)]
pub struct KeySpace {
    prefix: String,
    version: String,
}

impl KeySpace {
    pub fn new(prefix: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            version: version.into(),
        }
    }

    pub fn key(&self, category: CacheCategory, identifier: &str) -> CacheKey {
        CacheKey::new(&self.prefix, category.service(), &self.version, identifier)
    }
}

impl Default for KeySpace {
    fn default() -> Self {
        Self::new("conductor", "v1")
    }
}
