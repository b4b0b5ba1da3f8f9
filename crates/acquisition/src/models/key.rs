use std::fmt;

use serde::{Deserialize, Serialize};

/// Data-source type a cache key belongs to.
///
/// Keys in different namespaces never collide, even when their parameters do.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheNamespace {
    Research,
    Currency,
    Community,
    Video,
    News,
    Scrape,
}

impl CacheNamespace {
    pub const ALL: [CacheNamespace; 6] = [
        Self::Research,
        Self::Currency,
        Self::Community,
        Self::Video,
        Self::News,
        Self::Scrape,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Research => "research",
            Self::Currency => "currency",
            Self::Community => "community",
            Self::Video => "video",
            Self::News => "news",
            Self::Scrape => "scrape",
        }
    }

    /// Parse a namespace name, ignoring case and surrounding whitespace.
    pub fn parse(name: &str) -> Option<Self> {
        let name = name.trim();
        Self::ALL
            .into_iter()
            .find(|ns| ns.as_str().eq_ignore_ascii_case(name))
    }
}

impl fmt::Display for CacheNamespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Builder for `"<namespace>:<param-1>:<param-2>:..."` cache keys.
///
/// Every parameter is trimmed, lower-cased, and percent-encoded, so a `:` inside
/// a value can't be mistaken for the separator. List parameters are normalized
/// the same way, sorted, and joined with `,`.
///
/// ```
/// use wayfarer_acquisition::models::{CacheKey, CacheNamespace};
///
/// let a = CacheKey::new(CacheNamespace::Research)
///     .param("  Lisbon ")
///     .list_param(["food", "Culture"])
///     .build();
/// let b = CacheKey::new(CacheNamespace::Research)
///     .param("lisbon")
///     .list_param(["culture", "food"])
///     .build();
/// assert_eq!(a, b);
/// assert_eq!(a, "research:lisbon:culture,food");
/// ```
#[derive(Clone, Debug)]
pub struct CacheKey {
    namespace: CacheNamespace,
    params: Vec<String>,
}

impl CacheKey {
    pub fn new(namespace: CacheNamespace) -> Self {
        Self {
            namespace,
            params: Vec::new(),
        }
    }

    pub fn param(mut self, value: impl AsRef<str>) -> Self {
        self.params.push(normalize(value.as_ref()));
        self
    }

    /// Absent values still occupy their position so later parameters don't shift.
    pub fn optional_param(self, value: Option<&str>) -> Self {
        self.param(value.unwrap_or_default())
    }

    pub fn list_param<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut normalized: Vec<String> = values
            .into_iter()
            .map(|v| normalize(v.as_ref()))
            .collect();
        normalized.sort();
        self.params.push(normalized.join(","));
        self
    }

    pub fn namespace(&self) -> CacheNamespace {
        self.namespace
    }

    pub fn build(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.namespace.as_str())?;
        for param in &self.params {
            write!(f, ":{}", param)?;
        }
        Ok(())
    }
}

fn normalize(value: &str) -> String {
    urlencoding::encode(&value.trim().to_lowercase()).into_owned()
}
