//! find_local_resources：按地点查本地热线与庇护所，未知地点回退到全国默认

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalResources {
    pub hotline: String,
    pub shelter: String,
}

impl LocalResources {
    pub fn new(hotline: impl Into<String>, shelter: impl Into<String>) -> Self {
        Self {
            hotline: hotline.into(),
            shelter: shelter.into(),
        }
    }

    pub fn national() -> Self {
        Self::new("118 (national)", "Call hotline to locate nearest shelter.")
    }
}

/// 地点键规范化：去首尾空白、小写、合并内部空白
pub fn normalize_location(location: &str) -> String {
    location
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// 小型静态资源索引
#[derive(Debug, Clone)]
pub struct ResourceIndex {
    entries: HashMap<String, LocalResources>,
    fallback: LocalResources,
}

impl Default for ResourceIndex {
    fn default() -> Self {
        Self::empty()
            .with_entry("Tel Aviv", LocalResources::new("118", "Safe Haven – Rothschild 12"))
            .with_entry(
                "Jerusalem",
                LocalResources::new("02-123-4567", "Women’s Center – Yafo 99"),
            )
    }
}

impl ResourceIndex {
    pub fn empty() -> Self {
        Self {
            entries: HashMap::new(),
            fallback: LocalResources::national(),
        }
    }

    pub fn with_entry(mut self, location: &str, resources: LocalResources) -> Self {
        self.entries.insert(normalize_location(location), resources);
        self
    }

    pub fn lookup(&self, location: &str) -> LocalResources {
        self.entries
            .get(&normalize_location(location))
            .cloned()
            .unwrap_or_else(|| self.fallback.clone())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
