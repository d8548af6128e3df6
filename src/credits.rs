//! Credit payload model and the append/merge rules shared by every source.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::text::{extract_year, sanitize_text};

static ROLE_SPLIT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*,\s*").expect("static role separator pattern"));

/// Fixed credit buckets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CreditCategory {
    Songwriting,
    Performers,
    Production,
    Engineering,
    Other,
}

impl CreditCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Songwriting => "Songwriting",
            Self::Performers => "Performers",
            Self::Production => "Production",
            Self::Engineering => "Engineering",
            Self::Other => "Other",
        }
    }
}

impl fmt::Display for CreditCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditEntry {
    pub name: String,
    pub role: String,
}

impl CreditEntry {
    pub fn new(name: impl Into<String>, role: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            role: role.into(),
        }
    }

    fn same_name(&self, name: &str) -> bool {
        self.name.to_lowercase() == name.to_lowercase()
    }

    fn same_credit(&self, name: &str, role: &str) -> bool {
        self.same_name(name) && self.role.to_lowercase() == role.to_lowercase()
    }
}

/// Joins two comma-separated role lists, keeping first spellings and order.
pub fn merge_role_text(existing: &str, incoming: &str) -> String {
    let mut seen = Vec::<String>::new();
    let mut merged = Vec::<&str>::new();
    for piece in ROLE_SPLIT_RE
        .split(existing)
        .chain(ROLE_SPLIT_RE.split(incoming))
        .map(str::trim)
    {
        if piece.is_empty() {
            continue;
        }
        let key = piece.to_lowercase();
        if seen.contains(&key) {
            continue;
        }
        seen.push(key);
        merged.push(piece);
    }
    merged.join(", ")
}

/// Category -> entries, both in discovery order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategoryMap {
    buckets: Vec<(CreditCategory, Vec<CreditEntry>)>,
}

impl CategoryMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `(name, role)` to `category` unless the same credit is present.
    ///
    /// In `Performers` a name appears once; further roles for that name are
    /// merged into its role text.
    pub fn append_unique(&mut self, category: CreditCategory, name: &str, role: &str) {
        let name = name.trim();
        let role = role.trim();
        if name.is_empty() || role.is_empty() {
            return;
        }

        let entries = self.bucket_mut(category);
        if entries.iter().any(|entry| entry.same_credit(name, role)) {
            return;
        }

        if category == CreditCategory::Performers {
            if let Some(existing) = entries.iter_mut().find(|entry| entry.same_name(name)) {
                existing.role = merge_role_text(&existing.role, role);
                return;
            }
        }

        entries.push(CreditEntry::new(name, role));
    }

    /// Appends every entry of `other` through [`Self::append_unique`].
    pub fn merge(&mut self, other: &CategoryMap) {
        for (category, entries) in other.iter() {
            for entry in entries {
                self.append_unique(category, &entry.name, &entry.role);
            }
        }
    }

    pub fn entries(&self, category: CreditCategory) -> &[CreditEntry] {
        self.buckets
            .iter()
            .find(|(existing, _)| *existing == category)
            .map(|(_, entries)| entries.as_slice())
            .unwrap_or(&[])
    }

    pub fn has_entries(&self, category: CreditCategory) -> bool {
        !self.entries(category).is_empty()
    }

    /// True when no category holds an entry.
    pub fn is_empty(&self) -> bool {
        self.buckets.iter().all(|(_, entries)| entries.is_empty())
    }

    pub fn total_entries(&self) -> usize {
        self.buckets.iter().map(|(_, entries)| entries.len()).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (CreditCategory, &[CreditEntry])> {
        self.buckets
            .iter()
            .map(|(category, entries)| (*category, entries.as_slice()))
    }

    fn bucket_mut(&mut self, category: CreditCategory) -> &mut Vec<CreditEntry> {
        let index = match self
            .buckets
            .iter()
            .position(|(existing, _)| *existing == category)
        {
            Some(index) => index,
            None => {
                self.buckets.push((category, Vec::new()));
                self.buckets.len() - 1
            }
        };
        &mut self.buckets[index].1
    }

    fn sanitized(&self) -> CategoryMap {
        let buckets = self
            .buckets
            .iter()
            .filter_map(|(category, entries)| {
                let clean: Vec<CreditEntry> = entries
                    .iter()
                    .filter_map(|entry| {
                        let name = sanitize_text(&entry.name);
                        let role = sanitize_text(&entry.role);
                        (!name.is_empty() && !role.is_empty()).then(|| CreditEntry::new(name, role))
                    })
                    .collect();
                (!clean.is_empty()).then_some((*category, clean))
            })
            .collect();
        CategoryMap { buckets }
    }
}

impl Serialize for CategoryMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.buckets.len()))?;
        for (category, entries) in &self.buckets {
            map.serialize_entry(category.as_str(), entries)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for CategoryMap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct CategoryMapVisitor;

        impl<'de> Visitor<'de> for CategoryMapVisitor {
            type Value = CategoryMap;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a map of credit categories to entry lists")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut map = CategoryMap::new();
                while let Some((category, entries)) =
                    access.next_entry::<CreditCategory, Vec<CreditEntry>>()?
                {
                    map.bucket_mut(category).extend(entries);
                }
                Ok(map)
            }
        }

        deserializer.deserialize_map(CategoryMapVisitor)
    }
}

/// Canonical lookup result.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditsResult {
    pub artist: String,
    pub title: String,
    pub year: String,
    pub categories: CategoryMap,
    pub sources: Vec<String>,
}

impl CreditsResult {
    pub fn new(artist: &str, title: &str) -> Self {
        Self {
            artist: artist.to_string(),
            title: title.to_string(),
            ..Self::default()
        }
    }

    pub fn add_source(&mut self, label: &str) {
        if !self.sources.iter().any(|source| source == label) {
            self.sources.push(label.to_string());
        }
    }

    pub fn has_performers(&self) -> bool {
        self.categories.has_entries(CreditCategory::Performers)
    }

    /// Cleaned copy: text fields sanitized, incomplete entries and empty
    /// categories dropped, sources deduplicated.
    pub fn sanitized(&self) -> CreditsResult {
        let mut sources = Vec::<String>::new();
        for source in &self.sources {
            let clean = sanitize_text(source);
            if !clean.is_empty() && !sources.contains(&clean) {
                sources.push(clean);
            }
        }

        CreditsResult {
            artist: sanitize_text(&self.artist),
            title: sanitize_text(&self.title),
            year: extract_year(&self.year),
            categories: self.categories.sanitized(),
            sources,
        }
    }
}
