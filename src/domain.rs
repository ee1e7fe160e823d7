use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::HarvestError;

static REGION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z]{2}-[a-z]{2}$").expect("static regex"));

/// Dataset label. Doubles as the name of the class subdirectory, so it must be
/// a single path segment.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClassName(String);

impl ClassName {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClassName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ClassName {
    type Err = HarvestError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        let is_valid = !trimmed.is_empty()
            && trimmed != "."
            && trimmed != ".."
            && !trimmed.contains(['/', '\\', '\0']);
        if !is_valid {
            return Err(HarvestError::InvalidClassName(value.to_string()));
        }
        Ok(Self(trimmed.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassQueries {
    pub class: ClassName,
    pub queries: Vec<String>,
}

/// Ordered mapping from class to its search queries. Iteration follows
/// insertion order; pushing an existing class appends to its queries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassQuerySpec {
    entries: Vec<ClassQueries>,
}

impl ClassQuerySpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push<I, S>(&mut self, class: ClassName, queries: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let queries = queries.into_iter().map(Into::into);
        match self.entries.iter_mut().find(|entry| entry.class == class) {
            Some(entry) => entry.queries.extend(queries),
            None => self.entries.push(ClassQueries {
                class,
                queries: queries.collect(),
            }),
        }
    }

    /// Groups `CLASS=QUERY` pairs by class, in order of
    /// first appearance.
    pub fn from_pairs<I, S>(pairs: I) -> Result<Self, HarvestError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut classes = Self::new();
        for pair in pairs {
            let pair = pair.as_ref();
            let (class, query) = pair
                .split_once('=')
                .ok_or_else(|| HarvestError::InvalidQueryPair(pair.to_string()))?;
            let query = query.trim();
            if query.is_empty() {
                return Err(HarvestError::InvalidQueryPair(pair.to_string()));
            }
            classes.push(class.parse()?, [query]);
        }
        Ok(classes)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ClassQueries> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn query_count(&self) -> usize {
        self.entries.iter().map(|entry| entry.queries.len()).sum()
    }
}

/// Search-provider region code, e.g. `us-en`. `wt-wt` means worldwide.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region(String);

impl Region {
    pub const WORLDWIDE: &'static str = "wt-wt";

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for Region {
    fn default() -> Self {
        Self(Self::WORLDWIDE.to_string())
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Region {
    type Err = HarvestError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_lowercase();
        if normalized == "worldwide" {
            return Ok(Self::default());
        }
        if !REGION_RE.is_match(&normalized) {
            return Err(HarvestError::InvalidRegion(value.to_string()));
        }
        Ok(Self(normalized))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SafeSearch {
    On,
    Moderate,
    Off,
}

impl fmt::Display for SafeSearch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SafeSearch::On => write!(f, "on"),
            SafeSearch::Moderate => write!(f, "moderate"),
            SafeSearch::Off => write!(f, "off"),
        }
    }
}

/// Minimum accepted `(width, height)` of a search result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MinSize {
    pub width: u32,
    pub height: u32,
}

impl MinSize {
    pub fn new(width: u32, height: u32) -> Result<Self, HarvestError> {
        if width == 0 || height == 0 {
            return Err(HarvestError::InvalidImageSize(format!("{width}x{height}")));
        }
        Ok(Self { width, height })
    }
}

impl fmt::Display for MinSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl FromStr for MinSize {
    type Err = HarvestError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let invalid = || HarvestError::InvalidImageSize(value.to_string());
        let (width, height) = value
            .trim()
            .split_once(['x', 'X', ','])
            .ok_or_else(invalid)?;
        let width = width.trim().parse::<u32>().map_err(|_| invalid())?;
        let height = height.trim().parse::<u32>().map_err(|_| invalid())?;
        Self::new(width, height).map_err(|_| invalid())
    }
}

/// One image hit as reported by the search provider. Dimensions are the
/// provider's claim and are never checked against the downloaded bytes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub thumbnail: Option<String>,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
}

impl SearchResult {
    /// Primary image URL if present, else the thumbnail URL.
    pub fn candidate_url(&self) -> Option<&str> {
        non_empty(self.image.as_deref()).or_else(|| non_empty(self.thumbnail.as_deref()))
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|value| !value.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn class_name_rejects_path_segments() {
        assert_eq!("cats".parse::<ClassName>().unwrap().as_str(), "cats");
        assert_matches!(
            "a/b".parse::<ClassName>(),
            Err(HarvestError::InvalidClassName(_))
        );
        assert_matches!(
            "..".parse::<ClassName>(),
            Err(HarvestError::InvalidClassName(_))
        );
        assert_matches!(
            "  ".parse::<ClassName>(),
            Err(HarvestError::InvalidClassName(_))
        );
    }

    #[test]
    fn region_aliases_and_validation() {
        assert_eq!("worldwide".parse::<Region>().unwrap().as_str(), "wt-wt");
        assert_eq!("US-EN".parse::<Region>().unwrap().as_str(), "us-en");
        assert_matches!("usa".parse::<Region>(), Err(HarvestError::InvalidRegion(_)));
    }

    #[test]
    fn candidate_url_falls_back_to_thumbnail() {
        let result = SearchResult {
            image: Some(String::new()),
            thumbnail: Some("https://t.example/a.jpg".to_string()),
            ..Default::default()
        };
        assert_eq!(result.candidate_url(), Some("https://t.example/a.jpg"));
        assert_eq!(SearchResult::default().candidate_url(), None);
    }
}
