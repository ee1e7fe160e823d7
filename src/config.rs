use std::fs;
use std::path::PathBuf;

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};

use crate::app::{DEFAULT_MAX_PER_QUERY, HarvestOptions, HarvestRequest};
use crate::domain::{ClassQuerySpec, MinSize, Region};
use crate::error::HarvestError;

pub const DEFAULT_CONFIG_FILE: &str = "image-harvest.json";
pub const DEFAULT_ROOT_DIR: &str = "dataset";
pub const SCHEMA_VERSION: u32 = 1;

/// Job file as written by the operator. `classes` keeps file order.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub schema_version: Option<u32>,
    #[serde(default)]
    pub root_dir: Option<String>,
    #[serde(default)]
    pub max_per_query: Option<usize>,
    #[serde(default)]
    pub img_size: Option<ImageSizeEntry>,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub classes: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(untagged)]
pub enum ImageSizeEntry {
    Pair([u32; 2]),
    Shorthand(String),
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(untagged)]
pub enum ClassEntry {
    Shorthand(String),
    Queries(Vec<String>),
}

/// Command-line values that take precedence over the job file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub root: Option<Utf8PathBuf>,
    pub max_per_query: Option<usize>,
    pub min_size: Option<MinSize>,
    pub region: Option<Region>,
}

pub struct ConfigLoader;

impl ConfigLoader {
    pub fn resolve(
        path: Option<&str>,
        overrides: Overrides,
    ) -> Result<HarvestRequest, HarvestError> {
        let config_path = match path {
            Some(path) => PathBuf::from(path),
            None => PathBuf::from(DEFAULT_CONFIG_FILE),
        };

        if path.is_none() && !config_path.exists() {
            return Err(HarvestError::MissingConfig);
        }

        let content = fs::read_to_string(&config_path)
            .map_err(|_| HarvestError::ConfigRead(config_path.clone()))?;
        let config: Config = serde_json::from_str(&content)
            .map_err(|err| HarvestError::ConfigParse(err.to_string()))?;

        Self::resolve_config(config, overrides)
    }

    pub fn resolve_config(
        config: Config,
        overrides: Overrides,
    ) -> Result<HarvestRequest, HarvestError> {
        if let Some(version) = config.schema_version
            && version != SCHEMA_VERSION
        {
            return Err(HarvestError::ConfigParse(format!(
                "unsupported schema_version {version}"
            )));
        }

        let mut classes = ClassQuerySpec::new();
        for (name, value) in config.classes {
            let entry: ClassEntry = serde_json::from_value(value)
                .map_err(|err| HarvestError::ConfigParse(format!("class {name:?}: {err}")))?;
            let queries = match entry {
                ClassEntry::Shorthand(query) => vec![query],
                ClassEntry::Queries(queries) => queries,
            };
            let mut trimmed = Vec::with_capacity(queries.len());
            for query in &queries {
                let query = query.trim();
                if query.is_empty() {
                    return Err(HarvestError::ConfigParse(format!(
                        "class {name:?}: empty query"
                    )));
                }
                trimmed.push(query.to_string());
            }
            classes.push(name.parse()?, trimmed);
        }

        let max_per_query = overrides
            .max_per_query
            .or(config.max_per_query)
            .unwrap_or(DEFAULT_MAX_PER_QUERY);
        if max_per_query == 0 {
            return Err(HarvestError::InvalidMaxPerQuery);
        }

        let min_size = match overrides.min_size {
            Some(size) => Some(size),
            None => config.img_size.map(ImageSizeEntry::resolve).transpose()?,
        };

        let region = match overrides.region {
            Some(region) => region,
            None => config
                .region
                .as_deref()
                .map(str::parse::<Region>)
                .transpose()?
                .unwrap_or_default(),
        };

        let root = overrides
            .root
            .or_else(|| config.root_dir.map(Utf8PathBuf::from))
            .unwrap_or_else(|| Utf8PathBuf::from(DEFAULT_ROOT_DIR));

        Ok(HarvestRequest {
            root,
            classes,
            options: HarvestOptions {
                max_per_query,
                min_size,
                region,
            },
        })
    }
}

impl ImageSizeEntry {
    fn resolve(self) -> Result<MinSize, HarvestError> {
        match self {
            ImageSizeEntry::Pair([width, height]) => MinSize::new(width, height),
            ImageSizeEntry::Shorthand(value) => value.parse(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_config_defaults() {
        let config: Config =
            serde_json::from_str(r#"{"classes": {"cats": "kitten"}}"#).unwrap();

        let request = ConfigLoader::resolve_config(config, Overrides::default()).unwrap();
        assert_eq!(request.root, Utf8PathBuf::from(DEFAULT_ROOT_DIR));
        assert_eq!(request.options, HarvestOptions::default());
        assert_eq!(request.classes.query_count(), 1);
    }
}
