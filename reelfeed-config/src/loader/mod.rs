use anyhow::{Context, anyhow};
use std::{
    env, fs,
    path::{Path, PathBuf},
};
use tracing::debug;

use crate::constants::{CONFIG_JSON_ENV, CONFIG_PATH_ENV};
use crate::models::CoordinatorConfig;

/// Source that produced the coordinator configuration.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ConfigSource {
    #[default]
    Default,
    EnvPath(PathBuf),
    EnvInline,
    File(PathBuf),
}

impl CoordinatorConfig {
    /// Load configuration using environment variables.
    /// Evaluation order:
    /// 1) `$REELFEED_CONFIG_PATH` (TOML or JSON file),
    /// 2) `$REELFEED_CONFIG_JSON` (inline JSON),
    /// 3) the first existing default file candidate,
    /// 4) defaults.
    ///
    /// The loaded config is validated before it is returned.
    pub fn load_from_env() -> anyhow::Result<(Self, ConfigSource)> {
        Self::load_with(|key| env::var(key).ok())
    }

    /// Same as [`CoordinatorConfig::load_from_env`] with an injectable
    /// variable lookup.
    pub fn load_with<F>(lookup: F) -> anyhow::Result<(Self, ConfigSource)>
    where
        F: Fn(&str) -> Option<String>,
    {
        let (config, source) = Self::resolve(lookup)?;
        config
            .validate()
            .with_context(|| format!("invalid config from {source:?}"))?;
        debug!(?source, "coordinator config loaded");
        Ok((config, source))
    }

    fn resolve<F>(lookup: F) -> anyhow::Result<(Self, ConfigSource)>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path_str) = lookup(CONFIG_PATH_ENV)
            && !path_str.trim().is_empty()
        {
            let path = PathBuf::from(path_str);
            let config = Self::load_from_file(&path)?;
            return Ok((config, ConfigSource::EnvPath(path)));
        }

        if let Some(raw) = lookup(CONFIG_JSON_ENV)
            && !raw.trim().is_empty()
        {
            let parsed = Self::parse_json(&raw)
                .with_context(|| format!("failed to parse {CONFIG_JSON_ENV}"))?;
            return Ok((parsed, ConfigSource::EnvInline));
        }

        if let Some(path) = Self::find_default_file() {
            let config = Self::load_from_file(&path)?;
            return Ok((config, ConfigSource::File(path)));
        }

        Ok((Self::default(), ConfigSource::Default))
    }

    /// Read a config file, picking the format from its extension and
    /// sniffing TOML then JSON when the extension says nothing.
    pub fn load_from_file(path: &Path) -> anyhow::Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("cannot open {}", path.display()))?;
        let origin = path.display().to_string();
        Format::from_path(path).decode(&contents, &origin)
    }

    /// Parse TOML or JSON text; `origin` names the source in errors.
    pub fn parse_from_str(
        contents: &str,
        origin: &str,
    ) -> anyhow::Result<Self> {
        Format::Sniff.decode(contents, origin)
    }

    pub fn parse_json(raw: &str) -> anyhow::Result<Self> {
        Format::Json.decode(raw, "inline json")
    }

    fn find_default_file() -> Option<PathBuf> {
        const CANDIDATES: &[&str] = &[
            "reelfeed.toml",
            "reelfeed.json",
            "config/reelfeed.toml",
            "config/reelfeed.json",
        ];

        CANDIDATES
            .iter()
            .map(Path::new)
            .find(|path| path.exists())
            .map(|path| path.to_path_buf())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Toml,
    Json,
    Sniff,
}

impl Format {
    fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Self::Toml,
            Some("json") => Self::Json,
            _ => Self::Sniff,
        }
    }

    fn decode(
        self,
        contents: &str,
        origin: &str,
    ) -> anyhow::Result<CoordinatorConfig> {
        let parsed: anyhow::Result<CoordinatorConfig> = match self {
            Self::Toml => toml::from_str(contents).map_err(anyhow::Error::from),
            Self::Json => {
                serde_json::from_str(contents).map_err(anyhow::Error::from)
            }
            Self::Sniff => toml::from_str(contents).or_else(|toml_err| {
                serde_json::from_str(contents).map_err(|json_err| {
                    anyhow!("neither TOML ({toml_err}) nor JSON ({json_err})")
                })
            }),
        };
        parsed.with_context(|| format!("{origin}: malformed reelfeed config"))
    }
}
