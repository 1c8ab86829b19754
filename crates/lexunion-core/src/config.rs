//! Lightweight configuration loader and path helpers.
//!
//! Uses Figment to merge `lexunion.toml` + `lexunion.<env>.toml` + `LEXUNION_*`
//! env vars. Provides helpers to expand `~` and `${VAR}` and to resolve
//! relative paths against a known base directory.

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::types::{validate_k, ChildFailurePolicy};

pub struct Config {
    figment: Figment,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());

        let mut figment = Figment::new().merge(Toml::file("lexunion.toml"));
        match env_name.as_str() {
            "dev" | "development" => figment = figment.merge(Toml::file("lexunion.dev.toml")),
            "prod" | "production" => figment = figment.merge(Toml::file("lexunion.prod.toml")),
            "test" | "testing" => figment = figment.merge(Toml::file("lexunion.test.toml")),
            _ => {}
        }
        figment = figment.merge(Env::prefixed("LEXUNION_").split("__"));

        let config = Self { figment };
        config.validate()?;
        Ok(config)
    }

    /// Load a single TOML file without environment overlays.
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let config = Self { figment: Figment::new().merge(Toml::file(path)) };
        config.validate()?;
        Ok(config)
    }

    pub fn get<T>(&self, key: &str) -> anyhow::Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.figment
            .extract_inner(key)
            .map_err(|e| anyhow::anyhow!("Failed to get '{}': {}", key, e))
    }

    /// The `[pipeline]` table; missing fields fall back to [`PipelineSettings::default`].
    pub fn pipeline(&self) -> anyhow::Result<PipelineSettings> {
        if !self.figment.contains("pipeline") {
            return Ok(PipelineSettings::default());
        }
        self.get("pipeline")
    }

    fn validate(&self) -> anyhow::Result<()> {
        if self.figment.contains("pipeline") {
            self.pipeline()?.validate()?;
        }
        Ok(())
    }
}

/// Backends a pipeline can be assembled from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BackendKind {
    #[serde(rename = "tfidf")]
    TfIdf,
    #[serde(rename = "bm25_okapi")]
    Bm25Okapi,
    #[serde(rename = "bm25_l")]
    Bm25L,
    #[serde(rename = "keyword")]
    Keyword,
    #[serde(rename = "tantivy")]
    Tantivy,
}

impl BackendKind {
    pub const ALL: [BackendKind; 5] =
        [BackendKind::TfIdf, BackendKind::Bm25Okapi, BackendKind::Bm25L, BackendKind::Keyword, BackendKind::Tantivy];

    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::TfIdf => "tfidf",
            BackendKind::Bm25Okapi => "bm25_okapi",
            BackendKind::Bm25L => "bm25_l",
            BackendKind::Keyword => "keyword",
            BackendKind::Tantivy => "tantivy",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for BackendKind {
    type Err = crate::error::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BackendKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| crate::error::Error::InvalidConfig(format!("unknown backend '{}'", s)))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetrieverSettings {
    pub backend: BackendKind,
    pub on: String,
}

/// Declarative description of a composed pipeline.
///
/// Retrievers are listed in priority order: earlier entries win ties when
/// the same document surfaces from several of them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineSettings {
    pub key: String,
    pub k: Option<usize>,
    pub parallel: bool,
    pub on_child_failure: ChildFailurePolicy,
    pub retrievers: Vec<RetrieverSettings>,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            key: "id".to_string(),
            k: None,
            parallel: false,
            on_child_failure: ChildFailurePolicy::FailFast,
            retrievers: vec![
                RetrieverSettings { backend: BackendKind::TfIdf, on: "title".to_string() },
                RetrieverSettings { backend: BackendKind::TfIdf, on: "article".to_string() },
            ],
        }
    }
}

impl PipelineSettings {
    pub fn validate(&self) -> crate::error::Result<()> {
        use crate::error::Error;
        if self.key.is_empty() { return Err(Error::InvalidConfig("pipeline.key is empty".into())); }
        if self.retrievers.is_empty() { return Err(Error::InvalidConfig("pipeline.retrievers is empty".into())); }
        if let Some(r) = self.retrievers.iter().find(|r| r.on.is_empty()) {
            return Err(Error::InvalidConfig(format!("{} retriever has an empty 'on' field", r.backend)));
        }
        validate_k(self.k)
    }
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    // Expand env vars first
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    // Expand ~ at start
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}
