//! Site configuration (`crucible.toml`).
//!
//! Deliberately thin: no theme-system UX and no template-language
//! configuration here, just the strict-incremental three-state switch, the
//! scheduler strategy choice, and worker/related-posts tuning knobs.

use crate::primitives::hash::{ContentHash, hash_dict};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Strict-incremental three-state switch.
///
/// Deliberately not a boolean: `Warn` is for library consumers who need to
/// see cache anomalies but cannot afford a hard build failure; `Error` is
/// the CI path where any anomaly must abort.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrictMode {
    Off,
    Warn,
    Error,
}

impl StrictMode {
    pub fn from_env() -> Self {
        match std::env::var("CRUCIBLE_STRICT_INCREMENTAL")
            .unwrap_or_default()
            .to_lowercase()
            .as_str()
        {
            "error" => StrictMode::Error,
            "warn" => StrictMode::Warn,
            _ => StrictMode::Off,
        }
    }
}

impl Default for StrictMode {
    fn default() -> Self {
        StrictMode::Off
    }
}

/// Rendering batch strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SchedulerStrategy {
    #[default]
    TemplateFirst,
    Topological,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    #[serde(skip)]
    pub root_path: PathBuf,
    #[serde(skip)]
    pub output_dir: PathBuf,

    pub title: String,
    pub base_url: String,
    pub theme: Option<String>,

    pub strict_incremental: StrictMode,
    pub scheduler_strategy: SchedulerStrategy,
    /// `0` means auto-tune (see `scheduler::workers`).
    pub worker_override: usize,
    pub related_posts_limit: usize,
    pub related_posts_max_site_size: usize,
    pub generate_redirects_file: bool,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            root_path: PathBuf::new(),
            output_dir: PathBuf::from("public"),
            title: String::new(),
            base_url: String::new(),
            theme: None,
            strict_incremental: StrictMode::default(),
            scheduler_strategy: SchedulerStrategy::default(),
            worker_override: 0,
            related_posts_limit: 5,
            related_posts_max_site_size: 5000,
            generate_redirects_file: false,
        }
    }
}

impl SiteConfig {
    pub fn load(root_path: &Path) -> anyhow::Result<Self> {
        let config_path = root_path.join("crucible.toml");
        let mut config: SiteConfig = if config_path.exists() {
            let raw = std::fs::read_to_string(&config_path)?;
            toml::from_str(&raw)?
        } else {
            SiteConfig::default()
        };
        config.root_path = root_path.to_path_buf();
        if config.output_dir.is_relative() {
            config.output_dir = root_path.join(&config.output_dir);
        }
        Ok(config)
    }

    /// Stable content hash of the merged, effective config — used by the
    /// planner to detect config changes that must force a full rebuild.
    pub fn content_hash(&self) -> ContentHash {
        hash_dict(self)
    }
}
