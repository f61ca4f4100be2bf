use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::allocate::AllocationRules;
use crate::model::OverlapPolicy;
use crate::topics::TopicPlan;

/// People per group when nothing else is configured.
pub const DEFAULT_GROUP_SIZE: usize = 4;
/// Topics per run when nothing else is configured.
pub const DEFAULT_TOPIC_COUNT: usize = 3;
/// Project-level config file, looked up in the working directory.
pub const PROJECT_CONFIG_FILE: &str = "mingle.toml";

/// One configuration layer. Every key is optional so layers can be stacked:
/// built-in defaults, then the user file, then the project file (or
/// `--config`), then command-line flags.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigLayer {
    #[serde(default)]
    pub group_size: Option<usize>,
    #[serde(default)]
    pub topics: Option<usize>,
    #[serde(default)]
    pub avoid_repeat: Option<bool>,
    #[serde(default)]
    pub department: Option<OverlapPolicy>,
    #[serde(default)]
    pub level: Option<OverlapPolicy>,
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default)]
    pub output: Option<String>,
}

/// Fully resolved settings for one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Settings {
    pub group_size: usize,
    pub topics: usize,
    pub avoid_repeat: bool,
    pub department: OverlapPolicy,
    pub level: OverlapPolicy,
    pub seed: Option<u64>,
    pub output: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            group_size: DEFAULT_GROUP_SIZE,
            topics: DEFAULT_TOPIC_COUNT,
            avoid_repeat: false,
            department: OverlapPolicy::None,
            level: OverlapPolicy::None,
            seed: None,
            output: None,
        }
    }
}

impl Settings {
    /// Overwrite every key that `layer` sets.
    pub fn apply(&mut self, layer: &ConfigLayer) {
        if let Some(size) = layer.group_size {
            self.group_size = size;
        }
        if let Some(topics) = layer.topics {
            self.topics = topics;
        }
        if let Some(avoid) = layer.avoid_repeat {
            self.avoid_repeat = avoid;
        }
        if let Some(policy) = layer.department {
            self.department = policy;
        }
        if let Some(policy) = layer.level {
            self.level = policy;
        }
        if layer.seed.is_some() {
            self.seed = layer.seed;
        }
        if layer.output.is_some() {
            self.output.clone_from(&layer.output);
        }
    }

    /// Reject values the allocator cannot run with.
    ///
    /// # Errors
    ///
    /// Returns an error if the group size or topic count is zero, or the
    /// output mode is not one of `pretty`, `text`, `json`.
    pub fn validate(&self) -> Result<()> {
        if self.group_size == 0 {
            bail!("group_size must be at least 1");
        }
        if self.topics == 0 {
            bail!("topics must be at least 1");
        }
        if let Some(output) = self.output.as_deref()
            && normalize_output_mode(output).is_none()
        {
            bail!("unknown output mode '{output}' (expected pretty, text or json)");
        }
        Ok(())
    }

    /// The plan handed to the topic orchestrator.
    #[must_use]
    pub const fn topic_plan(&self) -> TopicPlan {
        TopicPlan {
            topic_count: self.topics,
            rules: AllocationRules::new(self.group_size)
                .with_department(self.department)
                .with_level(self.level),
            avoid_repeat: self.avoid_repeat,
        }
    }
}

/// Canonicalize an output mode name. Legacy `human`/`table` are accepted.
#[must_use]
pub fn normalize_output_mode(raw: &str) -> Option<&'static str> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "pretty" | "human" => Some("pretty"),
        "text" | "table" => Some("text"),
        "json" => Some("json"),
        _ => None,
    }
}

/// Parse a config file. The file must exist.
///
/// # Errors
///
/// Returns an error if the file cannot be read or is not valid TOML for
/// [`ConfigLayer`].
pub fn load_config_file(path: &Path) -> Result<ConfigLayer> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    toml::from_str::<ConfigLayer>(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))
}

/// Load `mingle.toml` from `project_root`, or an empty layer if absent.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load_project_config(project_root: &Path) -> Result<ConfigLayer> {
    let path = project_root.join(PROJECT_CONFIG_FILE);
    if !path.exists() {
        return Ok(ConfigLayer::default());
    }
    load_config_file(&path)
}

/// Path of the per-user config file, if the platform has a config dir.
#[must_use]
pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("mingle/config.toml"))
}

/// Load the per-user config file, or an empty layer if absent.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load_user_config() -> Result<ConfigLayer> {
    let Some(path) = user_config_path() else {
        return Ok(ConfigLayer::default());
    };
    if !path.exists() {
        return Ok(ConfigLayer::default());
    }
    load_config_file(&path)
}

/// Resolve the effective settings for a run.
///
/// `explicit` replaces the project file lookup; `flags` holds the values given
/// on the command line and wins over every file.
///
/// # Errors
///
/// Returns an error if any config file is unreadable or invalid, or if the
/// merged settings fail [`Settings::validate`].
pub fn resolve_settings(
    project_root: &Path,
    explicit: Option<&Path>,
    flags: &ConfigLayer,
) -> Result<Settings> {
    let user = load_user_config()?;
    let project = match explicit {
        Some(path) => load_config_file(path)?,
        None => load_project_config(project_root)?,
    };
    merge_layers(&[user, project, flags.clone()])
}

fn merge_layers(layers: &[ConfigLayer]) -> Result<Settings> {
    let mut settings = Settings::default();
    for layer in layers {
        settings.apply(layer);
    }
    settings.validate()?;
    Ok(settings)
}
