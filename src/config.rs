//! Configuration management with layered loading
//!
//! Precedence (lowest to highest):
//! 1. Compiled defaults
//! 2. Global config: `$XDG_CONFIG_HOME/logsmith/logsmith.toml`
//! 3. Local config: `./logsmith.toml`, or the file passed via `--config`
//! 4. Environment variables: `LOGSMITH__*` prefix

use std::path::{Path, PathBuf};

use config::{Config, Environment};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::tree::{BuildOverrides, Thresholds};
use crate::util::expand_env_vars;

pub const LOCAL_CONFIG_NAME: &str = "logsmith.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("config file not found: {0}")]
    NotFound(PathBuf),
    #[error("read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("{field} must be {requirement}, got {value}")]
    OutOfRange {
        field: &'static str,
        requirement: &'static str,
        value: String,
    },
    #[error("{0}")]
    Invalid(String),
}

/// Hard overrides for the branch-or-generalize decision.
///
/// Tokens always compare against the raw token text; depths are zero-based
/// token positions.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct OverridesConfig {
    pub force_branch_tokens: Vec<String>,
    pub force_branch_depths: Vec<usize>,
    pub force_variable_tokens: Vec<String>,
    pub force_variable_depths: Vec<usize>,
}

/// Artifact destinations. Relative paths resolve against the working
/// directory of the run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct OutputConfig {
    pub tree_file: PathBuf,
    pub templates_file: PathBuf,
    pub parser_file: PathBuf,
    /// Cluster membership is only written when a path is configured.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clusters_file: Option<PathBuf>,
    pub visualize: bool,
    pub visualization_file: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            tree_file: PathBuf::from("tree.txt"),
            templates_file: PathBuf::from("templates.txt"),
            parser_file: PathBuf::from("parser.json"),
            clusters_file: None,
            visualize: false,
            visualization_file: PathBuf::from("tree.dot"),
        }
    }
}

/// Unified configuration for logsmith.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    /// Log file or directory to mine.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_file: Option<PathBuf>,
    /// Leading characters of every line taken as the timestamp; one separator
    /// character after it is skipped as well.
    pub timestamp_length: usize,
    /// Characters that split the remainder into tokens; every occurrence
    /// becomes a token of its own.
    pub delimiters: Vec<char>,
    /// Generalization thresholds for token depths one through six.
    pub theta1: f64,
    pub theta2: f64,
    pub theta3: f64,
    pub theta4: f64,
    pub theta5: f64,
    pub theta6: f64,
    /// Decay factor applied to the last threshold beyond depth six.
    pub damping: f64,
    /// Pairing floor for node-to-node affinity during branch merging.
    pub merge_similarity: f64,
    /// Minimum subtree similarity for merging two sibling branches.
    pub merge_subtrees_min_similarity: f64,
    /// Minimum value-set similarity for widening two list nodes.
    pub element_list_similarity: f64,
    /// Minimum height for shared-subtree deduplication.
    pub subtree_min_height: usize,
    pub overrides: OverridesConfig,
    pub output: OutputConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            input_file: None,
            // RFC 3164 syslog timestamp, e.g. "Jan  2 13:37:00"
            timestamp_length: 15,
            delimiters: vec![' '],
            theta1: 0.9,
            theta2: 0.85,
            theta3: 0.8,
            theta4: 0.75,
            theta5: 0.7,
            theta6: 0.65,
            damping: 0.9,
            merge_similarity: 0.8,
            merge_subtrees_min_similarity: 0.66,
            element_list_similarity: 0.66,
            subtree_min_height: 3,
            overrides: OverridesConfig::default(),
            output: OutputConfig::default(),
        }
    }
}

/// Raw overrides for intermediate parsing (arrays are Option to detect
/// "not specified").
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawOverridesConfig {
    pub force_branch_tokens: Option<Vec<String>>,
    pub force_branch_depths: Option<Vec<usize>>,
    pub force_variable_tokens: Option<Vec<String>>,
    pub force_variable_depths: Option<Vec<usize>>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawOutputConfig {
    pub tree_file: Option<PathBuf>,
    pub templates_file: Option<PathBuf>,
    pub parser_file: Option<PathBuf>,
    pub clusters_file: Option<PathBuf>,
    pub visualize: Option<bool>,
    pub visualization_file: Option<PathBuf>,
}

/// Raw settings for intermediate parsing.
///
/// All fields are Option so a layer only touches the keys it actually
/// specifies; unspecified keys inherit from the layer below.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawSettings {
    pub input_file: Option<PathBuf>,
    pub timestamp_length: Option<usize>,
    pub delimiters: Option<Vec<char>>,
    pub theta1: Option<f64>,
    pub theta2: Option<f64>,
    pub theta3: Option<f64>,
    pub theta4: Option<f64>,
    pub theta5: Option<f64>,
    pub theta6: Option<f64>,
    pub damping: Option<f64>,
    pub merge_similarity: Option<f64>,
    pub merge_subtrees_min_similarity: Option<f64>,
    pub element_list_similarity: Option<f64>,
    pub subtree_min_height: Option<usize>,
    #[serde(default)]
    pub overrides: RawOverridesConfig,
    #[serde(default)]
    pub output: RawOutputConfig,
}

/// Get the XDG config directory for logsmith.
pub fn global_config_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "logsmith").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the global config file.
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join(LOCAL_CONFIG_NAME))
}

/// Load a TOML file into RawSettings for manual merging.
fn load_raw_settings(path: &Path) -> Result<RawSettings, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
        path: path.to_path_buf(),
        source: e,
    })?;
    toml::from_str(&content).map_err(|e| ConfigError::Parse {
        path: path.to_path_buf(),
        source: e,
    })
}

impl Settings {
    /// Merge overlay config onto self (base). Overlay wins for every key it
    /// specifies, nested sections key by key.
    fn merge_with(&self, overlay: &RawSettings) -> Self {
        Self {
            input_file: overlay
                .input_file
                .clone()
                .or_else(|| self.input_file.clone()),
            timestamp_length: overlay.timestamp_length.unwrap_or(self.timestamp_length),
            delimiters: overlay
                .delimiters
                .clone()
                .unwrap_or_else(|| self.delimiters.clone()),
            theta1: overlay.theta1.unwrap_or(self.theta1),
            theta2: overlay.theta2.unwrap_or(self.theta2),
            theta3: overlay.theta3.unwrap_or(self.theta3),
            theta4: overlay.theta4.unwrap_or(self.theta4),
            theta5: overlay.theta5.unwrap_or(self.theta5),
            theta6: overlay.theta6.unwrap_or(self.theta6),
            damping: overlay.damping.unwrap_or(self.damping),
            merge_similarity: overlay.merge_similarity.unwrap_or(self.merge_similarity),
            merge_subtrees_min_similarity: overlay
                .merge_subtrees_min_similarity
                .unwrap_or(self.merge_subtrees_min_similarity),
            element_list_similarity: overlay
                .element_list_similarity
                .unwrap_or(self.element_list_similarity),
            subtree_min_height: overlay
                .subtree_min_height
                .unwrap_or(self.subtree_min_height),
            overrides: OverridesConfig {
                force_branch_tokens: overlay
                    .overrides
                    .force_branch_tokens
                    .clone()
                    .unwrap_or_else(|| self.overrides.force_branch_tokens.clone()),
                force_branch_depths: overlay
                    .overrides
                    .force_branch_depths
                    .clone()
                    .unwrap_or_else(|| self.overrides.force_branch_depths.clone()),
                force_variable_tokens: overlay
                    .overrides
                    .force_variable_tokens
                    .clone()
                    .unwrap_or_else(|| self.overrides.force_variable_tokens.clone()),
                force_variable_depths: overlay
                    .overrides
                    .force_variable_depths
                    .clone()
                    .unwrap_or_else(|| self.overrides.force_variable_depths.clone()),
            },
            output: OutputConfig {
                tree_file: overlay
                    .output
                    .tree_file
                    .clone()
                    .unwrap_or_else(|| self.output.tree_file.clone()),
                templates_file: overlay
                    .output
                    .templates_file
                    .clone()
                    .unwrap_or_else(|| self.output.templates_file.clone()),
                parser_file: overlay
                    .output
                    .parser_file
                    .clone()
                    .unwrap_or_else(|| self.output.parser_file.clone()),
                clusters_file: overlay
                    .output
                    .clusters_file
                    .clone()
                    .or_else(|| self.output.clusters_file.clone()),
                visualize: overlay.output.visualize.unwrap_or(self.output.visualize),
                visualization_file: overlay
                    .output
                    .visualization_file
                    .clone()
                    .unwrap_or_else(|| self.output.visualization_file.clone()),
            },
        }
    }

    /// Load settings with layered precedence.
    ///
    /// # Arguments
    /// * `config_file` - Optional explicit local config path. When absent,
    ///   `./logsmith.toml` is used if it exists.
    ///
    /// # Precedence (lowest to highest)
    /// 1. Compiled defaults
    /// 2. Global config: `$XDG_CONFIG_HOME/logsmith/logsmith.toml`
    /// 3. Local config file
    /// 4. Environment variables: `LOGSMITH__*` prefix
    pub fn load(config_file: Option<&Path>) -> Result<Self, ConfigError> {
        let mut current = Self::default();

        if let Some(global_path) = global_config_path() {
            if global_path.exists() {
                let raw = load_raw_settings(&global_path)?;
                current = current.merge_with(&raw);
            }
        }

        match config_file {
            Some(path) => {
                // An explicitly requested file must exist.
                if !path.exists() {
                    return Err(ConfigError::NotFound(path.to_path_buf()));
                }
                let raw = load_raw_settings(path)?;
                current = current.merge_with(&raw);
            }
            None => {
                let local = Path::new(LOCAL_CONFIG_NAME);
                if local.exists() {
                    let raw = load_raw_settings(local)?;
                    current = current.merge_with(&raw);
                }
            }
        }

        current = Self::apply_env_overrides(current)?;
        current.expand_paths();

        Ok(current)
    }

    /// Apply LOGSMITH__* environment variables as explicit overrides.
    ///
    /// The double underscore separates the prefix and nests section keys,
    /// e.g. `LOGSMITH__THETA1` and `LOGSMITH__OUTPUT__TREE_FILE`.
    /// The delimiter override is a plain string whose characters form the
    /// delimiter set.
    fn apply_env_overrides(mut settings: Self) -> Result<Self, ConfigError> {
        let builder = Config::builder().add_source(
            Environment::with_prefix("LOGSMITH")
                .separator("__")
                .list_separator(","),
        );

        let config = builder.build().map_err(config_err)?;

        if let Ok(val) = config.get_string("input_file") {
            settings.input_file = Some(PathBuf::from(val));
        }
        if let Ok(val) = config.get_int("timestamp_length") {
            settings.timestamp_length = usize::try_from(val).unwrap_or(0);
        }
        if let Ok(val) = config.get_string("delimiters") {
            settings.delimiters = val.chars().collect();
        }
        if let Ok(val) = config.get_float("theta1") {
            settings.theta1 = val;
        }
        if let Ok(val) = config.get_float("theta2") {
            settings.theta2 = val;
        }
        if let Ok(val) = config.get_float("theta3") {
            settings.theta3 = val;
        }
        if let Ok(val) = config.get_float("theta4") {
            settings.theta4 = val;
        }
        if let Ok(val) = config.get_float("theta5") {
            settings.theta5 = val;
        }
        if let Ok(val) = config.get_float("theta6") {
            settings.theta6 = val;
        }
        if let Ok(val) = config.get_float("damping") {
            settings.damping = val;
        }
        if let Ok(val) = config.get_float("merge_similarity") {
            settings.merge_similarity = val;
        }
        if let Ok(val) = config.get_float("merge_subtrees_min_similarity") {
            settings.merge_subtrees_min_similarity = val;
        }
        if let Ok(val) = config.get_float("element_list_similarity") {
            settings.element_list_similarity = val;
        }
        if let Ok(val) = config.get_int("subtree_min_height") {
            settings.subtree_min_height = usize::try_from(val).unwrap_or(0);
        }
        if let Ok(val) = config.get_string("output.tree_file") {
            settings.output.tree_file = PathBuf::from(val);
        }
        if let Ok(val) = config.get_string("output.templates_file") {
            settings.output.templates_file = PathBuf::from(val);
        }
        if let Ok(val) = config.get_string("output.parser_file") {
            settings.output.parser_file = PathBuf::from(val);
        }
        if let Ok(val) = config.get_string("output.clusters_file") {
            settings.output.clusters_file = Some(PathBuf::from(val));
        }
        if let Ok(val) = config.get_bool("output.visualize") {
            settings.output.visualize = val;
        }
        if let Ok(val) = config.get_string("output.visualization_file") {
            settings.output.visualization_file = PathBuf::from(val);
        }

        Ok(settings)
    }

    /// Expand shell variables and tilde in path-like fields.
    ///
    /// Handles `~`, `$VAR`, and `${VAR}` syntax.
    fn expand_paths(&mut self) {
        if let Some(input) = &self.input_file {
            self.input_file = Some(expand_path(input));
        }
        self.output.tree_file = expand_path(&self.output.tree_file);
        self.output.templates_file = expand_path(&self.output.templates_file);
        self.output.parser_file = expand_path(&self.output.parser_file);
        if let Some(clusters) = &self.output.clusters_file {
            self.output.clusters_file = Some(expand_path(clusters));
        }
        self.output.visualization_file = expand_path(&self.output.visualization_file);
    }

    /// Check value ranges before any processing starts.
    pub fn validate(&self) -> Result<(), ConfigError> {
        // A threshold of exactly zero would generalize every multi-valued
        // position, so thetas and damping exclude it; the similarity floors
        // may legitimately be zero.
        let positive_unit: [(&'static str, f64); 7] = [
            ("theta1", self.theta1),
            ("theta2", self.theta2),
            ("theta3", self.theta3),
            ("theta4", self.theta4),
            ("theta5", self.theta5),
            ("theta6", self.theta6),
            ("damping", self.damping),
        ];
        for (field, value) in positive_unit {
            if !(value > 0.0 && value <= 1.0) {
                return Err(ConfigError::OutOfRange {
                    field,
                    requirement: "within 0.0 (exclusive) ..= 1.0",
                    value: value.to_string(),
                });
            }
        }
        let unit_interval: [(&'static str, f64); 3] = [
            ("merge_similarity", self.merge_similarity),
            (
                "merge_subtrees_min_similarity",
                self.merge_subtrees_min_similarity,
            ),
            ("element_list_similarity", self.element_list_similarity),
        ];
        for (field, value) in unit_interval {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::OutOfRange {
                    field,
                    requirement: "within 0.0..=1.0",
                    value: value.to_string(),
                });
            }
        }
        if self.delimiters.is_empty() {
            return Err(ConfigError::Invalid(
                "delimiters must contain at least one character".into(),
            ));
        }
        if self.subtree_min_height == 0 {
            return Err(ConfigError::Invalid(
                "subtree_min_height must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// Thresholds in the shape the tree builder consumes.
    pub fn thresholds(&self) -> Thresholds {
        Thresholds::new(
            [
                self.theta1,
                self.theta2,
                self.theta3,
                self.theta4,
                self.theta5,
                self.theta6,
            ],
            self.damping,
        )
    }

    pub fn build_overrides(&self) -> BuildOverrides {
        BuildOverrides {
            branch_tokens: self.overrides.force_branch_tokens.clone(),
            branch_depths: self.overrides.force_branch_depths.clone(),
            variable_tokens: self.overrides.force_variable_tokens.clone(),
            variable_depths: self.overrides.force_variable_depths.clone(),
        }
    }

    /// Show the effective configuration as TOML.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self)
            .map_err(|e| ConfigError::Invalid(format!("serialize config: {e}")))
    }

    /// Generate a template config file.
    pub fn template() -> String {
        r#"# logsmith configuration
#
# Locations (by precedence, lowest to highest):
#   Global: ~/.config/logsmith/logsmith.toml
#   Local:  ./logsmith.toml, or the file passed via --config
#   Env:    LOGSMITH__* environment variables (explicit overrides)
#
# The double underscore separates the prefix and nests section keys:
#   LOGSMITH__THETA1=0.95
#   LOGSMITH__OUTPUT__TREE_FILE=out/tree.txt
# The delimiter override is a plain string; every character is a delimiter:
#   LOGSMITH__DELIMITERS=" ="

# Log file or directory to mine (directories are walked recursively)
# input_file = "logs/messages.log"

# Leading characters taken as the timestamp (plus one separator after it).
# 15 fits RFC 3164 syslog, 0 disables stripping.
# timestamp_length = 15

# Characters that split lines into tokens; each occurrence is its own token
# delimiters = [" "]

# Generalization thresholds for token depths one through six. A position
# generalizes to a wildcard when its distinct-value score exceeds the
# threshold for its depth; beyond depth six, theta6 decays with damping.
# theta1 = 0.9
# theta2 = 0.85
# theta3 = 0.8
# theta4 = 0.75
# theta5 = 0.7
# theta6 = 0.65
# damping = 0.9

# Pairing floor for node affinity during branch merging
# merge_similarity = 0.8

# Minimum subtree similarity for merging two sibling branches
# merge_subtrees_min_similarity = 0.66

# Minimum value-set similarity for widening two list nodes
# element_list_similarity = 0.66

# Minimum height for shared-subtree deduplication
# subtree_min_height = 3

[overrides]
# Tokens and zero-based depths that always branch or always generalize
# force_branch_tokens = []
# force_branch_depths = []
# force_variable_tokens = []
# force_variable_depths = []

[output]
# tree_file = "tree.txt"
# templates_file = "templates.txt"
# parser_file = "parser.json"
# clusters_file = "clusters.txt"
# visualize = false
# visualization_file = "tree.dot"
"#
        .to_string()
    }
}

fn expand_path(path: &Path) -> PathBuf {
    PathBuf::from(expand_env_vars(path.to_string_lossy().as_ref()))
}

fn config_err(e: config::ConfigError) -> ConfigError {
    ConfigError::Invalid(e.to_string())
}
