use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;

// Default value functions for serde
fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Skip replace matches that already sit inside their own replacement
    /// text ("The Plaintiffs" for a "Plaintiffs" -> "the Plaintiffs" rule)
    #[serde(default = "default_true")]
    pub guard_canonical_forms: bool,
    /// Also test paragraph triggers against "<list label> <text>" for list items
    #[serde(default = "default_true")]
    pub match_list_strings: bool,
    /// Do not evaluate paragraph/run rules on paragraphs with no visible text
    #[serde(default)]
    pub skip_blank_paragraphs: bool,
    /// Compilation limits applied to every rule pattern
    #[serde(default)]
    pub limits: RegexLimits,
    /// Paragraph tracing while rules run
    #[serde(default)]
    pub debug: DebugConfig,
    /// Normalization rules for the selection matcher
    #[serde(default)]
    pub selection: SelectionConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            guard_canonical_forms: true,
            match_list_strings: true,
            skip_blank_paragraphs: false,
            limits: RegexLimits::default(),
            debug: DebugConfig::default(),
            selection: SelectionConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegexLimits {
    /// Longest pattern accepted, in characters
    #[serde(default = "default_max_pattern_length")]
    pub max_pattern_length: usize,
    /// Compiled program size limit in bytes
    #[serde(default = "default_size_limit")]
    pub size_limit: usize,
    /// Lazy DFA cache limit in bytes
    #[serde(default = "default_dfa_size_limit")]
    pub dfa_size_limit: usize,
}

fn default_max_pattern_length() -> usize {
    1000
}

fn default_size_limit() -> usize {
    10 * (1 << 20)
}

fn default_dfa_size_limit() -> usize {
    2 * (1 << 20)
}

impl Default for RegexLimits {
    fn default() -> Self {
        Self {
            max_pattern_length: default_max_pattern_length(),
            size_limit: default_size_limit(),
            dfa_size_limit: default_dfa_size_limit(),
        }
    }
}

// Debug configuration for paragraph tracing
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DebugConfig {
    #[serde(default)]
    pub enabled: bool,
    /// Regex (or plain substring, if it fails to compile) selecting the
    /// paragraphs to trace
    #[serde(default)]
    pub filter_patterns: Vec<String>,
}

impl DebugConfig {
    pub fn new(enabled: bool, filter_patterns: Vec<String>) -> Self {
        Self {
            enabled,
            filter_patterns,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectionConfig {
    /// Leading category tags that say what kind of artifact a name is,
    /// not which one ("depo_summary_...", "discovery_summary_...")
    #[serde(default = "default_category_tags")]
    pub category_tags: Vec<String>,
    /// Tokens with no identifying value
    #[serde(default = "default_stopwords")]
    pub stopwords: Vec<String>,
    /// Phrase -> canonical token folds applied before matching
    #[serde(default = "default_phrase_folds")]
    pub phrase_folds: Vec<PhraseFold>,
    /// Canonical tokens naming distinct document categories; two labels
    /// carrying disjoint sets of these never match
    #[serde(default = "default_discriminators")]
    pub discriminators: Vec<String>,
    /// Minimum number of shared tokens for an overlap match
    #[serde(default = "default_min_shared_tokens")]
    pub min_shared_tokens: usize,
    /// Minimum share of the smaller token set that must overlap
    #[serde(default = "default_min_overlap_ratio")]
    pub min_overlap_ratio: f32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhraseFold {
    /// Space-separated lowercase tokens
    pub phrase: String,
    pub token: String,
}

impl PhraseFold {
    pub fn new(phrase: &str, token: &str) -> Self {
        Self {
            phrase: phrase.to_string(),
            token: token.to_string(),
        }
    }
}

fn default_category_tags() -> Vec<String> {
    ["depo", "discovery", "summary", "extraction"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_stopwords() -> Vec<String> {
    [
        "a", "an", "and", "of", "to", "the", "for", "s", "plaintiff", "plaintiffs", "defendant",
        "defendants",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_phrase_folds() -> Vec<PhraseFold> {
    // Longer phrases first: folds are tried in order at each position
    vec![
        PhraseFold::new("form interrogatories", "frog"),
        PhraseFold::new("form interrogatory", "frog"),
        PhraseFold::new("special interrogatories", "srog"),
        PhraseFold::new("special interrogatory", "srog"),
        PhraseFold::new("requests for production", "rfp"),
        PhraseFold::new("request for production", "rfp"),
        PhraseFold::new("requests for admissions", "rfa"),
        PhraseFold::new("requests for admission", "rfa"),
        PhraseFold::new("request for admissions", "rfa"),
        PhraseFold::new("request for admission", "rfa"),
        PhraseFold::new("frogs", "frog"),
        PhraseFold::new("srogs", "srog"),
        PhraseFold::new("rfps", "rfp"),
        PhraseFold::new("rfas", "rfa"),
        PhraseFold::new("deposition", "depo"),
        PhraseFold::new("responses", "resp"),
        PhraseFold::new("response", "resp"),
    ]
}

fn default_discriminators() -> Vec<String> {
    ["frog", "srog", "rfp", "rfa"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

pub const DEFAULT_MIN_SHARED_TOKENS: usize = 2;
pub const DEFAULT_MIN_OVERLAP_RATIO: f32 = 0.6;

fn default_min_shared_tokens() -> usize {
    DEFAULT_MIN_SHARED_TOKENS
}

fn default_min_overlap_ratio() -> f32 {
    DEFAULT_MIN_OVERLAP_RATIO
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            category_tags: default_category_tags(),
            stopwords: default_stopwords(),
            phrase_folds: default_phrase_folds(),
            discriminators: default_discriminators(),
            min_shared_tokens: default_min_shared_tokens(),
            min_overlap_ratio: default_min_overlap_ratio(),
        }
    }
}

impl EngineConfig {
    /// Load config from a YAML file
    pub fn load_from_file(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: EngineConfig = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Load config with fallback to default
    pub fn load_with_fallback(path: Option<&str>) -> Self {
        match path {
            Some(p) => Self::load_from_file(p).unwrap_or_else(|e| {
                tracing::warn!("⚠️  Failed to load config from {}: {}, using defaults", p, e);
                Self::default()
            }),
            None => Self::default(),
        }
    }
}
