//! Selection Matcher
//!
//! Decides whether a canonical artifact name (`depo_summary_ron_dadash`)
//! belongs to a set of human-facing selection labels
//! (`"Deposition of Plaintiff Ron Dadash"`). Matching is a two-stage
//! pipeline:
//!
//! 1. [`SelectionMatcher::normalize`] turns either side into a
//!    [`NormalizedLabel`]: lowercase tokens with file extensions,
//!    stopwords and leading category tags removed, and multi-word phrases
//!    folded into canonical tokens (`special interrogatories` -> `srog`).
//! 2. [`NormalizedLabel::matches_with`] compares two normalized labels.
//!    Discriminating tokens (`frog`, `srog`, `rfp`, `rfa`) name distinct
//!    instrument types: two labels that both carry some and share none
//!    never match, however much of the surrounding name they have in
//!    common.

use crate::config::{SelectionConfig, DEFAULT_MIN_OVERLAP_RATIO, DEFAULT_MIN_SHARED_TOKENS};
use std::collections::{BTreeSet, HashSet};

const FILE_EXTENSIONS: &[&str] = &["pdf", "docx", "doc", "txt", "rtf", "msg"];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizedLabel {
    /// Identifying tokens in their original order
    pub tokens: Vec<String>,
    /// Discriminating tokens present in `tokens`
    pub discriminators: BTreeSet<String>,
}

impl NormalizedLabel {
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Match with the default thresholds
    pub fn matches(&self, other: &NormalizedLabel) -> bool {
        self.matches_with(other, DEFAULT_MIN_SHARED_TOKENS, DEFAULT_MIN_OVERLAP_RATIO)
    }

    pub fn matches_with(
        &self,
        other: &NormalizedLabel,
        min_shared_tokens: usize,
        min_overlap_ratio: f32,
    ) -> bool {
        if self.is_empty() || other.is_empty() {
            return false;
        }

        if !self.discriminators.is_empty()
            && !other.discriminators.is_empty()
            && self.discriminators.is_disjoint(&other.discriminators)
        {
            return false;
        }

        if contains_run(&self.tokens, &other.tokens) || contains_run(&other.tokens, &self.tokens) {
            return true;
        }

        let ours: HashSet<&str> = self.tokens.iter().map(String::as_str).collect();
        let theirs: HashSet<&str> = other.tokens.iter().map(String::as_str).collect();
        let shared = ours.intersection(&theirs).count();
        let smaller = ours.len().min(theirs.len());

        shared >= min_shared_tokens && shared as f32 >= min_overlap_ratio * smaller as f32
    }
}

/// Does `haystack` contain `needle` as a contiguous token sequence?
fn contains_run(haystack: &[String], needle: &[String]) -> bool {
    !needle.is_empty()
        && needle.len() <= haystack.len()
        && haystack.windows(needle.len()).any(|window| window == needle)
}

#[derive(Debug, Clone)]
pub struct SelectionMatcher {
    config: SelectionConfig,
    folds: Vec<(Vec<String>, String)>,
}

impl Default for SelectionMatcher {
    fn default() -> Self {
        Self::new(SelectionConfig::default())
    }
}

impl SelectionMatcher {
    pub fn new(config: SelectionConfig) -> Self {
        let folds = config
            .phrase_folds
            .iter()
            .map(|fold| {
                let phrase = fold
                    .phrase
                    .split_whitespace()
                    .map(str::to_lowercase)
                    .collect();
                (phrase, fold.token.to_lowercase())
            })
            .filter(|(phrase, _): &(Vec<String>, String)| !phrase.is_empty())
            .collect();
        Self { config, folds }
    }

    pub fn normalize(&self, text: &str) -> NormalizedLabel {
        let lowered = strip_extension(text.trim().to_lowercase());

        let raw: Vec<String> = lowered
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect();

        let folded = self.fold_phrases(raw);

        let mut tokens: Vec<String> = folded
            .into_iter()
            .filter(|t| !self.config.stopwords.contains(t))
            .collect();

        let leading_tags = tokens
            .iter()
            .take_while(|t| self.config.category_tags.contains(t))
            .count();
        if leading_tags < tokens.len() {
            tokens.drain(..leading_tags);
        }

        let discriminators = tokens
            .iter()
            .filter(|t| self.config.discriminators.contains(t))
            .cloned()
            .collect();

        NormalizedLabel {
            tokens,
            discriminators,
        }
    }

    fn fold_phrases(&self, tokens: Vec<String>) -> Vec<String> {
        let mut folded = Vec::with_capacity(tokens.len());
        let mut pos = 0;

        while pos < tokens.len() {
            let rest = &tokens[pos..];
            match self
                .folds
                .iter()
                .find(|(phrase, _)| rest.starts_with(phrase))
            {
                Some((phrase, token)) => {
                    folded.push(token.clone());
                    pos += phrase.len();
                }
                None => {
                    folded.push(tokens[pos].clone());
                    pos += 1;
                }
            }
        }

        folded
    }

    pub fn labels_match(&self, left: &str, right: &str) -> bool {
        if left.trim().to_lowercase() == right.trim().to_lowercase() {
            return true;
        }
        self.normalize(left).matches_with(
            &self.normalize(right),
            self.config.min_shared_tokens,
            self.config.min_overlap_ratio,
        )
    }

    /// `None` means no filter: every name is selected
    pub fn matches_selection<S: AsRef<str>>(&self, name: &str, selections: Option<&[S]>) -> bool {
        let Some(selections) = selections else {
            return true;
        };

        let matched = selections
            .iter()
            .map(|label| label.as_ref())
            .find(|label: &&str| self.labels_match(name, label));

        match matched {
            Some(label) => {
                tracing::debug!("🎯 '{}' matches selection '{}'", name, label);
                true
            }
            None => {
                tracing::debug!("   '{}' matches none of {} selections", name, selections.len());
                false
            }
        }
    }
}

fn strip_extension(mut lowered: String) -> String {
    if let Some((stem, ext)) = lowered.rsplit_once('.') {
        if FILE_EXTENSIONS.contains(&ext) {
            let stem_len = stem.len();
            lowered.truncate(stem_len);
        }
    }
    lowered
}

/// Normalize with the default [`SelectionConfig`]
pub fn normalize(text: &str) -> NormalizedLabel {
    SelectionMatcher::default().normalize(text)
}

/// [`SelectionMatcher::matches_selection`] with the default configuration
pub fn matches_selection<S: AsRef<str>>(name: &str, selections: Option<&[S]>) -> bool {
    SelectionMatcher::default().matches_selection(name, selections)
}
