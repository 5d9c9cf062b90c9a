//! Trigger Matcher
//!
//! A trigger is compiled once, when its rule set is loaded. Every match type
//! is lowered to a size-limited [`Regex`], so `contains`, `exact` and
//! `starts_with` share one search path with `regex` and a bad pattern can
//! only fail at load time.

use crate::config::RegexLimits;
use crate::document::ParagraphSnapshot;
use crate::error::LoadError;
use crate::types::Formatting;
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use std::ops::Range;

fn default_true() -> bool {
    true
}

/// Granularity at which a trigger is evaluated and its action confined
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    #[serde(alias = "all_text")]
    Document,
    #[default]
    Paragraph,
    Run,
}

impl Scope {
    pub fn as_str(&self) -> &'static str {
        match self {
            Scope::Document => "document",
            Scope::Paragraph => "paragraph",
            Scope::Run => "run",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchType {
    #[default]
    Contains,
    Exact,
    Regex,
    StartsWith,
}

/// Serialized trigger record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TriggerSpec {
    #[serde(default)]
    pub scope: Scope,
    #[serde(default)]
    pub match_type: MatchType,
    #[serde(default)]
    pub pattern: String,
    #[serde(default = "default_true")]
    pub case_sensitive: bool,
    #[serde(default)]
    pub whole_word: bool,
    /// Paragraph must (or must not) be a list item
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_list: Option<bool>,
    /// Regex the paragraph's list label must match
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub list_string_regex: Option<String>,
    /// Paragraph style name must equal this
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,
    /// Candidate text matching this regex never fires the trigger
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclude_pattern: Option<String>,
    /// Properties the paragraph must already carry; font keys must hold on every run
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub property_match: Option<Formatting>,
}

impl TriggerSpec {
    pub fn new(scope: Scope, match_type: MatchType, pattern: &str) -> Self {
        Self {
            scope,
            match_type,
            pattern: pattern.to_string(),
            case_sensitive: true,
            whole_word: false,
            is_list: None,
            list_string_regex: None,
            style: None,
            exclude_pattern: None,
            property_match: None,
        }
    }

    /// Empty pattern on a literal match type: fires on any text
    pub fn is_catch_all(&self) -> bool {
        self.pattern.is_empty() && self.match_type != MatchType::Regex
    }
}

/// Compile a regex with the configured size limits
pub(crate) fn compile_regex_safe(
    pattern: &str,
    case_insensitive: bool,
    limits: &RegexLimits,
) -> Result<Regex, String> {
    if pattern.chars().count() > limits.max_pattern_length {
        return Err(format!(
            "pattern exceeds maximum length of {} characters",
            limits.max_pattern_length
        ));
    }

    RegexBuilder::new(pattern)
        .case_insensitive(case_insensitive)
        .size_limit(limits.size_limit)
        .dfa_size_limit(limits.dfa_size_limit)
        .build()
        .map_err(|e| e.to_string())
}

fn invalid_pattern(rule: &str, field: &'static str, message: String) -> LoadError {
    LoadError::InvalidPattern {
        rule: rule.to_string(),
        field,
        message,
    }
}

/// A trigger ready for matching
#[derive(Debug, Clone)]
pub struct CompiledTrigger {
    spec: TriggerSpec,
    /// `None` for catch-all triggers
    matcher: Option<Regex>,
    exclude: Option<Regex>,
    list_string: Option<Regex>,
}

impl CompiledTrigger {
    pub fn compile(rule: &str, spec: TriggerSpec, limits: &RegexLimits) -> Result<Self, LoadError> {
        let case_insensitive = !spec.case_sensitive;

        let matcher = if spec.is_catch_all() {
            None
        } else {
            let source = match spec.match_type {
                MatchType::Regex => spec.pattern.clone(),
                MatchType::Contains => regex::escape(&spec.pattern),
                MatchType::Exact => format!(r"\A(?:{})\z", regex::escape(&spec.pattern)),
                // Group 1 is the span; leading whitespace is skipped, not replaced
                MatchType::StartsWith => format!(r"\A\s*({})", regex::escape(&spec.pattern)),
            };
            let regex = compile_regex_safe(&source, case_insensitive, limits)
                .map_err(|m| invalid_pattern(rule, "pattern", m))?;
            Some(regex)
        };

        let exclude = spec
            .exclude_pattern
            .as_deref()
            .map(|p| compile_regex_safe(p, case_insensitive, limits))
            .transpose()
            .map_err(|m| invalid_pattern(rule, "exclude_pattern", m))?;

        let list_string = spec
            .list_string_regex
            .as_deref()
            .map(|p| compile_regex_safe(p, false, limits))
            .transpose()
            .map_err(|m| invalid_pattern(rule, "list_string_regex", m))?;

        Ok(Self {
            spec,
            matcher,
            exclude,
            list_string,
        })
    }

    pub fn spec(&self) -> &TriggerSpec {
        &self.spec
    }

    pub fn scope(&self) -> Scope {
        self.spec.scope
    }

    pub fn match_type(&self) -> MatchType {
        self.spec.match_type
    }

    /// Search regex for `regex` triggers, used for capture expansion
    pub(crate) fn regex(&self) -> Option<&Regex> {
        match self.spec.match_type {
            MatchType::Regex => self.matcher.as_ref(),
            _ => None,
        }
    }

    /// Does the trigger fire on this text?
    pub fn matches(&self, candidate: &str) -> bool {
        !self.find_spans(candidate).is_empty()
    }

    /// Non-overlapping byte spans the trigger selects in `text`, left to right
    pub fn find_spans(&self, text: &str) -> Vec<Range<usize>> {
        if self.is_excluded(text) {
            return Vec::new();
        }

        let Some(matcher) = &self.matcher else {
            return vec![0..text.len()];
        };

        match self.spec.match_type {
            MatchType::Regex | MatchType::Exact => {
                matcher.find_iter(text).map(|m| m.range()).collect()
            }
            MatchType::StartsWith => matcher
                .captures(text)
                .and_then(|caps| caps.get(1))
                .map(|m| m.range())
                .filter(|span| !self.spec.whole_word || is_word_bounded(text, span))
                .into_iter()
                .collect(),
            MatchType::Contains => {
                if self.spec.whole_word {
                    find_whole_words(matcher, text)
                } else {
                    matcher.find_iter(text).map(|m| m.range()).collect()
                }
            }
        }
    }

    fn is_excluded(&self, text: &str) -> bool {
        self.exclude.as_ref().is_some_and(|re| re.is_match(text))
    }

    /// Paragraph-level filters: list membership, list label, style, properties
    pub fn accepts_paragraph(&self, paragraph: &ParagraphSnapshot) -> bool {
        if let Some(is_list) = self.spec.is_list {
            if paragraph.is_list() != is_list {
                return false;
            }
        }

        if let Some(re) = &self.list_string {
            match &paragraph.list_string {
                Some(label) if re.is_match(label) => {}
                _ => return false,
            }
        }

        if let Some(style) = &self.spec.style {
            if &paragraph.style != style {
                return false;
            }
        }

        if let Some(properties) = &self.spec.property_match {
            if !properties.is_satisfied_by(&paragraph.style, &paragraph.format, &paragraph.fonts) {
                return false;
            }
        }

        true
    }

    /// Paragraph-scope test: filters, then the text or "<label> <text>"
    pub fn matches_paragraph(&self, paragraph: &ParagraphSnapshot, match_list_strings: bool) -> bool {
        if !self.accepts_paragraph(paragraph) {
            return false;
        }
        if self.matches(&paragraph.text) {
            return true;
        }
        match_list_strings
            && paragraph
                .labelled_text()
                .is_some_and(|labelled| self.matches(&labelled))
    }
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn is_word_bounded(text: &str, span: &Range<usize>) -> bool {
    let before = text[..span.start].chars().next_back();
    let after = text[span.end..].chars().next();
    !before.is_some_and(is_word_char) && !after.is_some_and(is_word_char)
}

// A rejected candidate restarts one character later so that a bounded
// occurrence overlapping it is still found.
fn find_whole_words(matcher: &Regex, text: &str) -> Vec<Range<usize>> {
    let mut spans = Vec::new();
    let mut pos = 0;

    while pos <= text.len() {
        let Some(m) = matcher.find_at(text, pos) else {
            break;
        };
        let span = m.range();
        if is_word_bounded(text, &span) {
            pos = if span.is_empty() {
                next_char_boundary(text, span.end)
            } else {
                span.end
            };
            spans.push(span);
        } else {
            pos = next_char_boundary(text, span.start);
        }
    }

    spans
}

fn next_char_boundary(text: &str, from: usize) -> usize {
    text[from..]
        .chars()
        .next()
        .map_or(text.len() + 1, |c| from + c.len_utf8())
}
