//! Action Executor
//!
//! Applies one action to one unit through the [`DocumentModel`] mutation
//! interface. Text edits for a unit are planned against the text as read,
//! then handed to the provider in one call, so a unit is either fully
//! rewritten or left alone.

use super::trigger::CompiledTrigger;
use crate::config::EngineConfig;
use crate::document::DocumentModel;
use crate::error::UnitError;
use crate::types::{Formatting, MutationResult, TextEdit, UnitRef};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Action {
    /// Substitute every match within the unit
    Replace { replacement: String },
    /// Set the listed properties, leave everything else alone
    #[serde(alias = "format_advanced")]
    Format { formatting: Formatting },
    /// Rotate through variations: replace matches with the variation after
    /// the first one present in the unit (or the first, if none is)
    Cycle { variations: Vec<String> },
}

impl Action {
    pub fn kind(&self) -> &'static str {
        match self {
            Action::Replace { .. } => "replace",
            Action::Format { .. } => "format",
            Action::Cycle { .. } => "cycle",
        }
    }

    pub fn rewrites_text(&self) -> bool {
        !matches!(self, Action::Format { .. })
    }

    /// Text to substitute for matches in `unit_text`; `None` for `format`
    pub fn substitution(&self, unit_text: &str) -> Option<Substitution<'_>> {
        match self {
            Action::Replace { replacement } => Some(Substitution::Template(replacement)),
            Action::Format { .. } => None,
            Action::Cycle { variations } => {
                let next = variations
                    .iter()
                    .position(|v| !v.is_empty() && unit_text.contains(v.as_str()))
                    .map_or(0, |i| (i + 1) % variations.len());
                variations.get(next).map(|v| Substitution::Literal(v))
            }
        }
    }
}

/// Replacement text chosen for one application
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Substitution<'a> {
    /// Expanded against regex captures (`$1`, `${name}`) when the trigger is a regex
    Template(&'a str),
    /// Inserted verbatim
    Literal(&'a str),
}

pub struct ActionExecutor {
    guard_canonical_forms: bool,
}

impl ActionExecutor {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            guard_canonical_forms: config.guard_canonical_forms,
        }
    }

    /// Apply `action` to a paragraph or run unit, or `format` to the whole
    /// document. Document-wide text rewrites go through [`Self::substitute`]
    /// one paragraph at a time.
    pub fn apply(
        &self,
        action: &Action,
        trigger: &CompiledTrigger,
        unit: UnitRef,
        document: &mut dyn DocumentModel,
    ) -> Result<MutationResult, UnitError> {
        match action {
            Action::Format { formatting } => {
                let changed = document.apply_formatting(unit, formatting)?;
                Ok(MutationResult::changed(changed))
            }
            Action::Replace { .. } | Action::Cycle { .. } => {
                let text = read_unit_text(document, unit)?;
                match action.substitution(&text) {
                    Some(substitution) => self.substitute(trigger, unit, substitution, document),
                    None => Ok(MutationResult::unchanged()),
                }
            }
        }
    }

    /// Replace every span the trigger selects in the unit's current text
    pub fn substitute(
        &self,
        trigger: &CompiledTrigger,
        unit: UnitRef,
        substitution: Substitution<'_>,
        document: &mut dyn DocumentModel,
    ) -> Result<MutationResult, UnitError> {
        let text = read_unit_text(document, unit)?;
        let edits = self.plan_edits(trigger, &text, substitution);
        if edits.is_empty() {
            return Ok(MutationResult::unchanged());
        }

        let changed = document.replace_text(unit, &edits)?;
        Ok(if changed {
            MutationResult::changed(edits.len())
        } else {
            MutationResult::unchanged()
        })
    }

    /// Edits for one unit text; single pass, the result is not re-scanned
    pub fn plan_edits(
        &self,
        trigger: &CompiledTrigger,
        text: &str,
        substitution: Substitution<'_>,
    ) -> Vec<TextEdit> {
        let spans = trigger.find_spans(text);
        if spans.is_empty() {
            return Vec::new();
        }

        let candidates: Vec<TextEdit> = match (substitution, trigger.regex()) {
            (Substitution::Template(template), Some(regex)) => regex
                .captures_iter(text)
                .filter_map(|caps| {
                    let whole = caps.get(0)?;
                    let mut expanded = String::new();
                    caps.expand(template, &mut expanded);
                    Some(TextEdit::new(whole.range(), expanded))
                })
                .collect(),
            (Substitution::Template(text_out), None) | (Substitution::Literal(text_out), _) => {
                spans
                    .into_iter()
                    .map(|span| TextEdit::new(span, text_out))
                    .collect()
            }
        };

        let guard = self.guard_canonical_forms && matches!(substitution, Substitution::Template(_));
        candidates
            .into_iter()
            .filter(|edit| text[edit.range.clone()] != edit.replacement)
            .filter(|edit| !(guard && sits_inside_replacement(text, edit)))
            .collect()
    }
}

fn read_unit_text(document: &dyn DocumentModel, unit: UnitRef) -> Result<String, UnitError> {
    match unit {
        UnitRef::Document => Err(UnitError::new(
            unit,
            "text actions at document scope are applied per paragraph",
        )),
        UnitRef::Paragraph { index } => Ok(document.read_paragraph(index)?.text),
        UnitRef::Run { paragraph, run } => {
            let snapshot = document.read_paragraph(paragraph)?;
            let count = snapshot.runs.len();
            snapshot.runs.into_iter().nth(run).ok_or_else(|| {
                UnitError::new(unit, format!("paragraph has only {count} runs"))
            })
        }
    }
}

// True when the matched span already lies within an occurrence of its own
// replacement (ASCII case folded), e.g. "Plaintiffs" inside "The Plaintiffs".
fn sits_inside_replacement(text: &str, edit: &TextEdit) -> bool {
    let haystack = text.as_bytes();
    let needle = edit.replacement.as_bytes();
    let span = &edit.range;

    if needle.is_empty() || needle.len() < span.len() || needle.len() > haystack.len() {
        return false;
    }

    let lowest = span.end.saturating_sub(needle.len());
    let highest = span.start.min(haystack.len() - needle.len());
    (lowest..=highest).any(|start| haystack[start..start + needle.len()].eq_ignore_ascii_case(needle))
}
