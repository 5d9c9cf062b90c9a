//! End-to-end rule application tests.
//!
//! These drive the public API only: rule sets parsed from JSON, the
//! built-in presets, the in-memory document provider and a provider that
//! fails on purpose. Each test checks a property of a whole engine pass
//! rather than a single matcher or action.

use redline_core::rules::RuleEngine;
use redline_core::{
    Alignment, Document, DocumentModel, EngineConfig, Formatting, InMemoryDocument, LoadError,
    Paragraph, ParagraphSnapshot, PresetCatalog, RegexLimits, RuleSet, RuleSetError, Run,
    TextEdit, UnitError, UnitRef,
};

// ============================================================================
// Helpers
// ============================================================================

const PLAINTIFFS_RULES: &str = r#"{
    "name": "party names",
    "rules": [
        {
            "name": "Plaintiffs article",
            "trigger": {"pattern": "Plaintiffs", "case_sensitive": true, "whole_word": true},
            "action": {"type": "replace", "replacement": "the Plaintiffs"}
        }
    ]
}"#;

fn rules(json: &str) -> RuleSet {
    RuleSet::from_json_str(json, "inline", &RegexLimits::default()).expect("rule set should load")
}

fn sample_brief() -> InMemoryDocument {
    InMemoryDocument::new(
        "brief",
        Document::new(vec![
            Paragraph::new("INTRODUCTION"),
            Paragraph::new("Plaintiffs argue that the contract was never formed."),
            Paragraph::new("Background of the dispute").with_list("A."),
            Paragraph::new("Formation").with_list("1."),
            Paragraph::new("Offer was made in writing").with_list("\u{2022}"),
            Paragraph::new("CONCLUSION"),
            Paragraph::new("STATEMENT OF FACTS"),
        ]),
    )
}

/// Provider that refuses to read one paragraph and to rewrite another
struct FlakyDocument {
    inner: InMemoryDocument,
    unreadable: usize,
    read_only: usize,
}

impl DocumentModel for FlakyDocument {
    fn name(&self) -> &str {
        "flaky"
    }

    fn paragraph_count(&self) -> usize {
        self.inner.paragraph_count()
    }

    fn read_paragraph(&self, index: usize) -> Result<ParagraphSnapshot, UnitError> {
        if index == self.unreadable {
            return Err(UnitError::new(
                UnitRef::Paragraph { index },
                "paragraph is locked by another editor",
            ));
        }
        self.inner.read_paragraph(index)
    }

    fn replace_text(&mut self, unit: UnitRef, edits: &[TextEdit]) -> Result<bool, UnitError> {
        if unit.paragraph_index() == Some(self.read_only) {
            return Err(UnitError::new(unit, "paragraph is read-only"));
        }
        self.inner.replace_text(unit, edits)
    }

    fn apply_formatting(&mut self, unit: UnitRef, formatting: &Formatting) -> Result<usize, UnitError> {
        self.inner.apply_formatting(unit, formatting)
    }
}

/// Provider whose runs after the first refuse text edits
struct FirstRunOnlyDocument {
    inner: InMemoryDocument,
}

impl DocumentModel for FirstRunOnlyDocument {
    fn name(&self) -> &str {
        "first-run-only"
    }

    fn paragraph_count(&self) -> usize {
        self.inner.paragraph_count()
    }

    fn read_paragraph(&self, index: usize) -> Result<ParagraphSnapshot, UnitError> {
        self.inner.read_paragraph(index)
    }

    fn replace_text(&mut self, unit: UnitRef, edits: &[TextEdit]) -> Result<bool, UnitError> {
        if let UnitRef::Run { run, .. } = unit {
            if run > 0 {
                return Err(UnitError::new(unit, "run is protected"));
            }
        }
        self.inner.replace_text(unit, edits)
    }

    fn apply_formatting(&mut self, unit: UnitRef, formatting: &Formatting) -> Result<usize, UnitError> {
        self.inner.apply_formatting(unit, formatting)
    }
}

// ============================================================================
// Replace rules and the canonical-form guard
// ============================================================================

#[test]
fn plaintiffs_rule_adds_article_once() {
    let rule_set = rules(PLAINTIFFS_RULES);
    assert_eq!(rule_set.warnings().len(), 1, "self-matching replace should warn at load");

    let mut doc = InMemoryDocument::from_lines(
        "motion",
        ["Plaintiffs argue that...", "The Plaintiffs filed a motion."],
    );
    let engine = RuleEngine::default();
    let report = engine.apply_rules(&mut doc, &rule_set);

    assert!(report.is_success());
    assert_eq!(
        doc.texts(),
        vec!["the Plaintiffs argue that...", "The Plaintiffs filed a motion."]
    );
    assert_eq!(report.changed_paragraphs(), vec![0]);
    assert_eq!(report.warnings.len(), 1);
}

#[test]
fn second_pass_is_a_no_op() {
    let rule_set = rules(PLAINTIFFS_RULES);
    let mut doc = InMemoryDocument::from_lines("motion", ["Plaintiffs argue that Plaintiffs win."]);
    let engine = RuleEngine::default();

    engine.apply_rules(&mut doc, &rule_set);
    let after_first = doc.texts();
    let second = engine.apply_rules(&mut doc, &rule_set);

    assert_eq!(after_first, vec!["the Plaintiffs argue that the Plaintiffs win."]);
    assert_eq!(second.mutation_count(), 0);
    assert_eq!(doc.texts(), after_first);
}

#[test]
fn unguarded_engine_repeats_the_article() {
    let rule_set = rules(PLAINTIFFS_RULES);
    let mut doc = InMemoryDocument::from_lines("motion", ["The Plaintiffs filed a motion."]);
    let engine = RuleEngine::new(EngineConfig {
        guard_canonical_forms: false,
        ..Default::default()
    });

    engine.apply_rules(&mut doc, &rule_set);
    assert_eq!(doc.texts(), vec!["The the Plaintiffs filed a motion."]);
}

// ============================================================================
// Formatting rules
// ============================================================================

#[test]
fn catch_all_rule_formats_every_paragraph() {
    let rule_set = rules(
        r#"[{"name": "spacing", "trigger": {"pattern": ""},
             "action": {"type": "format", "formatting": {"space_after": 24}}}]"#,
    );
    let mut doc = InMemoryDocument::from_lines("memo", ["First", "", "Third paragraph"]);

    let report = RuleEngine::default().apply_rules(&mut doc, &rule_set);

    assert!(report.is_success());
    assert_eq!(report.paragraphs_visited, 3);
    assert!(doc.paragraphs().iter().all(|p| p.format.space_after == 24.0));
}

#[test]
fn empty_rule_set_leaves_document_untouched() {
    let mut doc = sample_brief();
    let before = doc.document().clone();

    let report = RuleEngine::default().apply_rules(&mut doc, &RuleSet::empty("nothing"));

    assert!(report.is_success());
    assert_eq!(report.mutation_count(), 0);
    assert_eq!(report.rules_enabled, 0);
    assert_eq!(doc.document(), &before);
}

#[test]
fn standard_presets_format_a_brief() {
    let catalog = PresetCatalog::builtin().unwrap();
    let rule_set = catalog.standard_rule_set(&RegexLimits::default()).unwrap();
    let mut doc = sample_brief();

    let report = RuleEngine::default().apply_rules(&mut doc, &rule_set);
    assert!(report.is_success(), "errors: {:?}", report.errors);

    // Indents are stored in points
    let paragraphs = doc.paragraphs();

    let heading = &paragraphs[0];
    assert!(heading.runs[0].font.bold);
    assert_eq!(heading.runs[0].font.name.as_deref(), Some("Times New Roman"));
    assert_eq!(heading.format.alignment, Alignment::Left);

    let narrative = &paragraphs[1];
    assert_eq!(narrative.format.first_line_indent, 36.0);
    assert!(!narrative.runs[0].font.bold);

    let level_a = &paragraphs[2];
    assert_eq!(level_a.format.left_indent, 72.0);
    assert_eq!(level_a.format.first_line_indent, -36.0);
    assert!(level_a.runs[0].font.bold);
    assert!(level_a.runs[0].font.underline);

    let level_1 = &paragraphs[3];
    assert_eq!(level_1.format.left_indent, 108.0);
    assert!(level_1.runs[0].font.underline);

    let bullet = &paragraphs[4];
    assert_eq!(bullet.format.left_indent, 72.0);
    assert_eq!(bullet.format.space_after, 6.0);
    assert!(!bullet.runs[0].font.bold);
    assert!(!bullet.runs[0].font.underline);

    assert!(paragraphs[5].runs[0].font.bold);

    // All-caps headings outside the named list are still not narrative
    let statement = &paragraphs[6];
    assert!(statement.runs[0].font.bold);
    assert_eq!(statement.format.first_line_indent, 0.0);

    // Formatting already in place is not reapplied
    let second = RuleEngine::default().apply_rules(&mut doc, &rule_set);
    assert_eq!(second.mutation_count(), 0);
}

#[test]
fn preset_selection_applies_only_chosen_rules() {
    let catalog = PresetCatalog::builtin().unwrap();
    let rule_set = catalog
        .rule_set(&["bullet"], &RegexLimits::default())
        .unwrap();
    let mut doc = sample_brief();

    let report = RuleEngine::default().apply_rules(&mut doc, &rule_set);

    assert_eq!(report.changed_paragraphs(), vec![4]);
    assert!(!doc.paragraphs()[0].runs[0].font.bold);
}

// ============================================================================
// Load-time validation
// ============================================================================

#[test]
fn run_scoped_paragraph_formatting_is_rejected() {
    let result = RuleSet::from_json_str(
        r#"[
            {"name": "ok", "trigger": {"scope": "run", "pattern": "v."},
             "action": {"type": "format", "formatting": {"font_italic": true}}},
            {"name": "indent runs", "trigger": {"scope": "run", "pattern": "Id."},
             "action": {"type": "format", "formatting": {"left_indent": 1.0}}},
            {"name": "space runs", "trigger": {"scope": "run", "pattern": "See"},
             "action": {"type": "format", "formatting": {"space_after": 6}}}
        ]"#,
        "inline",
        &RegexLimits::default(),
    );

    match result {
        Err(RuleSetError::ScopeMismatch(mismatches)) => {
            let names: Vec<_> = mismatches.iter().map(|m| m.rule.as_str()).collect();
            assert_eq!(names, vec!["indent runs", "space runs"]);
        }
        other => panic!("expected scope mismatches, got {:?}", other.map(|r| r.len())),
    }
}

#[test]
fn invalid_pattern_names_the_rule() {
    let result = RuleSet::from_json_str(
        r#"[{"name": "broken", "trigger": {"match_type": "regex", "pattern": "(unclosed"},
             "action": {"type": "replace", "replacement": "x"}}]"#,
        "inline",
        &RegexLimits::default(),
    );

    match result {
        Err(RuleSetError::Load(LoadError::InvalidPattern { rule, .. })) => assert_eq!(rule, "broken"),
        other => panic!("expected invalid pattern, got {:?}", other.map(|r| r.len())),
    }
}

// ============================================================================
// Provider failures
// ============================================================================

#[test]
fn unit_errors_are_recorded_and_the_pass_continues() {
    let rule_set = rules(PLAINTIFFS_RULES);
    let mut doc = FlakyDocument {
        inner: InMemoryDocument::from_lines(
            "flaky",
            [
                "Plaintiffs argue first.",
                "Plaintiffs argue second.",
                "Plaintiffs argue third.",
                "Plaintiffs argue fourth.",
            ],
        ),
        unreadable: 1,
        read_only: 2,
    };

    let report = RuleEngine::default().apply_rules(&mut doc, &rule_set);

    assert!(!report.is_success());
    assert_eq!(report.error_count(), 2);
    assert_eq!(report.errors[0].unit, UnitRef::Paragraph { index: 1 });
    assert_eq!(report.errors[1].rule.as_deref(), Some("Plaintiffs article"));
    assert_eq!(report.changed_paragraphs(), vec![0, 3]);
    assert_eq!(
        doc.inner.texts(),
        vec![
            "the Plaintiffs argue first.",
            "Plaintiffs argue second.",
            "Plaintiffs argue third.",
            "the Plaintiffs argue fourth.",
        ]
    );
}

#[test]
fn run_edits_made_before_a_failure_are_reported() {
    let rule_set = rules(
        r#"[{"name": "expand Pl.", "trigger": {"scope": "run", "pattern": "Pl."},
             "action": {"type": "replace", "replacement": "Plaintiff"}}]"#,
    );
    let mut doc = FirstRunOnlyDocument {
        inner: InMemoryDocument::new(
            "runs",
            Document::new(vec![Paragraph::from_runs(vec![
                Run::new("Pl. a "),
                Run::new("Pl. b"),
            ])]),
        ),
    };

    let report = RuleEngine::default().apply_rules(&mut doc, &rule_set);

    assert_eq!(doc.inner.texts(), vec!["Plaintiff a Pl. b"]);
    assert_eq!(report.mutation_count(), 1);
    assert_eq!(report.mutations[0].unit, UnitRef::Run { paragraph: 0, run: 0 });
    assert_eq!(report.changed_paragraphs(), vec![0]);
    assert_eq!(report.error_count(), 1);
    assert_eq!(report.errors[0].unit, UnitRef::Run { paragraph: 0, run: 1 });
}
