use super::action::{Action, ActionExecutor};
use super::rule_set::{Rule, RuleSet};
use super::trigger::Scope;
use crate::config::{DebugConfig, EngineConfig};
use crate::document::{DocumentModel, ParagraphSnapshot};
use crate::error::{ConvergenceWarning, UnitError};
use crate::types::UnitRef;
use chrono::{DateTime, Utc};
use regex::Regex;
use serde::Serialize;
use std::collections::HashSet;
use std::time::{Duration, Instant};
use uuid::Uuid;

/// One change made by one rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MutationRecord {
    pub rule: String,
    pub unit: UnitRef,
    /// Action kind: replace, format or cycle
    pub kind: &'static str,
    /// Text edits made or properties changed
    pub edits: usize,
}

/// Outcome of one `apply_rules` pass
#[derive(Debug, Clone, Serialize)]
pub struct ApplicationReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub document: String,
    pub rule_set: String,
    pub paragraphs_visited: usize,
    pub rules_enabled: usize,
    pub mutations: Vec<MutationRecord>,
    pub errors: Vec<UnitError>,
    pub warnings: Vec<ConvergenceWarning>,
}

impl ApplicationReport {
    fn start(document: &str, rule_set: &RuleSet) -> Self {
        let now = Utc::now();
        Self {
            run_id: Uuid::new_v4(),
            started_at: now,
            finished_at: now,
            document: document.to_string(),
            rule_set: rule_set.name.clone(),
            paragraphs_visited: 0,
            rules_enabled: rule_set.enabled_count(),
            mutations: Vec::new(),
            errors: Vec::new(),
            warnings: rule_set.warnings().to_vec(),
        }
    }

    /// False when any unit could not be read or mutated
    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn mutation_count(&self) -> usize {
        self.mutations.len()
    }

    pub fn error_count(&self) -> usize {
        self.errors.len()
    }

    /// Distinct paragraphs touched, in document order
    pub fn changed_paragraphs(&self) -> Vec<usize> {
        let mut indices: Vec<usize> = self
            .mutations
            .iter()
            .filter_map(|m| m.unit.paragraph_index())
            .collect();
        indices.sort_unstable();
        indices.dedup();
        indices
    }
}

// Paragraph filter for debug tracing: regex, or plain substring when the
// pattern does not compile
enum DebugFilter {
    Pattern(Regex),
    Substring(String),
}

impl DebugFilter {
    fn new(pattern: &str) -> Self {
        match Regex::new(pattern) {
            Ok(regex) => DebugFilter::Pattern(regex),
            Err(_) => DebugFilter::Substring(pattern.to_string()),
        }
    }

    fn is_match(&self, text: &str) -> bool {
        match self {
            DebugFilter::Pattern(regex) => regex.is_match(text),
            DebugFilter::Substring(needle) => text.contains(needle.as_str()),
        }
    }
}

/// What one rule did to one paragraph: the changes made before any failure
#[derive(Debug, Default)]
struct RuleOutcome {
    records: Vec<MutationRecord>,
    error: Option<UnitError>,
}

pub struct RuleEngine {
    config: EngineConfig,
    executor: ActionExecutor,
    debug_filters: Vec<DebugFilter>,
    pub rule_timings: std::cell::RefCell<Vec<(String, Duration)>>,
}

impl RuleEngine {
    pub fn new(config: EngineConfig) -> Self {
        let executor = ActionExecutor::new(&config);
        let debug_filters = compile_debug_filters(&config.debug);
        Self {
            config,
            executor,
            debug_filters,
            rule_timings: std::cell::RefCell::new(Vec::new()),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn set_debug_config(&mut self, debug_config: DebugConfig) {
        self.debug_filters = compile_debug_filters(&debug_config);
        self.config.debug = debug_config;
    }

    /// Apply every enabled rule to the document in one pass.
    ///
    /// Document-scoped rules run first, once each, against the whole text.
    /// Then each paragraph is visited in order and paragraph/run rules are
    /// applied in rule-set order, each seeing the paragraph as left by the
    /// rules before it. A unit that cannot be read or mutated is recorded in
    /// the report and the pass moves on to the next paragraph.
    pub fn apply_rules(
        &self,
        document: &mut dyn DocumentModel,
        rule_set: &RuleSet,
    ) -> ApplicationReport {
        let mut report = ApplicationReport::start(document.name(), rule_set);
        let mut timings: Vec<(String, Duration)> = rule_set
            .iter()
            .filter(|r| r.enabled)
            .map(|r| (r.name.clone(), Duration::ZERO))
            .collect();
        let mut failed_paragraphs = HashSet::new();

        tracing::info!(
            "⚙️  Applying {} enabled rules from '{}' to {}",
            report.rules_enabled,
            rule_set.name,
            report.document
        );

        let enabled: Vec<(usize, &Rule)> = rule_set
            .iter()
            .filter(|r| r.enabled)
            .enumerate()
            .collect();

        // STEP 1: document-scoped rules, once each
        for (slot, rule) in enabled.iter().filter(|(_, r)| r.scope() == Scope::Document) {
            let started = Instant::now();
            self.apply_document_rule(rule, document, &mut report, &mut failed_paragraphs);
            timings[*slot].1 += started.elapsed();
        }

        // STEP 2: paragraph and run rules, paragraph by paragraph
        let unit_rules: Vec<(usize, &Rule)> = enabled
            .iter()
            .copied()
            .filter(|(_, r)| r.scope() != Scope::Document)
            .collect();

        if !unit_rules.is_empty() {
            for index in 0..document.paragraph_count() {
                let mut snapshot = match document.read_paragraph(index) {
                    Ok(snapshot) => snapshot,
                    Err(e) => {
                        record_error(&mut report, &mut failed_paragraphs, index, e);
                        continue;
                    }
                };
                report.paragraphs_visited += 1;

                if self.config.skip_blank_paragraphs && snapshot.is_blank() {
                    continue;
                }

                for (slot, rule) in &unit_rules {
                    let started = Instant::now();
                    let outcome = match rule.scope() {
                        Scope::Paragraph => self.apply_paragraph_rule(rule, &snapshot, document),
                        Scope::Run => self.apply_run_rule(rule, &snapshot, document),
                        Scope::Document => RuleOutcome::default(),
                    };
                    timings[*slot].1 += started.elapsed();

                    let changed = !outcome.records.is_empty();
                    for record in &outcome.records {
                        tracing::debug!(
                            "   ✏️  {} on {} ({} edits)",
                            record.rule,
                            record.unit,
                            record.edits
                        );
                    }
                    report.mutations.extend(outcome.records);

                    if let Some(e) = outcome.error {
                        let e = e.for_rule(&rule.name);
                        record_error(&mut report, &mut failed_paragraphs, index, e);
                        break;
                    }
                    if !changed {
                        continue;
                    }

                    // Later rules see this rule's result
                    match document.read_paragraph(index) {
                        Ok(updated) => snapshot = updated,
                        Err(e) => {
                            record_error(&mut report, &mut failed_paragraphs, index, e);
                            break;
                        }
                    }
                    self.trace_paragraph(&rule.name, &snapshot);
                }
            }
        }

        report.finished_at = Utc::now();
        *self.rule_timings.borrow_mut() = timings;

        tracing::info!(
            "✅ {} mutations across {} paragraphs, {} errors",
            report.mutation_count(),
            report.changed_paragraphs().len(),
            report.error_count()
        );
        report
    }

    fn apply_document_rule(
        &self,
        rule: &Rule,
        document: &mut dyn DocumentModel,
        report: &mut ApplicationReport,
        failed_paragraphs: &mut HashSet<usize>,
    ) {
        let mut readable = Vec::new();
        let mut texts = Vec::new();
        for index in 0..document.paragraph_count() {
            match document.read_paragraph(index) {
                Ok(snapshot) => {
                    readable.push(index);
                    texts.push(snapshot.text);
                }
                Err(e) => record_error(report, failed_paragraphs, index, e),
            }
        }

        let whole_text = texts.join("\n");
        if !rule.trigger.matches(&whole_text) {
            return;
        }
        tracing::debug!("📄 Document rule '{}' fired", rule.name);

        match &rule.action {
            Action::Format { .. } => {
                match self
                    .executor
                    .apply(&rule.action, &rule.trigger, UnitRef::Document, document)
                {
                    Ok(result) if result.changed => report.mutations.push(MutationRecord {
                        rule: rule.name.clone(),
                        unit: UnitRef::Document,
                        kind: rule.action.kind(),
                        edits: result.edits,
                    }),
                    Ok(_) => {}
                    Err(e) => report.errors.push(e.for_rule(&rule.name)),
                }
            }
            Action::Replace { .. } | Action::Cycle { .. } => {
                let Some(substitution) = rule.action.substitution(&whole_text) else {
                    return;
                };
                for index in readable {
                    let unit = UnitRef::Paragraph { index };
                    match self
                        .executor
                        .substitute(&rule.trigger, unit, substitution, document)
                    {
                        Ok(result) if result.changed => report.mutations.push(MutationRecord {
                            rule: rule.name.clone(),
                            unit,
                            kind: rule.action.kind(),
                            edits: result.edits,
                        }),
                        Ok(_) => {}
                        Err(e) => {
                            record_error(report, failed_paragraphs, index, e.for_rule(&rule.name))
                        }
                    }
                }
            }
        }
    }

    fn apply_paragraph_rule(
        &self,
        rule: &Rule,
        snapshot: &ParagraphSnapshot,
        document: &mut dyn DocumentModel,
    ) -> RuleOutcome {
        let mut outcome = RuleOutcome::default();
        if !rule
            .trigger
            .matches_paragraph(snapshot, self.config.match_list_strings)
        {
            return outcome;
        }

        let unit = UnitRef::Paragraph {
            index: snapshot.index,
        };
        match self.executor.apply(&rule.action, &rule.trigger, unit, document) {
            Ok(result) => outcome
                .records
                .extend(changed_record(rule, unit, result.changed, result.edits)),
            Err(e) => outcome.error = Some(e),
        }
        outcome
    }

    fn apply_run_rule(
        &self,
        rule: &Rule,
        snapshot: &ParagraphSnapshot,
        document: &mut dyn DocumentModel,
    ) -> RuleOutcome {
        let mut outcome = RuleOutcome::default();
        if !rule.trigger.accepts_paragraph(snapshot) {
            return outcome;
        }

        // A run edit never moves the other runs, so the snapshot stays valid.
        // Runs already rewritten keep their records when a later run fails.
        for (run, text) in snapshot.runs.iter().enumerate() {
            if !rule.trigger.matches(text) {
                continue;
            }
            let unit = UnitRef::Run {
                paragraph: snapshot.index,
                run,
            };
            match self.executor.apply(&rule.action, &rule.trigger, unit, document) {
                Ok(result) => outcome
                    .records
                    .extend(changed_record(rule, unit, result.changed, result.edits)),
                Err(e) => {
                    outcome.error = Some(e);
                    break;
                }
            }
        }
        outcome
    }

    /// Would a paragraph with this text be traced after a mutation?
    pub fn traces(&self, text: &str) -> bool {
        self.config.debug.enabled && self.debug_filters.iter().any(|f| f.is_match(text))
    }

    /// Trace a mutated paragraph when it matches a debug filter
    fn trace_paragraph(&self, rule_name: &str, snapshot: &ParagraphSnapshot) {
        if !self.traces(&snapshot.text) {
            return;
        }

        let preview = if snapshot.text.chars().count() > 50 {
            format!("{}...", snapshot.text.chars().take(47).collect::<String>())
        } else {
            snapshot.text.clone()
        };
        tracing::info!(
            "🔍 [{}] paragraph {}: \"{}\" (style: {}, list: {})",
            rule_name,
            snapshot.index + 1,
            preview,
            snapshot.style,
            snapshot.list_string.as_deref().unwrap_or("-")
        );
    }
}

impl Default for RuleEngine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

fn compile_debug_filters(debug: &DebugConfig) -> Vec<DebugFilter> {
    debug
        .filter_patterns
        .iter()
        .map(|p| DebugFilter::new(p))
        .collect()
}

fn changed_record(rule: &Rule, unit: UnitRef, changed: bool, edits: usize) -> Option<MutationRecord> {
    changed.then(|| MutationRecord {
        rule: rule.name.clone(),
        unit,
        kind: rule.action.kind(),
        edits,
    })
}

// Each paragraph reports at most one error per pass
fn record_error(
    report: &mut ApplicationReport,
    failed_paragraphs: &mut HashSet<usize>,
    index: usize,
    error: UnitError,
) {
    if failed_paragraphs.insert(index) {
        tracing::warn!("⚠️  Skipping {}", error);
        report.errors.push(error);
    }
}
