use crate::config::EngineConfig;
use crate::document::InMemoryDocument;
use crate::rules::{ApplicationReport, PresetCatalog, RuleEngine, RuleSet};
use crate::storage::{calculate_content_hash, calculate_document_hash, DocumentStorage, FileStorage};
use anyhow::{Context, Result};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Simple profiler that collects timings for processing steps
pub struct StepProfiler {
    enabled: bool,
    timings: Vec<(String, Duration)>,
}

impl StepProfiler {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            timings: Vec::new(),
        }
    }

    pub fn time_step<F, R>(&mut self, step_name: &str, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        if !self.enabled {
            return f();
        }

        let start = Instant::now();
        let result = f();
        let elapsed = start.elapsed();

        self.timings.push((step_name.to_string(), elapsed));
        println!("⏱️  {}: {:.0}ms", step_name, elapsed.as_millis());

        result
    }

    pub fn timings(&self) -> &[(String, Duration)] {
        &self.timings
    }

    pub fn print_summary(&self) {
        if !self.enabled || self.timings.is_empty() {
            return;
        }

        println!("\n📊 Performance Summary:");
        let total: Duration = self.timings.iter().map(|(_, d)| *d).sum();

        for (step, duration) in &self.timings {
            let percentage = if total.is_zero() {
                0.0
            } else {
                (duration.as_secs_f64() / total.as_secs_f64()) * 100.0
            };
            println!(
                "   {:.<35} {:.0}ms ({:.1}%)",
                step,
                duration.as_millis(),
                percentage
            );
        }
        println!("   {:.<35} {:.0}ms", "Total", total.as_millis());
    }
}

/// Where the rules for a run come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleSource {
    /// A JSON or YAML rule set file
    File(PathBuf),
    /// Selected built-in presets, applied in precedence order
    Presets(Vec<String>),
    /// Every built-in preset
    Standard,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessOptions {
    /// Apply rules but never write the document back
    pub dry_run: bool,
    /// Print step and per-rule timings
    pub profile: bool,
}

/// Result of processing one document file
#[derive(Debug, Clone, Serialize)]
pub struct ProcessOutcome {
    pub report: ApplicationReport,
    /// Whether the document file was rewritten
    pub saved: bool,
    pub before_hash: String,
    pub after_hash: String,
    /// Fingerprint of the rule file, when the rules came from one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rules_hash: Option<String>,
}

impl ProcessOutcome {
    pub fn changed(&self) -> bool {
        self.before_hash != self.after_hash
    }

    /// Write the outcome, report included, as pretty JSON
    pub fn write_report(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)
            .with_context(|| format!("Failed to write report {}", path.display()))?;
        Ok(())
    }
}

pub struct DocumentProcessor {
    storage: Box<dyn DocumentStorage + Send + Sync>,
    rule_engine: RuleEngine,
    presets: PresetCatalog,
}

impl DocumentProcessor {
    /// Create DocumentProcessor with full dependency injection
    pub fn new_with_dependencies(
        storage: Box<dyn DocumentStorage + Send + Sync>,
        config: EngineConfig,
    ) -> Result<Self> {
        Ok(Self {
            storage,
            rule_engine: RuleEngine::new(config),
            presets: PresetCatalog::builtin()?,
        })
    }

    /// Create DocumentProcessor backed by snapshot files
    pub fn new(config: EngineConfig) -> Result<Self> {
        Self::new_with_dependencies(Box::new(FileStorage::new()), config)
    }

    pub fn engine(&self) -> &RuleEngine {
        &self.rule_engine
    }

    pub fn engine_mut(&mut self) -> &mut RuleEngine {
        &mut self.rule_engine
    }

    pub fn presets(&self) -> &PresetCatalog {
        &self.presets
    }

    pub fn load_rule_set(&self, source: &RuleSource) -> Result<RuleSet> {
        let limits = &self.rule_engine.config().limits;
        let rule_set = match source {
            RuleSource::File(path) => RuleSet::load_from_file(path, limits)?,
            RuleSource::Presets(keys) => self.presets.rule_set(keys.as_slice(), limits)?,
            RuleSource::Standard => self.presets.standard_rule_set(limits)?,
        };
        Ok(rule_set)
    }

    /// Apply the rules from `source` to the document snapshot at `path`.
    ///
    /// The document is written back only when the pass changed it and
    /// `dry_run` is off. Unit errors do not fail the call; they are in the
    /// returned report.
    pub fn process_document(
        &self,
        path: &Path,
        source: &RuleSource,
        options: ProcessOptions,
    ) -> Result<ProcessOutcome> {
        let start_time = Instant::now();
        let mut profiler = StepProfiler::new(options.profile);

        let rule_set = profiler.time_step("Rule Loading", || self.load_rule_set(source))?;
        println!(
            "📋 Loaded rule set '{}' ({} rules, {} enabled)",
            rule_set.name,
            rule_set.len(),
            rule_set.enabled_count()
        );
        for warning in rule_set.warnings() {
            println!("⚠️  {}", warning);
        }
        let rules_hash = match source {
            RuleSource::File(rules_path) => {
                let bytes = fs::read(rules_path)
                    .with_context(|| format!("Failed to read rule file {}", rules_path.display()))?;
                Some(calculate_content_hash(&bytes))
            }
            RuleSource::Presets(_) | RuleSource::Standard => None,
        };

        let mut document: InMemoryDocument = profiler
            .time_step("Document Loading", || self.storage.load(path))
            .with_context(|| format!("Failed to load document {}", path.display()))?;
        println!(
            "📄 Processing document: {} ({} paragraphs)",
            path.display(),
            document.paragraphs().len()
        );

        let before_hash = calculate_document_hash(document.document())?;
        let report = profiler.time_step("Rule Application", || {
            self.rule_engine.apply_rules(&mut document, &rule_set)
        });
        let after_hash = calculate_document_hash(document.document())?;

        let changed = before_hash != after_hash;
        let saved = if changed && !options.dry_run {
            profiler.time_step("Document Saving", || self.storage.save(path, &document))?;
            true
        } else {
            false
        };

        tracing::info!(
            document = %path.display(),
            mutations = report.mutation_count(),
            errors = report.error_count(),
            changed,
            saved,
            "document processed"
        );

        if options.profile {
            profiler.print_summary();
            let rule_timings = self.rule_engine.rule_timings.borrow();
            if !rule_timings.is_empty() {
                println!("\n📊 Rule Timings:");
                for (rule, duration) in rule_timings.iter() {
                    println!("   {:.<35} {:.3}ms", rule, duration.as_secs_f64() * 1000.0);
                }
            }
        }

        if saved {
            println!("💾 Saved {}", path.display());
        } else if changed {
            println!("🔍 Dry run: {} left untouched", path.display());
        } else {
            println!("✅ No changes needed");
        }
        println!(
            "⏱️  Total processing time: {:.0}ms",
            start_time.elapsed().as_millis()
        );

        Ok(ProcessOutcome {
            report,
            saved,
            before_hash,
            after_hash,
            rules_hash,
        })
    }
}
