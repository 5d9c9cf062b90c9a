use anyhow::{bail, Result};
use clap::Parser;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

// Import from redline-core
use redline_core::{
    DebugConfig, DocumentProcessor, EngineConfig, PresetCatalog, ProcessOptions, RuleSource,
};

// Import CLI utilities
use redline::resolve_config_path;

#[derive(Parser)]
#[command(name = "redline")]
#[command(about = "Apply declarative formatting and rewrite rules to documents")]
struct Args {
    /// Path to the document snapshot (JSON or YAML)
    #[arg(short, long)]
    document: Option<PathBuf>,

    /// Path to a rule set file (JSON or YAML)
    #[arg(short, long, conflicts_with_all = ["preset", "standard"])]
    rules: Option<PathBuf>,

    /// Apply built-in presets by key (repeatable)
    #[arg(short, long = "preset", num_args = 1.., conflicts_with = "standard")]
    preset: Vec<String>,

    /// Apply every built-in preset
    #[arg(long)]
    standard: bool,

    /// Path to custom config file (YAML format)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Write the application report as JSON
    #[arg(long)]
    report: Option<PathBuf>,

    /// Apply rules without saving the document
    #[arg(long)]
    dry_run: bool,

    /// Enable detailed profiling of every processing step and rule
    #[arg(long)]
    profile: bool,

    /// Trace paragraphs while rules run
    #[arg(long)]
    debug: bool,

    /// Only trace paragraphs matching these patterns (with --debug)
    #[arg(long, num_args = 1..)]
    debug_filter: Vec<String>,

    /// Show the built-in presets and exit
    #[arg(long)]
    show_presets: bool,

    /// Export the selected presets (all of them by default) as a JSON rule set and exit
    #[arg(long)]
    export_preset: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    println!("🖋️  Redline Document Rules");

    if args.show_presets {
        show_presets(&PresetCatalog::builtin()?);
        return Ok(());
    }

    let config = load_config(&args);
    let mut processor = DocumentProcessor::new(config)?;

    if let Some(export_path) = &args.export_preset {
        if let Err(e) = export_presets(&processor, &args, export_path) {
            eprintln!("❌ Export failed: {e}");
            std::process::exit(1);
        }
        return Ok(());
    }

    if args.debug {
        processor
            .engine_mut()
            .set_debug_config(DebugConfig::new(true, args.debug_filter.clone()));
    }

    let Some(document) = &args.document else {
        bail!("--document is required (see --help)");
    };
    if !document.exists() {
        println!("⚠️  Document not found at: {}", document.display());
        println!("   Please check the file path.");
        std::process::exit(1);
    }

    let source = rule_source(&args)?;
    let options = ProcessOptions {
        dry_run: args.dry_run,
        profile: args.profile,
    };

    match processor.process_document(document, &source, options) {
        Ok(outcome) => {
            let report = &outcome.report;
            println!("📊 Results:");
            println!("   - Paragraphs visited: {}", report.paragraphs_visited);
            println!("   - Rules applied: {}", report.rules_enabled);
            println!("   - Mutations: {}", report.mutation_count());
            println!("   - Changed paragraphs: {}", report.changed_paragraphs().len());
            println!("   - Convergence warnings: {}", report.warnings.len());
            if let Some(hash) = &outcome.rules_hash {
                tracing::debug!(rules_hash = %hash, "rule file fingerprint");
            }

            if let Some(report_path) = &args.report {
                outcome.write_report(report_path)?;
                println!("💾 Report saved to: {}", report_path.display());
            }

            if !report.is_success() {
                eprintln!("❌ {} unit(s) could not be processed:", report.error_count());
                for error in &report.errors {
                    eprintln!("   - {error}");
                }
                std::process::exit(1);
            }
            println!("✅ Successfully processed document");
        }
        Err(e) => {
            eprintln!("❌ Processing failed: {e:#}");
            std::process::exit(1);
        }
    }

    Ok(())
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("redline=debug,redline_core=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn load_config(args: &Args) -> EngineConfig {
    match resolve_config_path(args.config.as_deref()) {
        Some(path) => {
            let path = path.display().to_string();
            println!("📋 Loading config from: {}", path);
            EngineConfig::load_with_fallback(Some(path.as_str()))
        }
        None => {
            println!("📋 Using default config");
            EngineConfig::default()
        }
    }
}

fn rule_source(args: &Args) -> Result<RuleSource> {
    if let Some(path) = &args.rules {
        return Ok(RuleSource::File(path.clone()));
    }
    if !args.preset.is_empty() {
        return Ok(RuleSource::Presets(args.preset.clone()));
    }
    if args.standard {
        return Ok(RuleSource::Standard);
    }
    bail!("No rules given: use --rules <path>, --preset <key>... or --standard")
}

fn export_presets(processor: &DocumentProcessor, args: &Args, path: &Path) -> Result<()> {
    let source = if args.preset.is_empty() {
        RuleSource::Standard
    } else {
        RuleSource::Presets(args.preset.clone())
    };
    let rule_set = processor.load_rule_set(&source)?;
    std::fs::write(path, rule_set.to_json_string()?)?;
    println!(
        "💾 Exported {} rules ('{}') to: {}",
        rule_set.len(),
        rule_set.name,
        path.display()
    );
    Ok(())
}

fn show_presets(catalog: &PresetCatalog) {
    println!("\n📋 Built-in Presets (applied in this order):");
    for key in catalog.keys() {
        if let Some(spec) = catalog.get(key) {
            println!("  {:<14} {}", key, spec.name);
            println!("  {:<14} pattern: {:?}", "", spec.trigger.pattern);
        }
    }

    println!("\n📝 Usage Examples:");
    println!("  redline -d brief.json --standard");
    println!("  redline -d brief.json -p main_heading narrative --dry-run");
    println!("  redline -d brief.json -r rules.yaml --report report.json");
    println!("  redline --export-preset standard.json");
}
