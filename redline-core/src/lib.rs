// Redline Core Library
//
// Rule-based document transformation: declarative trigger/action rules
// applied to paragraphs and runs of a document model, plus the selection
// matcher that links canonical artifact names to human-facing labels.

pub mod types;
pub mod config;
pub mod error;
pub mod document;
pub mod rules;
pub mod selection;
pub mod storage;
pub mod processor;

// Re-export main types and functions for easy use
pub use types::*;
pub use config::{DebugConfig, EngineConfig, RegexLimits, SelectionConfig};
pub use error::{ConvergenceWarning, LoadError, RuleSetError, ScopeMismatchError, UnitError};
pub use document::{DocumentModel, InMemoryDocument, ParagraphSnapshot};
pub use rules::{Action, ApplicationReport, PresetCatalog, RuleEngine, RuleSet, RuleSpec};
pub use selection::{NormalizedLabel, SelectionMatcher};
pub use processor::{DocumentProcessor, ProcessOptions, ProcessOutcome, RuleSource};
