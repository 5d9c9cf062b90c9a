// Main rules module - delegates to semantic sub-modules
// This file coordinates the rule system but actual implementations are in:
// - trigger.rs: Trigger specs and compiled matchers
// - action.rs: Action specs and the ActionExecutor
// - rule_set.rs: Rule Set loading, validation and the static self-check
// - presets.rs: Built-in preset catalog
// - engine.rs: RuleEngine and ApplicationReport

pub mod action;
pub mod engine;
pub mod presets;
pub mod rule_set;
pub mod trigger;

pub use action::{Action, ActionExecutor, Substitution};
pub use engine::{ApplicationReport, MutationRecord, RuleEngine};
pub use presets::PresetCatalog;
pub use rule_set::{Rule, RuleSet, RuleSpec};
pub use trigger::{CompiledTrigger, MatchType, Scope, TriggerSpec};
