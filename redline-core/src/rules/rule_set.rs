// Rule Set loading and validation
//
// A rule file is either a bare sequence of rule records or a mapping with
// `name`, `description` and `rules`. The document is parsed to a generic
// value first and every rule separately, so a malformed record is reported
// by position and name instead of as a bare serde error.

use super::action::Action;
use super::trigger::{CompiledTrigger, Scope, TriggerSpec};
use crate::config::RegexLimits;
use crate::error::{ConvergenceWarning, LoadError, Result, RuleSetError, ScopeMismatchError};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;

fn default_true() -> bool {
    true
}

/// Serialized rule record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleSpec {
    pub name: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
    pub trigger: TriggerSpec,
    pub action: Action,
}

/// A loaded rule: patterns compiled, immutable from here on
#[derive(Debug, Clone)]
pub struct Rule {
    pub name: String,
    pub enabled: bool,
    pub trigger: CompiledTrigger,
    pub action: Action,
}

impl Rule {
    pub fn compile(spec: RuleSpec, limits: &RegexLimits) -> std::result::Result<Self, LoadError> {
        let trigger = CompiledTrigger::compile(&spec.name, spec.trigger, limits)?;
        Ok(Self {
            name: spec.name,
            enabled: spec.enabled,
            trigger,
            action: spec.action,
        })
    }

    pub fn scope(&self) -> Scope {
        self.trigger.scope()
    }

    pub fn to_spec(&self) -> RuleSpec {
        RuleSpec {
            name: self.name.clone(),
            enabled: self.enabled,
            trigger: self.trigger.spec().clone(),
            action: self.action.clone(),
        }
    }

    fn scope_mismatch(&self) -> Option<ScopeMismatchError> {
        let Action::Format { formatting } = &self.action else {
            return None;
        };
        if self.scope() != Scope::Run {
            return None;
        }

        let keys = formatting.paragraph_keys();
        if keys.is_empty() {
            return None;
        }
        Some(ScopeMismatchError {
            rule: self.name.clone(),
            action: self.action.kind(),
            scope: self.scope().as_str(),
            reason: format!("cannot set paragraph properties ({})", keys.join(", ")),
        })
    }

    /// Static self-check: would the rule fire again on its own output?
    fn convergence_warning(&self) -> Option<ConvergenceWarning> {
        let message = match &self.action {
            Action::Replace { replacement } if self.reproduces_match(replacement) => format!(
                "trigger matches its own replacement \"{replacement}\"; a second pass may rewrite it again"
            ),
            Action::Cycle { variations } => format!(
                "cycle over {} variations changes the text on every pass",
                variations.len()
            ),
            _ => return None,
        };
        Some(ConvergenceWarning {
            rule: self.name.clone(),
            message,
        })
    }

    // Regex templates are also tested with every group reference expanded
    // to nothing, the output an unmatched optional group produces. Real
    // group contents are unknown at load time.
    fn reproduces_match(&self, replacement: &str) -> bool {
        self.trigger.matches(replacement)
            || (self.trigger.regex().is_some()
                && self.trigger.matches(&strip_group_references(replacement)))
    }
}

/// Expand `$1`, `$name` and `${name}` to nothing and `$$` to `$`
fn strip_group_references(template: &str) -> String {
    let is_name_char = |c: &char| c.is_alphanumeric() || *c == '_';
    let mut out = String::with_capacity(template.len());
    let mut chars = template.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '$' {
            out.push(c);
            continue;
        }
        match chars.peek() {
            Some('$') => {
                chars.next();
                out.push('$');
            }
            Some('{') => {
                for c in chars.by_ref() {
                    if c == '}' {
                        break;
                    }
                }
            }
            Some(c) if is_name_char(c) => while chars.next_if(is_name_char).is_some() {},
            _ => out.push('$'),
        }
    }
    out
}

#[derive(Debug, Clone)]
pub struct RuleSet {
    pub name: String,
    pub description: Option<String>,
    rules: Vec<Rule>,
    warnings: Vec<ConvergenceWarning>,
}

#[derive(Serialize)]
struct RuleSetRecord<'a> {
    name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<&'a str>,
    rules: Vec<RuleSpec>,
}

impl RuleSet {
    pub fn empty(name: &str) -> Self {
        Self {
            name: name.to_string(),
            description: None,
            rules: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// Compile and validate rule records. Nothing is returned unless every
    /// rule compiles and pairs its action with a compatible scope.
    pub fn from_specs(name: &str, specs: Vec<RuleSpec>, limits: &RegexLimits) -> Result<Self> {
        let mut rules = Vec::with_capacity(specs.len());
        for (index, spec) in specs.into_iter().enumerate() {
            if let Action::Cycle { variations } = &spec.action {
                if variations.is_empty() {
                    return Err(LoadError::InvalidRule {
                        index: index + 1,
                        name: spec.name,
                        message: "cycle action needs at least one variation".to_string(),
                    }
                    .into());
                }
            }
            rules.push(Rule::compile(spec, limits)?);
        }

        let mismatches: Vec<ScopeMismatchError> =
            rules.iter().filter_map(Rule::scope_mismatch).collect();
        if !mismatches.is_empty() {
            return Err(RuleSetError::ScopeMismatch(mismatches));
        }

        let warnings: Vec<ConvergenceWarning> = rules
            .iter()
            .filter(|rule| rule.enabled)
            .filter_map(Rule::convergence_warning)
            .collect();
        for warning in &warnings {
            tracing::warn!("⚠️  {}", warning);
        }

        Ok(Self {
            name: name.to_string(),
            description: None,
            rules,
            warnings,
        })
    }

    pub fn from_json_str(content: &str, origin: &str, limits: &RegexLimits) -> Result<Self> {
        let value: Value = serde_json::from_str(content).map_err(|e| LoadError::Syntax {
            origin: origin.to_string(),
            format: "JSON",
            message: e.to_string(),
        })?;
        Self::from_value(value, origin, limits)
    }

    pub fn from_yaml_str(content: &str, origin: &str, limits: &RegexLimits) -> Result<Self> {
        let value: Value = serde_yaml::from_str(content).map_err(|e| LoadError::Syntax {
            origin: origin.to_string(),
            format: "YAML",
            message: e.to_string(),
        })?;
        Self::from_value(value, origin, limits)
    }

    /// Load a rule file; `.yaml`/`.yml` is read as YAML, anything else as JSON
    pub fn load_from_file(path: &Path, limits: &RegexLimits) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let origin = path.display().to_string();

        let is_yaml = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml"));

        let mut rule_set = if is_yaml {
            Self::from_yaml_str(&content, &origin, limits)?
        } else {
            Self::from_json_str(&content, &origin, limits)?
        };

        if rule_set.name.is_empty() {
            rule_set.name = path
                .file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
                .unwrap_or_else(|| origin.clone());
        }
        tracing::info!("📋 Loaded {} rules from {}", rule_set.len(), origin);
        Ok(rule_set)
    }

    fn from_value(value: Value, origin: &str, limits: &RegexLimits) -> Result<Self> {
        let (name, description, records) = match value {
            Value::Array(records) => (String::new(), None, records),
            Value::Object(mut map) => {
                let name = map
                    .get("name")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string();
                let description = map
                    .get("description")
                    .and_then(Value::as_str)
                    .map(str::to_string);
                match map.remove("rules") {
                    Some(Value::Array(records)) => (name, description, records),
                    Some(Value::Null) | None => (name, description, Vec::new()),
                    Some(_) => {
                        return Err(LoadError::Syntax {
                            origin: origin.to_string(),
                            format: "rule set",
                            message: "`rules` must be a sequence of rule records".to_string(),
                        }
                        .into())
                    }
                }
            }
            // An empty YAML file
            Value::Null => (String::new(), None, Vec::new()),
            _ => {
                return Err(LoadError::Syntax {
                    origin: origin.to_string(),
                    format: "rule set",
                    message: "expected a sequence of rules or a mapping with `rules`".to_string(),
                }
                .into())
            }
        };

        let specs = records
            .into_iter()
            .enumerate()
            .map(|(index, record)| parse_record(index, record))
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let mut rule_set = Self::from_specs(&name, specs, limits)?;
        rule_set.description = description;
        Ok(rule_set)
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Rule> {
        self.rules.iter()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn enabled_count(&self) -> usize {
        self.rules.iter().filter(|r| r.enabled).count()
    }

    pub fn get(&self, name: &str) -> Option<&Rule> {
        self.rules.iter().find(|r| r.name == name)
    }

    pub fn warnings(&self) -> &[ConvergenceWarning] {
        &self.warnings
    }

    pub fn specs(&self) -> Vec<RuleSpec> {
        self.rules.iter().map(Rule::to_spec).collect()
    }

    /// Canonical mapping form, readable back by [`RuleSet::from_json_str`]
    pub fn to_json_string(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&RuleSetRecord {
            name: &self.name,
            description: self.description.as_deref(),
            rules: self.specs(),
        })
    }
}

fn parse_record(index: usize, record: Value) -> std::result::Result<RuleSpec, LoadError> {
    let name = record
        .get("name")
        .and_then(Value::as_str)
        .unwrap_or("<unnamed>")
        .to_string();
    serde_json::from_value(record).map_err(|e| LoadError::InvalidRule {
        index: index + 1,
        name,
        message: e.to_string(),
    })
}
