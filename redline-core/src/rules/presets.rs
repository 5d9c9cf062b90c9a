use super::rule_set::{RuleSet, RuleSpec};
use crate::config::RegexLimits;
use crate::error::{LoadError, Result};
use serde::Deserialize;
use std::collections::HashMap;

/// Preset catalog shipped with the library
const STANDARD_PRESETS: &str = include_str!("../../presets/standard.yaml");

#[derive(Debug, Deserialize)]
struct CatalogFile {
    precedence: Vec<String>,
    presets: HashMap<String, RuleSpec>,
}

/// Named, ordered catalog of canonical rules.
///
/// The catalog only selects and orders presets; matching is done by the
/// rule set built from them.
#[derive(Debug, Clone)]
pub struct PresetCatalog {
    precedence: Vec<String>,
    presets: HashMap<String, RuleSpec>,
}

impl PresetCatalog {
    /// The built-in catalog (headings, subheadings, bullets, narrative)
    pub fn builtin() -> Result<Self> {
        Self::from_yaml_str(STANDARD_PRESETS, "builtin presets")
    }

    pub fn from_yaml_str(content: &str, origin: &str) -> Result<Self> {
        let syntax = |message: String| LoadError::Syntax {
            origin: origin.to_string(),
            format: "preset catalog",
            message,
        };

        let file: CatalogFile =
            serde_yaml::from_str(content).map_err(|e| syntax(e.to_string()))?;

        if let Some(missing) = file
            .precedence
            .iter()
            .find(|key| !file.presets.contains_key(key.as_str()))
        {
            return Err(syntax(format!("precedence names unknown preset '{missing}'")).into());
        }
        if let Some(unordered) = file
            .presets
            .keys()
            .find(|key| !file.precedence.contains(key))
        {
            return Err(syntax(format!("preset '{unordered}' is missing from precedence")).into());
        }

        Ok(Self {
            precedence: file.precedence,
            presets: file.presets,
        })
    }

    /// Preset keys in precedence order
    pub fn keys(&self) -> &[String] {
        &self.precedence
    }

    pub fn get(&self, key: &str) -> Option<&RuleSpec> {
        self.presets.get(key)
    }

    /// Rules for `keys`, ordered by precedence rather than by request order.
    /// Duplicate keys are ignored; an unknown key is an error.
    pub fn select<S: AsRef<str>>(&self, keys: &[S]) -> Result<Vec<RuleSpec>> {
        if let Some(unknown) = keys
            .iter()
            .map(|key| key.as_ref())
            .find(|key: &&str| !self.presets.contains_key(*key))
        {
            return Err(LoadError::UnknownPreset(unknown.to_string()).into());
        }

        Ok(self
            .precedence
            .iter()
            .filter(|key| keys.iter().any(|k| k.as_ref() == key.as_str()))
            .filter_map(|key| self.presets.get(key).cloned())
            .collect())
    }

    pub fn rule_set<S: AsRef<str>>(&self, keys: &[S], limits: &RegexLimits) -> Result<RuleSet> {
        let specs = self.select(keys)?;
        let name = format!(
            "presets: {}",
            keys.iter().map(|key| key.as_ref()).collect::<Vec<&str>>().join(", ")
        );
        RuleSet::from_specs(&name, specs, limits)
    }

    /// Every preset, in precedence order
    pub fn standard_rule_set(&self, limits: &RegexLimits) -> Result<RuleSet> {
        let specs = self.select(&self.precedence)?;
        let mut rule_set = RuleSet::from_specs("standard", specs, limits)?;
        rule_set.description = Some("Standard legal brief formatting".to_string());
        Ok(rule_set)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::action::Action;

    #[test]
    fn builtin_catalog_has_fixed_precedence() {
        let catalog = PresetCatalog::builtin().unwrap();
        assert_eq!(
            catalog.keys(),
            ["main_heading", "subheading_a", "subheading_1", "bullet", "narrative"]
        );
    }

    #[test]
    fn builtin_presets_are_formatting_rules() {
        let catalog = PresetCatalog::builtin().unwrap();
        for key in catalog.keys() {
            let spec = catalog.get(key).unwrap();
            assert!(spec.enabled, "{key} should be enabled");
            assert!(matches!(spec.action, Action::Format { .. }), "{key}");
        }
    }

    #[test]
    fn subheadings_are_underlined() {
        let catalog = PresetCatalog::builtin().unwrap();
        for key in ["subheading_a", "subheading_1"] {
            match &catalog.get(key).unwrap().action {
                Action::Format { formatting } => assert_eq!(formatting.font_underline, Some(true), "{key}"),
                other => panic!("{key} is not a format rule: {other:?}"),
            }
        }
    }

    #[test]
    fn select_orders_by_precedence() {
        let catalog = PresetCatalog::builtin().unwrap();
        let specs = catalog.select(&["narrative", "main_heading", "narrative"]).unwrap();
        let names: Vec<_> = specs.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Format Main Headings", "Format Narrative Text"]);
    }

    #[test]
    fn unknown_preset_is_an_error() {
        let catalog = PresetCatalog::builtin().unwrap();
        assert!(catalog.select(&["footnote"]).is_err());
    }

    #[test]
    fn standard_rule_set_compiles_without_warnings() {
        let catalog = PresetCatalog::builtin().unwrap();
        let rule_set = catalog.standard_rule_set(&RegexLimits::default()).unwrap();
        assert_eq!(rule_set.len(), 5);
        assert!(rule_set.warnings().is_empty());
    }

    #[test]
    fn catalog_rejects_dangling_precedence() {
        let yaml = "precedence: [missing]\npresets: {}\n";
        assert!(PresetCatalog::from_yaml_str(yaml, "inline").is_err());
    }
}
