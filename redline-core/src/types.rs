use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Range;

// ===== DOCUMENT MODEL =====
// Owned representation of a word-processor document: ordered paragraphs,
// each assembled from ordered runs. Lengths are in points unless noted.

pub const POINTS_PER_INCH: f32 = 72.0;

/// Numbers closer than this are treated as equal when deciding whether a
/// formatting update actually changed anything.
pub const FORMAT_TOLERANCE: f32 = 0.1;

fn default_style() -> String {
    "Normal".to_string()
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub paragraphs: Vec<Paragraph>,
}

impl Document {
    pub fn new(paragraphs: Vec<Paragraph>) -> Self {
        Self {
            title: None,
            paragraphs,
        }
    }

    /// Convenience constructor: one single-run "Normal" paragraph per line
    pub fn from_lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(lines.into_iter().map(Paragraph::new).collect())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Paragraph {
    #[serde(default = "default_style")]
    pub style: String,
    #[serde(default)]
    pub runs: Vec<Run>,
    #[serde(default)]
    pub format: ParagraphFormat,
    /// List membership; `None` for ordinary paragraphs
    #[serde(default)]
    pub list: Option<ListInfo>,
}

impl Paragraph {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            style: default_style(),
            runs: vec![Run::new(text)],
            format: ParagraphFormat::default(),
            list: None,
        }
    }

    pub fn with_style(mut self, style: &str) -> Self {
        self.style = style.to_string();
        self
    }

    pub fn with_list(mut self, list_string: &str) -> Self {
        self.list = Some(ListInfo {
            list_string: list_string.to_string(),
            level: 1,
        });
        self
    }

    pub fn from_runs(runs: Vec<Run>) -> Self {
        Self {
            style: default_style(),
            runs,
            format: ParagraphFormat::default(),
            list: None,
        }
    }

    /// Text assembled from all runs
    pub fn text(&self) -> String {
        self.runs.iter().map(|r| r.text.as_str()).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Run {
    pub text: String,
    #[serde(default)]
    pub font: FontFormat,
}

impl Run {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            font: FontFormat::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListInfo {
    /// Rendered list label, e.g. "A.", "1)", "•"
    pub list_string: String,
    #[serde(default = "default_list_level")]
    pub level: u32,
}

fn default_list_level() -> u32 {
    1
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParagraphFormat {
    #[serde(default)]
    pub space_before: f32,
    #[serde(default)]
    pub space_after: f32,
    #[serde(default = "default_line_spacing")]
    pub line_spacing: f32,
    #[serde(default)]
    pub left_indent: f32,
    #[serde(default)]
    pub right_indent: f32,
    #[serde(default)]
    pub first_line_indent: f32,
    #[serde(default)]
    pub alignment: Alignment,
}

fn default_line_spacing() -> f32 {
    12.0
}

impl Default for ParagraphFormat {
    fn default() -> Self {
        Self {
            space_before: 0.0,
            space_after: 0.0,
            line_spacing: default_line_spacing(),
            left_indent: 0.0,
            right_indent: 0.0,
            first_line_indent: 0.0,
            alignment: Alignment::Left,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FontFormat {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub size: Option<f32>,
    #[serde(default)]
    pub bold: bool,
    #[serde(default)]
    pub italic: bool,
    #[serde(default)]
    pub underline: bool,
    #[serde(default)]
    pub color: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Alignment {
    #[default]
    Left,
    Center,
    Right,
    Justify,
}

// ===== PARTIAL FORMATTING =====

/// Partial property set carried by a `format` action. Only the keys that
/// are present get applied; everything else on the target is left alone.
/// Spacing is in points, indents in inches (as rule authors write them).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Formatting {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub space_before: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub space_after: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_spacing: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub left_indent: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub right_indent: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_line_indent: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alignment: Option<Alignment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_size: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_bold: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_italic: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_underline: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_color: Option<String>,
}

impl Formatting {
    /// Names of the paragraph-level keys present (not applicable to a run)
    pub fn paragraph_keys(&self) -> Vec<&'static str> {
        let mut keys = Vec::new();
        if self.style.is_some() {
            keys.push("style");
        }
        if self.space_before.is_some() {
            keys.push("space_before");
        }
        if self.space_after.is_some() {
            keys.push("space_after");
        }
        if self.line_spacing.is_some() {
            keys.push("line_spacing");
        }
        if self.left_indent.is_some() {
            keys.push("left_indent");
        }
        if self.right_indent.is_some() {
            keys.push("right_indent");
        }
        if self.first_line_indent.is_some() {
            keys.push("first_line_indent");
        }
        if self.alignment.is_some() {
            keys.push("alignment");
        }
        keys
    }

    pub fn has_font_properties(&self) -> bool {
        self.font_name.is_some()
            || self.font_size.is_some()
            || self.font_bold.is_some()
            || self.font_italic.is_some()
            || self.font_underline.is_some()
            || self.font_color.is_some()
    }

    /// True when applying these keys would change nothing: every
    /// paragraph key already holds and every run carries the font keys.
    pub fn is_satisfied_by(&self, style: &str, format: &ParagraphFormat, fonts: &[FontFormat]) -> bool {
        let mut style = style.to_string();
        let mut format = format.clone();
        self.apply_to_paragraph(&mut style, &mut format) == 0
            && fonts.iter().all(|font| self.apply_to_font(&mut font.clone()) == 0)
    }

    /// Apply paragraph-level keys; returns how many properties changed
    pub fn apply_to_paragraph(&self, style: &mut String, format: &mut ParagraphFormat) -> usize {
        let mut changed = 0;

        if let Some(target) = &self.style {
            if style != target {
                *style = target.clone();
                changed += 1;
            }
        }

        let points = [
            (self.space_before, &mut format.space_before),
            (self.space_after, &mut format.space_after),
            (self.line_spacing, &mut format.line_spacing),
        ];
        for (target, current) in points {
            if let Some(value) = target {
                changed += set_number(current, value) as usize;
            }
        }

        let inches = [
            (self.left_indent, &mut format.left_indent),
            (self.right_indent, &mut format.right_indent),
            (self.first_line_indent, &mut format.first_line_indent),
        ];
        for (target, current) in inches {
            if let Some(value) = target {
                changed += set_number(current, value * POINTS_PER_INCH) as usize;
            }
        }

        if let Some(alignment) = self.alignment {
            if format.alignment != alignment {
                format.alignment = alignment;
                changed += 1;
            }
        }

        changed
    }

    /// Apply font keys to one run's font; returns how many properties changed
    pub fn apply_to_font(&self, font: &mut FontFormat) -> usize {
        let mut changed = 0;

        if let Some(name) = &self.font_name {
            if font.name.as_ref() != Some(name) {
                font.name = Some(name.clone());
                changed += 1;
            }
        }
        if let Some(size) = self.font_size {
            let differs = font
                .size
                .map_or(true, |current| (current - size).abs() > FORMAT_TOLERANCE);
            if differs {
                font.size = Some(size);
                changed += 1;
            }
        }
        if let Some(bold) = self.font_bold {
            if font.bold != bold {
                font.bold = bold;
                changed += 1;
            }
        }
        if let Some(italic) = self.font_italic {
            if font.italic != italic {
                font.italic = italic;
                changed += 1;
            }
        }
        if let Some(underline) = self.font_underline {
            if font.underline != underline {
                font.underline = underline;
                changed += 1;
            }
        }
        if let Some(color) = &self.font_color {
            if font.color.as_ref() != Some(color) {
                font.color = Some(color.clone());
                changed += 1;
            }
        }

        changed
    }
}

fn set_number(current: &mut f32, target: f32) -> bool {
    if (*current - target).abs() > FORMAT_TOLERANCE {
        *current = target;
        true
    } else {
        false
    }
}

// ===== UNIT ADDRESSING =====

/// Addresses the unit a mutation is confined to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum UnitRef {
    Document,
    Paragraph { index: usize },
    Run { paragraph: usize, run: usize },
}

impl UnitRef {
    pub fn paragraph_index(&self) -> Option<usize> {
        match self {
            UnitRef::Document => None,
            UnitRef::Paragraph { index } => Some(*index),
            UnitRef::Run { paragraph, .. } => Some(*paragraph),
        }
    }
}

impl fmt::Display for UnitRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // 1-indexed for humans, matching how editors number paragraphs
        match self {
            UnitRef::Document => write!(f, "document"),
            UnitRef::Paragraph { index } => write!(f, "paragraph {}", index + 1),
            UnitRef::Run { paragraph, run } => {
                write!(f, "paragraph {} run {}", paragraph + 1, run + 1)
            }
        }
    }
}

/// A single replacement within a unit's text. `range` is a byte range
/// into the unit text as last read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextEdit {
    pub range: Range<usize>,
    pub replacement: String,
}

impl TextEdit {
    pub fn new(range: Range<usize>, replacement: impl Into<String>) -> Self {
        Self {
            range,
            replacement: replacement.into(),
        }
    }
}

/// Outcome of one action on one unit
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MutationResult {
    pub changed: bool,
    /// Number of text edits (replace/cycle) or properties set (format)
    pub edits: usize,
}

impl MutationResult {
    pub fn unchanged() -> Self {
        Self::default()
    }

    pub fn changed(edits: usize) -> Self {
        Self {
            changed: edits > 0,
            edits,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paragraph_text_is_assembled_from_runs() {
        let para = Paragraph::from_runs(vec![Run::new("Plaintiffs "), Run::new("argue")]);
        assert_eq!(para.text(), "Plaintiffs argue");
    }

    #[test]
    fn snapshot_defaults_fill_missing_fields() {
        let json = r#"{ "paragraphs": [ { "runs": [ { "text": "Hello" } ] } ] }"#;
        let doc: Document = serde_json::from_str(json).unwrap();
        let para = &doc.paragraphs[0];
        assert_eq!(para.style, "Normal");
        assert_eq!(para.format.line_spacing, 12.0);
        assert_eq!(para.format.alignment, Alignment::Left);
        assert!(para.list.is_none());
    }

    #[test]
    fn formatting_updates_only_present_keys() {
        let formatting = Formatting {
            space_after: Some(24.0),
            left_indent: Some(0.5),
            ..Default::default()
        };
        let mut style = "Normal".to_string();
        let mut format = ParagraphFormat {
            space_before: 6.0,
            ..Default::default()
        };

        assert_eq!(formatting.apply_to_paragraph(&mut style, &mut format), 2);
        assert_eq!(format.space_after, 24.0);
        assert_eq!(format.left_indent, 36.0);
        assert_eq!(format.space_before, 6.0);
        assert_eq!(style, "Normal");

        // Second application is a no-op
        assert_eq!(formatting.apply_to_paragraph(&mut style, &mut format), 0);
    }

    #[test]
    fn formatting_rejects_unknown_keys() {
        let result: Result<Formatting, _> = serde_json::from_str(r#"{ "space_afterr": 3 }"#);
        assert!(result.is_err());
    }

    #[test]
    fn formatting_reports_paragraph_keys() {
        let formatting = Formatting {
            font_bold: Some(true),
            alignment: Some(Alignment::Center),
            ..Default::default()
        };
        assert_eq!(formatting.paragraph_keys(), vec!["alignment"]);
        assert!(formatting.has_font_properties());
        assert!(!Formatting::default().has_font_properties());
    }

    #[test]
    fn underline_is_a_font_key() {
        let formatting: Formatting = serde_json::from_str(r#"{ "font_underline": true }"#).unwrap();
        assert!(formatting.has_font_properties());
        assert!(formatting.paragraph_keys().is_empty());

        let mut font = FontFormat::default();
        assert_eq!(formatting.apply_to_font(&mut font), 1);
        assert!(font.underline);
        assert_eq!(formatting.apply_to_font(&mut font), 0);
    }

    #[test]
    fn satisfied_formatting_needs_every_run() {
        let formatting = Formatting {
            first_line_indent: Some(0.5),
            font_bold: Some(true),
            ..Default::default()
        };
        let format = ParagraphFormat {
            first_line_indent: 36.0,
            ..Default::default()
        };
        let bold = FontFormat {
            bold: true,
            ..Default::default()
        };

        assert!(formatting.is_satisfied_by("Normal", &format, &[bold.clone(), bold.clone()]));
        assert!(!formatting.is_satisfied_by("Normal", &format, &[bold.clone(), FontFormat::default()]));
        assert!(!formatting.is_satisfied_by("Normal", &ParagraphFormat::default(), &[bold]));
    }

    #[test]
    fn unit_refs_display_one_indexed() {
        assert_eq!(UnitRef::Paragraph { index: 0 }.to_string(), "paragraph 1");
        assert_eq!(
            UnitRef::Run { paragraph: 2, run: 0 }.to_string(),
            "paragraph 3 run 1"
        );
    }
}
