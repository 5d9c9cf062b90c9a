use super::provider::{validate_edits, DocumentModel, ParagraphSnapshot};
use crate::error::UnitError;
use crate::types::{Document, Formatting, Paragraph, Run, TextEdit, UnitRef};

/// Owned document held entirely in memory.
///
/// Text edits that span several runs keep the formatting of the run where
/// the edit starts; the covered text is removed from the following runs.
#[derive(Debug, Clone, PartialEq)]
pub struct InMemoryDocument {
    name: String,
    document: Document,
}

impl InMemoryDocument {
    pub fn new(name: impl Into<String>, document: Document) -> Self {
        Self {
            name: name.into(),
            document,
        }
    }

    pub fn from_lines<I, S>(name: &str, lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(name, Document::from_lines(lines))
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn paragraphs(&self) -> &[Paragraph] {
        &self.document.paragraphs
    }

    /// Assembled text of every paragraph, in order
    pub fn texts(&self) -> Vec<String> {
        self.document.paragraphs.iter().map(Paragraph::text).collect()
    }

    fn paragraph_mut(&mut self, unit: UnitRef, index: usize) -> Result<&mut Paragraph, UnitError> {
        let count = self.document.paragraphs.len();
        self.document
            .paragraphs
            .get_mut(index)
            .ok_or_else(|| UnitError::new(unit, format!("document has only {count} paragraphs")))
    }
}

impl DocumentModel for InMemoryDocument {
    fn name(&self) -> &str {
        &self.name
    }

    fn paragraph_count(&self) -> usize {
        self.document.paragraphs.len()
    }

    fn read_paragraph(&self, index: usize) -> Result<ParagraphSnapshot, UnitError> {
        let paragraph = self.document.paragraphs.get(index).ok_or_else(|| {
            UnitError::new(
                UnitRef::Paragraph { index },
                format!(
                    "document has only {} paragraphs",
                    self.document.paragraphs.len()
                ),
            )
        })?;

        Ok(ParagraphSnapshot {
            index,
            style: paragraph.style.clone(),
            text: paragraph.text(),
            runs: paragraph.runs.iter().map(|r| r.text.clone()).collect(),
            list_string: paragraph.list.as_ref().map(|l| l.list_string.clone()),
            format: paragraph.format.clone(),
            fonts: paragraph.runs.iter().map(|r| r.font.clone()).collect(),
        })
    }

    fn replace_text(&mut self, unit: UnitRef, edits: &[TextEdit]) -> Result<bool, UnitError> {
        if edits.is_empty() {
            return Ok(false);
        }

        match unit {
            UnitRef::Document => Err(UnitError::new(
                unit,
                "text edits must address a paragraph or a run",
            )),
            UnitRef::Paragraph { index } => {
                let paragraph = self.paragraph_mut(unit, index)?;
                let before = paragraph.text();
                validate_edits(unit, &before, edits)?;

                if paragraph.runs.is_empty() {
                    paragraph.runs.push(Run::new(""));
                }
                for edit in edits.iter().rev() {
                    splice_runs(&mut paragraph.runs, edit);
                }
                Ok(paragraph.text() != before)
            }
            UnitRef::Run { paragraph, run } => {
                let para = self.paragraph_mut(unit, paragraph)?;
                let run_count = para.runs.len();
                let target = para.runs.get_mut(run).ok_or_else(|| {
                    UnitError::new(unit, format!("paragraph has only {run_count} runs"))
                })?;
                validate_edits(unit, &target.text, edits)?;

                let before = target.text.clone();
                for edit in edits.iter().rev() {
                    target.text.replace_range(edit.range.clone(), &edit.replacement);
                }
                Ok(target.text != before)
            }
        }
    }

    fn apply_formatting(
        &mut self,
        unit: UnitRef,
        formatting: &Formatting,
    ) -> Result<usize, UnitError> {
        match unit {
            UnitRef::Document => Ok(self
                .document
                .paragraphs
                .iter_mut()
                .map(|p| format_paragraph(p, formatting))
                .sum()),
            UnitRef::Paragraph { index } => {
                let paragraph = self.paragraph_mut(unit, index)?;
                Ok(format_paragraph(paragraph, formatting))
            }
            UnitRef::Run { paragraph, run } => {
                let keys = formatting.paragraph_keys();
                if !keys.is_empty() {
                    return Err(UnitError::new(
                        unit,
                        format!("paragraph properties cannot be set on a run: {}", keys.join(", ")),
                    ));
                }
                let para = self.paragraph_mut(unit, paragraph)?;
                let run_count = para.runs.len();
                let target = para.runs.get_mut(run).ok_or_else(|| {
                    UnitError::new(unit, format!("paragraph has only {run_count} runs"))
                })?;
                Ok(formatting.apply_to_font(&mut target.font))
            }
        }
    }
}

fn format_paragraph(paragraph: &mut Paragraph, formatting: &Formatting) -> usize {
    let mut changed = formatting.apply_to_paragraph(&mut paragraph.style, &mut paragraph.format);
    if formatting.has_font_properties() {
        changed += paragraph
            .runs
            .iter_mut()
            .map(|run| formatting.apply_to_font(&mut run.font))
            .sum::<usize>();
    }
    changed
}

/// Apply one validated edit to the runs of a paragraph
fn splice_runs(runs: &mut [Run], edit: &TextEdit) {
    let (start, end) = (edit.range.start, edit.range.end);

    // The run holding `start`; insertions at the very end go to the last run
    let mut first = runs.len() - 1;
    let mut first_offset = runs.iter().map(|r| r.text.len()).sum::<usize>() - runs[first].text.len();
    let mut offset = 0;
    for (i, run) in runs.iter().enumerate() {
        let run_end = offset + run.text.len();
        if start < run_end {
            first = i;
            first_offset = offset;
            break;
        }
        offset = run_end;
    }

    let first_end = first_offset + runs[first].text.len();
    if end <= first_end {
        runs[first]
            .text
            .replace_range(start - first_offset..end - first_offset, &edit.replacement);
        return;
    }

    runs[first]
        .text
        .replace_range(start - first_offset.., &edit.replacement);

    let mut offset = first_end;
    for run in runs[first + 1..].iter_mut() {
        let run_end = offset + run.text.len();
        let cut = end.min(run_end) - offset;
        run.text.replace_range(..cut, "");
        if end <= run_end {
            break;
        }
        offset = run_end;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Alignment, FontFormat};

    fn bold(text: &str) -> Run {
        Run {
            text: text.to_string(),
            font: FontFormat {
                bold: true,
                ..Default::default()
            },
        }
    }

    #[test]
    fn reads_paragraph_snapshots() {
        let doc = InMemoryDocument::new(
            "memo",
            Document::new(vec![
                Paragraph::new("INTRODUCTION").with_style("Heading 1"),
                Paragraph::new("First point").with_list("1."),
            ]),
        );
        assert_eq!(doc.paragraph_count(), 2);

        let heading = doc.read_paragraph(0).unwrap();
        assert_eq!(heading.style, "Heading 1");
        assert!(!heading.is_list());

        let item = doc.read_paragraph(1).unwrap();
        assert_eq!(item.list_string.as_deref(), Some("1."));
        assert!(doc.read_paragraph(2).is_err());
    }

    #[test]
    fn edit_within_one_run_keeps_other_runs() {
        let mut doc = InMemoryDocument::new(
            "memo",
            Document::new(vec![Paragraph::from_runs(vec![
                Run::new("Plaintiffs argue "),
                bold("strongly"),
            ])]),
        );
        let unit = UnitRef::Paragraph { index: 0 };
        let changed = doc
            .replace_text(unit, &[TextEdit::new(0..10, "the Plaintiffs")])
            .unwrap();

        assert!(changed);
        let runs = &doc.paragraphs()[0].runs;
        assert_eq!(runs[0].text, "the Plaintiffs argue ");
        assert_eq!(runs[1].text, "strongly");
        assert!(runs[1].font.bold);
    }

    #[test]
    fn edit_spanning_runs_lands_in_the_starting_run() {
        let mut doc = InMemoryDocument::new(
            "memo",
            Document::new(vec![Paragraph::from_runs(vec![
                Run::new("Plain"),
                bold("tiffs"),
                Run::new(" argue"),
            ])]),
        );
        let unit = UnitRef::Paragraph { index: 0 };
        doc.replace_text(unit, &[TextEdit::new(0..10, "Defendants")])
            .unwrap();

        let para = &doc.paragraphs()[0];
        assert_eq!(para.text(), "Defendants argue");
        assert_eq!(para.runs[0].text, "Defendants");
        assert_eq!(para.runs[1].text, "");
        assert_eq!(para.runs[2].text, " argue");
    }

    #[test]
    fn invalid_edit_leaves_paragraph_untouched() {
        let mut doc = InMemoryDocument::from_lines("memo", ["short"]);
        let unit = UnitRef::Paragraph { index: 0 };
        let result = doc.replace_text(unit, &[TextEdit::new(2..40, "x")]);

        assert!(result.is_err());
        assert_eq!(doc.texts(), vec!["short".to_string()]);
    }

    #[test]
    fn run_edits_apply_in_reverse_order() {
        let mut doc = InMemoryDocument::new(
            "memo",
            Document::new(vec![Paragraph::from_runs(vec![Run::new("a b a")])]),
        );
        let unit = UnitRef::Run {
            paragraph: 0,
            run: 0,
        };
        doc.replace_text(
            unit,
            &[TextEdit::new(0..1, "xyz"), TextEdit::new(4..5, "xyz")],
        )
        .unwrap();
        assert_eq!(doc.texts(), vec!["xyz b xyz".to_string()]);
    }

    #[test]
    fn formatting_a_paragraph_reports_changed_properties() {
        let mut doc = InMemoryDocument::from_lines("memo", ["one", "two"]);
        let formatting = Formatting {
            space_after: Some(24.0),
            alignment: Some(Alignment::Justify),
            font_bold: Some(true),
            ..Default::default()
        };

        let changed = doc
            .apply_formatting(UnitRef::Paragraph { index: 1 }, &formatting)
            .unwrap();
        assert_eq!(changed, 3);
        assert_eq!(doc.paragraphs()[1].format.space_after, 24.0);
        assert_eq!(doc.paragraphs()[0].format.space_after, 0.0);

        let again = doc
            .apply_formatting(UnitRef::Paragraph { index: 1 }, &formatting)
            .unwrap();
        assert_eq!(again, 0);
    }

    #[test]
    fn run_formatting_rejects_paragraph_properties() {
        let mut doc = InMemoryDocument::from_lines("memo", ["one"]);
        let formatting = Formatting {
            space_before: Some(12.0),
            ..Default::default()
        };
        let unit = UnitRef::Run {
            paragraph: 0,
            run: 0,
        };
        assert!(doc.apply_formatting(unit, &formatting).is_err());
    }
}
