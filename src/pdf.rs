use crate::{error::PatternError, models::Pattern};
use printpdf::*;
use std::io::{BufWriter, Write};

const PAGE_W: f32 = 210.0;
const PAGE_H: f32 = 297.0;
const MARGIN: f32 = 15.0;
const LINE: f32 = 6.0;

/// Writes lines top-down on one layer, adding pages when the bottom margin is reached.
struct PageWriter<'a> {
    doc: &'a PdfDocumentReference,
    font: IndirectFontRef,
    layer: PdfLayerReference,
    y: f32,
    pages: usize,
}

impl<'a> PageWriter<'a> {
    fn line(&mut self, text: &str, size: f32) {
        let width = (950.0 / size) as usize;
        for chunk in wrap(text, width) {
            if self.y < MARGIN + LINE {
                self.new_page();
            }
            self.layer.use_text(chunk, size, Mm(MARGIN), Mm(self.y), &self.font);
            self.y -= LINE * (size / 10.0).max(1.0);
        }
    }

    fn gap(&mut self) {
        self.y -= LINE / 2.0;
    }

    fn new_page(&mut self) {
        self.pages += 1;
        let (page, layer) = self.doc.add_page(Mm(PAGE_W), Mm(PAGE_H), format!("Page {}", self.pages));
        self.layer = self.doc.get_page(page).get_layer(layer);
        self.y = PAGE_H - 22.0;
    }
}

/// Text-only printable version of a pattern.
pub fn generate_pdf(pattern: &Pattern) -> Result<Vec<u8>, PatternError> {
    save(render(pattern)?, Vec::new())
}

fn render(pattern: &Pattern) -> Result<PdfDocumentReference, PatternError> {
    let (doc, page, layer) = PdfDocument::new(truncate(&pattern.title, 48), Mm(PAGE_W), Mm(PAGE_H), "Layer 1");
    let font = doc
        .add_builtin_font(BuiltinFont::Helvetica)
        .map_err(|e| PatternError::Render(format!("font setup: {}", e)))?;
    let mut w = PageWriter { doc: &doc, font, layer: doc.get_page(page).get_layer(layer), y: PAGE_H - 22.0, pages: 1 };

    w.line(&pattern.title, 20.0);
    w.line(&pattern.description, 10.0);
    w.line(&format!("Level: {}    Time: {}", pattern.difficulty, pattern.time_estimate), 10.0);
    w.gap();

    w.line("Materials", 14.0);
    for m in &pattern.materials { w.line(&format!("- {m}"), 10.0); }
    w.gap();
    w.line("Tools", 14.0);
    for t in &pattern.tools { w.line(&format!("- {t}"), 10.0); }
    w.gap();
    w.line("Abbreviations", 14.0);
    for a in &pattern.abbreviations { w.line(&format!("{} = {}", a.term, a.explanation), 10.0); }

    for (idx, step) in pattern.steps.iter().enumerate() {
        w.new_page();
        w.line(&format!("{}. {}", idx + 1, step.phase), 16.0);
        for inst in &step.instructions { w.line(inst, 10.0); }
    }

    w.gap();
    w.line("Tips", 14.0);
    for tip in &pattern.tips { w.line(&format!("* {tip}"), 10.0); }
    drop(w);
    Ok(doc)
}

fn save<W: Write>(doc: PdfDocumentReference, sink: W) -> Result<W, PatternError> {
    let mut writer = BufWriter::new(sink);
    doc.save(&mut writer).map_err(|e| PatternError::Render(format!("save: {}", e)))?;
    writer.into_inner().map_err(|e| PatternError::Render(format!("flush: {}", e.error())))
}

fn wrap(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        if !current.is_empty() && current.chars().count() + 1 + word.chars().count() > width {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(&truncate(word, width));
    }
    if !current.is_empty() || lines.is_empty() {
        lines.push(current);
    }
    lines
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max { s.to_string() } else { format!("{}…", s.chars().take(max).collect::<String>()) }
}
