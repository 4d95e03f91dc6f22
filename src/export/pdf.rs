// src/export/pdf.rs
//! Minimal text-only PDF writer for the script document.
//!
//! Uses the standard Helvetica faces with WinAnsi encoding, so no fonts are
//! embedded. Text wraps on word boundaries and pages break automatically.

use std::fmt::Write as _;

const PAGE_WIDTH: f32 = 595.0;
const PAGE_HEIGHT: f32 = 842.0;
const MARGIN: f32 = 56.0;
const LINE_SPACING: f32 = 1.4;
/// Average Helvetica glyph width as a fraction of the font size.
const AVG_GLYPH_WIDTH: f32 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Face {
    Regular,
    Bold,
}

impl Face {
    fn resource(&self) -> &'static str {
        match self {
            Face::Regular => "F1",
            Face::Bold => "F2",
        }
    }
}

#[derive(Debug, Clone)]
struct PlacedLine {
    face: Face,
    size: f32,
    y: f32,
    text: String,
}

#[derive(Debug)]
pub struct PdfDocument {
    pages: Vec<Vec<PlacedLine>>,
    cursor_y: f32,
}

impl Default for PdfDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl PdfDocument {
    pub fn new() -> Self {
        Self {
            pages: vec![Vec::new()],
            cursor_y: PAGE_HEIGHT - MARGIN,
        }
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn heading(&mut self, text: &str, size: f32) -> &mut Self {
        self.write_wrapped(text, Face::Bold, size)
    }

    pub fn paragraph(&mut self, text: &str, size: f32) -> &mut Self {
        for line in text.lines() {
            self.write_wrapped(line, Face::Regular, size);
        }
        self
    }

    pub fn labeled(&mut self, label: &str, value: &str, size: f32) -> &mut Self {
        self.write_wrapped(&format!("{}: {}", label, value), Face::Regular, size)
    }

    pub fn spacer(&mut self, points: f32) -> &mut Self {
        self.cursor_y -= points;
        self
    }

    fn write_wrapped(&mut self, text: &str, face: Face, size: f32) -> &mut Self {
        let max_chars = ((PAGE_WIDTH - 2.0 * MARGIN) / (size * AVG_GLYPH_WIDTH)).floor() as usize;
        for line in wrap(text, max_chars.max(1)) {
            self.place(line, face, size);
        }
        self
    }

    fn place(&mut self, text: String, face: Face, size: f32) {
        let line_height = size * LINE_SPACING;
        if self.cursor_y - line_height < MARGIN {
            self.pages.push(Vec::new());
            self.cursor_y = PAGE_HEIGHT - MARGIN;
        }
        self.cursor_y -= line_height;
        let y = self.cursor_y;
        if let Some(page) = self.pages.last_mut() {
            page.push(PlacedLine { face, size, y, text });
        }
    }

    /// Serializes the document.
    pub fn render(&self) -> Vec<u8> {
        let page_count = self.pages.len();
        // 1 catalog, 2 pages, 3-4 fonts, then (page, content) pairs
        let first_page_id = 5;
        let mut objects: Vec<String> = Vec::with_capacity(4 + page_count * 2);

        objects.push("<< /Type /Catalog /Pages 2 0 R >>".to_string());
        let kids = (0..page_count)
            .map(|i| format!("{} 0 R", first_page_id + i * 2))
            .collect::<Vec<_>>()
            .join(" ");
        objects.push(format!("<< /Type /Pages /Kids [{}] /Count {} >>", kids, page_count));
        objects.push(font_object("Helvetica"));
        objects.push(font_object("Helvetica-Bold"));

        for (i, page) in self.pages.iter().enumerate() {
            let content_id = first_page_id + i * 2 + 1;
            objects.push(format!(
                "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {} {}] \
                 /Resources << /Font << /F1 3 0 R /F2 4 0 R >> >> /Contents {} 0 R >>",
                PAGE_WIDTH, PAGE_HEIGHT, content_id
            ));

            let mut stream = String::new();
            for line in page {
                let _ = writeln!(
                    stream,
                    "BT /{} {} Tf {} {} Td ({}) Tj ET",
                    line.face.resource(),
                    line.size,
                    MARGIN,
                    line.y,
                    encode_text(&line.text)
                );
            }
            objects.push(format!(
                "<< /Length {} >>\nstream\n{}endstream",
                stream.len(),
                stream
            ));
        }

        let mut out = String::from("%PDF-1.4\n");
        let mut offsets = Vec::with_capacity(objects.len());
        for (i, body) in objects.iter().enumerate() {
            offsets.push(out.len());
            let _ = write!(out, "{} 0 obj\n{}\nendobj\n", i + 1, body);
        }

        let xref_offset = out.len();
        let _ = write!(out, "xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1);
        for offset in offsets {
            let _ = write!(out, "{:010} 00000 n \n", offset);
        }
        let _ = write!(
            out,
            "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{}\n%%EOF\n",
            objects.len() + 1,
            xref_offset
        );

        out.into_bytes()
    }
}

fn font_object(base: &str) -> String {
    format!(
        "<< /Type /Font /Subtype /Type1 /BaseFont /{} /Encoding /WinAnsiEncoding >>",
        base
    )
}

/// Greedy word wrap. Words longer than a line are split.
fn wrap(text: &str, max_chars: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let mut word: Vec<char> = word.chars().collect();
        while word.len() > max_chars {
            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            let rest = word.split_off(max_chars);
            lines.push(word.into_iter().collect());
            word = rest;
        }

        let needed = current.chars().count() + usize::from(!current.is_empty()) + word.len();
        if needed > max_chars && !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.extend(word);
    }

    if !current.is_empty() || lines.is_empty() {
        lines.push(current);
    }
    lines
}

/// Escapes a string for a PDF literal, mapping to WinAnsi where possible.
fn encode_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' | '(' | ')' => {
                out.push('\\');
                out.push(c);
            }
            ' '..='~' => out.push(c),
            '\u{2013}' => out.push_str("\\226"),
            '\u{2014}' => out.push_str("\\227"),
            '\u{2018}' => out.push_str("\\221"),
            '\u{2019}' => out.push_str("\\222"),
            '\u{201C}' => out.push_str("\\223"),
            '\u{201D}' => out.push_str("\\224"),
            '\u{2022}' => out.push_str("\\225"),
            '\u{2026}' => out.push_str("\\205"),
            '\u{00A0}'..='\u{00FF}' => {
                let _ = write!(out, "\\{:03o}", c as u32);
            }
            '\t' => out.push(' '),
            _ => out.push('?'),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_structure() {
        let mut doc = PdfDocument::new();
        doc.heading("Ad Script", 20.0).paragraph("Hello (world)", 11.0);
        let bytes = doc.render();
        let text = String::from_utf8(bytes).unwrap();

        assert!(text.starts_with("%PDF-1.4"));
        assert!(text.ends_with("%%EOF\n"));
        assert!(text.contains("/BaseFont /Helvetica-Bold"));
        assert!(text.contains("(Hello \\(world\\)) Tj"));
        assert!(text.contains("/Count 1"));
    }

    #[test]
    fn test_long_text_breaks_pages() {
        let mut doc = PdfDocument::new();
        let sentence = "Crafted from aerospace-grade titanium and sapphire crystal. ".repeat(400);
        doc.paragraph(&sentence, 11.0);
        assert!(doc.page_count() > 1);

        let text = String::from_utf8(doc.render()).unwrap();
        assert!(text.contains(&format!("/Count {}", doc.page_count())));
    }

    #[test]
    fn test_wrap_and_encoding() {
        let lines = wrap("one two three four", 9);
        assert_eq!(lines, vec!["one two", "three", "four"]);
        assert_eq!(wrap("abcdefghij", 4), vec!["abcd", "efgh", "ij"]);
        assert_eq!(wrap("", 10), vec![""]);

        assert_eq!(encode_text("0–3s"), "0\\2263s");
        assert_eq!(encode_text("café"), "caf\\351");
        assert_eq!(encode_text("日本"), "??");
    }
}
