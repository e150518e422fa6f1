//! Header-delimited section chunking
//!
//! Splits a page's markdown-like text into sections, each a header line
//! (`#`..`######`) plus all body text up to the next header of any level.
//! Sections are the unit of embedding; they are never persisted.

/// A single header-delimited section of a document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    /// The header line, without trailing whitespace. Empty for a document
    /// with no headers at all.
    pub header: String,
    /// Body text between this header and the next one, trimmed.
    pub body: String,
}

impl Section {
    /// Text submitted for embedding: header and body joined, or just the
    /// body when there is no header.
    pub fn text(&self) -> String {
        if self.header.is_empty() {
            self.body.clone()
        } else if self.body.is_empty() {
            self.header.clone()
        } else {
            format!("{}\n{}", self.header, self.body)
        }
    }
}

/// Returns true for an ATX-style markdown header: one to six `#` at line
/// start, a space, and a non-empty title. Inline `#` never matches because
/// matching is anchored at the start of the line.
fn is_header_line(line: &str) -> bool {
    let hashes = line.chars().take_while(|&c| c == '#').count();
    if hashes == 0 || hashes > 6 {
        return false;
    }
    match line[hashes..].strip_prefix(' ') {
        Some(rest) => !rest.trim().is_empty(),
        None => false,
    }
}

/// Split a document into header-delimited sections.
///
/// Text before the first header is discarded. A header with nothing below
/// it yields a section with an empty body. A document with zero headers
/// yields exactly one section whose header is empty and whose body is the
/// whole text, so header-less pages still get one embedding.
pub fn split_sections(text: &str) -> Vec<Section> {
    let mut sections: Vec<Section> = Vec::new();
    let mut current: Option<(String, Vec<&str>)> = None;

    for line in text.lines() {
        if is_header_line(line) {
            if let Some((header, body)) = current.take() {
                sections.push(finish_section(header, &body));
            }
            current = Some((line.trim_end().to_string(), Vec::new()));
        } else if let Some((_, body)) = current.as_mut() {
            body.push(line);
        }
        // lines before the first header fall through and are dropped
    }

    if let Some((header, body)) = current.take() {
        sections.push(finish_section(header, &body));
    }

    if sections.is_empty() {
        return vec![Section {
            header: String::new(),
            body: text.to_string(),
        }];
    }

    sections
}

fn finish_section(header: String, body_lines: &[&str]) -> Section {
    Section {
        header,
        body: body_lines.join("\n").trim().to_string(),
    }
}
