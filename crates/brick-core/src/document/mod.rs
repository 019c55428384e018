//! Line-oriented model of an AZURE2 `.azr` input document.
//!
//! The document is kept as the exact sequence of lines it was read from.
//! Edits replace whole section bodies or single rows; everything else is
//! written back byte-for-byte.

mod row;

pub use row::TokenRow;

use crate::domain::{BrickError, BrickResult};
use std::fs;
use std::path::Path;

/// Zero-based line holding the solver's output directory.
pub const OUTPUT_DIR_LINE: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Section {
    Levels,
    SegmentsData,
    SegmentsTest,
}

impl Section {
    pub const fn name(self) -> &'static str {
        match self {
            Self::Levels => "levels",
            Self::SegmentsData => "segmentsData",
            Self::SegmentsTest => "segmentsTest",
        }
    }

    pub const fn open_marker(self) -> &'static str {
        match self {
            Self::Levels => "<levels>",
            Self::SegmentsData => "<segmentsData>",
            Self::SegmentsTest => "<segmentsTest>",
        }
    }

    pub const fn close_marker(self) -> &'static str {
        match self {
            Self::Levels => "</levels>",
            Self::SegmentsData => "</segmentsData>",
            Self::SegmentsTest => "</segmentsTest>",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Document {
    lines: Vec<String>,
}

impl Document {
    pub fn parse(source: &str) -> Self {
        Self {
            lines: parse_lines(source),
        }
    }

    pub fn read(path: &Path) -> BrickResult<Self> {
        let source = fs::read_to_string(path)
            .map_err(|source| BrickError::io("failed to read input document", path, source))?;
        Ok(Self::parse(&source))
    }

    pub fn from_lines(lines: Vec<String>) -> Self {
        Self { lines }
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn render(&self) -> String {
        self.lines.join("\n")
    }

    pub fn write(&self, path: &Path) -> BrickResult<()> {
        fs::write(path, self.render())
            .map_err(|source| BrickError::io("failed to write input document", path, source))
    }

    pub fn section_bounds(&self, section: Section) -> BrickResult<(usize, usize)> {
        section_bounds(&self.lines, section)
    }

    pub fn section_rows(&self, section: Section) -> BrickResult<&[String]> {
        let (start, end) = self.section_bounds(section)?;
        Ok(&self.lines[start..end])
    }

    pub fn replace_section(&self, section: Section, rows: Vec<String>) -> BrickResult<Self> {
        Ok(Self {
            lines: replace_section(&self.lines, section, rows)?,
        })
    }

    pub fn output_dir_line(&self) -> Option<&str> {
        self.lines.get(OUTPUT_DIR_LINE).map(String::as_str)
    }

    /// Copy with the output-directory line pointing at `output_dir`.
    pub fn with_output_dir(&self, output_dir: &Path) -> BrickResult<Self> {
        if self.lines.len() <= OUTPUT_DIR_LINE {
            return Err(BrickError::malformed(
                "document",
                format!(
                    "document has {} lines; line {} must hold the output directory",
                    self.lines.len(),
                    OUTPUT_DIR_LINE + 1
                ),
            ));
        }
        let mut lines = self.lines.clone();
        let ending = if lines[OUTPUT_DIR_LINE].ends_with('\r') { "\r" } else { "" };
        lines[OUTPUT_DIR_LINE] = format!("{}/{ending}", output_dir.display());
        Ok(Self { lines })
    }
}

pub fn parse_lines(source: &str) -> Vec<String> {
    source.split('\n').map(str::to_owned).collect()
}

/// Half-open range of the rows strictly between a section's markers.
pub fn section_bounds(lines: &[String], section: Section) -> BrickResult<(usize, usize)> {
    let open = unique_marker(lines, section, section.open_marker())?;
    let close = unique_marker(lines, section, section.close_marker())?;
    if close <= open {
        return Err(BrickError::malformed(
            section.name(),
            format!(
                "'{}' on line {} precedes '{}' on line {}",
                section.close_marker(),
                close + 1,
                section.open_marker(),
                open + 1
            ),
        ));
    }
    Ok((open + 1, close))
}

pub fn replace_section(
    lines: &[String],
    section: Section,
    rows: Vec<String>,
) -> BrickResult<Vec<String>> {
    let (start, end) = section_bounds(lines, section)?;
    let mut replaced = Vec::with_capacity(lines.len() - (end - start) + rows.len());
    replaced.extend_from_slice(&lines[..start]);
    replaced.extend(rows);
    replaced.extend_from_slice(&lines[end..]);
    Ok(replaced)
}

fn unique_marker(lines: &[String], section: Section, marker: &str) -> BrickResult<usize> {
    let mut positions = lines
        .iter()
        .enumerate()
        .filter(|(_, line)| line.trim() == marker)
        .map(|(index, _)| index);

    let first = positions.next().ok_or_else(|| {
        BrickError::malformed(section.name(), format!("missing '{marker}' delimiter"))
    })?;
    if let Some(second) = positions.next() {
        return Err(BrickError::malformed(
            section.name(),
            format!(
                "'{marker}' appears more than once (lines {} and {})",
                first + 1,
                second + 1
            ),
        ));
    }
    Ok(first)
}

#[cfg(test)]
mod tests {
    use super::{Document, Section, section_bounds};
    use crate::domain::BrickError;
    use std::path::Path;

    const SOURCE: &str = "<config>\n2\noutput/\nchecks/\n</config>\n<levels>\n1.5 1 2.3\n\n</levels>\n<segmentsData>\n</segmentsData>\n";

    #[test]
    fn render_reproduces_source_bytes() {
        let document = Document::parse(SOURCE);
        assert_eq!(document.render(), SOURCE);
        assert_eq!(document.lines().last().map(String::as_str), Some(""));
    }

    #[test]
    fn section_bounds_are_half_open_between_markers() {
        let document = Document::parse(SOURCE);
        let (start, end) = document.section_bounds(Section::Levels).expect("levels");
        assert_eq!((start, end), (6, 8));
        assert_eq!(
            document.section_rows(Section::Levels).expect("rows"),
            &["1.5 1 2.3".to_string(), String::new()]
        );
        let (start, end) = document
            .section_bounds(Section::SegmentsData)
            .expect("empty section is valid");
        assert_eq!(start, end);
    }

    #[test]
    fn missing_delimiter_is_malformed() {
        let document = Document::parse(SOURCE);
        let error = document
            .section_bounds(Section::SegmentsTest)
            .expect_err("no test section");
        assert!(matches!(
            error,
            BrickError::MalformedDocument {
                section: "segmentsTest",
                ..
            }
        ));
    }

    #[test]
    fn duplicated_delimiter_is_malformed() {
        let lines = Document::parse("<levels>\n</levels>\n<levels>\n").lines().to_vec();
        let error = section_bounds(&lines, Section::Levels).expect_err("duplicate");
        assert!(error.to_string().contains("more than once"));
    }

    #[test]
    fn inverted_delimiters_are_malformed() {
        let lines = Document::parse("</levels>\n<levels>\n").lines().to_vec();
        assert!(section_bounds(&lines, Section::Levels).is_err());
    }

    #[test]
    fn replace_section_touches_only_the_section_body() {
        let document = Document::parse(SOURCE);
        let replaced = document
            .replace_section(Section::Levels, vec!["2.5 -1 3.0".to_string()])
            .expect("replace");
        let expected = SOURCE.replace("1.5 1 2.3\n\n</levels>", "2.5 -1 3.0\n</levels>");
        assert_eq!(replaced.render(), expected);
    }

    #[test]
    fn output_dir_line_is_rewritten_with_trailing_slash() {
        let document = Document::parse(SOURCE);
        let rewritten = document
            .with_output_dir(Path::new("/tmp/ws/output"))
            .expect("document has an output line");
        assert_eq!(rewritten.output_dir_line(), Some("/tmp/ws/output/"));
        assert_eq!(rewritten.lines().len(), document.lines().len());
        assert!(Document::parse("a\nb").with_output_dir(Path::new("x")).is_err());
    }

    #[test]
    fn output_dir_line_keeps_crlf_endings() {
        let source = SOURCE.replace('\n', "\r\n");
        let rewritten = Document::parse(&source)
            .with_output_dir(Path::new("/tmp/ws/output"))
            .expect("document has an output line");
        assert_eq!(rewritten.output_dir_line(), Some("/tmp/ws/output/\r"));
        assert_eq!(
            rewritten.render(),
            source.replace("output/\r\n", "/tmp/ws/output/\r\n")
        );
    }
}
