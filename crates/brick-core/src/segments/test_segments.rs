use super::{SegmentSchema, is_blank, output_filename, parse_flag, parse_int, segment_error};
use crate::document::{Document, Section, TokenRow};
use crate::domain::{BrickError, BrickResult};
use std::collections::BTreeSet;

/// One row of `<segmentsTest>`. Only its inclusion flag is ever rewritten.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestSegment {
    index: usize,
    row_offset: usize,
    include: bool,
    in_channel: i64,
    out_channel: i64,
    row: TokenRow,
}

impl TestSegment {
    fn from_row(line: &str, index: usize, row_offset: usize, schema: &SegmentSchema) -> BrickResult<Self> {
        let row = TokenRow::parse(line);
        if row.len() < schema.min_test_columns() {
            return Err(segment_error(
                Section::SegmentsTest,
                format!(
                    "row '{}' has {} columns, expected at least {}",
                    line.trim(),
                    row.len(),
                    schema.min_test_columns()
                ),
            ));
        }
        Ok(Self {
            index,
            row_offset,
            include: parse_flag(&row, schema.include, "include flag", Section::SegmentsTest)?,
            in_channel: parse_int(&row, schema.in_channel, "in channel", Section::SegmentsTest)?,
            out_channel: parse_int(&row, schema.out_channel, "out channel", Section::SegmentsTest)?,
            row,
        })
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn include(&self) -> bool {
        self.include
    }

    pub fn in_channel(&self) -> i64 {
        self.in_channel
    }

    pub fn out_channel(&self) -> i64 {
        self.out_channel
    }

    pub fn output_filename(&self) -> String {
        output_filename(self.in_channel, self.out_channel, "extrap")
    }

    fn render_row(&self, schema: &SegmentSchema) -> String {
        let mut row = self.row.clone();
        let unchanged = row
            .token(schema.include)
            .and_then(|token| token.parse::<i64>().ok())
            .is_some_and(|flag| (flag != 0) == self.include);
        if !unchanged {
            row.set(schema.include, if self.include { "1" } else { "0" });
        }
        row.render()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestSegments {
    schema: SegmentSchema,
    segments: Vec<TestSegment>,
}

impl TestSegments {
    pub fn load(document: &Document, schema: &SegmentSchema) -> BrickResult<Self> {
        Self::parse(document.section_rows(Section::SegmentsTest)?, schema)
    }

    pub fn parse(rows: &[String], schema: &SegmentSchema) -> BrickResult<Self> {
        let mut segments = Vec::new();
        for (row_offset, line) in rows.iter().enumerate() {
            if is_blank(line) {
                continue;
            }
            let index = segments.len();
            segments.push(TestSegment::from_row(line, index, row_offset, schema)?);
        }
        Ok(Self {
            schema: *schema,
            segments,
        })
    }

    pub fn all(&self) -> &[TestSegment] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn output_files(&self) -> Vec<String> {
        self.segments
            .iter()
            .filter(|segment| segment.include)
            .map(TestSegment::output_filename)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Copy that includes exactly the listed test segments.
    pub fn with_selection(&self, indices: &[usize]) -> BrickResult<Self> {
        if let Some(index) = indices.iter().find(|index| **index >= self.segments.len()) {
            return Err(BrickError::invalid_options(format!(
                "test segment {index} does not exist; the document lists {}",
                self.segments.len()
            )));
        }
        let mut selected = self.clone();
        for segment in &mut selected.segments {
            segment.include = indices.contains(&segment.index);
        }
        Ok(selected)
    }

    /// `index | row` lines, one per test segment.
    pub fn describe(&self) -> Vec<String> {
        self.segments
            .iter()
            .map(|segment| {
                format!(
                    "{} | {}",
                    segment.index,
                    segment.render_row(&self.schema).trim()
                )
            })
            .collect()
    }

    pub fn render_rows(&self, template_rows: &[String]) -> BrickResult<Vec<String>> {
        let mut rows = template_rows.to_vec();
        for segment in &self.segments {
            let slot = rows.get_mut(segment.row_offset).ok_or_else(|| {
                segment_error(
                    Section::SegmentsTest,
                    format!(
                        "template has {} rows but test segment {} sits on row {}",
                        template_rows.len(),
                        segment.index,
                        segment.row_offset
                    ),
                )
            })?;
            *slot = segment.render_row(&self.schema);
        }
        Ok(rows)
    }
}
