use super::{SegmentSchema, is_blank, output_filename, parse_flag, parse_int, segment_error};
use crate::document::{Document, Section, TokenRow};
use crate::domain::{BrickError, BrickResult};
use crate::serialization::format_f64;
use crate::table::NumericTable;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Energy column of a segment data table (MeV, lab).
pub const ENERGY_COLUMN: usize = 0;

/// One row of `<segmentsData>` together with the table it points at.
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    index: usize,
    row_offset: usize,
    include: bool,
    in_channel: i64,
    out_channel: i64,
    data_type: i64,
    norm_factor: f64,
    vary_norm_factor: bool,
    filepath: String,
    row: TokenRow,
    values: Arc<NumericTable>,
}

impl Segment {
    fn from_row(
        line: &str,
        index: usize,
        row_offset: usize,
        schema: &SegmentSchema,
        base_dir: &Path,
    ) -> BrickResult<Self> {
        let row = TokenRow::parse(line);
        let data_type = parse_int(&row, schema.data_type, "data type", Section::SegmentsData)?;
        let filepath_column = schema.filepath_column(data_type);
        if row.len() <= filepath_column {
            return Err(segment_error(
                Section::SegmentsData,
                format!(
                    "row '{}' has {} columns, data type {} needs at least {}",
                    line.trim(),
                    row.len(),
                    data_type,
                    filepath_column + 1
                ),
            ));
        }

        let norm_column = schema.norm_factor_column(data_type);
        let norm_token = row.token(norm_column).unwrap_or_default();
        let norm_factor = norm_token.parse::<f64>().map_err(|_| {
            segment_error(
                Section::SegmentsData,
                format!("normalization column {norm_column} holds '{norm_token}', not a number"),
            )
        })?;
        let filepath = row.token(filepath_column).unwrap_or_default().to_string();

        let table_path = resolve_path(base_dir, &filepath);
        let values = NumericTable::read(&table_path).map_err(|error| BrickError::DataRead {
            path: table_path.clone(),
            reason: error.to_string(),
        })?;

        Ok(Self {
            index,
            row_offset,
            include: parse_flag(&row, schema.include, "include flag", Section::SegmentsData)?,
            in_channel: parse_int(&row, schema.in_channel, "in channel", Section::SegmentsData)?,
            out_channel: parse_int(&row, schema.out_channel, "out channel", Section::SegmentsData)?,
            data_type,
            norm_factor,
            vary_norm_factor: parse_flag(
                &row,
                schema.vary_norm_factor_column(data_type),
                "vary normalization flag",
                Section::SegmentsData,
            )?,
            filepath,
            row,
            values: Arc::new(values),
        })
    }

    /// Position among all segments of the section.
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

    pub fn data_type(&self) -> i64 {
        self.data_type
    }

    pub fn norm_factor(&self) -> f64 {
        self.norm_factor
    }

    pub fn vary_norm_factor(&self) -> bool {
        self.vary_norm_factor
    }

    pub fn filepath(&self) -> &str {
        &self.filepath
    }

    /// The path after its last `/`.
    pub fn filename(&self) -> &str {
        self.filepath
            .rsplit_once('/')
            .map_or(self.filepath.as_str(), |(_, name)| name)
    }

    pub fn output_filename(&self) -> String {
        output_filename(self.in_channel, self.out_channel, "out")
    }

    pub fn values(&self) -> &NumericTable {
        &self.values
    }

    pub fn point_count(&self) -> usize {
        self.values.row_count()
    }

    /// Copy of the loaded table with the energy column moved by `shift`.
    pub fn shifted_values(&self, shift: f64) -> NumericTable {
        self.values.with_column_shifted(ENERGY_COLUMN, shift)
    }

    pub(crate) fn set_norm_factor(&mut self, value: f64) {
        self.norm_factor = value;
    }

    pub(crate) fn set_filepath(&mut self, filepath: String) {
        self.filepath = filepath;
    }

    pub fn render_row(&self, schema: &SegmentSchema) -> String {
        let mut row = self.row.clone();

        let include_column = schema.include;
        let include_unchanged = row
            .token(include_column)
            .and_then(|token| token.parse::<i64>().ok())
            .is_some_and(|flag| (flag != 0) == self.include);
        if !include_unchanged {
            row.set(include_column, if self.include { "1" } else { "0" });
        }

        let norm_column = schema.norm_factor_column(self.data_type);
        let norm_unchanged = row
            .token(norm_column)
            .and_then(|token| token.parse::<f64>().ok())
            .is_some_and(|value| value == self.norm_factor);
        if !norm_unchanged {
            row.set(norm_column, format_f64(self.norm_factor));
        }

        let path_column = schema.filepath_column(self.data_type);
        if row.token(path_column) != Some(self.filepath.as_str()) {
            row.set(path_column, self.filepath.clone());
        }

        row.render()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DataSegments {
    schema: SegmentSchema,
    segments: Vec<Segment>,
}

impl DataSegments {
    pub fn load(document: &Document, schema: &SegmentSchema, base_dir: &Path) -> BrickResult<Self> {
        Self::parse(document.section_rows(Section::SegmentsData)?, schema, base_dir)
    }

    pub fn parse(rows: &[String], schema: &SegmentSchema, base_dir: &Path) -> BrickResult<Self> {
        let mut segments = Vec::new();
        for (row_offset, line) in rows.iter().enumerate() {
            if is_blank(line) {
                continue;
            }
            let index = segments.len();
            segments.push(Segment::from_row(line, index, row_offset, schema, base_dir)?);
        }
        Ok(Self {
            schema: *schema,
            segments,
        })
    }

    pub fn schema(&self) -> &SegmentSchema {
        &self.schema
    }

    pub fn all(&self) -> &[Segment] {
        &self.segments
    }

    pub fn get(&self, index: usize) -> Option<&Segment> {
        self.segments.get(index)
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn included(&self) -> impl Iterator<Item = &Segment> {
        self.segments.iter().filter(|segment| segment.include)
    }

    /// All-segment index of the `position`-th included segment.
    pub fn included_index(&self, position: usize) -> Option<usize> {
        self.included().nth(position).map(Segment::index)
    }

    /// Included segments whose normalization factor is sampled, in ascending order.
    pub fn norm_segment_indices(&self) -> Vec<usize> {
        self.included()
            .filter(|segment| segment.vary_norm_factor)
            .map(Segment::index)
            .collect()
    }

    pub fn point_counts(&self) -> Vec<usize> {
        self.included().map(Segment::point_count).collect()
    }

    /// Sorted, de-duplicated output files of the included segments.
    pub fn output_files(&self) -> Vec<String> {
        self.included()
            .map(Segment::output_filename)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Copy with the sampled normalization factors replaced by `values`.
    pub fn with_norm_factors(&self, values: &[f64]) -> BrickResult<Self> {
        let indices = self.norm_segment_indices();
        if indices.len() != values.len() {
            return Err(BrickError::ParameterArity {
                context: "normalization factors",
                expected: indices.len(),
                actual: values.len(),
            });
        }

        let mut updated = self.clone();
        for (index, value) in indices.into_iter().zip(values) {
            updated.segments[index].set_norm_factor(*value);
        }
        Ok(updated)
    }

    pub(crate) fn segment_mut(&mut self, index: usize) -> Option<&mut Segment> {
        self.segments.get_mut(index)
    }

    pub fn render_rows(&self, template_rows: &[String]) -> BrickResult<Vec<String>> {
        let mut rows = template_rows.to_vec();
        for segment in &self.segments {
            let slot = rows.get_mut(segment.row_offset).ok_or_else(|| {
                segment_error(
                    Section::SegmentsData,
                    format!(
                        "template has {} rows but segment {} sits on row {}",
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

pub(crate) fn resolve_path(base_dir: &Path, filepath: &str) -> PathBuf {
    let path = Path::new(filepath);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base_dir.join(path)
    }
}

#[cfg(test)]
mod tests {
    use super::DataSegments;
    use crate::domain::BrickError;
    use crate::segments::SegmentSchema;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    fn write_table(dir: &Path, name: &str) {
        fs::create_dir_all(dir.join("data")).expect("data dir");
        fs::write(
            dir.join("data").join(name),
            "0.50 1.0 0.1\n0.75 2.0 0.2\n1.00 3.0 0.3\n",
        )
        .expect("table");
    }

    fn fixture(temp: &TempDir) -> Vec<String> {
        write_table(temp.path(), "vogl.dat");
        write_table(temp.path(), "rolfs.dat");
        write_table(temp.path(), "angular.dat");
        write_table(temp.path(), "capture.dat");
        vec![
            "1  1  2  0.3  2.0  0  180  0  1.0  1  0.05  data/vogl.dat".to_string(),
            String::new(),
            "0  1  2  0.3  2.0  0  180  0  1.0  1  0.05  data/rolfs.dat".to_string(),
            "1  1  1  0.3  2.0  0  180  2  4  0  1.2  0  0.1  data/angular.dat".to_string(),
            "1  1  -1  0.3  2.0  0  180  0  1.0  1  0.08  data/capture.dat".to_string(),
        ]
    }

    #[test]
    fn segments_are_indexed_in_document_order_skipping_blank_rows() {
        let temp = TempDir::new().expect("tempdir");
        let rows = fixture(&temp);
        let data = DataSegments::parse(&rows, &SegmentSchema::AZURE2, temp.path()).expect("load");

        assert_eq!(data.len(), 4);
        assert_eq!(data.get(1).map(|segment| segment.index()), Some(1));
        assert_eq!(data.get(0).map(|segment| segment.filename()), Some("vogl.dat"));
        assert_eq!(data.get(0).map(|segment| segment.point_count()), Some(3));
    }

    #[test]
    fn excluded_segments_do_not_contribute() {
        let temp = TempDir::new().expect("tempdir");
        let rows = fixture(&temp);
        let data = DataSegments::parse(&rows, &SegmentSchema::AZURE2, temp.path()).expect("load");

        assert_eq!(data.norm_segment_indices(), vec![0, 3]);
        assert_eq!(data.point_counts(), vec![3, 3, 3]);
        assert_eq!(
            data.output_files(),
            vec![
                "AZUREOut_aa=1_R=1.out".to_string(),
                "AZUREOut_aa=1_R=2.out".to_string(),
                "AZUREOut_aa=1_TOTAL_CAPTURE.out".to_string(),
            ]
        );
        assert_eq!(data.included_index(1), Some(2));
    }

    #[test]
    fn data_type_two_reads_shifted_columns() {
        let temp = TempDir::new().expect("tempdir");
        let rows = fixture(&temp);
        let data = DataSegments::parse(&rows, &SegmentSchema::AZURE2, temp.path()).expect("load");
        let angular = data.get(2).expect("angular segment");

        assert_eq!(angular.data_type(), 2);
        assert_eq!(angular.norm_factor(), 1.2);
        assert!(!angular.vary_norm_factor());
        assert_eq!(angular.filepath(), "data/angular.dat");
    }

    #[test]
    fn norm_factors_are_written_back_in_place() {
        let temp = TempDir::new().expect("tempdir");
        let rows = fixture(&temp);
        let data = DataSegments::parse(&rows, &SegmentSchema::AZURE2, temp.path()).expect("load");

        let unchanged = data.render_rows(&rows).expect("render");
        assert_eq!(unchanged, rows);

        let updated = data.with_norm_factors(&[1.1, 0.9]).expect("two factors");
        assert_eq!(updated.get(0).map(|segment| segment.norm_factor()), Some(1.1));
        assert_eq!(data.get(0).map(|segment| segment.norm_factor()), Some(1.0));

        let rendered = updated.render_rows(&rows).expect("render");
        assert_eq!(rendered[0], "1  1  2  0.3  2.0  0  180  0  1.1  1  0.05  data/vogl.dat");
        assert_eq!(rendered[1], "");
        assert_eq!(rendered[2], rows[2]);
        assert_eq!(rendered[3], rows[3]);
        assert_eq!(rendered[4], "1  1  -1  0.3  2.0  0  180  0  0.9  1  0.08  data/capture.dat");
    }

    #[test]
    fn wrong_number_of_norm_factors_is_an_arity_error() {
        let temp = TempDir::new().expect("tempdir");
        let rows = fixture(&temp);
        let data = DataSegments::parse(&rows, &SegmentSchema::AZURE2, temp.path()).expect("load");
        let error = data.with_norm_factors(&[1.0]).expect_err("one factor is too few");
        assert!(matches!(
            error,
            BrickError::ParameterArity {
                expected: 2,
                actual: 1,
                ..
            }
        ));
    }

    #[test]
    fn shifted_values_move_only_energies() {
        let temp = TempDir::new().expect("tempdir");
        let rows = fixture(&temp);
        let data = DataSegments::parse(&rows, &SegmentSchema::AZURE2, temp.path()).expect("load");
        let segment = data.get(0).expect("segment");

        let shifted = segment.shifted_values(0.001);
        assert_eq!(shifted.column(0), Some(vec![0.5 + 0.001, 0.75 + 0.001, 1.0 + 0.001]));
        assert_eq!(shifted.column(1), segment.values().column(1));
        assert_eq!(segment.values().get(0, 0), Some(0.5));
    }

    #[test]
    fn missing_data_table_is_reported() {
        let temp = TempDir::new().expect("tempdir");
        let rows = vec!["1  1  2  0.3  2.0  0  180  0  1.0  1  0.05  data/none.dat".to_string()];
        let error = DataSegments::parse(&rows, &SegmentSchema::AZURE2, temp.path())
            .expect_err("table is missing");
        assert!(matches!(error, BrickError::DataRead { .. }));
    }
}
