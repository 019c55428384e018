//! Data and test segments from `<segmentsData>` and `<segmentsTest>`.

mod data;
mod schema;
mod test_segments;

pub use data::{DataSegments, ENERGY_COLUMN, Segment};
pub use schema::SegmentSchema;
pub use test_segments::{TestSegment, TestSegments};

pub(crate) use data::resolve_path;

use crate::document::{Section, TokenRow};
use crate::domain::{BrickError, BrickResult};

/// `AZUREOut_aa={in}_R={out}.{extension}`, or `_TOTAL_CAPTURE` when `out` is -1.
pub fn output_filename(in_channel: i64, out_channel: i64, extension: &str) -> String {
    if out_channel == -1 {
        format!("AZUREOut_aa={in_channel}_TOTAL_CAPTURE.{extension}")
    } else {
        format!("AZUREOut_aa={in_channel}_R={out_channel}.{extension}")
    }
}

fn is_blank(row: &str) -> bool {
    row.trim().is_empty()
}

fn parse_int(row: &TokenRow, column: usize, field: &str, section: Section) -> BrickResult<i64> {
    let token = row.token(column).unwrap_or_default();
    token.parse::<i64>().map_err(|_| {
        segment_error(
            section,
            format!("{field} column {column} holds '{token}', not an integer"),
        )
    })
}

fn parse_flag(row: &TokenRow, column: usize, field: &str, section: Section) -> BrickResult<bool> {
    parse_int(row, column, field, section).map(|flag| flag != 0)
}

fn segment_error(section: Section, reason: String) -> BrickError {
    BrickError::malformed(section.name(), reason)
}

#[cfg(test)]
mod tests {
    use super::output_filename;

    #[test]
    fn total_capture_segments_use_the_capture_suffix() {
        assert_eq!(output_filename(1, 2, "out"), "AZUREOut_aa=1_R=2.out");
        assert_eq!(output_filename(3, -1, "extrap"), "AZUREOut_aa=3_TOTAL_CAPTURE.extrap");
    }
}
