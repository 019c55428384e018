/// Column positions of a `<segmentsData>` / `<segmentsTest>` row.
///
/// Some data types carry extra columns ahead of the normalization block, which
/// moves the normalization, vary flag and file path to the right. Those
/// offsets are listed per data type in `shifted_data_types`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmentSchema {
    pub version: &'static str,
    pub include: usize,
    pub in_channel: usize,
    pub out_channel: usize,
    pub data_type: usize,
    pub norm_factor: usize,
    pub vary_norm_factor: usize,
    pub filepath: usize,
    pub shifted_data_types: &'static [(i64, usize)],
}

impl SegmentSchema {
    pub const AZURE2: Self = Self {
        version: "azure2",
        include: 0,
        in_channel: 1,
        out_channel: 2,
        data_type: 7,
        norm_factor: 8,
        vary_norm_factor: 9,
        filepath: 11,
        shifted_data_types: &[(2, 2)],
    };

    pub fn offset_for(&self, data_type: i64) -> usize {
        self.shifted_data_types
            .iter()
            .find(|(candidate, _)| *candidate == data_type)
            .map_or(0, |(_, offset)| *offset)
    }

    pub fn norm_factor_column(&self, data_type: i64) -> usize {
        self.norm_factor + self.offset_for(data_type)
    }

    pub fn vary_norm_factor_column(&self, data_type: i64) -> usize {
        self.vary_norm_factor + self.offset_for(data_type)
    }

    pub fn filepath_column(&self, data_type: i64) -> usize {
        self.filepath + self.offset_for(data_type)
    }

    /// Columns a test row must have.
    pub fn min_test_columns(&self) -> usize {
        self.include.max(self.in_channel).max(self.out_channel) + 1
    }
}

impl Default for SegmentSchema {
    fn default() -> Self {
        Self::AZURE2
    }
}
