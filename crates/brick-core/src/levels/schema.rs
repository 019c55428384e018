/// Column positions of the fields read from a `<levels>` row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelSchema {
    pub version: &'static str,
    pub spin: usize,
    pub parity: usize,
    pub energy: usize,
    pub energy_fixed: usize,
    pub channel: usize,
    pub include: usize,
    pub width_fixed: usize,
    pub width: usize,
    pub separation_energy: usize,
    pub channel_radius: usize,
}

impl LevelSchema {
    pub const AZURE2: Self = Self {
        version: "azure2",
        spin: 0,
        parity: 1,
        energy: 2,
        energy_fixed: 3,
        channel: 5,
        include: 9,
        width_fixed: 10,
        width: 11,
        separation_energy: 21,
        channel_radius: 27,
    };

    pub fn min_columns(&self) -> usize {
        [
            self.spin,
            self.parity,
            self.energy,
            self.energy_fixed,
            self.channel,
            self.include,
            self.width_fixed,
            self.width,
            self.separation_energy,
            self.channel_radius,
        ]
        .into_iter()
        .max()
        .unwrap_or_default()
            + 1
    }
}

impl Default for LevelSchema {
    fn default() -> Self {
        Self::AZURE2
    }
}
