//! Resonance levels from the `<levels>` section.
//!
//! Levels are grouped by blank lines; every level in a group shares one
//! J^pi and couples to a different channel. Groups are parsed once and then
//! copied per evaluation before any value is changed.

mod schema;

pub use schema::LevelSchema;

use crate::document::{Document, Section, TokenRow};
use crate::domain::{BrickError, BrickResult, JPi, Parity};
use crate::serialization::format_f64;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Level {
    pub jpi: JPi,
    pub energy: f64,
    pub energy_fixed: bool,
    pub width: f64,
    pub width_fixed: bool,
    pub channel: usize,
    pub channel_radius: f64,
    pub separation_energy: f64,
    pub include: bool,
}

impl Level {
    pub fn from_row(row: &str, schema: &LevelSchema) -> BrickResult<Self> {
        let tokens = TokenRow::parse(row);
        if tokens.len() < schema.min_columns() {
            return Err(level_error(format!(
                "row '{}' has {} columns, expected at least {}",
                row.trim(),
                tokens.len(),
                schema.min_columns()
            )));
        }

        let spin = parse_f64(&tokens, schema.spin, "spin")?;
        let parity_sign = parse_i64(&tokens, schema.parity, "parity")?;
        let parity = Parity::from_sign(parity_sign).ok_or_else(|| {
            level_error(format!("parity must be 1 or -1, found {parity_sign}"))
        })?;
        let jpi = JPi::new(spin, parity)
            .ok_or_else(|| level_error(format!("spin {spin} is not a non-negative half-integer")))?;

        let width = parse_f64(&tokens, schema.width, "width")?;
        let channel = parse_i64(&tokens, schema.channel, "channel")?;
        let channel = usize::try_from(channel)
            .ok()
            .filter(|channel| *channel >= 1)
            .ok_or_else(|| level_error(format!("channel must be 1 or greater, found {channel}")))?;

        Ok(Self {
            jpi,
            energy: parse_f64(&tokens, schema.energy, "energy")?,
            energy_fixed: parse_i64(&tokens, schema.energy_fixed, "energy fixed flag")? != 0,
            width,
            width_fixed: parse_i64(&tokens, schema.width_fixed, "width fixed flag")? != 0
                || width == 0.0,
            channel,
            channel_radius: parse_f64(&tokens, schema.channel_radius, "channel radius")?,
            separation_energy: parse_f64(&tokens, schema.separation_energy, "separation energy")?,
            include: parse_i64(&tokens, schema.include, "include flag")? != 0,
        })
    }

    pub fn spin(&self) -> f64 {
        self.jpi.spin()
    }

    pub fn parity(&self) -> Parity {
        self.jpi.parity()
    }

    /// A level below its separation energy carries an ANC instead of a width.
    pub fn is_bound(&self) -> bool {
        self.energy < self.separation_energy
    }

    pub fn summary(&self) -> String {
        format!(
            "{}{} | {} MeV | {} eV | channel {}",
            self.spin(),
            self.parity().symbol(),
            self.energy,
            self.width,
            self.channel
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LevelGroup {
    levels: Vec<Level>,
}

impl LevelGroup {
    pub fn new(levels: Vec<Level>) -> Option<Self> {
        (!levels.is_empty()).then_some(Self { levels })
    }

    pub fn jpi(&self) -> JPi {
        self.levels[0].jpi
    }

    pub fn levels(&self) -> &[Level] {
        &self.levels
    }

    pub fn levels_mut(&mut self) -> &mut [Level] {
        &mut self.levels
    }

    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }
}

pub fn load_level_groups(document: &Document, schema: &LevelSchema) -> BrickResult<Vec<LevelGroup>> {
    parse_level_groups(document.section_rows(Section::Levels)?, schema)
}

pub fn parse_level_groups(rows: &[String], schema: &LevelSchema) -> BrickResult<Vec<LevelGroup>> {
    let mut groups = Vec::new();
    let mut current = Vec::new();

    for row in rows {
        if is_blank(row) {
            groups.extend(LevelGroup::new(std::mem::take(&mut current)));
        } else {
            current.push(Level::from_row(row, schema)?);
        }
    }
    groups.extend(LevelGroup::new(current));

    Ok(groups)
}

pub fn flatten_levels(groups: &[LevelGroup]) -> Vec<Level> {
    groups
        .iter()
        .flat_map(|group| group.levels().iter().cloned())
        .collect()
}

/// Rewrites the spin, parity, energy, width and radius columns of every
/// non-blank template row from `levels`, in order. Blank rows stay where
/// they are and all other columns keep their template text.
pub fn render_levels(
    template_rows: &[String],
    levels: &[Level],
    schema: &LevelSchema,
) -> BrickResult<Vec<String>> {
    let expected = template_rows.iter().filter(|row| !is_blank(row)).count();
    if expected != levels.len() {
        return Err(BrickError::LevelCountMismatch {
            expected,
            actual: levels.len(),
        });
    }

    let mut levels = levels.iter();
    let mut rendered = Vec::with_capacity(template_rows.len());
    for row in template_rows {
        if is_blank(row) {
            rendered.push(row.clone());
            continue;
        }
        let Some(level) = levels.next() else {
            break;
        };

        let mut tokens = TokenRow::parse(row);
        if tokens.len() < schema.min_columns() {
            return Err(level_error(format!(
                "template row '{}' has {} columns, expected at least {}",
                row.trim(),
                tokens.len(),
                schema.min_columns()
            )));
        }
        set_f64(&mut tokens, schema.spin, level.spin());
        set_i32(&mut tokens, schema.parity, level.parity().sign());
        set_f64(&mut tokens, schema.energy, level.energy);
        set_f64(&mut tokens, schema.width, level.width);
        set_f64(&mut tokens, schema.channel_radius, level.channel_radius);
        rendered.push(tokens.render());
    }

    Ok(rendered)
}

fn is_blank(row: &str) -> bool {
    row.trim().is_empty()
}

// Unchanged values keep their original spelling.
fn set_f64(tokens: &mut TokenRow, column: usize, value: f64) {
    let unchanged = tokens
        .token(column)
        .and_then(|token| token.parse::<f64>().ok())
        .is_some_and(|current| current == value);
    if !unchanged {
        tokens.set(column, format_f64(value));
    }
}

fn set_i32(tokens: &mut TokenRow, column: usize, value: i32) {
    let unchanged = tokens
        .token(column)
        .and_then(|token| token.parse::<i64>().ok())
        .is_some_and(|current| current == i64::from(value));
    if !unchanged {
        tokens.set(column, value.to_string());
    }
}

fn parse_f64(tokens: &TokenRow, column: usize, field: &str) -> BrickResult<f64> {
    let token = tokens.token(column).unwrap_or_default();
    token
        .parse::<f64>()
        .map_err(|_| level_error(format!("{field} column {column} holds '{token}', not a number")))
}

fn parse_i64(tokens: &TokenRow, column: usize, field: &str) -> BrickResult<i64> {
    let token = tokens.token(column).unwrap_or_default();
    token
        .parse::<i64>()
        .map_err(|_| level_error(format!("{field} column {column} holds '{token}', not an integer")))
}

fn level_error(reason: String) -> BrickError {
    BrickError::malformed(Section::Levels.name(), reason)
}
