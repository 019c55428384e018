//! Free parameters and their addresses in the level model.
//!
//! A parameter vector is laid out as the level parameters in registry order
//! followed by one normalization factor per varied data segment, in
//! ascending segment order.

use crate::domain::{BrickError, BrickResult, JPi};
use crate::levels::LevelGroup;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterKind {
    /// Shared by every channel of a group.
    Energy,
    /// Partial width, or ANC for a bound level, of one channel.
    Width,
}

impl ParameterKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Energy => "energy",
            Self::Width => "width",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    pub jpi: JPi,
    pub kind: ParameterKind,
    /// One-based channel within the group.
    pub channel: usize,
    /// One-based rank among groups sharing `jpi`.
    pub rank: usize,
    pub is_anc: bool,
}

impl Parameter {
    pub fn new(jpi: JPi, kind: ParameterKind, channel: usize, rank: usize, is_anc: bool) -> Self {
        Self {
            jpi,
            kind,
            channel,
            rank,
            is_anc,
        }
    }

    pub fn energy(jpi: JPi, rank: usize) -> Self {
        Self::new(jpi, ParameterKind::Energy, 1, rank, false)
    }

    pub fn width(jpi: JPi, channel: usize, rank: usize, is_anc: bool) -> Self {
        Self::new(jpi, ParameterKind::Width, channel, rank, is_anc)
    }

    /// LaTeX label such as `$\Gamma_{1,2}^{(+1.5)}$`.
    pub fn label(&self) -> String {
        let symbol = match (self.kind, self.is_anc) {
            (ParameterKind::Energy, _) => "E",
            (ParameterKind::Width, true) => "C",
            (ParameterKind::Width, false) => "\\Gamma",
        };
        format!(
            "${symbol}_{{{},{}}}^{{({}{:.1})}}$",
            self.rank,
            self.channel,
            self.jpi.parity().symbol(),
            self.jpi.spin()
        )
    }

    pub fn description(&self) -> String {
        format!(
            "{} {} (number {}) in particle pair {}, {}",
            self.jpi,
            self.kind.as_str(),
            self.rank,
            self.channel,
            self.label()
        )
    }
}

/// Normalization factor of the data segment at `segment` (all-segment index).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct NormFactor {
    pub segment: usize,
}

impl NormFactor {
    pub fn label(&self) -> String {
        format!("$n_{{{}}}$", self.segment)
    }
}

/// Zero-based location a parameter value is written to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "target", rename_all = "lowercase")]
pub enum Address {
    Level {
        group: usize,
        channel: usize,
        kind: ParameterKind,
    },
    Normalization {
        segment: usize,
    },
}

/// Default parameters: the group energy when the first sublevel's energy is
/// free, then one width per sublevel whose width is free.
pub fn discover_parameters(groups: &[LevelGroup]) -> Vec<Parameter> {
    let mut parameters = Vec::new();
    let mut seen = Vec::with_capacity(groups.len());

    for group in groups {
        let jpi = group.jpi();
        seen.push(jpi);
        let rank = seen.iter().filter(|candidate| **candidate == jpi).count();

        for (position, level) in group.levels().iter().enumerate() {
            if position == 0 && !level.energy_fixed {
                parameters.push(Parameter::energy(jpi, rank));
            }
            if !level.width_fixed {
                parameters.push(Parameter::width(jpi, position + 1, rank, level.is_bound()));
            }
        }
    }

    parameters
}

pub fn resolve_addresses(parameters: &[Parameter], groups: &[LevelGroup]) -> BrickResult<Vec<Address>> {
    parameters
        .iter()
        .map(|parameter| resolve_address(parameter, groups))
        .collect()
}

fn resolve_address(parameter: &Parameter, groups: &[LevelGroup]) -> BrickResult<Address> {
    let unresolved = || BrickError::UnresolvedJPi {
        jpi: parameter.jpi.to_string(),
        rank: parameter.rank,
    };

    // Rank r is the r-th group carrying this J^pi, wherever it sits.
    let group = parameter
        .rank
        .checked_sub(1)
        .and_then(|offset| {
            groups
                .iter()
                .enumerate()
                .filter(|(_, group)| group.jpi() == parameter.jpi)
                .nth(offset)
        })
        .map(|(index, _)| index)
        .ok_or_else(unresolved)?;

    let size = groups[group].len();
    let channel = parameter
        .channel
        .checked_sub(1)
        .filter(|channel| *channel < size)
        .ok_or_else(|| {
            BrickError::invalid_options(format!(
                "{} addresses channel {} but its group has {} level(s)",
                parameter.description(),
                parameter.channel,
                size
            ))
        })?;

    Ok(Address::Level {
        group,
        channel,
        kind: parameter.kind,
    })
}

/// Resolved parameter set of one configuration. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterRegistry {
    parameters: Vec<Parameter>,
    addresses: Vec<Address>,
    norm_factors: Vec<NormFactor>,
}

impl ParameterRegistry {
    pub fn new(
        parameters: Vec<Parameter>,
        groups: &[LevelGroup],
        norm_segment_indices: &[usize],
    ) -> BrickResult<Self> {
        let addresses = resolve_addresses(&parameters, groups)?;
        Ok(Self {
            parameters,
            addresses,
            norm_factors: norm_segment_indices
                .iter()
                .map(|segment| NormFactor { segment: *segment })
                .collect(),
        })
    }

    pub fn discover(groups: &[LevelGroup], norm_segment_indices: &[usize]) -> BrickResult<Self> {
        Self::new(discover_parameters(groups), groups, norm_segment_indices)
    }

    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    pub fn norm_factors(&self) -> &[NormFactor] {
        &self.norm_factors
    }

    /// Level addresses followed by normalization addresses.
    pub fn addresses(&self) -> Vec<Address> {
        self.addresses
            .iter()
            .copied()
            .chain(self.norm_factors.iter().map(|factor| Address::Normalization {
                segment: factor.segment,
            }))
            .collect()
    }

    pub fn level_addresses(&self) -> &[Address] {
        &self.addresses
    }

    pub fn level_count(&self) -> usize {
        self.parameters.len()
    }

    pub fn norm_count(&self) -> usize {
        self.norm_factors.len()
    }

    pub fn total_free_count(&self) -> usize {
        self.level_count() + self.norm_count()
    }

    pub fn labels(&self) -> Vec<String> {
        self.parameters
            .iter()
            .map(Parameter::label)
            .chain(self.norm_factors.iter().map(NormFactor::label))
            .collect()
    }

    /// Splits a full vector into its level prefix and normalization suffix.
    pub fn split<'a>(&self, theta: &'a [f64]) -> BrickResult<(&'a [f64], &'a [f64])> {
        if theta.len() != self.total_free_count() {
            return Err(BrickError::ParameterArity {
                context: "parameter vector",
                expected: self.total_free_count(),
                actual: theta.len(),
            });
        }
        Ok(theta.split_at(self.level_count()))
    }

    /// Copy of `groups` with the level prefix written in. Energy addresses
    /// move every sublevel of their group.
    pub fn apply_level_values(&self, groups: &[LevelGroup], values: &[f64]) -> BrickResult<Vec<LevelGroup>> {
        if values.len() != self.level_count() {
            return Err(BrickError::ParameterArity {
                context: "level parameters",
                expected: self.level_count(),
                actual: values.len(),
            });
        }

        let mut updated = groups.to_vec();
        for (address, value) in self.addresses.iter().zip(values) {
            let Address::Level { group, channel, kind } = *address else {
                continue;
            };
            let Some(target) = updated.get_mut(group) else {
                return Err(BrickError::LevelCountMismatch {
                    expected: group + 1,
                    actual: groups.len(),
                });
            };
            match kind {
                ParameterKind::Energy => {
                    for level in target.levels_mut() {
                        level.energy = *value;
                    }
                }
                ParameterKind::Width => {
                    if let Some(level) = target.levels_mut().get_mut(channel) {
                        level.width = *value;
                    }
                }
            }
        }
        Ok(updated)
    }

    /// Current values of the level parameters in `groups`.
    pub fn level_values(&self, groups: &[LevelGroup]) -> Vec<f64> {
        self.addresses
            .iter()
            .filter_map(|address| match *address {
                Address::Level { group, channel, kind } => {
                    let level = groups.get(group)?.levels().get(channel)?;
                    Some(match kind {
                        ParameterKind::Energy => level.energy,
                        ParameterKind::Width => level.width,
                    })
                }
                Address::Normalization { .. } => None,
            })
            .collect()
    }
}
