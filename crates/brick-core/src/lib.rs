//! Parameter mapping and isolated evaluation for AZURE2 R-matrix fits.
//!
//! An `.azr` input document is parsed once into level groups, data segments
//! and test segments. A flat parameter vector is then mapped onto a copy of
//! that model, written into a private workspace, evaluated by the external
//! solver and read back as numeric tables.

pub mod azr;
pub mod config;
pub mod document;
pub mod domain;
pub mod levels;
pub mod output;
pub mod parameters;
pub mod segments;
pub mod serialization;
pub mod solver;
pub mod table;
pub mod workspace;

pub use azr::{Azr, AzrBuilder, AzrOptions, ExtrapolateOptions, PredictOptions, Prediction};
pub use config::{Config, DataOverride, Evaluation, MaterializeOptions, Materialized};
pub use domain::{BrickError, BrickErrorCategory, BrickResult, JPi, Parity};
pub use parameters::{Address, NormFactor, Parameter, ParameterKind, ParameterRegistry};
pub use table::NumericTable;
