//! Core data model for simx co-simulation cases.
//!
//! This crate holds everything the case compiler, the scheduler and the
//! assertion engine share:
//!
//! - [`Value`] and [`VarType`], the typed scalar values exchanged with models
//! - FMI causality/variability classification and the legality rules that
//!   decide when a variable may be set ([`fmi`])
//! - [`TimeScale`], the conversion between user time and the integer engine clock
//! - the [`SystemInterface`] trait that a co-simulation backend implements
//! - the [`VariableRegistry`] of case variables (aliases)

pub mod error;
pub mod fmi;
pub mod interface;
pub mod refs;
pub mod registry;
pub mod time;
pub mod value;

pub use error::{CoreError, Result};
pub use fmi::{Causality, Initial, InitialRule, Variability};
pub use interface::{ActionKind, SystemInterface, VariableInfo, VariableMap};
pub use refs::merge_ref_values;
pub use registry::{CaseVariable, VariableDecl, VariableRegistry};
pub use time::{Stamp, TimeScale};
pub use value::{Sample, Value, VarType};
