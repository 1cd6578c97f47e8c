//! Reference co-simulation backend for simx.
//!
//! Reads a system structure document (models with their variable metadata,
//! component instances, connections) and implements
//! [`simx_core::SystemInterface`] by sample-and-hold. It models no physics;
//! it exists so that cases can be compiled, run and asserted end to end
//! without an FMU engine.

pub mod error;
pub mod simulator;
pub mod structure;

pub use error::{Result, SystemError};
pub use simulator::StructureSystem;
pub use structure::{Component, Connection, Endpoint, Model, SystemStructure};
