//! Co-simulation test cases for simx.
//!
//! A cases document declares case variables (aliases for model variables),
//! a mandatory `base` case and a tree of variant cases. Each case compiles
//! its spec into set and get actions indexed by engine time. Running a case
//! drives a [`simx_core::SystemInterface`] through those actions and records
//! the observations; assertions are then evaluated over the recorded series.
//!
//! ## Modules
//!
//! - [`document`]: the cases file format
//! - [`keyspec`]: `alias[range]@time` key parsing
//! - [`action`]: set/get actions and time-indexed action tables
//! - [`case`]: cases and the case tree arena
//! - [`compiler`]: spec fragments to actions and assertions
//! - [`schedule`]: the execution loop
//! - [`cases`]: the root aggregate tying it all together

pub mod action;
pub mod case;
pub mod cases;
pub mod compiler;
pub mod document;
pub mod error;
pub mod keyspec;
pub mod schedule;

pub use action::{Action, ActionTable, ActionTime, GetAction, SetAction};
pub use case::{Case, CaseId, CaseTree, Special};
pub use cases::{CaseRun, Cases, Dump};
pub use compiler::CaseCompiler;
pub use document::{CaseSpec, CasesDocument, Header};
pub use error::{CaseError, Result};
pub use schedule::{Executor, RunOutcome};
