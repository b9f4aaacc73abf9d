//! Application services
//!
//! Concrete service implementations that orchestrate domain logic.
//! Services depend on I/O boundary traits (LineRepository, TaxConverter)
//! but are themselves concrete structs, not traits.

mod recompute;

pub use recompute::{EditOutcome, RecomputeService};
