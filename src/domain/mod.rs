//! Domain layer: line model and the recompute engine
//!
//! This layer is independent of external concerns (no I/O, no CLI, no config loading).

pub mod aggregate;
pub mod arena;
pub mod coefficient;
pub mod decimal;
pub mod display;
pub mod error;
pub mod flatten;
pub mod index;
pub mod line;
pub mod policy;
pub mod pricing;
pub mod propagate;

pub use aggregate::Aggregator;
pub use arena::{LineNode, LineTree};
pub use coefficient::Coefficients;
pub use error::{DomainError, DomainResult};
pub use flatten::{prune_detached, rebuild, AggregationMode, Flattener};
pub use index::{next_child_index, next_top_index, start_index};
pub use line::{ClientId, LineData, LineId, LineSubtree, TaxSet};
pub use policy::{ComputePolicy, CostPolicy, MarginFormula, PricingPolicy};
pub use pricing::{PricingError, TaxConverter};
pub use propagate::Propagator;
