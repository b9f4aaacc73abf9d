//! Application layer: services and use cases
//!
//! This layer parses edit payloads at the boundary, orchestrates domain logic
//! and depends on I/O boundary traits.

pub mod error;
pub mod error_ext;
pub mod locator;
pub mod payload;
pub mod services;

pub use error::{ApplicationError, ApplicationResult};
pub use error_ext::IoResultExt;
pub use locator::{DirtyLine, DirtyLineLocator};
pub use payload::{parse_payload, parse_payload_str, Baseline, EditPayload, EditedLine, UntouchedLine};
