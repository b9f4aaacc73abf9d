//! linetree: recompute engine for hierarchical document lines.
//!
//! Editing one line of a document cascades a proportional adjustment to its
//! sub-lines, re-aggregates totals up to its top-level line, keeps dotted
//! indices (`"1"`, `"1.2"`, `"1.2.1"`) consistent and projects the tree onto
//! the flat persisted line list.

pub mod application;
pub mod cli;
pub mod config;
pub mod domain;
pub mod exitcode;
pub mod infrastructure;
pub mod util;
