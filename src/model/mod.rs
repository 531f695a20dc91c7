//! Core data types for dependencies, matches, targets and scan results.
//!
//! This module contains the fundamental types used throughout iocscan:
//!
//! - [`Dependency`] - A package name with a declared range or an installed version
//! - [`Match`] - A dependency whose version intersects the IOC list
//! - [`ScanResult`] - The outcome of analyzing one file (or noting its absence)
//! - [`ScanTarget`] - Where candidate files are looked up
//! - [`ScanReport`] - Every result of a run, plus its mode
//! - [`Summary`] - Aggregated view handed to the output layer
//!
//! # Example
//!
//! ```
//! use iocscan::model::{Match, ScanResult};
//!
//! let m = Match::installed("package-lock.json", "left-pad", "1.3.0", vec!["1.3.0".to_string()]);
//! let result = ScanResult::analyzed("package-lock.json", vec![m]);
//!
//! assert!(result.analyzed);
//! assert_eq!(result.matches.len(), 1);
//! ```

mod finding;
mod report;
mod target;

pub use finding::*;
pub use report::*;
pub use target::*;
