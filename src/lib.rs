pub mod analyzer;
pub mod concurrency;
pub mod config;
pub mod error;
pub mod github;
pub mod http;
pub mod ioc;
pub mod locator;
pub mod model;
pub mod output;
pub mod scan;

pub use config::Config;
pub use error::ScanError;
pub use ioc::VulnerabilityIndex;
pub use model::{Dependency, Match, ScanMode, ScanReport, ScanResult, ScanTarget, Summary};
pub use scan::ScanOrchestrator;
