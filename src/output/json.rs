use crate::config::Config;
use crate::model::{ScanReport, Summary};
use anyhow::Result;

pub fn print_json(report: &ScanReport, config: &Config) -> Result<()> {
    let json = serde_json::to_string_pretty(&Summary::new(report, config))?;
    println!("{}", json);
    Ok(())
}
