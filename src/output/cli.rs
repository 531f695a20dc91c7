use crate::config::Config;
use crate::model::{Match, ScanMode, ScanReport, Summary};
use anyhow::Result;
use std::fmt::Write;
use tabled::{settings::Style, Table, Tabled};

#[derive(Tabled)]
struct MatchRow {
    #[tabled(rename = "Source")]
    source: String,
    #[tabled(rename = "Package")]
    package: String,
    #[tabled(rename = "Version")]
    version: String,
    #[tabled(rename = "Kind")]
    kind: String,
    #[tabled(rename = "Vulnerable versions")]
    vulnerable: String,
}

#[derive(Tabled)]
struct SourceRow {
    #[tabled(rename = "Source")]
    source: String,
    #[tabled(rename = "Matches")]
    matches: usize,
    #[tabled(rename = "Packages")]
    packages: String,
}

pub fn print_cli_table(report: &ScanReport, config: &Config) -> Result<()> {
    println!("{}", render(report, config)?);
    Ok(())
}

fn render(report: &ScanReport, config: &Config) -> Result<String> {
    let mut out = String::new();

    writeln!(out)?;
    writeln!(
        out,
        "Scan completed at: {}",
        report.scan_time.format("%Y-%m-%d %H:%M:%S UTC")
    )?;

    for result in report.results.iter().filter(|r| r.analyzed && !r.matches.is_empty()) {
        writeln!(out)?;
        writeln!(out, "{}: {} match(es)", result.label, result.matches.len())?;
        writeln!(out)?;

        let rows: Vec<MatchRow> = result.matches.iter().map(match_row).collect();
        writeln!(out, "{}", Table::new(rows).with(Style::rounded()))?;
    }

    let summary = Summary::new(report, config);
    writeln!(out)?;
    write_summary(&mut out, report, &summary)?;

    Ok(out)
}

fn match_row(m: &Match) -> MatchRow {
    MatchRow {
        source: truncate(&m.source, 50),
        package: m.package_name.clone(),
        version: m.version().to_string(),
        kind: if m.is_installed() {
            "\x1b[31minstalled\x1b[0m".to_string()
        } else {
            "\x1b[33mdeclared\x1b[0m".to_string()
        },
        vulnerable: truncate(&m.vulnerable_versions.join(", "), 40),
    }
}

fn write_summary(out: &mut String, report: &ScanReport, summary: &Summary) -> Result<()> {
    writeln!(out, "[SUMMARY]")?;
    writeln!(out, "  Mode:            {}", summary.mode)?;
    writeln!(
        out,
        "  Files analyzed:  {} of {}",
        report.analyzed_count(),
        report.results.len()
    )?;
    writeln!(out, "  Total matches:   {}", summary.total_matches)?;
    writeln!(out, "  Unique packages: {}", summary.unique_packages)?;

    if summary.mode != ScanMode::Local {
        writeln!(out, "  Orgs:            {}", list_or_dash(&summary.orgs))?;
        if let Some(repos) = &summary.repos {
            writeln!(out, "  Repos:           {}", list_or_dash(repos))?;
        }
        if summary.all_branches == Some(true) {
            writeln!(out, "  Branches:        (all)")?;
        } else if let Some(branches) = &summary.branches {
            writeln!(out, "  Branches:        {}", list_or_dash(branches))?;
        }
    }

    if summary.by_source.is_empty() {
        writeln!(out)?;
        writeln!(out, "No compromised packages found.")?;
        return Ok(());
    }

    let rows: Vec<SourceRow> = summary
        .by_source
        .iter()
        .map(|(source, s)| SourceRow {
            source: truncate(source, 50),
            matches: s.matches,
            packages: truncate(&s.packages.join(", "), 50),
        })
        .collect();

    writeln!(out)?;
    writeln!(out, "{}", Table::new(rows).with(Style::rounded()))?;
    Ok(())
}

fn list_or_dash(items: &[String]) -> String {
    if items.is_empty() {
        "-".to_string()
    } else {
        items.join(", ")
    }
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", head)
    }
}
