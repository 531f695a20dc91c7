use anyhow::Result;
use clap::{ArgAction, Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use iocscan::{
    analyzer::AnalyzerRegistry,
    config::{normalize_orgs, split_list, Config},
    github::GithubClient,
    http::create_client,
    output::{format_result_to_string, print_result, OutputFormat},
    ScanOrchestrator, VulnerabilityIndex,
};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Exit codes for CI integration
mod exit_codes {
    pub const SUCCESS: u8 = 0;
    pub const MATCHES: u8 = 1;
    pub const ERROR: u8 = 2;
}

#[derive(Parser)]
#[command(name = "iocscan")]
#[command(
    author,
    version,
    about = "Scan npm, yarn, pnpm, deno and bun dependency files for compromised package versions"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan the local directory or GitHub repositories
    Scan(ScanArgs),

    /// List supported manifest and lockfile formats
    ListFormats,

    /// Show or create config file
    Config {
        /// Generate default config file
        #[arg(long)]
        init: bool,

        /// Show config file path
        #[arg(long)]
        path: bool,
    },
}

#[derive(Args, Debug, Default)]
struct ScanArgs {
    /// Organizations to scan, comma separated
    #[arg(long)]
    orgs: Option<String>,

    /// Repositories to scan (owner/repo), comma separated
    #[arg(long)]
    repos: Option<String>,

    /// Branches to scan, comma separated
    #[arg(long)]
    branches: Option<String>,

    /// Scan every branch of each repository (requires a token)
    #[arg(long)]
    all_branches: bool,

    /// Search the whole repository tree instead of the root only (requires a token)
    #[arg(long)]
    no_root_only: bool,

    /// GitHub token
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Maximum number of branches scanned at once
    #[arg(long)]
    concurrency: Option<usize>,

    /// Print the JSON summary instead of tables
    #[arg(long)]
    json: bool,

    /// Increase log verbosity (-v warn, -vv info, -vvv debug)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    /// Exit with 1 on declared-only matches too
    #[arg(long, num_args = 0..=1, default_missing_value = "true")]
    fail_on_declared_only: Option<bool>,

    /// IOC feed URL
    #[arg(long)]
    ioc_url: Option<String>,

    /// Directory scanned in local mode
    #[arg(long, default_value = ".")]
    path: PathBuf,

    /// Write the JSON summary to a file
    #[arg(short, long)]
    output: Option<PathBuf>,
}

impl ScanArgs {
    /// Layers command-line values over the file configuration.
    fn apply(self, mut config: Config) -> Config {
        if let Some(orgs) = &self.orgs {
            config.orgs = normalize_orgs(orgs);
        }
        if let Some(repos) = &self.repos {
            config.repos = split_list(repos);
        }
        if let Some(branches) = &self.branches {
            config.branches = split_list(branches);
        }
        if let Some(concurrency) = self.concurrency {
            config.concurrency = concurrency;
        }
        if let Some(fail) = self.fail_on_declared_only {
            config.fail_on_declared_only = fail;
        }
        if let Some(url) = self.ioc_url {
            config.ioc_url = url;
        }

        config.all_branches |= self.all_branches;
        if self.no_root_only {
            config.root_only = false;
        }
        config.json = self.json;
        config.verbosity = self.verbose;
        config.token = self.token.filter(|t| !t.trim().is_empty());
        config.local_root = self.path;
        config
    }
}

fn log_level(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "error",
        1 => "warn",
        2 => "info",
        _ => "debug",
    }
}

fn init_tracing(config: &Config) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level(config.verbosity)));
    let registry = tracing_subscriber::registry().with(env_filter);

    let result = if config.json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .try_init()
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .try_init()
    };
    result.map_err(|e| anyhow::anyhow!("failed to initialize tracing subscriber: {}", e))
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::from(exit_codes::ERROR)
        }
    }
}

async fn run() -> Result<u8> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Scan(args) => {
            let output_file = args.output.clone();
            let config = args.apply(Config::load().unwrap_or_default());
            init_tracing(&config)?;
            run_scan(config, output_file).await
        }
        Commands::ListFormats => {
            list_formats();
            Ok(exit_codes::SUCCESS)
        }
        Commands::Config { init, path } => {
            handle_config(init, path)?;
            Ok(exit_codes::SUCCESS)
        }
    }
}

async fn run_scan(config: Config, output_file: Option<PathBuf>) -> Result<u8> {
    config.validate()?;

    let format = if config.json {
        OutputFormat::Json
    } else {
        OutputFormat::Table
    };
    let is_interactive = format == OutputFormat::Table;

    let client = create_client()?;
    let index = VulnerabilityIndex::fetch(&client, &config.ioc_url).await?;
    tracing::info!("{} compromised packages in the IOC feed", index.len());

    let github = GithubClient::new(client, config.token.clone())?;
    let config = Arc::new(config);
    let mut orchestrator = ScanOrchestrator::new(Arc::clone(&config), Arc::new(index), github);

    let progress = if is_interactive {
        let pb = ProgressBar::new(0);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
                .progress_chars("#>-"),
        );
        pb.enable_steady_tick(Duration::from_millis(100));
        pb.set_message(format!("Scanning ({})...", config.mode()));
        orchestrator = orchestrator.with_progress(pb.clone());
        Some(pb)
    } else {
        None
    };

    let report = orchestrator.run().await;

    if let Some(pb) = progress {
        pb.finish_with_message(format!("Found {} match(es)", report.matches().len()));
    }

    if let Some(path) = output_file {
        let json = format_result_to_string(&report, &config)?;
        std::fs::write(&path, json)?;
        if is_interactive {
            println!("Results written to: {}", path.display());
        }
    } else {
        print_result(&report, &config, format)?;
    }

    if report.has_relevant_matches(config.fail_on_declared_only) {
        Ok(exit_codes::MATCHES)
    } else {
        Ok(exit_codes::SUCCESS)
    }
}

fn list_formats() {
    println!("Supported formats:");
    println!();

    for (kind, files) in AnalyzerRegistry::default().entries() {
        let analyzer = kind.analyzer();
        println!("  {:<14} {:<22} {}", kind.as_str(), analyzer.name(), files.join(", "));
    }
}

fn handle_config(init: bool, show_path: bool) -> Result<()> {
    let config_path = Config::config_path();

    if show_path {
        println!("{}", config_path.display());
        return Ok(());
    }

    if init {
        if config_path.exists() {
            println!("Config file already exists at: {}", config_path.display());
            return Ok(());
        }

        Config::default().save()?;
        println!("Created config file at: {}", config_path.display());
        println!();
        println!("Default configuration:");
        println!("{}", Config::generate_default_config());
        return Ok(());
    }

    if config_path.exists() {
        let content = std::fs::read_to_string(&config_path)?;
        println!("Config file: {}", config_path.display());
        println!();
        println!("{}", content);
    } else {
        println!("No config file found.");
        println!("Run 'iocscan config --init' to create one.");
        println!();
        println!("Config path: {}", config_path.display());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scan_args(argv: &[&str]) -> ScanArgs {
        let cli = Cli::try_parse_from(argv).unwrap();
        match cli.command {
            Commands::Scan(args) => args,
            _ => panic!("expected scan"),
        }
    }

    #[test]
    fn test_cli_overrides_file_config() {
        let args = scan_args(&[
            "iocscan",
            "scan",
            "--orgs",
            "Acme, acme,Other",
            "--repos",
            "a/b, c/d",
            "--branches",
            "main",
            "--concurrency",
            "4",
            "--fail-on-declared-only=false",
            "--no-root-only",
            "--token",
            "ghp_x",
            "-vv",
        ]);
        let config = args.apply(Config::default());

        assert_eq!(config.orgs, vec!["acme", "other"]);
        assert_eq!(config.repos, vec!["a/b", "c/d"]);
        assert_eq!(config.branches, vec!["main"]);
        assert_eq!(config.concurrency, 4);
        assert!(!config.fail_on_declared_only);
        assert!(!config.root_only);
        assert_eq!(config.token.as_deref(), Some("ghp_x"));
        assert_eq!(config.verbosity, 2);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_bare_fail_flag_means_true() {
        let args = scan_args(&["iocscan", "scan", "--fail-on-declared-only"]);
        let file = Config {
            fail_on_declared_only: false,
            ..Config::default()
        };
        assert!(args.apply(file).fail_on_declared_only);
    }

    #[test]
    fn test_defaults_keep_file_values() {
        let args = ScanArgs {
            path: PathBuf::from("."),
            ..ScanArgs::default()
        };
        let file = Config {
            concurrency: 3,
            root_only: true,
            ..Config::default()
        };
        let config = args.apply(file);
        assert_eq!(config.concurrency, 3);
        assert!(config.root_only);
        assert!(config.orgs.is_empty());
    }

    #[test]
    fn test_log_level() {
        assert_eq!(log_level(0), "error");
        assert_eq!(log_level(1), "warn");
        assert_eq!(log_level(2), "info");
        assert_eq!(log_level(5), "debug");
    }
}
