//! webprobe - CSRF / XSS / SQL injection probe CLI

use clap::{Parser, Subcommand};
use colored::Colorize;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tabled::builder::Builder;
use tabled::settings::Style;
use tracing_subscriber::EnvFilter;

use webprobe::config;
use webprobe::error::ProbeError;
use webprobe::models::{Category, ProbeConfig, VerdictStatus};
use webprobe::report::{self, CategoryReport, Report};
use webprobe::scanner::csrf::CsrfProbe;
use webprobe::scanner::ProbeEngine;

/// webprobe - CSRF, reflected XSS and SQL injection probe engine
#[derive(Parser)]
#[command(name = "webprobe", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Probe a target web application
    Scan {
        /// Target base URL
        #[arg(short, long)]
        target: String,

        /// Categories to run (csrf, xss, sql_injection; comma-separated)
        #[arg(short = 'C', long, value_delimiter = ',', default_value = "csrf,xss,sql_injection")]
        categories: Vec<String>,

        /// XSS worker pool size
        #[arg(short, long)]
        workers: Option<usize>,

        /// Request timeout in seconds
        #[arg(long)]
        timeout: Option<u64>,

        /// Delay in seconds between requests of one XSS worker
        #[arg(long)]
        cooldown: Option<f64>,

        /// Endpoints swept with payloads (comma-separated)
        #[arg(short, long, value_delimiter = ',')]
        endpoints: Option<Vec<String>>,

        /// XSS payload file, one payload per line
        #[arg(long)]
        xss_payloads: Option<PathBuf>,

        /// SQL injection payload file, one payload per line
        #[arg(long)]
        sqli_payloads: Option<PathBuf>,

        /// Overall XSS sweep deadline in seconds
        #[arg(long)]
        deadline: Option<f64>,

        /// Path to configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Write the JSON report to this file
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Custom headers (format: "Key: Value")
        #[arg(short = 'H', long)]
        header: Option<Vec<String>>,

        /// Exit with code 1 if any category reports a failure
        #[arg(long)]
        fail_on_findings: bool,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// List probe categories and the CSRF suite
    Probes,
}

fn print_banner() {
    let banner = r#"
    ╔═══════════════════════════════════════╗
    ║  webprobe v0.1.0                      ║
    ║  CSRF / XSS / SQLi probe engine       ║
    ╚═══════════════════════════════════════╝
    "#;
    println!("{}", banner.cyan());
}

fn colored_status(status: VerdictStatus) -> String {
    match status {
        VerdictStatus::Pass => "pass".green().to_string(),
        VerdictStatus::Fail => "FAIL".red().bold().to_string(),
        VerdictStatus::Error => "error".yellow().to_string(),
    }
}

fn print_summary(report: &Report) {
    println!("\n{}", "  Probe Summary".bold());
    println!("  {}", "─".repeat(35));

    let mut builder = Builder::default();
    builder.push_record(["Category", "Check", "Status", "Detail"]);

    let (mut passed, mut failed, mut errored) = (0usize, 0usize, 0usize);
    let mut tally = |status: VerdictStatus| match status {
        VerdictStatus::Pass => passed += 1,
        VerdictStatus::Fail => failed += 1,
        VerdictStatus::Error => errored += 1,
    };

    for (category, entry) in report.categories() {
        match entry {
            CategoryReport::Csrf(csrf) => {
                for (probe, verdict) in &csrf.probes {
                    tally(verdict.status);
                    let detail = verdict
                        .evidence
                        .as_ref()
                        .map(|e| e.to_string())
                        .unwrap_or_default();
                    builder.push_record([
                        category.to_string(),
                        probe.to_string(),
                        colored_status(verdict.status),
                        detail,
                    ]);
                }
            }
            CategoryReport::Sweep(sweep) => {
                tally(sweep.status);
                let mut detail = match &sweep.error {
                    Some(message) => message.clone(),
                    None => format!("{} matching payload(s)", sweep.count),
                };
                if sweep.partial {
                    detail.push_str(" (deadline reached)");
                }
                builder.push_record([
                    category.to_string(),
                    "payload sweep".to_string(),
                    colored_status(sweep.status),
                    detail,
                ]);
            }
        }
    }

    let mut table = builder.build();
    table.with(Style::rounded());
    println!("{table}");

    println!(
        "\n  {} {} {}",
        format!("{passed} Passed").green(),
        format!("{failed} Failed").red().bold(),
        format!("{errored} Errors").yellow(),
    );
}

/// Caller-input errors exit with code 2, findings with code 1
fn exit_on_input_error(error: &ProbeError) -> ! {
    eprintln!("  {} {error}", "Error:".red().bold());
    std::process::exit(2);
}

fn parse_categories(raw: &[String]) -> webprobe::Result<BTreeSet<Category>> {
    raw.iter()
        .filter(|s| !s.trim().is_empty())
        .map(|s| s.parse())
        .collect()
}

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Scan {
            target,
            categories,
            workers,
            timeout,
            cooldown,
            endpoints,
            xss_payloads,
            sqli_payloads,
            deadline,
            config: config_path,
            output,
            header,
            fail_on_findings,
            verbose,
        } => {
            let filter = if verbose { "webprobe=debug" } else { "webprobe=info" };
            tracing_subscriber::fmt()
                .with_env_filter(
                    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
                )
                .with_target(false)
                .init();

            print_banner();

            let mut probe_config = match config_path {
                Some(ref path) => config::load_config(path)?,
                None => {
                    let default_path = Path::new("webprobe.toml");
                    if default_path.exists() {
                        config::load_config(default_path)?
                    } else {
                        ProbeConfig::default()
                    }
                }
            };

            config::merge_cli_args(
                &mut probe_config,
                workers,
                timeout,
                cooldown,
                endpoints,
                xss_payloads,
                sqli_payloads,
                deadline,
                header,
            )?;

            let categories = match parse_categories(&categories) {
                Ok(categories) => categories,
                Err(e) if e.is_fatal() => exit_on_input_error(&e),
                Err(e) => return Err(e.into()),
            };

            println!("  {} {}", "Target:".bold(), target.green());
            println!(
                "  {} {}",
                "Categories:".bold(),
                categories
                    .iter()
                    .map(Category::as_str)
                    .collect::<Vec<_>>()
                    .join(", ")
                    .cyan()
            );
            println!(
                "  {} {}\n",
                "Workers:".bold(),
                probe_config.worker_count.to_string().cyan()
            );

            let engine = ProbeEngine::with_defaults();
            let report = match engine.run(&target, &categories, &probe_config).await {
                Ok(report) => report,
                Err(e) if e.is_fatal() => exit_on_input_error(&e),
                Err(e) => return Err(e.into()),
            };

            print_summary(&report);

            match output {
                Some(ref path) => {
                    report::json::export(&report, path)?;
                    println!(
                        "\n  {} {}",
                        "Report saved to:".bold(),
                        path.display().to_string().green()
                    );
                }
                None => println!("\n{}", report::json::to_string(&report)?),
            }

            if fail_on_findings && report.has_failures() {
                println!(
                    "\n  {} Vulnerabilities confirmed.",
                    "FAIL:".red().bold()
                );
                std::process::exit(1);
            }
        }

        Commands::Probes => {
            print_banner();
            let engine = ProbeEngine::with_defaults();

            println!("  {}\n", "Probe Categories:".bold());
            for (category, description) in engine.list_modules() {
                println!(
                    "    {} {}",
                    format!("{:15}", category.as_str()).cyan().bold(),
                    description
                );
            }

            println!("\n  {}\n", "CSRF Suite (run order):".bold());
            for probe in CsrfProbe::SUITE {
                println!(
                    "    {} {}",
                    format!("{:22}", probe.name()).cyan(),
                    probe.description()
                );
            }
            println!();
        }
    }

    Ok(())
}
