use anyhow::Result;
use clap::{Parser, Subcommand};
use rxbench_runner::{HarnessConfig, RunOptions};
use serde_json::{json, Value};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "rxbench",
    version,
    about = "raxml-ng tip-inner / site-repeats / SIMD benchmark sweep"
)]
struct Cli {
    /// Rebuild raxml-ng (cloning it first if needed) before the sweep
    #[arg(long)]
    build_raxml: bool,
    /// Rebuild dks (cloning it first if needed) before the sweep
    #[arg(long)]
    build_dks: bool,
    /// Harness config; defaults to ./rxbench.yaml when present
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(short, long)]
    verbose: bool,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the stored report without running anything
    Report {
        #[arg(long)]
        results: Option<PathBuf>,
        #[arg(long)]
        json: bool,
    },
    /// Compare avx2 + site-repeats against the fastest configuration
    Ratios {
        #[arg(long)]
        results: Option<PathBuf>,
        #[arg(long)]
        json: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let json_mode = command_json_mode(cli.command.as_ref());
    match run_command(cli) {
        Ok(Some(payload)) => {
            emit_json(&payload);
            Ok(())
        }
        Ok(None) => Ok(()),
        Err(err) => {
            if json_mode {
                emit_json(&json_error("command_failed", format!("{:#}", err)));
                std::process::exit(1);
            }
            Err(err)
        }
    }
}

fn run_command(cli: Cli) -> Result<Option<Value>> {
    let config = HarnessConfig::load(cli.config.as_deref())?;
    tracing::debug!(?config, "loaded harness config");
    match cli.command {
        None => {
            let options = RunOptions {
                build_raxml: cli.build_raxml,
                build_dks: cli.build_dks,
            };
            let result = rxbench_runner::run_harness(&config, options)?;
            println!("cells_run: {}", result.stats.cells_run);
            println!("cells_failed: {}", result.stats.cells_failed);
            println!("cells_skipped: {}", result.stats.cells_skipped);
            println!("datasets_skipped: {}", result.stats.datasets_skipped);
            println!("results: {}", result.blob_path.display());
            println!("report: {}", result.report_path.display());
        }
        Some(Commands::Report { results, json }) => {
            let path = results.unwrap_or_else(|| config.results_blob_path());
            let results = rxbench_runner::load_results(&path)?;
            if json {
                return Ok(Some(json!({
                    "ok": true,
                    "command": "report",
                    "results": serde_json::to_value(&results)?,
                })));
            }
            print!("{}", rxbench_runner::render_table(&results));
        }
        Some(Commands::Ratios { results, json }) => {
            let path = results.unwrap_or_else(|| config.results_blob_path());
            let results = rxbench_runner::load_results(&path)?;
            let ratios = rxbench_runner::site_repeat_ratios(&results);
            if json {
                return Ok(Some(json!({
                    "ok": true,
                    "command": "ratios",
                    "ratios": serde_json::to_value(&ratios)?,
                })));
            }
            for r in &ratios {
                println!("{}\t{}", r.dataset, r.ratio);
            }
            let all: Vec<String> = ratios.iter().map(|r| r.ratio.to_string()).collect();
            println!("[{}]", all.join(", "));
        }
    }
    Ok(None)
}

fn emit_json(value: &Value) {
    match serde_json::to_string(value) {
        Ok(s) => println!("{}", s),
        Err(_) => println!(
            "{{\"ok\":false,\"error\":{{\"code\":\"serialization_error\",\"message\":\"failed to serialize JSON payload\"}}}}"
        ),
    }
}

fn json_error(code: &str, message: String) -> Value {
    json!({
        "ok": false,
        "error": {
            "code": code,
            "message": message,
        }
    })
}

fn command_json_mode(command: Option<&Commands>) -> bool {
    match command {
        Some(Commands::Report { json, .. }) | Some(Commands::Ratios { json, .. }) => *json,
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_invocation_runs_the_sweep_with_build_flags() {
        let cli = Cli::try_parse_from(["rxbench", "--build-raxml"]).expect("parse");
        assert!(cli.build_raxml);
        assert!(!cli.build_dks);
        assert!(cli.command.is_none());
        assert!(!command_json_mode(cli.command.as_ref()));
    }

    #[test]
    fn ratios_subcommand_accepts_json_flag() {
        let cli = Cli::try_parse_from(["rxbench", "ratios", "--json", "--results", "r.json"])
            .expect("parse");
        match cli.command.as_ref() {
            Some(Commands::Ratios { results, json }) => {
                assert!(*json);
                assert_eq!(results.as_deref(), Some(std::path::Path::new("r.json")));
            }
            _ => panic!("expected ratios"),
        }
        assert!(command_json_mode(cli.command.as_ref()));
    }

    #[test]
    fn unknown_flags_are_rejected() {
        assert!(Cli::try_parse_from(["rxbench", "--simd", "avx"]).is_err());
    }
}
