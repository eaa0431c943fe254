use std::fs;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Parser;

use plan_advisor::config::Config;
use plan_advisor::core::Digest128;
use plan_advisor::query::fingerprint::{scan_literals, QueryFingerprinter};
use plan_advisor::query::statement::QuerySource;
use plan_advisor::services::{CompletedExecution, FeedbackOrchestrator};
use plan_advisor::storage::{HintRepository, RedbHintRepository};
use plan_advisor::utils::logging;

#[derive(Parser)]
#[clap(version = "0.1.0", author = "Plan Advisor Contributors")]
enum Cli {
    /// Feed one completed execution (JSON) into the feedback loop
    Feedback {
        #[clap(short, long, default_value = "config.toml")]
        config: String,
        #[clap(short, long)]
        input: String,
    },
    /// Print the normalized text and fingerprint of a query
    Fingerprint {
        #[clap(short, long)]
        query: String,
    },
    /// Show the active row hints for a normalized query and client
    Hints {
        #[clap(short, long, default_value = "config.toml")]
        config: String,
        #[clap(short, long)]
        query: String,
        #[clap(long, default_value = "")]
        client: String,
    },
    /// List recorded plan history
    History {
        #[clap(short, long, default_value = "config.toml")]
        config: String,
        #[clap(short, long)]
        fingerprint: Option<String>,
    },
}

fn open_orchestrator(config_path: &str) -> Result<(Config, FeedbackOrchestrator)> {
    let config = Config::load_or_default(config_path)
        .with_context(|| format!("failed to load config {}", config_path))?;
    logging::init(&config.log, false)?;

    let repository = RedbHintRepository::open(&config.storage.path)
        .with_context(|| format!("failed to open repository {}", config.storage.path))?;
    let orchestrator = FeedbackOrchestrator::new(Arc::new(repository), config.feedback.clone());
    Ok((config, orchestrator))
}

fn run(cli: Cli) -> Result<()> {
    match cli {
        Cli::Feedback { config, input } => {
            let (config, orchestrator) = open_orchestrator(&config)?;
            let content = fs::read_to_string(&input)
                .with_context(|| format!("failed to read {}", input))?;
            let execution: CompletedExecution = serde_json::from_str(&content)
                .with_context(|| format!("invalid execution JSON in {}", input))?;

            match orchestrator.process(&execution)? {
                Some(report) => {
                    if !config.feedback.quiet {
                        print!("{}", report.render());
                    }
                    if !report.is_fully_persisted() {
                        bail!(
                            "{} persistence step(s) failed",
                            report.persistence_failures.len()
                        );
                    }
                }
                None => println!("skipped: execution does not qualify for feedback"),
            }
        }
        Cli::Fingerprint { query } => {
            let source = QuerySource::new(&query, scan_literals(&query));
            match QueryFingerprinter::new().fingerprint(&source) {
                Some(fp) => {
                    println!("normalized: {}", fp.normalized);
                    println!("hash:       {}", fp.hash_hex());
                    println!("query id:   {}", fp.query_id);
                }
                None => println!("no fingerprint"),
            }
        }
        Cli::Hints {
            config,
            query,
            client,
        } => {
            let (_, orchestrator) = open_orchestrator(&config)?;
            match orchestrator.active_hints_for(&query, &client)? {
                Some(hints) => println!("{}", hints),
                None => println!("no active hints"),
            }
        }
        Cli::History {
            config,
            fingerprint,
        } => {
            if let Some(hex) = &fingerprint {
                if Digest128::from_hex(hex).is_none() {
                    bail!("invalid fingerprint: {}", hex);
                }
            }
            let (_, orchestrator) = open_orchestrator(&config)?;
            let repository: &dyn HintRepository = orchestrator.repository().as_ref();
            for record in repository.history_for(fingerprint.as_deref())? {
                println!(
                    "#{} {} query_id={} plan_id={} time={:.3}ms joins={} diff={:.0} app={}",
                    record.id,
                    record.norm_query_hash,
                    record.query_id,
                    record.plan_id,
                    record.execution_time_ms,
                    record.join_count,
                    record.diff_of_joins,
                    record.application_name
                );
                if !record.rows_hint.is_empty() {
                    println!("    {}", record.rows_hint.replace('\n', "\n    "));
                }
            }
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let result = run(cli);
    logging::shutdown();
    result
}
