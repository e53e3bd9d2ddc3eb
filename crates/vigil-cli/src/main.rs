use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use serde_json::Value;
use tracing_subscriber::EnvFilter;

use vigil_core::{Artifact, Outcome, TrailFilter};
use vigil_gates::PipelineOptions;
use vigil_runner::Runner;
use vigil_trail::TrailStore;

#[derive(Parser)]
#[command(name = "vigil", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Initialize vigil in the current directory (creates .vigil/, config, db)
    Init,

    /// Run an artifact through the full gate pipeline
    Validate {
        /// File whose contents become the artifact body
        #[arg(long)]
        file: PathBuf,
        #[arg(long, default_value = "doc")]
        kind: String,
        #[arg(long)]
        intent: Option<String>,
        #[arg(long)]
        source: Option<String>,
        #[arg(long)]
        author: Option<String>,
        /// Override the configured coherence threshold
        #[arg(long)]
        threshold: Option<f64>,
        /// Gate names to skip (repeatable)
        #[arg(long)]
        skip: Vec<String>,
        /// Extra context entries as key=json (repeatable)
        #[arg(long)]
        ctx: Vec<String>,
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Run a single gate standalone, for diagnostics
    Gate {
        name: String,
        #[arg(long)]
        file: PathBuf,
        #[arg(long, default_value = "doc")]
        kind: String,
        #[arg(long)]
        intent: Option<String>,
        #[arg(long)]
        source: Option<String>,
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Query the audit trail
    Query {
        #[arg(long)]
        kind: Option<String>,
        #[arg(long)]
        outcome: Option<String>,
        #[arg(long)]
        after: Option<i64>,
        #[arg(long)]
        before: Option<i64>,
        #[arg(long)]
        text: Option<String>,
        #[arg(long, default_value_t = false)]
        newest_first: bool,
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Show one trail entry by id
    Show { id: String },

    /// Mark a trail entry as verified (prerequisite for archival)
    Verify {
        id: String,
        #[arg(long)]
        by: Option<String>,
    },

    /// Run the lifecycle sweep: refresh freshness levels and archive
    /// verified bedrock-eligible entries
    Sweep {
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Summarize the trail and archive
    Status,
}

fn parse_outcome(s: &str) -> Result<Outcome> {
    match s {
        "pass" => Ok(Outcome::Pass),
        "fail" => Ok(Outcome::Fail),
        "info" => Ok(Outcome::Info),
        other => Err(anyhow!("unknown outcome '{other}' (pass|fail|info)")),
    }
}

fn parse_ctx(pairs: &[String]) -> Result<BTreeMap<String, Value>> {
    let mut out = BTreeMap::new();
    for pair in pairs {
        let (key, raw) = pair
            .split_once('=')
            .ok_or_else(|| anyhow!("context entry '{pair}' is not key=value"))?;
        let value = serde_json::from_str(raw).unwrap_or(Value::String(raw.to_string()));
        out.insert(key.to_string(), value);
    }
    Ok(out)
}

fn load_artifact(
    file: &PathBuf,
    kind: &str,
    intent: Option<String>,
    source: Option<String>,
    author: Option<String>,
) -> Result<Artifact> {
    let content =
        std::fs::read_to_string(file).with_context(|| format!("read {}", file.display()))?;
    let mut artifact = Artifact::new(kind, content);
    artifact.source = source;
    artifact.author = author;
    if let Some(intent) = intent {
        artifact
            .metadata
            .insert("intent".into(), Value::String(intent));
    }
    Ok(artifact)
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let root = std::env::current_dir()?;

    match cli.cmd {
        Command::Init => {
            Runner::init_root(&root)?;
            println!("Initialized vigil in {}", root.display());
        }
        Command::Validate {
            file,
            kind,
            intent,
            source,
            author,
            threshold,
            skip,
            ctx,
            json,
        } => {
            let r = Runner::open(root)?;
            let artifact = load_artifact(&file, &kind, intent, source, author)?;
            let mut opts = r.options();
            if let Some(t) = threshold {
                opts.threshold = t;
            }
            opts.skip = skip;
            opts.context.extend(parse_ctx(&ctx)?);

            let result = r.validate(&artifact, &opts)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                for g in &result.gates {
                    println!(
                        "{} {} - {}",
                        if g.passed { "PASS" } else { "FAIL" },
                        g.gate,
                        g.reasoning
                    );
                }
                match &result.failed_at {
                    Some(gate) => println!("Rejected at {gate}"),
                    None => println!("Approved"),
                }
                println!("Trail entries: {}", result.trail_refs.join(", "));
            }
            if !result.overall_passed {
                std::process::exit(1);
            }
        }
        Command::Gate {
            name,
            file,
            kind,
            intent,
            source,
            json,
        } => {
            let r = Runner::open(root)?;
            let artifact = load_artifact(&file, &kind, intent, source, None)?;
            let result = r.validate_gate(&name, &artifact, &r.options())?;
            if json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                println!(
                    "{} {} - {}",
                    if result.passed { "PASS" } else { "FAIL" },
                    result.gate,
                    result.reasoning
                );
                for e in &result.evidence {
                    println!("  [{:?}] {}: {}", e.severity, e.kind, e.description);
                }
            }
        }
        Command::Query {
            kind,
            outcome,
            after,
            before,
            text,
            newest_first,
            json,
        } => {
            let r = Runner::open(root)?;
            let filter = TrailFilter {
                kind,
                outcome: outcome.as_deref().map(parse_outcome).transpose()?,
                created_after_unix: after,
                created_before_unix: before,
                text,
                newest_first,
            };
            let entries = r.query(&filter)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&entries)?);
            } else {
                for e in &entries {
                    println!(
                        "{} [{}] {} ({})",
                        e.id,
                        e.outcome.as_str(),
                        e.description,
                        e.freshness.as_str()
                    );
                }
                println!("{} entries", entries.len());
            }
        }
        Command::Show { id } => {
            let r = Runner::open(root)?;
            match r.show(&id)? {
                Some(e) => println!("{}", serde_json::to_string_pretty(&e)?),
                None => {
                    eprintln!("no entry {id}");
                    std::process::exit(1);
                }
            }
        }
        Command::Verify { id, by } => {
            let r = Runner::open(root)?;
            let out = r.verify_entry(&id, by.as_deref())?;
            if out.already_verified {
                println!("{id} already verified");
            } else if out.warned_fresh {
                println!("{id} verified (younger than 30 days; double-check)");
            } else {
                println!("{id} verified");
            }
        }
        Command::Sweep { json } => {
            let r = Runner::open(root)?;
            let report = r.sweep()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!(
                    "examined {}, freshness updates {}, archived {}, awaiting verification {}",
                    report.examined,
                    report.freshness_updates,
                    report.archived.len(),
                    report.needs_verification.len()
                );
                for id in &report.needs_verification {
                    println!("needs verification: {id}");
                }
            }
        }
        Command::Status => {
            let r = Runner::open(root)?;
            let entries = r.query(&TrailFilter::default())?;
            let fails = entries
                .iter()
                .filter(|e| e.outcome == Outcome::Fail)
                .count();
            let verified = entries.iter().filter(|e| e.verified).count();
            let archived = r.store.archived_entries()?.len();
            println!("Trail entries: {}", entries.len());
            println!("  failures: {fails}");
            println!("  verified: {verified}");
            println!("Bedrock archive: {archived}");
        }
    }

    Ok(())
}
