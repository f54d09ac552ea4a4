use anyhow::{Context, Result};
use clap::Parser;
use provena_node::ledger::HttpLedger;
use provena_node::verifier::{Verifier, VerifyConfig};
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the candidate file (e.g. recording-<session>.webm)
    candidate: PathBuf,

    /// Session identifier; extracted from the filename when omitted
    #[arg(long)]
    session_id: Option<String>,

    /// Base URL of the ledger service
    #[arg(long)]
    ledger_url: String,

    /// Verification window size in bytes
    #[arg(long)]
    window_size: Option<usize>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    eprintln!("provena verifier v0.1.0");

    // 1. Load the candidate
    let candidate = fs::read(&args.candidate).context("Failed to read candidate file")?;
    let filename = args
        .candidate
        .file_name()
        .and_then(|n| n.to_str())
        .map(str::to_string);

    // 2. Configure
    let mut config = VerifyConfig::default();
    if let Some(size) = args.window_size {
        config.window_size = size;
    }
    eprintln!("Window size: {} bytes", config.window_size);

    // 3. Verify against the ledger
    let verifier = Verifier::new(Arc::new(HttpLedger::new(args.ledger_url)), config);
    let report = verifier
        .verify(&candidate, args.session_id.as_deref(), filename.as_deref())
        .await
        .map_err(|e| anyhow::anyhow!("verification failed: {e}"))?;

    // 4. Output JSON
    let json = serde_json::to_string_pretty(&report)?;
    println!("{}", json);

    Ok(())
}
