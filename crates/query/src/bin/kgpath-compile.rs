//! kgpath-compile — compile a path template and print the resulting query.
//!
//! Never contacts a backend; useful for checking what a template turns into.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing::{info, warn};

use kgpath_core::config::{load_dotenv, Config};
use kgpath_core::QueryTemplate;
use kgpath_query::CachingCompiler;

// ── CLI ─────────────────────────────────────────────────────────────

/// Compile a JSON path template into pattern-query text.
#[derive(Parser, Debug)]
#[command(name = "kgpath-compile", version, about)]
struct Cli {
    /// Template file, or a directory containing query.json.
    template: PathBuf,

    /// Config profile (overrides KGPATH_PROFILE).
    #[arg(long, env = "KGPATH_PROFILE")]
    profile: Option<String>,
}

// ── main ────────────────────────────────────────────────────────────

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    load_dotenv();
    let cli = Cli::parse();

    let config = match &cli.profile {
        Some(profile) => Config::for_profile(profile),
        None => Config::from_env(),
    };
    config.log_summary();

    let parsed = QueryTemplate::load(&cli.template)
        .with_context(|| format!("loading template {}", cli.template.display()))?;
    if !parsed.ignored.is_empty() {
        warn!(count = parsed.ignored.len(), "template carried unrecognised fields");
    }

    let compiler = CachingCompiler::from_config(&config);
    let compiled = compiler
        .compile(&parsed.template)
        .context("compiling template")?;

    info!(
        nodes = compiled.node_count(),
        edges = compiled.edges().len(),
        "template compiled"
    );

    println!("{}", compiled.text());
    println!("fingerprint: {}", parsed.template.fingerprint());
    Ok(())
}
