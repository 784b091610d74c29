use clap::{Parser, Subcommand};
use std::io::BufRead;
use std::path::PathBuf;
use tracing::error;

use vigil::{initialize, VigilConfig, VigilError};
use vigil_core::Timestamp;
use vigil_engine::{HeartbeatSignals, SessionBinding, ThreatScoringEngine};

/// Vigil: continuous session trust monitor.
#[derive(Parser, Debug)]
#[command(name = "vigil", version, about, long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Write a default configuration file
    Init,

    /// Load and validate the configuration, then print the effective values
    Check,

    /// Score heartbeat signal JSON read line-by-line from stdin
    Score,
}

fn init_tracing(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = if verbose {
        EnvFilter::new("vigil=debug,vigil_session=debug,vigil_engine=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("vigil=info"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn config_path(cli: &Cli) -> PathBuf {
    cli.config
        .clone()
        .unwrap_or_else(VigilConfig::default_config_path)
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(cli) {
        error!("{}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), VigilError> {
    let path = config_path(&cli);
    match cli.command {
        Commands::Init => cmd_init(&path),
        Commands::Check => cmd_check(&path),
        Commands::Score => cmd_score(&path),
    }
}

fn cmd_init(path: &PathBuf) -> Result<(), VigilError> {
    if path.exists() {
        return Err(VigilError::Config(format!(
            "config already exists at {}",
            path.display()
        )));
    }
    let config = VigilConfig::default();
    config.save(path)?;
    println!("Wrote default configuration to {}", path.display());
    println!("Set `sealing_secret` before any enrollment is stored.");
    Ok(())
}

fn cmd_check(path: &PathBuf) -> Result<(), VigilError> {
    let config = VigilConfig::load(path)?;
    config.validate()?;

    // Exercise the full wiring, not just the TOML parse.
    let state = initialize(config)?;

    println!("Configuration OK ({})", path.display());
    println!("  logout_score:        {}", state.config.thresholds.logout_score);
    println!("  lock_score:          {}", state.config.thresholds.lock_score);
    println!("  monitoring_score:    {}", state.config.thresholds.monitoring_score);
    println!("  face_match_distance: {}", state.config.thresholds.face_match_distance);
    println!("  liveness_confidence: {}", state.config.thresholds.liveness_confidence);
    println!("  no_face_lock_streak: {}", state.config.monitor.no_face_lock_streak);
    println!("  captcha attempts:    {} per {}s", state.config.monitor.max_captcha_attempts, state.config.monitor.failure_window_seconds);
    Ok(())
}

/// One-shot scoring utility: each stdin line is a `HeartbeatSignals` JSON
/// object, evaluated against an unbound session. Useful for replaying
/// captured behavioral data through the rule set.
fn cmd_score(path: &PathBuf) -> Result<(), VigilError> {
    let config = VigilConfig::load(path)?;
    config.validate()?;
    let engine = ThreatScoringEngine::new(config.thresholds);

    let binding = SessionBinding {
        device_fingerprint: None,
        ip_address: None,
        browser_signature: None,
        created_at: Timestamp::now(),
        stored_vector: None,
    };

    let stdin = std::io::stdin();
    for line in stdin.lock().lines() {
        let line = line.map_err(VigilError::Io)?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match serde_json::from_str::<HeartbeatSignals>(line) {
            Ok(signals) => {
                let assessment = engine.evaluate(&binding, &signals, 0.0);
                println!("{}", serde_json::to_string(&assessment)?);
            }
            Err(e) => {
                eprintln!("skipping malformed line: {}", e);
            }
        }
    }
    Ok(())
}
