use anyhow::{Context, Result};
use clap::Parser;
use crashpool_simulator::{Config, Simulation};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser, Debug)]
#[command(author, version, about = "Simulate crashpool rounds against seeded players.", long_about = None)]
struct Args {
    /// Path to the YAML configuration file.
    #[arg(long)]
    config: PathBuf,

    /// Override the configured seed.
    #[arg(long)]
    seed: Option<u64>,
}

fn init_tracing(level: tracing::Level, json: bool) {
    let builder = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Load from config file
    let raw = std::fs::read_to_string(&args.config)
        .with_context(|| format!("could not read config file {}", args.config.display()))?;
    let mut config: Config = serde_yaml::from_str(&raw).context("could not parse config file")?;
    if let Some(seed) = args.seed {
        config.seed = seed;
    }
    let config = config.validate().context("invalid config")?;

    init_tracing(config.log_level, config.json_logs);
    info!(
        seed = config.seed,
        rounds = config.rounds,
        bettors = config.bettors,
        depositors = config.depositors,
        loot_table = config.loot_table.name(),
        "starting simulation"
    );

    let summary = Simulation::new(config)?.run()?;
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_args() {
        let args = Args::parse_from(["crashpool-sim", "--config", "sim.yaml", "--seed", "7"]);
        assert_eq!(args.config, PathBuf::from("sim.yaml"));
        assert_eq!(args.seed, Some(7));
    }

    #[test]
    fn test_config_required() {
        assert!(Args::try_parse_from(["crashpool-sim"]).is_err());
    }
}
