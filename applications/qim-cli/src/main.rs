//! Qim CLI - drive the playback engine from the terminal
use clap::{Parser, Subcommand};
use qim_cli::{run_simulation, CliConfig, SimulationPlan};
use qim_core::{JsonPreferenceStore, PreferenceStore, RepeatMode};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "qim-cli")]
#[command(about = "Qim Player playback engine harness", long_about = None)]
struct Cli {
    /// Configuration file path (defaults to ./qim.toml when present)
    #[arg(short, long, global = true, env = "QIM_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Play a simulated recitation queue to completion
    Simulate {
        /// Number of ayahs in the queue
        #[arg(short = 'n', long, default_value_t = 7)]
        items: usize,

        /// Surah the ayahs belong to
        #[arg(short, long, default_value_t = 1)]
        surah: u32,

        /// Index to start from
        #[arg(long, default_value_t = 0)]
        start: usize,

        /// Index whose address is resolved in the background (repeatable)
        #[arg(long)]
        unresolved: Vec<usize>,

        /// Index whose address always fails (repeatable)
        #[arg(long)]
        failing: Vec<usize>,

        /// Repeat mode: off, item (ayah) or all (surah)
        #[arg(long, value_parser = parse_repeat)]
        repeat: Option<RepeatMode>,

        /// Shuffle the automatic advance
        #[arg(long)]
        shuffle: bool,

        /// Simulated duration of each item in milliseconds
        #[arg(long)]
        item_ms: Option<u64>,
    },
    /// Print stored playback preferences as JSON
    Preferences {
        /// Preference document path (overrides the configured one)
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}

fn parse_repeat(value: &str) -> Result<RepeatMode, String> {
    RepeatMode::parse(value).ok_or_else(|| format!("unknown repeat mode '{value}'"))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "qim_cli=info,qim_playback=info,qim_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let mut config = CliConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Simulate {
            items,
            surah,
            start,
            unresolved,
            failing,
            repeat,
            shuffle,
            item_ms,
        } => {
            if let Some(item_ms) = item_ms {
                config.simulation.item_ms = item_ms;
            }
            config.validate()?;

            let plan = SimulationPlan {
                surah,
                items,
                start,
                unresolved: unresolved.into_iter().collect(),
                failing: failing.into_iter().collect(),
                repeat,
                shuffle: shuffle.then_some(true),
            };
            simulate(&config, &plan).await?;
        }
        Commands::Preferences { file } => {
            let path = file
                .or(config.preferences.file)
                .unwrap_or_else(|| PathBuf::from("qim-player.json"));
            let preferences = JsonPreferenceStore::new(&path).load()?;
            println!("{}", serde_json::to_string_pretty(&preferences)?);
        }
    }

    Ok(())
}

async fn simulate(config: &CliConfig, plan: &SimulationPlan) -> anyhow::Result<()> {
    tracing::info!("Simulating {} ayahs of surah {}", plan.items, plan.surah);

    let report = run_simulation(config, plan).await?;

    tracing::info!(
        finished = report.finished,
        started = report.started(),
        skipped = report.skipped(),
        final_state = ?report.status.state,
        final_index = report.status.current_index,
        "Simulation complete"
    );

    if !report.finished {
        anyhow::bail!("queue did not finish within {} ms", config.simulation.max_ms);
    }
    Ok(())
}
