use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use stoneage::{
    grid::TileKind,
    web::{self, WebServerConfig},
    Command, Controller, Scenario, ScenarioLoader,
};

#[derive(Debug, Parser)]
#[command(author, version, about = "Stone age settlement builder")]
struct Cli {
    /// Path to a scenario YAML file (built-in stone_age scenario when omitted)
    #[arg(long)]
    scenario: Option<PathBuf>,

    /// Override the scenario's map seed
    #[arg(long)]
    seed: Option<u64>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Mode,
}

#[derive(Debug, Subcommand)]
enum Mode {
    /// Apply actions in order, e.g. `gather-wood build-hut inspect:2,3`
    Play { actions: Vec<Command> },
    /// Print the generated map
    Map,
    /// Serve the browser UI
    Serve {
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
        #[arg(long, default_value_t = 8080)]
        port: u16,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut scenario = match &cli.scenario {
        Some(path) => ScenarioLoader::new(".").load(path)?,
        None => Scenario::default(),
    };
    if cli.seed.is_some() {
        scenario.seed = cli.seed;
    }

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&scenario.logging.level))
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Mode::Play { actions } => play(&scenario, actions),
        Mode::Map => {
            let controller = Controller::from_scenario(&scenario);
            let grid = controller.settlement().grid();
            print!("{grid}");
            for kind in [TileKind::Grass, TileKind::Forest, TileKind::Rock, TileKind::Water] {
                println!("{} {kind}: {}", kind.symbol(), grid.count(kind));
            }
            println!("seed: {}", controller.seed());
            Ok(())
        }
        Mode::Serve { host, port } => {
            let runtime = tokio::runtime::Runtime::new().context("failed to start tokio runtime")?;
            runtime.block_on(web::run(WebServerConfig {
                scenario,
                host,
                port,
            }))
        }
    }
}

fn play(scenario: &Scenario, actions: Vec<Command>) -> Result<()> {
    let mut controller = Controller::from_scenario(scenario);
    for command in actions {
        match controller.apply(command) {
            Ok(outcome) => println!("{command}: {outcome}"),
            Err(err) => println!("{command}: error: {err}"),
        }
    }

    let snapshot = controller.snapshot();
    println!(
        "[{}] wood {} | stone {} | food {} | population {}",
        snapshot.era,
        snapshot.resources.wood,
        snapshot.resources.stone,
        snapshot.resources.food,
        snapshot.population_display
    );
    Ok(())
}
