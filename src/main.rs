use clap::{Parser, Subcommand, ValueEnum};
use tracing::error;

use retire_drill::api::{ServerConfig, render_problem, run_http_server};
use retire_drill::core::{Difficulty, Timing, derive_seed};

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum CliDifficulty {
    Easy,
    Normal,
    Hard,
}

impl From<CliDifficulty> for Difficulty {
    fn from(value: CliDifficulty) -> Self {
        match value {
            CliDifficulty::Easy => Difficulty::Easy,
            CliDifficulty::Normal => Difficulty::Normal,
            CliDifficulty::Hard => Difficulty::Hard,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum CliTiming {
    End,
    Begin,
}

impl From<CliTiming> for Timing {
    fn from(value: CliTiming) -> Self {
        match value {
            CliTiming::End => Timing::End,
            CliTiming::Begin => Timing::Begin,
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "retire-drill",
    about = "Practice generator and grader for AM / CPM / PPPM retirement funding"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the JSON practice API.
    Serve {
        #[arg(long, default_value = "0.0.0.0")]
        host: String,
        #[arg(long, default_value_t = 8080)]
        port: u16,
        #[arg(long, default_value_t = 1024, help = "Sessions kept in memory")]
        max_sessions: usize,
    },
    /// Print one generated problem with its answers.
    Problem {
        #[arg(long, conflicts_with_all = ["base_seed", "index"])]
        seed: Option<u32>,
        #[arg(long, default_value_t = 42)]
        base_seed: u32,
        #[arg(long, default_value_t = 0)]
        index: u32,
        #[arg(long, value_enum, default_value_t = CliDifficulty::Normal)]
        difficulty: CliDifficulty,
        #[arg(long, value_enum, default_value_t = CliTiming::End)]
        timing: CliTiming,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt().with_target(true).init();

    let cli = Cli::parse();
    match cli.command {
        Command::Serve {
            host,
            port,
            max_sessions,
        } => {
            let config = match ServerConfig::new(&host, port, max_sessions) {
                Ok(config) => config,
                Err(e) => {
                    error!("{e}");
                    std::process::exit(2);
                }
            };
            if let Err(e) = run_http_server(config).await {
                error!("Server error: {e}");
                std::process::exit(1);
            }
        }
        Command::Problem {
            seed,
            base_seed,
            index,
            difficulty,
            timing,
        } => {
            let seed = seed.unwrap_or_else(|| derive_seed(base_seed, index));
            match render_problem(seed, difficulty.into(), timing.into()) {
                Ok(json) => println!("{json}"),
                Err(e) => {
                    error!("failed to render problem: {e}");
                    std::process::exit(1);
                }
            }
        }
    }
}
