//! chronorule CLI: learn temporal logical rules from a knowledge graph.

use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use clap::{Parser, Subcommand};
use miette::{IntoDiagnostic, Result};

use chronorule::config::LearnConfig;
use chronorule::export::{load_rules, rules_file_stem, save_rules, save_rules_verbalized};
use chronorule::graph::Dataset;
use chronorule::learn::learn;
use chronorule::walk::TransitionDistr;

#[derive(Parser)]
#[command(name = "chronorule", version, about = "Temporal rule learning on knowledge graphs")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Learn rules from a dataset directory and write them to disk.
    Learn {
        /// Dataset directory containing train.txt.
        #[arg(long, short = 'd')]
        dataset: PathBuf,

        /// TOML file with learning parameters. Flags override it.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Rule body lengths to learn.
        #[arg(long, short = 'l', num_args = 1..)]
        rule_lengths: Option<Vec<usize>>,

        /// Walk attempts per relation and length.
        #[arg(long, short = 'n')]
        num_walks: Option<usize>,

        /// Next-edge distribution: "unif" or "exp".
        #[arg(long)]
        transition_distr: Option<TransitionDistr>,

        /// Number of parallel workers.
        #[arg(long, short = 'p')]
        num_workers: Option<usize>,

        /// Random seed.
        #[arg(long, short = 's')]
        seed: Option<u64>,

        /// Output directory for rule files (defaults to <dataset>/rules).
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
    },

    /// Print statistics of a saved rule file.
    Stats {
        /// Path to a rules JSON file.
        #[arg(long)]
        rules: PathBuf,
    },
}

fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(3)
                .build(),
        )
    }))
    .ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Learn {
            dataset,
            config,
            rule_lengths,
            num_walks,
            transition_distr,
            num_workers,
            seed,
            output,
        } => {
            let mut learn_config = match &config {
                Some(path) => LearnConfig::load(path)?,
                None => LearnConfig::default(),
            };
            if let Some(v) = rule_lengths {
                learn_config.rule_lengths = v;
            }
            if let Some(v) = num_walks {
                learn_config.num_walks = v;
            }
            if let Some(v) = transition_distr {
                learn_config.transition_distr = v;
            }
            if let Some(v) = num_workers {
                learn_config.num_workers = v;
            }
            if seed.is_some() {
                learn_config.seed = seed;
            }

            let data = Dataset::load(&dataset)?;
            let index = data.index();
            let report = learn(&index, &data.vocab.inverse, &learn_config)?;

            let run_tag = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .into_diagnostic()?
                .as_secs()
                .to_string();
            let out_dir = output.unwrap_or_else(|| dataset.join("rules"));
            let stem = rules_file_stem(&run_tag, &learn_config);
            let json_path = out_dir.join(format!("{stem}.json"));
            let txt_path = out_dir.join(format!("{stem}.txt"));
            save_rules(&report.store, &json_path)?;
            save_rules_verbalized(&report.store, &data.vocab, &txt_path)?;

            println!("Learning finished in {:.3} s", report.elapsed.as_secs_f64());
            println!(
                "Walks: {} attempted, {} closed; {} rule shapes estimated",
                report.stats.walk_attempts, report.stats.walk_successes, report.stats.estimations
            );
            println!("{}", report.store.statistics());
            println!("Rules written to {}", json_path.display());
            println!("              and {}", txt_path.display());
        }

        Commands::Stats { rules } => {
            let store = load_rules(&rules)?;
            println!("{}", store.statistics());
        }
    }

    Ok(())
}
