//! CLI command definitions and handlers

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::info;

use pathrank::{
    load_config, load_config_file, GraphInput, GraphModel, KShortestPathRanker, NullScoreSampler,
    NullScoreTable, PathRankConfig, SamplingStrategy, ScopeEngine,
};

/// Parse and validate a probability in (0, 1]
fn parse_alpha(s: &str) -> Result<f64, String> {
    let a: f64 = s
        .parse()
        .map_err(|_| format!("'{}' is not a valid number", s))?;
    if a > 0.0 && a <= 1.0 {
        Ok(a)
    } else {
        Err("alpha must be in (0, 1]".to_string())
    }
}

/// pathrank - ranked and statistically scored paths in weighted networks
///
/// Graphs are JSON files: {"vertices": [...], "edges": {"from": [...],
/// "to": [...], "weight": [...], "label": [...]}} with 1-based indices and
/// reserved source "s" / sink "t" vertices.
#[derive(Parser, Debug)]
#[command(name = "pathrank")]
#[command(
    version,
    about = "K-shortest loopless paths and path significance for weighted networks",
    after_help = "\
Examples:
  pathrank rank graph.json -k 5                     Five best s -> t paths
  pathrank sample graph.json -o null.json          Sample null score table
  pathrank scope graph.json --table null.json      Significant sink predecessors
  pathrank scope graph.json --alpha 0.01 --echo    Random-edge null, narrated"
)]
pub struct Cli {
    /// Config file (default: pathrank.toml in the current directory, if any)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, default_value = "warn", value_parser = ["error", "warn", "info", "debug", "trace"])]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Rank the K best loopless source -> sink paths
    Rank {
        /// Graph JSON file
        graph: PathBuf,

        /// Number of paths to return
        #[arg(long, short = 'k')]
        k: Option<usize>,

        /// Only emit paths with more than this many interior vertices
        #[arg(long)]
        min_path_size: Option<usize>,

        /// Keep paths whose score is at most twice their first edge weight
        #[arg(long)]
        no_single_hop_guard: bool,

        /// Output file (default: stdout)
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
    },

    /// Sample null path-score distributions per path length
    Sample {
        /// Graph JSON file
        graph: PathBuf,

        /// Longest path length (edges) to sample
        #[arg(long)]
        max_length: Option<usize>,

        /// Samples per length
        #[arg(long)]
        samples: Option<usize>,

        /// Chain iterations per recorded sample
        #[arg(long)]
        warmup: Option<usize>,

        #[arg(long, value_enum)]
        strategy: Option<StrategyArg>,

        /// RNG seed
        #[arg(long)]
        seed: Option<u64>,

        /// Sample lengths in parallel
        #[arg(long)]
        parallel: bool,

        /// Output file (default: stdout)
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
    },

    /// Find sink predecessors with a significantly short path from the source
    Scope {
        /// Graph JSON file
        graph: PathBuf,

        /// Null score table from `pathrank sample` (default: random-edge sampling)
        #[arg(long)]
        table: Option<PathBuf>,

        /// Significance level
        #[arg(long, value_parser = parse_alpha)]
        alpha: Option<f64>,

        /// Narrate per-target progress
        #[arg(long)]
        echo: bool,

        /// RNG seed for the random-edge fallback
        #[arg(long)]
        seed: Option<u64>,

        /// Output file (default: stdout)
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum StrategyArg {
    Metropolis,
    RandomEdges,
}

impl From<StrategyArg> for SamplingStrategy {
    fn from(arg: StrategyArg) -> Self {
        match arg {
            StrategyArg::Metropolis => SamplingStrategy::Metropolis,
            StrategyArg::RandomEdges => SamplingStrategy::RandomEdges,
        }
    }
}

pub fn run(cli: Cli) -> Result<()> {
    let mut config = resolve_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Rank {
            graph,
            k,
            min_path_size,
            no_single_hop_guard,
            output,
        } => {
            if let Some(k) = k {
                config.ranker.k = k;
            }
            if let Some(min) = min_path_size {
                config.ranker.min_path_size = min;
            }
            if no_single_hop_guard {
                config.ranker.single_hop_guard = false;
            }

            let graph = read_graph(&graph)?;
            let reports = KShortestPathRanker::new(&graph, config.ranker)
                .rank_reports()
                .context("Ranking failed")?;
            info!("Ranked {} paths", reports.len());
            write_json(&reports, output.as_deref())
        }

        Commands::Sample {
            graph,
            max_length,
            samples,
            warmup,
            strategy,
            seed,
            parallel,
            output,
        } => {
            let sampler_config = &mut config.sampler;
            if let Some(max) = max_length {
                sampler_config.max_path_length = max;
            }
            if let Some(n) = samples {
                sampler_config.sample_count = n;
            }
            if let Some(w) = warmup {
                sampler_config.warmup_steps = w;
            }
            if let Some(s) = strategy {
                sampler_config.strategy = s.into();
            }
            if let Some(seed) = seed {
                sampler_config.seed = seed;
            }

            let graph = read_graph(&graph)?;
            let sampler = NullScoreSampler::new(&graph, config.sampler.clone());
            let table = if parallel {
                sampler.sample_par()
            } else {
                let mut rng = ChaCha8Rng::seed_from_u64(config.sampler.seed);
                sampler.sample(&mut rng)
            }
            .context("Sampling failed")?;
            write_json(&table, output.as_deref())
        }

        Commands::Scope {
            graph,
            table,
            alpha,
            echo,
            seed,
            output,
        } => {
            if let Some(alpha) = alpha {
                config.scope.alpha = alpha;
            }
            if echo {
                config.scope.echo = true;
            }

            let graph = read_graph(&graph)?;
            let table = table.as_deref().map(read_table).transpose()?;
            let mut rng = ChaCha8Rng::seed_from_u64(seed.unwrap_or(config.sampler.seed));
            let result = ScopeEngine::new(&graph, config.scope)
                .run_with(table.as_ref(), &mut rng)
                .context("Scope query failed")?;
            write_json(&result, output.as_deref())
        }
    }
}

fn resolve_config(path: Option<&Path>) -> Result<PathRankConfig> {
    match path {
        Some(path) => load_config_file(path)
            .with_context(|| format!("Failed to load config {}", path.display())),
        None => {
            let cwd = std::env::current_dir().context("Failed to read current directory")?;
            Ok(load_config(&cwd))
        }
    }
}

fn read_graph(path: &Path) -> Result<GraphModel> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read graph {}", path.display()))?;
    let input: GraphInput = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse graph {}", path.display()))?;
    let graph = GraphModel::from_input(&input)
        .with_context(|| format!("Invalid graph {}", path.display()))?;
    info!(
        "Loaded {} ({} vertices, {} edges)",
        path.display(),
        graph.vertex_count(),
        graph.edge_count()
    );
    Ok(graph)
}

fn read_table(path: &Path) -> Result<NullScoreTable> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read null table {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse null table {}", path.display()))
}

fn write_json<T: Serialize>(value: &T, output: Option<&Path>) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    match output {
        Some(path) => std::fs::write(path, json + "\n")
            .with_context(|| format!("Failed to write {}", path.display())),
        None => {
            println!("{}", json);
            Ok(())
        }
    }
}
