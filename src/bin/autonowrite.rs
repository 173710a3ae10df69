// AutonoWrite CLI - generate articles with the planner/researcher/writer/critic pipeline

use anyhow::Context;
use autonowrite::config::AppConfig;
use autonowrite::execution::{self, ExecutionRecord, StoredResult};
use autonowrite::experiment::ExperimentRunner;
use autonowrite::generation::backend::{ProviderFactory, ProviderRegistry};
use autonowrite::generation::{GenerationRequest, Orchestrator, ProviderKind, ProviderSelector};
use autonowrite::output;
use autonowrite::request::{ContentRequest, WizardData};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use termimad::{MadSkin, crossterm::style::Color};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "autonowrite", version, about = "Multi-agent article generation")]
struct Cli {
    /// Config file (default: ~/.config/autonowrite/config.toml if present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Generate an article about a topic
    Generate {
        topic: String,
        #[command(flatten)]
        run: RunArgs,
    },
    /// Generate from a structured content request (JSON)
    Request {
        file: PathBuf,
        #[command(flatten)]
        run: RunArgs,
    },
    /// Compare iteration budgets over a set of topics
    Experiment {
        /// Topic to test, repeatable (defaults to a built-in set)
        #[arg(long = "topic")]
        topics: Vec<String>,

        /// Iteration budgets to compare
        #[arg(long, value_delimiter = ',', default_values_t = [1, 2, 3])]
        iterations: Vec<u32>,

        #[arg(long)]
        provider: Option<ProviderSelector>,

        /// Skip writing the JSON record and markdown report
        #[arg(long)]
        no_save: bool,
    },
    /// Show which providers are available
    Providers,
}

#[derive(Args)]
struct RunArgs {
    #[arg(long)]
    max_iterations: Option<u32>,

    /// Minimum critic score for approval (0-10)
    #[arg(long)]
    min_score: Option<f64>,

    /// auto, groq, ollama or simulation
    #[arg(long)]
    provider: Option<ProviderSelector>,

    /// Save the result as JSON
    #[arg(long)]
    save: bool,

    /// Render the article as markdown in the terminal
    #[arg(long)]
    show: bool,
}

const DEFAULT_TOPICS: [&str; 3] = [
    "The impact of large language models on software development",
    "Multi-agent systems for automated content generation",
    "Reducing hallucinations in language models with critique cycles",
];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("autonowrite=info")),
        )
        .init();

    let cli = Cli::parse();
    let mut config = AppConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;

    match cli.command {
        Command::Generate { topic, run } => {
            run.apply(&mut config);
            let request = config.generation.request(topic);
            generate(&config, request, &run).await
        }
        Command::Request { file, run } => {
            run.apply(&mut config);
            let content = ContentRequest::load(&file)
                .await
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let request = content.to_generation_request(&config.generation)?;
            generate(&config, request, &run).await
        }
        Command::Experiment {
            topics,
            iterations,
            provider,
            no_save,
        } => {
            if let Some(selector) = provider {
                config.provider.selector = selector;
            }
            experiment(&config, topics, &iterations, !no_save).await
        }
        Command::Providers => providers(&config).await,
    }
}

impl RunArgs {
    fn apply(&self, config: &mut AppConfig) {
        if let Some(max_iterations) = self.max_iterations {
            config.generation.max_iterations = max_iterations;
        }
        if let Some(min_score) = self.min_score {
            config.generation.min_quality_score = min_score;
        }
        if let Some(selector) = self.provider {
            config.provider.selector = selector;
        }
    }
}

async fn generate(config: &AppConfig, request: GenerationRequest, args: &RunArgs) -> anyhow::Result<()> {
    let backend = execution::connect_or_simulate(&config.provider).await;
    let mut orchestrator = Orchestrator::with_max_tokens(backend, config.generation.max_tokens);

    println!("AutonoWrite v{}", env!("CARGO_PKG_VERSION"));
    println!("Topic: {}", request.topic);
    println!(
        "Provider: {} ({}), up to {} iteration(s)\n",
        orchestrator.backend().provider_type(),
        orchestrator.backend().model_name(),
        request.max_iterations
    );

    let mut record = ExecutionRecord::new();
    let stored = execution::execute(&mut orchestrator, request, &mut record, WizardData::default().presentation()).await?;

    print_result(&stored, args.show);
    println!("Elapsed: {}", record.elapsed());

    if args.save {
        let path = output::save_json(&config.output.results_dir, "result", &stored).await?;
        println!("Saved: {}", path.display());
    }
    Ok(())
}

fn print_result(stored: &StoredResult, show: bool) {
    let result = &stored.generation;

    if show {
        create_markdown_skin().print_text(&result.final_content);
    } else {
        println!("{}", result.final_content);
    }

    println!("\n--------------------------------");
    for evaluation in &result.critic_history {
        let marker = if evaluation.degraded { " (critic failed)" } else { "" };
        println!("Iteration {}: {:.1}/10{}", evaluation.iteration, evaluation.score, marker);
    }
    println!(
        "Final score: {:.1}/10 | Iterations: {}/{} | LLM calls: {} | Time: {:.1}s",
        result.final_score,
        result.iterations_used,
        result.max_iterations,
        result.llm_calls,
        result.execution_time_seconds
    );
    println!("Status: {}", if result.approved { "APPROVED" } else { "NOT APPROVED" });
}

fn create_markdown_skin() -> MadSkin {
    let mut skin = MadSkin::default();
    skin.headers[0].set_fg(Color::Cyan);
    skin.headers[1].set_fg(Color::Blue);
    skin.headers[2].set_fg(Color::Green);
    skin.bold.set_fg(Color::White);
    skin.italic.set_fg(Color::Magenta);
    skin
}

async fn experiment(config: &AppConfig, topics: Vec<String>, budgets: &[u32], save: bool) -> anyhow::Result<()> {
    let topics = if topics.is_empty() {
        DEFAULT_TOPICS.iter().map(|t| t.to_string()).collect()
    } else {
        topics
    };

    let backend = execution::connect_or_simulate(&config.provider).await;
    println!(
        "Experiment: {} topic(s) x budgets {:?} on {} ({})\n",
        topics.len(),
        budgets,
        backend.provider_type(),
        backend.model_name()
    );

    let runner = ExperimentRunner::new(backend)
        .with_min_quality_score(config.generation.min_quality_score)
        .with_max_tokens(config.generation.max_tokens);
    let experiment = runner.run(&topics, budgets).await?;

    for run in &experiment.configurations {
        let stats = &run.statistics;
        println!(
            "{} iteration(s): avg score {:.2} | avg time {:.1}s | approval {:.0}% | calls {}",
            run.max_iterations,
            stats.avg_score,
            stats.avg_time,
            stats.approval_rate * 100.0,
            stats.total_llm_calls
        );
    }

    let summary = &experiment.summary;
    println!("\nBest quality: {} iteration(s)", summary.best_quality_config.iterations);
    println!("Fastest: {} iteration(s)", summary.fastest_config.iterations);
    println!("Quality improvement: {}%", summary.quality_improvement_percent);
    for recommendation in &summary.recommendations {
        println!("  - {}", recommendation);
    }

    if save {
        let (json, report) = experiment.save(&config.output).await?;
        println!("\nSaved: {}", json.display());
        println!("Report: {}", report.display());
    }
    Ok(())
}

async fn providers(config: &AppConfig) -> anyhow::Result<()> {
    let registry = ProviderRegistry::with_defaults();
    let mut first_available = None;

    println!("Providers (auto priority order):");
    for kind in registry.kinds() {
        let Some(factory) = registry.get(kind) else {
            continue;
        };
        let available = factory.is_available(&config.provider).await;
        if available && first_available.is_none() {
            first_available = Some(kind);
        }
        println!(
            "  {:<11} {:<13} {}",
            kind.as_str(),
            if available { "available" } else { "unavailable" },
            kind.description()
        );
    }

    println!("\nConfigured selector: {}", config.provider.selector);
    if let Some(kind) = config.provider.env_override {
        println!("LLM_PROVIDER override: {}", kind);
    }

    let resolved = match config.provider.selector {
        ProviderSelector::Explicit(kind) => kind,
        ProviderSelector::Auto => config
            .provider
            .env_override
            .or(first_available)
            .unwrap_or(ProviderKind::Simulation),
    };
    println!("Would use: {}", resolved);
    Ok(())
}
