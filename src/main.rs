use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use ghg_risk::application::risk::RiskAnalysisService;
use ghg_risk::config::SimulationConfig;
use ghg_risk::domain::correlation::CategoryCorrelationMatrix;
use ghg_risk::domain::errors::CategoryKind;
use ghg_risk::domain::portfolio::YearlyPortfolio;
use ghg_risk::infrastructure::observability::Metrics;
use ghg_risk::infrastructure::persistence::{
    CorrelationCsvLoader, PortfolioCsvLoader, ResultsExporter, ResultsSummary,
};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser)]
#[command(author, version, about = "GHG portfolio delivery-risk simulation", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct Inputs {
    /// Wide portfolio CSV, one row per project
    #[arg(short, long)]
    portfolio: PathBuf,

    /// Technology correlation CSV
    #[arg(short, long)]
    technology: PathBuf,

    /// Country correlation CSV
    #[arg(short, long)]
    country: PathBuf,

    /// TOML configuration file (defaults to GHG_* environment variables)
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Simulate yearly portfolio delivery and export the results
    Run {
        #[command(flatten)]
        inputs: Inputs,

        /// Monte Carlo samples per year
        #[arg(short, long)]
        samples: Option<usize>,

        /// Base seed for reproducible runs
        #[arg(long)]
        seed: Option<u64>,

        #[arg(short, long, default_value = "output")]
        output_dir: PathBuf,

        /// Write Prometheus metrics to this file after the run
        #[arg(long)]
        metrics_out: Option<PathBuf>,

        /// Simulate years one after another instead of on the thread pool
        #[arg(long)]
        sequential: bool,
    },
    /// Build the project correlation matrix only
    Matrix {
        #[command(flatten)]
        inputs: Inputs,

        #[arg(short, long, default_value = "project_correlation_matrix.csv")]
        output: PathBuf,
    },
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<SimulationConfig> {
    match path {
        Some(path) => SimulationConfig::from_toml_file(path),
        None => SimulationConfig::from_env(),
    }
}

type LoadedInputs = (
    YearlyPortfolio,
    CategoryCorrelationMatrix,
    CategoryCorrelationMatrix,
);

fn load_inputs(inputs: &Inputs) -> anyhow::Result<LoadedInputs> {
    let portfolio = PortfolioCsvLoader::load(&inputs.portfolio)?;
    let technology = CorrelationCsvLoader::load(CategoryKind::Technology, &inputs.technology)?;
    let country = CorrelationCsvLoader::load(CategoryKind::Country, &inputs.country)?;
    Ok((portfolio, technology, country))
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let subscriber = tracing_subscriber::FmtSubscriber::builder()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .finish();
    tracing::subscriber::set_global_default(subscriber).ok();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            inputs,
            samples,
            seed,
            output_dir,
            metrics_out,
            sequential,
        } => {
            let mut config = load_config(inputs.config.as_ref())?;
            if let Some(samples) = samples {
                config.sample_count = samples;
            }
            if seed.is_some() {
                config.seed = seed;
            }
            if sequential {
                config.parallel = false;
            }
            config.validate()?;

            let (portfolio, technology, country) = load_inputs(&inputs)?;
            let metrics = Metrics::new()?;
            let service = RiskAnalysisService::new(config).with_metrics(metrics.clone());
            let analysis = service.run(&portfolio, &technology, &country)?;

            let summary = ResultsSummary::from_results(&analysis.results);
            info!(
                "Total offered volume {:.2}, total portfolio delivery {:.2}, average delivery rate {}",
                summary.total_offered_volume,
                summary.total_portfolio_delivery,
                summary
                    .average_delivery_rate
                    .map(|rate| format!("{:.4}", rate))
                    .unwrap_or_else(|| "n/a".to_string())
            );

            let dir = ResultsExporter::new(output_dir).export(&analysis)?;
            info!("Results written to {:?} (seed {})", dir, analysis.seed);

            if let Some(path) = metrics_out {
                std::fs::write(&path, metrics.render())
                    .with_context(|| format!("Failed to write metrics to {:?}", path))?;
                info!("Metrics written to {:?}", path);
            }
        }
        Commands::Matrix { inputs, output } => {
            let config = load_config(inputs.config.as_ref())?;
            let (portfolio, technology, country) = load_inputs(&inputs)?;
            let correlation = RiskAnalysisService::new(config).build_correlation(
                &portfolio,
                &technology,
                &country,
            )?;

            let report = correlation.repair_report();
            info!(
                "Repair applied: {}, min eigenvalue {:.3e}, clipped eigenvalues {}, max adjustment {:.3e}",
                report.repaired,
                report.min_eigenvalue,
                report.clipped_eigenvalues,
                report.max_adjustment
            );

            ResultsExporter::write_correlation_csv(&output, &correlation)?;
            info!("Project correlation matrix written to {:?}", output);
        }
    }

    Ok(())
}
