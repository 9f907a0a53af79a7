use clap::Parser;
use eyre::Result;
use tracing_subscriber::EnvFilter;

use converge_cli::cli::{Cli, Commands, ConfigCommands, LogFormat};
use converge_cli::{commands, config, output};

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    init_tracing(cli.log_format);
    run(cli).await
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match format {
        LogFormat::Text => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init(),
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init(),
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config_path = match &cli.config {
        Some(path) => path.clone(),
        None => config::config_path()?,
    };
    let mut cfg = config::load_or_default(&config_path)?;
    if let Some(state) = &cli.state {
        cfg.state_path = state.clone();
    }
    let format = cli.output;

    match &cli.command {
        Commands::Plan(args) => {
            let reports = commands::plan(&cfg, &args.manifest, commands::cancel_on_ctrl_c()).await?;
            print!("{}", output::render_plan(&reports, format)?);
        }
        Commands::Apply(args) => {
            let report = commands::apply(&cfg, args, commands::cancel_on_ctrl_c()).await?;
            print!("{}", output::render_apply(&report, format)?);
            if !report.is_success() {
                eyre::bail!(
                    "apply did not converge: {} failed, {} skipped",
                    report.failed(),
                    report.skipped()
                );
            }
        }
        Commands::Destroy(args) => {
            let entries = commands::destroy(&cfg, args, commands::cancel_on_ctrl_c()).await?;
            print!("{}", output::render_teardown(&entries, format)?);
            let failed = entries
                .iter()
                .filter(|e| matches!(e.outcome, converge_reconciler::TeardownOutcome::Failed(_)))
                .count();
            if failed > 0 {
                eyre::bail!("destroy stopped after a failed delete");
            }
        }
        Commands::Status => {
            let resources = commands::status(&cfg).await?;
            print!("{}", output::render_status(&resources, format)?);
        }
        Commands::Config(args) => match &args.command {
            ConfigCommands::Show => {
                println!("{}", output::to_json(&cfg)?);
            }
            ConfigCommands::Init => {
                if config_path.exists() {
                    println!("config already exists at {}", config_path.display());
                } else {
                    config::save_config(&config_path, &cfg)?;
                    println!("wrote {}", config_path.display());
                }
            }
        },
    }

    Ok(())
}
