use anyhow::Result;
use clap::{CommandFactory, Parser};
use query_risk::cli::{Cli, Commands};
use query_risk::{config, openapi, report, server};

fn main() -> Result<()> {
    let cli = Cli::parse();
    if cli.print_openapi {
        println!("{}", serde_json::to_string_pretty(&openapi::openapi_json())?);
        return Ok(());
    }

    // Logs go to stderr so `report` output on stdout stays machine-readable.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = config::EngineConfig::from_env()?;
    match cli.command {
        Some(Commands::Report(args)) => {
            let report = report::run_report(&args, &config)?;
            println!("{}", report::render_report(&report, args.pretty)?);
            Ok(())
        }
        Some(Commands::Serve(args)) => {
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()?;
            runtime.block_on(server::serve(args, config))
        }
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    }
}
