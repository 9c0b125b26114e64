use clap::Parser;
use sales_etl::config::cli::{Cli, Command};
use sales_etl::core::writer::BatchWriter;
use sales_etl::utils::{logger, validation::Validate};
use sales_etl::{
    EtlConfig, EtlEngine, EtlError, ImportPipeline, Normalizer, OwnerLinker, PostgrestClient,
    Reporter,
};
use std::sync::atomic::Ordering;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    logger::init_cli_logger(cli.verbose);
    tracing::info!("Starting sales-etl");

    let config = match EtlConfig::resolve(&cli) {
        Ok(config) => config,
        Err(e) => fail(e),
    };

    if let Err(e) = config.validate() {
        fail(e);
    }

    if let Err(e) = run(&cli, &config).await {
        fail(e);
    }
}

fn fail(e: EtlError) -> ! {
    tracing::error!("❌ {}", e);
    eprintln!("❌ {}", e);
    eprintln!("💡 {}", e.recovery_suggestion());
    std::process::exit(e.exit_code().max(1));
}

async fn run(cli: &Cli, config: &EtlConfig) -> sales_etl::Result<()> {
    let client = PostgrestClient::new(&config.destination.url, &config.destination.key);

    // Fatal before any writes if the destination is unreachable.
    client.connect().await?;
    tracing::info!("Connected to {}", config.destination.url);

    let engine = EtlEngine::new_with_monitoring(client, cli.monitor);

    match &cli.command {
        Command::Import(args) => {
            let source = sales_etl::source::open_source(&args.source, config.import.chunk_size)?;

            // Prove the key can write before reading thousands of rows.
            engine.write_probe(&config.destination.sales_table).await?;
            tracing::info!("Reading from {}", args.source);

            let normalizer = Normalizer::new(config.mapping(), config.import.policy.clone());
            let writer = BatchWriter::new(config.writer_config());
            let pipeline = ImportPipeline::new(source, normalizer, writer);

            // Ctrl-C stops between chunks; the summary still prints.
            let interrupt = pipeline.interrupt_flag();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    interrupt.store(true, Ordering::Relaxed);
                }
            });

            let reporter = if args.no_verify {
                None
            } else {
                Some(Reporter::new(config.report.clone()))
            };

            engine.run_import(pipeline, reporter).await?;
        }
        Command::LinkOwners(_) => {
            let linker = OwnerLinker::new(config.link.clone());
            engine.run_link(linker).await?;
        }
        Command::Verify(_) => {
            engine.run_verify(Reporter::new(config.report.clone())).await?;
        }
    }

    Ok(())
}
