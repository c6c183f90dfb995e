use crate::{
    cli::args::Cli,
    config,
    core::registry::ProbeRegistry,
    core::scheduler::{Orchestrator, RunOptions},
    reporters::writer,
    ui::{printer, progress::RunProgress},
    utils::logging,
    wizard,
};
use anyhow::Result;

pub async fn run(cli: Cli) -> Result<()> {
    logging::init(cli.verbose, cli.debug)?;

    if cli.wizard {
        return wizard::run(&cli).await;
    }

    let resolved = config::resolve(&cli)?;
    tracing::info!(
        "diagnosing {} (credential: {})",
        resolved.target.resource_url,
        if resolved.target.has_api() { "yes" } else { "no" }
    );

    let orchestrator = Orchestrator::new(ProbeRegistry::standard());
    let progress = RunProgress::new(orchestrator.plan(&resolved.target).len());
    let opts = RunOptions {
        concurrency: cli.parallel,
        progress: Some(progress.observer()),
        ..Default::default()
    };

    let mut report = orchestrator.run_with(&resolved.target, &opts).await;
    progress.finish();

    writer::write_all(&mut report, &resolved.output_dir)?;
    printer::print_summary(&report);

    Ok(())
}
