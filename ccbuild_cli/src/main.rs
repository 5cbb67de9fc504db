#![deny(clippy::unwrap_used)]

use std::{path::PathBuf, process::ExitCode, sync::Arc};

use anyhow::Result;
use clap::Parser;

use ccbuild_core::{
    BuildOptions, BuildSummary, Builder, HostRunner, Manifest, ProcessRunner, SourceDiscovery,
    host_toolchain,
};

#[derive(Parser, Debug)]
#[command(name = "ccbuild", about = "Small self-hosted build driver for C++ codebases")]
struct Cli {
    /// Recompile everything, ignoring object file timestamps.
    #[arg(long)]
    clean: bool,
    /// Echo the commands being run.
    #[arg(long)]
    verbose: bool,
    /// Include address-sanitizer flags, if available.
    #[arg(long)]
    asan: bool,
    /// Path to the build manifest.
    #[arg(long, default_value = "ccbuild.toml")]
    manifest: PathBuf,
    /// Number of parallel jobs. Defaults to the number of logical CPUs.
    #[arg(long)]
    jobs: Option<usize>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let default_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp(None)
        .init();

    match run(&cli).await {
        Ok(summary) => {
            log::info!("build succeeded, {} task(s)", summary.executed);
            ExitCode::SUCCESS
        }
        Err(err) => {
            log::error!("{err:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: &Cli) -> Result<BuildSummary> {
    let options = BuildOptions {
        asan: cli.asan,
        clean: cli.clean,
        verbose: cli.verbose,
        jobs: cli.jobs,
    };

    let manifest = Manifest::load(&cli.manifest)?;
    let runner: Arc<dyn ProcessRunner> = Arc::new(HostRunner);
    let toolchain = host_toolchain(
        runner.as_ref(),
        manifest.pkg_config(),
        manifest.windows_libs(),
    )
    .await?;
    let discovery = SourceDiscovery::host();

    let mut builder = Builder::new(
        toolchain,
        Arc::clone(&runner),
        options,
        manifest.output_dir(),
    );
    manifest.declare_targets(&mut builder, &discovery)?;
    Ok(builder.build().await?)
}
