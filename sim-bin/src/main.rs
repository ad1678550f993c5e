#![cfg_attr(
    not(test),
    warn(clippy::print_stdout, clippy::dbg_macro),
    deny(clippy::unwrap_used, clippy::expect_used)
)]

use std::{path::PathBuf, sync::Arc, time::Duration};

use rama::{
    error::{BoxError, ErrorContext as _},
    graceful::{self, ShutdownGuard},
    net::socket::Interface,
    telemetry::tracing::{self, Instrument as _},
};

use clap::Parser;

use endpoint_sim_lib::{
    config::{SimulatorConfig, merge_config},
    engine::{PolicyRegistry, ProcessRandom, RequestSimulator},
    utils,
};

pub mod server;

#[cfg(target_family = "unix")]
#[global_allocator]
static ALLOC: jemallocator::Jemalloc = jemallocator::Jemalloc;

#[cfg(target_os = "windows")]
#[global_allocator]
static ALLOC: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[cfg(test)]
pub mod test;

/// CLI arguments for configuring the simulated endpoints.
#[derive(Debug, Clone, Parser)]
#[command(name = "endpoint-sim")]
#[command(bin_name = "endpoint-sim")]
#[command(version, about, long_about = None)]
pub struct Args {
    /// network interface to bind the api server to
    #[arg(
        long,
        short = 'b',
        value_name = "INTERFACE",
        default_value = "127.0.0.1:8080"
    )]
    pub bind: Interface,

    /// directory in which data (e.g. the bound address) will be stored on the filesystem
    #[arg(long, short = 'D', default_value = ".endpoint-sim")]
    pub data: PathBuf,

    /// JSON file with endpoint tunables,
    /// flags and environment variables overwrite its values
    #[arg(long, short = 'c', value_name = "FILE")]
    pub config: Option<PathBuf>,

    #[command(flatten)]
    pub simulation: SimulatorConfig,

    /// seed the random source, making the sequence of draws reproducible
    #[arg(long, env = "SIMULATOR_SEED", value_name = "N")]
    pub seed: Option<u64>,

    /// debug logging as default instead of Info; use RUST_LOG env for more options
    #[arg(long, short = 'v', default_value_t = false)]
    pub verbose: bool,

    /// enable pretty logging (format for humans)
    #[arg(long, default_value_t = false)]
    pub pretty: bool,

    /// write the tracing output to the provided (log) file instead of stderr
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,

    #[arg(long, value_name = "SECONDS", default_value_t = 1.)]
    /// the graceful shutdown timeout (<= 0.0 = no timeout)
    pub graceful: f64,
}

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    let args = Args::parse();

    utils::telemetry::init_tracing(utils::telemetry::TelemetryConfig {
        verbose: args.verbose,
        pretty: args.pretty,
        output: args.output.as_deref(),
    })?;

    let base_shutdown_signal = graceful::default_signal();
    if let Err(err) = run_with_args(base_shutdown_signal, args).await {
        eprintln!("🚩 exit with error: {err}");
        std::process::exit(1);
    }

    Ok(())
}

/// Runs the api server and blocks until a critical error
/// occurs or the (graceful) shutdown has been initiated.
///
/// This entry point is used by both the (binary) `main` function as well as
/// for the e2e test suite found in the test module.
async fn run_with_args<F>(base_shutdown_signal: F, args: Args) -> Result<(), BoxError>
where
    F: Future<Output: Send + 'static> + Send + 'static,
{
    tokio::fs::create_dir_all(&args.data)
        .await
        .context("create data directory")
        .with_context_debug_field("path", || args.data.clone())?;
    tracing::info!(path = ?args.data, "data directory ready to be used");

    let registry = load_policy_registry(&args).await?;
    for policy in registry.iter() {
        tracing::info!(
            endpoint = policy.name(),
            latency = %policy.latency,
            failure = ?policy.failure,
            fault_on_5xx = policy.unconditional_failure_override(),
            "endpoint policy loaded",
        );
    }

    let random = ProcessRandom::from_seed(args.seed);
    if let Some(seed) = args.seed {
        tracing::info!("random source seeded with: {seed}");
    }
    let simulator = RequestSimulator::new_with_random(Arc::new(registry), random);

    let graceful_timeout = (args.graceful > 0.).then(|| Duration::from_secs_f64(args.graceful));

    let (error_tx, error_rx) = tokio::sync::mpsc::channel::<BoxError>(1);
    let graceful = graceful::Shutdown::new(new_shutdown_signal(error_rx, base_shutdown_signal));

    graceful.spawn_task_fn(move |guard| run_api_server(args, guard, error_tx, simulator));

    let delay = match graceful_timeout {
        Some(duration) => graceful.shutdown_with_limit(duration).await?,
        None => graceful.shutdown().await,
    };

    tracing::info!("gracefully shutdown with a delay of: {delay:?}");
    Ok(())
}

async fn load_policy_registry(args: &Args) -> Result<PolicyRegistry, BoxError> {
    let file_config = match args.config.as_deref() {
        Some(path) => {
            tracing::info!(?path, "use config file as base config");
            SimulatorConfig::try_load_file(path).await?
        }
        None => {
            tracing::info!("no config file defined, use defaults as base config");
            SimulatorConfig::default()
        }
    };

    merge_config(file_config, args.simulation.clone())
        .try_build_registry()
        .context("load endpoint policies")
}

async fn run_api_server(
    args: Args,
    guard: ShutdownGuard,
    error_tx: tokio::sync::mpsc::Sender<BoxError>,
    simulator: RequestSimulator<ProcessRandom>,
) {
    tracing::info!("spawning api server...");
    if let Err(err) = server::api::run_api_server(args, guard, simulator)
        .instrument(tracing::debug_span!(
            "api server lifetime",
            server.service.name = utils::env::project_name(),
            otel.kind = "server",
            network.protocol.name = "http",
        ))
        .await
    {
        tracing::error!("api server exited with an error: {err}");
        let _ = error_tx.send(err).await;
    }
}

fn new_shutdown_signal(
    error_rx: tokio::sync::mpsc::Receiver<BoxError>,
    base_shutdown_signal: impl Future<Output: Send + 'static> + Send + 'static,
) -> impl Future + Send + 'static {
    async move {
        let mut mut_error_rx = error_rx;
        let mut signal = Box::pin(base_shutdown_signal);

        tokio::select! {
            _ = signal.as_mut() => {
                tracing::debug!("default signal triggered: init graceful shutdown");
            }
            err = mut_error_rx.recv() => {
                if let Some(err) = err {
                    tracing::error!("fatal err received: {err}; abort");
                } else {
                    tracing::info!("wait for default signal, no error was received");
                    signal.await;
                    tracing::debug!("default signal triggered: init graceful shutdown");
                }
            }
        }
    }
}
