use std::path::Path;

use tokio_util::sync::CancellationToken;
use tracing::info;

use ecg_replay::config::{ConfigError, ConfigLoader, ReplayConfig};
use ecg_replay::engine::{RunOutcome, RunSummary, StreamingEngine};
use ecg_replay::hal::ChannelFactory;
use ecg_replay::reporter::DiagnosisReporter;
use ecg_replay::source::{Acquired, AcquireRequest, DatasetResolver};
use ecg_replay::{ReplayError, ReplayResult};

use crate::cli::{CheckArgs, FetchArgs, RunArgs};
use crate::exit_codes;

pub async fn run(config_path: Option<&Path>, args: RunArgs) -> i32 {
    match stream(config_path, &args).await {
        Ok(summary) => {
            let verb = match summary.outcome {
                RunOutcome::Finished => "finished",
                RunOutcome::Cancelled => "interrupted",
            };
            let samples = if summary.samples_displayed > 0 {
                format!("{} samples sent, {} displayed", summary.samples_sent, summary.samples_displayed)
            } else {
                format!("{} samples", summary.samples_sent)
            };
            eprintln!(
                "Stream {}: {} beats, {}, {} diagnoses in {:.1?}",
                verb, summary.beats_completed, samples, summary.diagnoses, summary.elapsed
            );
            exit_codes::SUCCESS
        }
        Err(e) => fail(&e),
    }
}

pub fn check(config_path: Option<&Path>, _args: CheckArgs) -> i32 {
    let result = load_config(config_path, |_| {}).and_then(|config| Ok(config.to_toml()?));
    match result {
        Ok(toml) => {
            print!("{}", toml);
            exit_codes::SUCCESS
        }
        Err(e) => fail(&e),
    }
}

pub async fn fetch(config_path: Option<&Path>, args: FetchArgs) -> i32 {
    let result = match load_config(config_path, |c| args.dataset.apply(c)) {
        Ok(config) => acquire(&config).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(acquired) => {
            let dataset = &acquired.dataset;
            println!("origin: {}", acquired.origin);
            println!("beats: {}", dataset.beat_count());
            println!("samples per beat: {}", dataset.beat_len());
            println!("total samples: {}", dataset.sample_count());
            exit_codes::SUCCESS
        }
        Err(e) => fail(&e),
    }
}

async fn stream(config_path: Option<&Path>, args: &RunArgs) -> ReplayResult<RunSummary> {
    let config = load_config(config_path, |c| args.apply(c))?;

    let cancel = CancellationToken::new();
    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupt received, stopping");
            interrupt.cancel();
        }
    });

    let Some(acquired) = acquire_until_cancelled(&config, &cancel).await? else {
        return Ok(RunSummary::not_started(RunOutcome::Cancelled));
    };

    eprintln!(
        "Loaded {} heartbeats of {} samples ({})",
        acquired.dataset.beat_count(),
        acquired.dataset.beat_len(),
        acquired.origin
    );

    let mut channel = ChannelFactory::open_for_playback(&config.channel, config.stream.playback);

    let mut engine = StreamingEngine::new(config.stream.clone(), DiagnosisReporter::console());
    engine.run(&acquired.dataset, &mut channel, &cancel).await
}

async fn acquire(config: &ReplayConfig) -> ReplayResult<Acquired> {
    let request = AcquireRequest::from_config(&config.dataset);
    Ok(DatasetResolver::from_config(&config.dataset).acquire(&request).await?)
}

/// `None` when `cancel` fires before the dataset is ready
async fn acquire_until_cancelled(
    config: &ReplayConfig,
    cancel: &CancellationToken,
) -> ReplayResult<Option<Acquired>> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => {
            info!("Interrupted while acquiring the dataset");
            Ok(None)
        }
        acquired = acquire(config) => acquired.map(Some),
    }
}

/// Defaults, files and environment, then `overrides`, then validation
fn load_config<F>(config_path: Option<&Path>, overrides: F) -> ReplayResult<ReplayConfig>
where
    F: FnOnce(&mut ReplayConfig),
{
    let loader = match config_path {
        Some(path) => ConfigLoader::with_file(path),
        None => ConfigLoader::new(),
    };

    let mut config = loader.load_unvalidated()?;
    overrides(&mut config);
    config.validate().map_err(ConfigError::Validation)?;
    Ok(config)
}

fn fail(error: &ReplayError) -> i32 {
    eprintln!("Error: {}", error);
    exit_codes::for_error(error)
}
