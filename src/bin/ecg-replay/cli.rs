use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use ecg_replay::config::ReplayConfig;
use ecg_replay::source::LabelFilter;
use ecg_replay::PlaybackMode;

#[derive(Parser)]
#[command(
    name = "ecg-replay",
    version,
    about = "Replay ECG heartbeats to a diagnostic device in real time",
    long_about = "Stream recorded (or synthetic) ECG heartbeats sample by sample over a serial link\n\
                  and print the diagnoses the device sends back. Use --port sim for the built-in\n\
                  simulated device or --port stdout to print records instead of sending them."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Configuration file (default: ./ecg-replay.toml, ~/.config/ecg-replay/config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
}

#[derive(Subcommand)]
pub enum Command {
    /// Acquire the dataset and stream it to the device
    Run(RunArgs),
    /// Validate the configuration and print the effective settings
    Check(CheckArgs),
    /// Acquire the dataset only and print a summary
    Fetch(FetchArgs),
}

/// Dataset selection flags shared by `run` and `fetch`
#[derive(Args, Debug, Default)]
pub struct DatasetArgs {
    /// Local cache file for the beat table
    #[arg(long)]
    pub cache: Option<PathBuf>,

    /// HTTP(S) address to download the beat table from
    #[arg(long)]
    pub remote_url: Option<String>,

    /// Label classes to keep, e.g. "0,2" or "all"
    #[arg(long)]
    pub labels: Option<LabelFilter>,

    /// Skip this many beats after filtering
    #[arg(long)]
    pub slice_start: Option<usize>,

    /// Fail instead of generating synthetic beats
    #[arg(long, default_value_t = false)]
    pub no_fallback: bool,
}

impl DatasetArgs {
    pub fn apply(&self, config: &mut ReplayConfig) {
        if let Some(cache) = &self.cache {
            config.dataset.cache_path = cache.clone();
        }
        if let Some(url) = &self.remote_url {
            config.dataset.remote_url = Some(url.clone());
        }
        if let Some(labels) = &self.labels {
            config.dataset.labels = labels.clone();
        }
        if let Some(slice_start) = self.slice_start {
            config.dataset.slice_start = slice_start;
        }
        if self.no_fallback {
            config.dataset.synthetic_fallback = false;
        }
    }
}

#[derive(Args, Debug, Default)]
pub struct RunArgs {
    /// Serial port path, "sim" or "stdout"
    #[arg(short, long)]
    pub port: Option<String>,

    /// Serial baud rate
    #[arg(long)]
    pub baud: Option<u32>,

    /// Samples per second
    #[arg(long)]
    pub rate: Option<f64>,

    /// Pause after each beat in milliseconds
    #[arg(long)]
    pub beat_pause_ms: Option<u64>,

    /// Loop the dataset as one continuous signal until interrupted
    #[arg(long, default_value_t = false)]
    pub continuous: bool,

    /// Stop after sending this many samples
    #[arg(long)]
    pub max_samples: Option<u64>,

    #[command(flatten)]
    pub dataset: DatasetArgs,
}

impl RunArgs {
    pub fn apply(&self, config: &mut ReplayConfig) {
        if let Some(port) = &self.port {
            config.channel.target = port.clone();
        }
        if let Some(baud) = self.baud {
            config.channel.baud_rate = baud;
        }
        if let Some(rate) = self.rate {
            config.stream.sample_rate_hz = rate;
        }
        if let Some(pause) = self.beat_pause_ms {
            config.stream.beat_pause_ms = pause;
        }
        if self.continuous {
            config.stream.playback = PlaybackMode::Continuous;
        }
        if let Some(max) = self.max_samples {
            config.stream.max_samples = Some(max);
        }
        self.dataset.apply(config);
    }
}

#[derive(Args, Debug, Default)]
pub struct CheckArgs {}

#[derive(Args, Debug, Default)]
pub struct FetchArgs {
    #[command(flatten)]
    pub dataset: DatasetArgs,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_run_flags_override_config() {
        let cli = Cli::parse_from([
            "ecg-replay",
            "run",
            "--port",
            "sim",
            "--rate",
            "250",
            "--continuous",
            "--labels",
            "all",
            "--no-fallback",
            "--max-samples",
            "10",
        ]);

        let Command::Run(args) = cli.command else {
            panic!("expected run");
        };

        let mut config = ReplayConfig::default();
        args.apply(&mut config);

        assert_eq!(config.channel.target, "sim");
        assert_eq!(config.stream.sample_rate_hz, 250.0);
        assert_eq!(config.stream.playback, PlaybackMode::Continuous);
        assert_eq!(config.stream.max_samples, Some(10));
        assert_eq!(config.dataset.labels, LabelFilter::All);
        assert!(!config.dataset.synthetic_fallback);
        assert_eq!(config.channel.baud_rate, ReplayConfig::default().channel.baud_rate);
    }

    #[test]
    fn test_labels_flag_parses_classes() {
        let cli = Cli::parse_from(["ecg-replay", "fetch", "--labels", "1,3"]);
        let Command::Fetch(args) = cli.command else {
            panic!("expected fetch");
        };
        assert_eq!(args.dataset.labels, Some(LabelFilter::classes([1, 3])));
    }
}
