// tests/error_propagation_tests.rs
//! Error conversion and context tests
//!
//! Checks that leaf errors from each layer keep their category, context and
//! source chain when they surface as a `ReplayError`.

use std::error::Error;

use ecg_replay::config::{ConfigError, ConfigLoader};
use ecg_replay::engine::StreamingEngine;
use ecg_replay::error::{IntoReplayError, ReplayError};
use ecg_replay::hal::{ChannelError, ChannelState, SimulatedDevice};
use ecg_replay::reporter::{DiagnosisReporter, RecordingSink};
use ecg_replay::source::{AcquisitionError, Dataset};
use tokio_util::sync::CancellationToken;

#[test]
fn test_acquisition_error_conversion() {
    let errors = vec![
        AcquisitionError::NoData("cache: missing".to_string()),
        AcquisitionError::RemoteForbidden("https://bucket/x.csv".to_string()),
        AcquisitionError::Parse { row: 3, reason: "expected 188 columns, found 2".to_string() },
        AcquisitionError::Transport("connection reset".to_string()),
    ];

    for acquisition_error in errors {
        let no_data = acquisition_error.is_no_data();
        let replay_error: ReplayError = acquisition_error.into();

        match &replay_error {
            ReplayError::Acquisition { context, .. } => {
                assert_eq!(context.component, "source");
                assert_eq!(context.operation, "acquire");
            }
            other => panic!("Expected Acquisition error, got: {:?}", other),
        }

        assert_eq!(replay_error.is_no_data(), no_data);
        assert!(replay_error.to_string().starts_with("[DATASET]"));
        assert!(replay_error.source().is_some());
    }
}

#[test]
fn test_channel_error_conversion() {
    let errors = vec![
        ChannelError::Open { target: "/dev/ttyACM0".to_string(), reason: "busy".to_string() },
        ChannelError::Write("broken pipe".to_string()),
        ChannelError::Read("device reset".to_string()),
        ChannelError::Closed,
    ];

    for channel_error in errors {
        let message = channel_error.to_string();
        let replay_error: ReplayError = channel_error.into();

        assert!(matches!(replay_error, ReplayError::Channel { .. }));
        assert!(replay_error.to_string().contains(&message));
        assert_eq!(replay_error.source().map(|s| s.to_string()), Some(message));
    }
}

#[test]
fn test_config_error_from_loader() {
    let loader = ConfigLoader::with_file("/nonexistent/ecg-replay.toml").without_env();
    let config_error = loader.load().expect_err("Missing explicit file must fail");
    assert!(matches!(config_error, ConfigError::FileNotFound(_)));

    let replay_error: ReplayError = config_error.into();
    assert!(replay_error.to_string().starts_with("[CONFIG]"));
    assert!(!replay_error.is_no_data());
}

#[test]
fn test_foreign_errors_wrap_as_system() {
    let result: Result<(), std::io::Error> =
        Err(std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"));

    let err = result.replay_err("cli", "write_output").expect_err("Expected error");
    match err {
        ReplayError::System { subsystem, reason, context } => {
            assert_eq!(subsystem, "cli");
            assert!(reason.contains("denied"));
            assert_eq!(context.operation, "write_output");
        }
        other => panic!("Expected System error, got: {:?}", other),
    }
}

#[tokio::test(start_paused = true)]
async fn test_write_failure_carries_stream_position() {
    let dataset = Dataset::single(vec![0.1, 0.2, 0.3, 0.4]).expect("Failed to build dataset");
    let device = SimulatedDevice::new();
    device.handle().fail_writes_after(3);
    let mut channel = ChannelState::connected(device);
    let mut engine = StreamingEngine::new(Default::default(), DiagnosisReporter::new(RecordingSink::new()));

    let err = engine
        .run(&dataset, &mut channel, &CancellationToken::new())
        .await
        .expect_err("Write failure must abort the run");

    let context = err.context();
    assert_eq!(context.component, "engine");
    assert_eq!(context.operation, "write_sample");
    assert_eq!(context.additional_info.get("tick").map(String::as_str), Some("3"));
    assert!(context.file.is_some_and(|f| f.ends_with("mod.rs")));
    assert!(err.to_string().starts_with("[CHANNEL]"));
}
