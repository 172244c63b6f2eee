/*!
 * Error and Configuration Tests
 * Wire format, diagnostics and environment-driven configuration
 */

use kernel_sched::platform::{RecordingContext, ScriptedInterrupts};
use kernel_sched::{ConfigError, InvariantViolation, SchedConfig, SchedError, Scheduler};
use miette::Diagnostic;
use pretty_assertions::assert_eq;
use std::sync::Arc;

fn scheduler() -> Scheduler {
    Scheduler::new(
        SchedConfig::default(),
        Arc::new(ScriptedInterrupts::new()),
        Arc::new(RecordingContext::new()),
    )
}

#[test]
fn test_interrupted_round_trips_through_json() {
    let sched = scheduler();
    let boot = sched.bootstrap("boot").unwrap();

    let err = SchedError::Interrupted(boot);
    let json = serde_json::to_string(&err).unwrap();
    let back: SchedError = serde_json::from_str(&json).unwrap();

    assert_eq!(back, err);
    assert!(back.is_interrupted());
    assert_eq!(back.errno(), Some(-4));
}

#[test]
fn test_diagnostic_codes() {
    let err = SchedError::ThreadLimit(8);
    assert_eq!(err.code().unwrap().to_string(), "sched::thread_limit");
    assert!(err.help().is_some());
    assert_eq!(err.errno(), None);
    assert_eq!(err.to_string(), "Thread limit reached (8 live threads)");
}

#[test]
fn test_spawn_error_from_io() {
    let io = std::io::Error::new(std::io::ErrorKind::WouldBlock, "no more threads");
    let err: SchedError = io.into();
    assert!(matches!(err, SchedError::Spawn(ref msg) if msg.contains("no more threads")));
}

#[test]
fn test_config_from_lookup() {
    let config = SchedConfig::from_lookup(|key| match key {
        "KSCHED_MAX_QUEUES" => Some("64".to_string()),
        "KSCHED_STACK_SIZE" => Some("65536".to_string()),
        _ => None,
    })
    .unwrap();

    assert_eq!(config.max_queues, 64);
    assert_eq!(config.host_stack_size, 65536);
    assert_eq!(config.max_threads, SchedConfig::default().max_threads);
}

#[test]
fn test_config_rejects_garbage() {
    let err = SchedConfig::from_lookup(|key| {
        (key == "KSCHED_TRACE_JSON").then(|| "maybe".to_string())
    })
    .unwrap_err();

    assert_eq!(
        err,
        ConfigError::InvalidValue {
            key: "KSCHED_TRACE_JSON",
            value: "maybe".to_string(),
        }
    );
}

#[test]
fn test_invariant_violation_is_serializable() {
    let sched = scheduler();
    let boot = sched.bootstrap("boot").unwrap();
    let q = sched.queue_init().unwrap();

    let violation = InvariantViolation::SizeMismatch {
        queue: q,
        reported: 2,
        actual: 1,
    };
    let value = serde_json::to_value(&violation).unwrap();
    assert_eq!(value["violation"], "size_mismatch");
    assert_eq!(value["reported"], 2);

    let lost = InvariantViolation::LostThread {
        thread: boot,
        state: "sleep".to_string(),
    };
    assert!(lost.to_string().contains("on no queue"));
}
