use portcullis_circuitbreaker::{BreakerConfig, CircuitState};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;

/// Full trip-and-recover cycle: threshold failures open the circuit, the
/// recovery timeout admits probes, and enough probe successes close it again.
#[tokio::test]
async fn trip_recover_close() {
    let transitions = Arc::new(AtomicUsize::new(0));
    let t = Arc::clone(&transitions);

    let registry = BreakerConfig::builder()
        .failure_threshold(5)
        .recovery_timeout(Duration::from_millis(50))
        .half_open_max_calls(3)
        .name("recovery-cycle")
        .on_state_transition(move |_, _, _| {
            t.fetch_add(1, Ordering::SeqCst);
        })
        .build();

    // Five consecutive failures trip the circuit.
    for _ in 0..5 {
        assert!(registry.admit("loan-service"));
        registry.record_failure("loan-service");
    }
    assert_eq!(registry.state("loan-service"), Some(CircuitState::Open));
    assert!(!registry.admit("loan-service"));

    // After the recovery timeout the next admission flips to half-open.
    sleep(Duration::from_millis(80)).await;
    assert!(registry.admit("loan-service"));
    assert_eq!(registry.state("loan-service"), Some(CircuitState::HalfOpen));

    // Three successes close the circuit and clear the failure streak.
    registry.record_success("loan-service");
    registry.record_success("loan-service");
    assert_eq!(registry.state("loan-service"), Some(CircuitState::HalfOpen));
    registry.record_success("loan-service");
    assert_eq!(registry.state("loan-service"), Some(CircuitState::Closed));
    assert_eq!(registry.snapshot()["loan-service"].failure_count, 0);
    assert!(registry.admit("loan-service"));

    // closed -> open -> half_open -> closed
    assert_eq!(transitions.load(Ordering::SeqCst), 3);
}

/// A failed probe reopens the circuit and restarts the recovery clock.
#[tokio::test]
async fn failed_probe_reopens() {
    let registry = BreakerConfig::builder()
        .failure_threshold(2)
        .recovery_timeout(Duration::from_millis(50))
        .half_open_max_calls(3)
        .name("failed-probe")
        .build();

    registry.record_failure("svc");
    registry.record_failure("svc");
    assert_eq!(registry.state("svc"), Some(CircuitState::Open));

    sleep(Duration::from_millis(80)).await;
    assert!(registry.admit("svc"));
    registry.record_failure("svc");

    assert_eq!(registry.state("svc"), Some(CircuitState::Open));
    assert!(!registry.admit("svc"), "recovery clock restarted");

    sleep(Duration::from_millis(80)).await;
    assert!(registry.admit("svc"), "another probe after the fresh timeout");
}

/// Rejected admissions in half-open do not affect the probe outcome.
#[tokio::test]
async fn rejected_admissions_have_no_side_effects() {
    let registry = BreakerConfig::builder()
        .failure_threshold(1)
        .recovery_timeout(Duration::from_millis(20))
        .half_open_max_calls(1)
        .name("rejected-admissions")
        .build();

    registry.record_failure("svc");
    sleep(Duration::from_millis(40)).await;

    assert!(registry.admit("svc"));
    for _ in 0..5 {
        assert!(!registry.admit("svc"));
    }

    registry.record_success("svc");
    assert_eq!(registry.state("svc"), Some(CircuitState::Closed));
}
