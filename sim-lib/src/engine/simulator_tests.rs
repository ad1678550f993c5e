use std::time::Duration;

use tokio::time::Instant;

use super::*;
use crate::engine::{
    FailurePolicy, LatencyRange, ScriptedRandom, SeededRandom, UnknownEndpoint,
    policy::defaults,
};

fn default_simulator(seed: u64) -> RequestSimulator<SeededRandom> {
    RequestSimulator::new_with_random(
        Arc::new(PolicyRegistry::default()),
        SeededRandom::new(seed),
    )
}

fn loan_request_registry(five_xx_code: i64) -> PolicyRegistry {
    let registry = PolicyRegistry::default();
    PolicyRegistry::try_from_policies(registry.iter().cloned().map(|policy| {
        if policy.endpoint == Endpoint::LoanRequest {
            EndpointPolicy::new(
                Endpoint::LoanRequest,
                defaults::LOAN_REQUEST_LATENCY,
                Some(FailurePolicy::try_new(100, 100, five_xx_code, 400).unwrap()),
            )
        } else {
            policy
        }
    }))
    .unwrap()
}

#[tokio::test(flavor = "current_thread")]
async fn test_payments_and_credit_analysis_always_succeed() {
    tokio::time::pause();

    for seed in 0..8 {
        let simulator = default_simulator(seed);
        for _ in 0..25 {
            let result = simulator
                .handle(Endpoint::Payments, std::future::pending::<()>())
                .await
                .unwrap();
            assert_eq!(200, result.status);
            assert_eq!("Payment processed successfully.", result.message);

            let result = simulator
                .handle(Endpoint::CreditAnalysis, std::future::pending::<()>())
                .await
                .unwrap();
            assert_eq!(200, result.status);
            assert_eq!("Credit analysis completed.", result.message);
        }
    }
}

#[tokio::test(flavor = "current_thread")]
async fn test_credit_analysis_waits_within_range() {
    tokio::time::pause();

    let simulator = default_simulator(3);
    for _ in 0..20 {
        let start = Instant::now();
        simulator
            .handle(Endpoint::CreditAnalysis, std::future::pending::<()>())
            .await
            .unwrap();
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(1500), "{elapsed:?}");
        assert!(elapsed < Duration::from_millis(3001), "{elapsed:?}");
    }
}

#[tokio::test(flavor = "current_thread")]
async fn test_cashout_default_statuses() {
    tokio::time::pause();

    let simulator = default_simulator(4);
    let mut seen = std::collections::HashSet::new();
    for _ in 0..500 {
        let result = simulator
            .handle(Endpoint::Cashout, std::future::pending::<()>())
            .await
            .unwrap();
        match result.status {
            200 => assert_eq!("Cashout request successful.", result.message),
            400 => assert_eq!(
                "Cashout request rejected (simulated error 400).",
                result.message
            ),
            503 => assert_eq!(
                "Cashout service temporarily unavailable (simulated error 503).",
                result.message
            ),
            status => panic!("unexpected status: {status}"),
        }
        seen.insert(result.status);
    }
    assert_eq!(3, seen.len(), "seen: {seen:?}");
}

#[tokio::test(flavor = "current_thread")]
async fn test_cashout_scripted_draw_order() {
    tokio::time::pause();

    // latency, failure?, 5xx?
    let random = ScriptedRandom::new([150, 19, 70]);
    let simulator =
        RequestSimulator::new_with_random(Arc::new(PolicyRegistry::default()), random);

    let result = simulator
        .handle(Endpoint::Cashout, std::future::pending::<()>())
        .await
        .unwrap();
    assert_eq!(400, result.status);
}

#[tokio::test(flavor = "current_thread")]
async fn test_loan_request_default_takes_fault_path() {
    tokio::time::pause();

    let simulator = default_simulator(5);
    for _ in 0..100 {
        let fault = simulator
            .handle(Endpoint::LoanRequest, std::future::pending::<()>())
            .await
            .unwrap_err();
        assert_eq!(Endpoint::LoanRequest, fault.endpoint);
        assert_eq!(
            "Internal system error processing loan request (simulated error).",
            fault.to_string()
        );
    }
}

#[tokio::test(flavor = "current_thread")]
#[tracing_test::traced_test]
async fn test_loan_request_default_respond_catches_fault() {
    tokio::time::pause();

    let simulator = default_simulator(6);
    for _ in 0..20 {
        let result = simulator
            .respond(Endpoint::LoanRequest, std::future::pending::<()>())
            .await;
        assert_eq!(500, result.status);
        assert_eq!(
            "Failed to process loan request due to an internal error (simulated).",
            result.message
        );
        assert!(!result.interrupted);
    }

    assert!(logs_contain("simulated error in /loan-request"));
}

#[tokio::test(flavor = "current_thread")]
async fn test_loan_request_502_is_direct() {
    tokio::time::pause();

    let simulator = RequestSimulator::new_with_random(
        Arc::new(loan_request_registry(502)),
        SeededRandom::new(7),
    );
    assert!(
        !simulator
            .registry()
            .get(Endpoint::LoanRequest)
            .unconditional_failure_override()
    );

    for _ in 0..100 {
        let result = simulator
            .handle(Endpoint::LoanRequest, std::future::pending::<()>())
            .await
            .unwrap();
        assert_eq!(502, result.status);
        assert_eq!(
            "Loan service temporarily unavailable (simulated error 502).",
            result.message
        );
    }
}

#[tokio::test(flavor = "current_thread")]
async fn test_interrupted_delay_returns_500() {
    tokio::time::pause();

    // only the latency draw is consumed, no outcome is decided
    let random = Arc::new(ScriptedRandom::new([2_000]));
    let simulator = RequestSimulator::new_with_random(
        Arc::new(PolicyRegistry::default()),
        random.clone(),
    );

    let result = simulator
        .handle(
            Endpoint::CreditAnalysis,
            tokio::time::sleep(Duration::from_millis(10)),
        )
        .await
        .unwrap();

    assert_eq!(500, result.status);
    assert!(result.interrupted);
    assert_eq!(
        "Error during credit analysis: sleep interrupted",
        result.message
    );
    assert_eq!(0, random.remaining());
}

#[tokio::test(flavor = "current_thread")]
async fn test_interrupted_loan_request_does_not_fault() {
    tokio::time::pause();

    let simulator = default_simulator(8);
    let result = simulator
        .handle(Endpoint::LoanRequest, std::future::ready(()))
        .await
        .unwrap();

    assert_eq!(500, result.status);
    assert!(result.interrupted);
    assert_eq!(
        "Interrupted error during loan request: sleep interrupted",
        result.message
    );
}

#[tokio::test(flavor = "current_thread")]
async fn test_invalid_latency_degrades_to_default_window() {
    tokio::time::pause();

    let registry = PolicyRegistry::try_from_policies(Endpoint::ALL.into_iter().map(|endpoint| {
        EndpointPolicy::new(endpoint, LatencyRange::new(3000, 1500), None)
    }))
    .unwrap();
    let simulator = RequestSimulator::new_with_random(Arc::new(registry), SeededRandom::new(9));

    for endpoint in Endpoint::ALL {
        let start = Instant::now();
        let result = simulator
            .handle(endpoint, std::future::pending::<()>())
            .await
            .unwrap();
        let elapsed = start.elapsed();

        assert_eq!(200, result.status);
        assert!(elapsed >= Duration::from_millis(50), "{elapsed:?}");
        assert!(elapsed < Duration::from_millis(151), "{elapsed:?}");
    }
}

#[tokio::test(flavor = "current_thread")]
async fn test_concurrent_requests_share_simulator() {
    tokio::time::pause();

    let simulator = RequestSimulator::new(Arc::new(PolicyRegistry::default()));
    let handles: Vec<_> = (0..32)
        .map(|_| {
            let simulator = simulator.clone();
            tokio::spawn(async move {
                simulator
                    .respond(Endpoint::Payments, std::future::pending::<()>())
                    .await
            })
        })
        .collect();

    for handle in handles {
        assert_eq!(200, handle.await.unwrap().status);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_requests_share_seeded_random() {
    let registry = PolicyRegistry::try_from_policies(Endpoint::ALL.into_iter().map(|endpoint| {
        let failure = (endpoint == Endpoint::Cashout).then_some(defaults::CASHOUT_FAILURE);
        EndpointPolicy::new(endpoint, LatencyRange::new(1, 3), failure)
    }))
    .unwrap();
    let simulator = RequestSimulator::new_with_random(
        Arc::new(registry),
        Arc::new(SeededRandom::new(10)),
    );

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let simulator = simulator.clone();
            tokio::spawn(async move {
                let mut statuses = Vec::with_capacity(50);
                for _ in 0..50 {
                    let result = simulator
                        .respond(Endpoint::Cashout, std::future::pending::<()>())
                        .await;
                    assert!(!result.interrupted);
                    statuses.push(result.status);
                }
                statuses
            })
        })
        .collect();

    let mut seen = std::collections::HashSet::new();
    for handle in handles {
        for status in handle.await.unwrap() {
            assert!([200, 400, 503].contains(&status), "status: {status}");
            seen.insert(status);
        }
    }
    assert_eq!(3, seen.len(), "seen: {seen:?}");
}

#[tokio::test(flavor = "current_thread")]
async fn test_handle_named() {
    tokio::time::pause();

    let simulator = default_simulator(11);

    let result = simulator
        .handle_named("payments", std::future::pending::<()>())
        .await
        .unwrap();
    assert_eq!(200, result.status);

    let err = simulator
        .handle_named("loan-request", std::future::pending::<()>())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        SimulationError::Fault(Fault {
            endpoint: Endpoint::LoanRequest,
            ..
        })
    ));

    let err = simulator
        .handle_named("transfers", std::future::pending::<()>())
        .await
        .unwrap_err();
    assert_eq!(
        SimulationError::UnknownEndpoint(UnknownEndpoint("transfers".to_owned())),
        err
    );
    assert_eq!("unknown endpoint: 'transfers'", err.to_string());
}
