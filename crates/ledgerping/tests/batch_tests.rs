//! End-to-end batch tests: real prober and transaction builder over a
//! scripted transport

mod common;

use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

use common::{ScriptedTransport, SendStep, StaticCredentials};
use ledgerping::{BatchRunner, Cluster, LedgerProber, PingType, WorkerConfig};
use tokio_util::sync::CancellationToken;

fn accept(ms: u64) -> SendStep {
    SendStep::Accept { latency: Duration::from_millis(ms) }
}

fn reject(message: &str) -> SendStep {
    SendStep::Reject { message: message.to_string() }
}

fn runner() -> BatchRunner {
    BatchRunner::new(Arc::new(LedgerProber::new()), Arc::new(StaticCredentials))
}

#[tokio::test(start_paused = true)]
async fn test_batch_with_two_failures() {
    let transport = ScriptedTransport::new(vec![
        accept(100),
        reject("blockhash expired"),
        accept(150),
        reject("node unhealthy"),
        accept(200),
    ]);
    let config = WorkerConfig::builder()
        .batch_count(5)
        .batch_interval(Duration::from_millis(250))
        .tx_timeout(Duration::from_secs(2))
        .wait_confirmation_timeout(Duration::from_secs(5))
        .build();

    let result = runner()
        .run_batch(
            Cluster::Devnet,
            &transport,
            "probe-1",
            PingType::DataPoint1Min,
            &config,
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    assert_eq!(result.submitted, 5);
    assert_eq!(result.confirmed, 3);
    assert_eq!(result.loss, 40.0);
    assert_eq!(result.max, 200);
    assert_eq!(result.min, 100);
    assert_eq!(result.mean, 150);
    assert_eq!(result.stddev, 40);
    assert_eq!(result.take_time, 450);
    assert_eq!(result.errors.len(), 2);
    assert!(result.errors[1].contains("node unhealthy"));
    // failed submissions are never polled
    assert_eq!(transport.status_queries.load(Ordering::SeqCst), 3);
}

#[tokio::test(start_paused = true)]
async fn test_batch_invariants_hold_for_every_mix() {
    for failures in 0..=4usize {
        let mut steps: Vec<SendStep> = (0..4).map(|i| if i < failures { reject("down") } else { accept(50) }).collect();
        steps.push(accept(50));
        let transport = ScriptedTransport::new(steps);
        let config = WorkerConfig::builder().batch_count(4).batch_interval(Duration::ZERO).build();

        let result = runner()
            .run_batch(
                Cluster::Mainnet,
                &transport,
                "probe-1",
                PingType::Report,
                &config,
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        assert!(result.confirmed <= result.submitted);
        assert_eq!(result.confirmed, 4 - failures);
        let expected_loss = (result.submitted - result.confirmed) as f64 / result.submitted as f64 * 100.0;
        assert_eq!(result.loss, expected_loss);
        assert_eq!(result.errors.len(), failures);
    }
}

#[tokio::test(start_paused = true)]
async fn test_total_loss_produces_zeroed_statistics() {
    let transport = ScriptedTransport::always_reject("rpc unavailable");
    let config = WorkerConfig::builder().batch_count(3).batch_interval(Duration::from_millis(10)).build();

    let result = runner()
        .run_batch(
            Cluster::Testnet,
            &transport,
            "probe-1",
            PingType::DataPoint1Min,
            &config,
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    assert_eq!(result.loss, 100.0);
    assert_eq!((result.max, result.mean, result.min, result.stddev), (0, 0, 0, 0));
    assert_eq!(result.take_time, 0);
    assert_eq!(result.errors.len(), 3);
}
