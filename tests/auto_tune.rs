use autobackoff::{Backoff, InstantSleeper, Outcome};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("test error")]
struct TestError;

fn ms(v: u64) -> Duration {
    Duration::from_millis(v)
}

fn instant_backoff() -> Backoff {
    Backoff::builder()
        .retries(5)
        .min(ms(100))
        .max(ms(1000))
        .with_sleeper(InstantSleeper)
        .build()
        .expect("valid backoff")
}

/// Run one always-failing sequence and return the waits handed out.
async fn failing_run(backoff: &Backoff) -> Vec<Duration> {
    let mut waits = Vec::new();
    let result: Result<(), TestError> = backoff
        .run_with_notify(|| async { Outcome::Retry(TestError) }, |_, wait, _| waits.push(wait))
        .await;
    assert_eq!(result, Err(TestError));
    waits
}

fn mean_secs(waits: &[Duration]) -> f64 {
    waits.iter().map(Duration::as_secs_f64).sum::<f64>() / waits.len() as f64
}

fn assert_close(actual: Duration, expected_secs: f64) {
    assert!(
        (actual.as_secs_f64() - expected_secs).abs() < 1e-6,
        "{:?} != {}s",
        actual,
        expected_secs
    );
}

#[tokio::test(start_paused = true)]
async fn poll_adopts_mean_and_reset_restores_original() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    let backoff = instant_backoff();
    let original = backoff.snapshot();
    backoff.auto_tune(Duration::from_secs(10), Duration::from_secs(20)).unwrap();

    let waits = failing_run(&backoff).await;
    assert_eq!(waits.len(), 4);
    let mean = mean_secs(&waits);

    // POLL ends at 10s.
    tokio::time::sleep(Duration::from_secs(10) + ms(1)).await;
    let tuned = backoff.snapshot();
    assert_close(tuned.min, mean);
    assert_eq!(tuned.original_min, ms(100));
    let expected_factor = (1.0 / tuned.min.as_secs_f64()).powf(0.25);
    assert!((tuned.factor - expected_factor).abs() < 1e-9);
    assert_close(backoff.wait_for(5), 1.0);

    // RESET ends at 30s.
    tokio::time::sleep(Duration::from_secs(20)).await;
    assert_eq!(backoff.snapshot(), original);

    backoff.close().await;
}

#[tokio::test(start_paused = true)]
async fn poll_without_samples_keeps_min() {
    let backoff = instant_backoff();
    let original = backoff.snapshot();
    backoff.auto_tune(Duration::from_secs(5), Duration::from_secs(5)).unwrap();

    tokio::time::sleep(Duration::from_secs(5) + ms(1)).await;
    assert_eq!(backoff.snapshot(), original);

    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(backoff.snapshot(), original);
    backoff.close().await;
}

#[tokio::test(start_paused = true)]
async fn samples_are_drained_by_each_poll() {
    let backoff = instant_backoff();
    backoff.auto_tune(Duration::from_secs(10), Duration::from_secs(20)).unwrap();

    let first = failing_run(&backoff).await;
    tokio::time::sleep(Duration::from_secs(10) + ms(1)).await;
    assert_close(backoff.snapshot().min, mean_secs(&first));

    // Recorded during RESET against the tuned schedule; only these feed the next POLL.
    let second = failing_run(&backoff).await;
    assert_close(second[0], mean_secs(&first));

    // RESET ends at 30s, next POLL at 40s.
    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_close(backoff.snapshot().min, mean_secs(&second));

    backoff.close().await;
}

#[tokio::test(start_paused = true)]
async fn close_interrupts_a_long_phase() {
    let backoff = instant_backoff();
    let original = backoff.snapshot();
    backoff.auto_tune(Duration::from_secs(3600), Duration::from_secs(3600)).unwrap();
    failing_run(&backoff).await;

    tokio::time::sleep(Duration::from_secs(1)).await;
    let start = tokio::time::Instant::now();
    backoff.close().await;
    assert!(start.elapsed() < Duration::from_secs(1));

    // Nothing adjusts min once the controller is gone, even with samples pending.
    failing_run(&backoff).await;
    tokio::time::sleep(Duration::from_secs(3 * 3600)).await;
    assert_eq!(backoff.snapshot(), original);

    backoff.close().await;
}

#[tokio::test(start_paused = true)]
async fn in_flight_run_survives_close() {
    let backoff = std::sync::Arc::new(
        Backoff::new(3, Duration::from_secs(1), Duration::from_secs(4)).expect("valid backoff"),
    );
    backoff.auto_tune(Duration::from_secs(60), Duration::from_secs(60)).unwrap();

    let runner = backoff.clone();
    let (first_wait_tx, first_wait_rx) = tokio::sync::oneshot::channel();
    let handle = tokio::spawn(async move {
        let mut attempts = 0;
        let mut first_wait_tx = Some(first_wait_tx);
        runner
            .run_with_notify(
                move || {
                    attempts += 1;
                    let step = attempts;
                    async move {
                        if step < 3 {
                            Outcome::Retry(TestError)
                        } else {
                            Outcome::Success(step)
                        }
                    }
                },
                |attempt, _, _| {
                    if let Some(tx) = first_wait_tx.take() {
                        let _ = tx.send(attempt);
                    }
                },
            )
            .await
    });

    // The run is about to sleep after its first failure when close starts.
    assert_eq!(first_wait_rx.await.unwrap(), 1);
    backoff.close().await;
    assert_eq!(handle.await.unwrap(), Ok(3));
}
