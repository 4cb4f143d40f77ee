use crate::metrics;
use tokio::sync::Mutex;
use tokio::time::{sleep, Duration, Instant};
use tracing::debug;

/// Token-bucket throttle shared by every outbound RPC call.
///
/// Slots regenerate continuously at `rate` per `interval`, up to a burst of
/// `rate`. Callers that find the bucket empty are suspended, never rejected.
/// The bucket lock is held while a caller sleeps, so waiters are served in
/// the order they arrived (tokio's mutex is FIFO).
#[derive(Debug)]
pub struct RateGate {
    capacity: f64,
    slots_per_sec: f64,
    bucket: Mutex<Bucket>,
}

#[derive(Debug)]
struct Bucket {
    available: f64,
    refreshed_at: Instant,
}

impl RateGate {
    /// Allow `rate` acquisitions per `interval`.
    pub fn new(rate: u32, interval: Duration) -> Self {
        let capacity = f64::from(rate.max(1));
        let interval = interval.as_secs_f64().max(f64::EPSILON);

        Self {
            capacity,
            slots_per_sec: capacity / interval,
            bucket: Mutex::new(Bucket {
                available: capacity,
                refreshed_at: Instant::now(),
            }),
        }
    }

    pub fn per_second(rate: u32) -> Self {
        Self::new(rate, Duration::from_secs(1))
    }

    /// Wait until one slot is free and take it.
    pub async fn acquire(&self) {
        let started = Instant::now();
        let mut bucket = self.bucket.lock().await;

        loop {
            self.refill(&mut bucket);
            if bucket.available >= 1.0 {
                bucket.available -= 1.0;
                break;
            }

            let missing = 1.0 - bucket.available;
            let wait = Duration::from_secs_f64(missing / self.slots_per_sec);
            debug!(wait_ms = wait.as_millis() as u64, "Rate gate saturated, waiting for a slot");
            sleep(wait).await;
        }

        metrics::RATE_GATE_WAIT.observe(started.elapsed().as_secs_f64());
    }

    /// Take `count` slots one at a time, so a batch larger than the burst
    /// size still drains at the configured rate.
    pub async fn acquire_many(&self, count: usize) {
        for _ in 0..count {
            self.acquire().await;
        }
    }

    fn refill(&self, bucket: &mut Bucket) {
        let now = Instant::now();
        let elapsed = now.saturating_duration_since(bucket.refreshed_at).as_secs_f64();
        bucket.available = (bucket.available + elapsed * self.slots_per_sec).min(self.capacity);
        bucket.refreshed_at = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn burst_within_capacity_does_not_wait() {
        let gate = RateGate::per_second(10);
        let start = Instant::now();

        gate.acquire_many(10).await;

        assert!(start.elapsed() < Duration::from_millis(1));
    }

    /// The bucket starts full, so the first 10 calls pass at once and only
    /// the remaining 15 wait for refill: 1.5 s. That is the lower end of "about
    /// two intervals"; a gate starting empty would take the full 2.5 s.
    #[tokio::test(start_paused = true)]
    async fn twenty_five_calls_take_at_least_one_and_a_half_intervals() {
        let gate = RateGate::per_second(10);
        let start = Instant::now();

        gate.acquire_many(25).await;

        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(1490), "elapsed {:?}", elapsed);
        assert!(elapsed < Duration::from_millis(1600), "elapsed {:?}", elapsed);
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_callers_are_all_admitted() {
        let gate = Arc::new(RateGate::per_second(10));
        let start = Instant::now();

        let handles: Vec<_> = (0..25)
            .map(|_| {
                let gate = gate.clone();
                tokio::spawn(async move { gate.acquire().await })
            })
            .collect();

        for handle in futures::future::join_all(handles).await {
            tokio_test::assert_ok!(handle);
        }

        assert!(start.elapsed() >= Duration::from_millis(1490));
    }

    #[tokio::test(start_paused = true)]
    async fn slots_regenerate_continuously() {
        let gate = RateGate::per_second(10);
        gate.acquire_many(10).await;

        tokio::time::advance(Duration::from_millis(350)).await;
        let start = Instant::now();
        gate.acquire_many(3).await;

        assert!(start.elapsed() < Duration::from_millis(1));
    }
}
