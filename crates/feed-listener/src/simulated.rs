//! Simulated Sensor Feed

use async_trait::async_trait;
use rand::Rng;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::source::{Canceller, FeedSource, RawSubscription};
use crate::FeedError;

/// Default generation interval
pub const DEFAULT_SIMULATION_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Debug, Default)]
struct Generator {
    subscribers: Vec<(u64, mpsc::UnboundedSender<Value>)>,
    next_id: u64,
    timer: Option<JoinHandle<()>>,
}

fn lock(generator: &Mutex<Generator>) -> MutexGuard<'_, Generator> {
    generator.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Timer-driven generator for running without hardware
///
/// One timer serves every subscription: each tick generates a single
/// composite payload, with temperature 25-30 °C, TDS 300-400 ppm and a
/// High/Low water level, and sends it to every channel. Split listeners pick
/// their field out of it, so one tick is one physical reading. The timer
/// stops once the last subscription is cancelled. Clones share the timer.
#[derive(Debug, Clone)]
pub struct SimulatedFeed {
    interval: Duration,
    generator: Arc<Mutex<Generator>>,
}

impl SimulatedFeed {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            generator: Arc::default(),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Generate one payload
    pub fn generate() -> Value {
        let mut rng = rand::rng();
        let temperature = (rng.random_range(25.0..30.0_f64) * 10.0).round() / 10.0;
        let tds: u32 = rng.random_range(300..400);
        let water_level = if rng.random_bool(0.5) { "High" } else { "Low" };

        json!({
            "temperature": temperature,
            "tds": tds,
            "waterLevel": water_level,
        })
    }

    /// Whether the shared timer is running
    pub fn is_ticking(&self) -> bool {
        lock(&self.generator).timer.is_some()
    }
}

impl Default for SimulatedFeed {
    fn default() -> Self {
        Self::new(DEFAULT_SIMULATION_INTERVAL)
    }
}

async fn tick(generator: Arc<Mutex<Generator>>, period: Duration) {
    let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
    loop {
        ticker.tick().await;
        let payload = SimulatedFeed::generate();

        let mut state = lock(&generator);
        state.subscribers.retain(|(_, tx)| tx.send(payload.clone()).is_ok());
        if state.subscribers.is_empty() {
            debug!("Simulation has no receivers, stopping");
            state.timer = None;
            break;
        }
    }
}

#[async_trait]
impl FeedSource for SimulatedFeed {
    fn name(&self) -> &str {
        "simulated"
    }

    async fn subscribe(&self, channel: &str) -> Result<RawSubscription, FeedError> {
        if self.interval.is_zero() {
            return Err(FeedError::Config("simulation interval must be non-zero".to_string()));
        }

        let (tx, rx) = mpsc::unbounded_channel();
        let id = {
            let mut generator = lock(&self.generator);
            generator.next_id += 1;
            let id = generator.next_id;
            generator.subscribers.push((id, tx));
            if generator.timer.is_none() {
                info!("Simulating readings every {:?}", self.interval);
                generator.timer = Some(tokio::spawn(tick(self.generator.clone(), self.interval)));
            }
            id
        };
        debug!("Simulated channel '{}' attached as subscriber {}", channel, id);

        let shared = self.generator.clone();
        let canceller = Canceller::new(move || {
            let mut generator = lock(&shared);
            generator.subscribers.retain(|(sub_id, _)| *sub_id != id);
            if generator.subscribers.is_empty() {
                if let Some(timer) = generator.timer.take() {
                    timer.abort();
                    debug!("Simulation timer stopped");
                }
            }
        });

        Ok(RawSubscription::new(channel, rx, canceller))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_ranges() {
        for _ in 0..100 {
            let payload = SimulatedFeed::generate();
            let temperature = payload["temperature"].as_f64().unwrap();
            let tds = payload["tds"].as_u64().unwrap();
            assert!((25.0..=30.0).contains(&temperature));
            assert!((300..400).contains(&tds));
            assert!(matches!(payload["waterLevel"].as_str(), Some("High") | Some("Low")));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_ticks_until_cancelled() {
        let feed = SimulatedFeed::new(Duration::from_secs(5));
        let mut sub = feed.subscribe("water").await.unwrap();

        tokio::time::sleep(Duration::from_secs(11)).await;
        assert!(sub.payloads.try_recv().is_ok());
        assert!(sub.payloads.try_recv().is_ok());
        assert!(sub.payloads.try_recv().is_err());

        sub.canceller.cancel();
        tokio::time::sleep(Duration::from_secs(20)).await;
        assert!(sub.payloads.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_one_timer_feeds_every_channel() {
        let feed = SimulatedFeed::new(Duration::from_secs(1));
        let mut temperature = feed.subscribe("Temperature").await.unwrap();
        let mut tds = feed.subscribe("TDS").await.unwrap();

        tokio::time::sleep(Duration::from_millis(1_500)).await;
        let a = temperature.payloads.try_recv().unwrap();
        let b = tds.payloads.try_recv().unwrap();
        assert_eq!(a, b);
        assert!(temperature.payloads.try_recv().is_err());

        temperature.canceller.cancel();
        assert!(feed.is_ticking());
        tds.canceller.cancel();
        assert!(!feed.is_ticking());
    }

    #[tokio::test]
    async fn test_zero_interval_rejected() {
        let feed = SimulatedFeed::new(Duration::ZERO);
        assert!(matches!(feed.subscribe("water").await, Err(FeedError::Config(_))));
    }
}
