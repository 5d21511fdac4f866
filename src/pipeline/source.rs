//! Counts source abstraction.
//!
//! Provides a unified trait for where per-direction counts come from:
//! a seeded random simulator, or a live sensor feed of JSON lines.
//! Implementations handle parsing and pacing internally; the counts loop
//! calls [`CountsSource::next_snapshot`] in a `select!` with cancellation.

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Deserialize;
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::time::Interval;

use crate::config::CountsConfig;
use crate::types::{CountsSnapshot, DirectionCounts};

#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("sensor feed read failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Trait abstracting where counts come from.
#[async_trait]
pub trait CountsSource: Send + 'static {
    /// Wait for the next snapshot.
    ///
    /// Returns `Ok(None)` when the source is exhausted.
    async fn next_snapshot(&mut self) -> Result<Option<CountsSnapshot>, SourceError>;

    /// Human-readable name for logging (e.g. "simulated", "sensor-feed").
    fn source_name(&self) -> &str;
}

// ============================================================================
// Simulated Source
// ============================================================================

/// Independent uniform draws per approach, one snapshot per period.
///
/// Vehicles come from `[vehicle_min, vehicle_max)` and pedestrians from
/// `[pedestrian_min, pedestrian_max)`. There is no correlation with signal
/// phase or previous output. Snapshots follow a fixed-rate clock started by
/// the first call to [`CountsSource::next_snapshot`], so processing time
/// does not stretch the period.
pub struct SimulatedCounts {
    rng: StdRng,
    ranges: CountsConfig,
    period: Duration,
    ticker: Option<Interval>,
}

impl SimulatedCounts {
    pub fn new(ranges: CountsConfig, period: Duration) -> Self {
        Self {
            rng: StdRng::from_entropy(),
            ranges,
            period,
            ticker: None,
        }
    }

    /// Deterministic variant for tests and replays.
    pub fn with_seed(ranges: CountsConfig, period: Duration, seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            ranges,
            period,
            ticker: None,
        }
    }

    /// Draw one snapshot immediately.
    pub fn generate(&mut self) -> CountsSnapshot {
        let vehicles = Self::draw(&mut self.rng, self.ranges.vehicle_min, self.ranges.vehicle_max);
        let pedestrians = self.ranges.include_pedestrians.then(|| {
            Self::draw(
                &mut self.rng,
                self.ranges.pedestrian_min,
                self.ranges.pedestrian_max,
            )
        });
        CountsSnapshot::now(vehicles, pedestrians)
    }

    fn draw(rng: &mut StdRng, min: u32, max: u32) -> DirectionCounts {
        // Config validation guarantees min < max; guard anyway so an empty
        // range degrades to a constant instead of panicking.
        let mut one = || if min < max { rng.gen_range(min..max) } else { min };
        DirectionCounts::new(one(), one(), one(), one())
    }
}

#[async_trait]
impl CountsSource for SimulatedCounts {
    async fn next_snapshot(&mut self) -> Result<Option<CountsSnapshot>, SourceError> {
        if !self.period.is_zero() {
            let period = self.period;
            let ticker = self.ticker.get_or_insert_with(|| {
                tokio::time::interval_at(tokio::time::Instant::now() + period, period)
            });
            ticker.tick().await;
        }
        Ok(Some(self.generate()))
    }

    fn source_name(&self) -> &str {
        "simulated"
    }
}

// ============================================================================
// Sensor Feed Source (JSON counts, one per line)
// ============================================================================

/// One line of a sensor feed: either a full snapshot or vehicle counts only.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SensorLine {
    Full {
        vehicles: DirectionCounts,
        #[serde(default)]
        pedestrians: Option<DirectionCounts>,
    },
    Vehicles(DirectionCounts),
}

/// Reads JSON-formatted counts from any line-oriented reader.
///
/// Used with a detector bridge:
/// `detector_bridge | ./signal-board --sensor-stdin`
pub struct SensorFeedCounts<R> {
    reader: R,
    line_buffer: String,
}

impl<R: AsyncBufRead + Unpin + Send + 'static> SensorFeedCounts<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line_buffer: String::with_capacity(256),
        }
    }
}

impl SensorFeedCounts<tokio::io::BufReader<tokio::io::Stdin>> {
    pub fn stdin() -> Self {
        Self::new(tokio::io::BufReader::new(tokio::io::stdin()))
    }
}

#[async_trait]
impl<R: AsyncBufRead + Unpin + Send + 'static> CountsSource for SensorFeedCounts<R> {
    async fn next_snapshot(&mut self) -> Result<Option<CountsSnapshot>, SourceError> {
        loop {
            self.line_buffer.clear();
            let bytes = self.reader.read_line(&mut self.line_buffer).await?;
            if bytes == 0 {
                return Ok(None);
            }
            let line = self.line_buffer.trim();
            if line.is_empty() {
                continue;
            }
            match serde_json::from_str::<SensorLine>(line) {
                Ok(SensorLine::Full {
                    vehicles,
                    pedestrians,
                }) => return Ok(Some(CountsSnapshot::now(vehicles, pedestrians))),
                Ok(SensorLine::Vehicles(vehicles)) => {
                    return Ok(Some(CountsSnapshot::now(vehicles, None)))
                }
                Err(e) => {
                    tracing::warn!("[SensorFeed] Failed to parse counts line: {}", e);
                    // Skip malformed lines and keep reading
                }
            }
        }
    }

    fn source_name(&self) -> &str {
        "sensor-feed"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simulated_counts_within_bounds() {
        let mut src = SimulatedCounts::with_seed(CountsConfig::default(), Duration::ZERO, 7);
        for _ in 0..500 {
            let snap = src.generate();
            for v in snap.vehicles.values() {
                assert!((20..90).contains(&v), "vehicle count {v} out of range");
            }
            let peds = snap.pedestrians.expect("pedestrians enabled by default");
            for p in peds.values() {
                assert!((5..30).contains(&p), "pedestrian count {p} out of range");
            }
        }
    }

    #[test]
    fn test_simulated_counts_custom_range_and_no_pedestrians() {
        let ranges = CountsConfig {
            vehicle_min: 3,
            vehicle_max: 4,
            include_pedestrians: false,
            ..CountsConfig::default()
        };
        let mut src = SimulatedCounts::with_seed(ranges, Duration::ZERO, 1);
        let snap = src.generate();
        assert_eq!(snap.vehicles, DirectionCounts::new(3, 3, 3, 3));
        assert!(snap.pedestrians.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_simulated_period_does_not_drift() {
        let period = Duration::from_secs(5);
        let mut src = SimulatedCounts::with_seed(CountsConfig::default(), period, 9);
        let start = tokio::time::Instant::now();

        for n in 1..=4u32 {
            src.next_snapshot().await.unwrap().unwrap();
            assert_eq!(start.elapsed(), period * n);
            // Work between snapshots eats into the wait, not the schedule.
            tokio::time::sleep(Duration::from_secs(2)).await;
        }
    }

    #[test]
    fn test_same_seed_same_sequence() {
        let mut a = SimulatedCounts::with_seed(CountsConfig::default(), Duration::ZERO, 42);
        let mut b = SimulatedCounts::with_seed(CountsConfig::default(), Duration::ZERO, 42);
        for _ in 0..10 {
            assert_eq!(a.generate().vehicles, b.generate().vehicles);
        }
    }

    #[tokio::test]
    async fn test_sensor_feed_parses_both_shapes_and_skips_garbage() {
        let input: &[u8] = b"{\"north\":1,\"south\":2,\"east\":3,\"west\":4}\n\
            not json\n\
            \n\
            {\"vehicles\":{\"north\":5,\"south\":6,\"east\":7,\"west\":8},\"pedestrians\":{\"north\":1,\"south\":1,\"east\":1,\"west\":1}}\n";
        let mut src = SensorFeedCounts::new(input);

        let first = src.next_snapshot().await.unwrap().unwrap();
        assert_eq!(first.vehicles, DirectionCounts::new(1, 2, 3, 4));
        assert!(first.pedestrians.is_none());

        let second = src.next_snapshot().await.unwrap().unwrap();
        assert_eq!(second.vehicles.total(), 26);
        assert_eq!(second.pedestrians.unwrap().total(), 4);

        assert!(src.next_snapshot().await.unwrap().is_none());
    }
}
