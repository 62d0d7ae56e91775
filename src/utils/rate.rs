use log::debug;
use std::num::NonZeroU32;
use std::thread;
use std::time::{Duration, Instant};

/// Paces batched output to a target bitrate.
///
/// Shaping is "compute, then sleep" on the calling thread: after each flush
/// of `n` bytes the shaper works out how long that flush should have taken
/// at the configured rate and sleeps off whatever part of it has not already
/// elapsed since the previous flush. Nothing runs in the background.
///
/// Example:
/// ```
/// use tsio::utils::RateShaper;
/// use std::num::NonZeroU32;
/// use std::time::Duration;
///
/// let mut shaper = RateShaper::new();
/// shaper.set_bitrate(NonZeroU32::new(8_000));
/// assert_eq!(shaper.expected_duration(1_000), Some(Duration::from_secs(1)));
/// ```
#[derive(Debug, Default)]
pub struct RateShaper {
    bitrate: Option<NonZeroU32>,
    last_flush: Option<Instant>,
}

impl RateShaper {
    /// Creates an unshaped pacer
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the bitrate in bits per second; `None` disables shaping.
    pub fn set_bitrate(&mut self, bitrate: Option<NonZeroU32>) {
        self.bitrate = bitrate;
        if bitrate.is_none() {
            self.last_flush = None;
        }
    }

    /// Configured bitrate, `None` when shaping is off.
    pub fn bitrate(&self) -> Option<NonZeroU32> {
        self.bitrate
    }

    /// Time `bytes` should take on the wire at the configured rate.
    pub fn expected_duration(&self, bytes: usize) -> Option<Duration> {
        let bitrate = self.bitrate?.get() as u128;
        let nanos = bytes as u128 * 8 * 1_000_000_000 / bitrate;
        Some(Duration::from_nanos(nanos.min(u64::MAX as u128) as u64))
    }

    /// Sleeps as needed after a flush of `bytes`; returns the time slept.
    pub fn pace(&mut self, bytes: usize) -> Duration {
        let Some(expected) = self.expected_duration(bytes) else {
            return Duration::ZERO;
        };

        let mut slept = Duration::ZERO;
        if let Some(last) = self.last_flush {
            let elapsed = last.elapsed();
            if elapsed < expected {
                slept = expected - elapsed;
                debug!(
                    "Pacing {} bytes: elapsed {:?}, expected {:?}, sleeping {:?}",
                    bytes, elapsed, expected, slept
                );
                thread::sleep(slept);
            }
        }

        self.last_flush = Some(Instant::now());
        slept
    }
}
