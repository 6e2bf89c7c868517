use std::time::{Duration, Instant};

/// Holds a generated source to real-time speed.
///
/// Tracks frames handed out since the first read and sleeps until the wall
/// clock catches up, the way a device buffer fills.
#[derive(Debug)]
pub struct Pacer {
    sample_rate: u32,
    started: Option<Instant>,
    frames: u64,
}

impl Pacer {
    /// Creates a pacer for `sample_rate` frames per second.
    pub fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            started: None,
            frames: 0,
        }
    }

    /// Records `frames` more frames and blocks until they are due.
    pub fn pace(&mut self, frames: u64) {
        let started = *self.started.get_or_insert_with(Instant::now);
        self.frames += frames;
        let due = started + self.elapsed_for(self.frames);
        let now = Instant::now();
        if due > now {
            std::thread::sleep(due - now);
        }
    }

    /// Wall-clock time covered by `frames`.
    fn elapsed_for(&self, frames: u64) -> Duration {
        if self.sample_rate == 0 {
            return Duration::ZERO;
        }
        let rate = self.sample_rate as u64;
        Duration::new(
            frames / rate,
            ((frames % rate) * 1_000_000_000 / rate) as u32,
        )
    }
}
