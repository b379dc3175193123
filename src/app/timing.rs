use std::time::{Duration, Instant};

const SAMPLE_WINDOW: Duration = Duration::from_millis(500);

/// Frame rate averaged over half-second windows.
pub struct FpsCounter {
    window_start: Instant,
    frames: u32,
}

impl FpsCounter {
    pub fn new(now: Instant) -> Self {
        Self {
            window_start: now,
            frames: 0,
        }
    }

    /// Counts a presented frame. Returns the new rate once a window closes.
    pub fn tick(&mut self, now: Instant) -> Option<f32> {
        self.frames = self.frames.saturating_add(1);
        let elapsed = now.saturating_duration_since(self.window_start);
        if elapsed < SAMPLE_WINDOW {
            return None;
        }
        let fps = self.frames as f32 / elapsed.as_secs_f32();
        self.frames = 0;
        self.window_start = now;
        Some(fps)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reports_once_per_window() {
        let start = Instant::now();
        let mut counter = FpsCounter::new(start);
        for frame in 1..30 {
            assert_eq!(counter.tick(start + Duration::from_millis(frame * 16)), None);
        }
        let fps = counter.tick(start + Duration::from_millis(500)).unwrap();
        assert!((fps - 60.0).abs() < 0.01);
        assert_eq!(counter.tick(start + Duration::from_millis(516)), None);
    }
}
