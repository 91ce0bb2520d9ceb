use std::time::{Duration, Instant};

/// Stopwatch the UI polls on every tick while a round is running
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Stopwatch {
    #[default]
    Idle,
    Running(Instant),
    Frozen(Duration),
}

impl Stopwatch {
    pub fn start_at(started: Instant) -> Self {
        Stopwatch::Running(started)
    }

    /// Stop at the duration measured by the session.
    pub fn freeze(&mut self, elapsed: Duration) {
        *self = Stopwatch::Frozen(elapsed);
    }

    pub fn is_running(&self) -> bool {
        matches!(self, Stopwatch::Running(_))
    }

    pub fn elapsed_at(&self, now: Instant) -> Duration {
        match *self {
            Stopwatch::Idle => Duration::ZERO,
            Stopwatch::Running(started) => now.saturating_duration_since(started),
            Stopwatch::Frozen(elapsed) => elapsed,
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed_at(Instant::now())
    }

    pub fn display(&self) -> String {
        match self {
            Stopwatch::Frozen(elapsed) => format!("{:.2} sec", elapsed.as_secs_f64()),
            _ => format!("{:.1} sec", self.elapsed().as_secs_f64()),
        }
    }
}
