use std::time::Duration;

/// Monotonic countdown driven by explicit `advance` calls from the tick.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Countdown {
    remaining: Option<Duration>,
}

impl Countdown {
    pub fn start(&mut self, duration: Duration) {
        self.remaining = Some(duration);
    }

    pub fn stop(&mut self) {
        self.remaining = None;
    }

    pub fn advance(&mut self, dt: Duration) {
        if let Some(remaining) = self.remaining.as_mut() {
            *remaining = remaining.saturating_sub(dt);
        }
    }

    /// true once a started countdown has run down to zero
    pub fn is_elapsed(&self) -> bool {
        self.remaining == Some(Duration::ZERO)
    }

    pub fn is_running(&self) -> bool {
        self.remaining.is_some_and(|r| !r.is_zero())
    }

    pub fn remaining(&self) -> Option<Duration> {
        self.remaining
    }
}
