use crate::countdown::Countdown;
use std::{
    collections::VecDeque,
    time::Duration,
};

/// Queue of granted item ids shown to the player one at a time.
#[derive(Clone, Debug)]
pub struct RevealSequencer {
    queue: VecDeque<u64>,
    current: Option<u64>,
    window: Countdown,
    interval: Duration,
    advance_requested: bool,
}

impl RevealSequencer {
    pub fn new(interval: Duration) -> Self {
        Self {
            queue: VecDeque::new(),
            current: None,
            window: Countdown::default(),
            interval,
            advance_requested: false,
        }
    }

    pub fn clear(&mut self) {
        self.queue.clear();
        self.current = None;
        self.window.stop();
        self.advance_requested = false;
    }

    pub fn push(&mut self, item_id: u64) {
        self.queue.push_back(item_id);
    }

    /// Items waiting behind the current reveal.
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    pub fn queued(&self) -> impl Iterator<Item = &u64> {
        self.queue.iter()
    }

    pub fn current(&self) -> Option<u64> {
        self.current
    }

    /// Whether `item_id` is the current reveal or waiting in the queue.
    pub fn holds(&self, item_id: u64) -> bool {
        self.current == Some(item_id) || self.queue.contains(&item_id)
    }

    pub fn can_show_next(&self) -> bool {
        !self.queue.is_empty()
    }

    pub fn is_exhausted(&self) -> bool {
        self.queue.is_empty()
    }

    /// Dequeue the head as the current reveal and restart the window.
    pub fn reveal_next(&mut self) -> Option<u64> {
        let next = self.queue.pop_front()?;
        self.current = Some(next);
        self.window.start(self.interval);
        self.advance_requested = false;
        Some(next)
    }

    /// Player asked for the next item. Reveals straight away unless the
    /// current reveal's window is still open, in which case the advance is
    /// deferred to the tick that closes it.
    pub fn request_next(&mut self) -> Option<u64> {
        if self.queue.is_empty() {
            return None;
        }
        if self.window.is_running() {
            self.advance_requested = true;
            return None;
        }
        self.reveal_next()
    }

    pub fn tick(&mut self, dt: Duration) -> Option<u64> {
        self.window.advance(dt);
        if self.advance_requested && !self.window.is_running() {
            return self.reveal_next();
        }
        None
    }

    /// Drop the current reveal once the player has dismissed it.
    pub fn dismiss(&mut self) -> Option<u64> {
        self.window.stop();
        self.current.take()
    }
}
