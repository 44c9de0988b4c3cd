//! Per-step progressive reveal.
//!
//! Opening a step is not instant: it passes through `Pending` for a fixed
//! delay. Delays are plain deadlines read against an injectable [`Clock`],
//! so tests drive them with [`ManualClock`] and cancellation is just
//! dropping the deadline.

use shield_shared::error::{ShieldError, ShieldResult};
use shield_shared::report::STEP_COUNT;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

pub const LABEL_CLOSED: &str = "Analyze";
pub const LABEL_PENDING: &str = "Analyzing...";
pub const LABEL_OPEN: &str = "Close";

pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Clock that only moves when told to
#[derive(Debug)]
pub struct ManualClock {
    base: Instant,
    offset: Mutex<Duration>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            base: Instant::now(),
            offset: Mutex::new(Duration::ZERO),
        }
    }

    pub fn advance(&self, by: Duration) {
        if let Ok(mut offset) = self.offset.lock() {
            *offset += by;
        }
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        let offset = self.offset.lock().map(|o| *o).unwrap_or_default();
        self.base + offset
    }
}

/// A started delay; due once the clock reaches `ready_at`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RevealDelay {
    ready_at: Instant,
}

impl RevealDelay {
    pub fn start(clock: &dyn Clock, delay: Duration) -> Self {
        Self {
            ready_at: clock.now() + delay,
        }
    }

    pub fn is_due(&self, now: Instant) -> bool {
        now >= self.ready_at
    }

    pub fn remaining(&self, now: Instant) -> Duration {
        self.ready_at.saturating_duration_since(now)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevealState {
    Closed,
    Pending,
    Open,
}

impl RevealState {
    /// Button text for a step in this state
    pub fn label(&self) -> &'static str {
        match self {
            RevealState::Closed => LABEL_CLOSED,
            RevealState::Pending => LABEL_PENDING,
            RevealState::Open => LABEL_OPEN,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Closed,
    Pending(RevealDelay),
    Open,
}

/// Reveal state of the six step slots of one displayed report
pub struct StepReveal {
    clock: Arc<dyn Clock>,
    delay: Duration,
    slots: [Slot; STEP_COUNT as usize],
}

impl StepReveal {
    pub fn new(clock: Arc<dyn Clock>, delay: Duration) -> Self {
        Self {
            clock,
            delay,
            slots: [Slot::Closed; STEP_COUNT as usize],
        }
    }

    fn slot_index(index: u8) -> ShieldResult<usize> {
        if (1..=STEP_COUNT).contains(&index) {
            Ok(index as usize - 1)
        } else {
            Err(ShieldError::Input(format!(
                "step {} does not exist (valid steps are 1 to {})",
                index, STEP_COUNT
            )))
        }
    }

    fn observe(&self, slot: Slot) -> RevealState {
        match slot {
            Slot::Closed => RevealState::Closed,
            Slot::Open => RevealState::Open,
            Slot::Pending(delay) if delay.is_due(self.clock.now()) => RevealState::Open,
            Slot::Pending(_) => RevealState::Pending,
        }
    }

    pub fn state(&self, index: u8) -> ShieldResult<RevealState> {
        Ok(self.observe(self.slots[Self::slot_index(index)?]))
    }

    pub fn states(&self) -> Vec<RevealState> {
        self.slots.iter().map(|s| self.observe(*s)).collect()
    }

    pub fn label(&self, index: u8) -> ShieldResult<&'static str> {
        Ok(self.state(index)?.label())
    }

    /// Closed starts the delay, Pending is ignored, Open closes at once
    pub fn toggle(&mut self, index: u8) -> ShieldResult<RevealState> {
        let i = Self::slot_index(index)?;
        let next = match self.observe(self.slots[i]) {
            RevealState::Closed => {
                let delay = RevealDelay::start(self.clock.as_ref(), self.delay);
                tracing::debug!("Step {} reveal pending for {:?}", index, self.delay);
                Slot::Pending(delay)
            }
            RevealState::Pending => return Ok(RevealState::Pending),
            RevealState::Open => Slot::Closed,
        };
        self.slots[i] = next;
        Ok(self.observe(next))
    }

    /// Settle every due delay; returns the steps that just opened
    pub fn tick(&mut self) -> Vec<u8> {
        let now = self.clock.now();
        let mut opened = Vec::new();
        for (i, slot) in self.slots.iter_mut().enumerate() {
            if let Slot::Pending(delay) = slot {
                if delay.is_due(now) {
                    *slot = Slot::Open;
                    opened.push(i as u8 + 1);
                }
            }
        }
        opened
    }

    /// Time until the given step's pending delay elapses
    pub fn remaining(&self, index: u8) -> ShieldResult<Option<Duration>> {
        Ok(match self.slots[Self::slot_index(index)?] {
            Slot::Pending(delay) => Some(delay.remaining(self.clock.now())),
            _ => None,
        })
    }

    /// Drop outstanding delays without opening their steps
    pub fn cancel_pending(&mut self) {
        for slot in self.slots.iter_mut() {
            if matches!(slot, Slot::Pending(_)) {
                *slot = Slot::Closed;
            }
        }
    }

    /// Open a step without a delay; out-of-range steps are ignored
    pub fn open_now(&mut self, index: u8) {
        if let Ok(i) = Self::slot_index(index) {
            self.slots[i] = Slot::Open;
        }
    }

    pub fn close_all(&mut self) {
        self.slots = [Slot::Closed; STEP_COUNT as usize];
    }

    pub fn open_all(&mut self) {
        self.slots = [Slot::Open; STEP_COUNT as usize];
    }

    pub fn pending_count(&self) -> usize {
        self.states()
            .iter()
            .filter(|s| **s == RevealState::Pending)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reveal(delay_ms: u64) -> (Arc<ManualClock>, StepReveal) {
        let clock = Arc::new(ManualClock::new());
        let reveal = StepReveal::new(clock.clone(), Duration::from_millis(delay_ms));
        (clock, reveal)
    }

    #[test]
    fn test_open_after_delay() {
        let (clock, mut reveal) = reveal(750);
        assert_eq!(reveal.toggle(2).unwrap(), RevealState::Pending);
        assert_eq!(reveal.label(2).unwrap(), LABEL_PENDING);
        clock.advance(Duration::from_millis(749));
        assert_eq!(reveal.state(2).unwrap(), RevealState::Pending);
        clock.advance(Duration::from_millis(1));
        assert_eq!(reveal.state(2).unwrap(), RevealState::Open);
        assert_eq!(reveal.label(2).unwrap(), LABEL_OPEN);
    }

    #[test]
    fn test_toggle_while_pending_is_noop() {
        let (clock, mut reveal) = reveal(750);
        reveal.toggle(1).unwrap();
        clock.advance(Duration::from_millis(500));
        assert_eq!(reveal.toggle(1).unwrap(), RevealState::Pending);
        // the second toggle must not restart the delay
        clock.advance(Duration::from_millis(250));
        assert_eq!(reveal.state(1).unwrap(), RevealState::Open);
    }

    #[test]
    fn test_close_is_immediate() {
        let (clock, mut reveal) = reveal(750);
        reveal.toggle(3).unwrap();
        clock.advance(Duration::from_millis(750));
        assert_eq!(reveal.toggle(3).unwrap(), RevealState::Closed);
        assert_eq!(reveal.label(3).unwrap(), LABEL_CLOSED);
    }

    #[test]
    fn test_independent_deadlines() {
        let (clock, mut reveal) = reveal(750);
        reveal.toggle(1).unwrap();
        clock.advance(Duration::from_millis(400));
        reveal.toggle(4).unwrap();
        assert_eq!(reveal.pending_count(), 2);
        clock.advance(Duration::from_millis(350));
        assert_eq!(reveal.tick(), vec![1]);
        assert_eq!(reveal.state(4).unwrap(), RevealState::Pending);
        clock.advance(Duration::from_millis(400));
        assert_eq!(reveal.tick(), vec![4]);
    }

    #[test]
    fn test_cancel_pending_keeps_open_steps() {
        let (clock, mut reveal) = reveal(100);
        reveal.toggle(1).unwrap();
        clock.advance(Duration::from_millis(100));
        reveal.toggle(2).unwrap();
        reveal.cancel_pending();
        assert_eq!(reveal.state(1).unwrap(), RevealState::Open);
        assert_eq!(reveal.state(2).unwrap(), RevealState::Closed);
    }

    #[test]
    fn test_invalid_step_index() {
        let (_, mut reveal) = reveal(100);
        assert!(reveal.toggle(0).is_err());
        assert!(reveal.state(7).is_err());
    }

    #[test]
    fn test_remaining() {
        let (clock, mut reveal) = reveal(750);
        reveal.toggle(6).unwrap();
        clock.advance(Duration::from_millis(250));
        assert_eq!(
            reveal.remaining(6).unwrap(),
            Some(Duration::from_millis(500))
        );
        assert_eq!(reveal.remaining(5).unwrap(), None);
    }
}
