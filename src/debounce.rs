//! Debounce plus distinct-until-changed for a single event stream.
//!
//! Every qualifying push re-arms the deadline. A push whose value equals the
//! last emitted one cancels anything pending and does not re-arm, so an edit
//! that is undone within the window never fires.

use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug)]
pub struct Debouncer<T> {
  window: Duration,
  pending: Option<T>,
  deadline: Option<Instant>,
  last_emitted: Option<T>,
}

impl<T: Clone + PartialEq> Debouncer<T> {
  pub fn new(window: Duration) -> Self {
    Self {
      window,
      pending: None,
      deadline: None,
      last_emitted: None,
    }
  }

  /// When the pending value becomes due, if any.
  pub fn deadline(&self) -> Option<Instant> {
    self.deadline
  }

  pub fn is_pending(&self) -> bool {
    self.pending.is_some()
  }

  /// Record a value without scheduling it, e.g. the initial form state.
  pub fn seed(&mut self, value: T) {
    self.last_emitted = Some(value);
  }

  pub fn push(&mut self, value: T, now: Instant) {
    if self.last_emitted.as_ref() == Some(&value) {
      self.pending = None;
      self.deadline = None;
      return;
    }
    self.pending = Some(value);
    self.deadline = Some(now + self.window);
  }

  /// Emit the pending value once its deadline has passed.
  pub fn poll(&mut self, now: Instant) -> Option<T> {
    match self.deadline {
      Some(deadline) if now >= deadline => {
        self.deadline = None;
        let value = self.pending.take()?;
        self.last_emitted = Some(value.clone());
        Some(value)
      }
      _ => None,
    }
  }

  /// Emit whatever is pending right away.
  pub fn flush(&mut self) -> Option<T> {
    self.deadline = None;
    let value = self.pending.take()?;
    self.last_emitted = Some(value.clone());
    Some(value)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  const WINDOW: Duration = Duration::from_millis(300);

  #[test]
  fn burst_collapses_into_last_value() {
    let start = Instant::now();
    let mut d = Debouncer::new(WINDOW);
    d.push(1, start);
    d.push(2, start + Duration::from_millis(100));
    d.push(3, start + Duration::from_millis(200));

    assert_eq!(d.poll(start + Duration::from_millis(400)), None);
    assert_eq!(d.poll(start + Duration::from_millis(500)), Some(3));
    assert!(!d.is_pending());
  }

  #[test]
  fn repeated_value_is_suppressed_before_the_timer() {
    let start = Instant::now();
    let mut d = Debouncer::new(WINDOW);
    d.push(1, start);
    assert_eq!(d.poll(start + WINDOW), Some(1));

    d.push(2, start + Duration::from_secs(1));
    d.push(1, start + Duration::from_millis(1100));
    assert_eq!(d.deadline(), None);
    assert_eq!(d.poll(start + Duration::from_secs(5)), None);
  }

  #[test]
  fn seeded_value_counts_as_emitted() {
    let mut d = Debouncer::new(WINDOW);
    d.seed("a");
    d.push("a", Instant::now());
    assert!(!d.is_pending());
    assert_eq!(d.flush(), None);
  }
}
