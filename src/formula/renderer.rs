use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;

use crate::formula::typeset::{EngineHandle, MathNode, RenderOptions};
use crate::html_escape;

pub type SharedNode = Arc<Mutex<MathNode>>;

/// Renders LaTeX through an injected engine and never lets a rendering
/// failure escape to the caller.
#[derive(Clone)]
pub struct FormulaRenderer {
  engine: EngineHandle,
  options: RenderOptions,
}

impl FormulaRenderer {
  /// Error-tolerant display-mode rendering with the `\f{#1}` macro.
  pub fn new(engine: EngineHandle) -> Self {
    Self {
      engine,
      options: RenderOptions::default(),
    }
  }

  /// Render raw or `$`-delimited LaTeX to markup.
  ///
  /// On engine failure the result is a red error fragment that embeds the
  /// offending input.
  pub fn render(&self, value: &str) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
      return String::new();
    }

    match self
      .engine
      .render_to_string(strip_dollars(trimmed), &self.options)
    {
      Ok(markup) => markup,
      Err(e) => {
        log::error!("LaTeX rendering error: {e} (input: {value:?})");
        format!(
          "<span style=\"color: red;\">LaTeX Error: {} in {}</span>",
          html_escape(&e.to_string()),
          html_escape(value)
        )
      }
    }
  }

  /// Typeset `node` after `delay`, once the engine reports itself ready.
  ///
  /// Fire and forget: if the engine is not ready by then, nothing happens.
  /// The task belongs to `scope` and never touches the node after the scope
  /// is disposed. Must be called from within a Tokio runtime.
  pub fn schedule(
    &self,
    scope: &mut RenderScope,
    node: SharedNode,
    delay: Duration,
  ) {
    let engine = Arc::clone(&self.engine);
    let disposed = Arc::clone(&scope.disposed);

    let task = tokio::spawn(async move {
      tokio::time::sleep(delay).await;

      if disposed.load(Ordering::Acquire) {
        return;
      }
      if !engine.is_ready() {
        log::debug!("typesetting engine not ready, skipping deferred render");
        return;
      }

      let mut node = node.lock().unwrap_or_else(|p| p.into_inner());
      if let Err(e) = engine.typeset(&mut node) {
        log::error!("deferred typesetting failed: {e}");
      }
    });

    scope.tasks.retain(|t| !t.is_finished());
    scope.tasks.push(task);
  }
}

/// Remove one layer of surrounding `$` delimiters.
fn strip_dollars(value: &str) -> &str {
  if value.len() >= 2 && value.starts_with('$') && value.ends_with('$') {
    &value[1..value.len() - 1]
  } else {
    value
  }
}

/// Lifetime of a view that deferred renders write into.
#[derive(Debug, Default)]
pub struct RenderScope {
  tasks: Vec<JoinHandle<()>>,
  disposed: Arc<AtomicBool>,
}

impl RenderScope {
  pub fn new() -> Self {
    Self::default()
  }

  /// Abort outstanding renders. Idempotent.
  pub fn dispose(&mut self) {
    self.disposed.store(true, Ordering::Release);
    for task in self.tasks.drain(..) {
      task.abort();
    }
  }
}

impl Drop for RenderScope {
  fn drop(&mut self) {
    self.dispose();
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn strips_exactly_one_dollar_layer() {
    assert_eq!(strip_dollars("$x$"), "x");
    assert_eq!(strip_dollars("$$x$$"), "$x$");
    assert_eq!(strip_dollars("$"), "$");
    assert_eq!(strip_dollars("x"), "x");
  }
}
