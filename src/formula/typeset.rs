//! Typesetting engine seam.
//!
//! Callers never reach for a global engine. They receive an [`EngineHandle`]
//! and ask it whether it is ready before handing it nodes.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;

use crate::html_escape;

pub type EngineHandle = Arc<dyn TypesetEngine>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TypesetError {
  #[error("typesetting engine is not initialized")]
  NotReady,
  #[error("unexpected '}}' at position {0}")]
  UnexpectedCloseBrace(usize),
  #[error("{0} unclosed '{{'")]
  UnclosedGroup(usize),
  #[error("macro {0} expects an argument")]
  MissingArgument(String),
}

#[derive(Debug, Clone)]
pub struct RenderOptions {
  /// Return an error instead of inline error markup.
  pub throw_on_error: bool,
  /// Block (`\[ \]`) instead of inline (`\( \)`) math.
  pub display_mode: bool,
  /// Macro name (with backslash) to body; `#1`..`#9` are parameters.
  pub macros: Vec<(String, String)>,
}

impl Default for RenderOptions {
  fn default() -> Self {
    Self {
      throw_on_error: false,
      display_mode: true,
      macros: vec![("\\f".to_string(), "f(#1)".to_string())],
    }
  }
}

/// A piece of already-placed markup whose LaTeX source gets typeset later.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MathNode {
  pub source: String,
  pub markup: Option<String>,
}

impl MathNode {
  pub fn new(source: impl Into<String>) -> Self {
    Self {
      source: source.into(),
      markup: None,
    }
  }

  /// Replace the source; the old markup no longer applies.
  pub fn set_source(&mut self, source: impl Into<String>) {
    self.source = source.into();
    self.markup = None;
  }
}

pub trait TypesetEngine: Send + Sync {
  fn is_ready(&self) -> bool;

  /// Render a LaTeX string to displayable markup.
  fn render_to_string(
    &self,
    latex: &str,
    options: &RenderOptions,
  ) -> Result<String, TypesetError>;

  /// Typeset a node in place, filling its `markup`.
  fn typeset(&self, node: &mut MathNode) -> Result<(), TypesetError> {
    let markup =
      self.render_to_string(&node.source, &RenderOptions::default())?;
    node.markup = Some(markup);
    Ok(())
  }
}

/// Built-in engine producing HTML that a browser-side math renderer picks up
/// through its standard `\[ \]` / `\( \)` delimiters.
///
/// It expands user macros, checks brace structure and escapes the result.
/// Like KaTeX it can be told to report problems inline instead of failing.
#[derive(Debug)]
pub struct MarkupEngine {
  ready: AtomicBool,
}

impl Default for MarkupEngine {
  fn default() -> Self {
    Self::new()
  }
}

impl MarkupEngine {
  pub fn new() -> Self {
    Self {
      ready: AtomicBool::new(true),
    }
  }

  /// An engine that is still loading; it refuses work until [`mark_ready`].
  ///
  /// [`mark_ready`]: MarkupEngine::mark_ready
  pub fn loading() -> Self {
    Self {
      ready: AtomicBool::new(false),
    }
  }

  pub fn mark_ready(&self) {
    self.ready.store(true, Ordering::Release);
  }

  pub fn handle(self) -> EngineHandle {
    Arc::new(self)
  }
}

impl TypesetEngine for MarkupEngine {
  fn is_ready(&self) -> bool {
    self.ready.load(Ordering::Acquire)
  }

  fn render_to_string(
    &self,
    latex: &str,
    options: &RenderOptions,
  ) -> Result<String, TypesetError> {
    if !self.is_ready() {
      return Err(TypesetError::NotReady);
    }

    let checked = expand_macros(latex, &options.macros)
      .and_then(|expanded| check_braces(&expanded).map(|_| expanded));

    match checked {
      Ok(expanded) => {
        let body = html_escape(&expanded);
        Ok(if options.display_mode {
          format!("<span class=\"math math-display\">\\[{body}\\]</span>")
        } else {
          format!("<span class=\"math math-inline\">\\({body}\\)</span>")
        })
      }
      Err(e) if options.throw_on_error => Err(e),
      Err(e) => Ok(format!(
        "<span class=\"math-error\" style=\"color:#cc0000\" \
         title=\"{}\">{}</span>",
        html_escape(&e.to_string()),
        html_escape(latex)
      )),
    }
  }
}

/// Length in bytes of the control sequence at the start of `s` (which begins
/// with a backslash): either a run of letters or a single symbol.
fn control_sequence_len(s: &str) -> usize {
  let letters: usize = s[1..]
    .chars()
    .take_while(|c| c.is_ascii_alphabetic())
    .map(|c| c.len_utf8())
    .sum();
  if letters > 0 {
    1 + letters
  } else {
    1 + s[1..].chars().next().map_or(0, |c| c.len_utf8())
  }
}

/// Highest `#n` parameter referenced by a macro body.
fn macro_arity(body: &str) -> usize {
  body
    .split('#')
    .skip(1)
    .filter_map(|part| part.chars().next()?.to_digit(10))
    .max()
    .unwrap_or(0) as usize
}

/// Read one macro argument starting at byte `pos`: a braced group (without
/// its braces), a control sequence, or a single character.
fn read_argument(src: &str, pos: usize) -> Option<(String, usize)> {
  let skipped = src[pos..].len() - src[pos..].trim_start().len();
  let start = pos + skipped;
  let rest = &src[start..];
  let first = rest.chars().next()?;

  match first {
    '{' => {
      let mut depth = 0usize;
      let mut escaped = false;
      for (i, c) in rest.char_indices() {
        if escaped {
          escaped = false;
          continue;
        }
        match c {
          '\\' => escaped = true,
          '{' => depth += 1,
          '}' => {
            depth -= 1;
            if depth == 0 {
              return Some((rest[1..i].to_string(), start + i + 1));
            }
          }
          _ => {}
        }
      }
      None
    }
    '}' => None,
    '\\' => {
      let len = control_sequence_len(rest);
      Some((rest[..len].to_string(), start + len))
    }
    c => Some((c.to_string(), start + c.len_utf8())),
  }
}

fn substitute(body: &str, args: &[String]) -> String {
  let mut out = body.to_string();
  for (i, arg) in args.iter().enumerate() {
    out = out.replace(&format!("#{}", i + 1), arg);
  }
  out
}

fn expand_macros(
  src: &str,
  macros: &[(String, String)],
) -> Result<String, TypesetError> {
  let mut out = String::with_capacity(src.len());
  let mut i = 0;

  'scan: while i < src.len() {
    let rest = &src[i..];

    if rest.starts_with('\\') {
      let len = control_sequence_len(rest);
      let name = &rest[..len];
      if let Some((_, body)) = macros.iter().find(|(m, _)| m == name) {
        let mut cursor = i + len;
        let mut args = Vec::new();
        for _ in 0..macro_arity(body) {
          let (arg, next) = read_argument(src, cursor)
            .ok_or_else(|| TypesetError::MissingArgument(name.to_string()))?;
          args.push(arg);
          cursor = next;
        }
        out.push_str(&substitute(body, &args));
        i = cursor;
        continue 'scan;
      }
      out.push_str(name);
      i += len;
      continue;
    }

    let Some(c) = rest.chars().next() else { break };
    out.push(c);
    i += c.len_utf8();
  }

  Ok(out)
}

fn check_braces(src: &str) -> Result<(), TypesetError> {
  let bytes = src.as_bytes();
  let mut depth = 0usize;
  let mut i = 0;

  while i < bytes.len() {
    match bytes[i] {
      b'\\' => i += 1,
      b'{' => depth += 1,
      b'}' => {
        if depth == 0 {
          return Err(TypesetError::UnexpectedCloseBrace(i));
        }
        depth -= 1;
      }
      _ => {}
    }
    i += 1;
  }

  if depth > 0 {
    return Err(TypesetError::UnclosedGroup(depth));
  }
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn f_macro_does_not_swallow_frac() {
    let macros = RenderOptions::default().macros;
    let out = expand_macros("\\frac{1}{2} + \\f{x}", &macros).unwrap();
    assert_eq!(out, "\\frac{1}{2} + f(x)");
  }

  #[test]
  fn f_macro_takes_single_token_argument() {
    let macros = RenderOptions::default().macros;
    let out = expand_macros("\\f x", &macros).unwrap();
    assert_eq!(out, "f(x)");
  }

  #[test]
  fn f_macro_without_argument_is_an_error() {
    let macros = RenderOptions::default().macros;
    let err = expand_macros("\\f", &macros).unwrap_err();
    assert_eq!(err, TypesetError::MissingArgument("\\f".to_string()));
  }

  #[test]
  fn escaped_braces_do_not_count() {
    assert!(check_braces("\\{x\\}").is_ok());
    assert_eq!(check_braces("x}"), Err(TypesetError::UnexpectedCloseBrace(1)));
    assert_eq!(check_braces("\\sqrt{x"), Err(TypesetError::UnclosedGroup(1)));
  }
}
