//! Best-effort conversion of the informal input notation into LaTeX.
//!
//! This is only a preview. Once the backend answers, its `latex_expression`
//! replaces whatever this module produced.

use regex::Regex;
use std::sync::LazyLock;

use crate::formula::bounds::format_bound_latex;

/// `x^2`, `x^12`, `x^2.5`, `x^n`
static SIMPLE_EXPONENT: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"\^(\d+(?:\.\d+)?|[A-Za-z_])").unwrap());
/// `x^-1`, `x^-2.5`
static NEGATIVE_EXPONENT: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"\^(-\d+(?:\.\d+)?)").unwrap());
/// Anything else after a caret, up to the next closing brace. An exponent
/// that already opens with `{` is left alone.
static GENERIC_EXPONENT: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"\^(-?[^{}][^}]*)").unwrap());
static NAMED_FUNCTION: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"\\?(sin|cos|tan|log|ln)\(").unwrap());
static EXP_CALL: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"exp\(([^)]+)\)").unwrap());

/// Rewrite an expression such as `2x^2 + sin(x)` into LaTeX.
///
/// The rules run in a fixed order and later rules see the output of earlier
/// ones. Never fails; unrecognised text passes through untouched.
pub fn format_expression(expression: &str) -> String {
  if expression.is_empty() {
    return String::new();
  }

  let latex = SIMPLE_EXPONENT.replace_all(expression, "^{${1}}");
  let latex = NEGATIVE_EXPONENT.replace_all(&latex, "^{${1}}");
  let latex = GENERIC_EXPONENT.replace_all(&latex, "^{${1}}");
  let latex = latex.replace("**", "^");
  let latex = latex.replace('*', "\\cdot ");
  let latex = convert_sqrt(&latex);
  let latex = NAMED_FUNCTION.replace_all(&latex, r"\${1}(");
  let latex = EXP_CALL.replace_all(&latex, "e^{${1}}");

  latex.into_owned()
}

/// Turn every `sqrt(...)` into `\sqrt{...}`, closing the brace where the
/// matching parenthesis was. An unterminated call is closed at the end.
fn convert_sqrt(text: &str) -> String {
  const OPEN: &str = "sqrt(";

  let mut out = String::with_capacity(text.len() + 8);
  // One entry per open paren: true when it was opened by sqrt.
  let mut parens: Vec<bool> = Vec::new();
  let mut i = 0;

  while i < text.len() {
    let rest = &text[i..];
    if rest.starts_with(OPEN) {
      if !out.ends_with('\\') {
        out.push('\\');
      }
      out.push_str("sqrt{");
      parens.push(true);
      i += OPEN.len();
      continue;
    }

    let Some(c) = rest.chars().next() else { break };
    match c {
      '(' => {
        parens.push(false);
        out.push('(');
      }
      ')' => match parens.pop() {
        Some(true) => out.push('}'),
        _ => out.push(')'),
      },
      _ => out.push(c),
    }
    i += c.len_utf8();
  }

  for opened_by_sqrt in parens.into_iter().rev() {
    if opened_by_sqrt {
      out.push('}');
    }
  }
  out
}

/// Wrap an already-formatted LaTeX body in definite integral notation.
pub fn integral_notation(body: &str, lower: f64, upper: f64) -> String {
  format!(
    "\\int_{{{}}}^{{{}}} {} \\, dx",
    format_bound_latex(lower),
    format_bound_latex(upper),
    body
  )
}

/// Format `expression` and wrap it as `\int_{a}^{b} ... \, dx`.
pub fn definite_integral(expression: &str, lower: f64, upper: f64) -> String {
  integral_notation(&format_expression(expression), lower, upper)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn sqrt_nested_parens_close_at_the_right_place() {
    assert_eq!(convert_sqrt("sqrt((x+1)*2)+x"), "\\sqrt{(x+1)*2}+x");
  }

  #[test]
  fn sqrt_unterminated_is_closed_at_end() {
    assert_eq!(convert_sqrt("sqrt(x"), "\\sqrt{x}");
  }

  #[test]
  fn sqrt_stray_close_paren_is_kept() {
    assert_eq!(convert_sqrt("x)"), "x)");
  }
}
