//! Display policy for integration limits.
//!
//! Limits close to a well-known constant are shown symbolically. The math path
//! (LaTeX that gets typeset) is strict; the plain-text path only needs to look
//! right next to an input box, so its tolerance is much looser.

use std::f64::consts::{E, FRAC_PI_2, PI, TAU};

pub const LATEX_TOLERANCE: f64 = 1e-6;
pub const TEXT_TOLERANCE: f64 = 0.01;

/// (value, LaTeX, plain text)
const SYMBOLIC_CONSTANTS: [(f64, &str, &str); 4] = [
  (PI, "\\pi", "π"),
  (E, "e", "e"),
  (TAU, "2\\pi", "2π"),
  (FRAC_PI_2, "\\frac{\\pi}{2}", "π/2"),
];

/// Format a limit for use inside LaTeX, e.g. `\pi`, `3`, `0.25`.
pub fn format_bound_latex(value: f64) -> String {
  format_bound(value, LATEX_TOLERANCE, |(_, latex, _)| latex)
}

/// Format a limit for plain-text display, e.g. `π`, `-2`, `1.50`.
pub fn format_bound_text(value: f64) -> String {
  format_bound(value, TEXT_TOLERANCE, |(_, _, text)| text)
}

fn format_bound(
  value: f64,
  tolerance: f64,
  pick: impl Fn((f64, &'static str, &'static str)) -> &'static str,
) -> String {
  if let Some(constant) = SYMBOLIC_CONSTANTS
    .iter()
    .find(|(c, _, _)| (value - c).abs() < tolerance)
  {
    return pick(*constant).to_string();
  }

  if value.is_finite() && value.fract() == 0.0 {
    // `+ 0.0` turns -0.0 into 0.0.
    format!("{:.0}", value + 0.0)
  } else {
    format!("{value:.2}")
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn text_path_is_looser_than_latex_path() {
    assert_eq!(format_bound_text(3.14), "π");
    assert_eq!(format_bound_latex(3.14), "3.14");
  }

  #[test]
  fn negative_zero_has_no_sign() {
    assert_eq!(format_bound_latex(-0.0), "0");
    assert_eq!(format_bound_text(-0.0), "0");
  }

  #[test]
  fn integers_beyond_i64_keep_every_digit() {
    assert_eq!(format_bound_latex(1e20), "100000000000000000000");
    assert_eq!(format_bound_text(-1e19), "-10000000000000000000");
  }
}
