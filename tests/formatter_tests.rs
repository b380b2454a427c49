use integral_calculator::formula::{
  definite_integral, format_bound_latex, format_bound_text, format_expression,
  integral_notation,
};
use std::f64::consts::{E, FRAC_PI_2, PI, TAU};

mod formatter_tests {
  use super::*;

  // ── Exponents ──

  #[test]
  fn simple_exponent_is_braced() {
    assert_eq!(format_expression("x^2"), "x^{2}");
    assert_eq!(format_expression("x^12"), "x^{12}");
    assert_eq!(format_expression("x^n"), "x^{n}");
  }

  #[test]
  fn negative_exponent_is_braced() {
    assert_eq!(format_expression("x^-1"), "x^{-1}");
  }

  #[test]
  fn generic_exponent_is_braced() {
    assert_eq!(format_expression("x^(n+1)"), "x^{(n+1)}");
  }

  #[test]
  fn braced_exponent_is_left_alone() {
    assert_eq!(format_expression("x^{2}"), "x^{2}");
  }

  #[test]
  fn formatting_is_idempotent() {
    for text in ["x^2", "2*x^3 + 1", "sin(x)^2", "sqrt(x)", "x^-2"] {
      let once = format_expression(text);
      assert_eq!(format_expression(&once), once, "{text}");
    }
  }

  // ── Operators and functions ──

  #[test]
  fn multiplication_becomes_cdot() {
    assert_eq!(format_expression("3*x"), "3\\cdot x");
  }

  #[test]
  fn named_functions_get_a_backslash() {
    assert_eq!(format_expression("sin(x)+cos(x)"), "\\sin(x)+\\cos(x)");
    assert_eq!(format_expression("ln(x)"), "\\ln(x)");
  }

  #[test]
  fn sqrt_becomes_braced_root() {
    assert_eq!(format_expression("sqrt(x)"), "\\sqrt{x}");
    assert_eq!(format_expression("sqrt(x+1)*2"), "\\sqrt{x+1}\\cdot 2");
  }

  #[test]
  fn exp_becomes_power_of_e() {
    assert_eq!(format_expression("exp(x)"), "e^{x}");
    assert!(format_expression("exp(x^2)").contains("e^{x^{2}}"));
  }

  #[test]
  fn plain_text_passes_through() {
    assert_eq!(format_expression("2x+1"), "2x+1");
    assert_eq!(format_expression(""), "");
  }

  // ── Bounds ──

  #[test]
  fn constants_are_symbolic_in_latex() {
    assert_eq!(format_bound_latex(PI), "\\pi");
    assert_eq!(format_bound_latex(E), "e");
    assert_eq!(format_bound_latex(TAU), "2\\pi");
    assert_eq!(format_bound_latex(FRAC_PI_2), "\\frac{\\pi}{2}");
  }

  #[test]
  fn constants_are_symbolic_in_text() {
    assert_eq!(format_bound_text(PI), "π");
    assert_eq!(format_bound_text(2.72), "e");
    assert_eq!(format_bound_text(6.28), "2π");
    assert_eq!(format_bound_text(1.57), "π/2");
  }

  #[test]
  fn plain_numbers() {
    assert_eq!(format_bound_latex(3.0), "3");
    assert_eq!(format_bound_latex(-2.0), "-2");
    assert_eq!(format_bound_latex(0.25), "0.25");
    assert_eq!(format_bound_text(1.5), "1.50");
    assert_eq!(format_bound_text(-0.333), "-0.33");
  }

  #[test]
  fn huge_integer_bounds_are_not_clamped() {
    assert_eq!(format_bound_latex(1e20), "100000000000000000000");
    assert_eq!(format_bound_text(-1e19), "-10000000000000000000");
    insta::assert_snapshot!(
      definite_integral("x", 0.0, 1e20),
      @r"\int_{0}^{100000000000000000000} x \, dx"
    );
  }

  // ── Integral notation ──

  #[test]
  fn definite_integral_wraps_the_body() {
    insta::assert_snapshot!(
      definite_integral("x^2", 0.0, PI),
      @r"\int_{0}^{\pi} x^{2} \, dx"
    );
  }

  #[test]
  fn integral_notation_keeps_body_verbatim() {
    insta::assert_snapshot!(
      integral_notation("\\frac{x^{2}}{2}", -1.0, 1.0),
      @r"\int_{-1}^{1} \frac{x^{2}}{2} \, dx"
    );
  }
}
