//! Predefined example functions offered next to free-text entry.

use std::f64::consts::{E, FRAC_PI_2, PI, TAU};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PredefinedFunction {
  pub id: &'static str,
  pub display_name: &'static str,
  pub description: &'static str,
  pub expression: &'static str,
  pub lower: f64,
  pub upper: f64,
}

impl PredefinedFunction {
  pub fn bounds(&self) -> (f64, f64) {
    (self.lower, self.upper)
  }
}

/// Ordered catalog; the first entry is the default when switching to
/// predefined mode without a selection.
pub const PREDEFINED_FUNCTIONS: &[PredefinedFunction] = &[
  PredefinedFunction {
    id: "quadratic",
    display_name: "Quadratic",
    description: "Parabola x²",
    expression: "x^2",
    lower: -2.0,
    upper: 2.0,
  },
  PredefinedFunction {
    id: "cubic",
    display_name: "Cubic",
    description: "Odd cubic with two turning points",
    expression: "x^3 - 2x",
    lower: -2.0,
    upper: 2.0,
  },
  PredefinedFunction {
    id: "sine",
    display_name: "Sine",
    description: "One arch of sin(x)",
    expression: "sin(x)",
    lower: 0.0,
    upper: PI,
  },
  PredefinedFunction {
    id: "cosine",
    display_name: "Cosine",
    description: "Quarter period of cos(x)",
    expression: "cos(x)",
    lower: 0.0,
    upper: FRAC_PI_2,
  },
  PredefinedFunction {
    id: "exponential",
    display_name: "Exponential",
    description: "Growth curve e^x",
    expression: "exp(x)",
    lower: 0.0,
    upper: 1.0,
  },
  PredefinedFunction {
    id: "gaussian",
    display_name: "Gaussian",
    description: "Bell curve e^(-x²)",
    expression: "exp(-x^2)",
    lower: -3.0,
    upper: 3.0,
  },
  PredefinedFunction {
    id: "logarithm",
    display_name: "Natural log",
    description: "ln(x) from 1 to e",
    expression: "log(x)",
    lower: 1.0,
    upper: E,
  },
  PredefinedFunction {
    id: "square_root",
    display_name: "Square root",
    description: "√x from 0 to 4",
    expression: "sqrt(x)",
    lower: 0.0,
    upper: 4.0,
  },
  PredefinedFunction {
    id: "reciprocal",
    display_name: "Reciprocal",
    description: "1/x over one full turn",
    expression: "1/x",
    lower: 1.0,
    upper: TAU,
  },
];

pub fn find(id: &str) -> Option<&'static PredefinedFunction> {
  PREDEFINED_FUNCTIONS.iter().find(|f| f.id == id)
}

pub fn first() -> &'static PredefinedFunction {
  &PREDEFINED_FUNCTIONS[0]
}
