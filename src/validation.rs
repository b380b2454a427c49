//! Surface-syntax checks for the calculator form.
//!
//! Nothing here parses an expression. The backend owns the grammar; these
//! predicates only catch the mistakes that are obvious from the raw text so a
//! request is never sent for them.

use thiserror::Error;

use crate::form::FormState;

/// Operator sequences that are never valid in the informal notation.
const INVALID_OPERATORS: [&str; 4] = ["++", "--", "**", "//"];

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationError {
  #[error("This field is required")]
  Required,
  #[error("Parentheses are not balanced")]
  UnbalancedParentheses,
  #[error("Invalid operator sequence (++, --, ** or //)")]
  InvalidOperator,
  #[error("The function must use the variable x")]
  MissingVariable,
  #[error("The upper limit must be greater than the lower limit")]
  InvalidRange,
}

/// Check an expression field. The first failing rule wins, in the order
/// required, balanced parentheses, operators, variable.
pub fn validate_expression(text: &str) -> Result<(), ValidationError> {
  if text.is_empty() {
    return Err(ValidationError::Required);
  }

  let open = text.matches('(').count();
  let close = text.matches(')').count();
  if open != close {
    return Err(ValidationError::UnbalancedParentheses);
  }

  if INVALID_OPERATORS.iter().any(|op| text.contains(op)) {
    return Err(ValidationError::InvalidOperator);
  }

  if !text.contains('x') && !text.contains('X') {
    return Err(ValidationError::MissingVariable);
  }

  Ok(())
}

/// Check that `lower < upper`. Equal bounds are rejected, and so is NaN on
/// either side.
pub fn validate_bounds(lower: f64, upper: f64) -> Result<(), ValidationError> {
  if lower < upper {
    Ok(())
  } else {
    Err(ValidationError::InvalidRange)
  }
}

/// Per-field and form-level results for one validation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormErrors {
  pub expression: Option<ValidationError>,
  pub lower: Option<ValidationError>,
  pub upper: Option<ValidationError>,
  /// Cross-field failure (bound ordering).
  pub form: Option<ValidationError>,
}

impl FormErrors {
  pub fn is_valid(&self) -> bool {
    self.expression.is_none()
      && self.lower.is_none()
      && self.upper.is_none()
      && self.form.is_none()
  }

  /// Every error in display order, expression first.
  pub fn messages(&self) -> Vec<String> {
    [self.expression, self.lower, self.upper, self.form]
      .iter()
      .flatten()
      .map(|e| e.to_string())
      .collect()
  }
}

/// Run every field validator plus the range check.
///
/// The range check only runs once both bounds are filled in; a missing bound
/// is reported on its own field as `Required`.
pub fn validate_form(form: &FormState) -> FormErrors {
  let mut errors = FormErrors {
    expression: validate_expression(&form.expression).err(),
    lower: form.lower.is_none().then_some(ValidationError::Required),
    upper: form.upper.is_none().then_some(ValidationError::Required),
    form: None,
  };

  if let (Some(lower), Some(upper)) = (form.lower, form.upper) {
    errors.form = validate_bounds(lower, upper).err();
  }

  errors
}
