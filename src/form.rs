//! Form state and the edits that can be applied to it.

use thiserror::Error;

use crate::api::IntegralRequest;
use crate::catalog::{self, PredefinedFunction};

pub const DEFAULT_EXPRESSION: &str = "2x+1";
pub const DEFAULT_LOWER: f64 = -1.0;
pub const DEFAULT_UPPER: f64 = 1.0;
/// Step used by the bound nudge buttons.
pub const BOUND_STEP: f64 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
  Custom,
  Predefined,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundField {
  Lower,
  Upper,
}

/// One edit coming from the user.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldChange {
  Expression(String),
  /// `None` when the field was cleared.
  Bound(BoundField, Option<f64>),
  /// Nudge a bound by one step up (`+1`) or down (`-1`).
  StepBound(BoundField, i8),
  SelectPredefined(String),
  SetMode(Mode),
}

/// The value the debouncer compares: two snapshots with the same expression
/// and bounds are the same request.
#[derive(Debug, Clone, PartialEq)]
pub struct FormSnapshot {
  pub expression: String,
  pub lower: Option<f64>,
  pub upper: Option<f64>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Touched {
  pub expression: bool,
  pub lower: bool,
  pub upper: bool,
}

impl Touched {
  pub fn all(&self) -> bool {
    self.expression && self.lower && self.upper
  }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FormState {
  pub expression: String,
  pub lower: Option<f64>,
  pub upper: Option<f64>,
  pub mode: Mode,
  /// Catalog id while in predefined mode.
  pub selected: Option<&'static str>,
  pub touched: Touched,
}

impl Default for FormState {
  fn default() -> Self {
    Self {
      expression: DEFAULT_EXPRESSION.to_string(),
      lower: Some(DEFAULT_LOWER),
      upper: Some(DEFAULT_UPPER),
      mode: Mode::Custom,
      selected: None,
      touched: Touched::default(),
    }
  }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown predefined function: {0}")]
pub struct UnknownFunction(pub String);

impl FormState {
  pub fn snapshot(&self) -> FormSnapshot {
    FormSnapshot {
      expression: self.expression.clone(),
      lower: self.lower,
      upper: self.upper,
    }
  }

  /// Wire request for the current values, if both bounds are set.
  pub fn to_request(&self) -> Option<IntegralRequest> {
    Some(IntegralRequest {
      function_string: self.expression.clone(),
      start_x: self.lower?,
      end_x: self.upper?,
    })
  }

  pub fn mark_all_touched(&mut self) {
    self.touched = Touched {
      expression: true,
      lower: true,
      upper: true,
    };
  }

  pub fn bound(&self, field: BoundField) -> Option<f64> {
    match field {
      BoundField::Lower => self.lower,
      BoundField::Upper => self.upper,
    }
  }

  pub fn set_bound(&mut self, field: BoundField, value: Option<f64>) {
    match field {
      BoundField::Lower => self.lower = value,
      BoundField::Upper => self.upper = value,
    }
  }

  /// Move a bound by `direction` steps, rounded to one decimal. An empty
  /// field counts as zero.
  pub fn step_bound(&mut self, field: BoundField, direction: i8) {
    let current = self.bound(field).unwrap_or(0.0);
    let next = current + BOUND_STEP * f64::from(direction);
    self.set_bound(field, Some((next * 10.0).round() / 10.0));
  }

  /// Load a catalog entry: expression and default bounds.
  pub fn select(&mut self, function: &'static PredefinedFunction) {
    self.mode = Mode::Predefined;
    self.selected = Some(function.id);
    self.expression = function.expression.to_string();
    self.lower = Some(function.lower);
    self.upper = Some(function.upper);
  }

  pub fn select_by_id(&mut self, id: &str) -> Result<(), UnknownFunction> {
    let function =
      catalog::find(id).ok_or_else(|| UnknownFunction(id.to_string()))?;
    self.select(function);
    Ok(())
  }

  /// Switching to predefined without a selection loads the first catalog
  /// entry; switching to custom only drops the selection marker.
  pub fn set_mode(&mut self, mode: Mode) {
    match mode {
      Mode::Predefined if self.mode == Mode::Predefined => {}
      Mode::Predefined => {
        let current = self.selected.and_then(catalog::find);
        self.select(current.unwrap_or_else(catalog::first));
      }
      Mode::Custom => {
        self.mode = Mode::Custom;
        self.selected = None;
      }
    }
  }

  /// Apply an edit. Field edits mark their field touched.
  pub fn apply(&mut self, change: FieldChange) -> Result<(), UnknownFunction> {
    match change {
      FieldChange::Expression(text) => {
        self.expression = text;
        self.touched.expression = true;
      }
      FieldChange::Bound(field, value) => {
        self.set_bound(field, value);
        self.touch_bound(field);
      }
      FieldChange::StepBound(field, direction) => {
        self.step_bound(field, direction);
        self.touch_bound(field);
      }
      FieldChange::SelectPredefined(id) => self.select_by_id(&id)?,
      FieldChange::SetMode(mode) => self.set_mode(mode),
    }
    Ok(())
  }

  fn touch_bound(&mut self, field: BoundField) {
    match field {
      BoundField::Lower => self.touched.lower = true,
      BoundField::Upper => self.touched.upper = true,
    }
  }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseChangeError {
  #[error("expected key=value, got {0:?}")]
  MissingEquals(String),
  #[error("unknown field {0:?}")]
  UnknownField(String),
  #[error("invalid number {0:?}")]
  InvalidNumber(String),
  #[error("invalid value {0:?} for {1}")]
  InvalidValue(String, &'static str),
}

/// Parse a limit: a decimal number or one of `pi`, `-pi`, `2pi`, `pi/2`, `e`.
pub fn parse_bound(text: &str) -> Result<f64, ParseChangeError> {
  use std::f64::consts::{E, FRAC_PI_2, PI, TAU};

  let trimmed = text.trim();
  let value = match trimmed.to_ascii_lowercase().as_str() {
    "pi" | "π" => PI,
    "-pi" | "-π" => -PI,
    "2pi" | "2π" => TAU,
    "pi/2" | "π/2" => FRAC_PI_2,
    "-pi/2" | "-π/2" => -FRAC_PI_2,
    "e" => E,
    other => other
      .parse::<f64>()
      .map_err(|_| ParseChangeError::InvalidNumber(trimmed.to_string()))?,
  };
  if value.is_finite() {
    Ok(value)
  } else {
    Err(ParseChangeError::InvalidNumber(trimmed.to_string()))
  }
}

fn parse_bound_field(value: &str) -> Result<BoundField, ParseChangeError> {
  match value {
    "from" | "lower" => Ok(BoundField::Lower),
    "to" | "upper" => Ok(BoundField::Upper),
    _ => Err(ParseChangeError::InvalidValue(value.to_string(), "bound")),
  }
}

impl std::str::FromStr for FieldChange {
  type Err = ParseChangeError;

  /// `function=x^2`, `from=0`, `to=` (clears), `select=sine`,
  /// `mode=custom`, `inc=from`, `dec=to`
  fn from_str(line: &str) -> Result<Self, Self::Err> {
    let (key, value) = line
      .split_once('=')
      .ok_or_else(|| ParseChangeError::MissingEquals(line.to_string()))?;
    let value = value.trim();

    match key.trim() {
      "function" | "f" => Ok(FieldChange::Expression(value.to_string())),
      "from" | "to" => {
        let field = parse_bound_field(key.trim())?;
        let bound = if value.is_empty() {
          None
        } else {
          Some(parse_bound(value)?)
        };
        Ok(FieldChange::Bound(field, bound))
      }
      "inc" => Ok(FieldChange::StepBound(parse_bound_field(value)?, 1)),
      "dec" => Ok(FieldChange::StepBound(parse_bound_field(value)?, -1)),
      "select" => Ok(FieldChange::SelectPredefined(value.to_string())),
      "mode" => match value {
        "custom" => Ok(FieldChange::SetMode(Mode::Custom)),
        "predefined" => Ok(FieldChange::SetMode(Mode::Predefined)),
        _ => Err(ParseChangeError::InvalidValue(value.to_string(), "mode")),
      },
      other => Err(ParseChangeError::UnknownField(other.to_string())),
    }
  }
}
