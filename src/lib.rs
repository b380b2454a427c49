use thiserror::Error;

pub mod api;
pub mod catalog;
pub mod chart;
pub mod debounce;
pub mod form;
pub mod formula;
pub mod orchestrator;
pub mod settings;
pub mod validation;

pub use api::{
  ApiError, IntegralBackend, IntegralClient, IntegralRequest,
  IntegralResponse, SamplePoint,
};
pub use chart::{build_chart, ChartError, ChartSpec, ChartSurface};
pub use form::{BoundField, FieldChange, FormState, Mode};
pub use formula::{format_expression, FormulaRenderer, MarkupEngine};
pub use orchestrator::{FormOrchestrator, Phase, ViewState};
pub use settings::{Settings, SettingsError};
pub use validation::{validate_bounds, validate_expression, ValidationError};

#[derive(Error, Debug)]
pub enum CalculatorError {
  #[error("Invalid input: {0}")]
  Validation(#[from] ValidationError),
  #[error(transparent)]
  Api(#[from] ApiError),
  #[error(transparent)]
  Chart(#[from] ChartError),
  #[error(transparent)]
  Settings(#[from] SettingsError),
  #[error(transparent)]
  UnknownFunction(#[from] form::UnknownFunction),
}

/// Escape text for inclusion in HTML or SVG markup.
pub(crate) fn html_escape(s: &str) -> String {
  s.replace('&', "&amp;")
    .replace('<', "&lt;")
    .replace('>', "&gt;")
    .replace('"', "&quot;")
}

/// Validate the inputs and request one calculation.
///
/// The error only covers local validation and transport; a domain-level
/// problem comes back inside the response's `error` field.
pub async fn calculate<B: IntegralBackend>(
  backend: &B,
  expression: &str,
  lower: f64,
  upper: f64,
) -> Result<IntegralResponse, CalculatorError> {
  validate_expression(expression)?;
  validate_bounds(lower, upper)?;

  let request = IntegralRequest {
    function_string: expression.to_string(),
    start_x: lower,
    end_x: upper,
  };
  Ok(backend.calculate_integral(request).await?)
}
