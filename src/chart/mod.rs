//! Chart construction: sampled points plus bounds in, three series out.
//!
//! [`build_chart`] is a pure transform producing a declarative [`ChartSpec`].
//! Drawing it is the job of a [`ChartEngine`]; a [`ChartSurface`] owns the one
//! chart that is on screen and replaces it wholesale on every rebuild.

pub mod svg;

use thiserror::Error;

use crate::api::{IntegralResponse, SamplePoint};

pub use svg::SvgChartEngine;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ChartError {
  #[error("chart x-range is empty: [{0}, {1}]")]
  EmptyRange(f64, f64),
  #[error("chart range is too wide to plot: [{0}, {1}]")]
  Unplottable(f64, f64),
  #[error("chart rendering failed: {0}")]
  Render(String),
}

/// RGBA color, alpha in 0..=1.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgba(pub u8, pub u8, pub u8, pub f64);

impl Rgba {
  pub fn to_svg_rgb(self) -> String {
    format!("#{:02x}{:02x}{:02x}", self.0, self.1, self.2)
  }
}

const TEAL: (u8, u8, u8) = (0, 153, 153);
pub const TITLE_COLOR: Rgba = Rgba(79, 70, 229, 0.9);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeriesKind {
  /// Region under the curve, closed against the x-axis at the bounds.
  Area,
  /// The full sampled curve.
  Function,
  /// Reference line along y = 0 between the bounds.
  Axis,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SeriesStyle {
  pub stroke: Rgba,
  pub fill: Option<Rgba>,
  pub stroke_width: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChartSeries {
  pub kind: SeriesKind,
  pub label: &'static str,
  pub points: Vec<SamplePoint>,
  pub style: SeriesStyle,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChartSpec {
  pub title: String,
  /// Plotted horizontal extent; always exactly the integration bounds.
  pub x_range: (f64, f64),
  pub x_label: &'static str,
  pub y_label: &'static str,
  /// Area, function, axis, in drawing order.
  pub series: Vec<ChartSeries>,
}

impl ChartSpec {
  pub fn series(&self, kind: SeriesKind) -> Option<&ChartSeries> {
    self.series.iter().find(|s| s.kind == kind)
  }
}

/// `Area = 10.500000`
pub fn title_text(area: f64) -> String {
  format!("Area = {area:.6}")
}

/// Hover label for one sample, `f(0.50) = 0.2500`.
pub fn point_label(point: SamplePoint) -> String {
  format!("f({:.2}) = {:.4}", point.x, point.y)
}

/// Build the three series for a response and the bounds that produced it.
pub fn build_chart(
  response: &IntegralResponse,
  lower: f64,
  upper: f64,
) -> ChartSpec {
  let samples = &response.function_points;
  let axis_start = SamplePoint { x: lower, y: 0.0 };
  let axis_end = SamplePoint { x: upper, y: 0.0 };

  let mut area_points = Vec::with_capacity(samples.len() + 2);
  area_points.push(axis_start);
  area_points.extend(
    samples
      .iter()
      .copied()
      .filter(|p| p.x >= lower && p.x <= upper),
  );
  area_points.push(axis_end);

  let (r, g, b) = TEAL;
  let area = ChartSeries {
    kind: SeriesKind::Area,
    label: "Area",
    points: area_points,
    style: SeriesStyle {
      stroke: Rgba(r, g, b, 0.6),
      fill: Some(Rgba(r, g, b, 0.15)),
      stroke_width: 1.0,
    },
  };

  let function = ChartSeries {
    kind: SeriesKind::Function,
    label: "Function",
    points: samples.clone(),
    style: SeriesStyle {
      stroke: Rgba(r, g, b, 1.0),
      fill: None,
      stroke_width: 2.5,
    },
  };

  let axis = ChartSeries {
    kind: SeriesKind::Axis,
    label: "x-axis",
    points: vec![axis_start, axis_end],
    style: SeriesStyle {
      stroke: Rgba(0, 0, 0, 0.3),
      fill: None,
      stroke_width: 1.0,
    },
  };

  ChartSpec {
    title: title_text(response.area),
    x_range: (lower, upper),
    x_label: "x",
    y_label: "f(x)",
    series: vec![area, function, axis],
  }
}

/// A chart that has been constructed by an engine.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedChart {
  pub spec: ChartSpec,
  pub svg: String,
}

pub trait ChartEngine {
  fn construct(&self, spec: &ChartSpec) -> Result<RenderedChart, ChartError>;

  /// Release a chart that is being replaced or torn down.
  fn dispose(&self, chart: RenderedChart) {
    drop(chart);
  }
}

/// The single chart slot. At most one chart exists at a time.
pub struct ChartSurface<E: ChartEngine = SvgChartEngine> {
  engine: E,
  current: Option<RenderedChart>,
}

impl<E: ChartEngine> ChartSurface<E> {
  pub fn new(engine: E) -> Self {
    Self {
      engine,
      current: None,
    }
  }

  /// Dispose the current chart, then construct one from `spec`.
  ///
  /// If construction fails the surface is left empty.
  pub fn rebuild(
    &mut self,
    spec: &ChartSpec,
  ) -> Result<&RenderedChart, ChartError> {
    self.dispose();
    let chart = self.engine.construct(spec)?;
    Ok(&*self.current.insert(chart))
  }

  pub fn dispose(&mut self) {
    if let Some(chart) = self.current.take() {
      self.engine.dispose(chart);
    }
  }

  pub fn current(&self) -> Option<&RenderedChart> {
    self.current.as_ref()
  }

  pub fn engine(&self) -> &E {
    &self.engine
  }
}
