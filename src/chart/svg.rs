use plotters::prelude::*;

use crate::chart::{
  point_label, ChartEngine, ChartError, ChartSeries, ChartSpec, RenderedChart,
  Rgba, SeriesKind, TITLE_COLOR,
};
use crate::html_escape;

pub const DEFAULT_WIDTH: u32 = 720;
pub const DEFAULT_HEIGHT: u32 = 450;
/// Internal rendering resolution multiplier for sub-pixel precision.
/// Plotters maps to integer coordinates, so we render at a higher resolution
/// and scale down via SVG viewBox to get smooth curves.
const RESOLUTION_SCALE: u32 = 10;
/// Radius (display px) of the invisible hover targets on the curve.
const HOVER_RADIUS: f64 = 4.0;

/// Draws a [`ChartSpec`] to a standalone SVG document with plotters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SvgChartEngine {
  pub width: u32,
  pub height: u32,
}

impl Default for SvgChartEngine {
  fn default() -> Self {
    Self {
      width: DEFAULT_WIDTH,
      height: DEFAULT_HEIGHT,
    }
  }
}

impl SvgChartEngine {
  pub fn new(width: u32, height: u32) -> Self {
    Self { width, height }
  }
}

impl ChartEngine for SvgChartEngine {
  fn construct(&self, spec: &ChartSpec) -> Result<RenderedChart, ChartError> {
    let svg = generate_svg(spec, self.width, self.height)?;
    Ok(RenderedChart {
      spec: spec.clone(),
      svg,
    })
  }
}

/// Pixel geometry of the plotting area, in render (scaled) units.
struct PlotArea {
  x0: f64,
  y0: f64,
  width: f64,
  height: f64,
}

fn render_err(e: impl std::fmt::Display) -> ChartError {
  ChartError::Render(e.to_string())
}

fn to_color(c: Rgba) -> RGBAColor {
  RGBColor(c.0, c.1, c.2).mix(c.3)
}

fn xy(series: &ChartSeries) -> Vec<(f64, f64)> {
  series.points.iter().map(|p| (p.x, p.y)).collect()
}

/// Vertical extent covering every visible finite sample and the x-axis,
/// padded by 5%. Fails when the extent does not fit in an `f64`.
fn y_range(spec: &ChartSpec) -> Result<(f64, f64), ChartError> {
  let (x_min, x_max) = spec.x_range;
  let (lo, hi) = spec
    .series
    .iter()
    .flat_map(|s| s.points.iter())
    .filter(|p| p.x >= x_min && p.x <= x_max && p.y.is_finite())
    .fold((0.0_f64, 0.0_f64), |(lo, hi), p| (lo.min(p.y), hi.max(p.y)));

  let (lo, hi) = if (hi - lo).abs() < f64::EPSILON {
    (lo - 1.0, hi + 1.0)
  } else {
    // Scale before subtracting; `hi - lo` alone can overflow.
    let pad = hi * 0.05 - lo * 0.05;
    (lo - pad, hi + pad)
  };
  if (hi - lo).is_finite() {
    Ok((lo, hi))
  } else {
    Err(ChartError::Unplottable(lo, hi))
  }
}

/// Restrict a polyline to `lo <= x <= hi`, adding interpolated points where
/// it crosses either edge.
pub(crate) fn clip_to_x_range(
  points: &[(f64, f64)],
  lo: f64,
  hi: f64,
) -> Vec<(f64, f64)> {
  let mut out = Vec::with_capacity(points.len());
  for (i, &(x, y)) in points.iter().enumerate() {
    if i > 0 {
      let (px, py) = points[i - 1];
      let mut crossings: Vec<f64> = [lo, hi]
        .into_iter()
        .filter(|edge| (px - edge) * (x - edge) < 0.0)
        .collect();
      if x < px {
        crossings.reverse();
      }
      for edge in crossings {
        let t = (edge - px) / (x - px);
        out.push((edge, py + t * (y - py)));
      }
    }
    if x >= lo && x <= hi {
      out.push((x, y));
    }
  }
  out
}

/// Split points into contiguous finite segments, breaking at NaN/Infinity
fn split_into_segments(points: &[(f64, f64)]) -> Vec<Vec<(f64, f64)>> {
  let mut segments: Vec<Vec<(f64, f64)>> = Vec::new();
  let mut current: Vec<(f64, f64)> = Vec::new();

  for &(x, y) in points {
    if y.is_finite() {
      current.push((x, y));
    } else if current.len() > 1 {
      segments.push(std::mem::take(&mut current));
    } else {
      current.clear();
    }
  }
  if current.len() > 1 {
    segments.push(current);
  }
  segments
}

/// Format a tick value, dropping the trailing ".0" for integers.
fn format_tick(v: f64) -> String {
  if (v - v.round()).abs() < 1e-9 {
    format!("{:.0}", v.round() + 0.0)
  } else {
    format!("{v:.1}")
  }
}

fn generate_svg(
  spec: &ChartSpec,
  svg_width: u32,
  svg_height: u32,
) -> Result<String, ChartError> {
  let (x_min, x_max) = spec.x_range;
  if !(x_min < x_max) {
    return Err(ChartError::EmptyRange(x_min, x_max));
  }
  if !(x_max - x_min).is_finite() {
    return Err(ChartError::Unplottable(x_min, x_max));
  }
  let (y_min, y_max) = y_range(spec)?;

  let render_width = svg_width * RESOLUTION_SCALE;
  let render_height = svg_height * RESOLUTION_SCALE;
  let sf = RESOLUTION_SCALE as f64;

  let margin = 10 * RESOLUTION_SCALE;
  let top_margin = 34 * RESOLUTION_SCALE;
  let x_label_area = 40 * RESOLUTION_SCALE;
  let y_label_area = 60 * RESOLUTION_SCALE;

  let mut buf = String::new();
  {
    let root = SVGBackend::with_string(&mut buf, (render_width, render_height))
      .into_drawing_area();
    root.fill(&WHITE).map_err(render_err)?;

    let dark_gray = RGBColor(0x66, 0x66, 0x66);

    let mut chart = ChartBuilder::on(&root)
      .margin_top(top_margin)
      .margin_right(margin)
      .margin_bottom(margin)
      .margin_left(margin)
      .x_label_area_size(x_label_area)
      .y_label_area_size(y_label_area)
      .build_cartesian_2d(x_min..x_max, y_min..y_max)
      .map_err(render_err)?;

    chart
      .configure_mesh()
      .bold_line_style(BLACK.mix(0.05).stroke_width(RESOLUTION_SCALE))
      .light_line_style(WHITE.mix(0.0))
      .x_labels(6)
      .y_labels(6)
      .x_label_formatter(&|v: &f64| format_tick(*v))
      .y_label_formatter(&|v: &f64| format_tick(*v))
      .x_desc(spec.x_label)
      .y_desc(spec.y_label)
      .axis_desc_style(("sans-serif", sf * 14.0).into_font().color(&dark_gray))
      .axis_style(dark_gray.stroke_width(RESOLUTION_SCALE))
      .label_style(("sans-serif", sf * 12.0).into_font().color(&dark_gray))
      .draw()
      .map_err(render_err)?;

    for series in &spec.series {
      let stroke = to_color(series.style.stroke)
        .stroke_width((series.style.stroke_width * sf).round() as u32);
      let points = match series.kind {
        SeriesKind::Function => clip_to_x_range(&xy(series), x_min, x_max),
        SeriesKind::Area | SeriesKind::Axis => xy(series),
      };

      for segment in split_into_segments(&points) {
        // Fill first so the outline renders on top
        if let Some(fill) = series.style.fill {
          chart
            .draw_series(std::iter::once(Polygon::new(
              segment.clone(),
              to_color(fill).filled(),
            )))
            .map_err(render_err)?;
        }
        chart
          .draw_series(std::iter::once(PathElement::new(segment, stroke)))
          .map_err(render_err)?;
      }
    }

    root.present().map_err(render_err)?;
  }

  rewrite_svg_header(
    &mut buf,
    svg_width,
    svg_height,
    render_width,
    render_height,
  );

  let area = PlotArea {
    x0: (margin + y_label_area) as f64,
    y0: top_margin as f64,
    width: render_width.saturating_sub(2 * margin + y_label_area) as f64,
    height: render_height.saturating_sub(top_margin + margin + x_label_area)
      as f64,
  };

  if let Some(insert_pos) = buf.rfind("</svg>") {
    let mut overlay = String::new();

    let title_size = sf * 16.0;
    overlay.push_str(&format!(
      "<text x=\"{:.1}\" y=\"{:.1}\" text-anchor=\"middle\" \
       font-family=\"sans-serif\" font-size=\"{title_size:.0}\" \
       font-weight=\"bold\" fill=\"{}\" fill-opacity=\"{}\">{}</text>\n",
      area.x0 + area.width / 2.0,
      area.y0 - title_size * 0.8,
      TITLE_COLOR.to_svg_rgb(),
      TITLE_COLOR.3,
      html_escape(&spec.title)
    ));

    if let Some(function) = spec.series(SeriesKind::Function) {
      overlay.push_str(&hover_targets(
        function,
        &area,
        (x_min, x_max),
        (y_min, y_max),
      ));
    }

    buf.insert_str(insert_pos, &overlay);
  }

  Ok(buf)
}

/// Invisible circles with `<title>` tooltips on every visible sample.
fn hover_targets(
  series: &ChartSeries,
  area: &PlotArea,
  (x_min, x_max): (f64, f64),
  (y_min, y_max): (f64, f64),
) -> String {
  let r = HOVER_RADIUS * RESOLUTION_SCALE as f64;
  let mut out = String::from("<g class=\"hover-targets\">\n");
  for point in series
    .points
    .iter()
    .filter(|p| p.x >= x_min && p.x <= x_max && p.y.is_finite())
  {
    let cx = area.x0 + (point.x - x_min) / (x_max - x_min) * area.width;
    let cy = area.y0 + (y_max - point.y) / (y_max - y_min) * area.height;
    out.push_str(&format!(
      "<circle cx=\"{cx:.1}\" cy=\"{cy:.1}\" r=\"{r:.0}\" fill=\"transparent\">\
       <title>{}</title></circle>\n",
      html_escape(&point_label(*point))
    ));
  }
  out.push_str("</g>\n");
  out
}

fn rewrite_svg_header(
  buf: &mut String,
  svg_width: u32,
  svg_height: u32,
  render_width: u32,
  render_height: u32,
) {
  if let Some(pos) = buf.find('>') {
    let new_header = format!(
      "<svg width=\"{svg_width}\" height=\"{svg_height}\" \
       viewBox=\"0 0 {render_width} {render_height}\" \
       preserveAspectRatio=\"xMidYMid meet\" \
       xmlns=\"http://www.w3.org/2000/svg\"",
    );
    buf.replace_range(..pos, &new_header);
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::api::SamplePoint;
  use crate::chart::SeriesStyle;

  #[test]
  fn clip_interpolates_both_edges() {
    let points = [(-2.0, 4.0), (0.0, 0.0), (2.0, 4.0)];
    let clipped = clip_to_x_range(&points, -1.0, 1.0);
    assert_eq!(clipped, vec![(-1.0, 2.0), (0.0, 0.0), (1.0, 2.0)]);
  }

  #[test]
  fn clip_keeps_points_on_the_edges() {
    let points = [(-1.0, 1.0), (1.0, 1.0)];
    assert_eq!(clip_to_x_range(&points, -1.0, 1.0), points.to_vec());
  }

  #[test]
  fn segments_break_at_non_finite() {
    let points =
      [(0.0, 1.0), (1.0, 2.0), (2.0, f64::NAN), (3.0, 1.0), (4.0, 1.0)];
    assert_eq!(split_into_segments(&points).len(), 2);
  }

  #[test]
  fn flat_data_still_gets_a_vertical_extent() {
    let spec = ChartSpec {
      title: String::new(),
      x_range: (0.0, 1.0),
      x_label: "x",
      y_label: "f(x)",
      series: Vec::new(),
    };
    assert_eq!(y_range(&spec), Ok((-1.0, 1.0)));
  }

  fn spec_with(points: &[(f64, f64)]) -> ChartSpec {
    ChartSpec {
      title: String::new(),
      x_range: (0.0, 1.0),
      x_label: "x",
      y_label: "f(x)",
      series: vec![ChartSeries {
        kind: SeriesKind::Function,
        label: "Function",
        points: points.iter().copied().map(SamplePoint::from).collect(),
        style: SeriesStyle {
          stroke: Rgba(0, 0, 0, 1.0),
          fill: None,
          stroke_width: 1.0,
        },
      }],
    }
  }

  #[test]
  fn padding_does_not_overflow_near_the_f64_limit() {
    let (lo, hi) = y_range(&spec_with(&[(0.0, 0.0), (1.0, 8e307)])).unwrap();
    assert!(lo < 0.0 && hi > 8e307 && hi.is_finite());
  }

  #[test]
  fn extent_wider_than_f64_is_rejected() {
    let spec = spec_with(&[(0.0, 1e308), (1.0, -1e308)]);
    assert!(matches!(y_range(&spec), Err(ChartError::Unplottable(..))));
  }

  #[test]
  fn huge_integer_ticks_keep_their_digits() {
    assert_eq!(format_tick(1e20), "100000000000000000000");
    assert_eq!(format_tick(-0.0), "0");
    assert_eq!(format_tick(2.5), "2.5");
  }
}
