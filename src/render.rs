//! # Diagnostic Charts
//!
//! Failed checks illustrate themselves with a chart of the offending day:
//! the analyzed trace as dots, any companion traces (model, second source)
//! as lines, and the flagged samples highlighted. Rendering is behind the
//! [`DiagnosticRenderer`] trait so the engine never commits to a backend;
//! the default [`SvgPlotter`] draws into an in-memory SVG that travels with
//! the finding until the mail digest inlines it, and [`NullRenderer`]
//! switches charts off entirely.
//!
//! The request is intentionally data-driven: series and flagged samples are
//! assembled by the checks, bounds are computed here, and the draw call does
//! nothing but draw.

use chrono::NaiveDateTime;
use plotters::prelude::*;

use crate::series::TimeSeries;

/// A rendered chart, kept in memory until delivery.
#[derive(Debug, Clone)]
pub struct RenderedPlot {
    /// MIME type of `bytes`, e.g. `image/svg+xml`
    pub mime: String,
    /// Encoded image
    pub bytes: Vec<u8>,
}

/// Everything a renderer needs to draw one diagnostic chart.
#[derive(Debug, Clone)]
pub struct PlotRequest {
    /// Chart title, conventionally `check:column`
    pub title: String,
    /// Station label shown with the title
    pub station: String,
    /// The analyzed trace, drawn as dots
    pub base: TimeSeries,
    /// Companion traces (model, other source), drawn as lines
    pub companions: Vec<TimeSeries>,
    /// Samples the check objected to, highlighted on top
    pub flagged: Vec<(NaiveDateTime, f64)>,
}

impl PlotRequest {
    /// Request with just a base trace and its flagged samples.
    pub fn new(
        title: impl Into<String>,
        station: impl Into<String>,
        base: TimeSeries,
        flagged: Vec<(NaiveDateTime, f64)>,
    ) -> Self {
        Self {
            title: title.into(),
            station: station.into(),
            base,
            companions: Vec::new(),
            flagged,
        }
    }

    /// Add a companion trace.
    pub fn with_companion(mut self, series: TimeSeries) -> Self {
        self.companions.push(series);
        self
    }
}

/// Errors raised while drawing a chart
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    /// No finite samples anywhere in the request
    #[error("no finite samples to draw for '{0}'")]
    NoData(String),

    /// Backend drawing failure
    #[error("chart drawing failed: {0}")]
    Draw(String),
}

/// Renders diagnostic charts for failed checks.
///
/// Returning `Ok(None)` means rendering is switched off, which is not an
/// error; the finding simply travels without a chart.
pub trait DiagnosticRenderer {
    /// Draw one chart, or decline.
    fn render(&self, request: &PlotRequest) -> Result<Option<RenderedPlot>, RenderError>;
}

/// Renderer that never draws anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullRenderer;

impl DiagnosticRenderer for NullRenderer {
    fn render(&self, _request: &PlotRequest) -> Result<Option<RenderedPlot>, RenderError> {
        Ok(None)
    }
}

/// SVG renderer with a fixed canvas size.
#[derive(Debug, Clone, Copy)]
pub struct SvgPlotter {
    /// Canvas width in pixels
    pub width: u32,
    /// Canvas height in pixels
    pub height: u32,
}

impl Default for SvgPlotter {
    fn default() -> Self {
        Self {
            width: 900,
            height: 480,
        }
    }
}

impl DiagnosticRenderer for SvgPlotter {
    fn render(&self, request: &PlotRequest) -> Result<Option<RenderedPlot>, RenderError> {
        let mut svg = String::new();
        draw_svg(&mut svg, (self.width, self.height), request)?;
        Ok(Some(RenderedPlot {
            mime: "image/svg+xml".to_string(),
            bytes: svg.into_bytes(),
        }))
    }
}

/// Hours since midnight of the chart's reference date.
fn fractional_hours(origin: NaiveDateTime, t: NaiveDateTime) -> f64 {
    (t - origin).num_seconds() as f64 / 3600.0
}

fn hour_label(h: f64) -> String {
    let total_minutes = (h * 60.0).round() as i64;
    format!(
        "{:02}:{:02}",
        total_minutes.div_euclid(60),
        total_minutes.rem_euclid(60)
    )
}

fn draw_svg(buf: &mut String, size: (u32, u32), request: &PlotRequest) -> Result<(), RenderError> {
    // reference midnight and finite data bounds, over every trace at once
    let mut origin: Option<NaiveDateTime> = None;
    for series in std::iter::once(&request.base).chain(&request.companions) {
        if let Some(first) = series.times.first() {
            let midnight = first
                .date()
                .and_hms_opt(0, 0, 0)
                .ok_or_else(|| RenderError::Draw("invalid reference date".to_string()))?;
            origin = Some(match origin {
                Some(o) if o <= midnight => o,
                _ => midnight,
            });
        }
    }
    let origin = origin.ok_or_else(|| RenderError::NoData(request.title.clone()))?;

    let mut x_min = f64::INFINITY;
    let mut x_max = f64::NEG_INFINITY;
    let mut y_min = f64::INFINITY;
    let mut y_max = f64::NEG_INFINITY;
    for series in std::iter::once(&request.base).chain(&request.companions) {
        for (t, v) in series.times.iter().zip(&series.values) {
            if !v.is_finite() {
                continue;
            }
            let h = fractional_hours(origin, *t);
            x_min = x_min.min(h);
            x_max = x_max.max(h);
            y_min = y_min.min(*v);
            y_max = y_max.max(*v);
        }
    }
    if !(x_min.is_finite() && x_max.is_finite() && y_min.is_finite() && y_max.is_finite()) {
        return Err(RenderError::NoData(request.title.clone()));
    }

    let x_pad = if x_max > x_min { 0.25 } else { 0.5 };
    let y_pad = if y_max > y_min {
        (y_max - y_min) * 0.05
    } else {
        1.0
    };
    let x_range = (x_min - x_pad)..(x_max + x_pad);
    let y_range = (y_min - y_pad)..(y_max + y_pad);

    let inner = |buf: &mut String| -> Result<(), Box<dyn std::error::Error>> {
        let root = SVGBackend::with_string(buf, size).into_drawing_area();
        root.fill(&WHITE)?;

        let caption = format!("{}: {}", request.station, request.title);
        let mut chart = ChartBuilder::on(&root)
            .margin(10)
            .caption(caption, ("sans-serif", 22))
            .set_label_area_size(LabelAreaPosition::Left, 55)
            .set_label_area_size(LabelAreaPosition::Bottom, 35)
            .build_cartesian_2d(x_range, y_range)?;

        chart
            .configure_mesh()
            .x_labels(9)
            .y_labels(6)
            .x_label_formatter(&|h| hour_label(*h))
            .label_style(("sans-serif", 12))
            .draw()?;

        chart
            .draw_series(
                request
                    .base
                    .times
                    .iter()
                    .zip(&request.base.values)
                    .filter(|(_, v)| v.is_finite())
                    .map(|(t, v)| {
                        Circle::new((fractional_hours(origin, *t), *v), 2, BLUE.filled())
                    }),
            )?
            .label(request.base.name.clone())
            .legend(|(x, y)| Circle::new((x + 8, y), 3, BLUE.filled()));

        let palette = [
            RGBColor(0, 140, 70),
            RGBColor(160, 60, 180),
            RGBColor(220, 120, 0),
            RGBColor(70, 70, 70),
        ];
        for (i, companion) in request.companions.iter().enumerate() {
            let color = palette[i % palette.len()];
            chart
                .draw_series(LineSeries::new(
                    companion
                        .times
                        .iter()
                        .zip(&companion.values)
                        .filter(|(_, v)| v.is_finite())
                        .map(|(t, v)| (fractional_hours(origin, *t), *v)),
                    color.stroke_width(2),
                ))?
                .label(companion.name.clone())
                .legend(move |(x, y)| {
                    PathElement::new(vec![(x, y), (x + 16, y)], color.stroke_width(2))
                });
        }

        chart.draw_series(
            request
                .flagged
                .iter()
                .filter(|(_, v)| v.is_finite())
                .map(|(t, v)| Circle::new((fractional_hours(origin, *t), *v), 5, RED.filled())),
        )?;

        chart
            .configure_series_labels()
            .position(SeriesLabelPosition::UpperRight)
            .background_style(WHITE.mix(0.85))
            .border_style(BLACK.mix(0.4))
            .draw()?;

        root.present()?;
        Ok(())
    };

    inner(buf).map_err(|e| RenderError::Draw(e.to_string()))
}
