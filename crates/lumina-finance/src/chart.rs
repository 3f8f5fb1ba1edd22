//! Comparison chart construction and PNG rasterization
//!
//! [`build`] produces a serializable [`ChartArtifact`] that a front-end can
//! draw itself. [`rasterize`] renders the same artifact to a 1200x600 PNG for
//! the vision model. The bitmap carries geometry only (no glyphs), so the
//! title and series names reach the model through the prompt text.

use crate::error::{FinanceError, Result};
use crate::models::{ChartKind, MarketSnapshot, PricePoint};
use chrono::{DateTime, Duration, Utc};
use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder};
use plotters::prelude::*;
use serde::Serialize;
use tracing::{debug, warn};

pub const CHART_TITLE: &str = "Financial Data Comparison";
pub const X_AXIS_TITLE: &str = "Date";
pub const Y_AXIS_TITLE: &str = "Price ($)";

/// Trace colors, indexed by the symbol's position in the snapshot
pub const PALETTE: [&str; 6] = ["#667eea", "#764ba2", "#f093fb", "#f5576c", "#4facfe", "#00f2fe"];

pub const RASTER_WIDTH: u32 = 1200;
pub const RASTER_HEIGHT: u32 = 600;

const MARGIN: u32 = 24;
const CANDLE_WIDTH: u32 = 4;

/// One symbol's series
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartTrace {
    pub name: String,
    pub color: String,
    pub points: Vec<PricePoint>,
}

/// In-memory figure
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartArtifact {
    pub title: String,
    pub kind: ChartKind,
    pub x_title: String,
    pub y_title: String,
    pub traces: Vec<ChartTrace>,
}

impl ChartArtifact {
    pub fn is_empty(&self) -> bool {
        self.traces.is_empty()
    }

    /// Serialize for a front-end
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Build a figure from every symbol with a non-empty history
pub fn build(snapshot: &MarketSnapshot, kind: ChartKind) -> ChartArtifact {
    let traces = snapshot
        .iter()
        .enumerate()
        .filter(|(_, (_, record))| !record.history().is_empty())
        .map(|(index, (symbol, record))| ChartTrace {
            name: symbol.to_string(),
            color: PALETTE[index % PALETTE.len()].to_string(),
            points: record.history().to_vec(),
        })
        .collect::<Vec<_>>();

    debug!("Built {} chart with {} traces", kind, traces.len());

    ChartArtifact {
        title: CHART_TITLE.to_string(),
        kind,
        x_title: X_AXIS_TITLE.to_string(),
        y_title: Y_AXIS_TITLE.to_string(),
        traces,
    }
}

/// Render `artifact` as PNG bytes
///
/// Returns an empty buffer when there is nothing to draw or rendering fails.
pub fn rasterize(artifact: &ChartArtifact) -> Vec<u8> {
    if artifact.is_empty() {
        warn!("Chart has no traces, skipping rasterization");
        return Vec::new();
    }

    match render_png(artifact) {
        Ok(png) => {
            debug!("Rasterized chart to {} PNG bytes", png.len());
            png
        }
        Err(e) => {
            warn!("Chart rasterization failed: {}", e);
            Vec::new()
        }
    }
}

fn render_png(artifact: &ChartArtifact) -> Result<Vec<u8>> {
    let (x_range, y_range) = bounds(artifact)
        .ok_or_else(|| FinanceError::ChartError("no points to plot".to_string()))?;

    let mut pixels = vec![0u8; (RASTER_WIDTH * RASTER_HEIGHT * 3) as usize];
    {
        let root = BitMapBackend::with_buffer(&mut pixels, (RASTER_WIDTH, RASTER_HEIGHT))
            .into_drawing_area();
        root.fill(&WHITE).map_err(chart_error)?;

        let mut chart = ChartBuilder::on(&root)
            .margin(MARGIN)
            .build_cartesian_2d(x_range, y_range)
            .map_err(chart_error)?;

        for trace in &artifact.traces {
            let color = parse_hex(&trace.color).unwrap_or(BLACK);
            match artifact.kind {
                ChartKind::Line => {
                    chart
                        .draw_series(LineSeries::new(
                            trace.points.iter().map(|p| (p.date, p.close)),
                            color.stroke_width(2),
                        ))
                        .map_err(chart_error)?;
                }
                ChartKind::Candlestick => {
                    chart
                        .draw_series(trace.points.iter().map(|p| {
                            CandleStick::new(
                                p.date,
                                p.open,
                                p.high,
                                p.low,
                                p.close,
                                color.filled(),
                                color.mix(0.4).filled(),
                                CANDLE_WIDTH,
                            )
                        }))
                        .map_err(chart_error)?;
                }
            }
        }

        root.present().map_err(chart_error)?;
    }

    let mut png = Vec::new();
    PngEncoder::new(&mut png)
        .write_image(&pixels, RASTER_WIDTH, RASTER_HEIGHT, ExtendedColorType::Rgb8)
        .map_err(chart_error)?;
    Ok(png)
}

type Bounds = (std::ops::Range<DateTime<Utc>>, std::ops::Range<f64>);

/// Date and price ranges covering every trace, padded so they are never empty
fn bounds(artifact: &ChartArtifact) -> Option<Bounds> {
    let points = artifact.traces.iter().flat_map(|t| t.points.iter());

    let (mut x_min, mut x_max) = (None::<DateTime<Utc>>, None::<DateTime<Utc>>);
    let (mut y_min, mut y_max) = (f64::INFINITY, f64::NEG_INFINITY);
    for p in points {
        x_min = Some(x_min.map_or(p.date, |m| m.min(p.date)));
        x_max = Some(x_max.map_or(p.date, |m| m.max(p.date)));
        let (lo, hi) = match artifact.kind {
            ChartKind::Line => (p.close, p.close),
            ChartKind::Candlestick => (p.low, p.high),
        };
        y_min = y_min.min(lo);
        y_max = y_max.max(hi);
    }

    let (x_min, mut x_max) = (x_min?, x_max?);
    if x_max <= x_min {
        x_max = x_min + Duration::days(1);
    }

    let pad = ((y_max - y_min) * 0.05).max(1.0);
    Some((x_min..x_max, (y_min - pad)..(y_max + pad)))
}

fn parse_hex(hex: &str) -> Option<RGBColor> {
    let hex = hex.strip_prefix('#')?;
    if hex.len() != 6 {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok();
    Some(RGBColor(channel(0)?, channel(2)?, channel(4)?))
}

fn chart_error(e: impl std::fmt::Display) -> FinanceError {
    FinanceError::ChartError(e.to_string())
}
