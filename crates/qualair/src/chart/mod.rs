//! PNG chart rendering for the dashboard pages.
//!
//! Charts are drawn with `plotters` into an in-memory RGB buffer, encoded to
//! PNG and returned as a `data:` URI ready for an `<img src>` attribute.
//!
//! A drawing failure (a missing font is the usual one) does not fail the
//! page: it is logged and whatever was drawn is still encoded.

pub mod font;

use std::io::Cursor;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use image::{ImageFormat, RgbImage};
use plotters::coord::Shift;
use plotters::prelude::*;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::report::group_numeric;
use crate::storage::PollutantSample;

pub use font::{init_fonts, FONT_FAMILY};

/// Canvas size of the histogram page chart.
pub const BAR_CHART_SIZE: (u32, u32) = (1000, 600);

/// Canvas size of the statistics page chart.
pub const BOX_PLOT_SIZE: (u32, u32) = (800, 600);

/// Prefix of every rendered chart.
pub const DATA_URI_PREFIX: &str = "data:image/png;base64,";

type DrawResult = std::result::Result<(), Box<dyn std::error::Error>>;

type Canvas<'a> = DrawingArea<BitMapBackend<'a>, Shift>;

/// Vertical bar chart with one bar per label.
///
/// Extra labels or values beyond the shorter of the two are ignored.
///
/// # Errors
///
/// Returns an error only if the canvas cannot be encoded as PNG.
pub fn render_bar_chart(labels: &[String], values: &[f64]) -> Result<String> {
    let count = labels.len().min(values.len());
    let (labels, values) = (&labels[..count], &values[..count]);
    debug!("Rendering bar chart with {} bars", count);

    let (width, height) = BAR_CHART_SIZE;
    render_png(width, height, |root| {
        if values.is_empty() {
            draw_empty(root, "Moyenne des polluants")
        } else {
            draw_bars(root, labels, values)
        }
    })
}

/// Horizontal box-and-whisker plot of the numeric values of each pollutant.
///
/// Pollutants without any numeric value are left out.
///
/// # Errors
///
/// Returns an error only if the canvas cannot be encoded as PNG.
pub fn render_box_plot(samples: &[PollutantSample]) -> Result<String> {
    let groups: Vec<(String, Vec<f64>)> = group_numeric(samples)
        .into_iter()
        .filter(|(_, values)| !values.is_empty())
        .map(|(pollutant, values)| (pollutant.to_string(), values))
        .collect();
    debug!("Rendering box plot with {} pollutants", groups.len());

    let (width, height) = BOX_PLOT_SIZE;
    render_png(width, height, |root| {
        if groups.is_empty() {
            draw_empty(root, "Distribution des valeurs par polluant")
        } else {
            draw_boxes(root, &groups)
        }
    })
}

fn render_png<F>(width: u32, height: u32, draw: F) -> Result<String>
where
    F: FnOnce(&Canvas<'_>) -> DrawResult,
{
    let mut buffer = vec![0u8; width as usize * height as usize * 3];
    {
        let root = BitMapBackend::with_buffer(&mut buffer, (width, height)).into_drawing_area();
        let drawn: DrawResult = root
            .fill(&WHITE)
            .map_err(Into::into)
            .and_then(|()| draw(&root))
            .and_then(|()| root.present().map_err(Into::into));
        if let Err(e) = drawn {
            warn!("Chart drawing incomplete: {}", e);
        }
    }
    encode_png(width, height, buffer)
}

fn draw_empty(root: &Canvas<'_>, caption: &str) -> DrawResult {
    let mut chart = ChartBuilder::on(root)
        .caption(caption, (FONT_FAMILY, 24).into_font())
        .margin(20)
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d(0f64..1f64, 0f64..1f64)?;
    chart.configure_mesh().draw()?;
    Ok(())
}

fn draw_bars(root: &Canvas<'_>, labels: &[String], values: &[f64]) -> DrawResult {
    let top = values.iter().copied().fold(0.0, f64::max);
    let bottom = values.iter().copied().fold(0.0, f64::min);
    let top = if top > 0.0 { top * 1.1 } else { 1.0 };
    let bottom = bottom * 1.1;
    let bars = u32::try_from(labels.len())?;

    let mut chart = ChartBuilder::on(root)
        .caption("Moyenne des polluants", (FONT_FAMILY, 24).into_font())
        .margin(20)
        .x_label_area_size(120)
        .y_label_area_size(60)
        .build_cartesian_2d((0u32..bars).into_segmented(), bottom..top)?;

    let label_of = |value: &SegmentValue<u32>| match value {
        SegmentValue::CenterOf(i) => usize::try_from(*i)
            .ok()
            .and_then(|i| labels.get(i))
            .cloned()
            .unwrap_or_default(),
        _ => String::new(),
    };

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(labels.len())
        .x_label_formatter(&label_of)
        .x_label_style((FONT_FAMILY, 14).into_font().transform(FontTransform::Rotate90))
        .x_desc("Polluants")
        .y_desc("Moyenne")
        .draw()?;

    chart.draw_series(
        Histogram::vertical(&chart)
            .style(BLUE.filled())
            .margin(10)
            .data((0u32..).zip(values.iter().copied())),
    )?;
    Ok(())
}

#[allow(clippy::cast_possible_truncation)]
fn draw_boxes(root: &Canvas<'_>, groups: &[(String, Vec<f64>)]) -> DrawResult {
    let all = groups.iter().flat_map(|(_, values)| values.iter().copied());
    let (low, high) = all.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    });
    let pad = ((high - low) * 0.05).max(1.0);
    let range = (low - pad) as f32..(high + pad) as f32;

    let labels: Vec<String> = groups.iter().map(|(name, _)| name.clone()).collect();

    let mut chart = ChartBuilder::on(root)
        .caption("Distribution des valeurs par polluant", (FONT_FAMILY, 24).into_font())
        .margin(20)
        .x_label_area_size(40)
        .y_label_area_size(100)
        .build_cartesian_2d(range, labels[..].into_segmented())?;

    chart
        .configure_mesh()
        .y_labels(labels.len())
        .x_desc("Valeur")
        .y_desc("Polluant")
        .draw()?;

    chart.draw_series(groups.iter().map(|(name, values)| {
        Boxplot::new_horizontal(SegmentValue::CenterOf(name), &Quartiles::new(values))
            .width(20)
            .whisker_width(0.5)
            .style(BLUE)
    }))?;
    Ok(())
}

fn encode_png(width: u32, height: u32, buffer: Vec<u8>) -> Result<String> {
    let image = RgbImage::from_raw(width, height, buffer)
        .ok_or_else(|| Error::chart_render("canvas buffer does not match its size"))?;

    let mut png = Cursor::new(Vec::new());
    image.write_to(&mut png, ImageFormat::Png)?;
    Ok(to_data_uri(png.get_ref()))
}

/// Wrap PNG bytes in a base64 `data:` URI.
#[must_use]
pub fn to_data_uri(png: &[u8]) -> String {
    format!("{DATA_URI_PREFIX}{}", STANDARD.encode(png))
}
