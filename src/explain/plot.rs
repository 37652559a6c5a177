use crate::error::{AppError, Result};
use crate::explain::shap::Attribution;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use image::{codecs::png::PngEncoder, ExtendedColorType, ImageEncoder};
use plotters::prelude::*;
use plotters::style::{register_font, FontStyle};
use std::sync::Once;

/// Contribution pushing the margin towards failure (green).
const POSITIVE_COLOR: RGBColor = RGBColor(44, 160, 44);

/// Contribution pushing the margin away from failure (purple).
const NEGATIVE_COLOR: RGBColor = RGBColor(148, 103, 189);

const PLOT_WIDTH: u32 = 900;
const ROW_HEIGHT: u32 = 44;

static FONT_INIT: Once = Once::new();

/// The bundled font keeps rendering independent of system font lookup.
fn ensure_fonts() {
    FONT_INIT.call_once(|| {
        let bytes: &'static [u8] = include_bytes!("../../assets/fonts/DejaVuSans.ttf");
        if register_font("sans-serif", FontStyle::Normal, bytes).is_err() {
            tracing::warn!("failed to register bundled plot font");
        }
    });
}

/// Shortened feature names used on plot labels.
fn short_display_name(name: &str) -> &str {
    match name {
        "Air temperature [K]" => "Air Temp (K)",
        "Process temperature [K]" => "Process Temp (K)",
        "Rotational speed [rpm]" => "Speed (rpm)",
        "Torque [Nm]" => "Torque (Nm)",
        "Tool wear [min]" => "Tool Wear (min)",
        "Type_L" => "Type L",
        "Type_M" => "Type M",
        other => other,
    }
}

/// Label text for one bar.
fn bar_label(name: &str, value: f64) -> String {
    format!("{} = {:.5}", short_display_name(name), value)
}

/// Render an attribution as a horizontal force-style plot.
///
/// Returns the PNG as a base64 string, or an empty string when anything in
/// the pipeline fails; callers treat the plot as an optional enrichment.
pub fn render_force_plot(attribution: &Attribution, feature_names: &[String]) -> String {
    match try_render(attribution, feature_names) {
        Ok(png) => STANDARD.encode(png),
        Err(e) => {
            tracing::warn!(error = %e, "attribution plot rendering failed");
            String::new()
        }
    }
}

fn try_render(attribution: &Attribution, feature_names: &[String]) -> Result<Vec<u8>> {
    let n = attribution.values.len();
    if n == 0 || n != feature_names.len() {
        return Err(AppError::Computation(format!(
            "attribution has {} values for {} feature names",
            n,
            feature_names.len()
        )));
    }
    if attribution.values.iter().any(|v| !v.is_finite()) {
        return Err(AppError::Computation(
            "attribution contains non-finite values".to_string(),
        ));
    }

    ensure_fonts();

    let height = 90 + ROW_HEIGHT * n as u32;
    let mut buffer = vec![0u8; (PLOT_WIDTH * height * 3) as usize];
    {
        let root = BitMapBackend::with_buffer(&mut buffer, (PLOT_WIDTH, height)).into_drawing_area();
        root.fill(&WHITE).map_err(plot_err)?;

        let max_abs = attribution
            .values
            .iter()
            .fold(0.0f64, |acc, v| acc.max(v.abs()))
            .max(1e-9);
        let x_min = -max_abs * 1.6;
        let x_max = max_abs * 1.6;

        let mut chart = ChartBuilder::on(&root)
            .caption(
                format!("Feature contributions (base value = {:.5})", attribution.base_value),
                ("sans-serif", 22).into_font(),
            )
            .margin(12)
            .x_label_area_size(30)
            .y_label_area_size(8)
            .build_cartesian_2d(x_min..x_max, 0.0..n as f64)
            .map_err(plot_err)?;

        chart
            .configure_mesh()
            .disable_mesh()
            .x_desc("margin contribution")
            .draw()
            .map_err(plot_err)?;

        // Zero line all bars grow from.
        chart
            .draw_series(std::iter::once(PathElement::new(
                vec![(0.0, 0.0), (0.0, n as f64)],
                BLACK.stroke_width(1),
            )))
            .map_err(plot_err)?;

        for (i, (&value, name)) in attribution.values.iter().zip(feature_names).enumerate() {
            // First feature on top.
            let row = (n - 1 - i) as f64;
            let color = if value >= 0.0 {
                POSITIVE_COLOR
            } else {
                NEGATIVE_COLOR
            };

            chart
                .draw_series(std::iter::once(Rectangle::new(
                    [(0.0, row + 0.2), (value, row + 0.75)],
                    color.filled(),
                )))
                .map_err(plot_err)?;

            chart
                .draw_series(std::iter::once(Text::new(
                    bar_label(name, value),
                    (x_min * 0.98, row + 0.55),
                    ("sans-serif", 15).into_font(),
                )))
                .map_err(plot_err)?;
        }

        root.present().map_err(plot_err)?;
    }

    let mut png = Vec::new();
    PngEncoder::new(&mut png)
        .write_image(&buffer, PLOT_WIDTH, height, ExtendedColorType::Rgb8)
        .map_err(|e| AppError::Computation(format!("png encoding failed: {}", e)))?;
    Ok(png)
}

fn plot_err<E: std::fmt::Display>(e: E) -> AppError {
    AppError::Computation(format!("plot drawing failed: {}", e))
}
