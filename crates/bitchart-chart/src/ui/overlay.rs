//! The 2D overlay: grid labels, crosshair and the OHLCV tooltip card.
//!
//! Painted on the UI thread from a scales/theme/crosshair snapshot, with no
//! state of its own. The resulting egui shapes are tessellated by the app
//! shell and composited over the chart by the render worker.

use egui::{Align2, Color32, FontId, Pos2, Rect, Stroke, Vec2};

use bitchart_core::Theme;
use bitchart_scale::{PriceScale, TimeScale};

use crate::events::Crosshair;

/// Everything the overlay needs for one paint pass.
///
/// The scales and the crosshair work in physical pixels; egui paints in
/// logical points. `pixels_per_point` bridges the two.
pub struct OverlaySnapshot<'a> {
    pub time_scale: &'a TimeScale,
    pub price_scale: &'a PriceScale,
    pub theme: &'a Theme,
    pub crosshair: Option<&'a Crosshair>,
    /// Content size in logical points.
    pub width: f32,
    pub height: f32,
    pub pixels_per_point: f32,
}

/// Grid label density.
const TICK_TARGET: usize = 8;
const LABEL_FONT: f32 = 11.0;

/// Paint the overlay in order: axis labels, crosshair, tooltip card.
pub fn paint_overlay(ctx: &egui::Context, snapshot: &OverlaySnapshot<'_>) {
    let painter = ctx.layer_painter(egui::LayerId::new(
        egui::Order::Foreground,
        egui::Id::new("chart-overlay"),
    ));
    let text_color = color32(snapshot.theme.text);
    let font = FontId::monospace(LABEL_FONT);

    let ppp = snapshot.pixels_per_point.max(0.1);

    // Time axis labels along the bottom edge.
    for tick in snapshot.time_scale.grid_ticks(TICK_TARGET) {
        let x = snapshot.time_scale.data_to_pixel(tick) / ppp;
        if x < 0.0 || x > snapshot.width {
            continue;
        }
        painter.text(
            Pos2::new(x, snapshot.height - 4.0),
            Align2::CENTER_BOTTOM,
            format_time_ms(tick),
            font.clone(),
            text_color,
        );
    }

    // Price axis labels along the right edge.
    for tick in snapshot.price_scale.grid_ticks(TICK_TARGET) {
        let y = snapshot.price_scale.data_to_pixel(tick) / ppp;
        if y < 0.0 || y > snapshot.height {
            continue;
        }
        painter.text(
            Pos2::new(snapshot.width - 4.0, y),
            Align2::RIGHT_CENTER,
            format_price(tick),
            font.clone(),
            text_color,
        );
    }

    if let Some(crosshair) = snapshot.crosshair {
        // Crosshair positions arrive in physical pixels.
        let mut crosshair = *crosshair;
        crosshair.x /= ppp;
        crosshair.y /= ppp;
        paint_crosshair(&painter, snapshot, &crosshair, &font);
        if crosshair.bar.is_some() {
            paint_tooltip(&painter, snapshot, &crosshair, &font);
        }
    }
}

fn paint_crosshair(
    painter: &egui::Painter,
    snapshot: &OverlaySnapshot<'_>,
    crosshair: &Crosshair,
    font: &FontId,
) {
    let stroke = Stroke::new(1.0, color32(snapshot.theme.crosshair));
    let text_color = color32(snapshot.theme.background);
    let tag_fill = color32(snapshot.theme.crosshair);

    // Dashed rules through the pointer.
    painter.extend(egui::Shape::dashed_line(
        &[
            Pos2::new(crosshair.x, 0.0),
            Pos2::new(crosshair.x, snapshot.height),
        ],
        stroke,
        4.0,
        4.0,
    ));
    painter.extend(egui::Shape::dashed_line(
        &[
            Pos2::new(0.0, crosshair.y),
            Pos2::new(snapshot.width, crosshair.y),
        ],
        stroke,
        4.0,
        4.0,
    ));

    // Axis tags at the rule ends.
    let price_tag = format_price(crosshair.price);
    let price_pos = Pos2::new(snapshot.width - 4.0, crosshair.y);
    let rect = painter.text(
        price_pos,
        Align2::RIGHT_CENTER,
        &price_tag,
        font.clone(),
        text_color,
    );
    painter.rect_filled(rect.expand(2.0), 2.0, tag_fill);
    painter.text(
        price_pos,
        Align2::RIGHT_CENTER,
        price_tag,
        font.clone(),
        text_color,
    );

    let time_tag = format_time_ms(crosshair.time);
    let time_pos = Pos2::new(crosshair.x, snapshot.height - 4.0);
    let rect = painter.text(
        time_pos,
        Align2::CENTER_BOTTOM,
        &time_tag,
        font.clone(),
        text_color,
    );
    painter.rect_filled(rect.expand(2.0), 2.0, tag_fill);
    painter.text(
        time_pos,
        Align2::CENTER_BOTTOM,
        time_tag,
        font.clone(),
        text_color,
    );
}

fn paint_tooltip(
    painter: &egui::Painter,
    snapshot: &OverlaySnapshot<'_>,
    crosshair: &Crosshair,
    font: &FontId,
) {
    let Some(bar) = crosshair.bar else {
        return;
    };

    let lines = [
        format!("O {:>12}", format_price(f64::from(bar.open))),
        format!("H {:>12}", format_price(f64::from(bar.high))),
        format!("L {:>12}", format_price(f64::from(bar.low))),
        format!("C {:>12}", format_price(f64::from(bar.close))),
        format!("V {:>12.4}", bar.volume),
    ];

    let line_height = LABEL_FONT + 4.0;
    let card_size = Vec2::new(130.0, line_height * lines.len() as f32 + 10.0);
    let mut origin = Pos2::new(crosshair.x + 14.0, crosshair.y + 14.0);
    // Keep the card inside the content area.
    if origin.x + card_size.x > snapshot.width {
        origin.x = crosshair.x - 14.0 - card_size.x;
    }
    if origin.y + card_size.y > snapshot.height {
        origin.y = crosshair.y - 14.0 - card_size.y;
    }

    let card = Rect::from_min_size(origin, card_size);
    let bg = snapshot.theme.background;
    let fill = Color32::from_rgba_unmultiplied(
        (bg[0].clamp(0.0, 1.0) * 255.0) as u8,
        (bg[1].clamp(0.0, 1.0) * 255.0) as u8,
        (bg[2].clamp(0.0, 1.0) * 255.0) as u8,
        230,
    );
    painter.rect_filled(card, 4.0, fill);
    painter.rect_stroke(
        card,
        4.0,
        Stroke::new(1.0, color32(snapshot.theme.grid)),
        egui::StrokeKind::Inside,
    );

    let change_color = if bar.is_bullish() {
        color32(snapshot.theme.up)
    } else {
        color32(snapshot.theme.down)
    };
    for (i, line) in lines.iter().enumerate() {
        let color = if i == 3 {
            change_color
        } else {
            color32(snapshot.theme.text)
        };
        painter.text(
            Pos2::new(card.min.x + 6.0, card.min.y + 5.0 + line_height * i as f32),
            Align2::LEFT_TOP,
            line,
            font.clone(),
            color,
        );
    }
}

/// Convert a linear-RGBA theme color to egui's color type.
pub fn color32(c: [f32; 4]) -> Color32 {
    Color32::from_rgba_unmultiplied(
        (c[0].clamp(0.0, 1.0) * 255.0) as u8,
        (c[1].clamp(0.0, 1.0) * 255.0) as u8,
        (c[2].clamp(0.0, 1.0) * 255.0) as u8,
        (c[3].clamp(0.0, 1.0) * 255.0) as u8,
    )
}

/// Format a millisecond timestamp (arbitrary epoch) as `Nd HH:MM:SS`,
/// dropping leading components that are zero.
pub fn format_time_ms(t: f64) -> String {
    let total_seconds = (t / 1000.0).max(0.0) as u64;
    let days = total_seconds / 86_400;
    let hours = (total_seconds / 3_600) % 24;
    let minutes = (total_seconds / 60) % 60;
    let seconds = total_seconds % 60;
    if days > 0 {
        format!("{days}d {hours:02}:{minutes:02}")
    } else if hours > 0 {
        format!("{hours:02}:{minutes:02}:{seconds:02}")
    } else {
        format!("{minutes:02}:{seconds:02}")
    }
}

/// Format a price with a precision that follows its magnitude.
pub fn format_price(p: f64) -> String {
    let abs = p.abs();
    if abs >= 1_000.0 {
        format!("{p:.1}")
    } else if abs >= 1.0 {
        format!("{p:.2}")
    } else {
        format!("{p:.5}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bitchart_core::Bar;

    #[test]
    fn test_format_time_components() {
        assert_eq!(format_time_ms(0.0), "00:00");
        assert_eq!(format_time_ms(61_000.0), "01:01");
        assert_eq!(format_time_ms(3_661_000.0), "01:01:01");
        assert_eq!(format_time_ms(90_000_000.0), "1d 01:00");
    }

    #[test]
    fn test_format_price_precision() {
        assert_eq!(format_price(42_123.456), "42123.5");
        assert_eq!(format_price(123.456), "123.46");
        assert_eq!(format_price(0.5), "0.50000");
        assert_eq!(format_price(0.0125), "0.01250");
    }

    #[test]
    fn test_color32_conversion() {
        assert_eq!(color32([1.0, 0.0, 0.0, 1.0]), Color32::from_rgb(255, 0, 0));
        assert_eq!(
            color32([0.0, 0.0, 0.0, 0.0]),
            Color32::from_rgba_unmultiplied(0, 0, 0, 0)
        );
        // Out-of-range values clamp.
        assert_eq!(color32([2.0, -1.0, 0.5, 1.0]).r(), 255);
        assert_eq!(color32([2.0, -1.0, 0.5, 1.0]).g(), 0);
    }

    #[test]
    fn test_paint_produces_shapes() {
        let mut time_scale = TimeScale::new(800.0);
        time_scale.set_data_range(0.0, 3_600_000.0);
        time_scale.fit_content();
        let mut price_scale = PriceScale::new(600.0);
        price_scale.set_data_range(100.0, 200.0);
        price_scale.fit_content();
        let theme = Theme::dark();

        let crosshair = Crosshair {
            x: 400.0,
            y: 300.0,
            time: 1_800_000.0,
            price: 150.0,
            bar: Some(Bar::new(1_800_000.0, 149.0, 151.0, 148.0, 150.0, 3.0)),
        };

        let ctx = egui::Context::default();
        let output = ctx.run(egui::RawInput::default(), |ctx| {
            let snapshot = OverlaySnapshot {
                time_scale: &time_scale,
                price_scale: &price_scale,
                theme: &theme,
                crosshair: Some(&crosshair),
                width: 800.0,
                height: 600.0,
                pixels_per_point: 1.0,
            };
            paint_overlay(ctx, &snapshot);
        });
        // Labels, crosshair rules and the tooltip card all produced shapes.
        assert!(!output.shapes.is_empty());
    }
}
