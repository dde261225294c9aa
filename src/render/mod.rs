use crate::quotes::{Asset, PriceSeries, QuoteMeta};
use crate::settings::DisplaySettings;
use embedded_graphics::{
    mono_font::{
        iso_8859_15::{FONT_10X20, FONT_6X10, FONT_7X13, FONT_7X13_BOLD, FONT_9X15_BOLD},
        MonoTextStyle,
    },
    pixelcolor::Gray8,
    prelude::*,
    primitives::{PrimitiveStyle, Rectangle},
    text::{Baseline, Text},
};
use embedded_text::{
    alignment::{HorizontalAlignment, VerticalAlignment},
    style::TextBoxStyleBuilder,
    TextBox,
};
use std::convert::Infallible;

mod format;
mod icons;
mod sparkline;
pub use format::*;
pub use icons::Icon;

pub const WIDTH: u32 = 264;
pub const HEIGHT: u32 = 176;
const TIMESTAMP_FORMAT: &str = "%-I:%M %p, %d %b %Y";
const LONG_PRICE: usize = 9;

/// An 8-bit grayscale raster, row major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl Default for Frame {
    fn default() -> Self {
        Self::blank(WIDTH, HEIGHT)
    }
}

impl Frame {
    pub fn blank(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![Gray8::WHITE.luma(); (width * height) as usize],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn pixel(&self, x: u32, y: u32) -> u8 {
        self.pixels[(y * self.width + x) as usize]
    }

    pub fn invert(&mut self) {
        self.pixels.iter_mut().for_each(|p| *p = !*p);
    }

    /// Rotates clockwise by `degrees`, which must be a multiple of 90.
    pub fn rotate(self, degrees: u16) -> Self {
        let (w, h) = (self.width, self.height);
        let (width, height) = match degrees % 360 {
            90 | 270 => (h, w),
            _ => (w, h),
        };
        let mut rotated = Self::blank(width, height);
        for y in 0..h {
            for x in 0..w {
                let (nx, ny) = match degrees % 360 {
                    90 => (h - 1 - y, x),
                    180 => (w - 1 - x, h - 1 - y),
                    270 => (y, w - 1 - x),
                    _ => (x, y),
                };
                rotated.pixels[(ny * width + nx) as usize] = self.pixel(x, y);
            }
        }
        rotated
    }
}

impl OriginDimensions for Frame {
    fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }
}

impl DrawTarget for Frame {
    type Color = Gray8;
    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(point, color) in pixels {
            if let Ok((x, y)) = <(u32, u32)>::try_from(point) {
                if x < self.width && y < self.height {
                    self.pixels[(y * self.width + x) as usize] = color.luma();
                }
            }
        }
        Ok(())
    }
}

/// Everything shown for one quote.
#[derive(Debug, Clone, Copy)]
pub struct QuoteView<'a> {
    pub asset: &'a Asset,
    pub fiat: &'a str,
    pub series: &'a PriceSeries,
    pub meta: &'a QuoteMeta,
    pub lookback_days: u32,
    pub icon: &'a Icon,
}

pub fn timestamp<Tz: chrono::TimeZone>(now: &chrono::DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    now.format(TIMESTAMP_FORMAT).to_string()
}

fn small() -> MonoTextStyle<'static, Gray8> {
    MonoTextStyle::new(&FONT_6X10, Gray8::BLACK)
}

fn draw_quote<D>(
    target: &mut D,
    view: &QuoteView,
    locale: &str,
    timestamp: &str,
) -> Result<(), D::Error>
where
    D: DrawTarget<Color = Gray8>,
{
    let price = view.series.latest();
    let price_text = price_string(view.asset, price, view.fiat, locale);

    view.icon.draw(target, Point::new(4, 10))?;
    Text::with_baseline(timestamp, Point::new(95, 12), small(), Baseline::Top).draw(target)?;
    sparkline::draw(target, Point::new(84, 34), view.series.points())?;

    let change = change_string(view.lookback_days, view.series.change_pct());
    Text::with_baseline(&change, Point::new(110, 90), small(), Baseline::Top).draw(target)?;
    match view.asset {
        Asset::Equity(_) => {
            if let Some(day_change) = view.meta.day_change {
                let today = format!("today : {:+.2}%", day_change);
                Text::with_baseline(&today, Point::new(110, 104), small(), Baseline::Top)
                    .draw(target)?;
            }
        }
        Asset::Crypto(_) => {
            let volume = format!("24h vol : {}", human_format(view.meta.volume));
            Text::with_baseline(&volume, Point::new(110, 104), small(), Baseline::Top)
                .draw(target)?;
            if view.meta.market_cap_rank > 0 {
                let rank = format!("rank #{}", view.meta.market_cap_rank);
                Text::with_baseline(&rank, Point::new(110, 118), small(), Baseline::Top)
                    .draw(target)?;
            }
        }
    }

    if view.meta.all_time_high {
        let badge = Rectangle::new(Point::new(212, 114), Size::new(34, 17));
        badge
            .into_styled(PrimitiveStyle::with_fill(Gray8::BLACK))
            .draw(target)?;
        Text::with_baseline(
            "ATH",
            badge.top_left + Point::new(6, 2),
            MonoTextStyle::new(&FONT_7X13_BOLD, Gray8::WHITE),
            Baseline::Top,
        )
        .draw(target)?;
    }

    let font = if price_text.chars().count() > LONG_PRICE {
        &FONT_9X15_BOLD
    } else {
        &FONT_10X20
    };
    let centered = TextBoxStyleBuilder::new()
        .alignment(HorizontalAlignment::Center)
        .vertical_alignment(VerticalAlignment::Middle)
        .build();
    TextBox::with_textbox_style(
        &price_text,
        Rectangle::new(Point::new(0, 132), Size::new(WIDTH, 40)),
        MonoTextStyle::new(font, Gray8::BLACK),
        centered,
    )
    .draw(target)?;
    Ok(())
}

fn draw_problem<D>(target: &mut D, message: &str, timestamp: &str) -> Result<(), D::Error>
where
    D: DrawTarget<Color = Gray8>,
{
    Text::with_baseline(timestamp, Point::new(95, 12), small(), Baseline::Top).draw(target)?;
    let panel = Rectangle::new(Point::new(8, 32), Size::new(WIDTH - 16, HEIGHT - 40));
    panel
        .into_styled(PrimitiveStyle::with_stroke(Gray8::BLACK, 2))
        .draw(target)?;
    let centered = TextBoxStyleBuilder::new()
        .alignment(HorizontalAlignment::Center)
        .vertical_alignment(VerticalAlignment::Middle)
        .build();
    let issue = format!("Issue: {}", message);
    TextBox::with_textbox_style(
        &issue,
        panel.offset(-6),
        MonoTextStyle::new(&FONT_7X13, Gray8::BLACK),
        centered,
    )
    .draw(target)?;
    Ok(())
}

/// Applies orientation and inversion to a composed frame.
fn finish(frame: Frame, display: &DisplaySettings) -> Frame {
    let mut frame = frame.rotate(display.orientation);
    if display.inverted {
        frame.invert();
    }
    frame
}

pub fn render_quote(view: &QuoteView, display: &DisplaySettings, timestamp: &str) -> Frame {
    let mut frame = Frame::default();
    if let Err(never) = draw_quote(&mut frame, view, &display.locale, timestamp) {
        match never {}
    }
    finish(frame, display)
}

pub fn render_problem(message: &str, display: &DisplaySettings, timestamp: &str) -> Frame {
    let mut frame = Frame::default();
    if let Err(never) = draw_problem(&mut frame, message, timestamp) {
        match never {}
    }
    finish(frame, display)
}

#[cfg(test)]
mod test {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn view<'a>(
        asset: &'a Asset,
        series: &'a PriceSeries,
        meta: &'a QuoteMeta,
        icon: &'a Icon,
    ) -> QuoteView<'a> {
        QuoteView {
            asset,
            fiat: "usd",
            series,
            meta,
            lookback_days: 7,
            icon,
        }
    }

    fn black_pixels(frame: &Frame) -> usize {
        frame.pixels().iter().filter(|p| **p == 0).count()
    }

    #[test]
    fn test_timestamp() {
        let now = Utc.with_ymd_and_hms(2024, 3, 5, 14, 7, 0).unwrap();
        assert_eq!(timestamp(&now), "2:07 PM, 05 Mar 2024");
    }

    #[test]
    fn test_render_is_idempotent() {
        let asset = Asset::parse("bitcoin");
        let series = PriceSeries::new(vec![67000.0, 67500.0, 66800.0, 68100.0]);
        let meta = QuoteMeta {
            volume: 3.1e10,
            market_cap_rank: 1,
            all_time_high: true,
            day_change: None,
        };
        let icon = Icon::Placeholder('B');
        let display = DisplaySettings::default();
        let first = render_quote(&view(&asset, &series, &meta, &icon), &display, "1:00 PM");
        let second = render_quote(&view(&asset, &series, &meta, &icon), &display, "1:00 PM");
        assert_eq!(first, second);
        assert_eq!((first.width(), first.height()), (WIDTH, HEIGHT));
        assert!(black_pixels(&first) > 0);
    }

    #[test]
    fn test_inverted_and_rotated() {
        let asset = Asset::parse("AAPL.US");
        let series = PriceSeries::new(vec![180.0, 185.0]);
        let meta = QuoteMeta {
            day_change: Some(1.5),
            ..QuoteMeta::default()
        };
        let icon = Icon::Placeholder('A');
        let plain = render_quote(
            &view(&asset, &series, &meta, &icon),
            &DisplaySettings::default(),
            "",
        );
        let display = DisplaySettings {
            inverted: true,
            orientation: 90,
            ..DisplaySettings::default()
        };
        let turned = render_quote(&view(&asset, &series, &meta, &icon), &display, "");
        assert_eq!((turned.width(), turned.height()), (HEIGHT, WIDTH));
        assert_eq!(
            black_pixels(&plain),
            turned.pixels().iter().filter(|p| **p == 255).count()
        );
    }

    #[test]
    fn test_render_problem() {
        let frame = render_problem("AAPL price unavailable", &DisplaySettings::default(), "");
        assert!(black_pixels(&frame) > 0);
    }

    #[test]
    fn test_rotate() {
        let mut frame = Frame::blank(3, 2);
        frame.pixels[1] = 0; // (1, 0)
        let right = frame.clone().rotate(90);
        assert_eq!((right.width(), right.height()), (2, 3));
        assert_eq!(right.pixel(1, 1), 0);
        let flipped = frame.clone().rotate(180);
        assert_eq!(flipped.pixel(1, 1), 0);
        let left = frame.clone().rotate(270);
        assert_eq!(left.pixel(0, 1), 0);
        assert_eq!(frame.clone().rotate(360), frame);
    }
}
