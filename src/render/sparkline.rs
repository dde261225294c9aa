use embedded_graphics::{
    pixelcolor::Gray8,
    prelude::*,
    primitives::{Circle, Line, Polyline, PrimitiveStyle},
};

pub const SIZE: Size = Size::new(170, 50);
const MARGIN: i32 = 5;
const DASH: i32 = 5;
const GAP: i32 = 3;
const MARKER_DIAMETER: u32 = 9;

/// Subtracts the mean so the chart is centered on zero instead of scaled to
/// the absolute price. Empty or all-zero input charts as a flat line.
pub fn centered(points: &[f64]) -> Vec<f64> {
    let points = if points.iter().all(|p| *p == 0.0) {
        &[0.0, 0.0][..]
    } else {
        points
    };
    let mean = points.iter().sum::<f64>() / points.len() as f64;
    points.iter().map(|p| p - mean).collect()
}

fn plot(points: &[f64]) -> Vec<Point> {
    let width = SIZE.width as i32 - 1;
    let mid = SIZE.height as i32 / 2;
    let half = mid - MARGIN;
    let amplitude = points.iter().fold(0.0f64, |acc, p| acc.max(p.abs()));
    let last = points.len().saturating_sub(1).max(1) as i32;
    points
        .iter()
        .enumerate()
        .map(|(i, p)| {
            let x = if points.len() == 1 {
                width
            } else {
                i as i32 * width / last
            };
            let dy = if amplitude > 0.0 {
                (p / amplitude * half as f64).round() as i32
            } else {
                0
            };
            Point::new(x, mid - dy)
        })
        .collect()
}

/// Draws the mean-centered sparkline with its top left corner at `origin`.
pub fn draw<D>(target: &mut D, origin: Point, prices: &[f64]) -> Result<(), D::Error>
where
    D: DrawTarget<Color = Gray8>,
{
    let mid = origin.y + SIZE.height as i32 / 2;
    let axis = PrimitiveStyle::with_stroke(Gray8::BLACK, 1);
    let mut x = origin.x;
    while x < origin.x + SIZE.width as i32 {
        let end = (x + DASH).min(origin.x + SIZE.width as i32 - 1);
        Line::new(Point::new(x, mid), Point::new(end, mid))
            .into_styled(axis)
            .draw(target)?;
        x += DASH + GAP;
    }

    let points: Vec<Point> = plot(&centered(prices))
        .into_iter()
        .map(|p| p + origin)
        .collect();
    Polyline::new(&points)
        .into_styled(PrimitiveStyle::with_stroke(Gray8::BLACK, 3))
        .draw(target)?;
    if let Some(last) = points.last() {
        Circle::with_center(*last, MARKER_DIAMETER)
            .into_styled(PrimitiveStyle::with_fill(Gray8::BLACK))
            .draw(target)?;
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_centered_sums_to_zero() {
        for series in [
            vec![67000.0, 67250.5, 66980.25, 68010.0],
            vec![0.0001, 0.00012, 0.00009],
            vec![42.0],
            vec![1.0, 1.0, 1.0],
        ] {
            let sum: f64 = centered(&series).iter().sum();
            assert!(sum.abs() < 1e-9, "{:?} sums to {}", series, sum);
        }
    }

    #[test]
    fn test_degenerate_series_is_flat() {
        assert_eq!(centered(&[]), vec![0.0, 0.0]);
        assert_eq!(centered(&[0.0]), vec![0.0, 0.0]);
    }

    #[test]
    fn test_plot_spans_the_box() {
        let points = plot(&centered(&[1.0, 3.0, 2.0]));
        assert_eq!(points.first().unwrap().x, 0);
        assert_eq!(points.last().unwrap().x, SIZE.width as i32 - 1);
        // the highest price is drawn at the top margin
        assert_eq!(points[1].y, MARGIN);
        assert_eq!(points[0].y, SIZE.height as i32 - MARGIN);
    }
}
