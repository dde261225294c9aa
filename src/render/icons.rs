use crate::quotes::Asset;
use embedded_graphics::{
    image::Image,
    mono_font::{iso_8859_15::FONT_10X20, MonoTextStyle},
    pixelcolor::Gray8,
    prelude::*,
    primitives::{Circle, PrimitiveStyle},
    text::{Alignment, Baseline, Text, TextStyleBuilder},
};
use std::path::Path;
use tinybmp::Bmp;
use tracing::{debug, warn};

const DEFAULT_ICON: &str = "default.bmp";
const PLACEHOLDER_DIAMETER: u32 = 64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Icon {
    Bitmap(Vec<u8>),
    /// Drawn when no bitmap is available, showing the asset's initial.
    Placeholder(char),
}

impl Icon {
    /// Looks for `<dir>/<asset>.bmp`, then `<dir>/default.bmp`.
    pub fn load(dir: &Path, asset: &Asset) -> Self {
        let candidates = [dir.join(format!("{}.bmp", asset.id())), dir.join(DEFAULT_ICON)];
        for path in candidates.iter() {
            match std::fs::read(path) {
                Ok(bytes) if Bmp::<Gray8>::from_slice(&bytes).is_ok() => {
                    return Icon::Bitmap(bytes);
                }
                Ok(_) => warn!("{} is not a readable bitmap", path.display()),
                Err(e) => debug!("No icon at {}: {}", path.display(), e),
            }
        }
        let initial = asset.id().chars().next().unwrap_or('?');
        Icon::Placeholder(initial.to_ascii_uppercase())
    }

    pub fn draw<D>(&self, target: &mut D, origin: Point) -> Result<(), D::Error>
    where
        D: DrawTarget<Color = Gray8>,
    {
        match self {
            Icon::Bitmap(bytes) => match Bmp::<Gray8>::from_slice(bytes) {
                Ok(bmp) => Image::new(&bmp, origin).draw(target),
                Err(_) => draw_placeholder(target, origin, '?'),
            },
            Icon::Placeholder(initial) => draw_placeholder(target, origin, *initial),
        }
    }
}

fn draw_placeholder<D>(target: &mut D, origin: Point, initial: char) -> Result<(), D::Error>
where
    D: DrawTarget<Color = Gray8>,
{
    let circle = Circle::new(origin, PLACEHOLDER_DIAMETER);
    circle
        .into_styled(PrimitiveStyle::with_stroke(Gray8::BLACK, 3))
        .draw(target)?;
    let mut buf = [0u8; 4];
    let text_style = TextStyleBuilder::new()
        .alignment(Alignment::Center)
        .baseline(Baseline::Middle)
        .build();
    Text::with_text_style(
        initial.encode_utf8(&mut buf),
        circle.center(),
        MonoTextStyle::new(&FONT_10X20, Gray8::BLACK),
        text_style,
    )
    .draw(target)?;
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_missing_icon_falls_back_to_placeholder() {
        let dir = std::env::temp_dir().join(format!("icons-missing-{}", std::process::id()));
        let icon = Icon::load(&dir, &Asset::parse("ethereum"));
        assert_eq!(icon, Icon::Placeholder('E'));
    }

    #[test]
    fn test_unreadable_icon_falls_back_to_placeholder() {
        let dir = std::env::temp_dir().join(format!("icons-garbage-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("AAPL.bmp"), b"not a bitmap").unwrap();
        let icon = Icon::load(&dir, &Asset::parse("AAPL.US"));
        assert_eq!(icon, Icon::Placeholder('A'));
        std::fs::remove_dir_all(dir).unwrap();
    }
}
