use crate::render::Frame;
use anyhow::{Context, Result};
use std::io::Write;
use std::path::PathBuf;
use tracing::debug;

/// The physical display. Implementations own the panel's power state.
pub trait Panel {
    fn display(&mut self, frame: &Frame) -> Result<()>;

    /// Puts the panel into its low-power state until the next `display`.
    fn sleep(&mut self) -> Result<()>;
}

/// Writes every frame to a binary PGM file, replacing the previous one.
pub struct PgmPanel {
    path: PathBuf,
    frames: u64,
}

impl PgmPanel {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            path: path.into(),
            frames: 0,
        }
    }
}

pub fn encode_pgm(frame: &Frame) -> Vec<u8> {
    let header = format!("P5\n{} {}\n255\n", frame.width(), frame.height());
    let mut out = Vec::with_capacity(header.len() + frame.pixels().len());
    out.extend_from_slice(header.as_bytes());
    out.extend_from_slice(frame.pixels());
    out
}

impl Panel for PgmPanel {
    fn display(&mut self, frame: &Frame) -> Result<()> {
        let tmp = self.path.with_extension("tmp");
        let mut file = std::fs::File::create(&tmp)
            .with_context(|| format!("Failed to open {}", tmp.display()))?;
        file.write_all(&encode_pgm(frame))?;
        file.sync_all()?;
        std::fs::rename(&tmp, &self.path)
            .with_context(|| format!("Failed to replace {}", self.path.display()))?;
        self.frames += 1;
        debug!(frame = self.frames, path = %self.path.display(), "Frame written");
        Ok(())
    }

    fn sleep(&mut self) -> Result<()> {
        debug!("Panel asleep");
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod test {
    use super::*;

    /// Keeps every displayed frame in memory. The next `failures` calls to
    /// `display` are refused.
    #[derive(Default)]
    pub struct MemoryPanel {
        pub frames: Vec<Frame>,
        pub sleeps: usize,
        pub failures: usize,
    }

    impl Panel for MemoryPanel {
        fn display(&mut self, frame: &Frame) -> Result<()> {
            if self.failures > 0 {
                self.failures -= 1;
                anyhow::bail!("panel busy");
            }
            self.frames.push(frame.clone());
            Ok(())
        }

        fn sleep(&mut self) -> Result<()> {
            self.sleeps += 1;
            Ok(())
        }
    }

    #[test]
    fn test_encode_pgm() {
        let frame = Frame::blank(3, 2);
        let pgm = encode_pgm(&frame);
        assert!(pgm.starts_with(b"P5\n3 2\n255\n"));
        assert_eq!(pgm.len(), 11 + 6);
        assert!(pgm[11..].iter().all(|p| *p == 255));
    }

    #[test]
    fn test_memory_panel_failures() {
        let mut panel = MemoryPanel {
            failures: 1,
            ..Default::default()
        };
        assert!(panel.display(&Frame::blank(2, 2)).is_err());
        assert!(panel.display(&Frame::blank(2, 2)).is_ok());
        assert_eq!(panel.frames.len(), 1);
    }

    #[test]
    fn test_pgm_panel_replaces_file() {
        let path = std::env::temp_dir().join(format!("panel-{}.pgm", std::process::id()));
        let mut panel = PgmPanel::new(&path);
        panel.display(&Frame::blank(4, 4)).unwrap();
        panel.display(&Frame::blank(2, 2)).unwrap();
        panel.sleep().unwrap();
        let written = std::fs::read(&path).unwrap();
        assert_eq!(written, encode_pgm(&Frame::blank(2, 2)));
        std::fs::remove_file(path).unwrap();
    }
}
