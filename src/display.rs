//! Presentation side: where finished frames go, and the clock that asks
//! for them.

use crate::error::Result;
use image::RgbaImage;
use rand::{rngs::StdRng, Rng, SeedableRng};
use std::fs;
use std::path::{Path, PathBuf};

/// Anything that can show a finished frame. Called once per rendered
/// frame with the complete buffer.
pub trait Surface {
    fn present(&mut self, frame: &RgbaImage) -> Result<()>;
}

/// Keeps every presented frame in memory.
#[derive(Default)]
pub struct FrameRecorder {
    pub frames: Vec<RgbaImage>,
}

impl Surface for FrameRecorder {
    fn present(&mut self, frame: &RgbaImage) -> Result<()> {
        self.frames.push(frame.clone());
        Ok(())
    }
}

/// Writes frames to `dir/frame_0000.png`, `dir/frame_0001.png`, ...
pub struct PngSequence {
    dir: PathBuf,
    written: u32,
}

impl PngSequence {
    pub fn create(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir, written: 0 })
    }

    pub fn dir(&self) -> &Path { &self.dir }
    pub fn written(&self) -> u32 { self.written }
}

impl Surface for PngSequence {
    fn present(&mut self, frame: &RgbaImage) -> Result<()> {
        let path = self.dir.join(format!("frame_{:04}.png", self.written));
        frame.save(&path)?;
        self.written += 1;
        Ok(())
    }
}

pub fn sequence_dir_name(size: u32, tilt: f64, turn: f64) -> String {
    let suf: String = rand::thread_rng()
        .sample_iter(&rand::distributions::Alphanumeric)
        .take(6).map(char::from).collect();
    format!("renders/globe_{size}_t{tilt:.0}_r{turn:.0}_{suf}")
}

/// Stand-in for a display refresh source: yields `count` absolute
/// timestamps (ms) at `fps`, optionally jittered to mimic an uneven
/// refresh. Timestamps never go backwards.
pub struct RefreshClock {
    start_ms: f64,
    interval_ms: f64,
    jitter_ms: f64,
    tick: u32,
    count: u32,
    last: f64,
    rng: StdRng,
}

impl RefreshClock {
    pub fn new(start_ms: f64, fps: f64, count: u32) -> Self {
        Self {
            start_ms,
            interval_ms: 1000.0 / fps,
            jitter_ms: 0.0,
            tick: 0,
            count,
            last: f64::NEG_INFINITY,
            rng: StdRng::seed_from_u64(0),
        }
    }

    pub fn with_jitter(mut self, jitter_ms: f64, seed: u64) -> Self {
        self.jitter_ms = jitter_ms.abs();
        self.rng = StdRng::seed_from_u64(seed);
        self
    }
}

impl Iterator for RefreshClock {
    type Item = f64;

    fn next(&mut self) -> Option<f64> {
        if self.tick >= self.count {
            return None;
        }
        let mut t = self.start_ms + self.tick as f64 * self.interval_ms;
        if self.jitter_ms > 0.0 {
            t += self.rng.gen_range(-self.jitter_ms..=self.jitter_ms);
        }
        let t = t.max(self.last);
        self.last = t;
        self.tick += 1;
        Some(t)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = (self.count - self.tick) as usize;
        (left, Some(left))
    }
}
