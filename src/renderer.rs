use crate::{
    algebra::wrap_column,
    display::Surface,
    error::{RasterError, Result},
    scene::{Geometry, SceneParams},
    sphere::{self, TexelHit},
    texture::{self, Texture, TextureSource},
};
use image::{Rgba, RgbaImage};
use rayon::prelude::*;
use std::time::Instant;

/// Lifecycle of a [`SphereRasterizer`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum State {
    /// Texture not loaded yet; frames are no-ops.
    Constructing,
    /// Texture loaded, not attached to the refresh source.
    Ready,
    /// Attached: every tick renders and presents a frame.
    Rendering,
    /// Texture load failed. Terminal.
    Failed,
}

/// One per destination pixel. `Unknown` until first asked for.
#[derive(Clone, Copy, Debug, PartialEq)]
enum Slot {
    Unknown,
    Miss,
    Hit(TexelHit),
}

#[inline]
fn resolve(g: &Geometry, idx: usize, tex_w: u32, tex_h: u32) -> Slot {
    let size = g.size as usize;
    let (h, v) = ((idx % size) as u32, (idx / size) as u32);
    match sphere::intersect(g, h, v, tex_w, tex_h) {
        Some(hit) => Slot::Hit(hit),
        None => Slot::Miss,
    }
}

/// Renders a spinning, textured sphere into a square RGBA buffer.
///
/// Ray/sphere hits depend only on the scene, so each pixel's hit is worked
/// out once and reused; a frame only shifts the texture column by an
/// amount derived from the absolute timestamp.
pub struct SphereRasterizer {
    params: SceneParams,
    geometry: Geometry,
    source: Option<TextureSource>,
    texture: Option<Texture>,
    frame: RgbaImage,
    cache: Vec<Slot>,
    background: [u8; 4],
    anchor: Option<f64>,
    state: State,
}

impl SphereRasterizer {
    /// The destination is a square of side `min(canvas_width, canvas_height)`.
    pub fn new(
        canvas_width: u32,
        canvas_height: u32,
        texture: impl Into<TextureSource>,
        params: SceneParams,
    ) -> Result<Self> {
        let size = canvas_width.min(canvas_height);
        let geometry = Geometry::new(&params, size)?;
        let background = [0, 0, 0, 0];

        tracing::info!(
            size,
            tilt = params.tilt,
            turn = params.turn,
            frames_per_rotation = params.frames_per_rotation,
            "sphere rasterizer created"
        );

        Ok(Self {
            params,
            geometry,
            source: Some(texture.into()),
            texture: None,
            frame: RgbaImage::from_pixel(size, size, Rgba(background)),
            cache: vec![Slot::Unknown; (size as usize) * (size as usize)],
            background,
            anchor: None,
            state: State::Constructing,
        })
    }

    /// Colour written where rays miss the sphere.
    pub fn with_background(mut self, rgba: [u8; 4]) -> Self {
        self.background = rgba;
        for px in self.frame.pixels_mut() {
            *px = Rgba(rgba);
        }
        self
    }

    pub fn params(&self) -> &SceneParams { &self.params }
    pub fn size(&self) -> u32 { self.geometry.size }
    pub fn state(&self) -> State { self.state }
    pub fn frame(&self) -> &RgbaImage { &self.frame }

    /// Number of cache slots already resolved.
    pub fn cached_pixels(&self) -> usize {
        self.cache.iter().filter(|s| !matches!(s, Slot::Unknown)).count()
    }

    /// Load and decode the texture given at construction.
    ///
    /// A failure is terminal: the instance never becomes ready and its
    /// frame is left as it was.
    pub async fn load_texture(&mut self) -> Result<()> {
        if self.state == State::Failed {
            return Err(RasterError::TextureLoad("an earlier load already failed".into()));
        }
        let Some(source) = self.source.take() else {
            // already loaded
            return Ok(());
        };

        match texture::load(source).await {
            Ok(tex) => {
                tracing::info!(width = tex.width(), height = tex.height(), "texture loaded");
                self.texture = Some(tex);
                self.invalidate();
                self.state = State::Ready;
                Ok(())
            }
            Err(e) => {
                tracing::error!(error = %e, "texture load failed");
                self.state = State::Failed;
                Err(e)
            }
        }
    }

    /// Texture-space hit for destination pixel `(column, row)`, computed on
    /// first use and cached. Pixels outside the destination miss.
    pub fn compute_intersection(&mut self, column: u32, row: u32) -> Result<Option<TexelHit>> {
        let tex = self.texture.as_ref().ok_or(RasterError::NotReady)?;
        let size = self.geometry.size;
        if column >= size || row >= size {
            return Ok(None);
        }
        let idx = row as usize * size as usize + column as usize;
        let slot = &mut self.cache[idx];
        if *slot == Slot::Unknown {
            *slot = resolve(&self.geometry, idx, tex.width(), tex.height());
        }
        Ok(match *slot {
            Slot::Hit(hit) => Some(hit),
            _ => None,
        })
    }

    /// Resolve every cache slot up front, in parallel.
    pub fn warm_cache(&mut self) -> Result<()> {
        let tex = self.texture.as_ref().ok_or(RasterError::NotReady)?;
        let (w, h) = (tex.width(), tex.height());
        let g = self.geometry;
        let start = Instant::now();

        self.cache.par_iter_mut().enumerate().for_each(|(idx, slot)| {
            if *slot == Slot::Unknown {
                *slot = resolve(&g, idx, w, h);
            }
        });

        tracing::info!(
            pixels = self.cache.len(),
            elapsed_ms = start.elapsed().as_secs_f64() * 1000.0,
            "intersection cache warmed"
        );
        Ok(())
    }

    /// Texture columns per millisecond.
    fn spin_rate(&self, tex_w: u32) -> f64 {
        tex_w as f64 / (self.params.frames_per_rotation as f64 * self.params.frame_duration_ms)
    }

    /// Paint the frame for `timestamp` (ms) into the destination buffer.
    /// No-op until the texture is loaded.
    ///
    /// The spin is a function of the absolute timestamp only; the first
    /// painted frame fixes the anchor so the sphere starts at its
    /// configured turn.
    pub fn draw(&mut self, timestamp: f64) {
        let Some(tex) = self.texture.as_ref() else { return };
        let (tw, th) = (tex.width(), tex.height());
        let rate = self.spin_rate(tw);
        let anchor = *self.anchor.get_or_insert(timestamp * rate);
        let turn_by = anchor - timestamp * rate;

        let g = &self.geometry;
        let cache = &mut self.cache;
        let background = self.background;
        let out: &mut [u8] = &mut self.frame;

        for (idx, px) in out.chunks_exact_mut(4).enumerate() {
            let slot = &mut cache[idx];
            if *slot == Slot::Unknown {
                *slot = resolve(g, idx, tw, th);
            }
            match *slot {
                Slot::Hit(hit) => {
                    let t = tex.texel(wrap_column(hit.column + turn_by, tw), hit.row);
                    px.copy_from_slice(&[t[0], t[1], t[2], 255]);
                }
                _ => px.copy_from_slice(&background),
            }
        }
    }

    /// Paint the frame for `timestamp` and hand the finished buffer to
    /// `surface` in one call.
    pub fn render_frame(&mut self, timestamp: f64, surface: &mut dyn Surface) -> Result<()> {
        if self.texture.is_none() {
            return Ok(());
        }
        let start = Instant::now();
        self.draw(timestamp);
        surface.present(&self.frame)?;
        tracing::debug!(
            timestamp,
            elapsed_us = start.elapsed().as_micros() as u64,
            "frame presented"
        );
        Ok(())
    }

    /// Attach to the refresh source. Only a loaded rasterizer can start.
    pub fn start(&mut self) -> Result<()> {
        match self.state {
            State::Ready => {
                self.state = State::Rendering;
                tracing::info!("render loop started");
                Ok(())
            }
            State::Rendering => Ok(()),
            State::Constructing => Err(RasterError::NotReady),
            State::Failed => Err(RasterError::TextureLoad(
                "texture failed to load, render loop cannot start".into(),
            )),
        }
    }

    /// Detach from the refresh source. Later ticks are ignored.
    pub fn stop(&mut self) {
        if self.state == State::Rendering {
            self.state = State::Ready;
            tracing::info!("render loop stopped");
        }
    }

    /// Refresh-source callback. Returns whether a frame was presented.
    pub fn on_tick(&mut self, timestamp: f64, surface: &mut dyn Surface) -> Result<bool> {
        if self.state != State::Rendering {
            return Ok(false);
        }
        self.render_frame(timestamp, surface)?;
        Ok(true)
    }

    /// New tilt/turn. Cached hits are dropped; the spin anchor is kept.
    pub fn reconfigure(&mut self, tilt: f64, turn: f64) -> Result<()> {
        let params = self.params.with_orientation(tilt, turn);
        self.geometry = Geometry::new(&params, self.geometry.size)?;
        self.params = params;
        self.invalidate();
        tracing::info!(tilt, turn, "sphere reoriented");
        Ok(())
    }

    /// Follow a canvas size change: new buffer, new cache.
    pub fn resize(&mut self, canvas_width: u32, canvas_height: u32) -> Result<()> {
        let size = canvas_width.min(canvas_height);
        if size == self.geometry.size {
            return Ok(());
        }
        self.geometry = Geometry::new(&self.params, size)?;
        self.frame = RgbaImage::from_pixel(size, size, Rgba(self.background));
        self.cache = vec![Slot::Unknown; (size as usize) * (size as usize)];
        tracing::info!(size, "destination resized");
        Ok(())
    }

    fn invalidate(&mut self) {
        self.cache.fill(Slot::Unknown);
    }
}
