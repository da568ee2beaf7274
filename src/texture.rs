//! Texture sources and loading.
//!
//! Decoding happens on the rayon pool; the result comes back through a
//! one-shot channel so callers can simply `.await` it.

use crate::error::{RasterError, Result};
use image::RgbaImage;
use std::path::PathBuf;

/// Where the planet's surface image comes from.
#[derive(Clone, Debug)]
pub enum TextureSource {
    Path(PathBuf),
    /// Encoded image bytes (PNG, JPEG, ...).
    Encoded(Vec<u8>),
    Decoded(RgbaImage),
}

impl From<PathBuf> for TextureSource {
    fn from(p: PathBuf) -> Self { Self::Path(p) }
}

impl From<RgbaImage> for TextureSource {
    fn from(img: RgbaImage) -> Self { Self::Decoded(img) }
}

/// Equirectangular RGBA texture, immutable once loaded.
#[derive(Clone, Debug)]
pub struct Texture {
    image: RgbaImage,
}

impl Texture {
    pub fn from_image(image: RgbaImage) -> Result<Self> {
        if image.width() == 0 || image.height() == 0 {
            return Err(RasterError::TextureLoad(format!(
                "texture has no pixels ({}x{})",
                image.width(),
                image.height()
            )));
        }
        Ok(Self { image })
    }

    pub fn width(&self) -> u32 { self.image.width() }
    pub fn height(&self) -> u32 { self.image.height() }

    /// Texel at `(column, row)`, both wrapped into range.
    #[inline]
    pub fn texel(&self, column: u32, row: u32) -> [u8; 4] {
        let x = column % self.width();
        let y = row % self.height();
        let idx = (y as usize * self.width() as usize + x as usize) * 4;
        let raw = self.image.as_raw();
        [raw[idx], raw[idx + 1], raw[idx + 2], raw[idx + 3]]
    }
}

/// Decode on the current thread.
pub fn decode(source: TextureSource) -> Result<Texture> {
    let image = match source {
        TextureSource::Path(path) => image::open(&path)
            .map_err(|e| RasterError::TextureLoad(format!("{}: {e}", path.display())))?
            .to_rgba8(),
        TextureSource::Encoded(bytes) => image::load_from_memory(&bytes)
            .map_err(|e| RasterError::TextureLoad(e.to_string()))?
            .to_rgba8(),
        TextureSource::Decoded(image) => image,
    };
    Texture::from_image(image)
}

/// Decode on the rayon pool and resolve once it is done.
pub async fn load(source: TextureSource) -> Result<Texture> {
    let (tx, rx) = futures_intrusive::channel::shared::oneshot_channel();
    rayon::spawn(move || {
        // receiver gone means nobody is waiting any more
        let _ = tx.send(decode(source));
    });

    rx.receive()
        .await
        .unwrap_or_else(|| Err(RasterError::TextureLoad("loader exited without a result".into())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;
    use std::io::Cursor;

    fn gradient(w: u32, h: u32) -> RgbaImage {
        RgbaImage::from_fn(w, h, |x, y| Rgba([x as u8, y as u8, 7, 128]))
    }

    #[test]
    fn texel_wraps_both_axes() {
        let t = Texture::from_image(gradient(4, 3)).unwrap();
        assert_eq!(t.texel(1, 2), [1, 2, 7, 128]);
        assert_eq!(t.texel(5, 2), [1, 2, 7, 128]);
        assert_eq!(t.texel(3, 4), [3, 1, 7, 128]);
    }

    #[test]
    fn empty_image_is_a_load_error() {
        assert!(matches!(
            Texture::from_image(RgbaImage::new(0, 5)),
            Err(RasterError::TextureLoad(_))
        ));
    }

    #[test]
    fn loads_encoded_png_off_thread() {
        let mut png = Vec::new();
        gradient(6, 2)
            .write_to(&mut Cursor::new(&mut png), image::ImageFormat::Png)
            .unwrap();
        let t = pollster::block_on(load(TextureSource::Encoded(png))).unwrap();
        assert_eq!((t.width(), t.height()), (6, 2));
        assert_eq!(t.texel(5, 1), [5, 1, 7, 128]);
    }

    #[test]
    fn missing_file_fails_to_load() {
        let src = TextureSource::Path(PathBuf::from("/no/such/planet.png"));
        let err = pollster::block_on(load(src)).unwrap_err();
        assert!(matches!(err, RasterError::TextureLoad(_)));
        assert!(err.to_string().contains("planet.png"));
    }

    #[test]
    fn garbage_bytes_fail_to_decode() {
        let err = decode(TextureSource::Encoded(vec![1, 2, 3, 4])).unwrap_err();
        assert!(matches!(err, RasterError::TextureLoad(_)));
    }
}
