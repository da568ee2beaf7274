//! Software rasterizer for a textured, spinning planet.
//!
//! Each destination pixel casts one ray from the focal point through an
//! abstract viewing plane at a sphere. Hits are mapped to an
//! equirectangular texture once; the spin is simulated by sliding the
//! texture's longitude over time.

pub mod algebra;
pub mod display;
pub mod error;
pub mod renderer;
pub mod scene;
pub mod sphere;
pub mod texture;

pub use display::{FrameRecorder, PngSequence, RefreshClock, Surface};
pub use error::{RasterError, Result};
pub use renderer::{SphereRasterizer, State};
pub use scene::{Geometry, SceneParams};
pub use texture::{Texture, TextureSource};
