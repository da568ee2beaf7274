//! Scene parameters, the JSON scene file, and the coefficients derived
//! from them.

use crate::algebra::{vec3_from_array, Rotation, Vec3};
use crate::error::{RasterError, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Everything that fixes the sphere, the camera and the spin.
///
/// The viewing plane is an abstract rectangle `horizontal_scale` by
/// `vertical_scale` units, `focal_distance` units along +y from the focal
/// point. It is not the destination pixel buffer.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SceneParams {
    pub focal_point: Vec3,
    pub focal_distance: f64,
    pub horizontal_scale: f64,
    pub vertical_scale: f64,
    pub sphere_center: Vec3,
    pub radius: f64,
    /// Inclination of the polar axis, degrees.
    pub tilt: f64,
    /// Initial longitude offset, degrees.
    pub turn: f64,
    pub frames_per_rotation: u32,
    pub frame_duration_ms: f64,
}

impl Default for SceneParams {
    fn default() -> Self {
        Self {
            focal_point: Vec3::ZERO,
            focal_distance: 30.0,
            horizontal_scale: 30.0,
            vertical_scale: 30.0,
            sphere_center: Vec3(0.0, 30.0, 0.0),
            radius: 12.0,
            tilt: 40.0,
            turn: 20.0,
            frames_per_rotation: 1200,
            frame_duration_ms: 1000.0 / 60.0,
        }
    }
}

impl SceneParams {
    pub fn with_orientation(mut self, tilt: f64, turn: f64) -> Self {
        self.tilt = tilt;
        self.turn = turn;
        self
    }

    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| Err(RasterError::InvalidConfiguration(msg));

        if !(self.radius.is_finite() && self.radius > 0.0) {
            return invalid(format!("sphere radius must be positive, got {}", self.radius));
        }
        for (name, v) in [
            ("focal distance", self.focal_distance),
            ("horizontal scale", self.horizontal_scale),
            ("vertical scale", self.vertical_scale),
            ("frame duration", self.frame_duration_ms),
        ] {
            if !(v.is_finite() && v > 0.0) {
                return invalid(format!("{name} must be positive, got {v}"));
            }
        }
        if self.frames_per_rotation == 0 {
            return invalid("frames per rotation must be at least 1".into());
        }
        if !self.focal_point.is_finite() || !self.sphere_center.is_finite() {
            return invalid("focal point and sphere centre must be finite".into());
        }
        if !(self.tilt.is_finite() && self.turn.is_finite()) {
            return invalid("tilt and turn must be finite".into());
        }
        // b is shared by every pixel only while the centre sits on the
        // viewing axis.
        let offset = self.focal_point - self.sphere_center;
        if offset.0 != 0.0 || offset.2 != 0.0 {
            return invalid(format!(
                "sphere centre {:?} is off the viewing axis through {:?}",
                self.sphere_center, self.focal_point
            ));
        }
        if offset.norm() <= self.radius {
            return invalid("focal point lies inside the sphere".into());
        }
        if offset.1 >= 0.0 {
            return invalid(format!(
                "sphere centre {:?} is behind the focal point {:?}",
                self.sphere_center, self.focal_point
            ));
        }
        Ok(())
    }
}

/// Coefficients derived from [`SceneParams`] for one destination size.
///
/// Rebuilt as a whole whenever the parameters or the size change.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Geometry {
    pub size: u32,
    pub radius: f64,
    /// `F - S`.
    pub offset: Vec3,
    pub focal_distance: f64,
    /// `Vy²`, constant because the viewing plane never moves.
    pub vy2: f64,
    pub b: f64,
    pub b2: f64,
    pub c: f64,
    pub c4: f64,
    /// Viewing-plane units per destination pixel.
    pub h_step: f64,
    pub v_step: f64,
    pub half_h: f64,
    pub half_v: f64,
    pub turn: Rotation,
    pub tilt: Rotation,
}

impl Geometry {
    pub fn new(params: &SceneParams, size: u32) -> Result<Self> {
        if size == 0 {
            return Err(RasterError::InvalidConfiguration(
                "destination size must be positive".into(),
            ));
        }
        params.validate()?;

        let f = params.focal_point;
        let s = params.sphere_center;
        let offset = f - s;
        let vy = params.focal_distance;
        let b = 2.0 * vy * offset.1;
        let c = f.dot(f) + s.dot(s) - 2.0 * f.dot(s) - params.radius * params.radius;

        Ok(Self {
            size,
            radius: params.radius,
            offset,
            focal_distance: vy,
            vy2: vy * vy,
            b,
            b2: b * b,
            c,
            c4: 4.0 * c,
            h_step: params.horizontal_scale / size as f64,
            v_step: params.vertical_scale / size as f64,
            half_h: 0.5 * params.horizontal_scale,
            half_v: 0.5 * params.vertical_scale,
            turn: Rotation::from_degrees(-params.turn),
            tilt: Rotation::from_degrees(-params.tilt),
        })
    }
}

// ── scene file ────────────────────────────────────────────────────────────

#[derive(Deserialize)]
#[serde(default)]
pub struct CameraJson {
    #[serde(deserialize_with = "vec3_from_array")]
    pub focal_point: Vec3,
    pub focal_distance: f64,
    pub horizontal_scale: f64,
    pub vertical_scale: f64,
}

#[derive(Deserialize)]
#[serde(default)]
pub struct SphereJson {
    #[serde(deserialize_with = "vec3_from_array")]
    pub center: Vec3,
    pub radius: f64,
    pub tilt: f64,
    pub turn: f64,
}

#[derive(Deserialize)]
#[serde(default)]
pub struct AnimationJson {
    pub frames_per_rotation: u32,
    pub frame_duration_ms: f64,
}

#[derive(Deserialize)]
#[serde(default)]
pub struct RenderJson {
    pub width: u32,
    pub height: u32,
    pub texture: Option<PathBuf>,
    pub frames: u32,
    pub fps: f64,
    pub background: [u8; 4],
}

impl Default for CameraJson {
    fn default() -> Self {
        let p = SceneParams::default();
        Self {
            focal_point: p.focal_point,
            focal_distance: p.focal_distance,
            horizontal_scale: p.horizontal_scale,
            vertical_scale: p.vertical_scale,
        }
    }
}

impl Default for SphereJson {
    fn default() -> Self {
        let p = SceneParams::default();
        Self { center: p.sphere_center, radius: p.radius, tilt: p.tilt, turn: p.turn }
    }
}

impl Default for AnimationJson {
    fn default() -> Self {
        let p = SceneParams::default();
        Self {
            frames_per_rotation: p.frames_per_rotation,
            frame_duration_ms: p.frame_duration_ms,
        }
    }
}

impl Default for RenderJson {
    fn default() -> Self {
        Self {
            width: 256,
            height: 256,
            texture: None,
            frames: 120,
            fps: 60.0,
            background: [0, 0, 0, 0],
        }
    }
}

/// Parsed scene file.
#[derive(Deserialize, Default)]
#[serde(default)]
pub struct SceneFile {
    pub camera: CameraJson,
    pub sphere: SphereJson,
    pub animation: AnimationJson,
    pub render: RenderJson,
}

impl SceneFile {
    pub fn params(&self) -> SceneParams {
        SceneParams {
            focal_point: self.camera.focal_point,
            focal_distance: self.camera.focal_distance,
            horizontal_scale: self.camera.horizontal_scale,
            vertical_scale: self.camera.vertical_scale,
            sphere_center: self.sphere.center,
            radius: self.sphere.radius,
            tilt: self.sphere.tilt,
            turn: self.sphere.turn,
            frames_per_rotation: self.animation.frames_per_rotation,
            frame_duration_ms: self.animation.frame_duration_ms,
        }
    }
}

pub fn parse(json: &str) -> Result<SceneFile> {
    Ok(serde_json::from_str(json)?)
}

pub fn load(path: impl AsRef<Path>) -> Result<SceneFile> {
    let path = path.as_ref();
    let data = std::fs::read_to_string(path).map_err(|source| RasterError::SceneFile {
        path: path.to_path_buf(),
        source,
    })?;
    let file = parse(&data)?;
    tracing::debug!(path = %path.display(), "scene file loaded");
    Ok(file)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn c_matches_expanded_form() {
        let params = SceneParams {
            focal_point: Vec3(1.0, -2.0, 3.0),
            sphere_center: Vec3(1.0, 40.0, 3.0),
            radius: 5.0,
            ..SceneParams::default()
        };
        let g = Geometry::new(&params, 10).unwrap();
        let (f, s) = (params.focal_point, params.sphere_center);
        let expected = f.dot(f) + s.dot(s) - 2.0 * f.dot(s) - 25.0;
        assert!((g.c - expected).abs() < 1e-9);
        assert!((g.c - (42.0 * 42.0 - 25.0)).abs() < 1e-9);
        assert!((g.c4 - 4.0 * g.c).abs() < 1e-9);
    }

    #[test]
    fn default_scene_coefficients() {
        let g = Geometry::new(&SceneParams::default(), 100).unwrap();
        assert_eq!(g.b, -1800.0);
        assert_eq!(g.b2, 3_240_000.0);
        assert_eq!(g.c, 756.0);
        assert!((g.h_step - 0.3).abs() < 1e-12);
        assert_eq!(g.half_v, 15.0);
    }

    #[test]
    fn b_uses_centre_distance_not_focal_distance() {
        let params = SceneParams {
            sphere_center: Vec3(0.0, 50.0, 0.0),
            ..SceneParams::default()
        };
        let g = Geometry::new(&params, 8).unwrap();
        assert_eq!(g.b, 2.0 * 30.0 * -50.0);
    }

    #[test]
    fn rejects_degenerate_configuration() {
        let zero_radius = SceneParams { radius: 0.0, ..SceneParams::default() };
        assert!(matches!(
            Geometry::new(&zero_radius, 4),
            Err(RasterError::InvalidConfiguration(_))
        ));
        assert!(matches!(
            Geometry::new(&SceneParams::default(), 0),
            Err(RasterError::InvalidConfiguration(_))
        ));
        let off_axis = SceneParams { sphere_center: Vec3(2.0, 30.0, 0.0), ..SceneParams::default() };
        assert!(off_axis.validate().is_err());
        let inside = SceneParams { radius: 31.0, ..SceneParams::default() };
        assert!(inside.validate().is_err());
        let behind = SceneParams { sphere_center: Vec3(0.0, -30.0, 0.0), ..SceneParams::default() };
        assert!(matches!(behind.validate(), Err(RasterError::InvalidConfiguration(_))));
        let no_spin = SceneParams { frames_per_rotation: 0, ..SceneParams::default() };
        assert!(no_spin.validate().is_err());
    }

    #[test]
    fn partial_scene_file_falls_back_to_defaults() {
        let file = parse(r#"{ "sphere": { "tilt": 0, "turn": 90 }, "render": { "width": 64 } }"#)
            .unwrap();
        let p = file.params();
        assert_eq!(p.tilt, 0.0);
        assert_eq!(p.turn, 90.0);
        assert_eq!(p.radius, 12.0);
        assert_eq!(p.sphere_center, Vec3(0.0, 30.0, 0.0));
        assert_eq!(file.render.width, 64);
        assert_eq!(file.render.height, 256);
        assert!(file.render.texture.is_none());
    }

    #[test]
    fn full_scene_file_round_trips_into_params() {
        let file = parse(
            r#"{
                "camera": { "focal_point": [0, 0, 0], "focal_distance": 20,
                            "horizontal_scale": 24, "vertical_scale": 24 },
                "sphere": { "center": [0, 25, 0], "radius": 8, "tilt": 10, "turn": 5 },
                "animation": { "frames_per_rotation": 600, "frame_duration_ms": 10 },
                "render": { "width": 32, "height": 48, "texture": "mars.png",
                            "frames": 3, "fps": 30, "background": [1, 2, 3, 255] }
            }"#,
        )
        .unwrap();
        let p = file.params();
        assert_eq!(p.focal_distance, 20.0);
        assert_eq!(p.sphere_center, Vec3(0.0, 25.0, 0.0));
        assert_eq!(p.frames_per_rotation, 600);
        assert_eq!(file.render.texture.as_deref(), Some(Path::new("mars.png")));
        assert_eq!(file.render.background, [1, 2, 3, 255]);
        assert!(p.validate().is_ok());
    }

    #[test]
    fn missing_scene_file_is_reported_with_path() {
        match load("/definitely/not/here/scene.json") {
            Err(RasterError::SceneFile { path, .. }) => {
                assert!(path.ends_with("scene.json"));
            }
            other => panic!("unexpected: {:?}", other.map(|_| ())),
        }
    }
}
