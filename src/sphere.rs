//! src/sphere.rs
//! -------------
//! Per-pixel ray/sphere intersection and the mapping from a hit point to
//! texture space.
//!
//! Rays leave the focal point `F` through the viewing plane, so a pixel's
//! ray is `F + m·V`. It meets the sphere where `|F + m·V - S| = r`, i.e.
//! `a·m² + b·m + c = 0` with `a = |V|²`, `b = 2·V·(F - S)` and
//! `c = |F - S|² - r²`. With the centre on the viewing axis `b` only sees
//! `Vy = f`, so `b` and `c` are fixed per scene and only `a` varies.

use crate::{algebra::Vec3, scene::Geometry};
use std::f64::consts::PI;

/// Where a pixel's ray lands on the sphere, before any texture is involved.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SurfaceHit {
    /// Near root `m`: distance along the ray in units of `|V|`.
    pub distance: f64,
    /// Hit point relative to the sphere centre, already turned and tipped
    /// into the sphere's own frame (pole along +z).
    pub local: Vec3,
}

/// A hit resolved to texture coordinates, without the time-dependent spin.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TexelHit {
    pub row: u32,
    /// Raw column in `[width, 2·width]`; the renderer adds the spin and wraps.
    pub column: f64,
    pub distance: f64,
}

/// Smaller root of `a·m² + b·m + c`, given `b²` and `4c` precomputed.
///
/// `None` when the discriminant is not positive (a grazing ray, `s == 0`,
/// counts as a miss) or when the root lies behind the focal point.
#[inline]
pub fn near_root(a: f64, b: f64, b2: f64, c4: f64) -> Option<f64> {
    let s = b2 - a * c4;
    if s <= 0.0 { return None; }

    let m = (-b - s.sqrt()) / (2.0 * a);
    if m <= 0.0 { return None; }
    Some(m)
}

/// Direction from the focal point through the centre of pixel `(h, v)`.
#[inline]
pub fn view_vector(g: &Geometry, h: u32, v: u32) -> Vec3 {
    Vec3(
        (h as f64 + 0.5) * g.h_step - g.half_h,
        g.focal_distance,
        (v as f64 + 0.5) * g.v_step - g.half_v,
    )
}

/// Cast the ray for destination pixel `(h, v)`.
pub fn cast(g: &Geometry, h: u32, v: u32) -> Option<SurfaceHit> {
    let dir = view_vector(g, h, v);
    let a = dir.0 * dir.0 + g.vy2 + dir.2 * dir.2;
    let m = near_root(a, g.b, g.b2, g.c4)?;

    let local = g.offset.add(dir.scale(m)).turn(g.turn).tip(g.tilt);
    Some(SurfaceHit { distance: m, local })
}

impl SurfaceHit {
    /// Longitude picks the column, latitude the row.
    pub fn texel(&self, radius: f64, width: u32, height: u32) -> TexelHit {
        let w = width as f64;
        let h = height as f64;

        let lon = self.local.1.atan2(self.local.0);
        let column = w + w * (lon + PI) / (2.0 * PI);

        // `% h` folds the south pole (lat == π) back onto row 0's side
        let lat = (self.local.2 / radius).clamp(-1.0, 1.0).acos();
        let row = (h - 1.0 - (h * lat / PI) % h).floor();
        let row = row.clamp(0.0, h - 1.0) as u32;

        TexelHit { row, column, distance: self.distance }
    }
}

/// Cast and resolve in one step.
pub fn intersect(g: &Geometry, h: u32, v: u32, width: u32, height: u32) -> Option<TexelHit> {
    cast(g, h, v).map(|hit| hit.texel(g.radius, width, height))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::SceneParams;

    fn upright() -> SceneParams {
        SceneParams::default().with_orientation(0.0, 0.0)
    }

    #[test]
    fn near_root_matches_quadratic_formula() {
        // 2m² - 10m + 8 = 0 → m = 1, 4
        let m = near_root(2.0, -10.0, 100.0, 32.0).unwrap();
        assert!((m - 1.0).abs() < 1e-12);
    }

    #[test]
    fn near_root_rejects_tangent_and_miss() {
        // m² - 2m + 1: double root
        assert!(near_root(1.0, -2.0, 4.0, 4.0).is_none());
        assert!(near_root(1.0, 0.0, 0.0, 4.0).is_none());
    }

    #[test]
    fn near_root_rejects_roots_behind_the_eye() {
        // m² + 10m + 16 = 0 → m = -2, -8
        assert!(near_root(1.0, 10.0, 100.0, 64.0).is_none());
    }

    #[test]
    fn sphere_behind_focal_point_is_not_drawn() {
        let mut g = Geometry::new(&upright(), 4).unwrap();
        // mirror the sphere to y = -30, skipping validation
        g.offset = Vec3(0.0, 30.0, 0.0);
        g.b = 2.0 * g.focal_distance * g.offset.1;
        g.b2 = g.b * g.b;
        for v in 0..4 {
            for h in 0..4 {
                assert!(cast(&g, h, v).is_none(), "pixel ({h},{v}) hit a sphere behind the eye");
            }
        }
    }

    #[test]
    fn axis_pixel_hits_nearest_point() {
        let g = Geometry::new(&upright(), 5).unwrap();
        let dir = view_vector(&g, 2, 2);
        assert_eq!(dir, Vec3(0.0, 30.0, 0.0));

        let hit = cast(&g, 2, 2).expect("axis ray must hit");
        // a = 900, b = -1800, c = 756 → s = 518400, m = (1800 - 720) / 1800
        let a = 900.0;
        let expected = (-g.b - (g.b2 - 4.0 * a * g.c).sqrt()) / (2.0 * a);
        assert!((hit.distance - expected).abs() < 1e-12);
        assert!((hit.distance - 0.6).abs() < 1e-12);
        // nearest point of the sphere faces the camera
        assert!((hit.local.0).abs() < 1e-9);
        assert!((hit.local.1 + 12.0).abs() < 1e-9);
        assert!((hit.local.2).abs() < 1e-9);
    }

    #[test]
    fn hits_lie_on_the_sphere() {
        let params = SceneParams::default();
        let g = Geometry::new(&params, 16).unwrap();
        let mut hits = 0;
        for v in 0..16 {
            for h in 0..16 {
                if let Some(hit) = cast(&g, h, v) {
                    hits += 1;
                    assert!((hit.local.norm() - params.radius).abs() < 1e-9);
                    assert!(hit.distance > 0.0);
                }
            }
        }
        assert!(hits > 0);
    }

    #[test]
    fn corner_rays_miss_default_sphere() {
        let g = Geometry::new(&upright(), 4).unwrap();
        for (h, v) in [(0, 0), (3, 0), (0, 3), (3, 3)] {
            assert!(cast(&g, h, v).is_none(), "corner ({h},{v}) should miss");
        }
        for (h, v) in [(1, 1), (2, 1), (1, 2), (2, 2)] {
            assert!(cast(&g, h, v).is_some(), "centre ({h},{v}) should hit");
        }
    }

    #[test]
    fn equator_facing_camera_maps_to_mid_row() {
        let g = Geometry::new(&upright(), 5).unwrap();
        let t = intersect(&g, 2, 2, 800, 400).unwrap();
        // latitude π/2 → row H - 1 - H/2
        assert_eq!(t.row, 199);
        // atan2(-12, 0) = -π/2 → W + W/4
        assert!((t.column - 1000.0).abs() < 1e-9);
    }

    #[test]
    fn poles_stay_inside_texture() {
        let north = SurfaceHit { distance: 1.0, local: Vec3(0.0, 0.0, 12.0) };
        let south = SurfaceHit { distance: 1.0, local: Vec3(0.0, 0.0, -12.0) };
        assert_eq!(north.texel(12.0, 64, 32).row, 31);
        assert!(south.texel(12.0, 64, 32).row < 32);
        // rounding past the pole must not produce NaN rows
        let past = SurfaceHit { distance: 1.0, local: Vec3(0.0, 0.0, 12.000001) };
        assert_eq!(past.texel(12.0, 64, 32).row, 31);
    }

    #[test]
    fn raw_column_spans_one_texture_width() {
        for lon in [-3.1, -1.0, 0.0, 1.0, 3.1] {
            let (s, c) = f64::sin_cos(lon);
            let hit = SurfaceHit { distance: 1.0, local: Vec3(12.0 * c, 12.0 * s, 0.0) };
            let t = hit.texel(12.0, 100, 50);
            assert!(t.column >= 100.0 && t.column <= 200.0);
        }
    }

    #[test]
    fn turn_shifts_longitude_only() {
        let g0 = Geometry::new(&upright(), 5).unwrap();
        let g90 = Geometry::new(&SceneParams::default().with_orientation(0.0, 90.0), 5).unwrap();
        let a = intersect(&g0, 2, 2, 400, 200).unwrap();
        let b = intersect(&g90, 2, 2, 400, 200).unwrap();
        assert_eq!(a.row, b.row);
        assert!((a.column - b.column).abs() > 1.0);
        assert_eq!(a.distance, b.distance);
    }
}
