use serde::Deserialize;
use std::ops::{Add, Sub};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Vec3(pub f64, pub f64, pub f64);

impl Vec3 {
    pub const ZERO: Vec3 = Vec3(0.0, 0.0, 0.0);

    pub fn add(self, v: Self) -> Self { Self(self.0+v.0, self.1+v.1, self.2+v.2) }
    pub fn sub(self, v: Self) -> Self { Self(self.0-v.0, self.1-v.1, self.2-v.2) }
    pub fn scale(self, f: f64) -> Self { Self(self.0*f, self.1*f, self.2*f) }
    pub fn dot(self, v: Self) -> f64 { self.0*v.0 + self.1*v.1 + self.2*v.2 }
    pub fn norm(self) -> f64 { self.dot(self).sqrt() }
    pub fn is_finite(self) -> bool { self.0.is_finite() && self.1.is_finite() && self.2.is_finite() }

    /// Rotate within the x/y plane (about the z axis).
    pub fn turn(self, r: Rotation) -> Self {
        Self(self.0*r.cos - self.1*r.sin, self.0*r.sin + self.1*r.cos, self.2)
    }

    /// Rotate within the z/y plane, tipping the pole towards or away from
    /// the viewer (y is the viewing axis).
    pub fn tip(self, r: Rotation) -> Self {
        Self(self.0, self.2*r.sin + self.1*r.cos, self.2*r.cos - self.1*r.sin)
    }
}

impl Add for Vec3 {
    type Output = Vec3;
    fn add(self, v: Vec3) -> Vec3 { Vec3::add(self, v) }
}

impl Sub for Vec3 {
    type Output = Vec3;
    fn sub(self, v: Vec3) -> Vec3 { Vec3::sub(self, v) }
}

impl From<[f64; 3]> for Vec3 {
    fn from(a: [f64; 3]) -> Self { Vec3(a[0], a[1], a[2]) }
}

/* Custom helper so Serde turns a JSON array into Vec3 */
pub fn vec3_from_array<'de, D>(d: D) -> Result<Vec3, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let arr = <[f64; 3]>::deserialize(d)?;
    Ok(arr.into())
}

/// A fixed plane rotation, kept as its sine/cosine so the per-pixel path
/// never calls trig for it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Rotation {
    pub sin: f64,
    pub cos: f64,
}

impl Rotation {
    pub fn from_degrees(deg: f64) -> Self {
        let (sin, cos) = deg.to_radians().sin_cos();
        Self { sin, cos }
    }
}

/// Floor-modulo of a raw texture column into `[0, width)`.
///
/// Raw columns go negative once the spin offset passes zero, so a truncating
/// remainder is not enough.
pub fn wrap_column(raw: f64, width: u32) -> u32 {
    let w = i64::from(width.max(1));
    (raw.floor() as i64).rem_euclid(w) as u32
}
