//! Equirectangular panorama to cubemap projection
//!
//! The HDR environment ships as a single lat-long image; the renderer wants
//! six cube faces. Faces are produced in +X, -X, +Y, -Y, +Z, -Z order with
//! rows running top to bottom.

use glam::{Vec2, Vec3};
use std::f32::consts::PI;

pub const CUBE_FACES: usize = 6;

/// World direction through texel coordinate `(u, v)` of a cube face,
/// `u` and `v` in `[-1, 1]` with `v` growing downwards.
pub fn cube_face_direction(face: usize, u: f32, v: f32) -> Vec3 {
    let dir = match face {
        0 => Vec3::new(1.0, -v, -u),
        1 => Vec3::new(-1.0, -v, u),
        2 => Vec3::new(u, 1.0, v),
        3 => Vec3::new(u, -1.0, -v),
        4 => Vec3::new(u, -v, 1.0),
        _ => Vec3::new(-u, -v, -1.0),
    };
    dir.normalize()
}

/// Lat-long texture coordinate for a direction; `v = 0` is the top row
pub fn equirect_uv(dir: Vec3) -> Vec2 {
    let u = dir.z.atan2(dir.x) / (2.0 * PI) + 0.5;
    let v = 0.5 - dir.y.clamp(-1.0, 1.0).asin() / PI;
    Vec2::new(u, v)
}

/// Borrowed RGBA float image in row-major order
pub struct EquirectImage<'a> {
    pub width: u32,
    pub height: u32,
    pub pixels: &'a [[f32; 4]],
}

impl<'a> EquirectImage<'a> {
    pub fn new(width: u32, height: u32, pixels: &'a [[f32; 4]]) -> Option<Self> {
        if width == 0 || height == 0 || pixels.len() != (width as usize) * (height as usize) {
            return None;
        }
        Some(Self { width, height, pixels })
    }

    fn texel(&self, x: i64, y: i64) -> [f32; 4] {
        let w = self.width as i64;
        let h = self.height as i64;
        let x = x.rem_euclid(w);
        let y = y.clamp(0, h - 1);
        self.pixels[(y * w + x) as usize]
    }

    /// Bilinear sample, wrapping horizontally and clamping vertically
    pub fn sample(&self, uv: Vec2) -> [f32; 4] {
        let fx = uv.x * self.width as f32 - 0.5;
        let fy = uv.y * self.height as f32 - 0.5;
        let x0 = fx.floor();
        let y0 = fy.floor();
        let tx = fx - x0;
        let ty = fy - y0;
        let (x0, y0) = (x0 as i64, y0 as i64);

        let a = self.texel(x0, y0);
        let b = self.texel(x0 + 1, y0);
        let c = self.texel(x0, y0 + 1);
        let d = self.texel(x0 + 1, y0 + 1);

        let mut out = [0.0; 4];
        for i in 0..4 {
            let top = a[i] + (b[i] - a[i]) * tx;
            let bottom = c[i] + (d[i] - c[i]) * tx;
            out[i] = top + (bottom - top) * ty;
        }
        out
    }
}

/// Project the panorama onto six `face_size` x `face_size` faces
pub fn project_to_cubemap(source: &EquirectImage, face_size: u32) -> Vec<[f32; 4]> {
    let size = face_size.max(1) as usize;
    let mut faces = Vec::with_capacity(CUBE_FACES * size * size);
    for face in 0..CUBE_FACES {
        for y in 0..size {
            let v = 2.0 * (y as f32 + 0.5) / size as f32 - 1.0;
            for x in 0..size {
                let u = 2.0 * (x as f32 + 0.5) / size as f32 - 1.0;
                let dir = cube_face_direction(face, u, v);
                faces.push(source.sample(equirect_uv(dir)));
            }
        }
    }
    faces
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_face_centers() {
        let expected = [Vec3::X, -Vec3::X, Vec3::Y, -Vec3::Y, Vec3::Z, -Vec3::Z];
        for (face, dir) in expected.iter().enumerate() {
            assert!(cube_face_direction(face, 0.0, 0.0).abs_diff_eq(*dir, 1e-6), "face {}", face);
        }
    }

    #[test]
    fn test_equirect_poles_and_horizon() {
        assert!((equirect_uv(Vec3::Y).y - 0.0).abs() < 1e-6);
        assert!((equirect_uv(-Vec3::Y).y - 1.0).abs() < 1e-6);
        let horizon = equirect_uv(Vec3::X);
        assert!((horizon.x - 0.5).abs() < 1e-6);
        assert!((horizon.y - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_rejects_mismatched_buffer() {
        let pixels = vec![[0.0; 4]; 5];
        assert!(EquirectImage::new(2, 2, &pixels).is_none());
        assert!(EquirectImage::new(0, 2, &pixels).is_none());
    }

    #[test]
    fn test_uniform_panorama_projects_uniformly() {
        let pixels = vec![[0.25, 0.5, 1.0, 1.0]; 8 * 4];
        let image = EquirectImage::new(8, 4, &pixels).unwrap();
        let faces = project_to_cubemap(&image, 4);
        assert_eq!(faces.len(), CUBE_FACES * 16);
        for texel in faces {
            for (got, want) in texel.iter().zip([0.25, 0.5, 1.0, 1.0]) {
                assert!((got - want).abs() < 1e-6);
            }
        }
    }

    #[test]
    fn test_sky_lands_on_top_face() {
        // Top half bright, bottom half dark
        let (w, h) = (16u32, 8u32);
        let pixels: Vec<[f32; 4]> = (0..h)
            .flat_map(|y| {
                let value = if y < h / 2 { 1.0 } else { 0.0 };
                std::iter::repeat([value, value, value, 1.0]).take(w as usize)
            })
            .collect();
        let image = EquirectImage::new(w, h, &pixels).unwrap();
        let faces = project_to_cubemap(&image, 2);
        let face_len = 4;
        let top = &faces[2 * face_len..3 * face_len];
        let bottom = &faces[3 * face_len..4 * face_len];
        assert!(top.iter().all(|t| t[0] > 0.99));
        assert!(bottom.iter().all(|t| t[0] < 0.01));
    }
}
