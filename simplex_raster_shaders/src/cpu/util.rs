// Copyright 2026 the Simplex Raster Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Utility types and functions shared by the kernels.

use std::ops::{Add, Mul, Sub};

use simplex_raster_encoding::{ConfigUniform, Triangle};

#[derive(Clone, Copy, Default, Debug, PartialEq)]
#[repr(C)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Add for Vec2 {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self {
            x: self.x + rhs.x,
            y: self.y + rhs.y,
        }
    }
}

impl Sub for Vec2 {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self {
            x: self.x - rhs.x,
            y: self.y - rhs.y,
        }
    }
}

impl Mul<f32> for Vec2 {
    type Output = Self;

    fn mul(self, rhs: f32) -> Self {
        Self {
            x: self.x * rhs,
            y: self.y * rhs,
        }
    }
}

impl Vec2 {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn dot(self, other: Self) -> f32 {
        self.x * other.x + self.y * other.y
    }

    pub fn cross(self, other: Self) -> f32 {
        (self.x * other.y) - (self.y * other.x)
    }

    pub fn length_squared(self) -> f32 {
        self.dot(self)
    }

    pub fn min(self, other: Self) -> Self {
        Self::new(self.x.min(other.x), self.y.min(other.y))
    }

    pub fn max(self, other: Self) -> Self {
        Self::new(self.x.max(other.x), self.y.max(other.y))
    }
}

/// Projects a homogeneous point to normalized device coordinates.
///
/// The last component is the depth `w`. Lateral axes are divided by `w` and
/// mapped so that `near[i]..far[i]` becomes `-1..1`; the depth axis is mapped
/// so that `near..far` becomes `0..1`. Points with `w <= 0` lie behind the eye
/// and project to all-NaN.
pub fn project<const D: usize>(p: &[f32; D], near: &[f32; D], far: &[f32; D]) -> [f32; D] {
    let w = p[D - 1];
    if w.is_nan() || w <= 0.0 {
        return [f32::NAN; D];
    }
    let mut ndc = [0.0; D];
    for i in 0..D - 1 {
        ndc[i] = 2.0 * (p[i] / w - near[i]) / (far[i] - near[i]) - 1.0;
    }
    ndc[D - 1] = (w - near[D - 1]) / (far[D - 1] - near[D - 1]);
    ndc
}

/// Maps NDC `x` and `y` to pixel space. `+y` is up in NDC and down in pixels.
pub fn ndc_to_screen(x: f32, y: f32, width: u32, height: u32) -> Vec2 {
    Vec2::new(
        (x + 1.0) * 0.5 * width as f32,
        (1.0 - y) * 0.5 * height as f32,
    )
}

/// The triangle's vertices in pixel space.
pub(crate) fn screen_points(tri: &Triangle, config: &ConfigUniform) -> [Vec2; 3] {
    tri.points
        .map(|p| ndc_to_screen(p[0], p[1], config.target_width, config.target_height))
}

/// Pixel space bounding box as `[x0, y0, x1, y1]`. Thin triangles are grown by
/// half a pixel on every side to cover their footprint.
pub(crate) fn screen_bbox(points: &[Vec2; 3], thin: bool) -> [f32; 4] {
    let lo = points[0].min(points[1]).min(points[2]);
    let hi = points[0].max(points[1]).max(points[2]);
    let pad = if thin { 0.5 } else { 0.0 };
    [lo.x - pad, lo.y - pad, hi.x + pad, hi.y + pad]
}

pub(crate) fn unpack4x8unorm(x: u32) -> [f32; 4] {
    let mut result = [0.0; 4];
    for (i, channel) in result.iter_mut().enumerate() {
        *channel = ((x >> (i * 8)) & 0xff) as f32 * (1.0 / 255.0);
    }
    result
}

pub(crate) fn pack4x8unorm(x: [f32; 4]) -> u32 {
    let mut result = 0;
    for (i, channel) in x.iter().enumerate() {
        let byte = (channel.clamp(0.0, 1.0) * 255.0).round() as u32;
        result |= byte << (i * 8);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn projection_example() {
        let ndc = project(&[1.0, 1.0, 2.0], &[0.0, 0.0, 0.0], &[2.0, 2.0, 3.0]);
        assert_eq!(ndc[0], -0.5);
        assert_eq!(ndc[1], -0.5);
        assert!((ndc[2] - 2.0 / 3.0).abs() < 1e-6);
    }

    #[test]
    fn projection_maps_planes_to_unit_range() {
        let near = [-1.0, -2.0, 0.0, 1.0];
        let far = [1.0, 2.0, 4.0, 5.0];
        // On the near plane of every axis at w = near depth.
        let lo = project(&[-1.0, -2.0, 0.0, 1.0], &near, &far);
        assert_eq!(lo, [-1.0, -1.0, -1.0, 0.0]);
        let hi = project(&[5.0, 10.0, 20.0, 5.0], &near, &far);
        assert_eq!(hi, [1.0, 1.0, 1.0, 1.0]);
    }

    #[test]
    fn behind_eye_is_nan() {
        let near = [-1.0, -1.0, 0.1];
        let far = [1.0, 1.0, 10.0];
        assert!(project(&[0.0, 0.0, 0.0], &near, &far)
            .iter()
            .all(|c| c.is_nan()));
        assert!(project(&[0.0, 0.0, -1.0], &near, &far)
            .iter()
            .all(|c| c.is_nan()));
        assert!(project(&[0.0, 0.0, f32::NAN], &near, &far)
            .iter()
            .all(|c| c.is_nan()));
    }

    #[test]
    fn screen_mapping_flips_y() {
        assert_eq!(ndc_to_screen(-1.0, 1.0, 64, 32), Vec2::new(0.0, 0.0));
        assert_eq!(ndc_to_screen(1.0, -1.0, 64, 32), Vec2::new(64.0, 32.0));
        assert_eq!(ndc_to_screen(0.0, 0.0, 64, 32), Vec2::new(32.0, 16.0));
    }

    #[test]
    fn unorm_packing() {
        assert_eq!(pack4x8unorm([1.0, 0.0, 0.0, 1.0]), 0xff00_00ff);
        assert_eq!(pack4x8unorm(unpack4x8unorm(0x1234_5678)), 0x1234_5678);
        assert_eq!(pack4x8unorm([2.0, -1.0, 0.5, 1.0]), 0xff80_00ff);
    }
}
