// Copyright 2026 the Simplex Raster Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use peniko::color::palette;
use peniko::Color;
use thiserror::Error;

/// Errors raised while encoding host data for the pipeline.
#[derive(Error, Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum EncodingError {
    /// The coordinate array does not hold a whole number of primitives.
    #[error(
        "{got} coordinates do not form whole {kind:?} primitives of dimension {dimension} \
         ({per_primitive} coordinates each)"
    )]
    CoordinateCountMismatch {
        kind: PrimitiveType,
        dimension: u32,
        per_primitive: usize,
        got: usize,
    },
    /// One color per vertex is required when colors are given.
    #[error("Got {got} colors for {expected} vertices")]
    ColorCountMismatch { expected: usize, got: usize },
    #[error("Clip plane has {got} components but the render dimension is {expected}")]
    PlaneDimensionMismatch { expected: u32, got: usize },
    /// Near and far coincide on an axis, so the projection divides by zero.
    #[error("Near and far planes are both {value} on axis {axis}")]
    DegenerateClipPlane { axis: usize, value: f32 },
    #[error("Clip plane on axis {axis} is not finite")]
    NonFiniteClipPlane { axis: usize },
}

/// How the vertices of a [`PrimitiveBuffer`] are grouped into primitives.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PrimitiveType {
    /// One vertex per primitive.
    Points,
    /// Two vertices per primitive.
    Lines,
    /// Three vertices per primitive, at any render dimension.
    Triangles,
    /// As many vertices as the render dimension: a triangle in 3D, a
    /// tetrahedron in 4D, and so on.
    Simplices,
}

impl PrimitiveType {
    pub fn vertices_per_primitive(self, dimension: u32) -> u32 {
        match self {
            Self::Points => 1,
            Self::Lines => 2,
            Self::Triangles => 3,
            Self::Simplices => dimension,
        }
    }
}

/// Packs a color as RGBA8 with red in the least significant byte.
pub fn pack_color(color: Color) -> u32 {
    let rgba = color.to_rgba8();
    u32::from_le_bytes([rgba.r, rgba.g, rgba.b, rgba.a])
}

/// Inverse of [`pack_color`].
pub fn unpack_color(packed: u32) -> Color {
    let [r, g, b, a] = packed.to_le_bytes();
    Color::from_rgba8(r, g, b, a)
}

/// Host-side primitive data, ready for upload.
///
/// Coordinates are stored flat: `dimension` floats per vertex, vertices of a
/// primitive adjacent. Colors are per vertex and packed with [`pack_color`].
#[derive(Clone, Debug, PartialEq)]
pub struct PrimitiveBuffer {
    kind: PrimitiveType,
    dimension: u32,
    coords: Vec<f32>,
    colors: Vec<u32>,
}

impl PrimitiveBuffer {
    pub fn new(kind: PrimitiveType, dimension: u32) -> Self {
        Self {
            kind,
            dimension,
            coords: Vec::new(),
            colors: Vec::new(),
        }
    }

    /// Wraps existing coordinate data. Without `colors`, every vertex is white.
    pub fn from_raw(
        kind: PrimitiveType,
        dimension: u32,
        coords: Vec<f32>,
        colors: Option<&[Color]>,
    ) -> Result<Self, EncodingError> {
        let mut buffer = Self::new(kind, dimension);
        buffer.check_coords(&coords)?;
        let n_vertices = coords.len() / dimension.max(1) as usize;
        buffer.colors = match colors {
            Some(colors) => {
                if colors.len() != n_vertices {
                    return Err(EncodingError::ColorCountMismatch {
                        expected: n_vertices,
                        got: colors.len(),
                    });
                }
                colors.iter().copied().map(pack_color).collect()
            }
            None => vec![pack_color(palette::css::WHITE); n_vertices],
        };
        buffer.coords = coords;
        Ok(buffer)
    }

    /// Appends one primitive drawn in a single color.
    pub fn push(&mut self, coords: &[f32], color: Color) -> Result<(), EncodingError> {
        let n = self.vertices_per_primitive() as usize;
        self.push_with_colors(coords, &vec![color; n])
    }

    /// Appends one primitive with a color per vertex.
    pub fn push_with_colors(
        &mut self,
        coords: &[f32],
        colors: &[Color],
    ) -> Result<(), EncodingError> {
        let per_primitive = self.coords_per_primitive();
        if coords.len() != per_primitive {
            return Err(self.coord_mismatch(coords.len()));
        }
        let n = self.vertices_per_primitive() as usize;
        if colors.len() != n {
            return Err(EncodingError::ColorCountMismatch {
                expected: n,
                got: colors.len(),
            });
        }
        self.coords.extend_from_slice(coords);
        self.colors.extend(colors.iter().copied().map(pack_color));
        Ok(())
    }

    pub fn reset(&mut self) {
        self.coords.clear();
        self.colors.clear();
    }

    pub fn kind(&self) -> PrimitiveType {
        self.kind
    }

    pub fn dimension(&self) -> u32 {
        self.dimension
    }

    pub fn vertices_per_primitive(&self) -> u32 {
        self.kind.vertices_per_primitive(self.dimension)
    }

    /// Number of primitives.
    pub fn len(&self) -> u32 {
        match self.coords_per_primitive() {
            0 => 0,
            per_primitive => (self.coords.len() / per_primitive) as u32,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.coords.is_empty()
    }

    pub fn n_vertices(&self) -> u32 {
        self.colors.len() as u32
    }

    pub fn coords(&self) -> &[f32] {
        &self.coords
    }

    pub fn colors(&self) -> &[u32] {
        &self.colors
    }

    fn coords_per_primitive(&self) -> usize {
        (self.vertices_per_primitive() * self.dimension) as usize
    }

    fn check_coords(&self, coords: &[f32]) -> Result<(), EncodingError> {
        let per_primitive = self.coords_per_primitive();
        if per_primitive == 0 || coords.len() % per_primitive != 0 {
            return Err(self.coord_mismatch(coords.len()));
        }
        Ok(())
    }

    fn coord_mismatch(&self, got: usize) -> EncodingError {
        EncodingError::CoordinateCountMismatch {
            kind: self.kind,
            dimension: self.dimension,
            per_primitive: self.coords_per_primitive(),
            got,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn color_packing_puts_red_low() {
        assert_eq!(pack_color(palette::css::RED), 0xff00_00ff);
        assert_eq!(pack_color(Color::from_rgba8(1, 2, 3, 4)), 0x0403_0201);
        assert_eq!(
            pack_color(unpack_color(0x8040_20ff)),
            0x8040_20ff,
            "unpack is the inverse of pack"
        );
    }

    #[test]
    fn push_tetrahedra() {
        let mut buffer = PrimitiveBuffer::new(PrimitiveType::Simplices, 4);
        buffer
            .push(&[0.0; 16], palette::css::BLUE)
            .expect("whole tetrahedron");
        buffer
            .push_with_colors(
                &[1.0; 16],
                &[
                    palette::css::RED,
                    palette::css::GREEN,
                    palette::css::BLUE,
                    palette::css::WHITE,
                ],
            )
            .expect("whole tetrahedron");
        assert_eq!(buffer.len(), 2);
        assert_eq!(buffer.n_vertices(), 8);
        assert_eq!(buffer.colors()[4], pack_color(palette::css::RED));
    }

    #[test]
    fn partial_primitive_is_rejected() {
        let mut buffer = PrimitiveBuffer::new(PrimitiveType::Lines, 3);
        let err = buffer.push(&[0.0; 5], palette::css::WHITE).unwrap_err();
        assert_eq!(
            err,
            EncodingError::CoordinateCountMismatch {
                kind: PrimitiveType::Lines,
                dimension: 3,
                per_primitive: 6,
                got: 5,
            }
        );
        assert!(buffer.is_empty());
    }

    #[test]
    fn from_raw_defaults_to_white() {
        let buffer =
            PrimitiveBuffer::from_raw(PrimitiveType::Points, 3, vec![0.0, 0.0, 1.0, 1.0, 1.0, 2.0], None)
                .unwrap();
        assert_eq!(buffer.len(), 2);
        assert_eq!(buffer.colors(), &[0xffff_ffff, 0xffff_ffff]);
    }

    #[test]
    fn from_raw_checks_colors() {
        let err = PrimitiveBuffer::from_raw(
            PrimitiveType::Triangles,
            3,
            vec![0.0; 9],
            Some(&[palette::css::WHITE]),
        )
        .unwrap_err();
        assert_eq!(
            err,
            EncodingError::ColorCountMismatch {
                expected: 3,
                got: 1
            }
        );
    }
}
