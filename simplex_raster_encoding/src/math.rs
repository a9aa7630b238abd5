// Copyright 2026 the Simplex Raster Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

/// Number of triangles a primitive with `vertices` vertices reduces to.
///
/// This is `C(vertices, 3)`. Points and lines still produce one (degenerate)
/// triangle each.
pub const fn triangles_per_primitive(vertices: u32) -> u32 {
    if vertices < 3 {
        1
    } else {
        vertices * (vertices - 1) * (vertices - 2) / 6
    }
}

/// Enumerates the vertex triples of a primitive in lexicographic order.
///
/// For three or more vertices these are all `i < j < k`. A point yields
/// `[0, 0, 0]` and a line `[0, 1, 1]`.
#[derive(Clone, Debug)]
pub struct TriangleTriples {
    vertices: u32,
    next: Option<[u32; 3]>,
}

impl TriangleTriples {
    pub fn new(vertices: u32) -> Self {
        let next = match vertices {
            0 => None,
            1 => Some([0, 0, 0]),
            2 => Some([0, 1, 1]),
            _ => Some([0, 1, 2]),
        };
        Self { vertices, next }
    }

    fn successor(&self, [i, j, k]: [u32; 3]) -> Option<[u32; 3]> {
        let n = self.vertices;
        if n < 3 {
            return None;
        }
        if k + 1 < n {
            Some([i, j, k + 1])
        } else if j + 2 < n {
            Some([i, j + 1, j + 2])
        } else if i + 3 < n {
            Some([i + 1, i + 2, i + 3])
        } else {
            None
        }
    }
}

impl Iterator for TriangleTriples {
    type Item = [u32; 3];

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = self.successor(current);
        Some(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tetrahedron_triples() {
        let triples: Vec<_> = TriangleTriples::new(4).collect();
        assert_eq!(triples, [[0, 1, 2], [0, 1, 3], [0, 2, 3], [1, 2, 3]]);
    }

    #[test]
    fn triple_count_matches_binomial() {
        for n in 0..=10 {
            let count = TriangleTriples::new(n).count() as u32;
            let expected = if n == 0 { 0 } else { triangles_per_primitive(n) };
            assert_eq!(count, expected, "n = {n}");
        }
    }

    #[test]
    fn triples_are_strictly_increasing_and_sorted() {
        let triples: Vec<_> = TriangleTriples::new(7).collect();
        for t in &triples {
            assert!(t[0] < t[1] && t[1] < t[2]);
        }
        for pair in triples.windows(2) {
            assert!(pair[0] < pair[1]);
        }
    }

    #[test]
    fn degenerate_primitives() {
        assert_eq!(TriangleTriples::new(1).collect::<Vec<_>>(), [[0, 0, 0]]);
        assert_eq!(TriangleTriples::new(2).collect::<Vec<_>>(), [[0, 1, 1]]);
        assert_eq!(TriangleTriples::new(3).collect::<Vec<_>>(), [[0, 1, 2]]);
    }
}
