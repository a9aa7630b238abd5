// Copyright 2026 the Simplex Raster Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

/// Owner value of a pixel no triangle has been written to yet.
pub const NO_OWNER: u32 = u32::MAX;

/// Depth comparison used by the fine rasterizer.
///
/// Whatever the comparison, fragments at exactly equal depth are resolved in
/// favour of the lower triangle index, so the resolved framebuffer does not
/// depend on the order in which triangles arrive in a bin queue.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum DepthCompare {
    /// Nearer (smaller) depths win. The default.
    #[default]
    Less = 0,
    LessEqual = 1,
    /// Farther (larger) depths win.
    Greater = 2,
    GreaterEqual = 3,
}

impl DepthCompare {
    /// Decodes the raw value stored in the config uniform. Unknown values
    /// fall back to [`DepthCompare::Less`].
    pub fn from_raw(raw: u32) -> Self {
        match raw {
            1 => Self::LessEqual,
            2 => Self::Greater,
            3 => Self::GreaterEqual,
            _ => Self::Less,
        }
    }

    /// Strict part of the comparison: `new` is better than `current`.
    #[inline]
    pub fn passes(self, new: f32, current: f32) -> bool {
        match self {
            Self::Less | Self::LessEqual => new < current,
            Self::Greater | Self::GreaterEqual => new > current,
        }
    }

    /// Whether a fragment at exactly the cleared depth may be written.
    #[inline]
    pub fn accepts_equal(self) -> bool {
        matches!(self, Self::LessEqual | Self::GreaterEqual)
    }

    /// Decides whether triangle `new_ix` at depth `new` replaces the current
    /// pixel contents.
    ///
    /// Ties are broken by triangle index: the lowest index wins. A pixel with
    /// no owner only accepts an equal depth if the comparison admits equality.
    #[inline]
    pub fn replaces(self, new: f32, new_ix: u32, current: f32, owner: u32) -> bool {
        if new == current {
            if owner == NO_OWNER {
                self.accepts_equal()
            } else {
                new_ix < owner
            }
        } else {
            self.passes(new, current)
        }
    }

    /// The best of three depths under this comparison. Used as the depth
    /// ordering key of a triangle.
    pub fn best_of(self, depths: [f32; 3]) -> f32 {
        match self {
            Self::Less | Self::LessEqual => depths[0].min(depths[1]).min(depths[2]),
            Self::Greater | Self::GreaterEqual => depths[0].max(depths[1]).max(depths[2]),
        }
    }

    /// Returns false if no fragment of a triangle with the given ordering key
    /// can replace a pixel holding `current`.
    #[inline]
    pub fn may_replace(self, key: f32, current: f32) -> bool {
        key == current || self.passes(key, current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_roundtrip() {
        for compare in [
            DepthCompare::Less,
            DepthCompare::LessEqual,
            DepthCompare::Greater,
            DepthCompare::GreaterEqual,
        ] {
            assert_eq!(DepthCompare::from_raw(compare as u32), compare);
        }
        assert_eq!(DepthCompare::from_raw(77), DepthCompare::Less);
    }

    #[test]
    fn ties_go_to_lowest_index() {
        let compare = DepthCompare::Less;
        assert!(compare.replaces(0.5, 3, 0.5, 7));
        assert!(!compare.replaces(0.5, 7, 0.5, 3));
        assert!(!compare.replaces(0.6, 0, 0.5, 7));
        assert!(compare.replaces(0.4, 9, 0.5, 7));
    }

    #[test]
    fn cleared_depth_equality() {
        assert!(!DepthCompare::Less.replaces(1.0, 0, 1.0, NO_OWNER));
        assert!(DepthCompare::LessEqual.replaces(1.0, 0, 1.0, NO_OWNER));
        assert!(DepthCompare::GreaterEqual.replaces(0.0, 0, 0.0, NO_OWNER));
        assert!(!DepthCompare::Greater.replaces(0.0, 0, 0.0, NO_OWNER));
    }

    #[test]
    fn key_is_best_depth() {
        assert_eq!(DepthCompare::Less.best_of([0.3, 0.1, 0.2]), 0.1);
        assert_eq!(DepthCompare::GreaterEqual.best_of([0.3, 0.1, 0.2]), 0.3);
        assert!(DepthCompare::Less.may_replace(0.1, 0.1));
        assert!(!DepthCompare::Less.may_replace(0.2, 0.1));
    }
}
