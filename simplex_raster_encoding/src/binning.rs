// Copyright 2026 the Simplex Raster Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

/// Raw per-bin status: every triangle overlapping the bin was recorded.
pub const BIN_OK: u32 = 0;
/// Raw per-bin status: the bin queue filled up before all triangles were recorded.
pub const BIN_OVERFLOWED: u32 = 1;

/// Host view of a bin after a frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinStatus {
    Ok,
    /// The bin's queue was too small. `required` is the number of
    /// triangle references the bin received, i.e. the smallest queue size
    /// that would have held all of them.
    Overflowed { required: u32 },
}

impl BinStatus {
    /// Decodes the raw status word and write cursor of a bin.
    pub fn from_raw(status: u32, cursor: u32) -> Self {
        if status == BIN_OVERFLOWED {
            Self::Overflowed { required: cursor }
        } else {
            Self::Ok
        }
    }
}
