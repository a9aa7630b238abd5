// Copyright 2026 the Simplex Raster Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Buffer layouts and host-side encoding for the simplex rasterizer.
//!
//! Every type in this crate that is uploaded to or read back from the compute
//! backend is `#[repr(C)]` and [`bytemuck::Pod`], so the CPU kernels in
//! `simplex_raster_shaders` and any other engine see the same memory layout.

// LINEBENDER LINT SET - lib.rs - v2
// See https://linebender.org/wiki/canonical-lints/
// These lints aren't included in Cargo.toml because they
// shouldn't apply to examples and tests
#![warn(unused_crate_dependencies)]
#![warn(clippy::print_stdout, clippy::print_stderr)]
// Targeting e.g. 32-bit means structs containing usize can give false positives for 64-bit.
#![cfg_attr(target_pointer_width = "64", warn(clippy::trivially_copy_pass_by_ref))]
// END LINEBENDER LINT SET
#![cfg_attr(docsrs, feature(doc_auto_cfg))]
#![allow(missing_docs, reason = "We have many as-yet undocumented items.")]
#![allow(
    clippy::cast_possible_truncation,
    clippy::missing_assert_message,
    reason = "Deferred, only apply in some feature sets so not expect"
)]

mod binning;
mod config;
mod depth;
mod math;
mod planes;
mod primitive;
mod triangle;

pub use binning::{BinStatus, BIN_OK, BIN_OVERFLOWED};
pub use config::{
    BinLayout, BufferSize, BufferSizes, ConfigUniform, FrameCounters, FrameParams,
    PipelineConfig, RenderConfig, WorkgroupCounts, WorkgroupSize, BINNING_WG, CLEAR_WG,
    DEFAULT_BIN_HEIGHT, DEFAULT_BIN_QUEUE_SIZE, DEFAULT_BIN_WIDTH, MAX_DIMENSION, MIN_DIMENSION,
    REDUCE_WG, VERTEX_WG,
};
pub use depth::{DepthCompare, NO_OWNER};
pub use math::{triangles_per_primitive, TriangleTriples};
pub use planes::ClipPlanes;
pub use primitive::{pack_color, unpack_color, EncodingError, PrimitiveBuffer, PrimitiveType};
pub use triangle::Triangle;
