// Copyright 2026 the Simplex Raster Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Kernel descriptions for the simplex rasterizer.
//!
//! Each stage of the pipeline is described by a [`ComputeShader`]: its name,
//! work-group shape and the resources it binds, in binding order. An engine
//! uses these descriptions to validate dispatches. The `cpu` feature adds a
//! data-parallel CPU implementation of every kernel in [`cpu`].

// LINEBENDER LINT SET - lib.rs - v2
// See https://linebender.org/wiki/canonical-lints/
// These lints aren't included in Cargo.toml because they
// shouldn't apply to examples and tests
#![warn(unused_crate_dependencies)]
#![warn(clippy::print_stdout, clippy::print_stderr)]
// Targeting e.g. 32-bit means structs containing usize can give false positives for 64-bit.
#![cfg_attr(target_pointer_width = "64", warn(clippy::trivially_copy_pass_by_ref))]
// END LINEBENDER LINT SET
#![cfg_attr(docsrs, feature(doc_cfg))]
#![allow(missing_docs, reason = "We have many as-yet undocumented items.")]
#![allow(
    missing_debug_implementations,
    clippy::cast_possible_truncation,
    clippy::missing_assert_message,
    reason = "Deferred, only apply in some feature sets so not expect"
)]

mod types;

#[cfg(feature = "cpu")]
pub mod cpu;

pub use types::BindType;

#[derive(Clone, Copy, Debug)]
pub struct ComputeShader {
    pub name: &'static str,
    pub workgroup_size: [u32; 3],
    pub bindings: &'static [BindType],
}

/// The kernels of the full pipeline.
#[derive(Clone, Copy, Debug)]
pub struct Shaders {
    pub clear: ComputeShader,
    pub vertex: ComputeShader,
    pub reduce: ComputeShader,
    pub binning: ComputeShader,
    pub fine: ComputeShader,
}

impl Shaders {
    pub fn iter(&self) -> impl Iterator<Item = &ComputeShader> {
        [
            &self.clear,
            &self.vertex,
            &self.reduce,
            &self.binning,
            &self.fine,
        ]
        .into_iter()
    }
}

use BindType::{BufReadOnly, Buffer, Uniform};

pub const SHADERS: Shaders = Shaders {
    // config, color, depth, bin cursors, bin status, counters
    clear: ComputeShader {
        name: "clear",
        workgroup_size: [256, 1, 1],
        bindings: &[Uniform, Buffer, Buffer, Buffer, Buffer, Buffer],
    },
    // config, planes, vertices, projected
    vertex: ComputeShader {
        name: "vertex",
        workgroup_size: [256, 1, 1],
        bindings: &[Uniform, Uniform, BufReadOnly, Buffer],
    },
    // config, projected, colors, triangles
    reduce: ComputeShader {
        name: "reduce",
        workgroup_size: [64, 1, 1],
        bindings: &[Uniform, BufReadOnly, BufReadOnly, Buffer],
    },
    // config, triangles, bin cursors, bin queues, bin status, counters
    binning: ComputeShader {
        name: "binning",
        workgroup_size: [256, 1, 1],
        bindings: &[Uniform, BufReadOnly, Buffer, Buffer, Buffer, Buffer],
    },
    // config, triangles, bin cursors, bin queues, color, depth
    fine: ComputeShader {
        name: "fine",
        workgroup_size: [16, 16, 1],
        bindings: &[
            Uniform,
            BufReadOnly,
            BufReadOnly,
            BufReadOnly,
            Buffer,
            Buffer,
        ],
    },
};
