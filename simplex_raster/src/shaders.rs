// Copyright 2026 the Simplex Raster Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Register the kernels of the pipeline.

use simplex_raster_shaders::{cpu, SHADERS};

use crate::cpu_engine::CpuEngine;
use crate::recording::ShaderId;
use crate::Error;

/// Kernels for the full pipeline, instantiated for one render dimension.
#[derive(Clone, Copy, Debug)]
pub struct FullShaders {
    pub dimension: u32,
    pub clear: ShaderId,
    pub vertex: ShaderId,
    pub reduce: ShaderId,
    pub binning: ShaderId,
    pub fine: ShaderId,
}

/// Replaces every kernel registered in `engine` with the pipeline for
/// `dimension`.
pub(crate) fn full_shaders(engine: &mut CpuEngine, dimension: u32) -> Result<FullShaders, Error> {
    let vertex_kernel = cpu::vertex_kernel(dimension).ok_or(Error::InvalidDimension(dimension))?;
    let reduce_kernel = cpu::reduce_kernel(dimension).ok_or(Error::InvalidDimension(dimension))?;

    engine.clear_shaders();

    macro_rules! add_shader {
        ($name:ident, $kernel:expr) => {
            engine.add_shader(&SHADERS.$name, $kernel)
        };
        ($name:ident) => {
            add_shader!($name, cpu::$name)
        };
    }

    let clear = add_shader!(clear);
    let vertex = add_shader!(vertex, vertex_kernel);
    let reduce = add_shader!(reduce, reduce_kernel);
    let binning = add_shader!(binning);
    let fine = add_shader!(fine);
    log::debug!("registered kernels for dimension {dimension}");
    Ok(FullShaders {
        dimension,
        clear,
        vertex,
        reduce,
        binning,
        fine,
    })
}
