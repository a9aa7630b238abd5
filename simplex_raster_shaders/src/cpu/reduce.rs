// Copyright 2026 the Simplex Raster Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use rayon::prelude::*;
use simplex_raster_encoding::{
    ConfigUniform, DepthCompare, Triangle, TriangleTriples, WorkgroupSize, REDUCE_WG,
};

use super::CpuBinding;

/// Decomposes every projected primitive into its triangles.
///
/// Primitive `i` writes triangles `i * T .. (i + 1) * T`, where `T` is the
/// config's `triangles_per_primitive`, in lexicographic order of their vertex
/// triples.
pub fn reduce_main<const D: usize>(
    n_wg: WorkgroupSize,
    config: &ConfigUniform,
    projected: &[f32],
    colors: &[u32],
    triangles: &mut [Triangle],
) {
    let n_primitives = (config.n_primitives as usize).min((n_wg.0 * REDUCE_WG) as usize);
    let vertices_per_primitive = config.vertices_per_primitive as usize;
    let triangles_per_primitive = config.triangles_per_primitive as usize;
    if n_primitives == 0 || triangles_per_primitive == 0 || vertices_per_primitive > D {
        return;
    }
    let compare = config.depth_compare();
    let thin = vertices_per_primitive < 3;
    triangles[..n_primitives * triangles_per_primitive]
        .par_chunks_mut(triangles_per_primitive)
        .enumerate()
        .for_each(|(primitive_ix, out)| {
            let base = primitive_ix * vertices_per_primitive;
            let triples = TriangleTriples::new(config.vertices_per_primitive);
            for (tri, triple) in out.iter_mut().zip(triples) {
                *tri = make_triangle::<D>(projected, colors, base, triple, compare, thin);
            }
        });
}

fn make_triangle<const D: usize>(
    projected: &[f32],
    colors: &[u32],
    base: usize,
    triple: [u32; 3],
    compare: DepthCompare,
    thin: bool,
) -> Triangle {
    let mut tri = Triangle::default();
    for (k, vertex_ix) in triple.into_iter().enumerate() {
        let vertex_ix = base + vertex_ix as usize;
        let ndc = &projected[vertex_ix * D..][..D];
        tri.points[k] = [ndc[0], ndc[1], ndc[D - 1]];
        tri.colors[k] = colors[vertex_ix];
    }
    if tri.points.iter().flatten().any(|c| !c.is_finite()) {
        tri.flags |= Triangle::FLAG_CULLED;
    }
    if thin {
        tri.flags |= Triangle::FLAG_THIN;
    }
    tri.key = compare.best_of(tri.depths());
    tri
}

pub fn reduce<const D: usize>(n_wg: WorkgroupSize, resources: &[CpuBinding<'_>]) {
    let config = resources[0].as_typed();
    let projected = resources[1].as_slice();
    let colors = resources[2].as_slice();
    let mut triangles = resources[3].as_slice_mut();
    reduce_main::<D>(n_wg, &config, &projected, &colors, &mut triangles);
}
