// Copyright 2026 the Simplex Raster Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use rayon::prelude::*;
use simplex_raster_encoding::{ConfigUniform, WorkgroupSize, VERTEX_WG};

use super::util::project;
use super::CpuBinding;

/// Projects every vertex of the frame to normalized device coordinates.
///
/// `planes` holds `D` near values followed by `D` far values.
pub fn vertex_main<const D: usize>(
    n_wg: WorkgroupSize,
    config: &ConfigUniform,
    planes: &[f32],
    vertices: &[f32],
    projected: &mut [f32],
) {
    let (Some(near), Some(far)) = (
        planes.first_chunk::<D>(),
        planes.get(D..).and_then(|p| p.first_chunk::<D>()),
    ) else {
        return;
    };
    let n_vertices = (config.n_vertices as usize).min((n_wg.0 * VERTEX_WG) as usize);
    let n_coords = n_vertices * D;
    vertices[..n_coords]
        .par_chunks_exact(D)
        .zip(projected[..n_coords].par_chunks_exact_mut(D))
        .for_each(|(point, out)| {
            if let (Some(point), Some(out)) = (point.first_chunk::<D>(), out.first_chunk_mut::<D>())
            {
                *out = project(point, near, far);
            }
        });
}

pub fn vertex<const D: usize>(n_wg: WorkgroupSize, resources: &[CpuBinding<'_>]) {
    let config = resources[0].as_typed();
    let planes = resources[1].as_slice();
    let vertices = resources[2].as_slice();
    let mut projected = resources[3].as_slice_mut();
    vertex_main::<D>(n_wg, &config, &planes, &vertices, &mut projected);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(n_vertices: u32, dimension: u32) -> ConfigUniform {
        ConfigUniform {
            dimension,
            n_vertices,
            ..Default::default()
        }
    }

    #[test]
    fn projects_every_vertex() {
        let planes = [0.0, 0.0, 0.0, 2.0, 2.0, 3.0];
        let vertices = [1.0, 1.0, 2.0, 0.0, 0.0, 3.0, 5.0, 5.0, -1.0];
        let mut projected = [0.0; 9];
        vertex_main::<3>((1, 1, 1), &config(3, 3), &planes, &vertices, &mut projected);
        assert_eq!(&projected[..2], &[-0.5, -0.5]);
        assert!((projected[2] - 2.0 / 3.0).abs() < 1e-6);
        assert_eq!(&projected[3..6], &[-1.0, -1.0, 1.0]);
        assert!(projected[6..].iter().all(|c| c.is_nan()));
    }

    #[test]
    fn higher_dimensions_use_last_axis_as_depth() {
        let near = [-1.0; 5].into_iter().chain([0.0]);
        let far = [1.0; 5].into_iter().chain([4.0]);
        let planes: Vec<f32> = near.chain(far).collect();
        let vertices = [0.5, -0.5, 1.0, 0.0, 2.0, 2.0];
        let mut projected = [0.0; 6];
        vertex_main::<6>((1, 1, 1), &config(1, 6), &planes, &vertices, &mut projected);
        assert_eq!(projected, [0.25, -0.25, 0.5, 0.0, 1.0, 0.5]);
    }

    #[test]
    fn leaves_unused_capacity_alone() {
        let planes = [-1.0, -1.0, 0.0, 1.0, 1.0, 1.0];
        let vertices = [0.0; 6];
        let mut projected = [9.0; 6];
        vertex_main::<3>((1, 1, 1), &config(1, 3), &planes, &vertices, &mut projected);
        assert_eq!(&projected[3..], &[9.0; 3]);
    }
}
