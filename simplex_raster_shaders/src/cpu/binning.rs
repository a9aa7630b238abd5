// Copyright 2026 the Simplex Raster Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use std::sync::atomic::{AtomicU32, Ordering};

use rayon::prelude::*;
use simplex_raster_encoding::{
    ConfigUniform, FrameCounters, Triangle, WorkgroupSize, BINNING_WG, BIN_OVERFLOWED,
};

use super::util::{screen_bbox, screen_points};
use super::CpuBinding;

/// Range of bins `[x0, y0, x1, y1)` a triangle has to be recorded in, or
/// `None` if it cannot produce any fragment.
pub(crate) fn bin_range(config: &ConfigUniform, tri: &Triangle) -> Option<[u32; 4]> {
    if tri.is_culled() {
        return None;
    }
    let depths = tri.depths();
    if depths.iter().all(|&d| d < 0.0) || depths.iter().all(|&d| d > 1.0) {
        return None;
    }
    let bbox = screen_bbox(&screen_points(tri, config), tri.is_thin());
    let bin_w = config.bin_width as f32;
    let bin_h = config.bin_height as f32;
    let clamp_x = |x: f32| x.clamp(0.0, config.width_in_bins as f32) as u32;
    let clamp_y = |y: f32| y.clamp(0.0, config.height_in_bins as f32) as u32;
    let x0 = clamp_x((bbox[0] / bin_w).floor());
    let y0 = clamp_y((bbox[1] / bin_h).floor());
    let x1 = clamp_x((bbox[2] / bin_w).ceil());
    let y1 = clamp_y((bbox[3] / bin_h).ceil());
    (x0 < x1 && y0 < y1).then_some([x0, y0, x1, y1])
}

/// Appends every triangle to the queue of every bin its bounding box touches.
///
/// The order of indices within a queue is unspecified. A bin whose cursor
/// passes the queue size stops recording and is flagged as overflowed; the
/// cursor keeps counting so the final value is the size the queue needed.
pub fn binning_main(
    n_wg: WorkgroupSize,
    config: &ConfigUniform,
    triangles: &[Triangle],
    bin_cursors: &[AtomicU32],
    bin_queues: &[AtomicU32],
    bin_status: &[AtomicU32],
    counters: &[AtomicU32],
) {
    let n_triangles = config.n_triangles.min(n_wg.0 * BINNING_WG);
    let queue_size = config.bin_queue_size;
    (0..n_triangles).into_par_iter().for_each(|tri_ix| {
        let Some([x0, y0, x1, y1]) = bin_range(config, &triangles[tri_ix as usize]) else {
            return;
        };
        for bin_y in y0..y1 {
            for bin_x in x0..x1 {
                let bin_ix = (bin_y * config.width_in_bins + bin_x) as usize;
                let slot = bin_cursors[bin_ix].fetch_add(1, Ordering::Relaxed);
                counters[FrameCounters::APPENDS].fetch_add(1, Ordering::Relaxed);
                counters[FrameCounters::MAX_BIN_COUNT].fetch_max(slot + 1, Ordering::Relaxed);
                if slot < queue_size {
                    let queue_ix = bin_ix * queue_size as usize + slot as usize;
                    bin_queues[queue_ix].store(tri_ix, Ordering::Relaxed);
                } else if bin_status[bin_ix].swap(BIN_OVERFLOWED, Ordering::Relaxed)
                    != BIN_OVERFLOWED
                {
                    counters[FrameCounters::OVERFLOWED_BINS].fetch_add(1, Ordering::Relaxed);
                    counters[FrameCounters::FAILED].store(1, Ordering::Relaxed);
                }
            }
        }
    });
}

pub fn binning(n_wg: WorkgroupSize, resources: &[CpuBinding<'_>]) {
    let config = resources[0].as_typed();
    let triangles = resources[1].as_slice();
    let bin_cursors = resources[2].as_atomic();
    let bin_queues = resources[3].as_atomic();
    let bin_status = resources[4].as_atomic();
    let counters = resources[5].as_atomic();
    binning_main(
        n_wg,
        &config,
        &triangles,
        &bin_cursors,
        &bin_queues,
        &bin_status,
        &counters,
    );
}
