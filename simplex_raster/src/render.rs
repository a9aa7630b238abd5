// Copyright 2026 the Simplex Raster Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Build the recording of a frame.

use simplex_raster_encoding::{BufferSizes, PrimitiveBuffer, RenderConfig};

use crate::recording::{BufferProxy, Recording};
use crate::shaders::FullShaders;

/// Every buffer owned by the pipeline for one [`PipelineConfig`].
///
/// The proxies are created together with the config and stay the same until
/// the next reconfiguration frees them.
///
/// [`PipelineConfig`]: simplex_raster_encoding::PipelineConfig
#[derive(Clone, Copy, Debug)]
pub struct PipelineBuffers {
    pub config: BufferProxy,
    pub planes: BufferProxy,
    pub vertices: BufferProxy,
    pub colors: BufferProxy,
    pub projected: BufferProxy,
    pub triangles: BufferProxy,
    pub bin_cursors: BufferProxy,
    pub bin_status: BufferProxy,
    pub bin_queues: BufferProxy,
    pub counters: BufferProxy,
    pub color: BufferProxy,
    pub depth: BufferProxy,
}

impl PipelineBuffers {
    pub fn new(sizes: &BufferSizes) -> Self {
        let proxy = |size: u32, name| BufferProxy::new(u64::from(size), name);
        Self {
            config: proxy(sizes.config.size_in_bytes(), "config"),
            planes: proxy(sizes.planes.size_in_bytes(), "planes"),
            vertices: proxy(sizes.vertices.size_in_bytes(), "vertices"),
            colors: proxy(sizes.colors.size_in_bytes(), "colors"),
            projected: proxy(sizes.projected.size_in_bytes(), "projected"),
            triangles: proxy(sizes.triangles.size_in_bytes(), "triangles"),
            bin_cursors: proxy(sizes.bin_cursors.size_in_bytes(), "bin_cursors"),
            bin_status: proxy(sizes.bin_status.size_in_bytes(), "bin_status"),
            bin_queues: proxy(sizes.bin_queues.size_in_bytes(), "bin_queues"),
            counters: proxy(sizes.counters.size_in_bytes(), "counters"),
            color: proxy(sizes.color.size_in_bytes(), "color"),
            depth: proxy(sizes.depth.size_in_bytes(), "depth"),
        }
    }

    fn all(&self) -> [BufferProxy; 12] {
        [
            self.config,
            self.planes,
            self.vertices,
            self.colors,
            self.projected,
            self.triangles,
            self.bin_cursors,
            self.bin_status,
            self.bin_queues,
            self.counters,
            self.color,
            self.depth,
        ]
    }

    /// Records freeing every buffer.
    pub fn release(&self, recording: &mut Recording) {
        for buf in self.all() {
            recording.free_buffer(buf);
        }
    }
}

/// Records one frame: uploads, the five dispatches in dependency order, and
/// downloads of the binning results.
pub fn render_frame(
    recording: &mut Recording,
    shaders: &FullShaders,
    buffers: &PipelineBuffers,
    config: &RenderConfig,
    planes: &[f32],
    primitives: &PrimitiveBuffer,
) {
    let wg_counts = &config.workgroup_counts;
    recording.write_uniform(buffers.config, bytemuck::bytes_of(&config.gpu));
    recording.write_uniform(buffers.planes, bytemuck::cast_slice(planes));
    recording.write(buffers.vertices, bytemuck::cast_slice(primitives.coords()));
    recording.write(buffers.colors, bytemuck::cast_slice(primitives.colors()));

    recording.dispatch(
        shaders.clear,
        wg_counts.clear,
        [
            buffers.config,
            buffers.color,
            buffers.depth,
            buffers.bin_cursors,
            buffers.bin_status,
            buffers.counters,
        ],
    );
    recording.dispatch(
        shaders.vertex,
        wg_counts.vertex,
        [
            buffers.config,
            buffers.planes,
            buffers.vertices,
            buffers.projected,
        ],
    );
    recording.dispatch(
        shaders.reduce,
        wg_counts.reduce,
        [
            buffers.config,
            buffers.projected,
            buffers.colors,
            buffers.triangles,
        ],
    );
    recording.dispatch(
        shaders.binning,
        wg_counts.binning,
        [
            buffers.config,
            buffers.triangles,
            buffers.bin_cursors,
            buffers.bin_queues,
            buffers.bin_status,
            buffers.counters,
        ],
    );
    recording.dispatch(
        shaders.fine,
        wg_counts.fine,
        [
            buffers.config,
            buffers.triangles,
            buffers.bin_cursors,
            buffers.bin_queues,
            buffers.color,
            buffers.depth,
        ],
    );
    recording.download(buffers.counters);
    recording.download(buffers.bin_cursors);
    recording.download(buffers.bin_status);
}
