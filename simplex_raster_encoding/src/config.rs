// Copyright 2026 the Simplex Raster Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use bytemuck::{Pod, Zeroable};

use crate::{DepthCompare, Triangle};

/// Smallest supported render dimension: x, y and a depth axis.
pub const MIN_DIMENSION: u32 = 3;
/// Largest supported render dimension. Kernels are instantiated once per dimension.
pub const MAX_DIMENSION: u32 = 8;

pub const DEFAULT_BIN_WIDTH: u32 = 16;
pub const DEFAULT_BIN_HEIGHT: u32 = 16;
pub const DEFAULT_BIN_QUEUE_SIZE: u32 = 256;

// Work-group sizes of the individual stages. The fine stage always runs one
// work-group per bin.
pub const CLEAR_WG: u32 = 256;
pub const VERTEX_WG: u32 = 256;
pub const REDUCE_WG: u32 = 64;
pub const BINNING_WG: u32 = 256;

/// Counters written by the binning stage.
///
/// Every field is updated with atomic operations on the device, so the struct
/// must consist of `u32`s only.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Zeroable, Pod)]
#[repr(C)]
pub struct FrameCounters {
    /// Non-zero if any bin queue overflowed this frame.
    pub failed: u32,
    /// Number of bins whose queue overflowed.
    pub overflowed_bins: u32,
    /// Total number of triangle-to-bin appends attempted.
    pub appends: u32,
    /// Largest write cursor reached by any bin, i.e. the queue size that
    /// would have been needed to record every triangle.
    pub max_bin_count: u32,
}

impl FrameCounters {
    pub const FAILED: usize = 0;
    pub const OVERFLOWED_BINS: usize = 1;
    pub const APPENDS: usize = 2;
    pub const MAX_BIN_COUNT: usize = 3;
    /// Number of `u32` words in the struct.
    pub const WORDS: usize = 4;
}

/// Uniform render configuration data used by all stages.
#[derive(Clone, Copy, Debug, Default, Zeroable, Pod)]
#[repr(C)]
pub struct ConfigUniform {
    /// Number of components of every point.
    pub dimension: u32,
    /// Width of the target in pixels.
    pub target_width: u32,
    /// Height of the target in pixels.
    pub target_height: u32,
    pub bin_width: u32,
    pub bin_height: u32,
    pub width_in_bins: u32,
    pub height_in_bins: u32,
    /// Capacity of every bin queue, in triangle indices.
    pub bin_queue_size: u32,
    pub n_vertices: u32,
    pub n_primitives: u32,
    pub vertices_per_primitive: u32,
    pub triangles_per_primitive: u32,
    pub n_triangles: u32,
    /// Packed RGBA8 color the target is cleared to.
    pub clear_color: u32,
    /// Depth the target is cleared to.
    pub clear_depth: f32,
    /// Raw [`DepthCompare`] value.
    pub depth_compare: u32,
}

impl ConfigUniform {
    pub fn n_bins(&self) -> u32 {
        self.width_in_bins * self.height_in_bins
    }

    pub fn n_pixels(&self) -> u32 {
        self.target_width * self.target_height
    }

    pub fn depth_compare(&self) -> DepthCompare {
        DepthCompare::from_raw(self.depth_compare)
    }
}

/// Tile geometry of the target.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BinLayout {
    pub bin_width: u32,
    pub bin_height: u32,
    pub width_in_bins: u32,
    pub height_in_bins: u32,
    pub queue_size: u32,
}

impl BinLayout {
    pub fn new(width: u32, height: u32, bin_width: u32, bin_height: u32, queue_size: u32) -> Self {
        Self {
            bin_width,
            bin_height,
            width_in_bins: width.div_ceil(bin_width),
            height_in_bins: height.div_ceil(bin_height),
            queue_size,
        }
    }

    pub fn n_bins(&self) -> u32 {
        self.width_in_bins * self.height_in_bins
    }
}

/// Per-frame values that are not part of the [`PipelineConfig`].
#[derive(Clone, Copy, Debug)]
pub struct FrameParams {
    pub n_primitives: u32,
    pub vertices_per_primitive: u32,
    pub clear_color: u32,
    pub clear_depth: f32,
    pub depth_compare: DepthCompare,
}

/// Sizing of every buffer the pipeline owns.
///
/// A new value is built whenever the render dimension, viewport, bin geometry
/// or primitive capacity changes, and the renderer swaps it in as a whole.
/// Buffer sizes never change while a config is live.
#[derive(Clone, Debug, PartialEq)]
pub struct PipelineConfig {
    pub dimension: u32,
    pub width: u32,
    pub height: u32,
    pub bins: BinLayout,
    /// Number of vertices the vertex buffers can hold.
    pub vertex_capacity: u32,
    /// Number of triangles the triangle buffer can hold.
    pub triangle_capacity: u32,
    pub buffer_sizes: BufferSizes,
}

impl PipelineConfig {
    /// Returns `None` if any buffer would be larger than `u32::MAX` bytes.
    pub fn new(
        dimension: u32,
        width: u32,
        height: u32,
        bins: BinLayout,
        vertex_capacity: u32,
        triangle_capacity: u32,
    ) -> Option<Self> {
        let buffer_sizes = BufferSizes::new(
            dimension,
            width,
            height,
            &bins,
            vertex_capacity,
            triangle_capacity,
        )?;
        Some(Self {
            dimension,
            width,
            height,
            bins,
            vertex_capacity,
            triangle_capacity,
            buffer_sizes,
        })
    }

    /// Returns true if a frame with the given counts can run without
    /// reallocating.
    pub fn fits(&self, n_vertices: u32, n_triangles: u32) -> bool {
        n_vertices <= self.vertex_capacity && n_triangles <= self.triangle_capacity
    }

    /// Combines the static configuration with per-frame values.
    pub fn render_config(&self, frame: &FrameParams) -> RenderConfig {
        let triangles_per_primitive =
            crate::triangles_per_primitive(frame.vertices_per_primitive);
        let gpu = ConfigUniform {
            dimension: self.dimension,
            target_width: self.width,
            target_height: self.height,
            bin_width: self.bins.bin_width,
            bin_height: self.bins.bin_height,
            width_in_bins: self.bins.width_in_bins,
            height_in_bins: self.bins.height_in_bins,
            bin_queue_size: self.bins.queue_size,
            n_vertices: frame.n_primitives * frame.vertices_per_primitive,
            n_primitives: frame.n_primitives,
            vertices_per_primitive: frame.vertices_per_primitive,
            triangles_per_primitive,
            n_triangles: frame.n_primitives * triangles_per_primitive,
            clear_color: frame.clear_color,
            clear_depth: frame.clear_depth,
            depth_compare: frame.depth_compare as u32,
        };
        RenderConfig {
            workgroup_counts: WorkgroupCounts::new(&gpu),
            gpu,
        }
    }
}

/// CPU side setup of a single frame.
#[derive(Clone, Copy, Debug, Default)]
pub struct RenderConfig {
    /// Device side configuration.
    pub gpu: ConfigUniform,
    /// Workgroup counts for all compute pipelines.
    pub workgroup_counts: WorkgroupCounts,
}

/// Type alias for a workgroup size.
pub type WorkgroupSize = (u32, u32, u32);

/// Computed sizes for all dispatches.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct WorkgroupCounts {
    pub clear: WorkgroupSize,
    pub vertex: WorkgroupSize,
    pub reduce: WorkgroupSize,
    pub binning: WorkgroupSize,
    pub fine: WorkgroupSize,
}

impl WorkgroupCounts {
    pub fn new(config: &ConfigUniform) -> Self {
        let clear_items = config.n_pixels().max(config.n_bins());
        Self {
            clear: (clear_items.div_ceil(CLEAR_WG), 1, 1),
            vertex: (config.n_vertices.div_ceil(VERTEX_WG), 1, 1),
            reduce: (config.n_primitives.div_ceil(REDUCE_WG), 1, 1),
            binning: (config.n_triangles.div_ceil(BINNING_WG), 1, 1),
            fine: (config.width_in_bins, config.height_in_bins, 1),
        }
    }
}

/// Typed buffer size primitive.
#[derive(Copy, Clone, Eq, Default, Debug)]
pub struct BufferSize<T: Sized> {
    len: u32,
    _phantom: std::marker::PhantomData<T>,
}

impl<T: Sized> BufferSize<T> {
    /// Creates a new buffer size from number of elements.
    pub const fn new(len: u32) -> Self {
        Self {
            // Each buffer binding must be large enough to hold at least one element.
            len: if len > 0 { len } else { 1 },
            _phantom: std::marker::PhantomData,
        }
    }

    /// Creates a new buffer size, or `None` if the buffer would not be
    /// addressable with 32-bit byte offsets.
    pub fn checked(len: u32) -> Option<Self> {
        let size = Self::new(len);
        (size_of::<T>() as u32).checked_mul(size.len)?;
        Some(size)
    }

    /// Returns the number of elements.
    #[expect(clippy::len_without_is_empty, reason = "The buffer can never be empty")]
    pub const fn len(self) -> u32 {
        self.len
    }

    /// Returns the size in bytes.
    pub const fn size_in_bytes(self) -> u32 {
        size_of::<T>() as u32 * self.len
    }
}

impl<T: Sized> PartialEq for BufferSize<T> {
    fn eq(&self, other: &Self) -> bool {
        self.len == other.len
    }
}

/// Computed sizes for all buffers.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct BufferSizes {
    pub config: BufferSize<ConfigUniform>,
    /// Near plane followed by far plane.
    pub planes: BufferSize<f32>,
    pub vertices: BufferSize<f32>,
    pub colors: BufferSize<u32>,
    pub projected: BufferSize<f32>,
    pub triangles: BufferSize<Triangle>,
    pub bin_cursors: BufferSize<u32>,
    pub bin_status: BufferSize<u32>,
    pub bin_queues: BufferSize<u32>,
    pub counters: BufferSize<FrameCounters>,
    pub color: BufferSize<u32>,
    pub depth: BufferSize<f32>,
}

impl BufferSizes {
    /// Returns `None` if any buffer would be larger than `u32::MAX` bytes.
    pub fn new(
        dimension: u32,
        width: u32,
        height: u32,
        bins: &BinLayout,
        vertex_capacity: u32,
        triangle_capacity: u32,
    ) -> Option<Self> {
        let n_bins = bins.width_in_bins.checked_mul(bins.height_in_bins)?;
        let n_pixels = width.checked_mul(height)?;
        let vertex_words = vertex_capacity.checked_mul(dimension)?;
        Some(Self {
            config: BufferSize::new(1),
            planes: BufferSize::checked(dimension.checked_mul(2)?)?,
            vertices: BufferSize::checked(vertex_words)?,
            colors: BufferSize::checked(vertex_capacity)?,
            projected: BufferSize::checked(vertex_words)?,
            triangles: BufferSize::checked(triangle_capacity)?,
            bin_cursors: BufferSize::checked(n_bins)?,
            bin_status: BufferSize::checked(n_bins)?,
            bin_queues: BufferSize::checked(n_bins.checked_mul(bins.queue_size)?)?,
            counters: BufferSize::new(1),
            color: BufferSize::checked(n_pixels)?,
            depth: BufferSize::checked(n_pixels)?,
        })
    }
}
