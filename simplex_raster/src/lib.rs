// Copyright 2026 the Simplex Raster Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! A data-parallel, tile-based rasterizer for n-dimensional simplices.
//!
//! Points, lines, triangles and higher simplices of any render dimension from
//! 3 to 8 are projected to normalized device coordinates with per-axis near
//! and far planes, reduced to triangles, sorted into fixed-size screen bins,
//! and resolved per pixel with a depth test. The last coordinate of every
//! point is its depth.
//!
//! The pipeline is written as a sequence of compute dispatches over flat
//! buffers. [`Renderer`] records a frame and runs it on the built-in CPU
//! engine, where every stage is parallelized with rayon.
//!
//! ```
//! use simplex_raster::peniko::color::palette;
//! use simplex_raster::{PrimitiveBuffer, PrimitiveType, Renderer, RendererOptions};
//!
//! let mut renderer = Renderer::new(RendererOptions::default())?;
//! renderer.set_render_dimension(4)?;
//! renderer.viewport(64, 64)?;
//! renderer.set_near_plane(&[-1.0, -1.0, -1.0, 0.5])?;
//! renderer.set_far_plane(&[1.0, 1.0, 1.0, 10.0])?;
//!
//! let mut tetrahedra = PrimitiveBuffer::new(PrimitiveType::Simplices, 4);
//! tetrahedra.push(
//!     &[
//!         -0.5, -0.5, 0.0, 2.0, //
//!         0.5, -0.5, 0.0, 2.0, //
//!         0.0, 0.5, 0.5, 3.0, //
//!         0.0, 0.0, -0.5, 4.0,
//!     ],
//!     palette::css::ORANGE,
//! )?;
//! let report = renderer.render(&tetrahedra)?;
//! assert!(report.is_complete());
//!
//! let mut pixels = vec![0_u8; 64 * 64 * 4];
//! renderer.copy_frame_buffer(&mut pixels)?;
//! # Ok::<(), simplex_raster::Error>(())
//! ```
//!
//! A bin receiving more triangles than its queue holds does not fail the
//! frame. The returned [`FrameReport`] flags it, and
//! [`Renderer::render_robust`] grows the queues and renders again.

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
    missing_debug_implementations,
    clippy::cast_possible_truncation,
    clippy::missing_assert_message,
    reason = "Deferred"
)]

mod cpu_engine;
mod recording;
mod render;
mod report;
mod shaders;

pub mod low_level {
    //! Utilities which can be used to drive the pipeline without [`Renderer`][crate::Renderer].
    //!
    //! These APIs have not been carefully designed, and might not be powerful enough for this use case.

    pub use crate::cpu_engine::CpuEngine;
    pub use crate::recording::{BufferProxy, Command, Recording, ResourceId, ShaderId};
    pub use crate::render::{render_frame, PipelineBuffers};
    pub use crate::shaders::FullShaders;
    pub use simplex_raster_encoding::{ConfigUniform, FrameParams, RenderConfig};
}

/// Color types.
pub use peniko;

pub use report::FrameReport;
pub use simplex_raster_encoding::{
    pack_color, unpack_color, BinStatus, ClipPlanes, DepthCompare, EncodingError, FrameCounters,
    PipelineConfig, PrimitiveBuffer, PrimitiveType, MAX_DIMENSION, MIN_DIMENSION,
};

use cpu_engine::CpuEngine;
use peniko::color::palette;
use peniko::Color;
use recording::{BufferProxy, Recording};
use render::PipelineBuffers;
use shaders::FullShaders;
use simplex_raster_encoding::{
    triangles_per_primitive, BinLayout, FrameParams, DEFAULT_BIN_HEIGHT,
    DEFAULT_BIN_QUEUE_SIZE, DEFAULT_BIN_WIDTH,
};
use thiserror::Error;

/// Errors that can occur in the rasterizer.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// Render dimensions outside `MIN_DIMENSION..=MAX_DIMENSION` have no kernels.
    #[error("Render dimension {0} is not supported, it must be between 3 and 8")]
    InvalidDimension(u32),
    #[error("Primitives have dimension {got} but the renderer is configured for {expected}")]
    PrimitiveDimensionMismatch { expected: u32, got: u32 },
    #[error("Viewport {width}x{height} has no pixels")]
    EmptyViewport { width: u32, height: u32 },
    #[error("Viewport {width}x{height} is too large")]
    ViewportTooLarge { width: u32, height: u32 },
    #[error("Bin size {width}x{height} is invalid")]
    InvalidBinSize { width: u32, height: u32 },
    /// The bin queue size is zero, or the queues of all bins would not fit
    /// in one buffer.
    #[error("Bin queue size {0} is invalid")]
    InvalidQueueSize(u32),
    /// Some pipeline buffer for this many vertices or triangles would be
    /// larger than `u32::MAX` bytes.
    #[error("Capacity for {vertices} vertices and {triangles} triangles is too large")]
    CapacityTooLarge { vertices: u64, triangles: u64 },
    #[error("Clear depth {0} is not finite")]
    NonFiniteClearDepth(f32),
    /// An operation needs a render dimension and a viewport first.
    #[error("`{0}` needs a render dimension and a viewport")]
    NotConfigured(&'static str),
    #[error("Readback target holds {got} elements, but the frame has {expected}")]
    ReadbackSizeMismatch { expected: usize, got: usize },
    /// No frame has completed since the last configuration change.
    #[error("No frame has been rendered")]
    NoFrame,
    #[error(transparent)]
    Encoding(#[from] EncodingError),

    /// Used a buffer inside a recording while it was not available.
    /// Check if you have created it and not freed before its last usage.
    #[error("Buffer '{0}' is not available but used for {1}")]
    UnavailableBufferUsed(&'static str, &'static str),
    #[error("No shader is registered with id {0}")]
    UnknownShader(usize),
    #[error("Shader '{shader}' takes {expected} bindings, got {got}")]
    BindingCountMismatch {
        shader: &'static str,
        expected: usize,
        got: usize,
    },
    #[error("Buffer '{buffer}' is bound more than once to shader '{shader}'")]
    AliasedBinding {
        shader: &'static str,
        buffer: &'static str,
    },
    #[error("Upload of {size} bytes does not fit buffer '{name}' of {capacity} bytes")]
    UploadSizeMismatch {
        name: &'static str,
        size: u64,
        capacity: u64,
    },
    /// A recording was rejected before anything ran. `stage` is the kernel
    /// or command kind of the first failing command.
    #[error("{label}: command {index} ({stage}) failed")]
    StageFailed {
        label: &'static str,
        index: usize,
        stage: &'static str,
        source: Box<Error>,
    },
}

pub(crate) type Result<T, E = Error> = std::result::Result<T, E>;

/// Static options of a [`Renderer`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RendererOptions {
    /// Width of a bin in pixels.
    pub bin_width: u32,
    /// Height of a bin in pixels.
    pub bin_height: u32,
    /// Number of triangles every bin queue can hold.
    pub bin_queue_size: u32,
}

impl Default for RendererOptions {
    fn default() -> Self {
        Self {
            bin_width: DEFAULT_BIN_WIDTH,
            bin_height: DEFAULT_BIN_HEIGHT,
            bin_queue_size: DEFAULT_BIN_QUEUE_SIZE,
        }
    }
}

/// Lifecycle of a [`Renderer`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PipelineState {
    /// The render dimension or the viewport is not set yet.
    Uninitialized,
    /// A new [`PipelineConfig`] is in place. Its buffers are allocated by
    /// the next frame and there is nothing to read back.
    Configured,
    /// The last frame completed and can be read back.
    Ready,
    /// A frame is being recorded or executed.
    Rendering,
}

struct Pipeline {
    config: PipelineConfig,
    buffers: PipelineBuffers,
}

/// Renders primitive buffers into a color and depth framebuffer.
pub struct Renderer {
    options: RendererOptions,
    engine: CpuEngine,
    shaders: Option<FullShaders>,
    dimension: Option<u32>,
    viewport: Option<(u32, u32)>,
    planes: Option<ClipPlanes>,
    clear_color: Color,
    clear_depth: f32,
    depth_compare: DepthCompare,
    pipeline: Option<Pipeline>,
    state: PipelineState,
    last_report: Option<FrameReport>,
}

static_assertions::assert_impl_all!(Renderer: Send);

impl Renderer {
    /// Creates a new renderer. It has to be given a render dimension and a
    /// viewport before it can render.
    pub fn new(options: RendererOptions) -> Result<Self> {
        if options.bin_width == 0 || options.bin_height == 0 {
            return Err(Error::InvalidBinSize {
                width: options.bin_width,
                height: options.bin_height,
            });
        }
        if options.bin_queue_size == 0 {
            return Err(Error::InvalidQueueSize(options.bin_queue_size));
        }
        Ok(Self {
            options,
            engine: CpuEngine::new(),
            shaders: None,
            dimension: None,
            viewport: None,
            planes: None,
            clear_color: palette::css::BLACK,
            clear_depth: 1.0,
            depth_compare: DepthCompare::default(),
            pipeline: None,
            state: PipelineState::Uninitialized,
            last_report: None,
        })
    }

    /// Sets the number of components of every point.
    ///
    /// Changing the dimension registers the kernels for it and resets the
    /// clip planes to [`ClipPlanes::new`].
    pub fn set_render_dimension(&mut self, dimension: u32) -> Result<()> {
        if !(MIN_DIMENSION..=MAX_DIMENSION).contains(&dimension) {
            return Err(Error::InvalidDimension(dimension));
        }
        if self.dimension == Some(dimension) {
            return Ok(());
        }
        self.shaders = Some(shaders::full_shaders(&mut self.engine, dimension)?);
        self.dimension = Some(dimension);
        self.planes = Some(ClipPlanes::new(dimension));
        self.configure(0, 0)
    }

    /// Sets the size of the framebuffer in pixels.
    pub fn viewport(&mut self, width: u32, height: u32) -> Result<()> {
        if width == 0 || height == 0 {
            return Err(Error::EmptyViewport { width, height });
        }
        if width
            .checked_mul(height)
            .and_then(|n| n.checked_mul(4))
            .is_none()
        {
            return Err(Error::ViewportTooLarge { width, height });
        }
        if self.viewport == Some((width, height)) {
            return Ok(());
        }
        self.viewport = Some((width, height));
        let (vertices, triangles) = self.capacity();
        self.configure(vertices, triangles)
    }

    /// Sets the capacity of every bin queue.
    pub fn set_bin_queue_size(&mut self, bin_queue_size: u32) -> Result<()> {
        if bin_queue_size == 0 {
            return Err(Error::InvalidQueueSize(bin_queue_size));
        }
        if self.options.bin_queue_size == bin_queue_size {
            return Ok(());
        }
        let previous = self.options.bin_queue_size;
        self.options.bin_queue_size = bin_queue_size;
        let (vertices, triangles) = self.capacity();
        self.configure(vertices, triangles).inspect_err(|_| {
            self.options.bin_queue_size = previous;
        })
    }

    /// Sets the near bound of every axis. Takes effect on the next frame.
    pub fn set_near_plane(&mut self, near: &[f32]) -> Result<()> {
        let planes = self
            .planes
            .as_mut()
            .ok_or(Error::NotConfigured("set_near_plane"))?;
        planes.set_near(near)?;
        Ok(())
    }

    /// Sets the far bound of every axis. Takes effect on the next frame.
    pub fn set_far_plane(&mut self, far: &[f32]) -> Result<()> {
        let planes = self
            .planes
            .as_mut()
            .ok_or(Error::NotConfigured("set_far_plane"))?;
        planes.set_far(far)?;
        Ok(())
    }

    pub fn set_clear_color(&mut self, color: Color) {
        self.clear_color = color;
    }

    pub fn set_clear_depth(&mut self, depth: f32) -> Result<()> {
        if !depth.is_finite() {
            return Err(Error::NonFiniteClearDepth(depth));
        }
        self.clear_depth = depth;
        Ok(())
    }

    pub fn set_depth_compare(&mut self, compare: DepthCompare) {
        self.depth_compare = compare;
    }

    /// Renders one frame.
    ///
    /// The framebuffer is cleared, then every primitive is projected, reduced
    /// to triangles, binned and resolved. Buffers are reallocated first if the
    /// primitives do not fit the current configuration.
    ///
    /// On error nothing is executed and the previous frame stays readable.
    pub fn render(&mut self, primitives: &PrimitiveBuffer) -> Result<FrameReport> {
        let (Some(dimension), Some(shaders)) = (self.dimension, self.shaders) else {
            return Err(Error::NotConfigured("render"));
        };
        if primitives.dimension() != dimension {
            return Err(Error::PrimitiveDimensionMismatch {
                expected: dimension,
                got: primitives.dimension(),
            });
        }
        let planes = self.planes.as_ref().ok_or(Error::NotConfigured("render"))?;
        planes.validate()?;
        let planes = planes.to_buffer();

        let vertices_per_primitive = primitives.vertices_per_primitive();
        let n_primitives = primitives.len();
        let n_vertices = primitives.n_vertices();
        let triangle_count =
            u64::from(n_primitives) * u64::from(triangles_per_primitive(vertices_per_primitive));
        let fits = match &self.pipeline {
            Some(pipeline) => u32::try_from(triangle_count)
                .is_ok_and(|n_triangles| pipeline.config.fits(n_vertices, n_triangles)),
            None => return Err(Error::NotConfigured("render")),
        };
        if !fits {
            let (vertices, triangles) = grown_capacity(n_vertices, triangle_count)?;
            let (vertex_capacity, triangle_capacity) = self.capacity();
            self.configure(vertex_capacity.max(vertices), triangle_capacity.max(triangles))?;
        }
        let Some(pipeline) = &self.pipeline else {
            return Err(Error::NotConfigured("render"));
        };

        let frame = FrameParams {
            n_primitives,
            vertices_per_primitive,
            clear_color: pack_color(self.clear_color),
            clear_depth: self.clear_depth,
            depth_compare: self.depth_compare,
        };
        let render_config = pipeline.config.render_config(&frame);
        let mut recording = Recording::default();
        render::render_frame(
            &mut recording,
            &shaders,
            &pipeline.buffers,
            &render_config,
            &planes,
            primitives,
        );

        let previous = self.state;
        self.state = PipelineState::Rendering;
        if let Err(e) = self.engine.run_recording(&recording, "frame") {
            log::error!("frame aborted: {e}");
            self.state = previous;
            return Err(e);
        }
        let report = frame_report(&mut self.engine, &pipeline.config, &pipeline.buffers, &frame);
        self.state = PipelineState::Ready;
        let report = report?;
        log::debug!(
            "frame: {} primitives, {} triangles, {} bin appends",
            report.n_primitives,
            report.n_triangles,
            report.counters.appends
        );
        if !report.is_complete() {
            log::warn!(
                "{} bins overflowed, queue size {} needed but {} available",
                report.counters.overflowed_bins,
                report.required_queue_size(),
                report.bin_queue_size
            );
        }
        self.last_report = Some(report.clone());
        Ok(report)
    }

    /// Renders one frame, and if a bin queue overflowed, grows the queues to
    /// the next power of two that holds every bin and renders once more.
    pub fn render_robust(&mut self, primitives: &PrimitiveBuffer) -> Result<FrameReport> {
        let report = self.render(primitives)?;
        if report.is_complete() {
            return Ok(report);
        }
        let required = report.required_queue_size();
        let bin_queue_size = required
            .checked_next_power_of_two()
            .ok_or(Error::InvalidQueueSize(required))?;
        log::info!("re-rendering with bin queue size {bin_queue_size}");
        self.set_bin_queue_size(bin_queue_size)?;
        self.render(primitives)
    }

    /// Copies the color attachment of the last frame as RGBA8, row-major.
    ///
    /// `out` must hold exactly `width * height * 4` bytes.
    pub fn copy_frame_buffer(&mut self, out: &mut [u8]) -> Result<()> {
        let (color, n_pixels) = self.readback_target("copy_frame_buffer")?;
        let expected = n_pixels * 4;
        if out.len() != expected {
            return Err(Error::ReadbackSizeMismatch {
                expected,
                got: out.len(),
            });
        }
        self.read_back(color, |words| {
            out.copy_from_slice(&bytemuck::cast_slice::<u32, u8>(words)[..expected]);
        })
    }

    /// Copies the depth attachment of the last frame, row-major.
    ///
    /// `out` must hold exactly `width * height` values.
    pub fn copy_depth_buffer(&mut self, out: &mut [f32]) -> Result<()> {
        let (_, n_pixels) = self.readback_target("copy_depth_buffer")?;
        let depth = self
            .pipeline
            .as_ref()
            .map(|p| p.buffers.depth)
            .ok_or(Error::NotConfigured("copy_depth_buffer"))?;
        if out.len() != n_pixels {
            return Err(Error::ReadbackSizeMismatch {
                expected: n_pixels,
                got: out.len(),
            });
        }
        self.read_back(depth, |words| {
            out.copy_from_slice(&bytemuck::cast_slice::<u32, f32>(words)[..n_pixels]);
        })
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    /// The active configuration, if the renderer has a dimension and a
    /// viewport.
    pub fn config(&self) -> Option<&PipelineConfig> {
        self.pipeline.as_ref().map(|p| &p.config)
    }

    /// Report of the last completed frame of the active configuration.
    pub fn last_report(&self) -> Option<&FrameReport> {
        self.last_report.as_ref()
    }

    pub fn dimension(&self) -> Option<u32> {
        self.dimension
    }

    pub fn viewport_size(&self) -> Option<(u32, u32)> {
        self.viewport
    }

    pub fn clip_planes(&self) -> Option<&ClipPlanes> {
        self.planes.as_ref()
    }

    pub fn options(&self) -> &RendererOptions {
        &self.options
    }

    /// Current vertex and triangle capacity.
    fn capacity(&self) -> (u32, u32) {
        self.pipeline.as_ref().map_or((0, 0), |p| {
            (p.config.vertex_capacity, p.config.triangle_capacity)
        })
    }

    /// Builds a new [`PipelineConfig`] and swaps it in, freeing the buffers
    /// of the previous one.
    fn configure(&mut self, vertex_capacity: u32, triangle_capacity: u32) -> Result<()> {
        let (Some(dimension), Some((width, height))) = (self.dimension, self.viewport) else {
            self.state = PipelineState::Uninitialized;
            return Ok(());
        };
        let options = &self.options;
        let bins = BinLayout::new(
            width,
            height,
            options.bin_width,
            options.bin_height,
            options.bin_queue_size,
        );
        if bins
            .n_bins()
            .checked_mul(bins.queue_size)
            .and_then(|n| n.checked_mul(4))
            .is_none()
        {
            return Err(Error::InvalidQueueSize(bins.queue_size));
        }
        let config = PipelineConfig::new(
            dimension,
            width,
            height,
            bins,
            vertex_capacity,
            triangle_capacity,
        )
        .ok_or(Error::CapacityTooLarge {
            vertices: vertex_capacity.into(),
            triangles: triangle_capacity.into(),
        })?;
        let buffers = PipelineBuffers::new(&config.buffer_sizes);
        if let Some(old) = self.pipeline.take() {
            let mut recording = Recording::default();
            old.buffers.release(&mut recording);
            self.engine.run_recording(&recording, "release")?;
        }
        log::debug!(
            "configured dimension {dimension}, {width}x{height} pixels in {}x{} bins of {} \
             triangles, capacity {vertex_capacity} vertices / {triangle_capacity} triangles",
            bins.width_in_bins,
            bins.height_in_bins,
            bins.queue_size,
        );
        self.pipeline = Some(Pipeline { config, buffers });
        self.state = PipelineState::Configured;
        self.last_report = None;
        Ok(())
    }

    /// Returns the buffer to read back and the pixel count, if a frame is
    /// available.
    fn readback_target(&self, operation: &'static str) -> Result<(BufferProxy, usize)> {
        let pipeline = self
            .pipeline
            .as_ref()
            .ok_or(Error::NotConfigured(operation))?;
        if self.last_report.is_none() || self.state != PipelineState::Ready {
            return Err(Error::NoFrame);
        }
        let n_pixels = pipeline.config.width as usize * pipeline.config.height as usize;
        Ok((pipeline.buffers.color, n_pixels))
    }

    fn read_back(&mut self, buf: BufferProxy, read: impl FnOnce(&[u32])) -> Result<()> {
        let mut recording = Recording::default();
        recording.download(buf);
        self.engine.run_recording(&recording, "readback")?;
        let words = self
            .engine
            .get_download(buf)
            .ok_or(Error::UnavailableBufferUsed(buf.name, "readback"))?;
        read(words);
        self.engine.free_download(buf);
        Ok(())
    }
}

/// Vertex and triangle capacity for a frame of this size, rounded up to
/// powers of two.
fn grown_capacity(n_vertices: u32, n_triangles: u64) -> Result<(u32, u32)> {
    let too_large = Error::CapacityTooLarge {
        vertices: n_vertices.into(),
        triangles: n_triangles,
    };
    let vertices = n_vertices.checked_next_power_of_two();
    let triangles = u32::try_from(n_triangles)
        .ok()
        .and_then(u32::checked_next_power_of_two);
    vertices.zip(triangles).ok_or(too_large)
}

/// Collects the binning results of the frame that just ran.
fn frame_report(
    engine: &mut CpuEngine,
    config: &PipelineConfig,
    buffers: &PipelineBuffers,
    frame: &FrameParams,
) -> Result<FrameReport> {
    let counters = engine
        .get_download(buffers.counters)
        .and_then(|words| bytemuck::try_cast_slice::<u32, FrameCounters>(words).ok())
        .and_then(|counters| counters.first().copied())
        .ok_or(Error::UnavailableBufferUsed(buffers.counters.name, "report"))?;
    let cursors = engine
        .get_download(buffers.bin_cursors)
        .ok_or(Error::UnavailableBufferUsed(buffers.bin_cursors.name, "report"))?;
    let status = engine
        .get_download(buffers.bin_status)
        .ok_or(Error::UnavailableBufferUsed(buffers.bin_status.name, "report"))?;
    let bins = status
        .iter()
        .zip(cursors)
        .take(config.bins.n_bins() as usize)
        .map(|(&status, &cursor)| BinStatus::from_raw(status, cursor))
        .collect();
    for buf in [buffers.counters, buffers.bin_cursors, buffers.bin_status] {
        engine.free_download(buf);
    }
    let render_config = config.render_config(frame);
    Ok(FrameReport {
        counters,
        bins,
        width_in_bins: config.bins.width_in_bins,
        n_primitives: frame.n_primitives,
        n_triangles: render_config.gpu.n_triangles,
        bin_queue_size: config.bins.queue_size,
    })
}
