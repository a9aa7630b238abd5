// Copyright 2026 the Simplex Raster Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Simplex raster tests.

// LINEBENDER LINT SET - lib.rs - v2
// See https://linebender.org/wiki/canonical-lints/
// These lints aren't included in Cargo.toml because they
// shouldn't apply to examples and tests
#![warn(unused_crate_dependencies)]
#![warn(clippy::print_stdout, clippy::print_stderr)]
// Targeting e.g. 32-bit means structs containing usize can give false positives for 64-bit.
#![cfg_attr(target_pointer_width = "64", warn(clippy::trivially_copy_pass_by_ref))]
// END LINEBENDER LINT SET
// The following lints are part of the Linebender standard set,
// but resolving them has been deferred for now.
#![allow(
    missing_debug_implementations,
    unreachable_pub,
    missing_docs,
    clippy::missing_assert_message,
    clippy::print_stdout,
    reason = "Deferred"
)]

use std::env;
use std::fs::File;
use std::io::{BufWriter, ErrorKind};
use std::path::Path;

use anyhow::Result;
use simplex_raster::peniko::color::palette;
use simplex_raster::peniko::Color;
use simplex_raster::{
    DepthCompare, FrameReport, PrimitiveBuffer, PrimitiveType, Renderer, RendererOptions,
};

pub struct TestParams {
    pub name: String,
    pub width: u32,
    pub height: u32,
    pub dimension: u32,
    /// Near planes. Defaults to `-1` on lateral axes and `0` for depth.
    pub near: Option<Vec<f32>>,
    /// Far planes. Defaults to `1` on lateral axes and `2` for depth.
    pub far: Option<Vec<f32>>,
    pub clear_color: Color,
    pub clear_depth: f32,
    pub depth_compare: DepthCompare,
    pub options: RendererOptions,
}

impl TestParams {
    /// With the default planes a point `(x, y, .., w)` lands at NDC
    /// `(x / w, y / w)` with depth `w / 2`.
    pub fn new(name: impl Into<String>, width: u32, height: u32, dimension: u32) -> Self {
        Self {
            name: name.into(),
            width,
            height,
            dimension,
            near: None,
            far: None,
            clear_color: palette::css::BLACK,
            clear_depth: 1.0,
            depth_compare: DepthCompare::Less,
            options: RendererOptions::default(),
        }
    }
}

/// Color and depth attachments of a finished frame.
pub struct Frame {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
    pub depth: Vec<f32>,
    pub report: FrameReport,
}

impl Frame {
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let ix = (y * self.width + x) as usize * 4;
        let mut rgba = [0; 4];
        rgba.copy_from_slice(&self.pixels[ix..ix + 4]);
        rgba
    }

    pub fn depth_at(&self, x: u32, y: u32) -> f32 {
        self.depth[(y * self.width + x) as usize]
    }

    /// Number of pixels with exactly this color.
    pub fn count(&self, color: [u8; 4]) -> usize {
        self.pixels
            .chunks_exact(4)
            .filter(|pixel| *pixel == color)
            .count()
    }
}

pub fn rgba8(color: Color) -> [u8; 4] {
    let rgba = color.to_rgba8();
    [rgba.r, rgba.g, rgba.b, rgba.a]
}

/// A renderer configured from `params`.
pub fn renderer(params: &TestParams) -> Result<Renderer> {
    let mut renderer = Renderer::new(params.options)?;
    renderer.set_render_dimension(params.dimension)?;
    renderer.viewport(params.width, params.height)?;
    let d = params.dimension as usize;
    let near = match &params.near {
        Some(near) => near.clone(),
        None => axis_defaults(d, -1.0, 0.0),
    };
    let far = match &params.far {
        Some(far) => far.clone(),
        None => axis_defaults(d, 1.0, 2.0),
    };
    renderer.set_near_plane(&near)?;
    renderer.set_far_plane(&far)?;
    renderer.set_clear_color(params.clear_color);
    renderer.set_clear_depth(params.clear_depth)?;
    renderer.set_depth_compare(params.depth_compare);
    Ok(renderer)
}

fn axis_defaults(dimension: usize, lateral: f32, depth: f32) -> Vec<f32> {
    let mut planes = vec![lateral; dimension];
    if let Some(last) = planes.last_mut() {
        *last = depth;
    }
    planes
}

/// Reads back both attachments of the last frame.
pub fn read_frame(renderer: &mut Renderer, report: FrameReport) -> Result<Frame> {
    let (width, height) = renderer
        .viewport_size()
        .ok_or_else(|| anyhow::anyhow!("renderer has no viewport"))?;
    let n_pixels = width as usize * height as usize;
    let mut pixels = vec![0; n_pixels * 4];
    let mut depth = vec![0.0; n_pixels];
    renderer.copy_frame_buffer(&mut pixels)?;
    renderer.copy_depth_buffer(&mut depth)?;
    Ok(Frame {
        width,
        height,
        pixels,
        depth,
        report,
    })
}

/// Renders `primitives` with a fresh renderer and reads the frame back.
///
/// If `SIMPLEX_RASTER_DEBUG_TEST` is `all` or the test's name, the color
/// attachment is also written to `debug_outputs/<name>.png`.
pub fn render_then_debug(primitives: &PrimitiveBuffer, params: &TestParams) -> Result<Frame> {
    let mut renderer = renderer(params)?;
    let report = renderer.render(primitives)?;
    let frame = read_frame(&mut renderer, report)?;
    let out_path = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("debug_outputs")
        .join(&params.name)
        .with_extension("png");
    if env_var_relates_to("SIMPLEX_RASTER_DEBUG_TEST", &params.name) {
        write_png_to_file(&out_path, &frame)?;
        println!(
            "Wrote debug result ({}x{}) to {out_path:?}",
            frame.width, frame.height
        );
    } else {
        match std::fs::remove_file(&out_path) {
            Ok(()) => (),
            Err(e) if e.kind() == ErrorKind::NotFound => (),
            Err(e) => return Err(e.into()),
        }
    }
    Ok(frame)
}

fn env_var_relates_to(env_var: &'static str, name: &str) -> bool {
    env::var(env_var).is_ok_and(|value| {
        value.eq_ignore_ascii_case("all")
            || value.split(',').any(|test| test.eq_ignore_ascii_case(name))
    })
}

pub fn write_png_to_file(out_path: &Path, frame: &Frame) -> Result<()> {
    if let Some(dir) = out_path.parent() {
        std::fs::create_dir_all(dir)?;
    }
    let file = File::create(out_path)?;
    let mut encoder = png::Encoder::new(BufWriter::new(file), frame.width, frame.height);
    encoder.set_color(png::ColorType::Rgba);
    encoder.set_depth(png::BitDepth::Eight);
    let mut writer = encoder.write_header()?;
    writer.write_image_data(&frame.pixels)?;
    writer.finish()?;
    Ok(())
}

/// Two triangles covering the NDC rectangle `[x0, x1] × [y0, y1]` at depth
/// coordinate `w`. Axes between `y` and the depth axis are zero.
pub fn push_rect(
    primitives: &mut PrimitiveBuffer,
    [x0, y0, x1, y1]: [f32; 4],
    w: f32,
    color: Color,
) -> Result<()> {
    let corners = [[x0, y0], [x1, y0], [x1, y1], [x0, y1]];
    for [a, b, c] in [[0, 1, 2], [0, 2, 3]] {
        let mut coords = Vec::new();
        for corner in [corners[a], corners[b], corners[c]] {
            coords.extend(point(primitives.dimension(), corner, w));
        }
        primitives.push(&coords, color)?;
    }
    Ok(())
}

/// The homogeneous point that projects to NDC `xy` at depth coordinate `w`
/// under the default planes.
pub fn point(dimension: u32, [x, y]: [f32; 2], w: f32) -> Vec<f32> {
    let mut p = vec![0.0; dimension as usize];
    p[0] = x * w;
    p[1] = y * w;
    if let Some(last) = p.last_mut() {
        *last = w;
    }
    p
}

/// A triangle list of `count` pseudo-random triangles, each drawn at its own
/// constant depth.
pub fn random_triangles(seed: u64, count: u32) -> Result<PrimitiveBuffer> {
    let mut rng = Lcg(seed);
    let mut primitives = PrimitiveBuffer::new(PrimitiveType::Triangles, 3);
    for i in 0..count {
        let w = 0.1 + 1.8 * (i as f32 + 0.5) / count as f32;
        let mut coords = Vec::with_capacity(9);
        for _ in 0..3 {
            coords.extend(point(3, [rng.next_f32() * 2.2 - 1.1, rng.next_f32() * 2.2 - 1.1], w));
        }
        let color = Color::from_rgba8(rng.next_u8(), rng.next_u8(), rng.next_u8(), 255);
        primitives.push(&coords, color)?;
    }
    Ok(primitives)
}

/// Reverses the order of the primitives in `primitives`.
pub fn reversed(primitives: &PrimitiveBuffer) -> Result<PrimitiveBuffer> {
    let n = primitives.vertices_per_primitive() as usize;
    let d = primitives.dimension() as usize;
    let coords: Vec<f32> = primitives
        .coords()
        .chunks_exact(n * d)
        .rev()
        .flatten()
        .copied()
        .collect();
    let colors: Vec<Color> = primitives
        .colors()
        .chunks_exact(n)
        .rev()
        .flatten()
        .map(|&packed| simplex_raster::unpack_color(packed))
        .collect();
    Ok(PrimitiveBuffer::from_raw(
        primitives.kind(),
        primitives.dimension(),
        coords,
        Some(colors.as_slice()),
    )?)
}

/// Small deterministic generator for reproducible scenes.
pub struct Lcg(pub u64);

impl Lcg {
    pub fn next_u32(&mut self) -> u32 {
        self.0 = self
            .0
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        (self.0 >> 33) as u32
    }

    pub fn next_f32(&mut self) -> f32 {
        (self.next_u32() >> 8) as f32 / (1 << 23) as f32
    }

    pub fn next_u8(&mut self) -> u8 {
        (self.next_u32() >> 16) as u8
    }
}
