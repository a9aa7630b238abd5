// Copyright 2026 the Simplex Raster Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Headless

// The following lints are part of the Linebender standard set,
// but resolving them has been deferred for now.
#![allow(clippy::cast_possible_truncation, reason = "Deferred")]

use std::fs::File;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Parser;
use simplex_raster::peniko::color::palette;
use simplex_raster::peniko::Color;
use simplex_raster::{
    DepthCompare, EncodingError, PrimitiveBuffer, PrimitiveType, Renderer, RendererOptions,
};

/// Distance of every scene from the eye along the depth axis.
const SCENE_DEPTH: f32 = 3.5;
const NEAR_DEPTH: f32 = 1.0;
const FAR_DEPTH: f32 = 6.0;

struct ExampleScene {
    name: &'static str,
    dimension: u32,
    /// Builds the scene rotated by the given angle in radians.
    build: fn(f32) -> Result<PrimitiveBuffer, EncodingError>,
}

const SCENES: &[ExampleScene] = &[
    ExampleScene {
        name: "pentachoron",
        dimension: 5,
        build: pentachoron,
    },
    ExampleScene {
        name: "tetrahedra",
        dimension: 4,
        build: tetrahedra,
    },
    ExampleScene {
        name: "tesseract",
        dimension: 5,
        build: tesseract,
    },
    ExampleScene {
        name: "points",
        dimension: 3,
        build: points,
    },
];

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();
    if args.print_scenes {
        println!("Available scenes:");
        for (idx, scene) in SCENES.iter().enumerate() {
            println!("{idx}: {} ({}D)", scene.name, scene.dimension);
        }
        return Ok(());
    }
    let scene = select_scene(&args.scene)?;
    let width = args.x_resolution;
    let height = args.y_resolution;

    let mut renderer = Renderer::new(RendererOptions {
        bin_width: args.bin_size,
        bin_height: args.bin_size,
        bin_queue_size: args.bin_queue_size,
    })?;
    renderer.set_render_dimension(scene.dimension)?;
    renderer.viewport(width, height)?;
    let (near, far) = planes(scene.dimension);
    renderer.set_near_plane(&near)?;
    renderer.set_far_plane(&far)?;
    renderer.set_clear_color(palette::css::MIDNIGHT_BLUE);
    if args.greater {
        renderer.set_depth_compare(DepthCompare::Greater);
        renderer.set_clear_depth(0.0)?;
    }

    let primitives = (scene.build)(args.angle.to_radians())?;
    let report = if args.robust {
        renderer.render_robust(&primitives)?
    } else {
        renderer.render(&primitives)?
    };
    log::info!(
        "{}: {} primitives reduced to {} triangles, {} bin appends",
        scene.name,
        report.n_primitives,
        report.n_triangles,
        report.counters.appends
    );
    for (x, y, required) in report.overflowed_bins() {
        eprintln!("bin ({x}, {y}) overflowed, it needed room for {required} triangles");
    }

    std::fs::create_dir_all(&args.out_directory).with_context(|| {
        format!(
            "Failed to create output directory {}",
            args.out_directory.display()
        )
    })?;
    let mut pixels = vec![0; width as usize * height as usize * 4];
    renderer.copy_frame_buffer(&mut pixels)?;
    let out_path = args.out_directory.join(scene.name).with_extension("png");
    write_png(&out_path, width, height, png::ColorType::Rgba, &pixels)?;
    println!("Wrote result ({width}x{height}) to {out_path:?}");

    if args.depth {
        let mut depth = vec![0.0; width as usize * height as usize];
        renderer.copy_depth_buffer(&mut depth)?;
        let gray: Vec<u8> = depth
            .iter()
            .map(|d| ((1.0 - d.clamp(0.0, 1.0)) * 255.0).round() as u8)
            .collect();
        let out_path = args
            .out_directory
            .join(format!("{}_depth", scene.name))
            .with_extension("png");
        write_png(&out_path, width, height, png::ColorType::Grayscale, &gray)?;
        println!("Wrote depth ({width}x{height}) to {out_path:?}");
    }
    Ok(())
}

fn select_scene(name: &str) -> Result<&'static ExampleScene> {
    if let Some(scene) = SCENES.iter().find(|s| s.name.eq_ignore_ascii_case(name)) {
        return Ok(scene);
    }
    let idx = name.parse::<usize>().context(format!(
        "'{name}' didn't match any scene, trying to parse as index"
    ))?;
    match SCENES.get(idx) {
        Some(scene) => Ok(scene),
        None => bail!("{idx} doesn't fit in scenes (len {})", SCENES.len()),
    }
}

fn write_png(
    path: &Path,
    width: u32,
    height: u32,
    color: png::ColorType,
    data: &[u8],
) -> Result<()> {
    let mut file = File::create(path)?;
    let mut png_encoder = png::Encoder::new(&mut file, width, height);
    png_encoder.set_color(color);
    png_encoder.set_depth(png::BitDepth::Eight);
    let mut writer = png_encoder.write_header()?;
    writer.write_image_data(data)?;
    writer.finish()?;
    Ok(())
}

/// A 90° frustum on every lateral axis.
fn planes(dimension: u32) -> (Vec<f32>, Vec<f32>) {
    let lateral = dimension as usize - 1;
    let mut near = vec![-1.0; lateral];
    let mut far = vec![1.0; lateral];
    near.push(NEAR_DEPTH);
    far.push(FAR_DEPTH);
    (near, far)
}

/// Rotates the lateral coordinates of `p` in the plane of the first and the
/// last lateral axis, then moves it away from the eye.
fn place(mut p: Vec<f32>, angle: f32) -> Vec<f32> {
    let d = p.len();
    let k = d - 2;
    let (sin, cos) = angle.sin_cos();
    let (x, z) = (p[0], p[k]);
    p[0] = x * cos - z * sin;
    p[k] = x * sin + z * cos;
    // The depth axis follows the rotated axis so the scene has visible depth.
    p[d - 1] = SCENE_DEPTH + 0.5 * p[k];
    p
}

/// A regular 4-simplex, one color per vertex.
fn pentachoron(angle: f32) -> Result<PrimitiveBuffer, EncodingError> {
    let s = 1.0 / 5.0_f32.sqrt();
    let vertices = [
        [1.0, 1.0, 1.0, -s],
        [1.0, -1.0, -1.0, -s],
        [-1.0, 1.0, -1.0, -s],
        [-1.0, -1.0, 1.0, -s],
        [0.0, 0.0, 0.0, 4.0 * s],
    ];
    let mut coords = Vec::with_capacity(25);
    for v in vertices {
        let mut p: Vec<f32> = v.iter().map(|c| c * 1.2).collect();
        p.push(0.0);
        coords.extend(place(p, angle));
    }
    let colors = [
        palette::css::RED,
        palette::css::LIME,
        palette::css::BLUE,
        palette::css::YELLOW,
        palette::css::WHITE,
    ];
    let mut primitives = PrimitiveBuffer::new(PrimitiveType::Simplices, 5);
    primitives.push_with_colors(&coords, &colors)?;
    Ok(primitives)
}

/// A ring of tetrahedra in 3-space.
fn tetrahedra(angle: f32) -> Result<PrimitiveBuffer, EncodingError> {
    let mut primitives = PrimitiveBuffer::new(PrimitiveType::Simplices, 4);
    let n = 8;
    for i in 0..n {
        let theta = std::f32::consts::TAU * i as f32 / n as f32;
        let (cy, cx) = (1.6 * theta.sin(), 1.6 * theta.cos());
        let corners = [
            [cx - 0.4, cy - 0.4, -0.4],
            [cx + 0.4, cy - 0.4, 0.4],
            [cx, cy + 0.4, -0.4],
            [cx, cy, 0.5],
        ];
        let mut coords = Vec::with_capacity(16);
        for c in corners {
            coords.extend(place(vec![c[0], c[1], c[2], 0.0], angle + theta));
        }
        let hue = i as f32 / n as f32;
        let color = Color::new([hue, 0.6, 1.0 - hue, 1.0]);
        primitives.push(&coords, color)?;
    }
    Ok(primitives)
}

/// The edges of a 4-cube.
fn tesseract(angle: f32) -> Result<PrimitiveBuffer, EncodingError> {
    let mut primitives = PrimitiveBuffer::new(PrimitiveType::Lines, 5);
    let corner = |bits: u32| -> Vec<f32> {
        let mut p: Vec<f32> = (0..4)
            .map(|axis| if bits & (1 << axis) != 0 { 0.9 } else { -0.9 })
            .collect();
        p.push(0.0);
        place(p, angle)
    };
    for a in 0..16_u32 {
        for axis in 0..4 {
            let b = a | (1 << axis);
            if a == b {
                continue;
            }
            let mut coords = corner(a);
            coords.extend(corner(b));
            let color = if axis == 3 {
                palette::css::ORANGE
            } else {
                palette::css::AQUA
            };
            primitives.push(&coords, color)?;
        }
    }
    Ok(primitives)
}

/// A square grid of points.
fn points(angle: f32) -> Result<PrimitiveBuffer, EncodingError> {
    let mut primitives = PrimitiveBuffer::new(PrimitiveType::Points, 3);
    let n = 24;
    for i in 0..n {
        for j in 0..n {
            let x = 3.0 * (i as f32 / (n - 1) as f32 - 0.5);
            let y = 3.0 * (j as f32 / (n - 1) as f32 - 0.5);
            primitives.push(&place(vec![x, y, 0.0], angle), palette::css::WHITE)?;
        }
    }
    Ok(primitives)
}

#[derive(Parser, Debug)]
#[command(about, long_about = None, bin_name = "cargo run -p headless --")]
struct Args {
    #[arg(long, short, default_value_t = 512)]
    x_resolution: u32,
    #[arg(long, short, default_value_t = 512)]
    y_resolution: u32,
    /// Which scene (name) to render
    /// If no scenes have that name, an index can be specified instead
    #[arg(long, short, default_value = "0")]
    scene: String,
    /// Rotation of the scene in degrees
    #[arg(long, short, default_value_t = 30.0)]
    angle: f32,
    /// Directory to store the result into
    #[arg(long, default_value_os_t = default_directory())]
    out_directory: PathBuf,
    /// Display a list of all scene names
    #[arg(long, short)]
    print_scenes: bool,
    /// Width and height of a bin in pixels
    #[arg(long, default_value_t = 16)]
    bin_size: u32,
    /// Number of triangles every bin can hold
    #[arg(long, default_value_t = 256)]
    bin_queue_size: u32,
    /// Grow the bin queues and render again if any of them overflows
    #[arg(long)]
    robust: bool,
    /// Keep the farthest fragment instead of the nearest
    #[arg(long)]
    greater: bool,
    /// Also write the depth attachment as a grayscale image
    #[arg(long)]
    depth: bool,
}

fn default_directory() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("outputs")
}
