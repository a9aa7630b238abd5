// Copyright 2026 the Simplex Raster Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-bin coverage, depth resolution and color writes.

use rayon::prelude::*;
use simplex_raster_encoding::{ConfigUniform, DepthCompare, Triangle, WorkgroupSize, NO_OWNER};

use super::util::{pack4x8unorm, screen_bbox, screen_points, unpack4x8unorm, Vec2};
use super::CpuBinding;

/// The rows of the framebuffer covered by one row of bins.
struct Strip<'a> {
    color: &'a mut [u32],
    depth: &'a mut [f32],
    /// Index of the triangle that last wrote each pixel.
    owner: Vec<u32>,
    width: usize,
    /// First framebuffer row of the strip.
    y0: usize,
}

/// Pixel rectangle of a bin, clipped to the target, in framebuffer
/// coordinates.
#[derive(Clone, Copy)]
struct BinRect {
    x0: usize,
    x1: usize,
    y0: usize,
    y1: usize,
}

/// Barycentric weights of the pixel center `p`, or `None` if the pixel is not
/// covered.
///
/// Regular triangles cover pixel centers inside or on their edges, regardless
/// of winding; a triangle without area covers nothing. Thin triangles cover
/// the pixels whose half-open square contains the point of the segment from
/// the first to the last vertex closest to the pixel center.
fn coverage(points: &[Vec2; 3], thin: bool, p: Vec2) -> Option<[f32; 3]> {
    let [a, b, c] = *points;
    if thin {
        let d = c - a;
        let len2 = d.length_squared();
        let t = if len2 > 0.0 {
            ((p - a).dot(d) / len2).clamp(0.0, 1.0)
        } else {
            0.0
        };
        let off = a + d * t - p;
        let inside = |v: f32| (-0.5..0.5).contains(&v);
        return (inside(off.x) && inside(off.y)).then_some([1.0 - t, 0.0, t]);
    }
    let area = (b - a).cross(c - a);
    if area == 0.0 || !area.is_finite() {
        return None;
    }
    let w0 = (c - b).cross(p - b) / area;
    let w1 = (a - c).cross(p - c) / area;
    let w2 = (b - a).cross(p - a) / area;
    (w0 >= 0.0 && w1 >= 0.0 && w2 >= 0.0).then_some([w0, w1, w2])
}

fn interpolate_color(colors: [u32; 3], weights: [f32; 3]) -> u32 {
    let mut rgba = [0.0; 4];
    for (packed, w) in colors.into_iter().zip(weights) {
        for (channel, v) in rgba.iter_mut().zip(unpack4x8unorm(packed)) {
            *channel += w * v;
        }
    }
    pack4x8unorm(rgba)
}

fn rasterize(
    config: &ConfigUniform,
    compare: DepthCompare,
    tri: &Triangle,
    tri_ix: u32,
    rect: BinRect,
    strip: &mut Strip<'_>,
) {
    if tri.is_culled() {
        return;
    }
    let points = screen_points(tri, config);
    let thin = tri.is_thin();
    let bbox = screen_bbox(&points, thin);
    let clip = |v: f32, lo: usize, hi: usize| (v.max(0.0) as usize).clamp(lo, hi);
    let x0 = clip(bbox[0].floor(), rect.x0, rect.x1);
    let x1 = clip(bbox[2].ceil(), rect.x0, rect.x1);
    let y0 = clip(bbox[1].floor(), rect.y0, rect.y1);
    let y1 = clip(bbox[3].ceil(), rect.y0, rect.y1);
    let depths = tri.depths();
    let min_depth = depths[0].min(depths[1]).min(depths[2]);
    let max_depth = depths[0].max(depths[1]).max(depths[2]);
    for y in y0..y1 {
        let row = (y - strip.y0) * strip.width;
        for x in x0..x1 {
            let ix = row + x;
            let current = strip.depth[ix];
            if !compare.may_replace(tri.key, current) {
                continue;
            }
            let center = Vec2::new(x as f32 + 0.5, y as f32 + 0.5);
            let Some(weights) = coverage(&points, thin, center) else {
                continue;
            };
            let depth = (weights[0] * depths[0] + weights[1] * depths[1] + weights[2] * depths[2])
                .clamp(min_depth, max_depth);
            if !(0.0..=1.0).contains(&depth) {
                continue;
            }
            if compare.replaces(depth, tri_ix, current, strip.owner[ix]) {
                strip.depth[ix] = depth;
                strip.owner[ix] = tri_ix;
                strip.color[ix] = interpolate_color(tri.colors, weights);
            }
        }
    }
}

/// Resolves every bin against the triangles recorded in its queue.
///
/// Each row of bins is processed as one task and owns the matching rows of
/// the framebuffer. A pixel ends up with the fragment that is best under the
/// depth comparison, ties going to the lowest triangle index, so the result
/// does not depend on queue order.
pub fn fine_main(
    n_wg: WorkgroupSize,
    config: &ConfigUniform,
    triangles: &[Triangle],
    bin_cursors: &[u32],
    bin_queues: &[u32],
    color: &mut [u32],
    depth: &mut [f32],
) {
    let width = config.target_width as usize;
    let height = config.target_height as usize;
    let bin_width = config.bin_width as usize;
    let bin_height = config.bin_height as usize;
    let strip_len = width * bin_height;
    if strip_len == 0 {
        return;
    }
    let n_pixels = width * height;
    let width_in_bins = n_wg.0.min(config.width_in_bins);
    let height_in_bins = n_wg.1.min(config.height_in_bins) as usize;
    let queue_size = config.bin_queue_size as usize;
    let compare = config.depth_compare();
    color[..n_pixels]
        .par_chunks_mut(strip_len)
        .zip(depth[..n_pixels].par_chunks_mut(strip_len))
        .enumerate()
        .filter(|(bin_y, _)| *bin_y < height_in_bins)
        .for_each(|(bin_y, (color, depth))| {
            let rows = color.len() / width;
            let mut strip = Strip {
                owner: vec![NO_OWNER; color.len()],
                color,
                depth,
                width,
                y0: bin_y * bin_height,
            };
            for bin_x in 0..width_in_bins {
                let bin_ix = bin_y * config.width_in_bins as usize + bin_x as usize;
                let count = (bin_cursors[bin_ix] as usize).min(queue_size);
                let queue = &bin_queues[bin_ix * queue_size..][..count];
                let x0 = bin_x as usize * bin_width;
                let rect = BinRect {
                    x0,
                    x1: (x0 + bin_width).min(width),
                    y0: strip.y0,
                    y1: strip.y0 + rows,
                };
                for &tri_ix in queue {
                    let tri = &triangles[tri_ix as usize];
                    rasterize(config, compare, tri, tri_ix, rect, &mut strip);
                }
            }
        });
}

pub fn fine(n_wg: WorkgroupSize, resources: &[CpuBinding<'_>]) {
    let config = resources[0].as_typed();
    let triangles = resources[1].as_slice();
    let bin_cursors = resources[2].as_slice();
    let bin_queues = resources[3].as_slice();
    let mut color = resources[4].as_slice_mut();
    let mut depth = resources[5].as_slice_mut();
    fine_main(
        n_wg,
        &config,
        &triangles,
        &bin_cursors,
        &bin_queues,
        &mut color,
        &mut depth,
    );
}

#[cfg(test)]
mod tests {
    use super::super::binning::bin_range;
    use super::*;

    const RED: u32 = 0xff00_00ff;
    const GREEN: u32 = 0xff00_ff00;
    const BLUE: u32 = 0xffff_0000;
    const WHITE: u32 = 0xffff_ffff;
    const CLEAR: u32 = 0xff00_0000;

    /// 32x32 target in 16x16 bins.
    fn config(compare: DepthCompare, clear_depth: f32) -> ConfigUniform {
        ConfigUniform {
            target_width: 32,
            target_height: 32,
            bin_width: 16,
            bin_height: 16,
            width_in_bins: 2,
            height_in_bins: 2,
            bin_queue_size: 8,
            clear_color: CLEAR,
            clear_depth,
            depth_compare: compare as u32,
            ..Default::default()
        }
    }

    /// Triangle with pixel space vertices, a uniform depth and a solid color.
    fn tri(points: [(f32, f32); 3], depth: f32, color: u32, compare: DepthCompare) -> Triangle {
        let ndc = |(x, y): (f32, f32)| [x / 16.0 - 1.0, 1.0 - y / 16.0, depth];
        Triangle {
            points: points.map(ndc),
            colors: [color; 3],
            key: compare.best_of([depth; 3]),
            flags: 0,
        }
    }

    fn screen_filling(depth: f32, color: u32) -> Triangle {
        tri(
            [(-10.0, -10.0), (100.0, -10.0), (-10.0, 100.0)],
            depth,
            color,
            DepthCompare::Less,
        )
    }

    struct Target {
        color: Vec<u32>,
        depth: Vec<f32>,
    }

    /// Bins `order` (indices into `triangles`) in the given order, then
    /// resolves the frame.
    fn render(config: &ConfigUniform, triangles: &[Triangle], order: &[u32]) -> Target {
        let n_bins = config.n_bins() as usize;
        let queue_size = config.bin_queue_size as usize;
        let mut cursors = vec![0_u32; n_bins];
        let mut queues = vec![0_u32; n_bins * queue_size];
        for &ix in order {
            let Some([x0, y0, x1, y1]) = bin_range(config, &triangles[ix as usize]) else {
                continue;
            };
            for bin_y in y0..y1 {
                for bin_x in x0..x1 {
                    let bin = (bin_y * config.width_in_bins + bin_x) as usize;
                    queues[bin * queue_size + cursors[bin] as usize] = ix;
                    cursors[bin] += 1;
                }
            }
        }
        resolve(config, triangles, &cursors, &queues)
    }

    fn resolve(
        config: &ConfigUniform,
        triangles: &[Triangle],
        cursors: &[u32],
        queues: &[u32],
    ) -> Target {
        let n_pixels = config.n_pixels() as usize;
        let mut target = Target {
            color: vec![config.clear_color; n_pixels],
            depth: vec![config.clear_depth; n_pixels],
        };
        fine_main(
            (config.width_in_bins, config.height_in_bins, 1),
            config,
            triangles,
            cursors,
            queues,
            &mut target.color,
            &mut target.depth,
        );
        target
    }

    fn pixel(target: &Target, x: usize, y: usize) -> u32 {
        target.color[y * 32 + x]
    }

    #[test]
    fn covers_pixel_centers_inside() {
        let config = config(DepthCompare::Less, 1.0);
        let tris = [tri(
            [(0.0, 0.0), (32.0, 0.0), (0.0, 32.0)],
            0.5,
            RED,
            DepthCompare::Less,
        )];
        let target = render(&config, &tris, &[0]);
        assert_eq!(pixel(&target, 0, 0), RED);
        assert_eq!(pixel(&target, 15, 15), RED);
        assert_eq!(pixel(&target, 16, 15), RED, "edges are inclusive");
        assert_eq!(pixel(&target, 16, 16), CLEAR);
        assert_eq!(pixel(&target, 31, 31), CLEAR);
        assert_eq!(target.depth[0], 0.5);
        assert_eq!(target.depth[31 * 32 + 31], 1.0);
    }

    #[test]
    fn winding_does_not_matter() {
        let config = config(DepthCompare::Less, 1.0);
        let ccw = [tri(
            [(0.0, 0.0), (32.0, 0.0), (0.0, 32.0)],
            0.5,
            RED,
            DepthCompare::Less,
        )];
        let cw = [tri(
            [(0.0, 0.0), (0.0, 32.0), (32.0, 0.0)],
            0.5,
            RED,
            DepthCompare::Less,
        )];
        assert_eq!(render(&config, &ccw, &[0]).color, render(&config, &cw, &[0]).color);
    }

    #[test]
    fn colors_are_interpolated() {
        let config = config(DepthCompare::Less, 1.0);
        let mut t = screen_filling(0.5, RED);
        t.colors = [RED, GREEN, BLUE];
        let target = render(&config, &[t], &[0]);
        // Close to the first vertex red dominates.
        let [r, g, b, _] = pixel(&target, 0, 0).to_le_bytes();
        assert!(r > g && r > b);
        // Every covered pixel is opaque.
        assert!(target.color.iter().all(|c| c >> 24 == 0xff));
    }

    #[test]
    fn nearest_fragment_wins_in_any_order() {
        let config = config(DepthCompare::Less, 1.0);
        let tris = [screen_filling(0.6, BLUE), screen_filling(0.3, RED)];
        let a = render(&config, &tris, &[0, 1]);
        let b = render(&config, &tris, &[1, 0]);
        assert_eq!(a.color, b.color);
        assert_eq!(a.depth, b.depth);
        assert!(a.color.iter().all(|&c| c == RED));
        assert!(a.depth.iter().all(|&d| d == 0.3));
    }

    #[test]
    fn equal_depth_goes_to_lowest_index() {
        let config = config(DepthCompare::Less, 1.0);
        let tris = [
            screen_filling(0.5, GREEN),
            screen_filling(0.5, RED),
            screen_filling(0.5, BLUE),
        ];
        for order in [[0, 1, 2], [2, 1, 0], [1, 2, 0]] {
            let target = render(&config, &tris, &order);
            assert!(
                target.color.iter().all(|&c| c == GREEN),
                "order {order:?}"
            );
        }
    }

    #[test]
    fn greater_keeps_farthest() {
        let config = config(DepthCompare::Greater, 0.0);
        let tris = [
            tri(
                [(-10.0, -10.0), (100.0, -10.0), (-10.0, 100.0)],
                0.2,
                RED,
                DepthCompare::Greater,
            ),
            tri(
                [(-10.0, -10.0), (100.0, -10.0), (-10.0, 100.0)],
                0.8,
                BLUE,
                DepthCompare::Greater,
            ),
        ];
        let target = render(&config, &tris, &[0, 1]);
        assert!(target.color.iter().all(|&c| c == BLUE));
    }

    #[test]
    fn cleared_depth_needs_equal_compare() {
        let tris = [screen_filling(1.0, RED)];
        let less = render(&config(DepthCompare::Less, 1.0), &tris, &[0]);
        assert!(less.color.iter().all(|&c| c == CLEAR));
        let less_equal = render(&config(DepthCompare::LessEqual, 1.0), &tris, &[0]);
        assert!(less_equal.color.iter().all(|&c| c == RED));
    }

    #[test]
    fn fragments_outside_depth_range_are_discarded() {
        let config = config(DepthCompare::Less, 1.0);
        let tris = [screen_filling(1.5, RED), screen_filling(-0.5, BLUE)];
        // Queue both triangles in every bin, bypassing the binning cull.
        let queues: Vec<u32> = (0..4).flat_map(|_| [0, 1, 0, 0, 0, 0, 0, 0]).collect();
        let target = resolve(&config, &tris, &[2; 4], &queues);
        assert!(target.color.iter().all(|&c| c == CLEAR));
    }

    #[test]
    fn point_covers_one_pixel() {
        let config = config(DepthCompare::Less, 1.0);
        let mut point = tri(
            [(5.25, 7.75), (5.25, 7.75), (5.25, 7.75)],
            0.5,
            GREEN,
            DepthCompare::Less,
        );
        point.flags = Triangle::FLAG_THIN;
        let target = render(&config, &[point], &[0]);
        assert_eq!(pixel(&target, 5, 7), GREEN);
        assert_eq!(target.color.iter().filter(|&&c| c == GREEN).count(), 1);
    }

    #[test]
    fn line_covers_one_pixel_per_column() {
        let config = config(DepthCompare::Less, 1.0);
        let mut line = tri(
            [(2.5, 4.5), (12.5, 4.5), (12.5, 4.5)],
            0.5,
            WHITE,
            DepthCompare::Less,
        );
        line.flags = Triangle::FLAG_THIN;
        let target = render(&config, &[line], &[0]);
        let covered: Vec<_> = (0..32 * 32)
            .filter(|&ix| target.color[ix] != CLEAR)
            .map(|ix| (ix % 32, ix / 32))
            .collect();
        let expected: Vec<_> = (2..=12).map(|x| (x, 4)).collect();
        assert_eq!(covered, expected);
    }

    #[test]
    fn degenerate_regular_triangle_covers_nothing() {
        let config = config(DepthCompare::Less, 1.0);
        let sliver = tri(
            [(0.0, 0.0), (16.0, 16.0), (32.0, 32.0)],
            0.5,
            RED,
            DepthCompare::Less,
        );
        let target = render(&config, &[sliver], &[0]);
        assert!(target.color.iter().all(|&c| c == CLEAR));
    }

    #[test]
    fn overflowed_queue_reads_only_capacity() {
        let mut config = config(DepthCompare::Less, 1.0);
        config.bin_queue_size = 2;
        let tris = [
            screen_filling(0.9, GREEN),
            screen_filling(0.8, GREEN),
            screen_filling(0.1, RED),
        ];
        // Bin 0 received three triangles but only kept two; the next queue
        // starts with triangle 2.
        let cursors = [3, 1, 0, 0];
        let queues = [0, 1, 2, 0, 0, 0, 0, 0];
        let target = resolve(&config, &tris, &cursors, &queues);
        assert_eq!(pixel(&target, 0, 0), GREEN);
        assert_eq!(pixel(&target, 20, 0), RED);
        assert_eq!(pixel(&target, 0, 20), CLEAR);
    }
}
