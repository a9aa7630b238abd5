// Copyright 2026 the Simplex Raster Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Properties that hold for any scene.

#![allow(clippy::missing_assert_message, reason = "Deferred")]

use simplex_raster::peniko::color::palette;
use simplex_raster::{DepthCompare, PrimitiveBuffer, PrimitiveType, RendererOptions};
use simplex_raster_tests::{
    point, push_rect, random_triangles, read_frame, render_then_debug, renderer, reversed,
    rgba8, Lcg, TestParams,
};

fn options(bin_width: u32, bin_height: u32) -> RendererOptions {
    RendererOptions {
        bin_width,
        bin_height,
        bin_queue_size: 512,
    }
}

#[test]
fn bin_size_does_not_change_the_image() {
    let primitives = random_triangles(7, 200).unwrap();
    let frames: Vec<_> = [(16, 16), (4, 4), (64, 64), (7, 5)]
        .into_iter()
        .map(|(w, h)| {
            let params = TestParams {
                options: options(w, h),
                ..TestParams::new(format!("bin_size_{w}x{h}"), 61, 47, 3)
            };
            render_then_debug(&primitives, &params).unwrap()
        })
        .collect();
    for frame in &frames {
        assert!(frame.report.is_complete());
        assert_eq!(frame.pixels, frames[0].pixels);
        assert_eq!(frame.depth, frames[0].depth);
    }
    assert!(frames[0].count(rgba8(palette::css::BLACK)) < 61 * 47);
}

#[test]
fn primitive_order_does_not_change_the_image() {
    let primitives = random_triangles(11, 150).unwrap();
    let params = TestParams::new("primitive_order", 80, 60, 3);
    let forward = render_then_debug(&primitives, &params).unwrap();
    let backward = render_then_debug(&reversed(&primitives).unwrap(), &params).unwrap();
    assert_eq!(forward.pixels, backward.pixels);
    assert_eq!(forward.depth, backward.depth);
}

#[test]
fn equal_depth_goes_to_first_primitive() {
    let mut primitives = PrimitiveBuffer::new(PrimitiveType::Triangles, 3);
    let rect = [-0.5, -0.5, 0.5, 0.5];
    push_rect(&mut primitives, rect, 1.0, palette::css::RED).unwrap();
    push_rect(&mut primitives, rect, 1.0, palette::css::BLUE).unwrap();
    let params = TestParams::new("equal_depth", 32, 32, 3);
    let frame = render_then_debug(&primitives, &params).unwrap();
    assert_eq!(frame.count(rgba8(palette::css::RED)), 16 * 16);
    assert_eq!(frame.count(rgba8(palette::css::BLUE)), 0);

    let frame = render_then_debug(&reversed(&primitives).unwrap(), &params).unwrap();
    assert_eq!(frame.count(rgba8(palette::css::BLUE)), 16 * 16);
}

#[test]
fn greater_keeps_farthest() {
    let mut primitives = PrimitiveBuffer::new(PrimitiveType::Triangles, 3);
    let rect = [-1.0, -1.0, 1.0, 1.0];
    push_rect(&mut primitives, rect, 0.5, palette::css::RED).unwrap();
    push_rect(&mut primitives, rect, 1.5, palette::css::BLUE).unwrap();
    push_rect(&mut primitives, rect, 1.0, palette::css::LIME).unwrap();
    let less = render_then_debug(&primitives, &TestParams::new("less", 16, 16, 3)).unwrap();
    assert_eq!(less.count(rgba8(palette::css::RED)), 16 * 16);
    let params = TestParams {
        depth_compare: DepthCompare::Greater,
        clear_depth: 0.0,
        ..TestParams::new("greater", 16, 16, 3)
    };
    let greater = render_then_debug(&primitives, &params).unwrap();
    assert_eq!(greater.count(rgba8(palette::css::BLUE)), 16 * 16);
    assert_eq!(greater.depth_at(3, 3), 0.75);
}

#[test]
fn simplices_reduce_to_every_triangle() {
    for (dimension, per_simplex) in [(3, 1), (4, 4), (5, 10), (6, 20), (8, 56)] {
        let mut rng = Lcg(u64::from(dimension));
        let mut primitives = PrimitiveBuffer::new(PrimitiveType::Simplices, dimension);
        for _ in 0..3 {
            let mut coords = Vec::new();
            for _ in 0..dimension {
                let xy = [rng.next_f32() - 0.5, rng.next_f32() - 0.5];
                coords.extend(point(dimension, xy, 1.0));
            }
            primitives.push(&coords, palette::css::WHITE).unwrap();
        }
        let params = TestParams::new(format!("simplices_{dimension}d"), 32, 32, dimension);
        let frame = render_then_debug(&primitives, &params).unwrap();
        assert_eq!(frame.report.n_primitives, 3);
        assert_eq!(frame.report.n_triangles, 3 * per_simplex);
    }
}

#[test]
fn readback_is_idempotent() {
    let primitives = random_triangles(3, 40).unwrap();
    let params = TestParams::new("readback", 50, 30, 3);
    let mut renderer = renderer(&params).unwrap();
    let report = renderer.render(&primitives).unwrap();
    let first = read_frame(&mut renderer, report.clone()).unwrap();
    let second = read_frame(&mut renderer, report).unwrap();
    assert_eq!(first.pixels, second.pixels);
    assert_eq!(first.depth, second.depth);
}

#[test]
fn behind_the_eye_is_culled() {
    let mut primitives = PrimitiveBuffer::new(PrimitiveType::Triangles, 3);
    push_rect(&mut primitives, [-1.0, -1.0, 1.0, 1.0], -1.0, palette::css::RED).unwrap();
    // One vertex behind the eye culls the whole triangle.
    let mut coords = point(3, [-1.0, -1.0], 1.0);
    coords.extend(point(3, [1.0, -1.0], 1.0));
    coords.extend([0.0, 1.0, -0.5]);
    primitives.push(&coords, palette::css::RED).unwrap();
    let frame = render_then_debug(&primitives, &TestParams::new("culled", 16, 16, 3)).unwrap();
    assert_eq!(frame.count(rgba8(palette::css::BLACK)), 16 * 16);
    assert_eq!(frame.report.n_triangles, 3);
    assert_eq!(frame.report.counters.appends, 0);
}

#[test]
fn outside_depth_range_is_discarded() {
    let mut primitives = PrimitiveBuffer::new(PrimitiveType::Triangles, 3);
    push_rect(&mut primitives, [-1.0, -1.0, 1.0, 1.0], 3.0, palette::css::RED).unwrap();
    let frame = render_then_debug(&primitives, &TestParams::new("too_far", 16, 16, 3)).unwrap();
    assert_eq!(frame.count(rgba8(palette::css::BLACK)), 16 * 16);
    assert_eq!(frame.report.counters.appends, 0);
}

#[test]
fn every_overlapped_bin_records_the_triangle() {
    let mut primitives = PrimitiveBuffer::new(PrimitiveType::Triangles, 3);
    // Covers pixels 16..48 horizontally and 0..64 vertically.
    push_rect(&mut primitives, [-0.5, -1.0, 0.5, 1.0], 1.0, palette::css::RED).unwrap();
    let params = TestParams {
        options: options(16, 16),
        ..TestParams::new("bin_coverage", 64, 64, 3)
    };
    let frame = render_then_debug(&primitives, &params).unwrap();
    // Each of the two triangles spans bin columns 1 and 2 on all four rows.
    assert_eq!(frame.report.counters.appends, 2 * 2 * 4);
    assert_eq!(frame.report.counters.max_bin_count, 2);
    assert_eq!(frame.count(rgba8(palette::css::RED)), 32 * 64);
}
