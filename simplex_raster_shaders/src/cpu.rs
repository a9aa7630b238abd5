// Copyright 2026 the Simplex Raster Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! CPU implementations of the pipeline kernels.
//!
//! Every kernel has a typed `*_main` entry point and a wrapper taking the
//! dispatch size and a slice of [`CpuBinding`]s in the order given by the
//! kernel's [`ComputeShader::bindings`](crate::ComputeShader::bindings).
//! Work items run in parallel on the rayon thread pool; only the binning
//! kernel shares memory between work items, through atomics.

mod binning;
mod clear;
mod fine;
mod reduce;
mod util;
mod vertex;

pub use binning::{binning, binning_main};
pub use clear::{clear, clear_main};
pub use fine::{fine, fine_main};
pub use reduce::{reduce, reduce_main};
pub use util::{ndc_to_screen, project};
pub use vertex::{vertex, vertex_main};

use std::cell::{Ref, RefCell, RefMut};
use std::ops::{Deref, DerefMut};
use std::sync::atomic::AtomicU32;

use bytemuck::Pod;
use simplex_raster_encoding::{WorkgroupSize, MAX_DIMENSION, MIN_DIMENSION};

/// Signature shared by all CPU kernels.
pub type CpuKernel = fn(WorkgroupSize, &[CpuBinding<'_>]);

#[derive(Clone, Copy)]
pub enum CpuBinding<'a> {
    Buffer(&'a [u32]),
    BufferRW(&'a RefCell<Vec<u32>>),
}

pub enum TypedBufGuard<'a, T: ?Sized> {
    Slice(&'a T),
    Interior(Ref<'a, T>),
}

pub enum TypedBufGuardMut<'a, T: ?Sized> {
    Slice(&'a mut T),
    Interior(RefMut<'a, T>),
}

impl<T: ?Sized> Deref for TypedBufGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        match self {
            TypedBufGuard::Slice(s) => s,
            TypedBufGuard::Interior(r) => r,
        }
    }
}

impl<T: ?Sized> Deref for TypedBufGuardMut<'_, T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        match self {
            TypedBufGuardMut::Slice(s) => s,
            TypedBufGuardMut::Interior(r) => r,
        }
    }
}

impl<T: ?Sized> DerefMut for TypedBufGuardMut<'_, T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        match self {
            TypedBufGuardMut::Slice(s) => s,
            TypedBufGuardMut::Interior(r) => r,
        }
    }
}

impl CpuBinding<'_> {
    pub fn as_typed<T: Pod>(&self) -> TypedBufGuard<'_, T> {
        match self {
            CpuBinding::Buffer(b) => TypedBufGuard::Slice(&bytemuck::cast_slice(b)[0]),
            CpuBinding::BufferRW(b) => {
                TypedBufGuard::Interior(Ref::map(b.borrow(), |buf| {
                    &bytemuck::cast_slice(buf.as_slice())[0]
                }))
            }
        }
    }

    pub fn as_typed_mut<T: Pod>(&self) -> TypedBufGuardMut<'_, T> {
        match self {
            CpuBinding::Buffer(_) => panic!("can't borrow external buffer mutably"),
            CpuBinding::BufferRW(b) => {
                TypedBufGuardMut::Interior(RefMut::map(b.borrow_mut(), |buf| {
                    &mut bytemuck::cast_slice_mut(buf.as_mut_slice())[0]
                }))
            }
        }
    }

    pub fn as_slice<T: Pod>(&self) -> TypedBufGuard<'_, [T]> {
        match self {
            CpuBinding::Buffer(b) => TypedBufGuard::Slice(bytemuck::cast_slice(b)),
            CpuBinding::BufferRW(b) => TypedBufGuard::Interior(Ref::map(b.borrow(), |buf| {
                bytemuck::cast_slice(buf.as_slice())
            })),
        }
    }

    pub fn as_slice_mut<T: Pod>(&self) -> TypedBufGuardMut<'_, [T]> {
        match self {
            CpuBinding::Buffer(_) => panic!("can't borrow external buffer mutably"),
            CpuBinding::BufferRW(b) => {
                TypedBufGuardMut::Interior(RefMut::map(b.borrow_mut(), |buf| {
                    bytemuck::cast_slice_mut(buf.as_mut_slice())
                }))
            }
        }
    }

    /// Borrows a read-write buffer as atomics, for kernels whose work items
    /// write to shared locations.
    pub fn as_atomic(&self) -> AtomicBufGuard<'_> {
        match self {
            CpuBinding::Buffer(_) => panic!("can't borrow external buffer mutably"),
            CpuBinding::BufferRW(b) => AtomicBufGuard::new(b.borrow_mut()),
        }
    }
}

/// Atomic copy of a read-write buffer.
///
/// The buffer stays mutably borrowed while the guard lives, and the final
/// values are written back when it is dropped.
pub struct AtomicBufGuard<'a> {
    words: RefMut<'a, Vec<u32>>,
    atomics: Vec<AtomicU32>,
}

impl<'a> AtomicBufGuard<'a> {
    fn new(words: RefMut<'a, Vec<u32>>) -> Self {
        let atomics = words.iter().copied().map(AtomicU32::new).collect();
        Self { words, atomics }
    }
}

impl Deref for AtomicBufGuard<'_> {
    type Target = [AtomicU32];

    fn deref(&self) -> &Self::Target {
        &self.atomics
    }
}

impl Drop for AtomicBufGuard<'_> {
    fn drop(&mut self) {
        for (word, atomic) in self.words.iter_mut().zip(&mut self.atomics) {
            *word = *atomic.get_mut();
        }
    }
}

// The selectors below instantiate exactly the supported dimensions.
const _: () = assert!(MIN_DIMENSION == 3 && MAX_DIMENSION == 8);

macro_rules! dimension_kernel {
    ($dimension:expr, $kernel:ident) => {{
        let kernel: Option<CpuKernel> = match $dimension {
            3 => Some($kernel::<3> as CpuKernel),
            4 => Some($kernel::<4> as CpuKernel),
            5 => Some($kernel::<5> as CpuKernel),
            6 => Some($kernel::<6> as CpuKernel),
            7 => Some($kernel::<7> as CpuKernel),
            8 => Some($kernel::<8> as CpuKernel),
            _ => None,
        };
        kernel
    }};
}

/// Selects the vertex kernel instantiated for `dimension`.
pub fn vertex_kernel(dimension: u32) -> Option<CpuKernel> {
    dimension_kernel!(dimension, vertex)
}

/// Selects the reduce kernel instantiated for `dimension`.
pub fn reduce_kernel(dimension: u32) -> Option<CpuKernel> {
    dimension_kernel!(dimension, reduce)
}
