// Copyright 2026 the Simplex Raster Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use crate::EncodingError;

/// Per-axis near and far clip bounds.
///
/// For the depth axis (the last one) these are the near and far distances.
/// For every other axis they bound the visible range of `coordinate / depth`.
#[derive(Clone, Debug, PartialEq)]
pub struct ClipPlanes {
    near: Vec<f32>,
    far: Vec<f32>,
}

impl ClipPlanes {
    /// Default planes for `dimension`: a 90° frustum on every lateral axis,
    /// depth from 0.1 to 100.
    pub fn new(dimension: u32) -> Self {
        let n = dimension as usize;
        let mut near = vec![-1.0; n];
        let mut far = vec![1.0; n];
        if let (Some(near), Some(far)) = (near.last_mut(), far.last_mut()) {
            *near = 0.1;
            *far = 100.0;
        }
        Self { near, far }
    }

    pub fn dimension(&self) -> u32 {
        self.near.len() as u32
    }

    pub fn near(&self) -> &[f32] {
        &self.near
    }

    pub fn far(&self) -> &[f32] {
        &self.far
    }

    pub fn set_near(&mut self, near: &[f32]) -> Result<(), EncodingError> {
        check_len(self.near.len(), near)?;
        self.near.copy_from_slice(near);
        Ok(())
    }

    pub fn set_far(&mut self, far: &[f32]) -> Result<(), EncodingError> {
        check_len(self.far.len(), far)?;
        self.far.copy_from_slice(far);
        Ok(())
    }

    /// Checks that the projection is well defined on every axis.
    pub fn validate(&self) -> Result<(), EncodingError> {
        for (axis, (&near, &far)) in self.near.iter().zip(&self.far).enumerate() {
            if !near.is_finite() || !far.is_finite() {
                return Err(EncodingError::NonFiniteClipPlane { axis });
            }
            if near == far {
                return Err(EncodingError::DegenerateClipPlane { axis, value: near });
            }
        }
        Ok(())
    }

    /// Layout of the planes buffer: `dimension` near values, then
    /// `dimension` far values.
    pub fn to_buffer(&self) -> Vec<f32> {
        let mut data = Vec::with_capacity(self.near.len() * 2);
        data.extend_from_slice(&self.near);
        data.extend_from_slice(&self.far);
        data
    }
}

fn check_len(expected: usize, plane: &[f32]) -> Result<(), EncodingError> {
    if plane.len() != expected {
        return Err(EncodingError::PlaneDimensionMismatch {
            expected: expected as u32,
            got: plane.len(),
        });
    }
    Ok(())
}
