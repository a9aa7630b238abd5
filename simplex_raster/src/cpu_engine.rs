// Copyright 2026 the Simplex Raster Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Executes recordings with the CPU kernels.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};

use simplex_raster_shaders::cpu::{CpuBinding, CpuKernel};
use simplex_raster_shaders::{BindType, ComputeShader};

use crate::recording::{BufferProxy, Command, Recording, ResourceId, ShaderId};
use crate::{Error, Result};

struct CpuShader {
    label: &'static str,
    bindings: &'static [BindType],
    kernel: CpuKernel,
}

struct MaterializedBuffer {
    words: RefCell<Vec<u32>>,
    /// Size in bytes as requested by the proxy.
    size: u64,
}

/// Engine running every kernel on the host.
///
/// Buffers are word arrays that live from their first use until they are
/// freed. Commands run in order, so each dispatch sees every write of the
/// dispatches recorded before it.
#[derive(Default)]
pub struct CpuEngine {
    shaders: Vec<CpuShader>,
    buffers: HashMap<ResourceId, MaterializedBuffer>,
    downloads: HashMap<ResourceId, Vec<u32>>,
}

impl CpuEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a kernel. The returned id stays valid until
    /// [`clear_shaders`](Self::clear_shaders) is called.
    pub fn add_shader(&mut self, shader: &ComputeShader, kernel: CpuKernel) -> ShaderId {
        let id = self.shaders.len();
        self.shaders.push(CpuShader {
            label: shader.name,
            bindings: shader.bindings,
            kernel,
        });
        ShaderId(id)
    }

    /// Drops all registered kernels.
    pub fn clear_shaders(&mut self) {
        self.shaders.clear();
    }

    /// Runs every command of `recording`.
    ///
    /// The whole recording is checked before the first command runs. If any
    /// command is invalid, nothing is executed and the error names it.
    pub fn run_recording(&mut self, recording: &Recording, label: &'static str) -> Result<()> {
        self.validate(recording)
            .map_err(|(index, stage, source)| Error::StageFailed {
                label,
                index,
                stage,
                source: Box::new(source),
            })?;
        for command in &recording.commands {
            match command {
                Command::Upload(proxy, bytes) | Command::UploadUniform(proxy, bytes) => {
                    let buffer = self.materialize(proxy);
                    let mut words = buffer.words.borrow_mut();
                    bytemuck::cast_slice_mut::<u32, u8>(&mut words)[..bytes.len()]
                        .copy_from_slice(bytes);
                }
                Command::Dispatch(shader_id, wg_size, bindings) => {
                    for proxy in bindings {
                        self.materialize(proxy);
                    }
                    let shader = &self.shaders[shader_id.0];
                    log::trace!(
                        "{label}: dispatching {} with {:?} work-groups",
                        shader.label,
                        wg_size
                    );
                    let resources = bindings
                        .iter()
                        .map(|proxy| {
                            self.buffers
                                .get(&proxy.id)
                                .map(|b| CpuBinding::BufferRW(&b.words))
                                .ok_or(Error::UnavailableBufferUsed(proxy.name, "dispatch"))
                        })
                        .collect::<Result<Vec<_>>>()?;
                    (shader.kernel)(*wg_size, &resources);
                }
                Command::Download(proxy) => {
                    let buffer = self
                        .buffers
                        .get(&proxy.id)
                        .ok_or(Error::UnavailableBufferUsed(proxy.name, "download"))?;
                    let words = buffer.words.borrow().clone();
                    self.downloads.insert(proxy.id, words);
                }
                Command::FreeBuffer(proxy) => {
                    self.buffers.remove(&proxy.id);
                }
            }
        }
        Ok(())
    }

    /// Checks a recording against the registered kernels and the buffers
    /// that will be live when each command runs.
    fn validate(
        &self,
        recording: &Recording,
    ) -> std::result::Result<(), (usize, &'static str, Error)> {
        let mut sizes: HashMap<ResourceId, u64> =
            self.buffers.iter().map(|(id, b)| (*id, b.size)).collect();
        let mut freed: HashSet<ResourceId> = HashSet::new();
        for (index, command) in recording.commands.iter().enumerate() {
            let fail = |error| (index, command.kind(), error);
            match command {
                Command::Upload(proxy, bytes) | Command::UploadUniform(proxy, bytes) => {
                    let capacity = *sizes.entry(proxy.id).or_insert(proxy.size);
                    freed.remove(&proxy.id);
                    if bytes.len() as u64 > capacity {
                        return Err(fail(Error::UploadSizeMismatch {
                            name: proxy.name,
                            size: bytes.len() as u64,
                            capacity,
                        }));
                    }
                }
                Command::Dispatch(shader_id, _, bindings) => {
                    let shader = self
                        .shaders
                        .get(shader_id.0)
                        .ok_or_else(|| fail(Error::UnknownShader(shader_id.0)))?;
                    let fail = |error| (index, shader.label, error);
                    if bindings.len() != shader.bindings.len() {
                        return Err(fail(Error::BindingCountMismatch {
                            shader: shader.label,
                            expected: shader.bindings.len(),
                            got: bindings.len(),
                        }));
                    }
                    // A buffer may be bound twice only if neither slot writes to it.
                    let mut bound: HashMap<ResourceId, bool> = HashMap::new();
                    for (proxy, bind_type) in bindings.iter().zip(shader.bindings) {
                        if freed.contains(&proxy.id) {
                            return Err(fail(Error::UnavailableBufferUsed(proxy.name, "dispatch")));
                        }
                        let mutable = bind_type.is_mutable();
                        if let Some(was_mutable) = bound.insert(proxy.id, mutable) {
                            if was_mutable || mutable {
                                return Err(fail(Error::AliasedBinding {
                                    shader: shader.label,
                                    buffer: proxy.name,
                                }));
                            }
                        }
                        sizes.entry(proxy.id).or_insert(proxy.size);
                    }
                }
                Command::Download(proxy) => {
                    if !sizes.contains_key(&proxy.id) {
                        return Err(fail(Error::UnavailableBufferUsed(proxy.name, "download")));
                    }
                }
                Command::FreeBuffer(proxy) => {
                    sizes.remove(&proxy.id);
                    freed.insert(proxy.id);
                }
            }
        }
        Ok(())
    }

    fn materialize(&mut self, proxy: &BufferProxy) -> &MaterializedBuffer {
        self.buffers
            .entry(proxy.id)
            .or_insert_with(|| MaterializedBuffer {
                words: RefCell::new(vec![0; proxy.size.div_ceil(4) as usize]),
                size: proxy.size,
            })
    }

    /// Contents of a downloaded buffer, as words.
    pub fn get_download(&self, buf: BufferProxy) -> Option<&[u32]> {
        self.downloads.get(&buf.id).map(Vec::as_slice)
    }

    pub fn free_download(&mut self, buf: BufferProxy) {
        self.downloads.remove(&buf.id);
    }

    /// Returns true if the buffer currently has storage.
    pub fn is_materialized(&self, buf: BufferProxy) -> bool {
        self.buffers.contains_key(&buf.id)
    }
}

#[cfg(test)]
mod tests {
    use simplex_raster_shaders::BindType::{Buffer, Uniform};

    use super::*;

    const ADD: ComputeShader = ComputeShader {
        name: "add",
        workgroup_size: [1, 1, 1],
        bindings: &[Uniform, Buffer],
    };

    /// Adds the uniform to every word of the buffer.
    fn add_kernel(_: simplex_raster_encoding::WorkgroupSize, resources: &[CpuBinding<'_>]) {
        let amount = *resources[0].as_typed::<u32>();
        for word in resources[1].as_slice_mut::<u32>().iter_mut() {
            *word += amount;
        }
    }

    fn as_bytes(words: &[u32]) -> Vec<u8> {
        bytemuck::cast_slice(words).to_vec()
    }

    #[test]
    fn runs_commands_in_order() {
        let mut engine = CpuEngine::new();
        let add = engine.add_shader(&ADD, add_kernel);
        let mut recording = Recording::default();
        let amount = recording.upload_uniform("amount", as_bytes(&[2]));
        let data = recording.upload("data", as_bytes(&[1, 2, 3]));
        recording.dispatch(add, (1, 1, 1), [amount, data]);
        recording.download(data);
        recording.dispatch(add, (1, 1, 1), [amount, data]);
        engine.run_recording(&recording, "test").unwrap();
        assert_eq!(engine.get_download(data), Some(&[3, 4, 5][..]));
        let mut recording = Recording::default();
        recording.download(data);
        engine.run_recording(&recording, "test").unwrap();
        assert_eq!(engine.get_download(data), Some(&[5, 6, 7][..]));
    }

    #[test]
    fn dispatch_materializes_zeroed_buffers() {
        let mut engine = CpuEngine::new();
        let add = engine.add_shader(&ADD, add_kernel);
        let scratch = BufferProxy::new(8, "scratch");
        let mut recording = Recording::default();
        let amount = recording.upload_uniform("amount", as_bytes(&[7]));
        recording.dispatch(add, (1, 1, 1), [amount, scratch]);
        recording.download(scratch);
        engine.run_recording(&recording, "test").unwrap();
        assert_eq!(engine.get_download(scratch), Some(&[7, 7][..]));
        assert!(engine.is_materialized(scratch));
    }

    #[test]
    fn invalid_recording_runs_nothing() {
        let mut engine = CpuEngine::new();
        let add = engine.add_shader(&ADD, add_kernel);
        let mut recording = Recording::default();
        let amount = recording.upload_uniform("amount", as_bytes(&[1]));
        let data = recording.upload("data", as_bytes(&[10]));
        recording.download(data);
        engine.run_recording(&recording, "setup").unwrap();

        let mut recording = Recording::default();
        recording.dispatch(add, (1, 1, 1), [amount, data]);
        recording.free_buffer(data);
        recording.download(data);
        let err = engine.run_recording(&recording, "frame").unwrap_err();
        match err {
            Error::StageFailed {
                label,
                index,
                stage,
                source,
            } => {
                assert_eq!((label, index, stage), ("frame", 2, "download"));
                assert!(matches!(
                    *source,
                    Error::UnavailableBufferUsed("data", "download")
                ));
            }
            other => panic!("unexpected error {other:?}"),
        }
        // The dispatch before the failing command did not run.
        let mut recording = Recording::default();
        recording.download(data);
        engine.run_recording(&recording, "check").unwrap();
        assert_eq!(engine.get_download(data), Some(&[10][..]));
    }

    #[test]
    fn rejects_bad_dispatches() {
        let mut engine = CpuEngine::new();
        let add = engine.add_shader(&ADD, add_kernel);
        let buf = BufferProxy::new(4, "buf");

        let mut recording = Recording::default();
        recording.dispatch(add, (1, 1, 1), [buf]);
        let err = engine.run_recording(&recording, "frame").unwrap_err();
        assert!(matches!(
            err,
            Error::StageFailed { stage: "add", ref source, .. }
                if matches!(**source, Error::BindingCountMismatch { expected: 2, got: 1, .. })
        ));

        let mut recording = Recording::default();
        recording.dispatch(ShaderId(5), (1, 1, 1), [buf]);
        let err = engine.run_recording(&recording, "frame").unwrap_err();
        assert!(matches!(
            err,
            Error::StageFailed { ref source, .. } if matches!(**source, Error::UnknownShader(5))
        ));

        let mut recording = Recording::default();
        recording.dispatch(add, (1, 1, 1), [buf, buf]);
        let err = engine.run_recording(&recording, "frame").unwrap_err();
        assert!(matches!(
            err,
            Error::StageFailed { ref source, .. }
                if matches!(**source, Error::AliasedBinding { buffer: "buf", .. })
        ));
    }

    #[test]
    fn upload_must_fit() {
        let mut engine = CpuEngine::new();
        let buf = BufferProxy::new(4, "small");
        let mut recording = Recording::default();
        recording.write(buf, vec![0_u8; 8]);
        let err = engine.run_recording(&recording, "frame").unwrap_err();
        assert!(matches!(
            err,
            Error::StageFailed { ref source, .. }
                if matches!(**source, Error::UploadSizeMismatch { size: 8, capacity: 4, .. })
        ));
        assert!(!engine.is_materialized(buf));
    }

    #[test]
    fn downloads_outlive_the_buffer() {
        let mut engine = CpuEngine::new();
        let mut recording = Recording::default();
        let data = recording.upload("data", as_bytes(&[1, 2, 3, 4]));
        recording.download(data);
        recording.free_buffer(data);
        engine.run_recording(&recording, "test").unwrap();
        assert!(!engine.is_materialized(data));
        assert_eq!(engine.get_download(data), Some(&[1, 2, 3, 4][..]));
        engine.free_download(data);
        assert_eq!(engine.get_download(data), None);
    }
}
