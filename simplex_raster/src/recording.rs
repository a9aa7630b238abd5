// Copyright 2026 the Simplex Raster Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use std::num::NonZeroU64;
use std::sync::atomic::{AtomicU64, Ordering};

use simplex_raster_encoding::WorkgroupSize;

#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Debug)]
pub struct ShaderId(pub usize);

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct ResourceId(pub NonZeroU64);

impl ResourceId {
    pub fn next() -> Self {
        // We initialize with 1 so that the conversion below succeeds
        static ID_COUNTER: AtomicU64 = AtomicU64::new(1);
        let id = ID_COUNTER.fetch_add(1, Ordering::Relaxed);
        Self(NonZeroU64::new(id).unwrap_or(NonZeroU64::MIN))
    }
}

/// List of [`Command`]s for an engine to execute in order.
#[derive(Default)]
pub struct Recording {
    pub commands: Vec<Command>,
}

/// Proxy used as a handle to a buffer.
///
/// A proxy only names a buffer. The engine allocates the storage the first
/// time a command uses it, and keeps it until a [`Command::FreeBuffer`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BufferProxy {
    /// Size in bytes.
    pub size: u64,
    pub id: ResourceId,
    pub name: &'static str,
}

/// Single command inside a [`Recording`] to get executed by an engine.
pub enum Command {
    /// Commands the data to be written to the start of the given buffer.
    Upload(BufferProxy, Vec<u8>),
    /// Commands the data to be written to the given buffer as a uniform.
    UploadUniform(BufferProxy, Vec<u8>),
    /// Runs a kernel with the given work-group counts over the given buffers,
    /// in binding order.
    Dispatch(ShaderId, WorkgroupSize, Vec<BufferProxy>),
    /// Copies the buffer's current contents to host memory.
    Download(BufferProxy),
    /// Commands to free the buffer.
    FreeBuffer(BufferProxy),
}

impl Command {
    /// Short description used when reporting a failed command.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Upload(..) => "upload",
            Self::UploadUniform(..) => "upload uniform",
            Self::Dispatch(..) => "dispatch",
            Self::Download(..) => "download",
            Self::FreeBuffer(..) => "free",
        }
    }
}

impl Recording {
    /// Appends a [`Command`] to the back of the [`Recording`].
    pub fn push(&mut self, cmd: Command) {
        self.commands.push(cmd);
    }

    /// Commands to upload the given data to a new buffer with the given name.
    /// Returns a [`BufferProxy`] to the buffer.
    pub fn upload(&mut self, name: &'static str, data: impl Into<Vec<u8>>) -> BufferProxy {
        let data = data.into();
        let buf_proxy = BufferProxy::new(data.len() as u64, name);
        self.push(Command::Upload(buf_proxy, data));
        buf_proxy
    }

    /// Commands to upload the given data to a new buffer as a uniform with the given name.
    /// Returns a [`BufferProxy`] to the buffer.
    pub fn upload_uniform(&mut self, name: &'static str, data: impl Into<Vec<u8>>) -> BufferProxy {
        let data = data.into();
        let buf_proxy = BufferProxy::new(data.len() as u64, name);
        self.push(Command::UploadUniform(buf_proxy, data));
        buf_proxy
    }

    /// Commands to overwrite the start of an existing buffer.
    pub fn write(&mut self, buf: BufferProxy, data: impl Into<Vec<u8>>) {
        self.push(Command::Upload(buf, data.into()));
    }

    /// Commands to overwrite an existing uniform buffer.
    pub fn write_uniform(&mut self, buf: BufferProxy, data: impl Into<Vec<u8>>) {
        self.push(Command::UploadUniform(buf, data.into()));
    }

    pub fn dispatch<R>(&mut self, shader: ShaderId, wg_size: WorkgroupSize, resources: R)
    where
        R: IntoIterator<Item = BufferProxy>,
    {
        let r = resources.into_iter().collect();
        self.push(Command::Dispatch(shader, wg_size, r));
    }

    /// Prepare a buffer for downloading.
    ///
    /// The contents are copied when the command runs, so the buffer can be
    /// written or freed afterwards.
    pub fn download(&mut self, buf: BufferProxy) {
        self.push(Command::Download(buf));
    }

    /// Commands to free the given buffer.
    pub fn free_buffer(&mut self, buf: BufferProxy) {
        self.push(Command::FreeBuffer(buf));
    }
}

impl BufferProxy {
    pub fn new(size: u64, name: &'static str) -> Self {
        let id = ResourceId::next();
        debug_assert!(size > 0);
        Self { id, size, name }
    }
}
