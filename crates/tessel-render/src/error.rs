// SPDX-License-Identifier: CEPL-1.0
use tessel_core::FatalCode;
use thiserror::Error;

/// Every way the renderer can fail.
///
/// Staleness (out-of-date / suboptimal surfaces) is not an error; the
/// scheduler handles it by rebuilding the chain. Everything listed here ends
/// the process, each kind with its own exit code.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("vulkan loader unavailable: {0}")]
    LoaderUnavailable(String),
    #[error("instance creation failed: {0}")]
    InstanceCreation(String),
    #[error("required capability missing: {0}")]
    MissingCapability(String),
    #[error("surface creation failed: {0}")]
    SurfaceCreation(String),
    #[error("no suitable GPU device: {0}")]
    NoSuitableDevice(String),
    #[error("device creation failed: {0}")]
    DeviceCreation(String),
    #[error("invalid frame configuration: {0}")]
    InvalidConfig(String),

    #[error("surface chain creation failed: {0}")]
    ChainCreation(String),
    #[error("pipeline creation failed: {0}")]
    PipelineCreation(String),
    #[error("invalid shader bytecode: {0}")]
    ShaderModule(String),
    #[error("command recording failed: {0}")]
    CommandRecording(String),
    #[error("sync object creation failed: {0}")]
    SyncCreation(String),

    #[error("no memory type satisfies {0}")]
    MemoryTypeNotFound(String),
    #[error("out of memory: {0}")]
    OutOfMemory(String),
    #[error("buffer creation failed: {0}")]
    BufferCreation(String),

    #[error("image acquisition failed: {0}")]
    Acquire(String),
    #[error("queue submission failed: {0}")]
    Submit(String),
    #[error("presentation failed: {0}")]
    Present(String),
    #[error("fence wait failed: {0}")]
    FenceWait(String),
    #[error("device idle wait failed: {0}")]
    DeviceIdle(String),
}

impl RenderError {
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::LoaderUnavailable(_) => 10,
            Self::InstanceCreation(_) => 11,
            Self::MissingCapability(_) => 12,
            Self::SurfaceCreation(_) => 13,
            Self::NoSuitableDevice(_) => 14,
            Self::DeviceCreation(_) => 15,
            Self::InvalidConfig(_) => 16,

            Self::ChainCreation(_) => 20,
            Self::PipelineCreation(_) => 21,
            Self::ShaderModule(_) => 22,
            Self::CommandRecording(_) => 23,
            Self::SyncCreation(_) => 24,

            Self::MemoryTypeNotFound(_) => 30,
            Self::OutOfMemory(_) => 31,
            Self::BufferCreation(_) => 32,

            Self::Acquire(_) => 40,
            Self::Submit(_) => 41,
            Self::Present(_) => 42,
            Self::FenceWait(_) => 43,
            Self::DeviceIdle(_) => 44,
        }
    }
}

impl FatalCode for RenderError {
    fn exit_code(&self) -> u8 {
        RenderError::exit_code(self)
    }
}
