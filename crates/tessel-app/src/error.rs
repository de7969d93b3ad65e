// SPDX-License-Identifier: CEPL-1.0
use tessel_core::FatalCode;
use tessel_render::RenderError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("window: {0:#}")]
    Window(anyhow::Error),
    #[error("config: {0:#}")]
    Config(anyhow::Error),
    #[error("shaders: {0}")]
    Shader(String),
    #[error(transparent)]
    Render(#[from] RenderError),
}

impl FatalCode for AppError {
    fn exit_code(&self) -> u8 {
        match self {
            Self::Window(_) => 50,
            Self::Config(_) => 51,
            Self::Shader(_) => 52,
            Self::Render(e) => e.exit_code(),
        }
    }
}
