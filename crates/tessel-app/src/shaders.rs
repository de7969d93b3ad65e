// SPDX-License-Identifier: CEPL-1.0
use std::fs;
use std::path::Path;

use tessel_render_vk::ShaderBlobs;
use tracing::info;

use crate::config::ShaderCfg;
use crate::error::AppError;

#[cfg(feature = "compile-shaders")]
const EMBEDDED: Option<(&[u8], &[u8])> = Some((
    include_bytes!(concat!(env!("OUT_DIR"), "/mesh.vert.spv")) as &[u8],
    include_bytes!(concat!(env!("OUT_DIR"), "/mesh.frag.spv")) as &[u8],
));
#[cfg(not(feature = "compile-shaders"))]
const EMBEDDED: Option<(&[u8], &[u8])> = None;

pub fn load_shaders(cfg: &ShaderCfg) -> Result<ShaderBlobs, AppError> {
    resolve(cfg, EMBEDDED)
}

/// Configured paths win per stage; otherwise the embedded blob is used.
fn resolve(cfg: &ShaderCfg, embedded: Option<(&[u8], &[u8])>) -> Result<ShaderBlobs, AppError> {
    let (vert, frag) = embedded.unzip();
    Ok(ShaderBlobs {
        vertex: stage("vertex", cfg.vertex.as_deref(), vert)?,
        fragment: stage("fragment", cfg.fragment.as_deref(), frag)?,
    })
}

fn stage(name: &str, path: Option<&Path>, embedded: Option<&[u8]>) -> Result<Vec<u8>, AppError> {
    match (path, embedded) {
        (Some(p), _) => {
            let bytes = fs::read(p)
                .map_err(|e| AppError::Shader(format!("{name} shader {}: {e}", p.display())))?;
            info!("{name} shader: {} ({} bytes)", p.display(), bytes.len());
            Ok(bytes)
        }
        (None, Some(b)) => Ok(b.to_vec()),
        (None, None) => Err(AppError::Shader(format!(
            "no {name} shader: set [shaders] {name} or build with the compile-shaders feature"
        ))),
    }
}
