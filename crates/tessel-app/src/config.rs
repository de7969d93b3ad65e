// SPDX-License-Identifier: CEPL-1.0
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;
use tessel_render_vk::PresentPreference;
use tracing::info;

#[derive(Debug, Deserialize, Default)]
pub struct AppCfg {
    #[serde(default)]
    pub window: WindowCfg,
    #[serde(default)]
    pub render: RenderCfg,
    #[serde(default)]
    pub shaders: ShaderCfg,
}

#[derive(Debug, Deserialize)]
pub struct WindowCfg {
    #[serde(default = "default_title")]
    pub title: String,
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
}

#[derive(Debug, Deserialize)]
pub struct RenderCfg {
    #[serde(default = "default_clear")]
    pub clear_color: [f32; 4],
    #[serde(default)]
    pub present_mode: PresentModeCfg,
    #[serde(default = "default_frames_in_flight")]
    pub frames_in_flight: usize,
    #[serde(default)]
    pub validation: bool,
    #[serde(default = "default_prefer_discrete")]
    pub prefer_discrete: bool,
    #[serde(default)]
    pub log_filter: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum PresentModeCfg {
    #[default]
    Mailbox,
    Fifo,
    Immediate,
}

/// SPIR-V paths. Unset stages fall back to the blobs embedded at build time.
#[derive(Debug, Deserialize, Default)]
pub struct ShaderCfg {
    #[serde(default)]
    pub vertex: Option<PathBuf>,
    #[serde(default)]
    pub fragment: Option<PathBuf>,
}

impl Default for WindowCfg {
    fn default() -> Self {
        WindowCfg {
            title: default_title(),
            width: default_width(),
            height: default_height(),
        }
    }
}

impl Default for RenderCfg {
    fn default() -> Self {
        RenderCfg {
            clear_color: default_clear(),
            present_mode: PresentModeCfg::Mailbox,
            frames_in_flight: default_frames_in_flight(),
            validation: false,
            prefer_discrete: default_prefer_discrete(),
            log_filter: None,
        }
    }
}

impl From<PresentModeCfg> for PresentPreference {
    fn from(mode: PresentModeCfg) -> Self {
        match mode {
            PresentModeCfg::Mailbox => PresentPreference::Mailbox,
            PresentModeCfg::Fifo => PresentPreference::Fifo,
            PresentModeCfg::Immediate => PresentPreference::Immediate,
        }
    }
}

fn default_title() -> String {
    "tessel".into()
}
fn default_width() -> u32 {
    800
}
fn default_height() -> u32 {
    600
}
fn default_clear() -> [f32; 4] {
    [0.02, 0.02, 0.04, 1.0]
}
fn default_frames_in_flight() -> usize {
    2
}
fn default_prefer_discrete() -> bool {
    true
}

/// A missing file means defaults; anything unreadable or malformed is an error.
pub fn load_cfg(path: &Path) -> Result<AppCfg> {
    match fs::read_to_string(path) {
        Ok(s) => parse_cfg(&s).with_context(|| format!("parsing {}", path.display())),
        Err(e) if e.kind() == ErrorKind::NotFound => {
            info!("{} not found, using defaults", path.display());
            Ok(AppCfg::default())
        }
        Err(e) => Err(e).with_context(|| format!("reading {}", path.display())),
    }
}

fn parse_cfg(s: &str) -> Result<AppCfg> {
    Ok(toml::from_str::<AppCfg>(s)?)
}
