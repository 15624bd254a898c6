use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::BridgeError;

/// Number of texture units a GLES 2.0 fragment stage is guaranteed to expose.
pub const MAX_TEXTURE_UNITS: u32 = 8;

/// Sampling filter applied to the external texture.
///
/// External images cannot be mip-mapped, so only the two base filters exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextureFilter {
    #[default]
    Nearest,
    Linear,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BridgeConfig {
    /// Min/mag filter for the external texture.
    #[serde(default)]
    pub texture_filter: TextureFilter,

    /// Whether the video quad is alpha blended with what is below it.
    #[serde(default = "default_blending")]
    pub blending: bool,

    /// Texture unit the external sampler is bound to.
    #[serde(default)]
    pub texture_unit: u32,
}

fn default_blending() -> bool {
    true
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            texture_filter: TextureFilter::default(),
            blending: default_blending(),
            texture_unit: 0,
        }
    }
}

impl BridgeConfig {
    pub fn from_json_str(text: &str) -> Result<Self, BridgeError> {
        let cfg: BridgeConfig =
            serde_json::from_str(text).map_err(|source| BridgeError::Json { path: None, source })?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_json_path(path: impl AsRef<Path>) -> Result<Self, BridgeError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| BridgeError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let cfg: BridgeConfig = serde_json::from_str(&text).map_err(|source| BridgeError::Json {
            path: Some(path.to_path_buf()),
            source,
        })?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), BridgeError> {
        if self.texture_unit >= MAX_TEXTURE_UNITS {
            return Err(BridgeError::invalid_config(format!(
                "texture_unit must be < {MAX_TEXTURE_UNITS}, got {}",
                self.texture_unit
            )));
        }
        Ok(())
    }
}
