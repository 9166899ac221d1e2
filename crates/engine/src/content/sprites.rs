use std::path::{Path, PathBuf};

use image::ImageReader;
use thiserror::Error;

use crate::sprite_keys::{validate_sprite_key, SpriteKeyError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedSprite {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

#[derive(Debug, Error)]
pub enum SpriteLoadError {
    #[error("invalid sprite key '{key}': {source}")]
    InvalidKey {
        key: String,
        #[source]
        source: SpriteKeyError,
    },
    #[error("failed to open image {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to decode image {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}

fn sprite_path(sprites_dir: &Path, key: &str) -> Result<PathBuf, SpriteLoadError> {
    validate_sprite_key(key).map_err(|source| SpriteLoadError::InvalidKey {
        key: key.to_string(),
        source,
    })?;
    Ok(sprites_dir.join(format!("{key}.png")))
}

pub(crate) fn load_sprite(sprites_dir: &Path, key: &str) -> Result<LoadedSprite, SpriteLoadError> {
    load_image_rgba(&sprite_path(sprites_dir, key)?)
}

pub(crate) fn load_image_rgba(path: &Path) -> Result<LoadedSprite, SpriteLoadError> {
    let reader = ImageReader::open(path).map_err(|source| SpriteLoadError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    let image = reader
        .decode()
        .map_err(|source| SpriteLoadError::Decode {
            path: path.to_path_buf(),
            source,
        })?
        .to_rgba8();
    Ok(LoadedSprite {
        width: image.width(),
        height: image.height(),
        rgba: image.into_raw(),
    })
}
