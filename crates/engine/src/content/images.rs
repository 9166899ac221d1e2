use std::collections::HashMap;
use std::path::{Path, PathBuf};

use super::sprites::{load_image_rgba, load_sprite, LoadedSprite, SpriteLoadError};
use super::types::TiledMap;

/// Every image the renderer may draw, decoded before the loop starts.
#[derive(Debug, Default)]
pub struct ImageStore {
    sprites: HashMap<String, LoadedSprite>,
    tiles: HashMap<PathBuf, LoadedSprite>,
}

impl ImageStore {
    /// Decodes `assets/sprites/<key>.png` once and returns its size.
    pub fn load_sprite(&mut self, sprites_dir: &Path, key: &str) -> Result<(u32, u32), SpriteLoadError> {
        if let Some(sprite) = self.sprites.get(key) {
            return Ok((sprite.width, sprite.height));
        }
        let sprite = load_sprite(sprites_dir, key)?;
        let size = (sprite.width, sprite.height);
        self.sprites.insert(key.to_string(), sprite);
        Ok(size)
    }

    /// Decodes every tileset image `map` references. Returns how many were new.
    pub fn load_tileset_images(&mut self, map: &TiledMap) -> Result<usize, SpriteLoadError> {
        let mut loaded = 0;
        for path in map.image_paths() {
            if self.tiles.contains_key(path) {
                continue;
            }
            let image = load_image_rgba(path)?;
            self.tiles.insert(path.to_path_buf(), image);
            loaded += 1;
        }
        Ok(loaded)
    }

    pub fn sprite(&self, key: &str) -> Option<&LoadedSprite> {
        self.sprites.get(key)
    }

    pub fn tile_image(&self, path: &Path) -> Option<&LoadedSprite> {
        self.tiles.get(path)
    }

    pub fn sprite_count(&self) -> usize {
        self.sprites.len()
    }

    pub fn tile_image_count(&self) -> usize {
        self.tiles.len()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::fs;

    use image::{Rgba, RgbaImage};
    use tempfile::TempDir;

    use super::*;
    use crate::content::{Tileset, TilesetImage};

    fn map_with_images(paths: &[PathBuf]) -> TiledMap {
        let tiles: BTreeMap<u32, PathBuf> = paths
            .iter()
            .enumerate()
            .map(|(id, path)| (id as u32, path.clone()))
            .collect();
        TiledMap {
            name: "restaurant.tmx".to_string(),
            width: 2,
            height: 2,
            tile_width: 16,
            tile_height: 16,
            tilesets: vec![Tileset {
                name: "props".to_string(),
                first_gid: 1,
                tile_width: 16,
                tile_height: 16,
                tile_count: paths.len() as u32,
                image: TilesetImage::Collection { tiles },
            }],
            tile_layers: Vec::new(),
            object_layers: Vec::new(),
        }
    }

    #[test]
    fn sprites_are_decoded_once_and_kept() {
        let temp = TempDir::new().expect("tempdir");
        RgbaImage::from_pixel(4, 6, Rgba([1, 2, 3, 255]))
            .save(temp.path().join("player_00.png"))
            .expect("png");

        let mut store = ImageStore::default();
        assert_eq!(store.load_sprite(temp.path(), "player_00").expect("load"), (4, 6));
        fs::remove_file(temp.path().join("player_00.png")).expect("remove");
        assert_eq!(store.load_sprite(temp.path(), "player_00").expect("cached"), (4, 6));
        assert_eq!(store.sprite("player_00").map(|s| s.width), Some(4));
        assert_eq!(store.sprite_count(), 1);
    }

    #[test]
    fn tileset_images_are_decoded_per_path() {
        let temp = TempDir::new().expect("tempdir");
        let barrel = temp.path().join("barrel.png");
        RgbaImage::from_pixel(16, 16, Rgba([9, 9, 9, 255]))
            .save(&barrel)
            .expect("png");

        let mut store = ImageStore::default();
        let map = map_with_images(&[barrel.clone(), barrel.clone()]);
        assert_eq!(store.load_tileset_images(&map).expect("load"), 1);
        assert_eq!(store.load_tileset_images(&map).expect("again"), 0);
        assert!(store.tile_image(&barrel).is_some());
        assert_eq!(store.tile_image_count(), 1);
    }

    #[test]
    fn missing_tileset_image_is_an_error() {
        let temp = TempDir::new().expect("tempdir");
        let mut store = ImageStore::default();
        let map = map_with_images(&[temp.path().join("missing.png")]);
        let error = store.load_tileset_images(&map).expect_err("must fail");
        assert!(matches!(error, SpriteLoadError::Open { .. }));
    }
}
