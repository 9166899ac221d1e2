use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Tiled stores flip flags in the top bits of every gid.
pub const GID_FLIP_MASK: u32 = 0xF000_0000;

#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    String(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl PropertyValue {
    pub fn as_f32(&self) -> Option<f32> {
        match self {
            PropertyValue::Int(value) => Some(*value as f32),
            PropertyValue::Float(value) => Some(*value as f32),
            PropertyValue::String(value) => value.trim().parse().ok(),
            PropertyValue::Bool(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropertyValue::String(value) => Some(value),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Properties(BTreeMap<String, PropertyValue>);

impl Properties {
    pub fn insert(&mut self, name: impl Into<String>, value: PropertyValue) {
        self.0.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<&PropertyValue> {
        self.0.get(name)
    }

    pub fn get_f32(&self, name: &str) -> Option<f32> {
        self.get(name).and_then(PropertyValue::as_f32)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MapObject {
    pub id: u32,
    pub name: String,
    pub class: String,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub gid: Option<u32>,
    pub properties: Properties,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ObjectLayer {
    pub name: String,
    pub objects: Vec<MapObject>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TileLayer {
    pub name: String,
    pub width: u32,
    pub height: u32,
    pub visible: bool,
    /// Row-major, 0 means empty.
    pub gids: Vec<u32>,
}

impl TileLayer {
    pub fn gid_at(&self, x: u32, y: u32) -> Option<u32> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let gid = *self.gids.get((y * self.width + x) as usize)?;
        (gid & !GID_FLIP_MASK != 0).then_some(gid & !GID_FLIP_MASK)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TilesetImage {
    /// One image cut into a grid of `columns` tiles.
    Atlas {
        path: PathBuf,
        columns: u32,
        margin: u32,
        spacing: u32,
    },
    /// One image per tile, keyed by local tile id.
    Collection { tiles: BTreeMap<u32, PathBuf> },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Tileset {
    pub name: String,
    pub first_gid: u32,
    pub tile_width: u32,
    pub tile_height: u32,
    pub tile_count: u32,
    pub image: TilesetImage,
}

impl Tileset {
    fn contains(&self, gid: u32) -> bool {
        gid >= self.first_gid && gid - self.first_gid < self.tile_count.max(1)
    }
}

/// Source rectangle of one tile inside an image file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileRegion<'a> {
    pub image: &'a Path,
    pub src_x: u32,
    pub src_y: u32,
    /// `None` for collection tiles, which use the whole image.
    pub size: Option<(u32, u32)>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TiledMap {
    pub name: String,
    pub width: u32,
    pub height: u32,
    pub tile_width: u32,
    pub tile_height: u32,
    pub tilesets: Vec<Tileset>,
    pub tile_layers: Vec<TileLayer>,
    pub object_layers: Vec<ObjectLayer>,
}

impl TiledMap {
    pub fn pixel_width(&self) -> f32 {
        (self.width * self.tile_width) as f32
    }

    pub fn pixel_height(&self) -> f32 {
        (self.height * self.tile_height) as f32
    }

    pub fn object_layer(&self, name: &str) -> Option<&ObjectLayer> {
        self.object_layers.iter().find(|layer| layer.name == name)
    }

    pub fn objects_in(&self, layer_name: &str) -> &[MapObject] {
        self.object_layer(layer_name)
            .map(|layer| layer.objects.as_slice())
            .unwrap_or_default()
    }

    /// Every image file the map's tilesets reference, in tileset order.
    pub fn image_paths(&self) -> impl Iterator<Item = &Path> {
        self.tilesets.iter().flat_map(|tileset| {
            let (atlas, collection) = match &tileset.image {
                TilesetImage::Atlas { path, .. } => (Some(path.as_path()), None),
                TilesetImage::Collection { tiles } => (None, Some(tiles.values())),
            };
            atlas
                .into_iter()
                .chain(collection.into_iter().flatten().map(PathBuf::as_path))
        })
    }

    pub fn tile_region(&self, gid: u32) -> Option<TileRegion<'_>> {
        let gid = gid & !GID_FLIP_MASK;
        // Tilesets are sorted by first gid; the owner is the last one starting at or below it.
        let tileset = self
            .tilesets
            .iter()
            .rev()
            .find(|tileset| gid >= tileset.first_gid)
            .filter(|tileset| tileset.contains(gid))?;
        let local_id = gid - tileset.first_gid;
        match &tileset.image {
            TilesetImage::Atlas {
                path,
                columns,
                margin,
                spacing,
            } => {
                let columns = (*columns).max(1);
                let column = local_id % columns;
                let row = local_id / columns;
                Some(TileRegion {
                    image: path,
                    src_x: margin + column * (tileset.tile_width + spacing),
                    src_y: margin + row * (tileset.tile_height + spacing),
                    size: Some((tileset.tile_width, tileset.tile_height)),
                })
            }
            TilesetImage::Collection { tiles } => tiles.get(&local_id).map(|path| TileRegion {
                image: path,
                src_x: 0,
                src_y: 0,
                size: None,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn atlas(first_gid: u32, tile_count: u32, columns: u32) -> Tileset {
        Tileset {
            name: format!("ts{first_gid}"),
            first_gid,
            tile_width: 16,
            tile_height: 16,
            tile_count,
            image: TilesetImage::Atlas {
                path: PathBuf::from(format!("ts{first_gid}.png")),
                columns,
                margin: 0,
                spacing: 0,
            },
        }
    }

    fn map_with(tilesets: Vec<Tileset>) -> TiledMap {
        TiledMap {
            name: "test.tmx".to_string(),
            width: 4,
            height: 3,
            tile_width: 16,
            tile_height: 16,
            tilesets,
            tile_layers: Vec::new(),
            object_layers: Vec::new(),
        }
    }

    #[test]
    fn gid_resolves_to_owning_tileset_region() {
        let map = map_with(vec![atlas(1, 8, 4), atlas(9, 4, 2)]);

        let first = map.tile_region(6).expect("first tileset");
        assert_eq!(first.image, Path::new("ts1.png"));
        assert_eq!((first.src_x, first.src_y), (16, 16));

        let second = map.tile_region(12).expect("second tileset");
        assert_eq!(second.image, Path::new("ts9.png"));
        assert_eq!((second.src_x, second.src_y), (16, 16));

        assert!(map.tile_region(13).is_none());
        assert!(map.tile_region(0).is_none());
    }

    #[test]
    fn image_paths_cover_atlases_and_collections() {
        let mut tiles = BTreeMap::new();
        tiles.insert(0, PathBuf::from("props/barrel.png"));
        tiles.insert(4, PathBuf::from("props/crate.png"));
        let collection = Tileset {
            name: "props".to_string(),
            first_gid: 9,
            tile_width: 32,
            tile_height: 32,
            tile_count: 2,
            image: TilesetImage::Collection { tiles },
        };
        let map = map_with(vec![atlas(1, 8, 4), collection]);

        let paths: Vec<&Path> = map.image_paths().collect();
        assert_eq!(
            paths,
            vec![
                Path::new("ts1.png"),
                Path::new("props/barrel.png"),
                Path::new("props/crate.png"),
            ]
        );
    }

    #[test]
    fn flip_flags_are_ignored() {
        let map = map_with(vec![atlas(1, 8, 4)]);
        assert_eq!(map.tile_region(0x8000_0002), map.tile_region(2));
    }

    #[test]
    fn layer_lookup_treats_zero_as_empty() {
        let layer = TileLayer {
            name: "ground".to_string(),
            width: 2,
            height: 1,
            visible: true,
            gids: vec![0, 5],
        };
        assert_eq!(layer.gid_at(0, 0), None);
        assert_eq!(layer.gid_at(1, 0), Some(5));
        assert_eq!(layer.gid_at(2, 0), None);
    }

    #[test]
    fn properties_coerce_numbers() {
        let mut properties = Properties::default();
        properties.insert("exit_x", PropertyValue::Int(380));
        properties.insert("exit_y", PropertyValue::String(" 712.5 ".to_string()));
        properties.insert("locked", PropertyValue::Bool(true));

        assert_eq!(properties.get_f32("exit_x"), Some(380.0));
        assert_eq!(properties.get_f32("exit_y"), Some(712.5));
        assert_eq!(properties.get_f32("locked"), None);
        assert_eq!(properties.get_f32("missing"), None);
    }

    #[test]
    fn pixel_size_follows_tile_grid() {
        let map = map_with(Vec::new());
        assert_eq!(map.pixel_width(), 64.0);
        assert_eq!(map.pixel_height(), 48.0);
    }
}
