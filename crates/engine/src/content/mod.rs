mod images;
mod sprites;
mod tmx;
mod types;

pub use images::ImageStore;
pub use sprites::{LoadedSprite, SpriteLoadError};
pub use tmx::{
    discover_tmx_files, load_tmx_map, parse_tmx_map, MapLoadError, MapLoadErrorCode,
    SourceLocation,
};
pub use types::{
    MapObject, ObjectLayer, Properties, PropertyValue, TileLayer, TileRegion, TiledMap, Tileset,
    TilesetImage, GID_FLIP_MASK,
};
