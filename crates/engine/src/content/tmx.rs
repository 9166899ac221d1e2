use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use roxmltree::{Document, Node};

use super::types::{
    MapObject, ObjectLayer, Properties, PropertyValue, TileLayer, TiledMap, Tileset, TilesetImage,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceLocation {
    pub line: usize,
    pub column: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapLoadErrorCode {
    Discovery,
    ReadFile,
    XmlMalformed,
    InvalidRoot,
    MissingAttribute,
    InvalidValue,
    UnsupportedFeature,
}

#[derive(Debug, Clone)]
pub struct MapLoadError {
    pub code: MapLoadErrorCode,
    pub message: String,
    pub file_path: PathBuf,
    pub location: Option<SourceLocation>,
}

impl fmt::Display for MapLoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.location {
            Some(loc) => write!(
                f,
                "{:?}: {} (file={}, line={}, column={})",
                self.code,
                self.message,
                self.file_path.display(),
                loc.line,
                loc.column
            ),
            None => write!(
                f,
                "{:?}: {} (file={})",
                self.code,
                self.message,
                self.file_path.display()
            ),
        }
    }
}

impl std::error::Error for MapLoadError {}

pub fn load_tmx_map(file_path: &Path) -> Result<TiledMap, MapLoadError> {
    let raw = read_file(file_path)?;
    parse_tmx_map(file_path, &raw)
}

/// Parses a TMX document. `file_path` names the map and anchors relative tileset and image paths.
pub fn parse_tmx_map(file_path: &Path, raw: &str) -> Result<TiledMap, MapLoadError> {
    let doc = parse_document(file_path, raw)?;
    let ctx = XmlContext {
        file_path,
        doc: &doc,
    };
    let root = doc.root_element();
    if root.tag_name().name() != "map" {
        return Err(ctx.error_at(
            root,
            MapLoadErrorCode::InvalidRoot,
            "root element must be <map>".to_string(),
        ));
    }
    let orientation = root.attribute("orientation").unwrap_or("orthogonal");
    if orientation != "orthogonal" {
        return Err(ctx.error_at(
            root,
            MapLoadErrorCode::UnsupportedFeature,
            format!("orientation '{orientation}' is not supported; only orthogonal maps load"),
        ));
    }
    if root.attribute("infinite") == Some("1") {
        return Err(ctx.error_at(
            root,
            MapLoadErrorCode::UnsupportedFeature,
            "infinite maps are not supported".to_string(),
        ));
    }

    let base_dir = parent_dir(file_path);
    let mut map = TiledMap {
        name: file_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default(),
        width: ctx.required_u32(root, "width")?,
        height: ctx.required_u32(root, "height")?,
        tile_width: ctx.required_u32(root, "tilewidth")?,
        tile_height: ctx.required_u32(root, "tileheight")?,
        tilesets: Vec::new(),
        tile_layers: Vec::new(),
        object_layers: Vec::new(),
    };

    for child in root.children().filter(|node| node.is_element()) {
        match child.tag_name().name() {
            "tileset" => map.tilesets.push(ctx.parse_tileset_ref(child, &base_dir)?),
            _ => ctx.collect_layer(child, &mut map)?,
        }
    }
    map.tilesets.sort_by_key(|tileset| tileset.first_gid);

    Ok(map)
}

/// Every `.tmx` below `dir`, sorted by path.
pub fn discover_tmx_files(dir: &Path) -> Result<Vec<PathBuf>, MapLoadError> {
    let mut files = Vec::new();
    collect_tmx_recursive(dir, &mut files)?;
    files.sort();
    Ok(files)
}

fn collect_tmx_recursive(current: &Path, files: &mut Vec<PathBuf>) -> Result<(), MapLoadError> {
    let entries = fs::read_dir(current).map_err(|error| MapLoadError {
        code: MapLoadErrorCode::Discovery,
        message: format!("failed to list map directory: {error}"),
        file_path: current.to_path_buf(),
        location: None,
    })?;
    for entry in entries {
        let path = entry
            .map_err(|error| MapLoadError {
                code: MapLoadErrorCode::Discovery,
                message: format!("failed to read map directory entry: {error}"),
                file_path: current.to_path_buf(),
                location: None,
            })?
            .path();
        if path.is_dir() {
            collect_tmx_recursive(&path, files)?;
        } else if path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("tmx"))
        {
            files.push(path);
        }
    }
    Ok(())
}

fn read_file(file_path: &Path) -> Result<String, MapLoadError> {
    fs::read_to_string(file_path).map_err(|error| MapLoadError {
        code: MapLoadErrorCode::ReadFile,
        message: format!("failed to read file: {error}"),
        file_path: file_path.to_path_buf(),
        location: None,
    })
}

fn parse_document<'input>(
    file_path: &Path,
    raw: &'input str,
) -> Result<Document<'input>, MapLoadError> {
    Document::parse(raw).map_err(|error| MapLoadError {
        code: MapLoadErrorCode::XmlMalformed,
        message: format!("malformed XML: {error}"),
        file_path: file_path.to_path_buf(),
        location: Some(SourceLocation {
            line: error.pos().row as usize,
            column: error.pos().col as usize,
        }),
    })
}

fn parent_dir(file_path: &Path) -> PathBuf {
    file_path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default()
}

struct XmlContext<'a, 'input> {
    file_path: &'a Path,
    doc: &'a Document<'input>,
}

impl<'a, 'input> XmlContext<'a, 'input> {
    fn error_at(
        &self,
        node: Node<'_, '_>,
        code: MapLoadErrorCode,
        message: String,
    ) -> MapLoadError {
        let pos = self.doc.text_pos_at(node.range().start);
        MapLoadError {
            code,
            message,
            file_path: self.file_path.to_path_buf(),
            location: Some(SourceLocation {
                line: pos.row as usize,
                column: pos.col as usize,
            }),
        }
    }

    fn required_attr<'n>(
        &self,
        node: Node<'n, 'input>,
        name: &str,
    ) -> Result<&'n str, MapLoadError> {
        node.attribute(name).ok_or_else(|| {
            self.error_at(
                node,
                MapLoadErrorCode::MissingAttribute,
                format!(
                    "missing required attribute '{name}' on <{}>",
                    node.tag_name().name()
                ),
            )
        })
    }

    fn required_u32(&self, node: Node<'_, 'input>, name: &str) -> Result<u32, MapLoadError> {
        let value = self.required_attr(node, name)?;
        self.parse_u32(node, name, value)
    }

    fn optional_u32(
        &self,
        node: Node<'_, 'input>,
        name: &str,
        default: u32,
    ) -> Result<u32, MapLoadError> {
        match node.attribute(name) {
            Some(value) => self.parse_u32(node, name, value),
            None => Ok(default),
        }
    }

    fn optional_f32(
        &self,
        node: Node<'_, 'input>,
        name: &str,
        default: f32,
    ) -> Result<f32, MapLoadError> {
        let Some(value) = node.attribute(name) else {
            return Ok(default);
        };
        match value.trim().parse::<f32>() {
            Ok(parsed) if parsed.is_finite() => Ok(parsed),
            _ => Err(self.error_at(
                node,
                MapLoadErrorCode::InvalidValue,
                format!("attribute '{name}'='{value}' is not a finite number"),
            )),
        }
    }

    fn parse_u32(
        &self,
        node: Node<'_, 'input>,
        name: &str,
        value: &str,
    ) -> Result<u32, MapLoadError> {
        value.trim().parse::<u32>().map_err(|_| {
            self.error_at(
                node,
                MapLoadErrorCode::InvalidValue,
                format!("attribute '{name}'='{value}' is not a non-negative integer"),
            )
        })
    }

    fn parse_tileset_ref(
        &self,
        node: Node<'_, 'input>,
        base_dir: &Path,
    ) -> Result<Tileset, MapLoadError> {
        let first_gid = self.required_u32(node, "firstgid")?;
        let Some(source) = node.attribute("source") else {
            return self.parse_tileset_body(node, first_gid, base_dir);
        };

        let tsx_path = base_dir.join(source);
        let raw = read_file(&tsx_path)?;
        let doc = parse_document(&tsx_path, &raw)?;
        let tsx_ctx = XmlContext {
            file_path: &tsx_path,
            doc: &doc,
        };
        let root = doc.root_element();
        if root.tag_name().name() != "tileset" {
            return Err(tsx_ctx.error_at(
                root,
                MapLoadErrorCode::InvalidRoot,
                "root element must be <tileset>".to_string(),
            ));
        }
        tsx_ctx.parse_tileset_body(root, first_gid, &parent_dir(&tsx_path))
    }

    fn parse_tileset_body(
        &self,
        node: Node<'_, 'input>,
        first_gid: u32,
        image_dir: &Path,
    ) -> Result<Tileset, MapLoadError> {
        let tile_width = self.required_u32(node, "tilewidth")?;
        let tile_height = self.required_u32(node, "tileheight")?;
        let mut tile_count = self.optional_u32(node, "tilecount", 0)?;
        let columns = self.optional_u32(node, "columns", 0)?;
        let margin = self.optional_u32(node, "margin", 0)?;
        let spacing = self.optional_u32(node, "spacing", 0)?;

        let atlas_image = node
            .children()
            .find(|child| child.has_tag_name("image"))
            .map(|image| self.required_attr(image, "source"))
            .transpose()?;

        let image = match atlas_image {
            Some(source) => TilesetImage::Atlas {
                path: image_dir.join(source),
                columns,
                margin,
                spacing,
            },
            None => {
                let mut tiles = BTreeMap::new();
                for tile in node.children().filter(|child| child.has_tag_name("tile")) {
                    let Some(image) = tile.children().find(|child| child.has_tag_name("image"))
                    else {
                        continue;
                    };
                    let id = self.required_u32(tile, "id")?;
                    tiles.insert(id, image_dir.join(self.required_attr(image, "source")?));
                }
                if let Some(max_id) = tiles.keys().next_back() {
                    tile_count = tile_count.max(max_id + 1);
                }
                TilesetImage::Collection { tiles }
            }
        };

        Ok(Tileset {
            name: node.attribute("name").unwrap_or_default().to_string(),
            first_gid,
            tile_width,
            tile_height,
            tile_count,
            image,
        })
    }

    fn collect_layer(&self, node: Node<'_, 'input>, map: &mut TiledMap) -> Result<(), MapLoadError> {
        match node.tag_name().name() {
            "layer" => map.tile_layers.push(self.parse_tile_layer(node)?),
            "objectgroup" => map.object_layers.push(self.parse_object_layer(node)?),
            "group" => {
                for child in node.children().filter(|child| child.is_element()) {
                    self.collect_layer(child, map)?;
                }
            }
            // imagelayer, properties, editorsettings carry nothing the game reads.
            _ => {}
        }
        Ok(())
    }

    fn parse_tile_layer(&self, node: Node<'_, 'input>) -> Result<TileLayer, MapLoadError> {
        let width = self.required_u32(node, "width")?;
        let height = self.required_u32(node, "height")?;
        let data = node
            .children()
            .find(|child| child.has_tag_name("data"))
            .ok_or_else(|| {
                self.error_at(
                    node,
                    MapLoadErrorCode::MissingAttribute,
                    "tile layer has no <data> element".to_string(),
                )
            })?;

        let gids = match data.attribute("encoding") {
            Some("csv") => self.parse_csv_gids(data)?,
            None => data
                .children()
                .filter(|child| child.has_tag_name("tile"))
                .map(|tile| self.optional_u32(tile, "gid", 0))
                .collect::<Result<Vec<_>, _>>()?,
            Some(other) => {
                return Err(self.error_at(
                    data,
                    MapLoadErrorCode::UnsupportedFeature,
                    format!("tile data encoding '{other}' is not supported; save the map as CSV"),
                ))
            }
        };

        let expected = width as usize * height as usize;
        if gids.len() != expected {
            return Err(self.error_at(
                data,
                MapLoadErrorCode::InvalidValue,
                format!(
                    "tile layer has {} gids, expected {expected} ({width}x{height})",
                    gids.len()
                ),
            ));
        }

        Ok(TileLayer {
            name: node.attribute("name").unwrap_or_default().to_string(),
            width,
            height,
            visible: node.attribute("visible") != Some("0"),
            gids,
        })
    }

    fn parse_csv_gids(&self, data: Node<'_, 'input>) -> Result<Vec<u32>, MapLoadError> {
        data.text()
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|cell| !cell.is_empty())
            .map(|cell| {
                cell.parse::<u32>().map_err(|_| {
                    self.error_at(
                        data,
                        MapLoadErrorCode::InvalidValue,
                        format!("tile gid '{cell}' is not a valid number"),
                    )
                })
            })
            .collect()
    }

    fn parse_object_layer(&self, node: Node<'_, 'input>) -> Result<ObjectLayer, MapLoadError> {
        let objects = node
            .children()
            .filter(|child| child.has_tag_name("object"))
            .map(|object| self.parse_object(object))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ObjectLayer {
            name: node.attribute("name").unwrap_or_default().to_string(),
            objects,
        })
    }

    fn parse_object(&self, node: Node<'_, 'input>) -> Result<MapObject, MapLoadError> {
        let gid = node
            .attribute("gid")
            .map(|value| self.parse_u32(node, "gid", value))
            .transpose()?;
        let width = self.optional_f32(node, "width", 0.0)?;
        let height = self.optional_f32(node, "height", 0.0)?;
        let mut y = self.optional_f32(node, "y", 0.0)?;
        // Tile objects are anchored at their bottom-left corner.
        if gid.is_some() {
            y -= height;
        }

        Ok(MapObject {
            id: self.optional_u32(node, "id", 0)?,
            name: node.attribute("name").unwrap_or_default().to_string(),
            class: node
                .attribute("class")
                .or_else(|| node.attribute("type"))
                .unwrap_or_default()
                .to_string(),
            x: self.optional_f32(node, "x", 0.0)?,
            y,
            width,
            height,
            gid,
            properties: self.parse_properties(node)?,
        })
    }

    fn parse_properties(&self, owner: Node<'_, 'input>) -> Result<Properties, MapLoadError> {
        let mut properties = Properties::default();
        let Some(block) = owner
            .children()
            .find(|child| child.has_tag_name("properties"))
        else {
            return Ok(properties);
        };

        for property in block
            .children()
            .filter(|child| child.has_tag_name("property"))
        {
            let name = self.required_attr(property, "name")?;
            let raw = property
                .attribute("value")
                .or_else(|| property.text())
                .unwrap_or_default();
            let invalid = || {
                self.error_at(
                    property,
                    MapLoadErrorCode::InvalidValue,
                    format!("property '{name}' has invalid value '{raw}'"),
                )
            };
            let value = match property.attribute("type").unwrap_or("string") {
                "int" | "object" => PropertyValue::Int(raw.trim().parse().map_err(|_| invalid())?),
                "float" => PropertyValue::Float(raw.trim().parse().map_err(|_| invalid())?),
                "bool" => match raw.trim() {
                    "true" | "1" => PropertyValue::Bool(true),
                    "false" | "0" => PropertyValue::Bool(false),
                    _ => return Err(invalid()),
                },
                _ => PropertyValue::String(raw.to_string()),
            };
            properties.insert(name, value);
        }
        Ok(properties)
    }
}
