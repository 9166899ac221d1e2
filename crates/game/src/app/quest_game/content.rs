use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use engine::{MapLoadError, SpriteLoadError, TiledMap, Vec2};
use serde::Deserialize;
use thiserror::Error;
use tracing::info;

use super::dialogue::DialogueLines;
use super::entity::{Body, Hero, Item, MapEntity, Npc};
use super::quest::{Quest, QuestBook};
use super::registry::MapRegistry;
use super::wander::Wander;
use super::world_map::{CameraSettings, WorldMap};

pub(crate) const DEFAULT_MOVE_SPEED: f32 = 200.0;

/// Map files or sprites that are missing or unreadable.
#[derive(Debug, Error)]
pub(crate) enum AssetLoadError {
    #[error(transparent)]
    Map(#[from] MapLoadError),
    #[error("failed to load sprite '{key}'")]
    Sprite {
        key: String,
        #[source]
        source: SpriteLoadError,
    },
    #[error("failed to load a tileset image of map '{map}'")]
    Tileset {
        map: String,
        #[source]
        source: SpriteLoadError,
    },
    #[error("no .tmx maps found under {path}")]
    NoMaps { path: PathBuf },
}

/// World content that does not fit together.
#[derive(Debug, Error)]
pub(crate) enum ConfigError {
    #[error("failed to read world config {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid world config {path} at '{field}'")]
    Parse {
        path: PathBuf,
        field: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("npc '{npc}' refers to unknown quest '{quest}'")]
    UnknownQuest { npc: String, quest: String },
    #[error("quest '{quest}' is placed on map '{map}', which is not loaded")]
    QuestMapMissing { quest: String, map: String },
    #[error("start map '{map}' is not loaded")]
    StartMapMissing { map: String },
    #[error("house on map '{map}' leads to unknown map '{target}'")]
    UnknownHouseTarget { map: String, target: String },
    #[error("entity name '{name}' is used twice on map '{map}'")]
    DuplicateEntity { map: String, name: String },
    #[error("quest '{quest}' is declared twice")]
    DuplicateQuest { quest: String },
    #[error("map '{map}' is loaded twice")]
    DuplicateMap { map: String },
    #[error("{field} must be a positive number, got {value}")]
    NotPositive { field: &'static str, value: f32 },
}

#[derive(Debug, Error)]
pub(crate) enum WorldBuildError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Asset(#[from] AssetLoadError),
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct CameraConfig {
    pub zoom: f32,
    pub clamp: bool,
    pub zoomable: bool,
}

impl From<CameraConfig> for CameraSettings {
    fn from(config: CameraConfig) -> Self {
        Self {
            zoom: config.zoom,
            clamp: config.clamp,
            zoomable: config.zoomable,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct HeroConfig {
    pub name: String,
    pub sprite: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct NpcConfig {
    pub name: String,
    pub sprite: String,
    pub x: f32,
    pub y: f32,
    pub quest: String,
    pub dialogue: DialogueLines,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct ItemConfig {
    pub name: String,
    pub sprite: String,
    pub x: f32,
    pub y: f32,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct QuestConfig {
    pub name: String,
    pub location: String,
    pub item: ItemConfig,
}

/// Contents of `assets/quest/world.json`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct WorldConfig {
    pub start_map: String,
    pub overworld_camera: CameraConfig,
    pub interior_camera: CameraConfig,
    pub hero: HeroConfig,
    #[serde(default = "default_move_speed")]
    pub move_speed: f32,
    /// Fixed wander seed; absent means seeded from the OS.
    #[serde(default)]
    pub seed: Option<u64>,
    pub npcs: Vec<NpcConfig>,
    pub quests: Vec<QuestConfig>,
}

fn default_move_speed() -> f32 {
    DEFAULT_MOVE_SPEED
}

pub(crate) fn load_world_config(path: &Path) -> Result<WorldConfig, ConfigError> {
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_world_config(path, &raw)
}

pub(crate) fn parse_world_config(path: &Path, raw: &str) -> Result<WorldConfig, ConfigError> {
    let mut deserializer = serde_json::Deserializer::from_str(raw);
    serde_path_to_error::deserialize::<_, WorldConfig>(&mut deserializer).map_err(|error| {
        let field = error.path().to_string();
        ConfigError::Parse {
            path: path.to_path_buf(),
            field,
            source: error.into_inner(),
        }
    })
}

/// Everything the quest scene owns once content is wired together.
#[derive(Debug)]
pub(crate) struct World {
    pub registry: MapRegistry,
    pub quests: QuestBook,
    pub move_speed: f32,
    pub seed: Option<u64>,
}

/// Builds maps, hero, NPCs and quests from loaded maps and `config`. `sprite_size` returns the
/// pixel size of a sprite key and fails when the sprite cannot be loaded.
pub(crate) fn build_world<F>(
    config: &WorldConfig,
    tiled_maps: Vec<TiledMap>,
    mut sprite_size: F,
) -> Result<World, WorldBuildError>
where
    F: FnMut(&str) -> Result<(u32, u32), AssetLoadError>,
{
    validate_config(config)?;

    let map_names: HashSet<String> = tiled_maps.iter().map(|map| map.name.clone()).collect();
    if !map_names.contains(&config.start_map) {
        return Err(ConfigError::StartMapMissing {
            map: config.start_map.clone(),
        }
        .into());
    }

    let mut quests = QuestBook::default();
    for quest in &config.quests {
        if !map_names.contains(&quest.location) {
            return Err(ConfigError::QuestMapMissing {
                quest: quest.name.clone(),
                map: quest.location.clone(),
            }
            .into());
        }
        let size = sprite_size(&quest.item.sprite)?;
        let item = Item::new(
            quest.item.name.clone(),
            quest.item.sprite.clone(),
            quest.name.clone(),
            Vec2::new(quest.item.x, quest.item.y),
            size,
        );
        quests.insert(Quest::new(quest.name.clone(), quest.location.clone(), item));
    }

    let mut maps = Vec::with_capacity(tiled_maps.len());
    for tiles in tiled_maps {
        let camera = if tiles.name == config.start_map {
            config.overworld_camera
        } else {
            config.interior_camera
        };
        maps.push(WorldMap::from_tiled(tiles, camera.into()));
    }
    for map in &maps {
        if let Some(house) = map
            .houses()
            .iter()
            .find(|house| !map_names.contains(&house.target))
        {
            return Err(ConfigError::UnknownHouseTarget {
                map: map.name().to_string(),
                target: house.target.clone(),
            }
            .into());
        }
    }

    let hero_size = sprite_size(&config.hero.sprite)?;
    let mut start_position = None;
    for map in maps.iter_mut().filter(|map| map.name() == config.start_map) {
        for npc in &config.npcs {
            if !quests.contains(&npc.quest) {
                return Err(ConfigError::UnknownQuest {
                    npc: npc.name.clone(),
                    quest: npc.quest.clone(),
                }
                .into());
            }
            let size = sprite_size(&npc.sprite)?;
            map.add_entity(MapEntity::Npc(Npc {
                name: npc.name.clone(),
                sprite_key: npc.sprite.clone(),
                quest: npc.quest.clone(),
                lines: npc.dialogue.clone(),
                body: Body::new(Vec2::new(npc.x, npc.y), size),
                wander: Wander::default(),
            }));
        }
        let tiles = map.tiles();
        start_position = Some(
            map.spawn()
                .unwrap_or_else(|| Vec2::new(tiles.pixel_width() / 2.0, tiles.pixel_height() / 2.0)),
        );
    }

    let hero = Hero {
        name: config.hero.name.clone(),
        sprite_key: config.hero.sprite.clone(),
        body: Body::new(start_position.unwrap_or(Vec2::ZERO), hero_size),
    };
    check_entity_names(config, &hero)?;

    let registry = MapRegistry::new(maps, &config.start_map, hero)?;
    info!(
        maps = registry.maps().count(),
        quests = quests.len(),
        npcs = config.npcs.len(),
        start_map = %config.start_map,
        "world_built"
    );

    Ok(World {
        registry,
        quests,
        move_speed: config.move_speed,
        seed: config.seed,
    })
}

fn validate_config(config: &WorldConfig) -> Result<(), ConfigError> {
    let positive = [
        ("overworld_camera.zoom", config.overworld_camera.zoom),
        ("interior_camera.zoom", config.interior_camera.zoom),
        ("move_speed", config.move_speed),
    ];
    for (field, value) in positive {
        if !(value.is_finite() && value > 0.0) {
            return Err(ConfigError::NotPositive { field, value });
        }
    }

    let mut seen = HashSet::new();
    for quest in &config.quests {
        if !seen.insert(quest.name.as_str()) {
            return Err(ConfigError::DuplicateQuest {
                quest: quest.name.clone(),
            });
        }
    }
    Ok(())
}

/// Names must be unique per map: the hero is on every map, NPCs on the start map, and each
/// quest item on its quest's map.
fn check_entity_names(config: &WorldConfig, hero: &Hero) -> Result<(), ConfigError> {
    let mut claimed: HashSet<(&str, &str)> = HashSet::new();
    let start = config.start_map.as_str();
    let npc_names = config.npcs.iter().map(|npc| (start, npc.name.as_str()));
    let item_names = config
        .quests
        .iter()
        .map(|quest| (quest.location.as_str(), quest.item.name.as_str()));

    for (map, name) in npc_names.chain(item_names) {
        if name == hero.name || !claimed.insert((map, name)) {
            return Err(ConfigError::DuplicateEntity {
                map: map.to_string(),
                name: name.to_string(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const WORLD_JSON: &str = r#"{
        "start_map": "island_map.tmx",
        "overworld_camera": { "zoom": 2.0, "clamp": false, "zoomable": true },
        "interior_camera": { "zoom": 1.0, "clamp": true, "zoomable": false },
        "hero": { "name": "player_00", "sprite": "player_00" },
        "npcs": [
            {
                "name": "ariel_00", "sprite": "ariel_00", "x": 1315, "y": 600, "quest": "ariel_00_quest",
                "dialogue": { "1": "a", "2": "b", "3": "c", "4": "d", "5": "e" }
            }
        ],
        "quests": [
            {
                "name": "ariel_00_quest", "location": "restaurant.tmx",
                "item": { "name": "fork", "sprite": "items/ariel_00", "x": 550, "y": 421 }
            }
        ]
    }"#;

    #[test]
    fn world_config_parses_with_defaults() {
        let config = parse_world_config(Path::new("world.json"), WORLD_JSON).expect("config");
        assert_eq!(config.start_map, "island_map.tmx");
        assert_eq!(config.move_speed, DEFAULT_MOVE_SPEED);
        assert_eq!(config.seed, None);
        assert_eq!(config.npcs[0].dialogue.offer, "a");
        assert_eq!(config.quests[0].item.x, 550.0);
    }

    #[test]
    fn parse_errors_name_the_offending_field() {
        let broken = WORLD_JSON.replace(r#""x": 550"#, r#""x": "far""#);
        let error = parse_world_config(Path::new("world.json"), &broken).expect_err("must fail");
        match error {
            ConfigError::Parse { field, .. } => assert_eq!(field, "quests[0].item.x"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn missing_dialogue_line_is_rejected() {
        let broken = WORLD_JSON.replace(r#", "5": "e""#, "");
        let error = parse_world_config(Path::new("world.json"), &broken).expect_err("must fail");
        assert!(matches!(error, ConfigError::Parse { .. }));
    }

    #[test]
    fn non_positive_zoom_is_rejected() {
        let mut config = parse_world_config(Path::new("world.json"), WORLD_JSON).expect("config");
        config.interior_camera.zoom = 0.0;
        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::NotPositive {
                field: "interior_camera.zoom",
                ..
            })
        ));
    }

    #[test]
    fn load_reports_missing_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let error = load_world_config(&dir.path().join("absent.json")).expect_err("must fail");
        assert!(matches!(error, ConfigError::Read { .. }));
    }

    #[test]
    fn load_reads_file_from_disk() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("world.json");
        fs::write(&path, WORLD_JSON).expect("write");
        let config = load_world_config(&path).expect("config");
        assert_eq!(config.quests.len(), 1);
    }
}
