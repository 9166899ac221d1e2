use std::env;
use std::path::{Path, PathBuf};

use engine::{
    discover_tmx_files, load_tmx_map, resolve_app_paths, AppPaths, ImageStore, LoopConfig, Scene,
    StartupError, Viewport,
};
use thiserror::Error;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use super::quest_game::{
    build_world, load_world_config, AssetLoadError, QuestGame, World, WorldBuildError,
};

pub(crate) const WORLD_ENV_VAR: &str = "ROYAL_ISLAND_WORLD";
const DEFAULT_WORLD_FILE: &str = "quest/world.json";

pub(crate) struct AppWiring {
    pub(crate) config: LoopConfig,
    pub(crate) images: ImageStore,
    pub(crate) scene: Box<dyn Scene>,
}

#[derive(Debug, Error)]
pub(crate) enum BootstrapError {
    #[error(transparent)]
    Startup(#[from] StartupError),
    #[error(transparent)]
    World(#[from] WorldBuildError),
}

pub(crate) fn build_app() -> Result<AppWiring, BootstrapError> {
    init_tracing();
    info!("=== Royal Island Startup ===");

    let paths = resolve_app_paths()?;
    info!(
        root = %paths.root.display(),
        maps = %paths.maps_dir.display(),
        sprites = %paths.sprites_dir.display(),
        "startup_paths"
    );

    let world_path = resolve_world_path(&paths.assets_dir, env::var(WORLD_ENV_VAR).ok());
    let (world, images) = load_world(&paths, &world_path)?;

    let config = LoopConfig::default();
    let viewport = Viewport {
        width: config.window_width,
        height: config.window_height,
    };
    let scene = Box::new(QuestGame::new(world, viewport));

    Ok(AppWiring {
        config,
        images,
        scene,
    })
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_names(true)
        .compact()
        .init();
}

/// World content path: the override is relative to the assets dir; blank values are ignored.
fn resolve_world_path(assets_dir: &Path, override_value: Option<String>) -> PathBuf {
    match override_value.as_deref().map(str::trim) {
        Some(value) if !value.is_empty() => assets_dir.join(value),
        Some(_) => {
            warn!(var = WORLD_ENV_VAR, "world_override_blank_using_default");
            assets_dir.join(DEFAULT_WORLD_FILE)
        }
        None => assets_dir.join(DEFAULT_WORLD_FILE),
    }
}

/// Loads and decodes every map, tileset image and sprite up front; nothing is read from disk
/// once the loop runs.
fn load_world(paths: &AppPaths, world_path: &Path) -> Result<(World, ImageStore), WorldBuildError> {
    let config = load_world_config(world_path)?;
    info!(
        path = %world_path.display(),
        npcs = config.npcs.len(),
        quests = config.quests.len(),
        "world_config_loaded"
    );

    let map_files = discover_tmx_files(&paths.maps_dir).map_err(AssetLoadError::from)?;
    if map_files.is_empty() {
        return Err(AssetLoadError::NoMaps {
            path: paths.maps_dir.clone(),
        }
        .into());
    }
    let maps = map_files
        .iter()
        .map(|path| load_tmx_map(path).map_err(AssetLoadError::from))
        .collect::<Result<Vec<_>, _>>()?;

    let mut images = ImageStore::default();
    for map in &maps {
        images
            .load_tileset_images(map)
            .map_err(|source| AssetLoadError::Tileset {
                map: map.name.clone(),
                source,
            })?;
    }

    let sprite_size = |key: &str| -> Result<(u32, u32), AssetLoadError> {
        images
            .load_sprite(&paths.sprites_dir, key)
            .map_err(|source| AssetLoadError::Sprite {
                key: key.to_string(),
                source,
            })
    };
    let world = build_world(&config, maps, sprite_size)?;

    info!(
        tile_images = images.tile_image_count(),
        sprites = images.sprite_count(),
        "images_decoded"
    );
    Ok((world, images))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn world_path_defaults_under_assets() {
        let assets = Path::new("/game/assets");
        assert_eq!(
            resolve_world_path(assets, None),
            assets.join("quest").join("world.json")
        );
        assert_eq!(
            resolve_world_path(assets, Some("   ".to_string())),
            assets.join("quest").join("world.json")
        );
    }

    #[test]
    fn world_path_override_is_relative_to_assets() {
        let assets = Path::new("/game/assets");
        assert_eq!(
            resolve_world_path(assets, Some(" quest/short.json ".to_string())),
            assets.join("quest/short.json")
        );
    }

    const EMPTY_WORLD: &str = r#"{
        "start_map": "island_map.tmx",
        "overworld_camera": { "zoom": 2.0, "clamp": false, "zoomable": true },
        "interior_camera": { "zoom": 1.0, "clamp": true, "zoomable": false },
        "hero": { "name": "player_00", "sprite": "player_00" },
        "npcs": [],
        "quests": []
    }"#;

    fn temp_paths(root: &tempfile::TempDir) -> (AppPaths, PathBuf) {
        let paths = AppPaths::from_root(root.path().to_path_buf());
        std::fs::create_dir_all(&paths.maps_dir).expect("maps dir");
        let world_path = paths.assets_dir.join("world.json");
        std::fs::write(&world_path, EMPTY_WORLD).expect("world file");
        (paths, world_path)
    }

    #[test]
    fn empty_maps_dir_is_an_asset_error() {
        let root = tempfile::tempdir().expect("tempdir");
        let (paths, world_path) = temp_paths(&root);

        let error = load_world(&paths, &world_path)
            .map(|_| ())
            .expect_err("no maps");
        assert!(matches!(
            error,
            WorldBuildError::Asset(AssetLoadError::NoMaps { .. })
        ));
    }

    #[test]
    fn missing_sprite_fails_startup() {
        let root = tempfile::tempdir().expect("tempdir");
        let (paths, world_path) = temp_paths(&root);
        std::fs::write(
            paths.maps_dir.join("island_map.tmx"),
            r#"<map orientation="orthogonal" width="4" height="4" tilewidth="32" tileheight="32"/>"#,
        )
        .expect("map file");

        let error = load_world(&paths, &world_path)
            .map(|_| ())
            .expect_err("sprite missing");
        match error {
            WorldBuildError::Asset(AssetLoadError::Sprite { key, .. }) => {
                assert_eq!(key, "player_00");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn missing_tileset_image_fails_startup() {
        let root = tempfile::tempdir().expect("tempdir");
        let (paths, world_path) = temp_paths(&root);
        std::fs::write(
            paths.maps_dir.join("island_map.tmx"),
            r#"<map orientation="orthogonal" width="2" height="1" tilewidth="32" tileheight="32">
 <tileset firstgid="1" name="terrain" tilewidth="32" tileheight="32" tilecount="5" columns="5">
  <image source="missing.png" width="160" height="32"/>
 </tileset>
 <layer id="1" name="ground" width="2" height="1">
  <data encoding="csv">1,2</data>
 </layer>
</map>"#,
        )
        .expect("map file");

        let error = load_world(&paths, &world_path)
            .map(|_| ())
            .expect_err("tileset image missing");
        match error {
            WorldBuildError::Asset(AssetLoadError::Tileset { map, .. }) => {
                assert_eq!(map, "island_map.tmx");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn shipped_assets_are_decoded_before_the_loop() {
        let root = Path::new(env!("CARGO_MANIFEST_DIR")).join("../..");
        let paths = AppPaths::from_root(root);
        let world_path = paths.assets_dir.join(DEFAULT_WORLD_FILE);

        let (_, images) = load_world(&paths, &world_path).expect("shipped world");
        assert_eq!(images.tile_image_count(), 1);
        assert!(images.tile_image(&paths.maps_dir.join("terrain.png")).is_some());
        // Hero, four NPCs and four quest items.
        assert_eq!(images.sprite_count(), 9);
        assert!(images.sprite("items/ariel_00").is_some());
    }
}
