use std::collections::HashMap;

use engine::{CameraView, Vec2, Viewport};
use tracing::info;

use super::content::ConfigError;
use super::entity::Hero;
use super::quest::QuestStateError;
use super::world_map::WorldMap;

pub(crate) const ZOOM_STEP: f32 = 0.25;

/// All maps by name, the active one, and the single hero shared by all of them.
#[derive(Debug)]
pub(crate) struct MapRegistry {
    maps: Vec<WorldMap>,
    by_name: HashMap<String, usize>,
    active: usize,
    hero: Hero,
}

impl MapRegistry {
    pub(crate) fn new(maps: Vec<WorldMap>, start_map: &str, hero: Hero) -> Result<Self, ConfigError> {
        let mut by_name = HashMap::with_capacity(maps.len());
        for (index, map) in maps.iter().enumerate() {
            if by_name.insert(map.name().to_string(), index).is_some() {
                return Err(ConfigError::DuplicateMap {
                    map: map.name().to_string(),
                });
            }
        }
        let active = *by_name
            .get(start_map)
            .ok_or_else(|| ConfigError::StartMapMissing {
                map: start_map.to_string(),
            })?;

        Ok(Self {
            maps,
            by_name,
            active,
            hero,
        })
    }

    pub(crate) fn hero(&self) -> &Hero {
        &self.hero
    }

    pub(crate) fn hero_mut(&mut self) -> &mut Hero {
        &mut self.hero
    }

    pub(crate) fn active_map(&self) -> &WorldMap {
        &self.maps[self.active]
    }

    /// The active map and the hero, borrowed together for a frame update.
    pub(crate) fn active_parts_mut(&mut self) -> (&mut WorldMap, &mut Hero) {
        (&mut self.maps[self.active], &mut self.hero)
    }

    #[cfg(test)]
    pub(crate) fn map(&self, name: &str) -> Option<&WorldMap> {
        self.by_name.get(name).map(|&index| &self.maps[index])
    }

    pub(crate) fn map_mut(&mut self, name: &str) -> Option<&mut WorldMap> {
        let index = *self.by_name.get(name)?;
        Some(&mut self.maps[index])
    }

    pub(crate) fn maps(&self) -> impl Iterator<Item = &WorldMap> {
        self.maps.iter()
    }

    /// Makes `name` the active map. The hero lands on `exit` when given, otherwise on the map's
    /// spawn point; with neither the hero stays where it is.
    pub(crate) fn switch_to(&mut self, name: &str, exit: Option<Vec2>) -> Result<(), QuestStateError> {
        let index = *self
            .by_name
            .get(name)
            .ok_or_else(|| QuestStateError::UnknownMap {
                map: name.to_string(),
            })?;
        let from = self.maps[self.active].name().to_string();
        self.active = index;

        if let Some(position) = exit.or(self.maps[index].spawn()) {
            self.hero.body.place_at(position);
        }
        info!(
            from = %from,
            to = %name,
            explicit_exit = exit.is_some(),
            "map_switched"
        );
        Ok(())
    }

    pub(crate) fn zoom_in(&mut self) {
        let camera = &mut self.maps[self.active].camera;
        if camera.zoomable {
            camera.zoom += ZOOM_STEP;
        }
    }

    /// Zoom stays strictly positive.
    pub(crate) fn zoom_out(&mut self) {
        let camera = &mut self.maps[self.active].camera;
        let next = camera.zoom - ZOOM_STEP;
        if camera.zoomable && next > 0.0 {
            camera.zoom = next;
        }
    }

    /// Camera centred on the hero; clamped maps keep the view inside the map bounds.
    pub(crate) fn camera_view(&self, viewport: Viewport) -> CameraView {
        let map = self.active_map();
        let zoom = map.camera.zoom;
        let mut center = self.hero.body.rect().center();
        if map.camera.clamp {
            let tiles = map.tiles();
            center.x = clamp_axis(center.x, viewport.width as f32 / zoom, tiles.pixel_width());
            center.y = clamp_axis(center.y, viewport.height as f32 / zoom, tiles.pixel_height());
        }
        CameraView { center, zoom }
    }
}

fn clamp_axis(center: f32, visible: f32, extent: f32) -> f32 {
    if extent <= visible {
        return extent / 2.0;
    }
    let half = visible / 2.0;
    center.clamp(half, extent - half)
}
