use engine::{MapObject, TiledMap, Vec2};
use tracing::{debug, info};

use super::dialogue::DialogueOrchestrator;
use super::entity::{Hero, Item, MapEntity};
use super::geometry::Rect;
use super::quest::{QuestBook, QuestStateError, QuestStatus};

pub(crate) const OBSTACLE_LAYER: &str = "obstacle";
pub(crate) const HOUSES_LAYER: &str = "houses";
pub(crate) const ZONES_LAYER: &str = "zones";
pub(crate) const SPAWN_LAYER: &str = "hero_start_position";

const EXIT_X_PROPERTY: &str = "exit_x";
const EXIT_Y_PROPERTY: &str = "exit_y";

/// House trigger: entering it moves the hero to `target`, at `exit` when the trigger names one.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct HouseTrigger {
    pub rect: Rect,
    pub target: String,
    pub exit: Option<Vec2>,
}

impl HouseTrigger {
    fn from_object(object: &MapObject) -> Self {
        let exit_x = object.properties.get_f32(EXIT_X_PROPERTY);
        let exit_y = object.properties.get_f32(EXIT_Y_PROPERTY);
        Self {
            rect: Rect::from_object(object),
            target: object.name.clone(),
            exit: exit_x.zip(exit_y).map(|(x, y)| Vec2::new(x, y)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct CameraSettings {
    pub zoom: f32,
    /// Keep the view inside the map bounds.
    pub clamp: bool,
    pub zoomable: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct MapTransition {
    pub target: String,
    pub exit: Option<Vec2>,
}

/// One loaded map: immutable trigger geometry plus the NPCs and items standing on it.
#[derive(Debug, Clone)]
pub(crate) struct WorldMap {
    name: String,
    tiles: TiledMap,
    obstacles: Vec<Rect>,
    houses: Vec<HouseTrigger>,
    zones: Vec<Rect>,
    spawn: Option<Vec2>,
    entities: Vec<MapEntity>,
    pub camera: CameraSettings,
}

impl WorldMap {
    pub(crate) fn from_tiled(tiles: TiledMap, camera: CameraSettings) -> Self {
        let rects = |layer: &str| -> Vec<Rect> {
            tiles.objects_in(layer).iter().map(Rect::from_object).collect()
        };
        let obstacles = rects(OBSTACLE_LAYER);
        let zones = rects(ZONES_LAYER);
        let houses: Vec<HouseTrigger> = tiles
            .objects_in(HOUSES_LAYER)
            .iter()
            .map(HouseTrigger::from_object)
            .collect();
        let spawn = tiles
            .objects_in(SPAWN_LAYER)
            .first()
            .map(|object| Vec2::new(object.x, object.y));

        info!(
            map = %tiles.name,
            obstacles = obstacles.len(),
            houses = houses.len(),
            zones = zones.len(),
            has_spawn = spawn.is_some(),
            "map_loaded"
        );

        Self {
            name: tiles.name.clone(),
            tiles,
            obstacles,
            houses,
            zones,
            spawn,
            entities: Vec::new(),
            camera,
        }
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn tiles(&self) -> &TiledMap {
        &self.tiles
    }

    pub(crate) fn spawn(&self) -> Option<Vec2> {
        self.spawn
    }

    pub(crate) fn houses(&self) -> &[HouseTrigger] {
        &self.houses
    }

    pub(crate) fn entities(&self) -> &[MapEntity] {
        &self.entities
    }

    pub(crate) fn entities_mut(&mut self) -> &mut [MapEntity] {
        &mut self.entities
    }

    pub(crate) fn contains_entity(&self, name: &str) -> bool {
        self.entities.iter().any(|entity| entity.name() == name)
    }

    #[cfg(test)]
    /// Names of everything on the map. The hero is a member of every map.
    pub(crate) fn entity_names<'a>(&'a self, hero: &'a Hero) -> Vec<&'a str> {
        std::iter::once(hero.name.as_str())
            .chain(self.entities.iter().map(MapEntity::name))
            .collect()
    }

    pub(crate) fn add_entity(&mut self, entity: MapEntity) {
        self.entities.push(entity);
    }

    /// Returns `false` when an entity with the item's name is already present.
    pub(crate) fn insert_item(&mut self, mut item: Item) -> bool {
        if self.contains_entity(&item.name) {
            return false;
        }
        item.visible = true;
        self.entities.push(MapEntity::Item(item));
        true
    }

    /// Returns `false` when no item with that name is present.
    pub(crate) fn remove_item(&mut self, name: &str) -> bool {
        let before = self.entities.len();
        self.entities
            .retain(|entity| !matches!(entity, MapEntity::Item(item) if item.name == name));
        self.entities.len() != before
    }

    /// Advances the hero and every NPC by `dt`, resolves obstacles and triggers, then applies
    /// the dialogue and item-pickup side effects of the new positions.
    pub(crate) fn update(
        &mut self,
        dt: f32,
        hero: &mut Hero,
        dialogue: &mut DialogueOrchestrator,
        quests: &mut QuestBook,
    ) -> Result<Option<MapTransition>, QuestStateError> {
        let transition = self.move_hero(dt, hero);
        self.move_npcs(dt);
        self.resolve_dialogue(hero, dialogue, quests)?;
        self.resolve_pickups(hero, dialogue, quests)?;
        Ok(transition)
    }

    fn move_hero(&self, dt: f32, hero: &mut Hero) -> Option<MapTransition> {
        hero.body.advance(dt);
        let feet = hero.body.feet();
        if feet.first_hit(&self.obstacles).is_some() {
            hero.body.rollback();
            return None;
        }

        let house = self.houses.iter().find(|house| feet.intersects(&house.rect))?;
        debug!(map = %self.name, target = %house.target, "house_entered");
        Some(MapTransition {
            target: house.target.clone(),
            exit: house.exit,
        })
    }

    fn move_npcs(&mut self, dt: f32) {
        for entity in &mut self.entities {
            let MapEntity::Npc(npc) = entity else {
                continue;
            };
            npc.body.advance(dt);
            let feet = npc.body.feet();
            if feet.first_hit(&self.obstacles).is_some() || feet.first_hit(&self.zones).is_some() {
                npc.body.rollback();
            }
        }
    }

    fn resolve_dialogue(
        &self,
        hero: &Hero,
        dialogue: &mut DialogueOrchestrator,
        quests: &mut QuestBook,
    ) -> Result<(), QuestStateError> {
        if !dialogue.wants_line() {
            return Ok(());
        }
        let hero_rect = hero.body.rect();
        let speaker = self.entities.iter().find_map(|entity| match entity {
            MapEntity::Npc(npc) if npc.body.rect().intersects(&hero_rect) => Some(npc),
            _ => None,
        });
        if let Some(npc) = speaker {
            dialogue.select_line(npc, quests)?;
        }
        Ok(())
    }

    fn resolve_pickups(
        &self,
        hero: &Hero,
        dialogue: &DialogueOrchestrator,
        quests: &mut QuestBook,
    ) -> Result<(), QuestStateError> {
        let Some(active) = dialogue.active_quest() else {
            return Ok(());
        };
        let hero_rect = hero.body.rect();
        let touched = self.entities.iter().any(|entity| {
            matches!(entity, MapEntity::Item(item) if item.quest == active && item.rect.intersects(&hero_rect))
        });
        if !touched {
            return Ok(());
        }

        let quest = quests.get_mut(active)?;
        if quest.status() == QuestStatus::Accepted && quest.progress().is_settled() {
            quest.stage(QuestStatus::ItemFound)?;
            quest.commit();
            info!(quest = %active, map = %self.name, "item_picked_up");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use engine::parse_tmx_map;

    use super::*;

    const HOUSE_TMX: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<map version="1.10" orientation="orthogonal" renderorder="right-down" width="4" height="4" tilewidth="32" tileheight="32" infinite="0">
 <objectgroup id="1" name="obstacle">
  <object id="1" x="90" y="0" width="20" height="20"/>
 </objectgroup>
 <objectgroup id="2" name="houses">
  <object id="2" name="restaurant.tmx" x="0" y="100" width="20" height="20">
   <properties>
    <property name="exit_x" type="float" value="380"/>
    <property name="exit_y" type="float" value="712"/>
   </properties>
  </object>
  <object id="3" name="tiana_house.tmx" x="60" y="100" width="20" height="20"/>
  <object id="4" name="half_exit" x="100" y="100" width="20" height="20">
   <properties>
    <property name="exit_x" value="12"/>
   </properties>
  </object>
 </objectgroup>
 <objectgroup id="3" name="zones">
  <object id="5" x="0" y="60" width="128" height="10"/>
 </objectgroup>
 <objectgroup id="4" name="hero_start_position">
  <object id="6" x="40" y="50"/>
 </objectgroup>
</map>
"#;

    fn map() -> WorldMap {
        let tiles = parse_tmx_map(Path::new("island.tmx"), HOUSE_TMX).expect("tmx");
        WorldMap::from_tiled(
            tiles,
            CameraSettings {
                zoom: 2.0,
                clamp: false,
                zoomable: true,
            },
        )
    }

    #[test]
    fn geometry_layers_are_collected() {
        let map = map();
        assert_eq!(map.name(), "island.tmx");
        assert_eq!(map.obstacles, vec![Rect::new(90, 0, 20, 20)]);
        assert_eq!(map.zones.len(), 1);
        assert_eq!(map.spawn(), Some(Vec2::new(40.0, 50.0)));
        assert_eq!(map.houses().len(), 3);
    }

    #[test]
    fn exit_coordinates_need_both_properties() {
        let map = map();
        assert_eq!(map.houses()[0].exit, Some(Vec2::new(380.0, 712.0)));
        assert_eq!(map.houses()[1].exit, None);
        assert_eq!(map.houses()[2].exit, None);
        assert_eq!(map.houses()[1].target, "tiana_house.tmx");
    }

    #[test]
    fn item_insert_and_remove_are_idempotent() {
        let mut map = map();
        let item = Item::new("fork", "items/ariel_00", "ariel", Vec2::ZERO, (16, 16));

        assert!(map.insert_item(item.clone()));
        assert!(!map.insert_item(item));
        assert_eq!(map.entities().len(), 1);
        assert!(matches!(&map.entities()[0], MapEntity::Item(item) if item.visible));

        assert!(map.remove_item("fork"));
        assert!(!map.remove_item("fork"));
        assert!(map.entities().is_empty());
    }
}
