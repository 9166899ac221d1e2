mod content;
mod dialogue;
mod entity;
mod geometry;
mod placement;
mod quest;
mod registry;
mod wander;
mod world_map;


use engine::{
    InputAction, InputEvent, InputSnapshot, Scene, SceneCommand, SceneError, SceneView, SpriteDraw,
    TextBubble, Vec2, Viewport,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, info};

pub(crate) use content::{build_world, load_world_config, AssetLoadError, World, WorldBuildError};

use dialogue::DialogueOrchestrator;
use entity::MapEntity;
use quest::{QuestBook, QuestStateError};
use registry::MapRegistry;
use wander::WanderTuning;

pub(crate) const SCENE_NAME: &str = "royal_island";

/// The island world as a [`Scene`]: one fixed tick per `update` call.
pub(crate) struct QuestGame {
    registry: MapRegistry,
    quests: QuestBook,
    dialogue: DialogueOrchestrator,
    wander: WanderTuning,
    rng: StdRng,
    move_speed: f32,
    viewport: Viewport,
}

impl QuestGame {
    pub(crate) fn new(world: World, viewport: Viewport) -> Self {
        let rng = match world.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self::with_rng(world, viewport, rng)
    }

    pub(crate) fn with_rng(world: World, viewport: Viewport, rng: StdRng) -> Self {
        Self {
            registry: world.registry,
            quests: world.quests,
            dialogue: DialogueOrchestrator::default(),
            wander: WanderTuning::default(),
            rng,
            move_speed: world.move_speed,
            viewport,
        }
    }

    fn step(&mut self, dt: f32, input: &InputSnapshot) -> Result<SceneCommand, QuestStateError> {
        self.sync_viewport(input);
        if self.handle_events(input)? == SceneCommand::Quit {
            return Ok(SceneCommand::Quit);
        }
        self.steer_hero(input);
        self.wander_npcs(dt);

        let transition = {
            let (map, hero) = self.registry.active_parts_mut();
            map.update(dt, hero, &mut self.dialogue, &mut self.quests)?
        };
        // A door leading back into the map it stands on changes nothing.
        if let Some(transition) = transition {
            if transition.target != self.registry.active_map().name() {
                self.registry.switch_to(&transition.target, transition.exit)?;
            }
        }

        placement::sync_active_quest_item(
            self.dialogue.active_quest(),
            &self.quests,
            &mut self.registry,
        )?;
        Ok(SceneCommand::Continue)
    }

    /// The window reports its physical size every tick, which can differ from the configured
    /// size before any resize event arrives.
    fn sync_viewport(&mut self, input: &InputSnapshot) {
        let (width, height) = input.window_size();
        if width == 0 || height == 0 {
            return;
        }
        let viewport = Viewport { width, height };
        if viewport != self.viewport {
            debug!(width, height, "viewport_synced");
            self.viewport = viewport;
        }
    }

    fn handle_events(&mut self, input: &InputSnapshot) -> Result<SceneCommand, QuestStateError> {
        for event in input.events() {
            match *event {
                InputEvent::Quit | InputEvent::KeyDown(InputAction::Quit) => {
                    info!("quit_requested");
                    return Ok(SceneCommand::Quit);
                }
                InputEvent::KeyDown(InputAction::ZoomIn) => self.registry.zoom_in(),
                InputEvent::KeyDown(InputAction::ZoomOut) => self.registry.zoom_out(),
                InputEvent::KeyDown(InputAction::Talk) => {
                    self.dialogue.toggle_talk(&mut self.quests)?;
                }
                InputEvent::KeyDown(_) => {}
                InputEvent::Resize { width, height } => {
                    debug!(width, height, "viewport_resized");
                    self.viewport = Viewport { width, height };
                }
            }
        }
        Ok(SceneCommand::Continue)
    }

    /// Up wins over down and left over right.
    fn steer_hero(&mut self, input: &InputSnapshot) {
        let speed = self.move_speed;
        let axis = |negative: InputAction, positive: InputAction| {
            if input.is_down(negative) {
                -speed
            } else if input.is_down(positive) {
                speed
            } else {
                0.0
            }
        };
        let velocity = Vec2::new(
            axis(InputAction::MoveLeft, InputAction::MoveRight),
            axis(InputAction::MoveUp, InputAction::MoveDown),
        );
        self.registry.hero_mut().body.set_velocity(velocity);
    }

    /// NPCs in contact with the hero hold still in their wander decisions.
    fn wander_npcs(&mut self, dt: f32) {
        let hero_rect = self.registry.hero().body.rect();
        let (map, _) = self.registry.active_parts_mut();
        for entity in map.entities_mut() {
            let MapEntity::Npc(npc) = entity else {
                continue;
            };
            if npc.body.rect().intersects(&hero_rect) {
                continue;
            }
            let mut velocity = npc.body.velocity();
            npc.wander
                .advance(dt, &self.wander, &mut self.rng, &mut velocity);
            npc.body.set_velocity(velocity);
        }
    }

    fn bubble_anchor(&self) -> (i32, i32) {
        (
            (self.viewport.width / 2) as i32,
            (self.viewport.height / 3) as i32,
        )
    }
}

impl Scene for QuestGame {
    fn name(&self) -> &str {
        SCENE_NAME
    }

    fn update(
        &mut self,
        fixed_dt_seconds: f32,
        input: &InputSnapshot,
    ) -> Result<SceneCommand, SceneError> {
        self.step(fixed_dt_seconds, input)
            .map_err(|error| SceneError::new(SCENE_NAME, error))
    }

    fn view(&self) -> SceneView<'_> {
        let map = self.registry.active_map();
        let hero = self.registry.hero();

        let mut layered: Vec<(i32, SpriteDraw<'_>)> = map
            .entities()
            .iter()
            .filter(|entity| match entity {
                MapEntity::Npc(_) => true,
                MapEntity::Item(item) => item.visible,
            })
            .map(|entity| {
                (
                    entity.rect().bottom(),
                    SpriteDraw {
                        sprite_key: entity.sprite_key(),
                        top_left: entity.top_left(),
                    },
                )
            })
            .collect();
        layered.push((
            hero.body.rect().bottom(),
            SpriteDraw {
                sprite_key: &hero.sprite_key,
                top_left: hero.body.position(),
            },
        ));
        layered.sort_by_key(|(bottom, _)| *bottom);

        SceneView {
            map: map.tiles(),
            camera: self.registry.camera_view(self.viewport),
            sprites: layered.into_iter().map(|(_, sprite)| sprite).collect(),
            bubble: self
                .dialogue
                .current_line()
                .map(|line| TextBubble::from_text(&line.text, self.bubble_anchor())),
        }
    }

    fn shutdown(&mut self) {
        let completed = self
            .quests
            .iter()
            .filter(|quest| quest.status() == quest::QuestStatus::Completed)
            .count();
        info!(
            map = %self.registry.active_map().name(),
            completed_quests = completed,
            total_quests = self.quests.len(),
            "scene_shutdown"
        );
    }
}
