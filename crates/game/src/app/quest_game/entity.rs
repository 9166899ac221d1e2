use engine::Vec2;

use super::dialogue::DialogueLines;
use super::geometry::Rect;
use super::wander::Wander;

pub(crate) const FEET_HEIGHT: i32 = 8;

/// Position, velocity and the two collision rects shared by the hero and NPCs.
///
/// `position` is authoritative; both rects are recomputed from it after every mutation, and
/// the feet rect (half width, [`FEET_HEIGHT`] tall) always shares the body rect's bottom-centre.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Body {
    position: Vec2,
    old_position: Vec2,
    velocity: Vec2,
    size: (i32, i32),
    rect: Rect,
    feet: Rect,
}

impl Body {
    pub(crate) fn new(position: Vec2, size: (u32, u32)) -> Self {
        let mut body = Self {
            position,
            old_position: position,
            velocity: Vec2::ZERO,
            size: (size.0 as i32, size.1 as i32),
            rect: Rect::default(),
            feet: Rect::default(),
        };
        body.sync_rects();
        body
    }

    pub(crate) fn position(&self) -> Vec2 {
        self.position
    }

    #[cfg(test)]
    pub(crate) fn old_position(&self) -> Vec2 {
        self.old_position
    }

    pub(crate) fn velocity(&self) -> Vec2 {
        self.velocity
    }

    pub(crate) fn set_velocity(&mut self, velocity: Vec2) {
        self.velocity = velocity;
    }

    pub(crate) fn rect(&self) -> Rect {
        self.rect
    }

    pub(crate) fn feet(&self) -> Rect {
        self.feet
    }

    /// Teleport: the rollback snapshot moves too, so a later rollback cannot undo it.
    pub(crate) fn place_at(&mut self, position: Vec2) {
        self.position = position;
        self.old_position = position;
        self.sync_rects();
    }

    /// Speculative move by `velocity * dt`; see [`Body::rollback`].
    pub(crate) fn advance(&mut self, dt: f32) {
        self.old_position = self.position;
        self.position.x += self.velocity.x * dt;
        self.position.y += self.velocity.y * dt;
        self.sync_rects();
    }

    pub(crate) fn rollback(&mut self) {
        self.position = self.old_position;
        self.sync_rects();
    }

    fn sync_rects(&mut self) {
        self.rect = Rect::with_top_left(self.position, self.size);
        self.feet = Rect::anchored_mid_bottom(self.rect.mid_bottom(), self.size.0 / 2, FEET_HEIGHT);
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Hero {
    pub name: String,
    pub sprite_key: String,
    pub body: Body,
}

#[derive(Debug, Clone)]
pub(crate) struct Npc {
    pub name: String,
    pub sprite_key: String,
    pub quest: String,
    pub lines: DialogueLines,
    pub body: Body,
    pub wander: Wander,
}

/// Collectible quest item. Has no feet: it never moves and only the body rect is tested.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Item {
    pub name: String,
    pub sprite_key: String,
    pub quest: String,
    pub position: Vec2,
    pub rect: Rect,
    pub visible: bool,
}

impl Item {
    pub(crate) fn new(
        name: impl Into<String>,
        sprite_key: impl Into<String>,
        quest: impl Into<String>,
        position: Vec2,
        size: (u32, u32),
    ) -> Self {
        Self {
            name: name.into(),
            sprite_key: sprite_key.into(),
            quest: quest.into(),
            position,
            rect: Rect::with_top_left(position, (size.0 as i32, size.1 as i32)),
            visible: false,
        }
    }
}

/// Everything a map holds besides the hero.
#[derive(Debug, Clone)]
pub(crate) enum MapEntity {
    Npc(Npc),
    Item(Item),
}

impl MapEntity {
    pub(crate) fn name(&self) -> &str {
        match self {
            MapEntity::Npc(npc) => &npc.name,
            MapEntity::Item(item) => &item.name,
        }
    }

    pub(crate) fn sprite_key(&self) -> &str {
        match self {
            MapEntity::Npc(npc) => &npc.sprite_key,
            MapEntity::Item(item) => &item.sprite_key,
        }
    }

    pub(crate) fn rect(&self) -> Rect {
        match self {
            MapEntity::Npc(npc) => npc.body.rect(),
            MapEntity::Item(item) => item.rect,
        }
    }

    pub(crate) fn top_left(&self) -> Vec2 {
        match self {
            MapEntity::Npc(npc) => npc.body.position(),
            MapEntity::Item(item) => item.position,
        }
    }
}
