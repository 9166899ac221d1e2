use std::error::Error as StdError;

use thiserror::Error;

use super::input::{ActionStates, InputAction};
use crate::content::TiledMap;

/// World-space vector in map pixels, y pointing down.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SceneCommand {
    Continue,
    Quit,
}

/// Discrete events queued between frames. Delivered once, on the first tick of a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
    Quit,
    KeyDown(InputAction),
    Resize { width: u32, height: u32 },
}

#[derive(Debug, Clone, Default)]
pub struct InputSnapshot {
    events: Vec<InputEvent>,
    actions: ActionStates,
    window_width: u32,
    window_height: u32,
}

impl InputSnapshot {
    pub fn empty() -> Self {
        Self::default()
    }

    pub(crate) fn new(
        events: Vec<InputEvent>,
        actions: ActionStates,
        window_width: u32,
        window_height: u32,
    ) -> Self {
        Self {
            events,
            actions,
            window_width,
            window_height,
        }
    }

    pub fn events(&self) -> &[InputEvent] {
        &self.events
    }

    pub fn is_down(&self, action: InputAction) -> bool {
        self.actions.is_down(action)
    }

    pub fn with_event(mut self, event: InputEvent) -> Self {
        self.events.push(event);
        self
    }

    pub fn with_action_down(mut self, action: InputAction, is_down: bool) -> Self {
        self.actions.set(action, is_down);
        self
    }

    pub fn with_window_size(mut self, window_size: (u32, u32)) -> Self {
        self.window_width = window_size.0;
        self.window_height = window_size.1;
        self
    }

    pub fn window_size(&self) -> (u32, u32) {
        (self.window_width, self.window_height)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraView {
    pub center: Vec2,
    pub zoom: f32,
}

impl Default for CameraView {
    fn default() -> Self {
        Self {
            center: Vec2::ZERO,
            zoom: 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpriteDraw<'a> {
    pub sprite_key: &'a str,
    pub top_left: Vec2,
}

/// Screen-space speech bubble. `anchor_px` is the bubble centre.
#[derive(Debug, Clone, PartialEq)]
pub struct TextBubble {
    pub lines: Vec<String>,
    pub anchor_px: (i32, i32),
    pub text_color: [u8; 4],
    pub background: [u8; 4],
}

impl TextBubble {
    pub const WHITE: [u8; 4] = [255, 255, 255, 255];
    pub const BLACK: [u8; 4] = [0, 0, 0, 255];

    /// Splits on newlines and trims the padding spaces dialogue text carries around them.
    pub fn from_text(text: &str, anchor_px: (i32, i32)) -> Self {
        Self {
            lines: text.lines().map(|line| line.trim().to_string()).collect(),
            anchor_px,
            text_color: Self::WHITE,
            background: Self::BLACK,
        }
    }
}

/// Everything the renderer needs for one frame. Sprites are drawn in slice order.
#[derive(Debug, Clone)]
pub struct SceneView<'a> {
    pub map: &'a TiledMap,
    pub camera: CameraView,
    pub sprites: Vec<SpriteDraw<'a>>,
    pub bubble: Option<TextBubble>,
}

#[derive(Debug, Error)]
#[error("scene '{scene}' failed: {source}")]
pub struct SceneError {
    pub scene: String,
    #[source]
    pub source: Box<dyn StdError + Send + Sync>,
}

impl SceneError {
    pub fn new(scene: impl Into<String>, source: impl Into<Box<dyn StdError + Send + Sync>>) -> Self {
        Self {
            scene: scene.into(),
            source: source.into(),
        }
    }
}

pub trait Scene {
    fn name(&self) -> &str;

    fn update(
        &mut self,
        fixed_dt_seconds: f32,
        input: &InputSnapshot,
    ) -> Result<SceneCommand, SceneError>;

    fn view(&self) -> SceneView<'_>;

    fn shutdown(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_builders_compose() {
        let snapshot = InputSnapshot::empty()
            .with_event(InputEvent::KeyDown(InputAction::Talk))
            .with_event(InputEvent::Resize {
                width: 640,
                height: 480,
            })
            .with_action_down(InputAction::MoveUp, true)
            .with_window_size((640, 480));

        assert_eq!(snapshot.events().len(), 2);
        assert!(snapshot.is_down(InputAction::MoveUp));
        assert!(!snapshot.is_down(InputAction::MoveDown));
        assert_eq!(snapshot.window_size(), (640, 480));
    }

    #[test]
    fn bubble_splits_and_trims_dialogue_lines() {
        let bubble = TextBubble::from_text("Hello, I have lost my fork. \n Can you find it for me?", (400, 200));
        assert_eq!(
            bubble.lines,
            vec![
                "Hello, I have lost my fork.".to_string(),
                "Can you find it for me?".to_string()
            ]
        );
        assert_eq!(bubble.background, TextBubble::BLACK);
    }

    #[test]
    fn scene_error_keeps_source_message() {
        let error = SceneError::new("quest_game", "future status regressed");
        assert_eq!(
            error.to_string(),
            "scene 'quest_game' failed: future status regressed"
        );
    }
}
