mod input;
mod loop_runner;
mod metrics;
mod rendering;
mod scene;

pub use input::InputAction;
pub use loop_runner::{run_app, AppError, LoopConfig, SLOW_FRAME_ENV_VAR};
pub use rendering::Viewport;
pub(crate) use rendering::Renderer;
pub use scene::{
    CameraView, InputEvent, InputSnapshot, Scene, SceneCommand, SceneError, SceneView, SpriteDraw,
    TextBubble, Vec2,
};
