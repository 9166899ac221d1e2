mod renderer;
mod text;
mod transform;

pub(crate) use renderer::Renderer;
pub use transform::Viewport;

pub(crate) const PLACEHOLDER_SIZE_PX: u32 = 16;
