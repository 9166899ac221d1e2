use std::collections::HashSet;
use std::sync::Arc;

use pixels::{Error, Pixels, SurfaceTexture};
use tracing::warn;
use winit::window::Window;

use crate::app::{CameraView, SceneView, Vec2};
use crate::content::{ImageStore, LoadedSprite, TiledMap};

use super::text::{draw_bubble, fill_rect_clipped};
use super::transform::{screen_to_world, world_to_screen};
use super::{Viewport, PLACEHOLDER_SIZE_PX};

const CLEAR_COLOR: [u8; 4] = [18, 52, 86, 255];
const PLACEHOLDER_COLOR: [u8; 4] = [236, 72, 153, 255];
const TILE_FALLBACK_COLORS: [[u8; 4]; 4] = [
    [74, 112, 56, 255],
    [112, 83, 58, 255],
    [196, 178, 128, 255],
    [68, 74, 62, 255],
];
// Collection tiles can be taller than a cell and hang above it.
const TILE_CULL_PADDING: u32 = 2;

/// Draws from images decoded at startup; the render path never reads from disk.
pub struct Renderer {
    window: Arc<Window>,
    pixels: Pixels<'static>,
    viewport: Viewport,
    images: ImageStore,
    warned_missing: HashSet<String>,
}

impl Renderer {
    pub fn new(window: Arc<Window>, images: ImageStore) -> Result<Self, Error> {
        let size = window.inner_size();
        let pixels = Self::build_pixels(Arc::clone(&window), size.width, size.height)?;
        Ok(Self {
            window,
            pixels,
            viewport: Viewport {
                width: size.width,
                height: size.height,
            },
            images,
            warned_missing: HashSet::new(),
        })
    }

    pub fn resize(&mut self, width: u32, height: u32) -> Result<(), Error> {
        if width == 0 || height == 0 {
            return Ok(());
        }
        self.pixels = Self::build_pixels(Arc::clone(&self.window), width, height)?;
        self.viewport = Viewport { width, height };
        Ok(())
    }

    fn build_pixels(
        window: Arc<Window>,
        width: u32,
        height: u32,
    ) -> Result<Pixels<'static>, Error> {
        let surface = SurfaceTexture::new(width, height, window);
        Pixels::new(width.max(1), height.max(1), surface)
    }

    /// Tiles first, then sprites in the order given, then the bubble on top.
    pub fn render(&mut self, view: &SceneView<'_>) -> Result<(), Error> {
        let viewport = self.viewport;
        if viewport.width == 0 || viewport.height == 0 {
            return Ok(());
        }

        let images = &self.images;
        let warned_missing = &mut self.warned_missing;
        let frame = self.pixels.frame_mut();
        for chunk in frame.chunks_exact_mut(4) {
            chunk.copy_from_slice(&CLEAR_COLOR);
        }

        draw_tile_layers(frame, viewport, view.map, &view.camera, images);

        for sprite in &view.sprites {
            let (left, top) = world_to_screen(sprite.top_left, &view.camera, viewport);
            let image = images.sprite(sprite.sprite_key);
            if image.is_none() && warned_missing.insert(sprite.sprite_key.to_string()) {
                warn!(sprite = sprite.sprite_key, "renderer_sprite_missing_using_placeholder");
            }
            match image {
                Some(image) => {
                    let dest = (
                        left,
                        top,
                        scaled_len(image.width, view.camera.zoom),
                        scaled_len(image.height, view.camera.zoom),
                    );
                    draw_region_scaled(
                        frame,
                        viewport,
                        dest,
                        image,
                        (0, 0, image.width, image.height),
                    );
                }
                None => {
                    let size = scaled_len(PLACEHOLDER_SIZE_PX, view.camera.zoom);
                    fill_rect_clipped(
                        frame,
                        viewport.width,
                        viewport.height,
                        (left, top, size, size),
                        PLACEHOLDER_COLOR,
                    );
                }
            }
        }

        if let Some(bubble) = &view.bubble {
            draw_bubble(frame, viewport.width, viewport.height, bubble);
        }

        self.pixels.render()
    }
}

fn draw_tile_layers(
    frame: &mut [u8],
    viewport: Viewport,
    map: &TiledMap,
    camera: &CameraView,
    images: &ImageStore,
) {
    let Some(range) = visible_tile_range(map, camera, viewport) else {
        return;
    };
    let tile_w = map.tile_width as f32;
    let tile_h = map.tile_height as f32;

    for layer in map.tile_layers.iter().filter(|layer| layer.visible) {
        for y in range.y_min..range.y_max {
            for x in range.x_min..range.x_max {
                let Some(gid) = layer.gid_at(x, y) else {
                    continue;
                };
                let (left, top) = world_to_screen(
                    Vec2::new(x as f32 * tile_w, y as f32 * tile_h),
                    camera,
                    viewport,
                );
                let (right, bottom) = world_to_screen(
                    Vec2::new((x + 1) as f32 * tile_w, (y + 1) as f32 * tile_h),
                    camera,
                    viewport,
                );

                let Some(region) = map.tile_region(gid) else {
                    draw_tile_fallback(frame, viewport, (left, top, right - left, bottom - top), gid);
                    continue;
                };
                let Some(image) = images.tile_image(region.image) else {
                    draw_tile_fallback(frame, viewport, (left, top, right - left, bottom - top), gid);
                    continue;
                };

                match region.size {
                    Some((src_w, src_h)) => draw_region_scaled(
                        frame,
                        viewport,
                        (left, top, right - left, bottom - top),
                        image,
                        (region.src_x, region.src_y, src_w, src_h),
                    ),
                    None => {
                        let dest_w = scaled_len(image.width, camera.zoom);
                        let dest_h = scaled_len(image.height, camera.zoom);
                        draw_region_scaled(
                            frame,
                            viewport,
                            (left, bottom - dest_h, dest_w, dest_h),
                            image,
                            (0, 0, image.width, image.height),
                        );
                    }
                }
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct TileRange {
    x_min: u32,
    x_max: u32,
    y_min: u32,
    y_max: u32,
}

/// Half-open tile index range covering the viewport.
fn visible_tile_range(map: &TiledMap, camera: &CameraView, viewport: Viewport) -> Option<TileRange> {
    if map.tile_width == 0 || map.tile_height == 0 {
        return None;
    }
    let top_left = screen_to_world((0, 0), camera, viewport);
    let bottom_right = screen_to_world(
        (viewport.width as i32, viewport.height as i32),
        camera,
        viewport,
    );
    let tile_w = map.tile_width as f32;
    let tile_h = map.tile_height as f32;

    let clamp_index = |value: f32, upper: u32| -> u32 { value.max(0.0).min(upper as f32) as u32 };
    let range = TileRange {
        x_min: clamp_index((top_left.x / tile_w).floor(), map.width)
            .saturating_sub(TILE_CULL_PADDING),
        x_max: clamp_index((bottom_right.x / tile_w).ceil(), map.width),
        y_min: clamp_index((top_left.y / tile_h).floor(), map.height)
            .saturating_sub(TILE_CULL_PADDING),
        y_max: clamp_index(
            (bottom_right.y / tile_h).ceil() + TILE_CULL_PADDING as f32,
            map.height,
        ),
    };
    (range.x_min < range.x_max && range.y_min < range.y_max).then_some(range)
}

fn scaled_len(len: u32, zoom: f32) -> i32 {
    let zoom = if zoom.is_finite() && zoom > 0.0 { zoom } else { 1.0 };
    (len as f32 * zoom).round().max(1.0) as i32
}

fn draw_tile_fallback(frame: &mut [u8], viewport: Viewport, dest: (i32, i32, i32, i32), gid: u32) {
    let color = TILE_FALLBACK_COLORS[gid as usize % TILE_FALLBACK_COLORS.len()];
    fill_rect_clipped(frame, viewport.width, viewport.height, dest, color);
}

/// Nearest-neighbour blit of `src` (x, y, w, h) into `dest` (left, top, w, h) with alpha blending.
fn draw_region_scaled(
    frame: &mut [u8],
    viewport: Viewport,
    dest: (i32, i32, i32, i32),
    image: &LoadedSprite,
    src: (u32, u32, u32, u32),
) {
    let (dest_left, dest_top, dest_w, dest_h) = dest;
    let (src_x, src_y, src_w, src_h) = src;
    if dest_w <= 0 || dest_h <= 0 || src_w == 0 || src_h == 0 {
        return;
    }
    if src_x + src_w > image.width || src_y + src_h > image.height {
        return;
    }
    if image.rgba.len() < image.width as usize * image.height as usize * 4 {
        return;
    }

    let draw_left = dest_left.max(0);
    let draw_top = dest_top.max(0);
    let draw_right = dest_left.saturating_add(dest_w).min(viewport.width as i32);
    let draw_bottom = dest_top.saturating_add(dest_h).min(viewport.height as i32);
    if draw_left >= draw_right || draw_top >= draw_bottom {
        return;
    }

    let frame_width = viewport.width as usize;
    let image_width = image.width as usize;
    for out_y in draw_top..draw_bottom {
        let dy = (out_y - dest_top) as u64;
        let sample_y = src_y as usize + (dy * src_h as u64 / dest_h as u64) as usize;
        for out_x in draw_left..draw_right {
            let dx = (out_x - dest_left) as u64;
            let sample_x = src_x as usize + (dx * src_w as u64 / dest_w as u64) as usize;
            let src_offset = (sample_y * image_width + sample_x) * 4;
            let dst_offset = (out_y as usize * frame_width + out_x as usize) * 4;
            let (Some(source), Some(target)) = (
                image.rgba.get(src_offset..src_offset + 4),
                frame.get_mut(dst_offset..dst_offset + 4),
            ) else {
                continue;
            };
            blend_pixel(target, source);
        }
    }
}

fn blend_pixel(target: &mut [u8], source: &[u8]) {
    let alpha = source[3] as u32;
    match alpha {
        0 => {}
        255 => target.copy_from_slice(source),
        _ => {
            for channel in 0..3 {
                let blended =
                    (source[channel] as u32 * alpha + target[channel] as u32 * (255 - alpha)) / 255;
                target[channel] = blended as u8;
            }
            target[3] = 255;
        }
    }
}
