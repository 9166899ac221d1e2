use crate::app::{CameraView, Vec2};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

fn effective_zoom(camera: &CameraView) -> f32 {
    if camera.zoom.is_finite() && camera.zoom > 0.0 {
        camera.zoom
    } else {
        1.0
    }
}

/// Map pixels to screen pixels; the camera centre lands in the middle of the viewport.
pub fn world_to_screen(world: Vec2, camera: &CameraView, viewport: Viewport) -> (i32, i32) {
    let zoom = effective_zoom(camera);
    let x = (world.x - camera.center.x) * zoom + viewport.width as f32 * 0.5;
    let y = (world.y - camera.center.y) * zoom + viewport.height as f32 * 0.5;
    (x.floor() as i32, y.floor() as i32)
}

pub fn screen_to_world(screen_px: (i32, i32), camera: &CameraView, viewport: Viewport) -> Vec2 {
    let zoom = effective_zoom(camera);
    Vec2 {
        x: (screen_px.0 as f32 - viewport.width as f32 * 0.5) / zoom + camera.center.x,
        y: (screen_px.1 as f32 - viewport.height as f32 * 0.5) / zoom + camera.center.y,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VIEWPORT: Viewport = Viewport {
        width: 800,
        height: 600,
    };

    #[test]
    fn camera_center_maps_to_viewport_center() {
        let camera = CameraView {
            center: Vec2::new(320.0, 240.0),
            zoom: 2.0,
        };
        assert_eq!(world_to_screen(camera.center, &camera, VIEWPORT), (400, 300));
    }

    #[test]
    fn zoom_scales_offsets_from_center() {
        let camera = CameraView {
            center: Vec2::new(100.0, 100.0),
            zoom: 2.0,
        };
        assert_eq!(
            world_to_screen(Vec2::new(110.0, 90.0), &camera, VIEWPORT),
            (420, 280)
        );
    }

    #[test]
    fn screen_to_world_inverts_world_to_screen() {
        let camera = CameraView {
            center: Vec2::new(50.0, 75.0),
            zoom: 1.0,
        };
        let world = screen_to_world((10, 20), &camera, VIEWPORT);
        assert_eq!(world_to_screen(world, &camera, VIEWPORT), (10, 20));
    }

    #[test]
    fn non_positive_zoom_is_treated_as_one() {
        let camera = CameraView {
            center: Vec2::ZERO,
            zoom: 0.0,
        };
        assert_eq!(
            world_to_screen(Vec2::new(10.0, 0.0), &camera, VIEWPORT),
            (410, 300)
        );
    }
}
