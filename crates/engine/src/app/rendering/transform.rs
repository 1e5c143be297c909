use crate::app::world::{Camera, Vec2};

/// Logical framebuffer size in pixels. The surface scales this up to the
/// window; world-space math never sees the window size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub fn size(&self) -> Vec2 {
        Vec2::new(self.width as f32, self.height as f32)
    }
}

/// World pixels to framebuffer pixels. Both spaces are y-down, so this is a
/// camera subtraction and nothing more. May return coordinates outside the
/// viewport; blitting clips.
pub fn world_to_screen_px(world: Vec2, camera: Camera) -> (i32, i32) {
    (
        (world.x - camera.position.x).round() as i32,
        (world.y - camera.position.y).round() as i32,
    )
}
