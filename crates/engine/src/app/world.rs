use thiserror::Error;

/// Edge tolerance for rect/tile span queries. A rect whose edge lands exactly
/// on a tile boundary does not count as touching the next tile over.
const RECT_EDGE_EPS: f32 = 1e-3;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Gameplay meaning attached to a tile beyond plain geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TileBehavior {
    /// Touching this tile defeats the player.
    Hazard,
    /// Touching this tile completes the level.
    Goal,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TileLayer {
    #[default]
    Background,
    Foreground,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tile {
    /// Sprite/definition code from the level data. Zero is empty.
    pub code: u16,
    pub solid: bool,
    pub behavior: Option<TileBehavior>,
    pub layer: TileLayer,
}

impl Tile {
    pub const EMPTY: Tile = Tile {
        code: 0,
        solid: false,
        behavior: None,
        layer: TileLayer::Background,
    };
}

/// Entity kind a spawn marker tile stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerKind {
    Player,
    Coin,
    Enemy,
}

/// A marker tile lifted out of the grid at load time. The tile itself is
/// replaced with [`Tile::EMPTY`]; the scene spawns the entity here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpawnPoint {
    pub kind: MarkerKind,
    pub tile_x: u32,
    pub tile_y: u32,
}

impl SpawnPoint {
    /// Top-left pixel of the marker's tile cell.
    pub fn world_position(&self, tile_size_px: u32) -> Vec2 {
        Vec2::new(
            (self.tile_x * tile_size_px) as f32,
            (self.tile_y * tile_size_px) as f32,
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TileWorldError {
    #[error("tile coordinate ({x}, {y}) is outside the {width}x{height} level")]
    OutOfBounds {
        x: u32,
        y: u32,
        width: u32,
        height: u32,
    },
    #[error("tile grid holds {actual} tiles but {width}x{height} requires {expected}")]
    TileCountMismatch {
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },
}

/// Static level geometry. Row-major grid; tile (0, 0) sits at the top-left
/// and y grows downward in both tile and pixel space. Immutable once built.
#[derive(Debug, Clone)]
pub struct TileWorld {
    width: u32,
    height: u32,
    tile_size_px: u32,
    tiles: Vec<Tile>,
}

impl TileWorld {
    pub fn new(
        width: u32,
        height: u32,
        tile_size_px: u32,
        tiles: Vec<Tile>,
    ) -> Result<Self, TileWorldError> {
        let expected = width as usize * height as usize;
        if tiles.len() != expected {
            return Err(TileWorldError::TileCountMismatch {
                width,
                height,
                expected,
                actual: tiles.len(),
            });
        }
        Ok(Self {
            width,
            height,
            tile_size_px,
            tiles,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn tile_size_px(&self) -> u32 {
        self.tile_size_px
    }

    pub fn pixel_width(&self) -> f32 {
        (self.width * self.tile_size_px) as f32
    }

    pub fn pixel_height(&self) -> f32 {
        (self.height * self.tile_size_px) as f32
    }

    pub fn tile_at(&self, x: u32, y: u32) -> Result<Tile, TileWorldError> {
        if x >= self.width || y >= self.height {
            return Err(TileWorldError::OutOfBounds {
                x,
                y,
                width: self.width,
                height: self.height,
            });
        }
        Ok(self.tiles[y as usize * self.width as usize + x as usize])
    }

    /// Solidity query that treats everything outside the level as solid, so
    /// level borders act as walls without explicit border tiles.
    pub fn is_solid(&self, tile_x: i64, tile_y: i64) -> bool {
        if tile_x < 0 || tile_y < 0 || tile_x >= i64::from(self.width) || tile_y >= i64::from(self.height)
        {
            return true;
        }
        self.tiles[tile_y as usize * self.width as usize + tile_x as usize].solid
    }

    pub fn is_solid_at_px(&self, px: f32, py: f32) -> bool {
        let ts = self.tile_size_px as f32;
        self.is_solid((px / ts).floor() as i64, (py / ts).floor() as i64)
    }

    /// True when any tile overlapped by the pixel rect is solid. Considers
    /// every overlapped tile, not just corners, so wide or tall rects cannot
    /// slip between samples.
    pub fn solid_in_rect_px(&self, x: f32, y: f32, w: f32, h: f32) -> bool {
        let ts = self.tile_size_px as f32;
        for ty in tile_span(y, h, ts) {
            for tx in tile_span(x, w, ts) {
                if self.is_solid(tx, ty) {
                    return true;
                }
            }
        }
        false
    }

    /// True when any in-bounds tile overlapped by the pixel rect carries the
    /// given behavior. Out-of-bounds cells carry none.
    pub fn behavior_in_rect_px(&self, x: f32, y: f32, w: f32, h: f32, behavior: TileBehavior) -> bool {
        let ts = self.tile_size_px as f32;
        for ty in tile_span(y, h, ts) {
            for tx in tile_span(x, w, ts) {
                if tx < 0 || ty < 0 || tx >= i64::from(self.width) || ty >= i64::from(self.height) {
                    continue;
                }
                let tile = self.tiles[ty as usize * self.width as usize + tx as usize];
                if tile.behavior == Some(behavior) {
                    return true;
                }
            }
        }
        false
    }
}

/// Inclusive tile index range covered by a 1D pixel span.
fn tile_span(min: f32, size: f32, tile_size: f32) -> std::ops::RangeInclusive<i64> {
    let lo = (min / tile_size).floor() as i64;
    let hi = ((min + size - RECT_EDGE_EPS) / tile_size).floor() as i64;
    lo..=hi.max(lo)
}

/// Top-left corner of the visible window, in world pixels. Follows a target
/// but never shows space beyond the level edges.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Camera {
    pub position: Vec2,
}

impl Camera {
    /// Centers the view on `target_center`, clamped so the view stays inside
    /// `world_size`. Levels smaller than the view pin to the origin.
    pub fn follow(&mut self, target_center: Vec2, view_size: Vec2, world_size: Vec2) {
        let max_x = (world_size.x - view_size.x).max(0.0);
        let max_y = (world_size.y - view_size.y).max(0.0);
        self.position.x = (target_center.x - view_size.x * 0.5).clamp(0.0, max_x);
        self.position.y = (target_center.y - view_size.y * 0.5).clamp(0.0, max_y);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid_tile(code: u16) -> Tile {
        Tile {
            code,
            solid: true,
            behavior: None,
            layer: TileLayer::Background,
        }
    }

    /// 4x3 world with a solid floor on the bottom row.
    fn floor_world() -> TileWorld {
        let mut tiles = vec![Tile::EMPTY; 12];
        for x in 0..4 {
            tiles[2 * 4 + x] = solid_tile(1);
        }
        TileWorld::new(4, 3, 8, tiles).expect("world")
    }

    #[test]
    fn rejects_mismatched_tile_count() {
        let result = TileWorld::new(4, 3, 8, vec![Tile::EMPTY; 11]);
        assert_eq!(
            result.map(|_| ()),
            Err(TileWorldError::TileCountMismatch {
                width: 4,
                height: 3,
                expected: 12,
                actual: 11,
            })
        );
    }

    #[test]
    fn tile_at_reports_out_of_bounds() {
        let world = floor_world();
        assert!(world.tile_at(3, 2).is_ok());
        assert_eq!(
            world.tile_at(4, 0),
            Err(TileWorldError::OutOfBounds {
                x: 4,
                y: 0,
                width: 4,
                height: 3,
            })
        );
        assert_eq!(
            world.tile_at(0, 3),
            Err(TileWorldError::OutOfBounds {
                x: 0,
                y: 3,
                width: 4,
                height: 3,
            })
        );
    }

    #[test]
    fn out_of_bounds_is_solid() {
        let world = floor_world();
        assert!(world.is_solid(-1, 0));
        assert!(world.is_solid(0, -1));
        assert!(world.is_solid(4, 0));
        assert!(world.is_solid(0, 3));
        assert!(!world.is_solid(0, 0));
        assert!(world.is_solid(0, 2));
    }

    #[test]
    fn rect_query_touches_all_overlapped_tiles() {
        let world = floor_world();
        // Rect straddling rows 1 and 2 touches the floor.
        assert!(world.solid_in_rect_px(0.0, 12.0, 8.0, 8.0));
        // Rect fully inside empty row 1 does not.
        assert!(!world.solid_in_rect_px(0.0, 8.0, 8.0, 8.0));
        // Bottom edge exactly on the floor boundary does not count as touching.
        assert!(!world.solid_in_rect_px(0.0, 8.0, 8.0, 7.9999));
    }

    #[test]
    fn behavior_query_ignores_out_of_bounds() {
        let mut tiles = vec![Tile::EMPTY; 12];
        tiles[2 * 4] = Tile {
            code: 3,
            solid: false,
            behavior: Some(TileBehavior::Hazard),
            layer: TileLayer::Background,
        };
        let world = TileWorld::new(4, 3, 8, tiles).expect("world");
        assert!(world.behavior_in_rect_px(0.0, 16.0, 4.0, 4.0, TileBehavior::Hazard));
        assert!(!world.behavior_in_rect_px(0.0, 16.0, 4.0, 4.0, TileBehavior::Goal));
        assert!(!world.behavior_in_rect_px(-10.0, -10.0, 4.0, 4.0, TileBehavior::Hazard));
    }

    #[test]
    fn camera_clamps_to_world_edges() {
        let mut camera = Camera::default();
        let view = Vec2::new(320.0, 240.0);
        let world = Vec2::new(800.0, 240.0);

        camera.follow(Vec2::new(0.0, 0.0), view, world);
        assert_eq!(camera.position, Vec2::ZERO);

        camera.follow(Vec2::new(400.0, 120.0), view, world);
        assert_eq!(camera.position, Vec2::new(240.0, 0.0));

        camera.follow(Vec2::new(10_000.0, 10_000.0), view, world);
        assert_eq!(camera.position, Vec2::new(480.0, 0.0));
    }

    #[test]
    fn camera_pins_small_levels_to_origin() {
        let mut camera = Camera::default();
        camera.follow(
            Vec2::new(50.0, 50.0),
            Vec2::new(320.0, 240.0),
            Vec2::new(160.0, 120.0),
        );
        assert_eq!(camera.position, Vec2::ZERO);
    }

    #[test]
    fn spawn_point_world_position_is_tile_corner() {
        let point = SpawnPoint {
            kind: MarkerKind::Coin,
            tile_x: 3,
            tile_y: 2,
        };
        assert_eq!(point.world_position(8), Vec2::new(24.0, 16.0));
    }
}
