use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;
use tracing::debug;

use super::LoadError;
use crate::app::world::{
    MarkerKind, SpawnPoint, Tile, TileBehavior, TileLayer, TileWorld,
};

/// Raw level file shape. Codes in `grid` index into `tiles`; code 0 is
/// always empty and needs no definition.
#[derive(Debug, Deserialize)]
pub(crate) struct LevelDocument {
    width: u32,
    height: u32,
    #[serde(default)]
    tiles: BTreeMap<String, TileDef>,
    grid: Vec<Vec<u16>>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct TileDef {
    #[serde(default)]
    solid: bool,
    #[serde(default)]
    role: Option<TileRole>,
    #[serde(default)]
    layer: LayerDef,
}

/// What a coded tile means beyond geometry. Spawn roles are markers: they
/// become [`SpawnPoint`]s and leave an empty cell behind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
enum TileRole {
    Hazard,
    Goal,
    PlayerSpawn,
    CoinSpawn,
    EnemySpawn,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
enum LayerDef {
    #[default]
    Background,
    Foreground,
}

/// Loader output: the immutable grid plus the spawn markers lifted out of
/// it. Exactly one player marker is guaranteed here, not downstream.
#[derive(Debug, Clone)]
pub struct LevelData {
    pub tiles: TileWorld,
    pub spawn_points: Vec<SpawnPoint>,
}

pub(crate) fn build_level(
    document: LevelDocument,
    tile_size_px: u32,
    path: &Path,
) -> Result<LevelData, LoadError> {
    let invalid = |message: String| LoadError::InvalidLevel {
        path: path.to_path_buf(),
        message,
    };

    if document.width == 0 || document.height == 0 {
        return Err(invalid(format!(
            "level dimensions must be positive, got {}x{}",
            document.width, document.height
        )));
    }
    if document.grid.len() != document.height as usize {
        return Err(invalid(format!(
            "grid has {} rows but height is {}",
            document.grid.len(),
            document.height
        )));
    }

    let mut defs: BTreeMap<u16, TileDef> = BTreeMap::new();
    for (key, def) in &document.tiles {
        let code: u16 = key
            .parse()
            .map_err(|_| invalid(format!("tile code {key:?} is not a number in 1..=65535")))?;
        if code == 0 {
            return Err(invalid("tile code 0 is reserved for empty cells".to_string()));
        }
        defs.insert(code, *def);
    }

    let mut tiles = Vec::with_capacity(document.width as usize * document.height as usize);
    let mut spawn_points = Vec::new();
    let mut player_spawns = 0usize;

    for (row_index, row) in document.grid.iter().enumerate() {
        if row.len() != document.width as usize {
            return Err(invalid(format!(
                "grid row {} has {} cells but width is {}",
                row_index,
                row.len(),
                document.width
            )));
        }
        for (column_index, &code) in row.iter().enumerate() {
            if code == 0 {
                tiles.push(Tile::EMPTY);
                continue;
            }
            let def = defs
                .get(&code)
                .ok_or_else(|| invalid(format!("grid uses undefined tile code {code}")))?;

            let marker = match def.role {
                Some(TileRole::PlayerSpawn) => Some(MarkerKind::Player),
                Some(TileRole::CoinSpawn) => Some(MarkerKind::Coin),
                Some(TileRole::EnemySpawn) => Some(MarkerKind::Enemy),
                _ => None,
            };
            if let Some(kind) = marker {
                if kind == MarkerKind::Player {
                    player_spawns += 1;
                }
                spawn_points.push(SpawnPoint {
                    kind,
                    tile_x: column_index as u32,
                    tile_y: row_index as u32,
                });
                tiles.push(Tile::EMPTY);
                continue;
            }

            tiles.push(Tile {
                code,
                solid: def.solid,
                behavior: match def.role {
                    Some(TileRole::Hazard) => Some(TileBehavior::Hazard),
                    Some(TileRole::Goal) => Some(TileBehavior::Goal),
                    _ => None,
                },
                layer: match def.layer {
                    LayerDef::Background => TileLayer::Background,
                    LayerDef::Foreground => TileLayer::Foreground,
                },
            });
        }
    }

    if player_spawns != 1 {
        return Err(invalid(format!(
            "level defines {player_spawns} player spawns; exactly one is required"
        )));
    }

    let tiles = TileWorld::new(document.width, document.height, tile_size_px, tiles)
        .map_err(|error| invalid(error.to_string()))?;
    debug!(
        width = tiles.width(),
        height = tiles.height(),
        spawn_points = spawn_points.len(),
        "level_built"
    );

    Ok(LevelData {
        tiles,
        spawn_points,
    })
}
