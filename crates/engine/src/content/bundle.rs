use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use image::ImageReader;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::{info, warn};

use super::atlas::TileAtlas;
use super::level::{build_level, LevelData, LevelDocument};
use super::sounds::{SoundBank, SoundEntry};

const MANIFEST_FILE: &str = "bundle.json";

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read asset file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("malformed JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to decode atlas image {path}: {source}")]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("level data at {path} does not match its manifest checksum")]
    ChecksumMismatch { path: PathBuf },
    #[error("invalid level in {path}: {message}")]
    InvalidLevel { path: PathBuf, message: String },
    #[error("sound {id:?} points at missing file {path}")]
    MissingSound { id: String, path: PathBuf },
    #[error("invalid bundle manifest at {path}: {message}")]
    InvalidManifest { path: PathBuf, message: String },
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct BundleManifest {
    tile_size_px: u32,
    level: String,
    #[serde(default)]
    level_sha256: Option<String>,
    #[serde(default)]
    atlas: Option<String>,
    #[serde(default)]
    sounds: Vec<SoundManifestEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SoundManifestEntry {
    id: String,
    file: String,
}

/// Everything one session needs, loaded once before the loop starts. The
/// atlas is optional; without it the renderer falls back to flat colors.
#[derive(Debug)]
pub struct Bundle {
    pub level: LevelData,
    pub atlas: Option<TileAtlas>,
    pub sounds: SoundBank,
}

/// Reads `bundle.json` from `dir` and everything it references. Fails on
/// the first unusable asset rather than limping into the session.
pub fn load_bundle(dir: &Path) -> Result<Bundle, LoadError> {
    let manifest_path = dir.join(MANIFEST_FILE);
    let manifest: BundleManifest = read_json(&manifest_path)?;
    if manifest.tile_size_px == 0 {
        return Err(LoadError::InvalidManifest {
            path: manifest_path,
            message: "tile_size_px must be positive".to_string(),
        });
    }

    let level_path = dir.join(&manifest.level);
    let level_bytes = read_bytes(&level_path)?;
    if let Some(expected) = manifest.level_sha256.as_deref() {
        let actual = sha256_hex(&level_bytes);
        if !actual.eq_ignore_ascii_case(expected) {
            return Err(LoadError::ChecksumMismatch { path: level_path });
        }
    }
    let document: LevelDocument =
        serde_json::from_slice(&level_bytes).map_err(|source| LoadError::Json {
            path: level_path.clone(),
            source,
        })?;
    let level = build_level(document, manifest.tile_size_px, &level_path)?;

    let atlas = match manifest.atlas.as_deref() {
        Some(file) => Some(load_atlas(&dir.join(file), manifest.tile_size_px)?),
        None => {
            warn!("bundle_has_no_atlas; rendering with fallback colors");
            None
        }
    };

    let mut entries = Vec::with_capacity(manifest.sounds.len());
    for sound in &manifest.sounds {
        let path = dir.join(&sound.file);
        if !path.is_file() {
            return Err(LoadError::MissingSound {
                id: sound.id.clone(),
                path,
            });
        }
        entries.push(SoundEntry {
            id: sound.id.clone(),
            path,
        });
    }

    info!(
        level = %manifest.level,
        tiles_w = level.tiles.width(),
        tiles_h = level.tiles.height(),
        spawn_points = level.spawn_points.len(),
        sounds = entries.len(),
        has_atlas = atlas.is_some(),
        "bundle_loaded"
    );

    Ok(Bundle {
        level,
        atlas,
        sounds: SoundBank::new(entries),
    })
}

fn load_atlas(path: &Path, tile_size_px: u32) -> Result<TileAtlas, LoadError> {
    let reader = ImageReader::open(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let image = reader.decode().map_err(|source| LoadError::Image {
        path: path.to_path_buf(),
        source,
    })?;
    let rgba = image.into_rgba8();
    let (width, height) = rgba.dimensions();
    Ok(TileAtlas::from_rgba(width, height, tile_size_px, rgba.into_raw()))
}

fn read_bytes(path: &Path) -> Result<Vec<u8>, LoadError> {
    fs::read(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, LoadError> {
    let bytes = read_bytes(path)?;
    serde_json::from_slice(&bytes).map_err(|source| LoadError::Json {
        path: path.to_path_buf(),
        source,
    })
}

fn sha256_hex(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    let mut out = String::with_capacity(64);
    for byte in digest {
        out.push_str(&format!("{byte:02x}"));
    }
    out
}
