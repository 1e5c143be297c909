mod atlas;
mod bundle;
mod level;
mod sounds;

pub use atlas::TileAtlas;
pub use bundle::{load_bundle, Bundle, LoadError};
pub use level::LevelData;
pub use sounds::{SoundBank, SoundEntry};
