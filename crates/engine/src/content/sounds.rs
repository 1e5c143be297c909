use std::path::{Path, PathBuf};

/// One sound asset named by the bundle manifest. Playback is out of scope
/// for the runtime; the bank records validated ids and file paths so a
/// mixer can be attached without touching the loader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SoundEntry {
    pub id: String,
    pub path: PathBuf,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SoundBank {
    entries: Vec<SoundEntry>,
}

impl SoundBank {
    pub(crate) fn new(entries: Vec<SoundEntry>) -> Self {
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn path_for(&self, id: &str) -> Option<&Path> {
        self.entries
            .iter()
            .find(|entry| entry.id == id)
            .map(|entry| entry.path.as_path())
    }

    pub fn entries(&self) -> &[SoundEntry] {
        &self.entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_by_id() {
        let bank = SoundBank::new(vec![SoundEntry {
            id: "jump".to_string(),
            path: PathBuf::from("/tmp/jump.wav"),
        }]);
        assert_eq!(bank.len(), 1);
        assert_eq!(bank.path_for("jump"), Some(Path::new("/tmp/jump.wav")));
        assert_eq!(bank.path_for("stomp"), None);
    }

    #[test]
    fn empty_bank_is_valid() {
        let bank = SoundBank::default();
        assert!(bank.is_empty());
        assert_eq!(bank.path_for("anything"), None);
    }
}
