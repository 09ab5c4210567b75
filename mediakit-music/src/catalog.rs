//! Static catalog of the Lyria models this server fronts.

use serde::Serialize;

/// Constraints for one Lyria model.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct MusicModel {
    /// Canonical model identifier
    pub id: &'static str,
    /// Shorthand names accepted in requests
    #[serde(skip)]
    pub aliases: &'static [&'static str],
    /// Maximum samples per request
    pub max_samples: u8,
}

pub const LYRIA: MusicModel = MusicModel {
    id: "lyria-002",
    aliases: &["lyria", "music-generation"],
    max_samples: 4,
};

/// Every model this server knows about.
pub const MODELS: &[MusicModel] = &[LYRIA];

/// Resolve a canonical ID or alias to its model definition.
pub fn resolve(name: &str) -> Option<&'static MusicModel> {
    MODELS
        .iter()
        .find(|m| m.id == name || m.aliases.contains(&name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_by_id_and_alias() {
        assert_eq!(resolve("lyria-002").unwrap().id, LYRIA.id);
        assert_eq!(resolve("lyria").unwrap().id, LYRIA.id);
        assert_eq!(resolve("music-generation").unwrap().id, LYRIA.id);
    }

    #[test]
    fn unknown_name_does_not_resolve() {
        assert!(resolve("musicgen").is_none());
    }
}
