//! Static catalog of the Veo models this server fronts.

use serde::Serialize;

/// Constraints for one Veo model.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct VideoModel {
    /// Canonical model identifier
    pub id: &'static str,
    /// Shorthand names accepted in requests
    #[serde(skip)]
    pub aliases: &'static [&'static str],
    /// Aspect ratios the model accepts
    pub aspect_ratios: &'static [&'static str],
    /// Clip lengths the model accepts, in seconds
    pub durations: &'static [u8],
    /// Whether the model can generate an audio track
    pub supports_audio: bool,
}

pub const VEO_2: VideoModel = VideoModel {
    id: "veo-2.0-generate-001",
    aliases: &["veo-2", "veo-2.0", "veo2"],
    aspect_ratios: &["16:9", "9:16"],
    durations: &[4, 6, 8],
    supports_audio: false,
};

pub const VEO_3: VideoModel = VideoModel {
    id: "veo-3.0-generate-preview",
    aliases: &["veo-3", "veo-3.0", "veo3"],
    aspect_ratios: &["16:9", "9:16"],
    durations: &[4, 6, 8],
    supports_audio: true,
};

/// Every model this server knows about.
pub const MODELS: &[VideoModel] = &[VEO_2, VEO_3];

/// Resolve a canonical ID or alias to its model definition.
pub fn resolve(name: &str) -> Option<&'static VideoModel> {
    MODELS
        .iter()
        .find(|m| m.id == name || m.aliases.contains(&name))
}

/// Comma-separated canonical IDs, for validation messages.
pub fn known_ids() -> String {
    MODELS.iter().map(|m| m.id).collect::<Vec<_>>().join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_by_id_and_alias() {
        assert_eq!(resolve("veo-2.0-generate-001").unwrap().id, VEO_2.id);
        assert_eq!(resolve("veo-3").unwrap().id, VEO_3.id);
    }

    #[test]
    fn audio_support_differs_by_generation() {
        assert!(!resolve("veo-2").unwrap().supports_audio);
        assert!(resolve("veo-3").unwrap().supports_audio);
    }

    #[test]
    fn unknown_name_does_not_resolve() {
        assert!(resolve("sora").is_none());
    }

    #[test]
    fn durations_are_discrete() {
        let model = resolve("veo-2").unwrap();
        assert!(model.durations.contains(&6));
        assert!(!model.durations.contains(&5));
    }
}
