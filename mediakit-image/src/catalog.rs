//! Static catalog of the Imagen models this server fronts.

use serde::Serialize;

/// Constraints for one Imagen model.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ImageModel {
    /// Canonical model identifier
    pub id: &'static str,
    /// Shorthand names accepted in requests
    #[serde(skip)]
    pub aliases: &'static [&'static str],
    /// Maximum prompt length in characters
    pub max_prompt_length: usize,
    /// Aspect ratios the model accepts
    pub aspect_ratios: &'static [&'static str],
    /// Maximum samples per request
    pub max_samples: u8,
}

pub const IMAGEN_3: ImageModel = ImageModel {
    id: "imagen-3.0-generate-002",
    aliases: &["imagen-3", "imagen-3.0", "imagen3"],
    max_prompt_length: 480,
    aspect_ratios: &["1:1", "3:4", "4:3", "9:16", "16:9"],
    max_samples: 4,
};

pub const IMAGEN_3_FAST: ImageModel = ImageModel {
    id: "imagen-3.0-fast-generate-001",
    aliases: &["imagen-3-fast", "imagen-3.0-fast"],
    max_prompt_length: 480,
    aspect_ratios: &["1:1", "3:4", "4:3", "9:16", "16:9"],
    max_samples: 4,
};

pub const IMAGEN_4: ImageModel = ImageModel {
    id: "imagen-4.0-generate-preview-06-06",
    aliases: &["imagen-4", "imagen-4.0", "imagen4"],
    max_prompt_length: 2000,
    aspect_ratios: &["1:1", "3:4", "4:3", "9:16", "16:9"],
    max_samples: 4,
};

/// Every model this server knows about.
pub const MODELS: &[ImageModel] = &[IMAGEN_3, IMAGEN_3_FAST, IMAGEN_4];

/// Resolve a canonical ID or alias to its model definition.
pub fn resolve(name: &str) -> Option<&'static ImageModel> {
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
    fn resolves_by_canonical_id() {
        let model = resolve("imagen-3.0-generate-002").unwrap();
        assert_eq!(model.max_prompt_length, 480);
    }

    #[test]
    fn resolves_by_alias() {
        assert_eq!(resolve("imagen-4").unwrap().id, "imagen-4.0-generate-preview-06-06");
        assert_eq!(resolve("imagen-3-fast").unwrap().id, "imagen-3.0-fast-generate-001");
    }

    #[test]
    fn unknown_name_does_not_resolve() {
        assert!(resolve("dall-e-3").is_none());
    }

    #[test]
    fn known_ids_lists_every_model() {
        let ids = known_ids();
        for model in MODELS {
            assert!(ids.contains(model.id));
        }
    }
}
