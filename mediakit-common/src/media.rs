//! Helpers for naming and describing media artifacts.

use std::path::Path;

use serde::Serialize;

/// One produced media output: where it landed and how big it is.
#[derive(Debug, Clone, Serialize)]
pub struct SavedArtifact {
    /// Local path or `gs://` URI.
    pub location: String,
    /// Size of the written artifact in bytes.
    pub size_bytes: u64,
}

/// Content type for a file, keyed on its extension.
pub fn content_type_for(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()) {
        Some("mp3") => "audio/mpeg",
        Some("wav") => "audio/wav",
        Some("ogg") => "audio/ogg",
        Some("flac") => "audio/flac",
        Some("mp4") => "video/mp4",
        Some("webm") => "video/webm",
        Some("mkv") => "video/x-matroska",
        Some("avi") => "video/x-msvideo",
        Some("mov") => "video/quicktime",
        Some("gif") => "image/gif",
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("webp") => "image/webp",
        _ => "application/octet-stream",
    }
}

/// Insert an index into an output name for multi-sample results, e.g.
/// `song.wav` -> `song_1.wav`. Works on local paths and `gs://` URIs alike;
/// `Path` is avoided because it would mangle the URI scheme.
pub fn numbered_variant(target: &str, index: usize) -> String {
    let (prefix, rest) = match target.strip_prefix("gs://") {
        Some(rest) => ("gs://", rest),
        None => ("", target),
    };

    let (dir, name) = match rest.rfind('/') {
        Some(pos) => (&rest[..=pos], &rest[pos + 1..]),
        None => ("", rest),
    };

    let numbered = match name.rfind('.') {
        Some(dot) => format!("{}_{}{}", &name[..dot], index, &name[dot..]),
        None => format!("{name}_{index}"),
    };

    format!("{prefix}{dir}{numbered}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_type_covers_common_media() {
        assert_eq!(content_type_for(Path::new("a.wav")), "audio/wav");
        assert_eq!(content_type_for(Path::new("b.mp4")), "video/mp4");
        assert_eq!(content_type_for(Path::new("c.gif")), "image/gif");
        assert_eq!(content_type_for(Path::new("d.unknown")), "application/octet-stream");
        assert_eq!(content_type_for(Path::new("noext")), "application/octet-stream");
    }

    #[test]
    fn numbered_variant_on_local_path() {
        assert_eq!(numbered_variant("out/song.wav", 2), "out/song_2.wav");
        assert_eq!(numbered_variant("song.wav", 0), "song_0.wav");
    }

    #[test]
    fn numbered_variant_preserves_gcs_scheme() {
        assert_eq!(
            numbered_variant("gs://media/out/song.wav", 1),
            "gs://media/out/song_1.wav"
        );
    }

    #[test]
    fn numbered_variant_without_extension_appends_index() {
        assert_eq!(numbered_variant("gs://media/out/song", 3), "gs://media/out/song_3");
    }
}
