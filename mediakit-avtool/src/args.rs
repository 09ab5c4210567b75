//! ffmpeg/ffprobe argument construction.
//!
//! Every invocation pattern lives here as a pure function over local paths,
//! so the command lines are testable without spawning a process. `-y` is
//! prepended by the runner, not here.

/// Parsed volume adjustment: a plain multiplier or a dB offset.
#[derive(Debug, Clone, PartialEq)]
pub enum VolumeValue {
    /// Numeric multiplier, e.g. 0.5 or 2.0.
    Multiplier(f64),
    /// Decibel offset, e.g. -3.0 or +6.0.
    Decibels(f64),
}

impl VolumeValue {
    /// Parse "0.5", "2", "-3dB", "+6dB" (suffix case-insensitive).
    pub fn parse(s: &str) -> Result<Self, String> {
        let s = s.trim();
        if s.is_empty() {
            return Err("volume cannot be empty".to_string());
        }

        if s.to_lowercase().ends_with("db") {
            let number = s[..s.len() - 2].trim();
            let db: f64 = number
                .parse()
                .map_err(|_| format!("invalid dB value '{s}'; expected e.g. '-3dB'"))?;
            return Ok(VolumeValue::Decibels(db));
        }

        let multiplier: f64 = s.parse().map_err(|_| {
            format!("invalid volume '{s}'; expected a multiplier like '0.5' or a dB value like '-3dB'")
        })?;

        if multiplier < 0.0 {
            return Err(format!(
                "volume multiplier cannot be negative ({multiplier}); use dB notation for attenuation"
            ));
        }

        Ok(VolumeValue::Multiplier(multiplier))
    }

    /// Value for ffmpeg's `volume` filter.
    pub fn filter_value(&self) -> String {
        match self {
            VolumeValue::Multiplier(m) => format!("{m}"),
            VolumeValue::Decibels(db) => format!("{db}dB"),
        }
    }
}

/// ffprobe arguments for JSON-formatted format and stream info.
pub fn probe_args(input: &str) -> Vec<String> {
    vec![
        "-v".into(),
        "quiet".into(),
        "-print_format".into(),
        "json".into(),
        "-show_format".into(),
        "-show_streams".into(),
        input.into(),
    ]
}

/// WAV to MP3 conversion via libmp3lame.
pub fn convert_wav_to_mp3_args(input: &str, output: &str, bitrate: &str) -> Vec<String> {
    vec![
        "-i".into(),
        input.into(),
        "-codec:a".into(),
        "libmp3lame".into(),
        "-b:a".into(),
        bitrate.into(),
        output.into(),
    ]
}

/// Video to GIF with an fps filter and optional scaling and trimming.
pub fn video_to_gif_args(
    input: &str,
    output: &str,
    fps: u8,
    width: Option<u32>,
    start_time: Option<f64>,
    duration: Option<f64>,
) -> Vec<String> {
    let mut filters = vec![format!("fps={fps}")];
    if let Some(width) = width {
        filters.push(format!("scale={width}:-1:flags=lanczos"));
    }

    let mut args = Vec::new();
    if let Some(start) = start_time {
        args.push("-ss".into());
        args.push(format!("{start}"));
    }
    args.push("-i".into());
    args.push(input.into());
    if let Some(duration) = duration {
        args.push("-t".into());
        args.push(format!("{duration}"));
    }
    args.push("-vf".into());
    args.push(filters.join(","));
    args.push(output.into());
    args
}

/// Mux a video stream with an audio stream, re-encoding only the audio.
pub fn mux_args(video: &str, audio: &str, output: &str) -> Vec<String> {
    vec![
        "-i".into(),
        video.into(),
        "-i".into(),
        audio.into(),
        "-c:v".into(),
        "copy".into(),
        "-c:a".into(),
        "aac".into(),
        "-map".into(),
        "0:v:0".into(),
        "-map".into(),
        "1:a:0".into(),
        "-shortest".into(),
        output.into(),
    ]
}

/// Concatenate via the concat demuxer; `list_file` holds `file '<path>'`
/// lines.
pub fn concat_args(list_file: &str, output: &str) -> Vec<String> {
    vec![
        "-f".into(),
        "concat".into(),
        "-safe".into(),
        "0".into(),
        "-i".into(),
        list_file.into(),
        "-c".into(),
        "copy".into(),
        output.into(),
    ]
}

/// Apply the volume filter.
pub fn adjust_volume_args(input: &str, output: &str, volume: &VolumeValue) -> Vec<String> {
    vec![
        "-i".into(),
        input.into(),
        "-filter:a".into(),
        format!("volume={}", volume.filter_value()),
        output.into(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn volume_parses_multipliers() {
        assert_eq!(VolumeValue::parse("0.5").unwrap(), VolumeValue::Multiplier(0.5));
        assert_eq!(VolumeValue::parse("2").unwrap(), VolumeValue::Multiplier(2.0));
    }

    #[test]
    fn volume_parses_decibels_case_insensitively() {
        assert_eq!(VolumeValue::parse("-3dB").unwrap(), VolumeValue::Decibels(-3.0));
        assert_eq!(VolumeValue::parse("+6db").unwrap(), VolumeValue::Decibels(6.0));
        assert_eq!(VolumeValue::parse("0DB").unwrap(), VolumeValue::Decibels(0.0));
    }

    #[test]
    fn volume_rejects_garbage_and_negative_multipliers() {
        assert!(VolumeValue::parse("").is_err());
        assert!(VolumeValue::parse("loud").is_err());
        assert!(VolumeValue::parse("-0.5").is_err());
    }

    #[test]
    fn volume_filter_value_keeps_db_suffix() {
        assert_eq!(VolumeValue::Decibels(-3.0).filter_value(), "-3dB");
        assert_eq!(VolumeValue::Multiplier(1.5).filter_value(), "1.5");
    }

    #[test]
    fn probe_args_request_json_output() {
        let args = probe_args("clip.mp4");
        assert!(args.contains(&"-show_streams".to_string()));
        assert!(args.contains(&"json".to_string()));
        assert_eq!(args.last().unwrap(), "clip.mp4");
    }

    #[test]
    fn convert_args_use_lame_and_bitrate() {
        let args = convert_wav_to_mp3_args("in.wav", "out.mp3", "192k");
        assert_eq!(
            args,
            vec!["-i", "in.wav", "-codec:a", "libmp3lame", "-b:a", "192k", "out.mp3"]
        );
    }

    #[test]
    fn gif_args_minimal() {
        let args = video_to_gif_args("in.mp4", "out.gif", 10, None, None, None);
        assert_eq!(args, vec!["-i", "in.mp4", "-vf", "fps=10", "out.gif"]);
    }

    #[test]
    fn gif_args_with_trim_and_scale() {
        let args = video_to_gif_args("in.mp4", "out.gif", 15, Some(320), Some(1.5), Some(3.0));
        assert_eq!(
            args,
            vec![
                "-ss", "1.5", "-i", "in.mp4", "-t", "3", "-vf",
                "fps=15,scale=320:-1:flags=lanczos", "out.gif"
            ]
        );
    }

    #[test]
    fn mux_args_copy_video_and_encode_audio() {
        let args = mux_args("v.mp4", "a.wav", "out.mp4");
        assert!(args.contains(&"-shortest".to_string()));
        assert!(args.windows(2).any(|w| w == ["-c:v", "copy"]));
        assert!(args.windows(2).any(|w| w == ["-c:a", "aac"]));
    }

    #[test]
    fn concat_args_use_the_demuxer() {
        let args = concat_args("list.txt", "out.mp4");
        assert!(args.windows(2).any(|w| w == ["-f", "concat"]));
        assert!(args.windows(2).any(|w| w == ["-safe", "0"]));
    }

    #[test]
    fn volume_args_carry_the_filter() {
        let args = adjust_volume_args("in.wav", "out.wav", &VolumeValue::Decibels(-3.0));
        assert!(args.contains(&"volume=-3dB".to_string()));
    }
}
