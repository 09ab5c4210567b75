//! Property tests over the parameter validation rules.

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    fn image_params(prompt: &str, sample_count: u8) -> mediakit_image::ImageGenerateParams {
        mediakit_image::ImageGenerateParams {
            prompt: prompt.to_string(),
            model: "imagen-3.0-generate-002".to_string(),
            sample_count,
            aspect_ratio: "1:1".to_string(),
            negative_prompt: None,
            seed: None,
            output_file: None,
            output_gcs_uri: None,
        }
    }

    fn video_params(duration: u8) -> mediakit_video::VideoFromTextParams {
        mediakit_video::VideoFromTextParams {
            prompt: "a sailboat at dawn".to_string(),
            model: "veo-3.0-generate-preview".to_string(),
            aspect_ratio: "16:9".to_string(),
            duration_seconds: duration,
            output_gcs_uri: "gs://media/out.mp4".to_string(),
            generate_audio: None,
            seed: None,
            download_local: false,
            local_path: None,
        }
    }

    fn speech_params(rate: f32, pitch: f32) -> mediakit_speech::SpeechSynthesizeParams {
        mediakit_speech::SpeechSynthesizeParams {
            text: "hello".to_string(),
            voice: None,
            language_code: "en-US".to_string(),
            speaking_rate: rate,
            pitch,
            pronunciations: None,
            output_file: None,
        }
    }

    proptest! {
        /// Sample counts inside 1..=4 validate; everything else fails.
        #[test]
        fn image_sample_count_bounds(count in 0u8..=20) {
            let result = image_params("a red fox", count).validate();
            if (1..=4).contains(&count) {
                prop_assert!(result.is_ok());
            } else {
                prop_assert!(result.is_err());
            }
        }

        /// Non-blank prompts within the length limit validate.
        #[test]
        fn image_accepts_reasonable_prompts(prompt in "[a-zA-Z][a-zA-Z ]{0,200}") {
            prop_assert!(image_params(&prompt, 1).validate().is_ok());
        }

        /// Only the discrete durations 4, 6, 8 are accepted.
        #[test]
        fn video_duration_is_discrete(duration in 0u8..=20) {
            let result = video_params(duration).validate();
            if [4u8, 6, 8].contains(&duration) {
                prop_assert!(result.is_ok());
            } else {
                prop_assert!(result.is_err());
            }
        }

        /// Speaking rate and pitch validate exactly inside their ranges.
        #[test]
        fn speech_rate_and_pitch_bounds(rate in 0.0f32..6.0, pitch in -30.0f32..30.0) {
            let result = speech_params(rate, pitch).validate();
            let rate_ok = (0.25..=4.0).contains(&rate);
            let pitch_ok = (-20.0..=20.0).contains(&pitch);
            prop_assert_eq!(result.is_ok(), rate_ok && pitch_ok);
        }

        /// Volume strings: multipliers must be non-negative numbers, dB
        /// values parse with either sign.
        #[test]
        fn volume_multipliers_parse(value in 0.0f64..100.0) {
            let parsed = mediakit_avtool::args::VolumeValue::parse(&format!("{value}"));
            prop_assert!(parsed.is_ok());
        }

        #[test]
        fn volume_decibels_parse(db in -60.0f64..60.0) {
            let parsed = mediakit_avtool::args::VolumeValue::parse(&format!("{db}dB"));
            prop_assert!(matches!(parsed, Ok(mediakit_avtool::args::VolumeValue::Decibels(_))));
        }
    }

    #[test]
    fn music_sample_count_bounds() {
        for count in 0u8..=10 {
            let params = mediakit_music::MusicGenerateParams {
                prompt: "upbeat jazz".to_string(),
                negative_prompt: None,
                sample_count: count,
                seed: None,
                output_file: None,
                output_gcs_uri: None,
            };
            assert_eq!(params.validate().is_ok(), (1..=4).contains(&count), "count {count}");
        }
    }
}
