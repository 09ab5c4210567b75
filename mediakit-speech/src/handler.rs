//! Text-to-speech against the Cloud TTS API.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use mediakit_common::auth::{scopes, Credentials};
use mediakit_common::config::Config;
use mediakit_common::error::{Error, FieldError};
use mediakit_common::media::SavedArtifact;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info, instrument};

/// Voice used when the request does not name one.
pub const DEFAULT_VOICE: &str = "en-US-Chirp3-HD-Achernar";

/// Language used when the request does not name one.
pub const DEFAULT_LANGUAGE_CODE: &str = "en-US";

/// Speaking-rate bounds accepted by the API.
pub const MIN_SPEAKING_RATE: f32 = 0.25;
pub const MAX_SPEAKING_RATE: f32 = 4.0;

/// Pitch bounds in semitones accepted by the API.
pub const MIN_PITCH: f32 = -20.0;
pub const MAX_PITCH: f32 = 20.0;

/// Phonetic alphabets accepted for custom pronunciations.
pub const VALID_ALPHABETS: &[&str] = &["ipa", "x-sampa"];

const API_ROOT: &str = "https://texttospeech.googleapis.com";

/// Custom pronunciation for one word, rendered as an SSML phoneme.
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
pub struct Pronunciation {
    /// The word to pronounce differently.
    pub word: String,
    /// Phonetic representation.
    pub phonetic: String,
    /// Phonetic alphabet: "ipa" or "x-sampa".
    pub alphabet: String,
}

impl Pronunciation {
    fn check(&self) -> Result<(), FieldError> {
        if self.word.trim().is_empty() {
            return Err(FieldError::new("word", "word cannot be empty"));
        }
        if self.phonetic.trim().is_empty() {
            return Err(FieldError::new("phonetic", "phonetic representation cannot be empty"));
        }
        let alphabet = self.alphabet.to_lowercase();
        if !VALID_ALPHABETS.contains(&alphabet.as_str()) {
            return Err(FieldError::new(
                "alphabet",
                format!("'{}' is not one of: {}", self.alphabet, VALID_ALPHABETS.join(", ")),
            ));
        }
        Ok(())
    }

    fn to_ssml(&self) -> String {
        format!(
            r#"<phoneme alphabet="{}" ph="{}">{}</phoneme>"#,
            self.alphabet.to_lowercase(),
            self.phonetic,
            self.word
        )
    }
}

/// Speech synthesis parameters.
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
pub struct SpeechSynthesizeParams {
    /// Text to synthesize.
    pub text: String,

    /// Voice name. Defaults to a Chirp3-HD voice.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voice: Option<String>,

    /// Language code such as "en-US".
    #[serde(default = "default_language_code")]
    pub language_code: String,

    /// Speaking rate (0.25-4.0).
    #[serde(default = "default_speaking_rate")]
    pub speaking_rate: f32,

    /// Pitch adjustment in semitones (-20.0 to 20.0).
    #[serde(default)]
    pub pitch: f32,

    /// Custom pronunciations applied via SSML.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pronunciations: Option<Vec<Pronunciation>>,

    /// Local path to save the WAV to; inline base64 is returned otherwise.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_file: Option<String>,
}

fn default_language_code() -> String {
    DEFAULT_LANGUAGE_CODE.to_string()
}

fn default_speaking_rate() -> f32 {
    1.0
}

impl SpeechSynthesizeParams {
    /// Validate, accumulating every field failure.
    pub fn validate(&self) -> Result<(), Vec<FieldError>> {
        let mut errors = Vec::new();

        if self.text.trim().is_empty() {
            errors.push(FieldError::new("text", "text cannot be empty"));
        }

        if !(MIN_SPEAKING_RATE..=MAX_SPEAKING_RATE).contains(&self.speaking_rate) {
            errors.push(FieldError::new(
                "speaking_rate",
                format!(
                    "must be between {} and {}, got {}",
                    MIN_SPEAKING_RATE, MAX_SPEAKING_RATE, self.speaking_rate
                ),
            ));
        }

        if !(MIN_PITCH..=MAX_PITCH).contains(&self.pitch) {
            errors.push(FieldError::new(
                "pitch",
                format!("must be between {} and {} semitones, got {}", MIN_PITCH, MAX_PITCH, self.pitch),
            ));
        }

        if let Some(ref pronunciations) = self.pronunciations {
            for (i, pron) in pronunciations.iter().enumerate() {
                if let Err(e) = pron.check() {
                    errors.push(FieldError::new(
                        format!("pronunciations[{}].{}", i, e.field),
                        e.message,
                    ));
                }
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Voice to use, falling back to the default.
    pub fn voice(&self) -> &str {
        self.voice.as_deref().unwrap_or(DEFAULT_VOICE)
    }

    /// Render the text as SSML with pronunciations substituted in.
    pub fn build_ssml(&self) -> String {
        let mut text = self.text.clone();
        if let Some(ref pronunciations) = self.pronunciations {
            for pron in pronunciations {
                text = text.replace(&pron.word, &pron.to_ssml());
            }
        }
        format!("<speak>{text}</speak>")
    }
}

/// Result of speech synthesis.
#[derive(Debug)]
pub enum SpeechResult {
    /// Inline base64 WAV data
    Inline {
        data: String,
        mime_type: String,
    },
    /// Written to a local file
    File(SavedArtifact),
}

/// A voice offered by the API.
#[derive(Debug, Clone, Serialize)]
pub struct VoiceInfo {
    pub name: String,
    pub language_codes: Vec<String>,
    pub gender: String,
}

/// Speech synthesis handler.
pub struct SpeechHandler {
    pub config: Config,
    pub http: reqwest::Client,
    pub creds: Credentials,
    api_root: String,
}

impl SpeechHandler {
    /// Handler over discovered Application Default Credentials.
    #[instrument(level = "debug", name = "speech_handler_new", skip_all)]
    pub async fn new(config: Config) -> Result<Self, Error> {
        let creds = Credentials::discover().await?;
        Ok(Self {
            config,
            http: reqwest::Client::new(),
            creds,
            api_root: API_ROOT.to_string(),
        })
    }

    #[cfg(test)]
    fn with_deps(config: Config, creds: Credentials, api_root: String) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
            creds,
            api_root,
        }
    }

    fn synthesize_endpoint(&self) -> String {
        format!("{}/v1/text:synthesize", self.api_root)
    }

    fn voices_endpoint(&self) -> String {
        format!("{}/v1/voices", self.api_root)
    }

    /// Synthesize speech from text.
    #[instrument(level = "info", name = "synthesize_speech", skip(self, params))]
    pub async fn synthesize(&self, params: SpeechSynthesizeParams) -> Result<SpeechResult, Error> {
        params.validate().map_err(Error::from_fields)?;

        info!(voice = %params.voice(), "synthesizing speech");

        // SSML is only needed when pronunciations are present.
        let input = if params.pronunciations.is_some() {
            TtsInput {
                text: None,
                ssml: Some(params.build_ssml()),
            }
        } else {
            TtsInput {
                text: Some(params.text.clone()),
                ssml: None,
            }
        };

        let request = TtsRequest {
            input,
            voice: TtsVoice {
                language_code: params.language_code.clone(),
                name: params.voice().to_string(),
            },
            audio_config: TtsAudioConfig {
                audio_encoding: "LINEAR16".to_string(),
                speaking_rate: Some(params.speaking_rate),
                pitch: Some(params.pitch),
                sample_rate_hertz: Some(24000),
            },
        };

        let endpoint = self.synthesize_endpoint();
        let token = self.creds.bearer_token(&[scopes::CLOUD_PLATFORM]).await?;

        debug!(endpoint = %endpoint, "posting synthesis request");
        let response = self
            .http
            .post(&endpoint)
            .bearer_auth(&token)
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::from_reqwest(&endpoint, e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::http(&endpoint, status.as_u16(), body));
        }

        let api_response: TtsResponse = response
            .json()
            .await
            .map_err(|e| Error::http(&endpoint, status.as_u16(), format!("unparseable body: {e}")))?;

        let audio = api_response
            .audio_content
            .ok_or_else(|| Error::http(&endpoint, status.as_u16(), "response contained no audio"))?;

        match params.output_file {
            Some(path) => {
                let data = BASE64
                    .decode(&audio)
                    .map_err(|e| Error::validation(format!("API returned invalid base64: {e}")))?;

                if let Some(parent) = Path::new(&path).parent() {
                    if !parent.as_os_str().is_empty() {
                        tokio::fs::create_dir_all(parent).await?;
                    }
                }
                tokio::fs::write(&path, &data).await?;
                info!(path = %path, bytes = data.len(), "saved speech audio");

                Ok(SpeechResult::File(SavedArtifact {
                    location: path,
                    size_bytes: data.len() as u64,
                }))
            }
            None => Ok(SpeechResult::Inline {
                data: audio,
                mime_type: "audio/wav".to_string(),
            }),
        }
    }

    /// List the Chirp3-HD voices, optionally narrowed to a language.
    #[instrument(level = "info", name = "list_voices", skip(self))]
    pub async fn list_voices(&self, language_code: Option<&str>) -> Result<Vec<VoiceInfo>, Error> {
        let endpoint = self.voices_endpoint();
        let token = self.creds.bearer_token(&[scopes::CLOUD_PLATFORM]).await?;

        let mut request = self.http.get(&endpoint).bearer_auth(&token);
        if let Some(code) = language_code {
            request = request.query(&[("languageCode", code)]);
        }

        let response = request
            .send()
            .await
            .map_err(|e| Error::from_reqwest(&endpoint, e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::http(&endpoint, status.as_u16(), body));
        }

        let api_response: VoicesResponse = response
            .json()
            .await
            .map_err(|e| Error::http(&endpoint, status.as_u16(), format!("unparseable body: {e}")))?;

        let voices: Vec<VoiceInfo> = api_response
            .voices
            .into_iter()
            .filter(|v| v.name.contains("Chirp3-HD"))
            .map(|v| VoiceInfo {
                name: v.name,
                language_codes: v.language_codes,
                gender: v.ssml_gender.unwrap_or_else(|| "NEUTRAL".to_string()),
            })
            .collect();

        info!(count = voices.len(), "listed voices");
        Ok(voices)
    }
}

// =============================================================================
// Wire types
// =============================================================================

/// Cloud TTS synthesis request.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TtsRequest {
    pub input: TtsInput,
    pub voice: TtsVoice,
    pub audio_config: TtsAudioConfig,
}

#[derive(Debug, Serialize)]
pub struct TtsInput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ssml: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TtsVoice {
    pub language_code: String,
    pub name: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TtsAudioConfig {
    pub audio_encoding: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speaking_rate: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pitch: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sample_rate_hertz: Option<u32>,
}

/// Cloud TTS synthesis response.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TtsResponse {
    pub audio_content: Option<String>,
}

/// Cloud TTS voices response.
#[derive(Debug, Deserialize)]
pub struct VoicesResponse {
    #[serde(default)]
    pub voices: Vec<ApiVoice>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiVoice {
    pub name: String,
    #[serde(default)]
    pub language_codes: Vec<String>,
    pub ssml_gender: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config() -> Config {
        Config {
            project_id: "demo-project".to_string(),
            location: "us-central1".to_string(),
            media_bucket: None,
            port: 8080,
        }
    }

    fn params(text: &str) -> SpeechSynthesizeParams {
        SpeechSynthesizeParams {
            text: text.to_string(),
            voice: None,
            language_code: DEFAULT_LANGUAGE_CODE.to_string(),
            speaking_rate: 1.0,
            pitch: 0.0,
            pronunciations: None,
            output_file: None,
        }
    }

    #[test]
    fn serde_defaults_apply() {
        let p: SpeechSynthesizeParams = serde_json::from_str(r#"{"text": "hello"}"#).unwrap();
        assert_eq!(p.language_code, DEFAULT_LANGUAGE_CODE);
        assert_eq!(p.speaking_rate, 1.0);
        assert_eq!(p.pitch, 0.0);
        assert_eq!(p.voice(), DEFAULT_VOICE);
    }

    #[test]
    fn validation_bounds_rate_and_pitch() {
        let mut p = params("hello");
        p.speaking_rate = 5.0;
        p.pitch = -30.0;
        let errors = p.validate().unwrap_err();
        assert!(errors.iter().any(|e| e.field == "speaking_rate"));
        assert!(errors.iter().any(|e| e.field == "pitch"));
    }

    #[test]
    fn validation_rejects_unknown_alphabet() {
        let mut p = params("tomato");
        p.pronunciations = Some(vec![Pronunciation {
            word: "tomato".to_string(),
            phonetic: "təˈmeɪtoʊ".to_string(),
            alphabet: "arpabet".to_string(),
        }]);
        let errors = p.validate().unwrap_err();
        assert!(errors.iter().any(|e| e.field == "pronunciations[0].alphabet"));
    }

    #[test]
    fn ssml_substitutes_pronunciations() {
        let mut p = params("say tomato now");
        p.pronunciations = Some(vec![Pronunciation {
            word: "tomato".to_string(),
            phonetic: "təˈmeɪtoʊ".to_string(),
            alphabet: "IPA".to_string(),
        }]);

        let ssml = p.build_ssml();
        assert!(ssml.starts_with("<speak>"));
        assert!(ssml.ends_with("</speak>"));
        assert!(ssml.contains(r#"<phoneme alphabet="ipa" ph="təˈmeɪtoʊ">tomato</phoneme>"#));
        assert!(!ssml.contains("say tomato now"));
    }

    #[tokio::test]
    async fn synthesize_returns_inline_audio() {
        let server = MockServer::start().await;
        let wav = BASE64.encode(b"RIFFspeech");

        Mock::given(method("POST"))
            .and(path("/v1/text:synthesize"))
            .and(body_partial_json(serde_json::json!({
                "input": {"text": "hello world"},
                "voice": {"languageCode": "en-US", "name": DEFAULT_VOICE},
                "audioConfig": {"audioEncoding": "LINEAR16"}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "audioContent": wav
            })))
            .expect(1)
            .mount(&server)
            .await;

        let handler = SpeechHandler::with_deps(test_config(), Credentials::fixed("t"), server.uri());
        let result = handler.synthesize(params("hello world")).await.unwrap();
        match result {
            SpeechResult::Inline { mime_type, .. } => assert_eq!(mime_type, "audio/wav"),
            other => panic!("expected inline result, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn synthesize_writes_output_file() {
        let server = MockServer::start().await;
        let wav = BASE64.encode(b"RIFFspeech");

        Mock::given(method("POST"))
            .and(path("/v1/text:synthesize"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "audioContent": wav
            })))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("speech.wav");

        let handler = SpeechHandler::with_deps(test_config(), Credentials::fixed("t"), server.uri());
        let mut p = params("hello world");
        p.output_file = Some(target.to_string_lossy().to_string());

        let result = handler.synthesize(p).await.unwrap();
        match result {
            SpeechResult::File(artifact) => {
                assert!(artifact.size_bytes > 0);
                assert!(target.exists());
            }
            other => panic!("expected file result, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn synthesize_uses_ssml_when_pronunciations_present() {
        let server = MockServer::start().await;
        let wav = BASE64.encode(b"RIFFspeech");

        Mock::given(method("POST"))
            .and(path("/v1/text:synthesize"))
            .and(body_partial_json(serde_json::json!({
                "input": {"ssml": "<speak><phoneme alphabet=\"ipa\" ph=\"ˈdeɪtə\">data</phoneme></speak>"}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "audioContent": wav
            })))
            .expect(1)
            .mount(&server)
            .await;

        let handler = SpeechHandler::with_deps(test_config(), Credentials::fixed("t"), server.uri());
        let mut p = params("data");
        p.pronunciations = Some(vec![Pronunciation {
            word: "data".to_string(),
            phonetic: "ˈdeɪtə".to_string(),
            alphabet: "ipa".to_string(),
        }]);

        handler.synthesize(p).await.unwrap();
    }

    #[tokio::test]
    async fn list_voices_keeps_only_chirp_hd() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v1/voices"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "voices": [
                    {"name": "en-US-Chirp3-HD-Achernar", "languageCodes": ["en-US"], "ssmlGender": "FEMALE"},
                    {"name": "en-US-Standard-A", "languageCodes": ["en-US"], "ssmlGender": "MALE"}
                ]
            })))
            .mount(&server)
            .await;

        let handler = SpeechHandler::with_deps(test_config(), Credentials::fixed("t"), server.uri());
        let voices = handler.list_voices(Some("en-US")).await.unwrap();
        assert_eq!(voices.len(), 1);
        assert!(voices[0].name.contains("Chirp3-HD"));
    }

    #[tokio::test]
    async fn synthesize_surfaces_http_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_string("bad voice"))
            .mount(&server)
            .await;

        let handler = SpeechHandler::with_deps(test_config(), Credentials::fixed("t"), server.uri());
        let err = handler.synthesize(params("hello")).await.unwrap_err();
        assert!(matches!(err, Error::Http { status: 400, .. }));
    }
}
