//! Local media processing with ffmpeg/ffprobe.
//!
//! Inputs and outputs may be local paths or `gs://` URIs; remote inputs are
//! downloaded into a temp directory and remote outputs are uploaded from
//! one. The batch operation runs items strictly sequentially with a fixed
//! pause, recording per-item failures without aborting.

use mediakit_common::auth::Credentials;
use mediakit_common::batch::{run_sequential, BatchReport};
use mediakit_common::config::Config;
use mediakit_common::error::Error;
use mediakit_common::media::content_type_for;
use mediakit_common::storage::{ObjectUri, StorageClient};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::args::{self, VolumeValue};

/// Bitrate used for MP3 conversion when the request does not set one.
pub const DEFAULT_BITRATE: &str = "192k";

/// Frame rate used for GIF conversion when the request does not set one.
pub const DEFAULT_GIF_FPS: u8 = 10;

/// Pause between batch items.
pub const BATCH_DELAY_MS: u64 = 1000;

// =============================================================================
// Parameter types
// =============================================================================

/// Parameters for `ffmpeg_media_info`.
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
pub struct MediaInfoParams {
    /// Input file (local path or gs:// URI).
    pub input: String,
}

/// Parameters for `ffmpeg_convert_wav_to_mp3`.
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
pub struct ConvertAudioParams {
    /// Input WAV file (local path or gs:// URI).
    pub input: String,
    /// Output MP3 file (local path or gs:// URI).
    pub output: String,
    /// Audio bitrate such as "128k" or "320k".
    #[serde(default = "default_bitrate")]
    pub bitrate: String,
}

fn default_bitrate() -> String {
    DEFAULT_BITRATE.to_string()
}

/// Parameters for `ffmpeg_video_to_gif`.
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
pub struct VideoToGifParams {
    /// Input video file (local path or gs:// URI).
    pub input: String,
    /// Output GIF file (local path or gs:// URI).
    pub output: String,
    /// Frames per second of the GIF.
    #[serde(default = "default_fps")]
    pub fps: u8,
    /// Output width in pixels; height keeps the aspect ratio.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    /// Start offset in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<f64>,
    /// Clip length in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
}

fn default_fps() -> u8 {
    DEFAULT_GIF_FPS
}

/// Parameters for `ffmpeg_mux_audio_video`.
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
pub struct MuxParams {
    /// Input video file (local path or gs:// URI).
    pub video_input: String,
    /// Input audio file (local path or gs:// URI).
    pub audio_input: String,
    /// Output file (local path or gs:// URI).
    pub output: String,
}

/// Parameters for `ffmpeg_concat_media`.
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
pub struct ConcatParams {
    /// Input files in playback order (local paths or gs:// URIs).
    pub inputs: Vec<String>,
    /// Output file (local path or gs:// URI).
    pub output: String,
}

/// Parameters for `ffmpeg_adjust_volume`.
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
pub struct VolumeAdjustParams {
    /// Input audio file (local path or gs:// URI).
    pub input: String,
    /// Output audio file (local path or gs:// URI).
    pub output: String,
    /// Multiplier ("0.5", "2.0") or dB offset ("-3dB", "+6dB").
    pub volume: String,
}

/// One operation inside a batch, tagged by name.
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
#[serde(tag = "operation", rename_all = "snake_case")]
pub enum BatchItem {
    ConvertAudio(ConvertAudioParams),
    VideoToGif(VideoToGifParams),
    Mux(MuxParams),
    Concat(ConcatParams),
    AdjustVolume(VolumeAdjustParams),
}

/// Parameters for `ffmpeg_batch`.
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
pub struct BatchParams {
    /// Operations to run, strictly in order.
    pub items: Vec<BatchItem>,
    /// Pause between operations in milliseconds.
    #[serde(default = "default_batch_delay_ms")]
    pub delay_ms: u64,
}

fn default_batch_delay_ms() -> u64 {
    BATCH_DELAY_MS
}

// =============================================================================
// Output types
// =============================================================================

/// ffprobe summary of a media file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaInfo {
    /// Duration in seconds.
    pub duration: f64,
    /// Container format name.
    pub format: String,
    /// Streams in the file.
    pub streams: Vec<StreamInfo>,
}

/// One stream inside a media file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamInfo {
    pub index: u32,
    pub codec_type: String,
    pub codec_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sample_rate: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channels: Option<u32>,
}

// =============================================================================
// Handler
// =============================================================================

/// ffmpeg/ffprobe handler.
pub struct AvToolHandler {
    pub config: Config,
    pub storage: StorageClient,
    temp_dir: PathBuf,
}

impl AvToolHandler {
    /// Handler over discovered Application Default Credentials.
    #[instrument(level = "debug", name = "avtool_handler_new", skip_all)]
    pub async fn new(config: Config) -> Result<Self, Error> {
        let storage = StorageClient::new(Credentials::discover().await?);

        let temp_dir = std::env::temp_dir().join("mediakit-avtool");
        tokio::fs::create_dir_all(&temp_dir).await?;

        Ok(Self {
            config,
            storage,
            temp_dir,
        })
    }

    #[cfg(test)]
    fn with_deps(config: Config, storage: StorageClient, temp_dir: PathBuf) -> Self {
        Self {
            config,
            storage,
            temp_dir,
        }
    }

    fn is_remote(path: &str) -> bool {
        path.starts_with("gs://")
    }

    fn temp_path(&self, stem: &str, extension: &str) -> PathBuf {
        self.temp_dir.join(format!("{}_{}.{}", Uuid::new_v4(), stem, extension))
    }

    /// Local path for an input, downloading it first when remote.
    async fn stage_input(&self, input: &str) -> Result<PathBuf, Error> {
        if !Self::is_remote(input) {
            return Ok(PathBuf::from(input));
        }

        let uri = ObjectUri::parse(input)?;
        let local = self.temp_dir.join(format!("{}_{}", Uuid::new_v4(), uri.file_name()));

        debug!(uri = %input, local = %local.display(), "downloading input");
        let data = self.storage.download(&uri).await?;
        tokio::fs::write(&local, &data).await?;
        Ok(local)
    }

    /// Move a finished temp file to its destination, uploading when remote.
    async fn deliver_output(&self, produced: &Path, output: &str) -> Result<String, Error> {
        if Self::is_remote(output) {
            let uri = ObjectUri::parse(output)?;
            let data = tokio::fs::read(produced).await?;
            debug!(local = %produced.display(), uri = %output, "uploading output");
            self.storage.upload(&uri, &data, content_type_for(produced)).await?;
        } else if produced != Path::new(output) {
            if let Some(parent) = Path::new(output).parent() {
                if !parent.as_os_str().is_empty() {
                    tokio::fs::create_dir_all(parent).await?;
                }
            }
            tokio::fs::copy(produced, output).await?;
        }
        Ok(output.to_string())
    }

    async fn cleanup(&self, staged: &[(String, PathBuf)], temp_output: Option<&Path>) {
        for (original, local) in staged {
            if Self::is_remote(original) {
                let _ = tokio::fs::remove_file(local).await;
            }
        }
        if let Some(path) = temp_output {
            let _ = tokio::fs::remove_file(path).await;
        }
    }

    async fn run_ffprobe(&self, input: &Path) -> Result<serde_json::Value, Error> {
        let input_str = input.to_string_lossy();
        let arg_list = args::probe_args(&input_str);

        let output = Command::new("ffprobe")
            .args(&arg_list)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::tool(format!("ffprobe failed for '{}': {stderr}", input.display())));
        }

        serde_json::from_slice(&output.stdout)
            .map_err(|e| Error::tool(format!("unparseable ffprobe output: {e}")))
    }

    async fn run_ffmpeg(&self, arg_list: &[String]) -> Result<(), Error> {
        debug!(args = ?arg_list, "running ffmpeg");

        let output = Command::new("ffmpeg")
            .arg("-y")
            .args(arg_list)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::tool(format!("ffmpeg failed: {stderr}")));
        }

        Ok(())
    }

    // =========================================================================
    // Operations
    // =========================================================================

    /// Inspect a media file with ffprobe.
    #[instrument(level = "info", skip(self))]
    pub async fn media_info(&self, params: MediaInfoParams) -> Result<MediaInfo, Error> {
        let local = self.stage_input(&params.input).await?;
        let json = self.run_ffprobe(&local).await?;
        self.cleanup(&[(params.input.clone(), local)], None).await;

        let format = json
            .get("format")
            .ok_or_else(|| Error::tool("ffprobe output has no 'format' section"))?;

        let duration: f64 = format
            .get("duration")
            .and_then(|d| d.as_str())
            .and_then(|s| s.parse().ok())
            .unwrap_or(0.0);

        let format_name = format
            .get("format_name")
            .and_then(|f| f.as_str())
            .unwrap_or("unknown")
            .to_string();

        let streams = json
            .get("streams")
            .and_then(|s| s.as_array())
            .map(|arr| arr.iter().map(parse_stream).collect())
            .unwrap_or_default();

        let info = MediaInfo {
            duration,
            format: format_name,
            streams,
        };
        info!(duration = info.duration, format = %info.format, streams = info.streams.len(), "probed media");
        Ok(info)
    }

    /// Convert WAV to MP3.
    #[instrument(level = "info", skip(self))]
    pub async fn convert_audio(&self, params: ConvertAudioParams) -> Result<String, Error> {
        let local_in = self.stage_input(&params.input).await?;
        let temp_out = self.temp_path("audio", "mp3");

        let arg_list = args::convert_wav_to_mp3_args(
            &local_in.to_string_lossy(),
            &temp_out.to_string_lossy(),
            &params.bitrate,
        );
        self.run_ffmpeg(&arg_list).await?;

        let result = self.deliver_output(&temp_out, &params.output).await?;
        self.cleanup(&[(params.input.clone(), local_in)], Some(&temp_out)).await;

        info!(output = %result, "converted audio");
        Ok(result)
    }

    /// Convert video to GIF.
    #[instrument(level = "info", skip(self))]
    pub async fn video_to_gif(&self, params: VideoToGifParams) -> Result<String, Error> {
        let local_in = self.stage_input(&params.input).await?;
        let temp_out = self.temp_path("clip", "gif");

        let arg_list = args::video_to_gif_args(
            &local_in.to_string_lossy(),
            &temp_out.to_string_lossy(),
            params.fps,
            params.width,
            params.start_time,
            params.duration,
        );
        self.run_ffmpeg(&arg_list).await?;

        let result = self.deliver_output(&temp_out, &params.output).await?;
        self.cleanup(&[(params.input.clone(), local_in)], Some(&temp_out)).await;

        info!(output = %result, "converted to GIF");
        Ok(result)
    }

    /// Mux a video stream with an audio stream.
    #[instrument(level = "info", skip(self))]
    pub async fn mux(&self, params: MuxParams) -> Result<String, Error> {
        let local_video = self.stage_input(&params.video_input).await?;
        let local_audio = self.stage_input(&params.audio_input).await?;

        let ext = extension_of(&params.output, "mp4");
        let temp_out = self.temp_path("muxed", &ext);

        let arg_list = args::mux_args(
            &local_video.to_string_lossy(),
            &local_audio.to_string_lossy(),
            &temp_out.to_string_lossy(),
        );
        self.run_ffmpeg(&arg_list).await?;

        let result = self.deliver_output(&temp_out, &params.output).await?;
        self.cleanup(
            &[
                (params.video_input.clone(), local_video),
                (params.audio_input.clone(), local_audio),
            ],
            Some(&temp_out),
        )
        .await;

        info!(output = %result, "muxed audio and video");
        Ok(result)
    }

    /// Concatenate media files in order.
    #[instrument(level = "info", skip(self))]
    pub async fn concat(&self, params: ConcatParams) -> Result<String, Error> {
        if params.inputs.len() < 2 {
            return Err(Error::validation("concat needs at least two inputs"));
        }

        let mut staged = Vec::with_capacity(params.inputs.len());
        for input in &params.inputs {
            staged.push((input.clone(), self.stage_input(input).await?));
        }

        // The concat demuxer reads a list of `file '<path>'` lines.
        let list_file = self.temp_path("concat", "txt");
        let listing: String = staged
            .iter()
            .map(|(_, local)| format!("file '{}'\n", local.display()))
            .collect();
        tokio::fs::write(&list_file, &listing).await?;

        let ext = extension_of(&params.output, "mp4");
        let temp_out = self.temp_path("joined", &ext);

        let arg_list = args::concat_args(&list_file.to_string_lossy(), &temp_out.to_string_lossy());
        let run = self.run_ffmpeg(&arg_list).await;
        let _ = tokio::fs::remove_file(&list_file).await;
        run?;

        let result = self.deliver_output(&temp_out, &params.output).await?;
        self.cleanup(&staged, Some(&temp_out)).await;

        info!(output = %result, inputs = params.inputs.len(), "concatenated media");
        Ok(result)
    }

    /// Adjust audio volume.
    #[instrument(level = "info", skip(self))]
    pub async fn adjust_volume(&self, params: VolumeAdjustParams) -> Result<String, Error> {
        let volume = VolumeValue::parse(&params.volume).map_err(|e| Error::validation(e))?;

        let local_in = self.stage_input(&params.input).await?;
        let ext = extension_of(&params.output, "wav");
        let temp_out = self.temp_path("leveled", &ext);

        let arg_list = args::adjust_volume_args(
            &local_in.to_string_lossy(),
            &temp_out.to_string_lossy(),
            &volume,
        );
        self.run_ffmpeg(&arg_list).await?;

        let result = self.deliver_output(&temp_out, &params.output).await?;
        self.cleanup(&[(params.input.clone(), local_in)], Some(&temp_out)).await;

        info!(output = %result, "adjusted volume");
        Ok(result)
    }

    /// Run a list of operations strictly sequentially with a fixed pause,
    /// recording per-item failures and continuing.
    #[instrument(level = "info", skip(self, params), fields(items = params.items.len()))]
    pub async fn run_batch(&self, params: BatchParams) -> BatchReport<String> {
        let delay = Duration::from_millis(params.delay_ms);

        run_sequential(params.items, delay, |item| async move {
            match item {
                BatchItem::ConvertAudio(p) => self.convert_audio(p).await,
                BatchItem::VideoToGif(p) => self.video_to_gif(p).await,
                BatchItem::Mux(p) => self.mux(p).await,
                BatchItem::Concat(p) => self.concat(p).await,
                BatchItem::AdjustVolume(p) => self.adjust_volume(p).await,
            }
        })
        .await
    }
}

fn parse_stream(s: &serde_json::Value) -> StreamInfo {
    StreamInfo {
        index: s.get("index").and_then(|i| i.as_u64()).unwrap_or(0) as u32,
        codec_type: s
            .get("codec_type")
            .and_then(|c| c.as_str())
            .unwrap_or("unknown")
            .to_string(),
        codec_name: s
            .get("codec_name")
            .and_then(|c| c.as_str())
            .unwrap_or("unknown")
            .to_string(),
        width: s.get("width").and_then(|w| w.as_u64()).map(|w| w as u32),
        height: s.get("height").and_then(|h| h.as_u64()).map(|h| h as u32),
        sample_rate: s
            .get("sample_rate")
            .and_then(|r| r.as_str())
            .and_then(|r| r.parse().ok()),
        channels: s.get("channels").and_then(|c| c.as_u64()).map(|c| c as u32),
    }
}

fn extension_of(path: &str, fallback: &str) -> String {
    Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or(fallback)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_handler(temp_dir: PathBuf) -> AvToolHandler {
        AvToolHandler::with_deps(
            Config {
                project_id: "demo-project".to_string(),
                location: "us-central1".to_string(),
                media_bucket: None,
                port: 8080,
            },
            StorageClient::new(Credentials::fixed("t")),
            temp_dir,
        )
    }

    #[test]
    fn remote_detection() {
        assert!(AvToolHandler::is_remote("gs://bucket/clip.mp4"));
        assert!(!AvToolHandler::is_remote("/tmp/clip.mp4"));
        assert!(!AvToolHandler::is_remote("clip.mp4"));
    }

    #[test]
    fn extension_of_falls_back() {
        assert_eq!(extension_of("out.webm", "mp4"), "webm");
        assert_eq!(extension_of("out", "mp4"), "mp4");
    }

    #[test]
    fn batch_item_deserializes_by_tag() {
        let item: BatchItem = serde_json::from_str(
            r#"{"operation": "convert_audio", "input": "a.wav", "output": "a.mp3"}"#,
        )
        .unwrap();
        match item {
            BatchItem::ConvertAudio(p) => {
                assert_eq!(p.input, "a.wav");
                assert_eq!(p.bitrate, DEFAULT_BITRATE);
            }
            other => panic!("expected convert_audio, got {other:?}"),
        }

        let item: BatchItem = serde_json::from_str(
            r#"{"operation": "adjust_volume", "input": "a.wav", "output": "b.wav", "volume": "-3dB"}"#,
        )
        .unwrap();
        assert!(matches!(item, BatchItem::AdjustVolume(_)));
    }

    #[test]
    fn batch_params_default_delay() {
        let params: BatchParams = serde_json::from_str(r#"{"items": []}"#).unwrap();
        assert_eq!(params.delay_ms, BATCH_DELAY_MS);
    }

    #[test]
    fn parse_stream_reads_video_fields() {
        let value = serde_json::json!({
            "index": 0,
            "codec_type": "video",
            "codec_name": "h264",
            "width": 1920,
            "height": 1080
        });
        let stream = parse_stream(&value);
        assert_eq!(stream.codec_type, "video");
        assert_eq!(stream.width, Some(1920));
        assert!(stream.sample_rate.is_none());
    }

    #[test]
    fn parse_stream_reads_audio_fields() {
        let value = serde_json::json!({
            "index": 1,
            "codec_type": "audio",
            "codec_name": "aac",
            "sample_rate": "48000",
            "channels": 2
        });
        let stream = parse_stream(&value);
        assert_eq!(stream.codec_name, "aac");
        assert_eq!(stream.sample_rate, Some(48000));
        assert_eq!(stream.channels, Some(2));
    }

    #[tokio::test]
    async fn concat_rejects_fewer_than_two_inputs() {
        let dir = tempfile::tempdir().unwrap();
        let handler = test_handler(dir.path().to_path_buf());

        let err = handler
            .concat(ConcatParams {
                inputs: vec!["only.mp4".to_string()],
                output: "out.mp4".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[tokio::test]
    async fn adjust_volume_rejects_bad_volume_before_running_ffmpeg() {
        let dir = tempfile::tempdir().unwrap();
        let handler = test_handler(dir.path().to_path_buf());

        let err = handler
            .adjust_volume(VolumeAdjustParams {
                input: "in.wav".to_string(),
                output: "out.wav".to_string(),
                volume: "very loud".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn batch_records_failures_and_continues() {
        let dir = tempfile::tempdir().unwrap();
        let handler = test_handler(dir.path().to_path_buf());

        // Both items fail fast in validation; the batch must still visit
        // every item and count both failures.
        let report = handler
            .run_batch(BatchParams {
                items: vec![
                    BatchItem::AdjustVolume(VolumeAdjustParams {
                        input: "a.wav".to_string(),
                        output: "b.wav".to_string(),
                        volume: "not-a-volume".to_string(),
                    }),
                    BatchItem::Concat(ConcatParams {
                        inputs: vec!["one.mp4".to_string()],
                        output: "out.mp4".to_string(),
                    }),
                ],
                delay_ms: 100,
            })
            .await;

        assert_eq!(report.total(), 2);
        assert_eq!(report.succeeded, 0);
        assert_eq!(report.failed, 2);
        assert!(report.items[0].error.as_deref().unwrap().contains("volume"));
        assert!(report.items[1].error.as_deref().unwrap().contains("two inputs"));
    }
}
