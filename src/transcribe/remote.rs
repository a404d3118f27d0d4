//! HTTP client for the remote transcription server
//!
//! The server exposes `GET /health` (liveness) and `POST /transcribe`
//! (multipart `audio` file plus optional `language` field) and answers with
//! `{text, language, language_probability}` or `{error}`. Audio is shipped
//! as a WAV container wrapping the captured PCM bytes.

use super::{Transcriber, Transcription, TranscriptionRequest};
use crate::config::{AudioSettings, SampleFormat, ServerSettings};
use crate::error::TranscribeError;
use std::io::Cursor;
use std::time::Duration;

/// Remote transcriber talking to the whisper HTTP server
#[derive(Debug)]
pub struct RemoteTranscriber {
    /// Base endpoint URL (e.g., "http://localhost:5000")
    endpoint: String,
    /// Health check timeout
    health_timeout: Duration,
    /// Audio parameters for the WAV header
    sample_rate: u32,
    channels: u16,
    sample_format: SampleFormat,
}

impl RemoteTranscriber {
    /// Create a new remote transcriber from settings
    pub fn new(
        server: &ServerSettings,
        audio: &AudioSettings,
    ) -> Result<Self, TranscribeError> {
        let endpoint = server.url.trim_end_matches('/').to_string();

        if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
            return Err(TranscribeError::ConfigError(format!(
                "server.url must start with http:// or https://, got: {}",
                endpoint
            )));
        }

        if endpoint.starts_with("http://")
            && !endpoint.contains("localhost")
            && !endpoint.contains("127.0.0.1")
            && !endpoint.contains("[::1]")
        {
            tracing::warn!(
                "Server uses HTTP without TLS. Audio data will be transmitted unencrypted!"
            );
        }

        tracing::info!(
            "Configured remote transcriber: endpoint={}, health timeout={}s",
            endpoint,
            server.health_timeout_secs
        );

        Ok(Self {
            endpoint,
            health_timeout: Duration::from_secs(server.health_timeout_secs),
            sample_rate: audio.sample_rate,
            channels: audio.channels,
            sample_format: audio.sample_format,
        })
    }

    /// Wrap raw PCM bytes in a WAV container
    fn encode_wav(&self, pcm: &[u8]) -> Result<Vec<u8>, TranscribeError> {
        let (bits_per_sample, wav_format) = match self.sample_format {
            SampleFormat::Int16 => (16, hound::SampleFormat::Int),
            SampleFormat::Float32 => (32, hound::SampleFormat::Float),
        };

        let spec = hound::WavSpec {
            channels: self.channels,
            sample_rate: self.sample_rate,
            bits_per_sample,
            sample_format: wav_format,
        };

        let mut buffer = Cursor::new(Vec::new());
        let mut writer = hound::WavWriter::new(&mut buffer, spec).map_err(|e| {
            TranscribeError::AudioFormat(format!("Failed to create WAV writer: {}", e))
        })?;

        match self.sample_format {
            SampleFormat::Int16 => {
                for chunk in pcm.chunks_exact(2) {
                    let sample = i16::from_le_bytes([chunk[0], chunk[1]]);
                    writer.write_sample(sample).map_err(|e| {
                        TranscribeError::AudioFormat(format!("Failed to write sample: {}", e))
                    })?;
                }
            }
            SampleFormat::Float32 => {
                for chunk in pcm.chunks_exact(4) {
                    let sample = f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
                    writer.write_sample(sample).map_err(|e| {
                        TranscribeError::AudioFormat(format!("Failed to write sample: {}", e))
                    })?;
                }
            }
        }

        writer
            .finalize()
            .map_err(|e| TranscribeError::AudioFormat(format!("Failed to finalize WAV: {}", e)))?;

        Ok(buffer.into_inner())
    }

    /// Build the multipart form body for the submission
    fn build_multipart_body(
        &self,
        wav_data: &[u8],
        language: Option<&str>,
    ) -> (String, Vec<u8>) {
        let boundary = format!(
            "----TalkeyBoundary{}",
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap_or_default()
                .as_nanos()
        );

        let mut body = Vec::new();

        // Audio file field (the server reads request.files['audio'])
        body.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
        body.extend_from_slice(
            b"Content-Disposition: form-data; name=\"audio\"; filename=\"audio.wav\"\r\n",
        );
        body.extend_from_slice(b"Content-Type: audio/wav\r\n\r\n");
        body.extend_from_slice(wav_data);
        body.extend_from_slice(b"\r\n");

        // Language hint (omitted entirely for auto-detect)
        if let Some(language) = language {
            body.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
            body.extend_from_slice(b"Content-Disposition: form-data; name=\"language\"\r\n\r\n");
            body.extend_from_slice(language.as_bytes());
            body.extend_from_slice(b"\r\n");
        }

        body.extend_from_slice(format!("--{}--\r\n", boundary).as_bytes());

        (boundary, body)
    }
}

/// Map a ureq error to the transcription error taxonomy
fn map_transport_error(e: ureq::Error) -> TranscribeError {
    match e {
        ureq::Error::Status(code, resp) => {
            // The server puts a human-readable message in {"error": ...}
            let body = resp.into_string().unwrap_or_default();
            let message = serde_json::from_str::<serde_json::Value>(&body)
                .ok()
                .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(String::from))
                .unwrap_or(body);
            TranscribeError::ServerError(format!("server returned {}: {}", code, message))
        }
        ureq::Error::Transport(t) => {
            let message = t.to_string();
            match t.kind() {
                ureq::ErrorKind::ConnectionFailed | ureq::ErrorKind::Dns => {
                    TranscribeError::Unreachable(message)
                }
                ureq::ErrorKind::Io if message.contains("timed out") => {
                    TranscribeError::Timeout(message)
                }
                _ => TranscribeError::Other(message),
            }
        }
    }
}

impl Transcriber for RemoteTranscriber {
    fn check_health(&self) -> bool {
        let url = format!("{}/health", self.endpoint);
        match ureq::get(&url).timeout(self.health_timeout).call() {
            Ok(response) => response.status() == 200,
            Err(e) => {
                tracing::debug!("Health check failed: {}", e);
                false
            }
        }
    }

    fn submit(&self, request: TranscriptionRequest) -> Result<Transcription, TranscribeError> {
        if request.audio.is_empty() {
            return Err(TranscribeError::AudioFormat("Empty audio buffer".into()));
        }

        let duration_secs = request.audio.len() as f32
            / (self.sample_rate as f32 * self.sample_format.bytes_per_sample() as f32);
        tracing::debug!(
            "Sending {:.2}s of audio to server ({} bytes)",
            duration_secs,
            request.audio.len()
        );

        let start = std::time::Instant::now();

        let wav_data = self.encode_wav(&request.audio)?;
        tracing::debug!("Encoded WAV: {} bytes", wav_data.len());

        let (boundary, body) =
            self.build_multipart_body(&wav_data, request.language.as_deref());

        let url = format!("{}/transcribe", self.endpoint);

        let response = ureq::post(&url)
            .timeout(request.timeout)
            .set(
                "Content-Type",
                &format!("multipart/form-data; boundary={}", boundary),
            )
            .send_bytes(&body)
            .map_err(map_transport_error)?;

        let json: serde_json::Value = response
            .into_json()
            .map_err(|e| TranscribeError::ServerError(format!("Failed to parse response: {}", e)))?;

        let text = json
            .get("text")
            .and_then(|v| v.as_str())
            .ok_or_else(|| {
                TranscribeError::ServerError(format!("Response missing 'text' field: {}", json))
            })?
            .trim()
            .to_string();

        let language = json
            .get("language")
            .and_then(|v| v.as_str())
            .map(String::from);
        let language_probability = json.get("language_probability").and_then(|v| v.as_f64());

        tracing::info!(
            "Transcription completed in {:.2}s: {:?}",
            start.elapsed().as_secs_f32(),
            if text.chars().count() > 50 {
                format!("{}...", text.chars().take(50).collect::<String>())
            } else {
                text.clone()
            }
        );

        Ok(Transcription {
            text,
            language,
            language_probability,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;

    fn transcriber_with(url: &str) -> Result<RemoteTranscriber, TranscribeError> {
        let mut settings = Settings::default();
        settings.server.url = url.to_string();
        RemoteTranscriber::new(&settings.server, &settings.audio)
    }

    #[test]
    fn test_config_validation_invalid_url() {
        let result = transcriber_with("not-a-url");
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("http://"));
    }

    #[test]
    fn test_trailing_slash_is_trimmed() {
        let transcriber = transcriber_with("http://localhost:5000/").unwrap();
        assert_eq!(transcriber.endpoint, "http://localhost:5000");
    }

    #[test]
    fn test_encode_wav_int16() {
        let transcriber = transcriber_with("http://localhost:5000").unwrap();

        // One second of silence: 16000 samples * 2 bytes
        let pcm = vec![0u8; 32000];
        let wav = transcriber.encode_wav(&pcm).unwrap();

        // WAV header is 44 bytes, then the payload unchanged in size
        assert_eq!(wav.len(), 44 + 32000);
        assert_eq!(&wav[0..4], b"RIFF");
        assert_eq!(&wav[8..12], b"WAVE");
    }

    #[test]
    fn test_multipart_body_structure() {
        let transcriber = transcriber_with("http://localhost:5000").unwrap();
        let wav_data = vec![0u8; 100];

        let (boundary, body) = transcriber.build_multipart_body(&wav_data, Some("en"));
        let body_str = String::from_utf8_lossy(&body);

        assert!(body_str.contains(&boundary));
        assert!(body_str.contains("name=\"audio\""));
        assert!(body_str.contains("filename=\"audio.wav\""));
        assert!(body_str.contains("name=\"language\""));
        assert!(body_str.ends_with(&format!("--{}--\r\n", boundary)));
    }

    #[test]
    fn test_multipart_body_omits_language_for_auto_detect() {
        let transcriber = transcriber_with("http://localhost:5000").unwrap();

        let (_, body) = transcriber.build_multipart_body(&[0u8; 10], None);
        let body_str = String::from_utf8_lossy(&body);
        assert!(!body_str.contains("name=\"language\""));
    }

    #[test]
    fn test_submit_rejects_empty_buffer() {
        let transcriber = transcriber_with("http://localhost:5000").unwrap();
        let result = transcriber.submit(TranscriptionRequest {
            audio: Vec::new(),
            language: None,
            timeout: Duration::from_secs(1),
        });
        assert!(matches!(result, Err(TranscribeError::AudioFormat(_))));
    }

    #[test]
    fn test_unreachable_server_maps_to_taxonomy() {
        // Nothing listens on this port; the error must be one of the four
        // transport kinds, not a panic or a success.
        let transcriber = transcriber_with("http://127.0.0.1:1").unwrap();
        let result = transcriber.submit(TranscriptionRequest {
            audio: vec![0u8; 2000],
            language: None,
            timeout: Duration::from_secs(1),
        });
        match result {
            Err(TranscribeError::Unreachable(_))
            | Err(TranscribeError::Timeout(_))
            | Err(TranscribeError::Other(_)) => {}
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_health_check_unreachable_is_false() {
        let transcriber = transcriber_with("http://127.0.0.1:1").unwrap();
        assert!(!transcriber.check_health());
    }
}
