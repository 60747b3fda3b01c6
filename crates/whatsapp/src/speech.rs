//! Voice note transcription with Google Cloud Speech-to-Text

use std::sync::Arc;

use async_trait::async_trait;
use base64::Engine;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use relay_core::agent::TokenSource;
use relay_core::config::SpeechSettings;

use crate::error::{ChannelError, Result};
use crate::media::DownloadedMedia;

const SPEECH_BASE_URL: &str = "https://speech.googleapis.com";
const SAMPLE_RATE_HERTZ: u32 = 16_000;

/// Turns audio into text
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// `Ok(None)` when the service recognised nothing
    async fn transcribe(&self, media: &DownloadedMedia) -> Result<Option<String>>;
}

/// Audio encodings understood by the recogniser
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AudioEncoding {
    OggOpus,
    Mp3,
    Linear16,
    WebmOpus,
}

impl AudioEncoding {
    /// WhatsApp voice notes are Ogg/Opus, which is also the fallback
    pub fn from_mime(mime_type: &str) -> Self {
        let mime = mime_type.to_ascii_lowercase();
        if mime.contains("mp3") || mime.contains("mpeg") {
            Self::Mp3
        } else if mime.contains("wav") {
            Self::Linear16
        } else if mime.contains("webm") {
            Self::WebmOpus
        } else {
            Self::OggOpus
        }
    }
}

/// Recognition settings
#[derive(Debug, Clone)]
pub struct SpeechConfig {
    pub language_code: String,
    pub alternative_language_codes: Vec<String>,
}

impl From<&SpeechSettings> for SpeechConfig {
    fn from(settings: &SpeechSettings) -> Self {
        Self {
            language_code: settings.language_code.clone(),
            alternative_language_codes: settings.alternative_language_codes.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RecognitionConfig<'a> {
    encoding: AudioEncoding,
    sample_rate_hertz: u32,
    language_code: &'a str,
    alternative_language_codes: &'a [String],
    enable_automatic_punctuation: bool,
    enable_word_confidence: bool,
    max_alternatives: u32,
}

#[derive(Debug, Serialize)]
struct RecognitionAudio {
    content: String,
}

#[derive(Debug, Serialize)]
struct RecognizeRequest<'a> {
    config: RecognitionConfig<'a>,
    audio: RecognitionAudio,
}

#[derive(Debug, Default, Deserialize)]
struct RecognizeResponse {
    #[serde(default)]
    results: Vec<RecognitionResult>,
}

#[derive(Debug, Deserialize)]
struct RecognitionResult {
    #[serde(default)]
    alternatives: Vec<RecognitionAlternative>,
}

#[derive(Debug, Deserialize)]
struct RecognitionAlternative {
    #[serde(default)]
    transcript: String,
    #[serde(default)]
    confidence: f32,
}

/// Speech-to-Text REST client.
///
/// Uses `v1p1beta1`, the surface that accepts alternative languages.
pub struct SpeechToText {
    client: Client,
    config: SpeechConfig,
    tokens: Arc<dyn TokenSource>,
    base_url: String,
}

impl SpeechToText {
    pub fn new(config: SpeechConfig, tokens: Arc<dyn TokenSource>) -> Self {
        Self {
            client: Client::new(),
            config,
            tokens,
            base_url: SPEECH_BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }
}

#[async_trait]
impl Transcriber for SpeechToText {
    async fn transcribe(&self, media: &DownloadedMedia) -> Result<Option<String>> {
        let audio = media.read_bytes().await?;
        let request = RecognizeRequest {
            config: RecognitionConfig {
                encoding: AudioEncoding::from_mime(media.mime_type()),
                sample_rate_hertz: SAMPLE_RATE_HERTZ,
                language_code: &self.config.language_code,
                alternative_language_codes: &self.config.alternative_language_codes,
                enable_automatic_punctuation: true,
                enable_word_confidence: true,
                max_alternatives: 1,
            },
            audio: RecognitionAudio {
                content: base64::engine::general_purpose::STANDARD.encode(audio),
            },
        };

        let token = self.tokens.token().await?;
        let resp = self
            .client
            .post(format!("{}/v1p1beta1/speech:recognize", self.base_url))
            .bearer_auth(token)
            .json(&request)
            .send()
            .await
            .map_err(|e| ChannelError::request("Speech-to-Text request failed", e))?;

        if !resp.status().is_success() {
            return Err(ChannelError::from_response("Speech-to-Text request failed", resp).await);
        }

        let body: RecognizeResponse = resp
            .json()
            .await
            .map_err(|e| ChannelError::Transcription(format!("Invalid response: {}", e)))?;

        let best = body
            .results
            .into_iter()
            .next()
            .and_then(|result| result.alternatives.into_iter().next());

        match best {
            Some(alternative) if !alternative.transcript.trim().is_empty() => {
                info!(
                    "Transcription succeeded with confidence {:.2}",
                    alternative.confidence
                );
                Ok(Some(alternative.transcript))
            }
            _ => {
                warn!("Speech-to-Text returned no transcript");
                Ok(None)
            }
        }
    }
}
