//! In-process fakes for route and webhook tests

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures::{stream, StreamExt};
use serde_json::{json, Value};

use relay_core::agent::{AgentEngine, AgentEvent, EventStream};
use relay_core::config::FeatureFlags;
use relay_core::session::InMemorySessionStore;
use relay_whatsapp::{ChannelError, DownloadedMedia, MessagingApi, ObjectStore, Transcriber};

use crate::state::{AppState, WhatsAppContext};

pub const VERIFY_TOKEN: &str = "secret-token";
pub const PHONE_NUMBER_ID: &str = "PNID";

/// Agent Engine double answering every query with a fixed script
pub struct FakeEngine {
    events: Vec<Value>,
    fail: bool,
    fail_mid_stream: bool,
    created: AtomicUsize,
    queries: Mutex<Vec<(String, String, String)>>,
}

impl FakeEngine {
    fn build(events: Vec<Value>, fail: bool, fail_mid_stream: bool) -> Arc<Self> {
        Arc::new(Self {
            events,
            fail,
            fail_mid_stream,
            created: AtomicUsize::new(0),
            queries: Mutex::new(Vec::new()),
        })
    }

    pub fn new() -> Arc<Self> {
        Self::build(Vec::new(), false, false)
    }

    pub fn with_events(events: Vec<Value>) -> Arc<Self> {
        Self::build(events, false, false)
    }

    /// Emits `events`, an error, then one more text event
    pub fn with_events_then_error(events: Vec<Value>) -> Arc<Self> {
        Self::build(events, false, true)
    }

    /// Every call fails
    pub fn failing() -> Arc<Self> {
        Self::build(Vec::new(), true, false)
    }

    pub fn sessions_created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    /// `(user_id, session_id, message)` of every query, in order
    pub fn queries(&self) -> Vec<(String, String, String)> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl AgentEngine for FakeEngine {
    fn name(&self) -> &str {
        "fake-engine"
    }

    async fn create_session(&self, user_id: &str) -> relay_core::Result<String> {
        if self.fail {
            return Err(relay_core::Error::Agent("engine unavailable".into()));
        }
        let n = self.created.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(format!("{}-session-{}", user_id, n))
    }

    async fn stream_query(
        &self,
        user_id: &str,
        session_id: &str,
        message: &str,
    ) -> relay_core::Result<EventStream> {
        if self.fail {
            return Err(relay_core::Error::Agent("engine unavailable".into()));
        }
        self.queries.lock().unwrap().push((
            user_id.to_string(),
            session_id.to_string(),
            message.to_string(),
        ));

        let mut items: Vec<relay_core::Result<AgentEvent>> = self
            .events
            .iter()
            .cloned()
            .map(|raw| Ok(AgentEvent::from_value(raw)))
            .collect();
        if self.fail_mid_stream {
            items.push(Err(relay_core::Error::Agent("stream interrupted".into())));
            items.push(Ok(AgentEvent::from_value(json!({"text": "after error"}))));
        }
        Ok(stream::iter(items).boxed())
    }
}

/// Records outbound messages; downloads return a small PNG
#[derive(Default)]
pub struct FakeMessaging {
    fail_downloads: bool,
    sent: Mutex<Vec<(String, String, String)>>,
}

impl FakeMessaging {
    /// `(to, body, phone_number_id)` of every message sent
    pub fn sent(&self) -> Vec<(String, String, String)> {
        self.sent.lock().unwrap().clone()
    }
}

const PNG_HEADER: &[u8] = &[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0x0D];

#[async_trait]
impl MessagingApi for FakeMessaging {
    async fn download_media(&self, media_id: &str) -> relay_whatsapp::Result<DownloadedMedia> {
        if self.fail_downloads {
            return Err(ChannelError::Media(format!("no url for {}", media_id)));
        }
        DownloadedMedia::from_bytes(PNG_HEADER).await
    }

    async fn send_text(
        &self,
        to: &str,
        body: &str,
        phone_number_id: &str,
    ) -> relay_whatsapp::Result<()> {
        self.sent.lock().unwrap().push((
            to.to_string(),
            body.to_string(),
            phone_number_id.to_string(),
        ));
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeStorage {
    fail: bool,
    uploads: AtomicUsize,
}

impl FakeStorage {
    pub fn uploads(&self) -> usize {
        self.uploads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ObjectStore for FakeStorage {
    async fn upload(&self, media: &DownloadedMedia) -> relay_whatsapp::Result<String> {
        if self.fail {
            return Err(ChannelError::NotConfigured("STAGING_BUCKET".into()));
        }
        self.uploads.fetch_add(1, Ordering::SeqCst);
        Ok(format!("gs://test-bucket/temp_media/{}", media.file_name()))
    }
}

/// `Err` when `fail` is set, otherwise the canned transcript
pub struct FakeTranscriber {
    transcript: Option<String>,
    fail: bool,
    calls: AtomicUsize,
}

impl FakeTranscriber {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transcriber for FakeTranscriber {
    async fn transcribe(&self, _media: &DownloadedMedia) -> relay_whatsapp::Result<Option<String>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(ChannelError::Transcription("recognize returned HTTP 503".into()));
        }
        Ok(self.transcript.clone())
    }
}

/// WhatsApp collaborators shared between a test and its state
pub struct Fakes {
    pub messaging: Arc<FakeMessaging>,
    pub storage: Arc<FakeStorage>,
    pub transcriber: Option<Arc<FakeTranscriber>>,
}

impl Fakes {
    /// No transcriber, downloads succeed
    pub fn new() -> Self {
        Self {
            messaging: Arc::new(FakeMessaging::default()),
            storage: Arc::new(FakeStorage::default()),
            transcriber: None,
        }
    }

    pub fn failing_downloads() -> Self {
        Self {
            messaging: Arc::new(FakeMessaging {
                fail_downloads: true,
                ..Default::default()
            }),
            ..Self::new()
        }
    }

    pub fn failing_uploads() -> Self {
        Self {
            storage: Arc::new(FakeStorage {
                fail: true,
                ..Default::default()
            }),
            ..Self::new()
        }
    }

    pub fn with_transcript(transcript: Option<&str>) -> Self {
        Self::with_transcriber(transcript, false)
    }

    pub fn failing_transcription() -> Self {
        Self::with_transcriber(None, true)
    }

    fn with_transcriber(transcript: Option<&str>, fail: bool) -> Self {
        Self {
            transcriber: Some(Arc::new(FakeTranscriber {
                transcript: transcript.map(str::to_string),
                fail,
                calls: AtomicUsize::new(0),
            })),
            ..Self::new()
        }
    }
}

pub fn build_state(engine: Option<Arc<FakeEngine>>, fakes: &Fakes) -> AppState {
    let whatsapp = WhatsAppContext {
        verify_token: Some(VERIFY_TOKEN.to_string()),
        messaging: fakes.messaging.clone(),
        storage: fakes.storage.clone(),
        transcriber: fakes
            .transcriber
            .clone()
            .map(|t| t as Arc<dyn Transcriber>),
    };

    AppState::new(
        engine.map(|e| e as Arc<dyn AgentEngine>),
        Arc::new(InMemorySessionStore::new()),
        Some(whatsapp),
        FeatureFlags::default(),
    )
}

pub fn state_with(engine: Option<Arc<FakeEngine>>) -> AppState {
    build_state(engine, &Fakes::new())
}

fn notification(message: Value) -> Value {
    json!({
        "object": "whatsapp_business_account",
        "entry": [{
            "id": "WABA_ID",
            "changes": [{
                "field": "messages",
                "value": {
                    "messaging_product": "whatsapp",
                    "metadata": {"display_phone_number": "15550000000", "phone_number_id": PHONE_NUMBER_ID},
                    "messages": [message]
                }
            }]
        }]
    })
}

pub fn text_notification(from: &str, body: &str) -> Value {
    notification(json!({"from": from, "id": "wamid.1", "type": "text", "text": {"body": body}}))
}

pub fn image_notification(from: &str, media_id: &str) -> Value {
    notification(json!({
        "from": from,
        "id": "wamid.2",
        "type": "image",
        "image": {"id": media_id, "mime_type": "image/png"}
    }))
}

pub fn audio_notification(from: &str, media_id: &str) -> Value {
    notification(json!({
        "from": from,
        "id": "wamid.3",
        "type": "audio",
        "audio": {"id": media_id, "mime_type": "audio/ogg; codecs=opus"}
    }))
}
