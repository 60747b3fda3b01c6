//! Application state

use std::sync::Arc;

use relay_core::agent::{token_source, AgentEngine};
use relay_core::config::FeatureFlags;
use relay_core::session::{InMemorySessionStore, SessionStore};
use relay_core::RelayConfig;
use relay_whatsapp::{
    GcsObjectStore, GraphClient, GraphConfig, MessagingApi, ObjectStore, SpeechConfig,
    SpeechToText, Transcriber,
};

/// Collaborators used by the WhatsApp webhook
#[derive(Clone)]
pub struct WhatsAppContext {
    pub verify_token: Option<String>,
    pub messaging: Arc<dyn MessagingApi>,
    pub storage: Arc<dyn ObjectStore>,
    /// `None` when transcription is switched off
    pub transcriber: Option<Arc<dyn Transcriber>>,
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    engine: Option<Arc<dyn AgentEngine>>,
    sessions: Arc<dyn SessionStore>,
    whatsapp: Option<WhatsAppContext>,
    features: FeatureFlags,
}

impl AppState {
    pub fn new(
        engine: Option<Arc<dyn AgentEngine>>,
        sessions: Arc<dyn SessionStore>,
        whatsapp: Option<WhatsAppContext>,
        features: FeatureFlags,
    ) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                engine,
                sessions,
                whatsapp,
                features,
            }),
        }
    }

    /// Wire the production collaborators described by `config`
    pub fn from_config(config: &RelayConfig, engine: Option<Arc<dyn AgentEngine>>) -> Self {
        let whatsapp = config.features.whatsapp.then(|| {
            let tokens = token_source(config);
            let transcriber: Option<Arc<dyn Transcriber>> =
                config.features.transcription.then(|| {
                    Arc::new(SpeechToText::new(
                        SpeechConfig::from(&config.speech),
                        Arc::clone(&tokens),
                    )) as Arc<dyn Transcriber>
                });

            WhatsAppContext {
                verify_token: config.whatsapp.verify_token.clone(),
                messaging: Arc::new(GraphClient::new(GraphConfig::from(&config.whatsapp))),
                storage: Arc::new(GcsObjectStore::new(config.staging_bucket.clone(), tokens)),
                transcriber,
            }
        });

        Self::new(
            engine,
            Arc::new(InMemorySessionStore::new()),
            whatsapp,
            config.features,
        )
    }

    /// The Agent Engine, if startup managed to reach it
    pub fn agent_engine(&self) -> Option<Arc<dyn AgentEngine>> {
        self.inner.engine.clone()
    }

    pub fn sessions(&self) -> &dyn SessionStore {
        self.inner.sessions.as_ref()
    }

    pub fn whatsapp(&self) -> Option<&WhatsAppContext> {
        self.inner.whatsapp.as_ref()
    }

    pub fn features(&self) -> FeatureFlags {
        self.inner.features
    }
}
