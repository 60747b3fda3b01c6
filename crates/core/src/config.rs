//! Runtime configuration read from the process environment

pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_GRAPH_URL: &str = "https://graph.facebook.com";
pub const DEFAULT_GRAPH_API_VERSION: &str = "v19.0";
pub const DEFAULT_SPEECH_LANGUAGE: &str = "es-ES";
pub const DEFAULT_SPEECH_ALTERNATIVES: &[&str] = &["es-CO", "es-MX", "en-US"];

/// Everything the relay reads from its environment
#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub port: u16,
    pub project_id: Option<String>,
    pub location: Option<String>,
    pub agent_engine_resource_name: Option<String>,
    pub staging_bucket: Option<String>,
    /// Pre-issued OAuth token; when absent the metadata server is used
    pub google_access_token: Option<String>,
    pub whatsapp: WhatsAppSettings,
    pub speech: SpeechSettings,
    pub features: FeatureFlags,
}

#[derive(Debug, Clone)]
pub struct WhatsAppSettings {
    pub access_token: Option<String>,
    pub verify_token: Option<String>,
    pub graph_url: String,
    pub api_version: String,
}

#[derive(Debug, Clone)]
pub struct SpeechSettings {
    pub language_code: String,
    pub alternative_language_codes: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeatureFlags {
    /// Mount the WhatsApp webhook routes
    pub whatsapp: bool,
    /// Try speech-to-text on inbound voice notes
    pub transcription: bool,
}

impl Default for FeatureFlags {
    fn default() -> Self {
        Self {
            whatsapp: true,
            transcription: true,
        }
    }
}

impl RelayConfig {
    /// Read configuration from the process environment
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build configuration from an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let port = var("PORT")
            .and_then(|raw| raw.parse::<u16>().ok())
            .unwrap_or(DEFAULT_PORT);

        let alternative_language_codes = match var("SPEECH_ALTERNATIVE_LANGUAGES") {
            Some(raw) => raw
                .split(',')
                .map(str::trim)
                .filter(|code| !code.is_empty())
                .map(str::to_string)
                .collect(),
            None => DEFAULT_SPEECH_ALTERNATIVES
                .iter()
                .map(|code| code.to_string())
                .collect(),
        };

        Self {
            port,
            project_id: var("PROJECT_ID"),
            location: var("LOCATION"),
            agent_engine_resource_name: var("AGENT_ENGINE_RESOURCE_NAME"),
            staging_bucket: var("STAGING_BUCKET"),
            google_access_token: var("GOOGLE_ACCESS_TOKEN"),
            whatsapp: WhatsAppSettings {
                access_token: var("WHATSAPP_ACCESS_TOKEN"),
                verify_token: var("WHATSAPP_VERIFY_TOKEN"),
                graph_url: var("WHATSAPP_GRAPH_URL")
                    .unwrap_or_else(|| DEFAULT_GRAPH_URL.to_string()),
                api_version: var("WHATSAPP_API_VERSION")
                    .unwrap_or_else(|| DEFAULT_GRAPH_API_VERSION.to_string()),
            },
            speech: SpeechSettings {
                language_code: var("SPEECH_LANGUAGE_CODE")
                    .unwrap_or_else(|| DEFAULT_SPEECH_LANGUAGE.to_string()),
                alternative_language_codes,
            },
            features: FeatureFlags {
                whatsapp: parse_flag(var("FEATURE_WHATSAPP").as_deref(), true),
                transcription: parse_flag(var("FEATURE_TRANSCRIPTION").as_deref(), true),
            },
        }
    }
}

fn parse_flag(raw: Option<&str>, default: bool) -> bool {
    match raw {
        Some(raw) => match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => true,
            "0" | "false" | "no" | "off" => false,
            _ => default,
        },
        None => default,
    }
}
