use futures::StreamExt;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use relay_core::agent::AgentEngine;
use relay_core::session::resolve_session;
use relay_whatsapp::{
    prompt, ChannelError, DownloadedMedia, IncomingMessage, MediaRef, MessageContent,
    WebhookPayload,
};

use crate::error::ENGINE_UNAVAILABLE;
use crate::state::{AppState, WhatsAppContext};

/// Failure while handling one notification
#[derive(Debug, Error)]
pub enum RelayError {
    #[error(transparent)]
    Agent(#[from] relay_core::Error),

    #[error(transparent)]
    Channel(#[from] ChannelError),
}

type Result<T> = std::result::Result<T, RelayError>;

/// Process a webhook notification body.
///
/// Never fails: every error is logged here, since WhatsApp only needs the
/// acknowledgement.
pub async fn handle_notification(state: &AppState, body: &[u8]) {
    if let Err(err) = process(state, body).await {
        error!("Error processing WhatsApp webhook: {}", err);
    }
}

async fn process(state: &AppState, body: &[u8]) -> Result<()> {
    let Some(whatsapp) = state.whatsapp() else {
        warn!("WhatsApp notification received but the channel is disabled");
        return Ok(());
    };

    let payload = WebhookPayload::parse(body)?;

    let Some(engine) = state.agent_engine() else {
        error!("{}", ENGINE_UNAVAILABLE);
        return Ok(());
    };

    let Some(message) = payload.first_message()? else {
        info!("Notification without messages (status update), ignoring");
        return Ok(());
    };

    info!(
        "Message from {} via {}",
        message.sender_id, message.phone_number_id
    );

    let session_id =
        resolve_session(state.sessions(), engine.as_ref(), &message.sender_id).await?;

    let Some(prompt) = build_prompt(whatsapp, &message).await? else {
        return Ok(());
    };

    relay_reply(whatsapp, engine.as_ref(), &message, &session_id, &prompt).await
}

/// Text to send to the agent, `None` when nothing should be sent
async fn build_prompt(
    whatsapp: &WhatsAppContext,
    message: &IncomingMessage,
) -> Result<Option<String>> {
    match &message.content {
        MessageContent::Text { text } => Ok(Some(text.body.clone())),
        MessageContent::Image { image } => match image_prompt(whatsapp, image).await {
            Ok(prompt) => Ok(Some(prompt)),
            Err(err) => {
                error!("Error processing image {}: {}", image.id, err);
                apologise(whatsapp, message, prompt::IMAGE_FAILED).await;
                Ok(None)
            }
        },
        MessageContent::Audio { audio } => match audio_prompt(whatsapp, audio).await {
            Ok(prompt) => Ok(Some(prompt)),
            Err(err) => {
                error!("Error processing audio {}: {}", audio.id, err);
                apologise(whatsapp, message, prompt::AUDIO_FAILED).await;
                Ok(None)
            }
        },
        MessageContent::Unsupported => {
            info!(
                "Unsupported message type from {}, ignoring",
                message.sender_id
            );
            Ok(None)
        }
    }
}

async fn download(whatsapp: &WhatsAppContext, media: &MediaRef) -> Result<DownloadedMedia> {
    let downloaded = whatsapp.messaging.download_media(&media.id).await?;
    info!(
        "Media {} downloaded as {} (declared {:?})",
        media.id,
        downloaded.mime_type(),
        media.mime_type
    );
    Ok(downloaded)
}

async fn image_prompt(whatsapp: &WhatsAppContext, image: &MediaRef) -> Result<String> {
    let media = download(whatsapp, image).await?;
    let uri = whatsapp.storage.upload(&media).await?;
    Ok(prompt::image(&uri))
}

async fn audio_prompt(whatsapp: &WhatsAppContext, audio: &MediaRef) -> Result<String> {
    let media = download(whatsapp, audio).await?;

    if let Some(transcriber) = &whatsapp.transcriber {
        match transcriber.transcribe(&media).await {
            Ok(Some(transcript)) if !transcript.trim().is_empty() => {
                info!("Voice note transcribed: {}", transcript);
                return Ok(prompt::voice_transcript(&transcript));
            }
            Ok(_) => info!("No transcript for {}, sending the file instead", audio.id),
            Err(err) => warn!(
                "Transcription of {} failed, sending the file instead: {}",
                audio.id, err
            ),
        }
    }

    let uri = whatsapp.storage.upload(&media).await?;
    Ok(prompt::voice_note(&uri))
}

async fn apologise(whatsapp: &WhatsAppContext, message: &IncomingMessage, text: &str) {
    if let Err(err) = whatsapp
        .messaging
        .send_text(&message.sender_id, text, &message.phone_number_id)
        .await
    {
        error!("Could not notify {}: {}", message.sender_id, err);
    }
}

/// Stream the agent's answer and forward each text event as a message
async fn relay_reply(
    whatsapp: &WhatsAppContext,
    engine: &dyn AgentEngine,
    message: &IncomingMessage,
    session_id: &str,
    prompt: &str,
) -> Result<()> {
    let mut events = engine
        .stream_query(&message.sender_id, session_id, prompt)
        .await?;

    while let Some(event) = events.next().await {
        let event = match event {
            Ok(event) => event,
            Err(err) => {
                error!("Agent stream for session {} failed: {}", session_id, err);
                break;
            }
        };

        let Some(text) = event.text() else {
            debug!("Event without text: {}", event.raw_string());
            continue;
        };

        if let Err(err) = whatsapp
            .messaging
            .send_text(&message.sender_id, text, &message.phone_number_id)
            .await
        {
            error!("Error sending reply to {}: {}", message.sender_id, err);
        }
    }

    Ok(())
}
