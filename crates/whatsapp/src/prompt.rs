//! Text prompts standing in for media the agent cannot receive directly

pub fn image(uri: &str) -> String {
    format!(
        "El usuario ha enviado una imagen. El archivo de imagen está disponible en la URI: {}. Por favor, analiza este archivo de imagen y responde de manera apropiada basándote en lo que ves en la imagen.",
        uri
    )
}

pub fn voice_transcript(transcript: &str) -> String {
    format!(
        "El usuario ha enviado una nota de voz que dice: \"{}\". Por favor, responde de manera apropiada a este mensaje.",
        transcript
    )
}

pub fn voice_note(uri: &str) -> String {
    format!(
        "El usuario ha enviado una nota de voz. El archivo de audio está disponible en la URI: {}. Por favor, procesa este archivo de audio, transcribe su contenido si es necesario, y responde de manera apropiada basándote en lo que el usuario dice en el audio.",
        uri
    )
}

pub const IMAGE_FAILED: &str = "No pude procesar la imagen que enviaste.";
pub const AUDIO_FAILED: &str = "No pude procesar el audio que enviaste.";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompts_reference_their_input() {
        assert!(image("gs://b/temp_media/x").contains("URI: gs://b/temp_media/x."));
        assert!(voice_note("gs://b/temp_media/y").contains("URI: gs://b/temp_media/y."));
        assert!(voice_transcript("hola").contains("que dice: \"hola\""));
    }
}
