//! Downloaded media held in a temporary file

use std::path::Path;

use futures::{stream, Stream, StreamExt};
use tempfile::NamedTempFile;
use tokio::io::AsyncWriteExt;

use crate::error::{ChannelError, Result};

/// Reported when the content matches no known signature
pub const FALLBACK_MIME: &str = "application/octet-stream";

/// Leading bytes kept in memory for type detection
const SNIFF_LEN: usize = 8192;

/// A media object fetched from WhatsApp.
///
/// The backing temporary file is removed when this value is dropped,
/// whichever path the caller takes.
#[derive(Debug)]
pub struct DownloadedMedia {
    file: NamedTempFile,
    mime_type: String,
}

impl DownloadedMedia {
    /// Write a byte stream to a fresh temporary file.
    ///
    /// The type is sniffed from the first bytes as they pass through, so the
    /// file is never read back.
    pub async fn from_stream<S, B>(chunks: S) -> Result<Self>
    where
        S: Stream<Item = Result<B>>,
        B: AsRef<[u8]>,
    {
        let file = tokio::task::spawn_blocking(new_temp_file)
            .await
            .map_err(|e| ChannelError::Media(format!("Temporary file task failed: {}", e)))??;
        let mut writer = tokio::fs::File::from_std(file.as_file().try_clone()?);

        let mut head = Vec::with_capacity(SNIFF_LEN);
        tokio::pin!(chunks);
        while let Some(chunk) = chunks.next().await {
            let chunk = chunk?;
            let bytes = chunk.as_ref();
            if head.len() < SNIFF_LEN {
                let take = bytes.len().min(SNIFF_LEN - head.len());
                head.extend_from_slice(&bytes[..take]);
            }
            writer.write_all(bytes).await?;
        }
        writer.flush().await?;

        Ok(Self {
            file,
            mime_type: sniff_mime(&head),
        })
    }

    /// Write bytes to a fresh temporary file
    pub async fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Self::from_stream(stream::iter([Ok(bytes)])).await
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    /// Base name of the temporary file
    pub fn file_name(&self) -> String {
        self.file
            .path()
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_else(|| "media".to_string())
    }

    pub async fn read_bytes(&self) -> Result<Vec<u8>> {
        Ok(tokio::fs::read(self.file.path()).await?)
    }
}

fn new_temp_file() -> Result<NamedTempFile> {
    Ok(tempfile::Builder::new().prefix("wa-media-").tempfile()?)
}

/// Detect a MIME type from the leading bytes of some content
pub fn sniff_mime(head: &[u8]) -> String {
    infer::get(head)
        .map(|kind| kind.mime_type().to_string())
        .unwrap_or_else(|| FALLBACK_MIME.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_HEADER: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0x0D];

    #[tokio::test]
    async fn sniffs_png() {
        let media = DownloadedMedia::from_bytes(PNG_HEADER).await.unwrap();
        assert_eq!(media.mime_type(), "image/png");
    }

    #[tokio::test]
    async fn sniffs_ogg() {
        let mut bytes = b"OggS".to_vec();
        bytes.extend_from_slice(&[0u8; 32]);
        let media = DownloadedMedia::from_bytes(&bytes).await.unwrap();
        assert_eq!(media.mime_type(), "audio/ogg");
    }

    #[tokio::test]
    async fn unknown_content_falls_back() {
        let media = DownloadedMedia::from_bytes(b"just some words").await.unwrap();
        assert_eq!(media.mime_type(), FALLBACK_MIME);
    }

    #[tokio::test]
    async fn temp_file_is_removed_on_drop() {
        let media = DownloadedMedia::from_bytes(PNG_HEADER).await.unwrap();
        let path = media.path().to_path_buf();
        assert!(path.exists());
        assert!(media.file_name().starts_with("wa-media-"));

        drop(media);
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn reads_back_content() {
        let media = DownloadedMedia::from_bytes(b"abc").await.unwrap();
        assert_eq!(media.read_bytes().await.unwrap(), b"abc");
    }

    #[tokio::test]
    async fn chunked_stream_is_written_and_sniffed() {
        let chunks: Vec<Result<&[u8]>> = vec![Ok(&PNG_HEADER[..4]), Ok(&PNG_HEADER[4..])];
        let media = DownloadedMedia::from_stream(stream::iter(chunks)).await.unwrap();

        assert_eq!(media.mime_type(), "image/png");
        assert_eq!(media.read_bytes().await.unwrap(), PNG_HEADER);
    }

    #[tokio::test]
    async fn stream_error_is_returned() {
        let chunks: Vec<Result<&[u8]>> = vec![
            Ok(&PNG_HEADER[..4]),
            Err(ChannelError::Media("connection reset".into())),
        ];
        let err = DownloadedMedia::from_stream(stream::iter(chunks))
            .await
            .unwrap_err();

        assert!(matches!(err, ChannelError::Media(_)));
    }
}
