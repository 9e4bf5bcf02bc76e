//! Chunked media upload: INIT, one APPEND per segment, FINALIZE, then STATUS
//! polling while X processes the media.

use std::time::Duration;

use bytes::Bytes;
use reqwest::Method;
use reqwest::multipart::{Form, Part};
use tracing::{debug, info};

use warwick_types::api::{MediaUploadResponse, ProcessingInfo, ProcessingState};

use crate::client::Account;
use crate::error::{Result, XError, check_status, decode};

/// Largest segment X accepts in a single APPEND.
pub const SEGMENT_SIZE: usize = 4 * 1024 * 1024;

/// STATUS checks made before giving up on media that never finishes processing.
pub const MAX_STATUS_POLLS: u32 = 60;

/// Longest single wait between STATUS checks, whatever `check_after_secs` asks for.
pub const MAX_CHECK_AFTER_SECS: u64 = 30;

const UPLOAD_PATH: &str = "/1.1/media/upload.json";

/// MIME type guessed from the filename extension.
pub fn media_type_for(filename: &str) -> &'static str {
    let ext = filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "mp4" => "video/mp4",
        "mov" => "video/quicktime",
        _ => "application/octet-stream",
    }
}

/// Upload category X wants alongside the media type.
pub fn media_category_for(media_type: &str) -> &'static str {
    if media_type == "image/gif" {
        "tweet_gif"
    } else if media_type.starts_with("video/") {
        "tweet_video"
    } else {
        "tweet_image"
    }
}

impl Account {
    /// Upload `bytes` and wait until X has finished processing them. Returns the media id.
    pub async fn upload_media(&self, bytes: Bytes, filename: &str) -> Result<String> {
        let url = format!("{}{}", self.upload_base, UPLOAD_PATH);
        let media_type = media_type_for(filename);
        let total_bytes = bytes.len().to_string();

        // INIT
        let init_params = [
            ("command", "INIT"),
            ("total_bytes", total_bytes.as_str()),
            ("media_type", media_type),
            ("media_category", media_category_for(media_type)),
        ];
        let resp = self
            .signed(Method::POST, &url, &init_params)?
            .form(&init_params)
            .send()
            .await?;
        let init: MediaUploadResponse = decode(resp).await?;
        let media_id = init.media_id_string;
        info!("Uploading {} ({} bytes) as media {}", filename, total_bytes, media_id);

        // APPEND
        for (index, segment) in bytes.chunks(SEGMENT_SIZE).enumerate() {
            let segment_index = index.to_string();
            let query = [
                ("command", "APPEND"),
                ("media_id", media_id.as_str()),
                ("segment_index", segment_index.as_str()),
            ];
            let part = Part::bytes(segment.to_vec())
                .file_name(filename.to_string())
                .mime_str(media_type)?;

            let resp = self
                .signed(Method::POST, &url, &query)?
                .query(&query)
                .multipart(Form::new().part("media", part))
                .send()
                .await?;
            check_status(resp).await?;
            debug!("Appended segment {} of media {}", segment_index, media_id);
        }

        // FINALIZE
        let finalize_params = [("command", "FINALIZE"), ("media_id", media_id.as_str())];
        let resp = self
            .signed(Method::POST, &url, &finalize_params)?
            .form(&finalize_params)
            .send()
            .await?;
        let finalized: MediaUploadResponse = decode(resp).await?;

        self.wait_for_processing(&url, &media_id, finalized.processing_info)
            .await?;

        Ok(media_id)
    }

    async fn wait_for_processing(
        &self,
        url: &str,
        media_id: &str,
        mut processing: Option<ProcessingInfo>,
    ) -> Result<()> {
        let mut polls = 0;
        while let Some(info) = processing {
            match info.state {
                ProcessingState::Succeeded => return Ok(()),
                ProcessingState::Failed => {
                    let message = info
                        .error
                        .and_then(|e| e.message.or(e.name))
                        .unwrap_or_else(|| "unknown error".to_string());
                    return Err(XError::MediaProcessing {
                        media_id: media_id.to_string(),
                        message,
                    });
                }
                ProcessingState::Pending | ProcessingState::InProgress => {
                    if polls == MAX_STATUS_POLLS {
                        return Err(XError::MediaProcessing {
                            media_id: media_id.to_string(),
                            message: format!("still processing after {} status checks", polls),
                        });
                    }
                    polls += 1;

                    let wait = info.check_after_secs.unwrap_or(1).min(MAX_CHECK_AFTER_SECS);
                    debug!(
                        "Media {} processing ({}%), checking again in {}s",
                        media_id,
                        info.progress_percent.unwrap_or(0),
                        wait
                    );
                    tokio::time::sleep(Duration::from_secs(wait)).await;

                    let query = [("command", "STATUS"), ("media_id", media_id)];
                    let resp = self
                        .signed(Method::GET, url, &query)?
                        .query(&query)
                        .send()
                        .await?;
                    let status: MediaUploadResponse = decode(resp).await?;
                    processing = status.processing_info;
                }
            }
        }

        Ok(())
    }
}
