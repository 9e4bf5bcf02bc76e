use serde::{Deserialize, Serialize};

// -- Posts --

#[derive(Debug, Default, Serialize)]
pub struct CreatePostRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media: Option<PostMedia>,
}

#[derive(Debug, Serialize)]
pub struct PostMedia {
    pub media_ids: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreatePostResponse {
    pub data: CreatedPost,
}

#[derive(Debug, Deserialize)]
pub struct CreatedPost {
    pub id: String,
    #[serde(default)]
    pub text: Option<String>,
}

// -- Users --

#[derive(Debug, Deserialize)]
pub struct CurrentUserResponse {
    pub data: CurrentUser,
}

#[derive(Debug, Deserialize)]
pub struct CurrentUser {
    pub id: String,
    pub username: String,
    #[serde(default)]
    pub name: Option<String>,
}

// -- Media upload (v1.1 chunked) --

/// Returned by INIT, FINALIZE and STATUS.
#[derive(Debug, Deserialize)]
pub struct MediaUploadResponse {
    pub media_id_string: String,
    #[serde(default)]
    pub processing_info: Option<ProcessingInfo>,
}

#[derive(Debug, Deserialize)]
pub struct ProcessingInfo {
    pub state: ProcessingState,
    #[serde(default)]
    pub check_after_secs: Option<u64>,
    #[serde(default)]
    pub progress_percent: Option<u8>,
    #[serde(default)]
    pub error: Option<ProcessingError>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingState {
    Pending,
    InProgress,
    Failed,
    Succeeded,
}

#[derive(Debug, Deserialize)]
pub struct ProcessingError {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}
