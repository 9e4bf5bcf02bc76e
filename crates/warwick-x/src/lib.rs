//! Warwick's client for X.
//!
//! - Posting text and media as the account described by an `AuthenticationBundle`
//! - OAuth 1.0a (HMAC-SHA1) request signing
//! - Chunked media upload (INIT / APPEND / FINALIZE / STATUS)
//! - Streaming remote media into memory before upload

pub mod client;
pub mod error;
pub mod media;
pub mod oauth;
pub mod upload;

pub use client::{Account, API_BASE, MAX_MEDIA_PER_POST, UPLOAD_BASE, post_url};
pub use error::{Result, XError};
pub use media::{MAX_MEDIA_BYTES, fetch_bytes, fetch_bytes_limited, filename_from_url};
