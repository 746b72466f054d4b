//! Backend collaborator contracts.
//!
//! The chat talks to the portal backend through two narrow traits: the chat
//! REST surface and the key service. Production wires them to HTTP; the
//! harness provides in-memory implementations.

use std::future::Future;

use quill_proto::{ChatMessage, Identity, KeyBundle, UploadedFile, User};

use crate::error::ApiError;

/// File selected for upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileUpload {
    /// Original file name.
    pub name: String,
    /// MIME type reported by the picker; may be empty.
    pub mime_type: String,
    /// File contents.
    pub bytes: Vec<u8>,
}

impl FileUpload {
    /// True if this is an image, by MIME type or file extension.
    pub fn is_image(&self) -> bool {
        if self.mime_type.starts_with("image/") {
            return true;
        }

        let Some((_, extension)) = self.name.rsplit_once('.') else {
            return false;
        };
        matches!(
            extension.to_ascii_lowercase().as_str(),
            "jpg" | "jpeg" | "png" | "gif" | "webp" | "bmp" | "svg"
        )
    }
}

/// Chat REST surface of the portal backend.
pub trait ChatApi: Send + Sync {
    /// Full history of messages the current user sent or received.
    fn chat_history(&self) -> impl Future<Output = Result<Vec<ChatMessage>, ApiError>> + Send;

    /// User directory, including each user's published key.
    fn users(&self) -> impl Future<Output = Result<Vec<User>, ApiError>> + Send;

    /// Upload a file to the hosting service and return where it lives.
    fn upload_file(
        &self,
        file: FileUpload,
    ) -> impl Future<Output = Result<UploadedFile, ApiError>> + Send;

    /// Delete every message between the current user and `peer`.
    fn delete_conversation(
        &self,
        peer: &Identity,
    ) -> impl Future<Output = Result<(), ApiError>> + Send;

    /// Delete every message the current user sent or received.
    fn clear_history(&self) -> impl Future<Output = Result<(), ApiError>> + Send;
}

/// Remote key storage for the current user.
pub trait KeyService: Send + Sync {
    /// Stored bundle. Empty fields mean nothing has been stored yet.
    fn fetch_key_bundle(&self) -> impl Future<Output = Result<KeyBundle, ApiError>> + Send;

    /// Store both halves of the key pair and publish the public half.
    fn push_key_bundle(
        &self,
        bundle: KeyBundle,
    ) -> impl Future<Output = Result<(), ApiError>> + Send;
}
