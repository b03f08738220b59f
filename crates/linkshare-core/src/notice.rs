//! User-facing notices
//!
//! Components never surface errors by failing the caller's task. They turn
//! each outcome into a [`Notice`] on a broadcast channel, and whatever owns
//! the presentation layer decides how to show it.

use tokio::sync::broadcast;

use crate::error::{AuthError, PersistError, UploadError, ValidationError};

/// Default capacity for the notice broadcast channel
pub const NOTICE_CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NoticeLevel {
    Success,
    Error,
}

/// One message for the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.level == NoticeLevel::Error
    }
}

impl From<&ValidationError> for Notice {
    fn from(e: &ValidationError) -> Self {
        Notice::error(UploadError::Validation(e.clone()).user_message())
    }
}

impl From<&UploadError> for Notice {
    fn from(e: &UploadError) -> Self {
        Notice::error(e.user_message())
    }
}

impl From<&PersistError> for Notice {
    fn from(_: &PersistError) -> Self {
        Notice::error("Failed to update profile.")
    }
}

impl From<&AuthError> for Notice {
    fn from(e: &AuthError) -> Self {
        Notice::error(e.to_string())
    }
}

/// Fan-out of notices to any number of listeners
#[derive(Debug, Clone)]
pub struct NoticeBoard {
    tx: broadcast::Sender<Notice>,
}

impl Default for NoticeBoard {
    fn default() -> Self {
        Self::new()
    }
}

impl NoticeBoard {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(NOTICE_CHANNEL_CAPACITY);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notice> {
        self.tx.subscribe()
    }

    /// Publish a notice. Dropped silently if nobody is listening.
    pub fn post(&self, notice: Notice) {
        let _ = self.tx.send(notice);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upload_errors_map_to_user_messages() {
        let notice = Notice::from(&UploadError::Unauthorized);
        assert!(notice.is_error());
        assert_eq!(notice.message, "Storage access denied. Contact support.");

        let notice = Notice::from(&UploadError::Timeout);
        assert_eq!(notice.message, "Upload timeout. Please try again.");

        let notice = Notice::from(&UploadError::Other("disk full".into()));
        assert_eq!(notice.message, "Upload failed: disk full");
    }

    #[test]
    fn test_size_validation_message() {
        let notice = Notice::from(&ValidationError::Size {
            actual: 6 * 1024 * 1024,
            limit: 5 * 1024 * 1024,
        });
        assert_eq!(notice.message, "Image size must be less than 5MB");
    }

    #[test]
    fn test_auth_notice() {
        let notice = Notice::from(&AuthError::from_code("auth/user-not-found"));
        assert_eq!(notice.message, "No account found for this email");
    }

    #[tokio::test]
    async fn test_board_fans_out() {
        let board = NoticeBoard::new();
        let mut a = board.subscribe();
        let mut b = board.subscribe();

        board.post(Notice::success("Profile updated successfully!"));

        assert_eq!(a.recv().await.unwrap().level, NoticeLevel::Success);
        assert_eq!(b.recv().await.unwrap().message, "Profile updated successfully!");
    }

    #[test]
    fn test_post_without_listeners_is_fine() {
        NoticeBoard::new().post(Notice::error("nobody hears this"));
    }
}
