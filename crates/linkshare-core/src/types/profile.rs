//! Profile Record Type - display identity shown on a link-sharing page
//!
//! Stored as `profiles/{ownerId}` with camelCase JSON fields. Writes are
//! always partial ([`ProfilePatch`]) and merge into the existing record.

use serde::{Deserialize, Serialize};

/// Persisted profile for one owner
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProfileRecord {
    pub first_name: String,

    pub last_name: String,

    /// Display email, independent of the sign-in credential
    pub email: String,

    /// Public URL of the avatar, once one has been uploaded
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

impl ProfileRecord {
    /// Full name, only when both parts are filled in
    pub fn display_name(&self) -> Option<String> {
        if self.first_name.is_empty() || self.last_name.is_empty() {
            return None;
        }
        Some(format!("{} {}", self.first_name, self.last_name))
    }

    /// Merge a partial write into this record.
    ///
    /// Fields absent from `patch` keep their current value.
    pub fn apply(&mut self, patch: &ProfilePatch) {
        if let Some(first_name) = &patch.first_name {
            self.first_name = first_name.clone();
        }
        if let Some(last_name) = &patch.last_name {
            self.last_name = last_name.clone();
        }
        if let Some(email) = &patch.email {
            self.email = email.clone();
        }
        if let Some(image_url) = &patch.image_url {
            self.image_url = Some(image_url.clone());
        }
    }

    /// Copy of this record with `patch` merged in
    pub fn merged(&self, patch: &ProfilePatch) -> Self {
        let mut next = self.clone();
        next.apply(patch);
        next
    }
}

/// Partial profile write. `None` means the field is not part of the write.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfilePatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

impl ProfilePatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn first_name(mut self, value: impl Into<String>) -> Self {
        self.first_name = Some(value.into());
        self
    }

    pub fn last_name(mut self, value: impl Into<String>) -> Self {
        self.last_name = Some(value.into());
        self
    }

    pub fn email(mut self, value: impl Into<String>) -> Self {
        self.email = Some(value.into());
        self
    }

    pub fn image_url(mut self, value: impl Into<String>) -> Self {
        self.image_url = Some(value.into());
        self
    }

    /// True when the write would not touch any field
    pub fn is_empty(&self) -> bool {
        self.first_name.is_none()
            && self.last_name.is_none()
            && self.email.is_none()
            && self.image_url.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_record() -> ProfileRecord {
        ProfileRecord {
            first_name: "X".into(),
            last_name: "Y".into(),
            email: "x@y.z".into(),
            image_url: Some("u".into()),
        }
    }

    #[test]
    fn test_merge_preserves_absent_fields() {
        let merged = full_record().merged(&ProfilePatch::new().first_name("A"));
        assert_eq!(merged.first_name, "A");
        assert_eq!(merged.last_name, "Y");
        assert_eq!(merged.email, "x@y.z");
        assert_eq!(merged.image_url.as_deref(), Some("u"));
    }

    #[test]
    fn test_empty_patch_is_identity() {
        let patch = ProfilePatch::new();
        assert!(patch.is_empty());
        assert_eq!(full_record().merged(&patch), full_record());
    }

    #[test]
    fn test_display_name_requires_both_parts() {
        let mut record = full_record();
        assert_eq!(record.display_name().as_deref(), Some("X Y"));
        record.last_name.clear();
        assert_eq!(record.display_name(), None);
    }

    #[test]
    fn test_document_shape_is_camel_case() {
        let json = serde_json::to_value(full_record()).unwrap();
        assert_eq!(json["firstName"], "X");
        assert_eq!(json["lastName"], "Y");
        assert_eq!(json["imageUrl"], "u");

        let patch = serde_json::to_value(ProfilePatch::new().email("e@f")).unwrap();
        assert_eq!(patch, serde_json::json!({ "email": "e@f" }));
    }

    #[test]
    fn test_sparse_document_loads_with_defaults() {
        let record: ProfileRecord = serde_json::from_str(r#"{"firstName":"Ada"}"#).unwrap();
        assert_eq!(record.first_name, "Ada");
        assert!(record.last_name.is_empty());
        assert!(record.image_url.is_none());
    }
}
