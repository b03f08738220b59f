//! Property-based tests for profile merges and draft validation
//!
//! Uses proptest to verify the merge invariant of profile writes and the
//! invariants of the draft validator.

use proptest::prelude::*;
use linkshare_core::upload::avatar_path;
use linkshare_core::{Draft, OwnerId, ProfilePatch, ProfileRecord, Storage, UploadedAsset};

// ============================================================================
// Strategy Generators
// ============================================================================

fn field_strategy() -> impl Strategy<Value = Option<String>> {
    prop::option::of(prop::string::string_regex("[a-zA-Z0-9 @.]{0,20}").expect("valid regex"))
}

fn patch_strategy() -> impl Strategy<Value = ProfilePatch> {
    (
        field_strategy(),
        field_strategy(),
        field_strategy(),
        field_strategy(),
    )
        .prop_map(|(first_name, last_name, email, image_url)| ProfilePatch {
            first_name,
            last_name,
            email,
            image_url,
        })
}

fn owner_strategy() -> impl Strategy<Value = OwnerId> {
    prop::string::string_regex("[a-zA-Z0-9_-]{1,28}")
        .expect("valid regex")
        .prop_map(|id| OwnerId::new(id).expect("generated id is valid"))
}

// ============================================================================
// Property Tests
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Fields absent from a patch keep their stored value; present ones win
    #[test]
    fn prop_merge_preserves_absent_fields(patches in prop::collection::vec(patch_strategy(), 1..12)) {
        let storage = Storage::in_memory().unwrap();
        let owner = OwnerId::new("prop-owner").unwrap();
        let mut expected = ProfileRecord::default();

        for patch in &patches {
            let before = expected.clone();
            expected.apply(patch);

            let stored = storage.write_profile_patch(&owner, patch).unwrap();
            prop_assert_eq!(&stored, &expected);

            if patch.first_name.is_none() {
                prop_assert_eq!(&stored.first_name, &before.first_name);
            }
            if patch.last_name.is_none() {
                prop_assert_eq!(&stored.last_name, &before.last_name);
            }
            if patch.email.is_none() {
                prop_assert_eq!(&stored.email, &before.email);
            }
            if patch.image_url.is_none() {
                prop_assert_eq!(&stored.image_url, &before.image_url);
            }
        }

        prop_assert_eq!(storage.load_profile(&owner).unwrap(), Some(expected));
    }

    /// Applying the same patch twice is the same as applying it once
    #[test]
    fn prop_merge_is_idempotent(base in patch_strategy(), patch in patch_strategy()) {
        let once = ProfileRecord::default().merged(&base).merged(&patch);
        let twice = once.merged(&patch);
        prop_assert_eq!(once, twice);
    }

    /// Writes for one owner never touch another owner's record
    #[test]
    fn prop_owners_are_isolated(a in owner_strategy(), b in owner_strategy(), patch in patch_strategy()) {
        prop_assume!(a != b);
        let storage = Storage::in_memory().unwrap();
        let before = storage
            .write_profile_patch(&b, &ProfilePatch::new().first_name("untouched"))
            .unwrap();

        storage.write_profile_patch(&a, &patch).unwrap();

        prop_assert_eq!(storage.load_profile(&b).unwrap(), Some(before));
    }

    /// A blank name is always a validation error, whatever the other fields
    #[test]
    fn prop_blank_names_fail_validation(
        blank in prop::string::string_regex("[ \t]{0,5}").expect("valid regex"),
        other in "[a-zA-Z]{1,10}",
    ) {
        let draft = Draft {
            first_name: blank.clone(),
            last_name: other.clone(),
            email: String::new(),
        };
        prop_assert!(draft.validate().first_name.is_some());

        let draft = Draft {
            first_name: other,
            last_name: blank,
            email: String::new(),
        };
        prop_assert!(draft.validate().last_name.is_some());
    }

    /// Emails without an `@` never validate; `local@domain` always does
    #[test]
    fn prop_email_needs_at_sign(local in "[a-z0-9.]{1,12}", domain in "[a-z0-9.]{1,12}") {
        let valid = Draft {
            first_name: "A".into(),
            last_name: "B".into(),
            email: format!("{}@{}", local, domain),
        };
        prop_assert!(valid.validate().is_empty());

        let invalid = Draft {
            email: format!("{}{}", local, domain),
            ..valid
        };
        prop_assert!(invalid.validate().email.is_some());
    }

    /// Avatar paths are owner-scoped and keep the original extension
    #[test]
    fn prop_avatar_path_is_owner_scoped(owner in owner_strategy(), stem in "[a-z]{1,8}", ext in "[a-z]{1,4}") {
        let asset = UploadedAsset::new(format!("{}.{}", stem, ext), "image/png", vec![0u8]);
        let path = avatar_path(&owner, &asset);
        prop_assert_eq!(path, format!("profile_images/{}/avatar.{}", owner, ext));
    }
}
