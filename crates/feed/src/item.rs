use chrono::{DateTime, Utc};
use serde::Deserialize;

use profilehub_auth::Owned;
use profilehub_core::{DomainError, DomainResult, Entity, FeedItemId, FieldErrors, ProfileId};

pub const STATUS_TEXT_MAX_LEN: usize = 255;

/// Raw feed item fields as submitted by a client.
///
/// There is no owner field: any `user_profile` sent by the
/// client is dropped during deserialization.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct FeedItemInput {
    pub status_text: Option<String>,
}

/// A status update in a profile's feed.
///
/// # Invariants
/// - `user_profile` is assigned from the authenticated caller at creation and never changes.
/// - `created_on` is set once at creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileFeedItem {
    id: FeedItemId,
    user_profile: ProfileId,
    status_text: String,
    created_on: DateTime<Utc>,
}

impl ProfileFeedItem {
    /// Create a new item owned by `owner`.
    pub fn post(owner: ProfileId, input: &FeedItemInput, now: DateTime<Utc>) -> DomainResult<Self> {
        let mut errors = FieldErrors::new();
        let status_text = errors
            .require("status_text", input.status_text.as_deref())
            .and_then(|raw| errors.text("status_text", raw, STATUS_TEXT_MAX_LEN, true));

        let status_text = errors.into_result(status_text).map_err(DomainError::from)?;
        let Some(status_text) = status_text else {
            return Err(DomainError::validation("status_text missing"));
        };

        Ok(Self {
            id: FeedItemId::new(),
            user_profile: owner,
            status_text,
            created_on: now,
        })
    }

    /// Rehydrate an item from storage.
    pub fn from_parts(
        id: FeedItemId,
        user_profile: ProfileId,
        status_text: String,
        created_on: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            user_profile,
            status_text,
            created_on,
        }
    }

    /// Change the status text. Owner and creation time are untouched.
    pub fn revise(&mut self, input: &FeedItemInput, partial: bool) -> DomainResult<()> {
        let mut errors = FieldErrors::new();
        let raw = if partial {
            input.status_text.as_deref()
        } else {
            errors.require("status_text", input.status_text.as_deref())
        };
        let status_text = raw.and_then(|raw| errors.text("status_text", raw, STATUS_TEXT_MAX_LEN, true));

        if let Some(status_text) = errors.into_result(status_text).map_err(DomainError::from)? {
            self.status_text = status_text;
        }
        Ok(())
    }

    pub fn user_profile(&self) -> ProfileId {
        self.user_profile
    }

    pub fn status_text(&self) -> &str {
        &self.status_text
    }

    pub fn created_on(&self) -> DateTime<Utc> {
        self.created_on
    }
}

impl Entity for ProfileFeedItem {
    type Id = FeedItemId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl Owned for ProfileFeedItem {
    fn owner(&self) -> ProfileId {
        self.user_profile
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use profilehub_core::validation::{max_length_message, REQUIRED};

    fn status(text: &str) -> FeedItemInput {
        FeedItemInput {
            status_text: Some(text.to_string()),
        }
    }

    #[test]
    fn post_assigns_owner_and_timestamp() {
        let owner = ProfileId::new();
        let now = Utc::now();
        let item = ProfileFeedItem::post(owner, &status("  hello world "), now).unwrap();
        assert_eq!(item.user_profile(), owner);
        assert_eq!(item.owner(), owner);
        assert_eq!(item.status_text(), "hello world");
        assert_eq!(item.created_on(), now);
    }

    #[test]
    fn client_supplied_owner_is_ignored() {
        let body = serde_json::json!({
            "status_text": "hi",
            "user_profile": ProfileId::new().to_string(),
        });
        let input: FeedItemInput = serde_json::from_value(body).unwrap();
        let caller = ProfileId::new();
        let item = ProfileFeedItem::post(caller, &input, Utc::now()).unwrap();
        assert_eq!(item.user_profile(), caller);
    }

    #[test]
    fn post_requires_status_text() {
        let err = ProfileFeedItem::post(ProfileId::new(), &FeedItemInput::default(), Utc::now()).unwrap_err();
        match err {
            DomainError::InvalidFields(errors) => {
                assert_eq!(errors.get("status_text"), Some(&[REQUIRED.to_string()][..]));
            }
            other => panic!("expected InvalidFields, got {other:?}"),
        }
    }

    #[test]
    fn post_enforces_max_length() {
        let long = "x".repeat(STATUS_TEXT_MAX_LEN + 1);
        let err = ProfileFeedItem::post(ProfileId::new(), &status(&long), Utc::now()).unwrap_err();
        match err {
            DomainError::InvalidFields(errors) => {
                assert_eq!(
                    errors.get("status_text"),
                    Some(&[max_length_message(STATUS_TEXT_MAX_LEN)][..])
                );
            }
            other => panic!("expected InvalidFields, got {other:?}"),
        }
    }

    #[test]
    fn revise_keeps_owner_and_created_on() {
        let owner = ProfileId::new();
        let mut item = ProfileFeedItem::post(owner, &status("first"), Utc::now()).unwrap();
        let created_on = item.created_on();

        item.revise(&status("second"), false).unwrap();
        assert_eq!(item.status_text(), "second");
        assert_eq!(item.user_profile(), owner);
        assert_eq!(item.created_on(), created_on);
    }

    #[test]
    fn empty_partial_revise_is_a_no_op_but_full_revise_requires_text() {
        let mut item = ProfileFeedItem::post(ProfileId::new(), &status("first"), Utc::now()).unwrap();
        item.revise(&FeedItemInput::default(), true).unwrap();
        assert_eq!(item.status_text(), "first");
        assert!(item.revise(&FeedItemInput::default(), false).is_err());
        assert_eq!(item.status_text(), "first");
    }
}
