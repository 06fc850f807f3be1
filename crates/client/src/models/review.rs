//! Product reviews.

use bazaar_core::{ProductId, ReviewId, UserId};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::error::ClientError;

/// Lowest accepted rating.
pub const MIN_RATING: u8 = 1;
/// Highest accepted rating.
pub const MAX_RATING: u8 = 5;

/// A review as returned by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub id: ReviewId,
    pub product_id: ProductId,
    pub user_id: UserId,
    pub rating: u8,
    #[serde(default, deserialize_with = "super::null_as_default")]
    pub comment: String,
    #[serde(default)]
    pub created_at: Option<NaiveDateTime>,
    #[serde(default)]
    pub user: Option<ReviewAuthor>,
}

impl Review {
    /// Name to show next to the review.
    #[must_use]
    pub fn author_name(&self) -> String {
        self.user.as_ref().map_or_else(
            || format!("User {}", self.user_id),
            ReviewAuthor::display_name,
        )
    }
}

/// The reviewer, as embedded in a review.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewAuthor {
    pub id: UserId,
    pub username: String,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
}

impl ReviewAuthor {
    /// Full name when known, otherwise the username.
    #[must_use]
    pub fn display_name(&self) -> String {
        let full = [self.first_name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        if full.is_empty() {
            self.username.clone()
        } else {
            full
        }
    }
}

/// Body for creating or updating a review.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewRequest {
    pub product_id: ProductId,
    pub user_id: UserId,
    pub rating: u8,
    pub comment: String,
}

impl ReviewRequest {
    /// Check rating range and comment before sending.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Validation` when the rating is outside 1-5 or
    /// the comment is blank.
    pub fn validate(&self) -> Result<(), ClientError> {
        if !(MIN_RATING..=MAX_RATING).contains(&self.rating) {
            return Err(ClientError::Validation(format!(
                "Rating must be between {MIN_RATING} and {MAX_RATING}"
            )));
        }
        if self.comment.trim().is_empty() {
            return Err(ClientError::Validation(
                "Please write a comment".to_string(),
            ));
        }
        Ok(())
    }
}
