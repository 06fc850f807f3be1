//! Product reviews.

use bazaar_core::{ProductId, ReviewId};
use tracing::{info, instrument};

use crate::error::Result;
use crate::http::{ApiClient, ApiRequest};
use crate::models::{Review, ReviewRequest};

/// Review listing and authoring.
#[derive(Clone)]
pub struct ReviewService {
    api: ApiClient,
}

impl ReviewService {
    #[must_use]
    pub const fn new(api: ApiClient) -> Self {
        Self { api }
    }

    /// Reviews of a product, as returned by the backend.
    ///
    /// # Errors
    ///
    /// Returns the backend or transport error.
    #[instrument(skip(self))]
    pub async fn for_product(&self, product_id: ProductId) -> Result<Vec<Review>> {
        self.api
            .send(ApiRequest::get(format!("/api/reviews/product/{product_id}")))
            .await
    }

    /// Average rating, or `None` when there are no reviews.
    #[must_use]
    pub fn average_rating(reviews: &[Review]) -> Option<f64> {
        if reviews.is_empty() {
            return None;
        }
        let total: u32 = reviews.iter().map(|r| u32::from(r.rating)).sum();
        #[allow(clippy::cast_precision_loss)]
        let average = f64::from(total) / reviews.len() as f64;
        Some(average)
    }

    fn request(&self, product_id: ProductId, rating: u8, comment: &str) -> Result<ReviewRequest> {
        let user_id = self.api.auth().require_user()?;
        let request = ReviewRequest {
            product_id,
            user_id,
            rating,
            comment: comment.trim().to_string(),
        };
        request.validate()?;
        Ok(request)
    }

    /// Review a product as the signed-in user.
    ///
    /// # Errors
    ///
    /// `AuthRequired` when signed out, `Validation` for a rating outside 1-5
    /// or a blank comment, otherwise the backend error.
    #[instrument(skip(self, comment))]
    pub async fn create(&self, product_id: ProductId, rating: u8, comment: &str) -> Result<Review> {
        let request = self.request(product_id, rating, comment)?;
        let review: Review = self
            .api
            .send(ApiRequest::post("/api/reviews").json(&request)?)
            .await?;
        info!(review_id = %review.id, "review created");
        Ok(review)
    }

    /// Edit one of the signed-in user's reviews.
    ///
    /// # Errors
    ///
    /// Same as [`create`](Self::create).
    #[instrument(skip(self, comment))]
    pub async fn update(
        &self,
        review_id: ReviewId,
        product_id: ProductId,
        rating: u8,
        comment: &str,
    ) -> Result<Review> {
        let request = self.request(product_id, rating, comment)?;
        self.api
            .send(ApiRequest::put(format!("/api/reviews/{review_id}")).json(&request)?)
            .await
    }

    /// Delete a review.
    ///
    /// # Errors
    ///
    /// `AuthRequired` when signed out, otherwise the backend error.
    #[instrument(skip(self))]
    pub async fn delete(&self, review_id: ReviewId) -> Result<()> {
        self.api.auth().require_user()?;
        self.api
            .send_empty(ApiRequest::delete(format!("/api/reviews/{review_id}")))
            .await
    }
}
