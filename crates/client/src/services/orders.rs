//! Order placement, history and seller fulfilment.

use bazaar_core::{OrderId, OrderStatus, UserRole};
use tracing::{info, instrument};

use crate::error::{ClientError, Result};
use crate::http::{ApiClient, ApiRequest};
use crate::models::{Order, OrderRequest};

/// Order access. Customer calls are session-bound.
#[derive(Clone)]
pub struct OrderService {
    api: ApiClient,
}

impl OrderService {
    #[must_use]
    pub const fn new(api: ApiClient) -> Self {
        Self { api }
    }

    /// Place an order for the signed-in user's cart.
    ///
    /// # Errors
    ///
    /// `AuthRequired` when signed out or rejected, otherwise the backend error.
    #[instrument(skip(self, request), fields(payment_method = %request.payment_method))]
    pub async fn create(&self, request: &OrderRequest) -> Result<Order> {
        let user_id = self.api.auth().require_user()?;
        let order: Order = self
            .api
            .send(
                ApiRequest::post(format!("/api/orders/{user_id}"))
                    .json(request)?
                    .session(),
            )
            .await?;
        info!(order_id = %order.id, "order placed");
        Ok(order)
    }

    /// The signed-in user's orders.
    ///
    /// # Errors
    ///
    /// `AuthRequired` when signed out or rejected, otherwise the backend error.
    #[instrument(skip(self))]
    pub async fn list(&self) -> Result<Vec<Order>> {
        let user_id = self.api.auth().require_user()?;
        self.api
            .send(ApiRequest::get(format!("/api/orders/{user_id}")).session())
            .await
    }

    /// One of the signed-in user's orders.
    ///
    /// # Errors
    ///
    /// `AuthRequired` when signed out or rejected, otherwise the backend error.
    #[instrument(skip(self))]
    pub async fn get(&self, id: OrderId) -> Result<Order> {
        let user_id = self.api.auth().require_user()?;
        self.api
            .send(ApiRequest::get(format!("/api/orders/{user_id}/order/{id}")).session())
            .await
    }

    /// Cancel an order that has not shipped yet.
    ///
    /// # Errors
    ///
    /// `AuthRequired` when signed out or rejected, otherwise the backend error
    /// (the backend refuses orders past `CONFIRMED`).
    #[instrument(skip(self))]
    pub async fn cancel(&self, id: OrderId) -> Result<Order> {
        let user_id = self.api.auth().require_user()?;
        let order: Order = self
            .api
            .send(
                ApiRequest::put(format!("/api/orders/{user_id}/order/{id}/cancel")).session(),
            )
            .await?;
        info!("order cancelled");
        Ok(order)
    }

    /// Orders containing the signed-in seller's products.
    ///
    /// # Errors
    ///
    /// `AuthRequired`/`Forbidden` unless signed in as a seller or admin,
    /// otherwise the backend error.
    #[instrument(skip(self))]
    pub async fn seller_orders(&self) -> Result<Vec<Order>> {
        let seller_id = self
            .api
            .auth()
            .require_role(UserRole::is_seller_or_admin)?;
        self.api
            .send(ApiRequest::get(format!("/api/orders/seller/{seller_id}")).session())
            .await
    }

    /// Move an order to a new status (sellers and admins).
    ///
    /// # Errors
    ///
    /// `AuthRequired`/`Forbidden` unless signed in as a seller or admin,
    /// `Validation` when trying to revive a cancelled order, otherwise the
    /// backend error.
    #[instrument(skip(self, order), fields(order_id = %order.id))]
    pub async fn update_status(&self, order: &Order, status: OrderStatus) -> Result<Order> {
        self.api
            .auth()
            .require_role(UserRole::is_seller_or_admin)?;
        if order.status == Some(OrderStatus::Cancelled) && status != OrderStatus::Cancelled {
            return Err(ClientError::Validation(
                "Cancelled orders cannot change status".to_string(),
            ));
        }
        let updated: Order = self
            .api
            .send(
                ApiRequest::put(format!("/api/orders/{}/status", order.id))
                    .json(&status)?
                    .session(),
            )
            .await?;
        info!(%status, "order status updated");
        Ok(updated)
    }
}
