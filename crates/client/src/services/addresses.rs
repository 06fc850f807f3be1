//! The signed-in user's saved addresses.

use bazaar_core::{AddressId, UserId};
use tracing::{info, instrument};

use crate::error::Result;
use crate::http::{ApiClient, ApiRequest};
use crate::models::Address;

/// Address book access. Every call is session-bound: a rejected credential
/// signs the user out and redirects to login.
#[derive(Clone)]
pub struct AddressService {
    api: ApiClient,
}

impl AddressService {
    #[must_use]
    pub const fn new(api: ApiClient) -> Self {
        Self { api }
    }

    fn user(&self) -> Result<UserId> {
        self.api.auth().require_user()
    }

    /// All saved addresses.
    ///
    /// # Errors
    ///
    /// `AuthRequired` when signed out or rejected, otherwise the backend error.
    #[instrument(skip(self))]
    pub async fn list(&self) -> Result<Vec<Address>> {
        let user_id = self.user()?;
        self.api
            .send(ApiRequest::get(format!("/api/addresses/{user_id}")).session())
            .await
    }

    /// One address.
    ///
    /// # Errors
    ///
    /// `AuthRequired` when signed out or rejected, otherwise the backend error.
    #[instrument(skip(self))]
    pub async fn get(&self, id: AddressId) -> Result<Address> {
        let user_id = self.user()?;
        self.api
            .send(ApiRequest::get(format!("/api/addresses/{user_id}/address/{id}")).session())
            .await
    }

    /// The default address, if one is marked.
    ///
    /// # Errors
    ///
    /// `AuthRequired` when signed out or rejected, otherwise the backend error
    /// (a 404 is reported as `None`).
    #[instrument(skip(self))]
    pub async fn default_address(&self) -> Result<Option<Address>> {
        let user_id = self.user()?;
        match self
            .api
            .send(ApiRequest::get(format!("/api/addresses/{user_id}/default")).session())
            .await
        {
            Ok(address) => Ok(Some(address)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Save a new address.
    ///
    /// # Errors
    ///
    /// `Validation` when required fields are blank, `AuthRequired` when
    /// signed out or rejected, otherwise the backend error.
    #[instrument(skip(self, address))]
    pub async fn create(&self, address: &Address) -> Result<Address> {
        let user_id = self.user()?;
        address.validate()?;
        let created: Address = self
            .api
            .send(
                ApiRequest::post(format!("/api/addresses/{user_id}"))
                    .json(address)?
                    .session(),
            )
            .await?;
        info!(address_id = ?created.id, "address created");
        Ok(created)
    }

    /// Replace an address.
    ///
    /// # Errors
    ///
    /// Same as [`create`](Self::create).
    #[instrument(skip(self, address))]
    pub async fn update(&self, id: AddressId, address: &Address) -> Result<Address> {
        let user_id = self.user()?;
        address.validate()?;
        self.api
            .send(
                ApiRequest::put(format!("/api/addresses/{user_id}/address/{id}"))
                    .json(address)?
                    .session(),
            )
            .await
    }

    /// Mark an address as the default.
    ///
    /// # Errors
    ///
    /// `AuthRequired` when signed out or rejected, otherwise the backend error.
    #[instrument(skip(self))]
    pub async fn set_default(&self, id: AddressId) -> Result<Address> {
        let user_id = self.user()?;
        self.api
            .send(
                ApiRequest::put(format!("/api/addresses/{user_id}/address/{id}/default")).session(),
            )
            .await
    }

    /// Delete an address.
    ///
    /// # Errors
    ///
    /// `AuthRequired` when signed out or rejected, otherwise the backend error.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: AddressId) -> Result<()> {
        let user_id = self.user()?;
        self.api
            .send_empty(
                ApiRequest::delete(format!("/api/addresses/{user_id}/address/{id}")).session(),
            )
            .await
    }
}
