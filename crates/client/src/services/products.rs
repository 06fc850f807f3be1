//! Catalog reads (cached) and seller product management.

use std::time::Duration;

use bazaar_core::{CategoryId, ProductId, UserId, UserRole};
use moka::future::Cache;
use rust_decimal::Decimal;
use tracing::{debug, info, instrument};

use crate::error::{ClientError, Result};
use crate::http::{ApiClient, ApiRequest};
use crate::models::{Category, Product, ProductRequest};

const CACHE_CAPACITY: u64 = 1000;

/// Cache key for catalog reads.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
enum CacheKey {
    Product(ProductId),
    Products,
    Category(CategoryId),
    Seller(UserId),
    Categories,
}

/// Cached value types.
#[derive(Debug, Clone)]
enum CacheValue {
    Product(Box<Product>),
    Products(Vec<Product>),
    Categories(Vec<Category>),
}

/// Product and category access.
///
/// Listings and single products are cached; searches are not. Any write
/// through this service invalidates the whole cache.
#[derive(Clone)]
pub struct ProductService {
    api: ApiClient,
    cache: Cache<CacheKey, CacheValue>,
}

impl ProductService {
    #[must_use]
    pub fn new(api: ApiClient, ttl: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(CACHE_CAPACITY)
            .time_to_live(ttl)
            .build();
        Self { api, cache }
    }

    async fn cached_list(&self, key: CacheKey, path: String) -> Result<Vec<Product>> {
        if let Some(CacheValue::Products(products)) = self.cache.get(&key).await {
            debug!(?key, "Cache hit for product list");
            return Ok(products);
        }
        let products: Vec<Product> = self.api.send(ApiRequest::get(path)).await?;
        self.cache
            .insert(key, CacheValue::Products(products.clone()))
            .await;
        Ok(products)
    }

    /// All products.
    ///
    /// # Errors
    ///
    /// Returns the backend or transport error.
    #[instrument(skip(self))]
    pub async fn list(&self) -> Result<Vec<Product>> {
        self.cached_list(CacheKey::Products, "/api/products".to_string())
            .await
    }

    /// One product.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Backend` with status 404 for unknown products.
    #[instrument(skip(self))]
    pub async fn get(&self, id: ProductId) -> Result<Product> {
        let key = CacheKey::Product(id);
        if let Some(CacheValue::Product(product)) = self.cache.get(&key).await {
            debug!("Cache hit for product");
            return Ok(*product);
        }
        let product: Product = self
            .api
            .send(ApiRequest::get(format!("/api/products/{id}")))
            .await?;
        self.cache
            .insert(key, CacheValue::Product(Box::new(product.clone())))
            .await;
        Ok(product)
    }

    /// Products in a category.
    ///
    /// # Errors
    ///
    /// Returns the backend or transport error.
    #[instrument(skip(self))]
    pub async fn by_category(&self, category_id: CategoryId) -> Result<Vec<Product>> {
        self.cached_list(
            CacheKey::Category(category_id),
            format!("/api/products/category/{category_id}"),
        )
        .await
    }

    /// Products listed by a seller.
    ///
    /// # Errors
    ///
    /// Returns the backend or transport error.
    #[instrument(skip(self))]
    pub async fn by_seller(&self, seller_id: UserId) -> Result<Vec<Product>> {
        self.cached_list(
            CacheKey::Seller(seller_id),
            format!("/api/products/seller/{seller_id}"),
        )
        .await
    }

    /// Products whose name contains `name`. Not cached.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Validation` for a blank query, otherwise the
    /// backend or transport error.
    #[instrument(skip(self))]
    pub async fn search(&self, name: &str) -> Result<Vec<Product>> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ClientError::Validation(
                "Please enter a search term".to_string(),
            ));
        }
        self.api
            .send(ApiRequest::get("/api/products/search").query("name", name))
            .await
    }

    /// Products priced within `[min, max]`; either bound may be open. Not cached.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Validation` when `min > max`, otherwise the
    /// backend or transport error.
    #[instrument(skip(self))]
    pub async fn by_price_range(
        &self,
        min: Option<Decimal>,
        max: Option<Decimal>,
    ) -> Result<Vec<Product>> {
        if let (Some(lo), Some(hi)) = (min, max)
            && lo > hi
        {
            return Err(ClientError::Validation(
                "Minimum price cannot exceed maximum price".to_string(),
            ));
        }
        let mut request = ApiRequest::get("/api/products/price");
        if let Some(lo) = min {
            request = request.query("min", lo);
        }
        if let Some(hi) = max {
            request = request.query("max", hi);
        }
        self.api.send(request).await
    }

    /// All categories.
    ///
    /// # Errors
    ///
    /// Returns the backend or transport error.
    #[instrument(skip(self))]
    pub async fn categories(&self) -> Result<Vec<Category>> {
        if let Some(CacheValue::Categories(categories)) =
            self.cache.get(&CacheKey::Categories).await
        {
            debug!("Cache hit for categories");
            return Ok(categories);
        }
        let categories: Vec<Category> = self.api.send(ApiRequest::get("/api/categories")).await?;
        self.cache
            .insert(
                CacheKey::Categories,
                CacheValue::Categories(categories.clone()),
            )
            .await;
        Ok(categories)
    }

    // =========================================================================
    // Seller operations
    // =========================================================================

    fn require_seller(&self) -> Result<UserId> {
        self.api.auth().require_role(UserRole::is_seller_or_admin)
    }

    /// Create a product.
    ///
    /// # Errors
    ///
    /// Returns `AuthRequired`/`Forbidden` unless signed in as a seller or
    /// admin, `Validation` for bad input, otherwise the backend error.
    #[instrument(skip(self, request), fields(name = %request.name))]
    pub async fn create(&self, request: &ProductRequest) -> Result<Product> {
        self.require_seller()?;
        request.validate()?;
        let product: Product = self
            .api
            .send(ApiRequest::post("/api/products").json(request)?)
            .await?;
        self.cache.invalidate_all();
        info!(product_id = %product.id, "product created");
        Ok(product)
    }

    /// Replace a product.
    ///
    /// # Errors
    ///
    /// Same as [`create`](Self::create).
    #[instrument(skip(self, request))]
    pub async fn update(&self, id: ProductId, request: &ProductRequest) -> Result<Product> {
        self.require_seller()?;
        request.validate()?;
        let product: Product = self
            .api
            .send(ApiRequest::put(format!("/api/products/{id}")).json(request)?)
            .await?;
        self.cache.invalidate_all();
        info!("product updated");
        Ok(product)
    }

    /// Delete a product.
    ///
    /// # Errors
    ///
    /// Returns `AuthRequired`/`Forbidden` unless signed in as a seller or
    /// admin, otherwise the backend error.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: ProductId) -> Result<()> {
        self.require_seller()?;
        self.api
            .send_empty(ApiRequest::delete(format!("/api/products/{id}")))
            .await?;
        self.cache.invalidate_all();
        info!("product deleted");
        Ok(())
    }
}
