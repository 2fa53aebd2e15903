//! Client for the Storefront REST API that likes and reviews mirror to.

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response};
use storefront_model::{ProductId, Review};
use storefront_store::{LikesRemote, ReviewsRemote, Result, StoreError};
use tracing::debug;

#[derive(Clone)]
pub struct RestClient {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl RestClient {
    pub fn new(base_url: impl Into<String>, token: Option<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| StoreError::Remote(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let request = self.http.request(method, self.url(path));
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response> {
        let response = request.send().await.map_err(remote_error)?;
        debug!(status = %response.status(), url = %response.url(), "remote response");
        response.error_for_status().map_err(remote_error)
    }
}

fn remote_error(err: reqwest::Error) -> StoreError {
    StoreError::Remote(err.to_string())
}

#[async_trait]
impl LikesRemote for RestClient {
    async fn fetch_likes(&self) -> Result<Vec<ProductId>> {
        let response = self.send(self.request(Method::GET, "likes")).await?;
        response.json().await.map_err(remote_error)
    }

    async fn set_like(&self, product: ProductId, liked: bool) -> Result<()> {
        let method = if liked { Method::PUT } else { Method::DELETE };
        self.send(self.request(method, &format!("likes/{product}")))
            .await?;
        Ok(())
    }
}

#[async_trait]
impl ReviewsRemote for RestClient {
    async fn fetch_reviews(&self, product: ProductId) -> Result<Vec<Review>> {
        let path = format!("products/{product}/reviews");
        let response = self.send(self.request(Method::GET, &path)).await?;
        response.json().await.map_err(remote_error)
    }

    async fn submit_review(&self, review: &Review) -> Result<()> {
        let path = format!("products/{}/reviews", review.product_id);
        self.send(self.request(Method::POST, &path).json(review))
            .await?;
        Ok(())
    }
}
