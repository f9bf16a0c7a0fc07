use anyhow::{anyhow, bail, Context};
use reqwest::{StatusCode, Url};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::policies::ExponentialBackoff;
use reqwest_retry::RetryTransientMiddleware;
use reqwest_tracing::TracingMiddleware;
use serde::de::DeserializeOwned;

use crate::api::{
    AddBookRequest, Book, BookListQuery, CatalogStats, Member, MemberDetails, Outcome,
    RegisterMemberRequest, Transaction, TransactionHistoryRecord, TransactionListQuery,
    TransactionRequest,
};
use crate::notice::Notice;

/// Either the accepted outcome or the notice explaining why the catalog refused the call
pub type CatalogResponse<T> = Result<Outcome<T>, Notice>;

pub struct LibraryServiceClient {
    url: String,
    client: ClientWithMiddleware,
}

impl LibraryServiceClient {
    pub fn new(url: &str) -> anyhow::Result<Self> {
        let reqwest_client = reqwest::Client::builder()
            .build()
            .context("Failed to build reqwest client")?;
        let retry_policy = ExponentialBackoff::builder().build_with_max_retries(3);
        let client = ClientBuilder::new(reqwest_client)
            // Insert the tracing middleware
            .with(TracingMiddleware::default())
            .with(RetryTransientMiddleware::new_with_policy(retry_policy))
            .build();

        Ok(Self {
            url: url.trim_end_matches('/').to_string(),
            client,
        })
    }

    fn url_with_params(&self, path: &str, params: &[(&str, &str)]) -> anyhow::Result<Url> {
        Url::parse_with_params(&format!("{}{}", self.url, path), params)
            .context("Failed to build request url")
    }

    /// Appends percent-encoded path segments to the service url
    fn url_with_segments(&self, segments: &[&str]) -> anyhow::Result<Url> {
        let mut url = Url::parse(&self.url).context("Failed to build request url")?;
        url.path_segments_mut()
            .map_err(|_| anyhow!("Service url {} cannot take a path", self.url))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Calls POST /api/member endpoint
    pub async fn register_member(
        &self,
        request: &RegisterMemberRequest,
    ) -> anyhow::Result<CatalogResponse<Member>> {
        let response = self
            .client
            .post(format!("{}/api/member", self.url))
            .json(request)
            .send()
            .await?;
        read_outcome(response, "register member").await
    }

    /// Calls GET /api/member/{member_id} endpoint
    /// Returns None if the member is not registered
    pub async fn get_member(&self, member_id: &str) -> anyhow::Result<Option<MemberDetails>> {
        let response = self
            .client
            .get(self.url_with_segments(&["api", "member", member_id])?)
            .send()
            .await?;
        read_optional(response, "get member").await
    }

    /// Calls DELETE /api/member/{member_id} endpoint
    pub async fn delete_member(&self, member_id: &str) -> anyhow::Result<CatalogResponse<Member>> {
        let response = self
            .client
            .delete(self.url_with_segments(&["api", "member", member_id])?)
            .send()
            .await?;
        read_outcome(response, "delete member").await
    }

    /// Calls GET /api/members endpoint
    pub async fn search_members(&self, query: &str) -> anyhow::Result<Vec<Member>> {
        let url = self.url_with_params("/api/members", &[("query", query)])?;
        let response = self.client.get(url).send().await?;
        read_list(response, "search members").await
    }

    /// Calls GET /api/members/active endpoint
    pub async fn active_members(&self) -> anyhow::Result<Vec<Member>> {
        let response = self
            .client
            .get(format!("{}/api/members/active", self.url))
            .send()
            .await?;
        read_list(response, "list active members").await
    }

    /// Calls POST /api/book endpoint
    pub async fn add_book(&self, request: &AddBookRequest) -> anyhow::Result<CatalogResponse<Book>> {
        let response = self
            .client
            .post(format!("{}/api/book", self.url))
            .json(request)
            .send()
            .await?;
        read_outcome(response, "add book").await
    }

    /// Calls GET /api/book/{isbn} endpoint
    /// Returns None if the book is not in the catalog
    pub async fn get_book(&self, isbn: &str) -> anyhow::Result<Option<Book>> {
        let response = self
            .client
            .get(self.url_with_segments(&["api", "book", isbn])?)
            .send()
            .await?;
        read_optional(response, "get book").await
    }

    /// Calls DELETE /api/book/{isbn} endpoint
    pub async fn delete_book(&self, isbn: &str) -> anyhow::Result<CatalogResponse<Book>> {
        let response = self
            .client
            .delete(self.url_with_segments(&["api", "book", isbn])?)
            .send()
            .await?;
        read_outcome(response, "delete book").await
    }

    /// Calls GET /api/books endpoint
    pub async fn list_books(&self, query: &BookListQuery) -> anyhow::Result<Vec<Book>> {
        let params: Vec<(&str, &str)> = [
            ("query", query.query.as_deref()),
            ("category", query.category.as_deref()),
            ("status", query.status.as_deref()),
        ]
        .into_iter()
        .filter_map(|(name, value)| value.map(|value| (name, value)))
        .collect();
        let url = self.url_with_params("/api/books", &params)?;
        let response = self.client.get(url).send().await?;
        read_list(response, "list books").await
    }

    /// Calls POST /api/transaction endpoint
    pub async fn process_transaction(
        &self,
        request: &TransactionRequest,
    ) -> anyhow::Result<CatalogResponse<Transaction>> {
        let response = self
            .client
            .post(format!("{}/api/transaction", self.url))
            .json(request)
            .send()
            .await?;
        read_outcome(response, "process transaction").await
    }

    /// Calls GET /api/transactions endpoint
    pub async fn list_transactions(
        &self,
        query: &TransactionListQuery,
    ) -> anyhow::Result<Vec<TransactionHistoryRecord>> {
        let params: Vec<(&str, &str)> = [
            ("query", query.query.as_deref()),
            ("state", query.state.as_deref()),
            ("kind", query.kind.as_deref()),
        ]
        .into_iter()
        .filter_map(|(name, value)| value.map(|value| (name, value)))
        .collect();
        let url = self.url_with_params("/api/transactions", &params)?;
        let response = self.client.get(url).send().await?;
        read_list(response, "list transactions").await
    }

    /// Calls GET /api/history endpoint
    pub async fn history(&self, query: &str) -> anyhow::Result<Vec<TransactionHistoryRecord>> {
        let url = self.url_with_params("/api/history", &[("query", query)])?;
        let response = self.client.get(url).send().await?;
        read_list(response, "get history").await
    }

    /// Calls GET /api/stats endpoint
    pub async fn stats(&self) -> anyhow::Result<CatalogStats> {
        let response = self
            .client
            .get(format!("{}/api/stats", self.url))
            .send()
            .await?;
        if response.status().is_success() {
            Ok(response.json().await?)
        } else {
            let error = response.text().await.unwrap_or_default();
            bail!("Failed to get stats {}", error)
        }
    }
}

async fn read_outcome<T: DeserializeOwned>(
    response: reqwest::Response,
    action: &str,
) -> anyhow::Result<CatalogResponse<T>> {
    let status = response.status();
    if status.is_success() {
        Ok(Ok(response.json().await?))
    } else if status.is_client_error() {
        let notice: Notice = response
            .json()
            .await
            .with_context(|| format!("Failed to read rejection of {action}"))?;
        Ok(Err(notice))
    } else {
        let error = response.text().await.unwrap_or_default();
        bail!("Failed to {} {}", action, error)
    }
}

async fn read_optional<T: DeserializeOwned>(
    response: reqwest::Response,
    action: &str,
) -> anyhow::Result<Option<T>> {
    if response.status() == StatusCode::NOT_FOUND {
        Ok(None)
    } else if response.status().is_success() {
        Ok(Some(response.json().await?))
    } else {
        let error = response.text().await.unwrap_or_default();
        bail!("Failed to {} {}", action, error)
    }
}

async fn read_list<T: DeserializeOwned>(
    response: reqwest::Response,
    action: &str,
) -> anyhow::Result<Vec<T>> {
    if response.status().is_success() {
        Ok(response.json().await?)
    } else {
        let error = response.text().await.unwrap_or_default();
        bail!("Failed to {} {}", action, error)
    }
}
