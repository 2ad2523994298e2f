use log::{debug, info};
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use url::Url;

use crate::auth::Token;
use crate::error::{PipewatchError, Result};
use crate::repositories::RepositoryRef;

pub(super) const PAGE_SIZE: usize = 100;

pub struct GitLabClient {
    client: Client,
    base_url: Url,
    api_url: Url,
    token: Option<Token>,
}

#[derive(Deserialize)]
struct CurrentUser {
    username: String,
}

impl GitLabClient {
    /// Creates a REST client for the GitLab instance at `base_url`.
    ///
    /// `insecure` disables TLS certificate verification, for self-hosted
    /// instances with private certificates.
    pub fn new(base_url: &str, token: Option<Token>, insecure: bool) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("pipewatch/", env!("CARGO_PKG_VERSION")))
            .danger_accept_invalid_certs(insecure)
            .build()
            .map_err(|e| PipewatchError::Config(format!("Failed to create HTTP client: {e}")))?;

        let base_url = Url::parse(&format!("{}/", base_url.trim_end_matches('/')))
            .map_err(|e| PipewatchError::Config(format!("Invalid base URL: {e}")))?;

        let api_url = base_url
            .join("api/v4/")
            .map_err(|e| PipewatchError::Config(format!("Invalid API base URL: {e}")))?;

        Ok(Self {
            client,
            base_url,
            api_url,
            token,
        })
    }

    /// Instance URL without trailing slash, e.g. `https://gitlab.com`.
    pub fn base_url(&self) -> &str {
        self.base_url.as_str().trim_end_matches('/')
    }

    pub(super) fn client(&self) -> &Client {
        &self.client
    }

    pub(super) fn auth_request(&self, request: RequestBuilder) -> RequestBuilder {
        if let Some(token) = &self.token {
            request.bearer_auth(token.as_str())
        } else {
            request
        }
    }

    /// Construct project base URL
    pub(super) fn project_url(&self, repository: &RepositoryRef) -> Result<Url> {
        self.api_url
            .join(&format!(
                "projects/{}/",
                urlencoding::encode(repository.as_str())
            ))
            .map_err(|e| PipewatchError::Config(format!("Invalid project URL: {e}")))
    }

    pub(super) fn join(url: &Url, path: &str) -> Result<Url> {
        url.join(path)
            .map_err(|e| PipewatchError::Config(format!("Invalid API URL '{path}': {e}")))
    }

    /// Sends an authenticated request and turns non-2xx responses into errors.
    pub(super) async fn send(&self, request: RequestBuilder) -> Result<Response> {
        let response = self.auth_request(request).send().await?;
        let status = response.status();

        if status.is_success() {
            return Ok(response);
        }

        let message = response
            .text()
            .await
            .unwrap_or_else(|_| "Unable to read error response".to_string());
        Err(PipewatchError::Api {
            status: status.as_u16(),
            message: message.trim().to_string(),
        })
    }

    pub(super) async fn get_json<T>(&self, url: Url, query: &[(&str, String)]) -> Result<T>
    where
        T: DeserializeOwned,
    {
        debug!("GET {url}");
        let response = self.send(self.client.get(url).query(query)).await?;
        Ok(response.json().await?)
    }

    /// Follows `page`/`per_page` pagination until a short page comes back.
    pub(super) async fn get_paginated<T>(
        &self,
        url: Url,
        query: &[(&str, String)],
    ) -> Result<Vec<T>>
    where
        T: DeserializeOwned,
    {
        let mut all_items = Vec::new();
        let mut page = 1;

        loop {
            let mut page_query = query.to_vec();
            page_query.push(("per_page", PAGE_SIZE.to_string()));
            page_query.push(("page", page.to_string()));

            let items: Vec<T> = self.get_json(url.clone(), &page_query).await?;
            let fetched = items.len();
            all_items.extend(items);

            if fetched < PAGE_SIZE {
                break;
            }
            page += 1;
        }

        Ok(all_items)
    }

    /// Verifies the token against `GET /user`.
    ///
    /// # Errors
    ///
    /// Returns a configuration error when GitLab is unreachable or rejects
    /// the credentials.
    pub async fn authenticate(&self) -> Result<()> {
        let url = Self::join(&self.api_url, "user")?;
        let user: CurrentUser = self.get_json(url, &[]).await.map_err(|e| {
            PipewatchError::Config(format!(
                "Failed to connect or authenticate to GitLab: {e}"
            ))
        })?;

        info!(
            "Connected and authenticated to {} as {}.",
            self.base_url(),
            user.username
        );
        Ok(())
    }
}
