use crate::error::{Result, UpdaterError};
use bytes::Bytes;
use reqwest::blocking::Client;
use reqwest::{StatusCode, Url};
use std::time::Duration;

/// Abstraction over retrieving resources from the artifact host.
///
/// Implementations perform exactly one blocking attempt per call and succeed
/// only on HTTP 200; any other status surfaces as
/// [`UpdaterError::Transport`] carrying the code.
pub trait Fetcher {
    /// Fetch the full body at `url`.
    fn fetch(&self, url: &Url) -> Result<Bytes>;
}

impl<F: Fetcher + ?Sized> Fetcher for &F {
    fn fetch(&self, url: &Url) -> Result<Bytes> {
        (**self).fetch(url)
    }
}

/// Builder for [`HttpFetcher`].
#[derive(Default)]
pub struct HttpFetcherBuilder {
    client: Option<Client>,
    user_agent: Option<String>,
}

impl HttpFetcherBuilder {
    /// Provide a custom reqwest client instance (proxies, timeouts, roots).
    pub fn client(mut self, client: Client) -> Self {
        self.client = Some(client);
        self
    }

    /// Override the `User-Agent` header of the default client.
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Build the fetcher.
    pub fn build(self) -> Result<HttpFetcher> {
        let client = match self.client {
            Some(client) => client,
            None => Client::builder()
                // The blocking client otherwise aborts requests after 30s.
                .timeout(None::<Duration>)
                .user_agent(
                    self.user_agent
                        .unwrap_or_else(|| concat!("autoupdater/", env!("CARGO_PKG_VERSION")).into()),
                )
                .build()
                .map_err(|err| UpdaterError::transport("<client>", err))?,
        };

        Ok(HttpFetcher { client })
    }
}

/// Blocking HTTP(S) fetcher backed by reqwest.
///
/// The default client applies no timeout; callers needing a deadline supply
/// their own client through [`HttpFetcherBuilder::client`].
#[derive(Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    /// Create a new builder.
    pub fn builder() -> HttpFetcherBuilder {
        HttpFetcherBuilder::default()
    }
}

impl Fetcher for HttpFetcher {
    fn fetch(&self, url: &Url) -> Result<Bytes> {
        tracing::debug!(%url, "fetching");
        let response = self
            .client
            .get(url.clone())
            .send()
            .map_err(|err| UpdaterError::transport(url.as_str(), err))?;

        let status = response.status();
        if status != StatusCode::OK {
            tracing::debug!(%url, status = status.as_u16(), "unexpected status");
            return Err(UpdaterError::status(url.as_str(), status.as_u16()));
        }

        response
            .bytes()
            .map_err(|err| UpdaterError::transport(url.as_str(), err))
    }
}
