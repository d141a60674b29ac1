mod models;
pub mod worker;

use crate::auth;
use crate::config::ConfigFile;
use crate::errors::*;
use crate::http;
use async_trait::async_trait;
pub use models::*;
use reqwest::RequestBuilder;
use std::borrow::Cow;
use std::time::Duration;
use url::Url;

pub const AUTH_COOKIE_HEADER: &str = "X-Auth-Cookie";

const DEFAULT_ENDPOINT: &str = "http://127.0.0.1:8221";

pub struct Client {
    endpoint: Url,
    client: http::Client,
    is_default_endpoint: bool,
    auth_cookie: Option<String>,
}

impl Client {
    pub fn new(config: ConfigFile, endpoint: Option<String>) -> Result<Client> {
        let (endpoint, auth_cookie, is_default_endpoint) = if let Some(endpoint) = endpoint {
            let cookie = config.endpoints.get(&endpoint).map(|e| e.cookie.to_string());
            (endpoint, cookie, false)
        } else if let Some(endpoint) = config.http.endpoint {
            (endpoint, None, true)
        } else {
            (DEFAULT_ENDPOINT.to_string(), None, true)
        };

        let mut endpoint = endpoint
            .parse::<Url>()
            .with_context(|| anyhow!("Failed to parse endpoint as url: {:?}", endpoint))?;

        // Url::join drops the last path segment unless it ends with a slash
        if !endpoint.path().ends_with('/') {
            let path = format!("{}/", endpoint.path());
            endpoint.set_path(&path);
        }

        debug!("setting buildd-manager endpoint to {:?}", endpoint.as_str());
        let client = http::client(Duration::from_secs(60))?;
        Ok(Client {
            endpoint,
            client,
            is_default_endpoint,
            auth_cookie,
        })
    }

    pub fn with_auth_cookie(&mut self) -> Result<&mut Self> {
        if self.is_default_endpoint {
            let auth_cookie = auth::find_auth_cookie().context("Failed to load auth cookie")?;
            Ok(self.auth_cookie(auth_cookie))
        } else {
            Ok(self)
        }
    }

    pub fn auth_cookie<I: Into<String>>(&mut self, cookie: I) -> &mut Self {
        self.auth_cookie = Some(cookie.into());
        self
    }

    fn url(&self, path: Cow<'static, str>) -> Url {
        match self.endpoint.join(&path) {
            Ok(url) => url,
            Err(err) => {
                warn!("Failed to join {:?} onto endpoint: {:#}", path, err);
                self.endpoint.clone()
            }
        }
    }

    fn authenticate(&self, mut req: RequestBuilder) -> RequestBuilder {
        if let Some(auth_cookie) = &self.auth_cookie {
            req = req.header(AUTH_COOKIE_HEADER, auth_cookie);
        }
        req
    }

    pub fn get(&self, path: Cow<'static, str>) -> RequestBuilder {
        self.authenticate(self.client.get(self.url(path)))
    }

    pub fn post(&self, path: Cow<'static, str>) -> RequestBuilder {
        self.authenticate(self.client.post(self.url(path)))
    }
}

/// The operator surface of the build farm manager.
#[async_trait]
pub trait AdminApi {
    async fn list_builders(&self) -> Result<Vec<BuilderInfo>>;
    async fn get_builder(&self, id: i32) -> Result<BuilderInfo>;
    async fn reset_builder(&self, id: i32) -> Result<()>;
    async fn enable_builder(&self, id: i32) -> Result<()>;
    async fn disable_builder(&self, id: i32, reason: String) -> Result<()>;

    async fn list_queue(&self) -> Result<Vec<QueueEntry>>;
    async fn set_manual_score(&self, id: i32, score: i32) -> Result<()>;
    async fn suspend_queue_entry(&self, id: i32) -> Result<()>;
    async fn resume_queue_entry(&self, id: i32) -> Result<()>;

    async fn request_build(&self, request: &BuildRequest) -> Result<QueuedBuild>;
    async fn get_build(&self, id: i32) -> Result<BuildInfo>;
    async fn cancel_build(&self, id: i32) -> Result<CancelState>;
    async fn retry_build(&self, id: i32) -> Result<QueuedBuild>;
    async fn supersede_build(&self, id: i32) -> Result<()>;
    async fn complete_upload(&self, id: i32, success: bool) -> Result<()>;
}

#[async_trait]
impl AdminApi for Client {
    async fn list_builders(&self) -> Result<Vec<BuilderInfo>> {
        let records = self
            .get(Cow::Borrowed("api/v1/builders"))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(records)
    }

    async fn get_builder(&self, id: i32) -> Result<BuilderInfo> {
        let record = self
            .get(Cow::Owned(format!("api/v1/builders/{id}")))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(record)
    }

    async fn reset_builder(&self, id: i32) -> Result<()> {
        self.post(Cow::Owned(format!("api/v1/builders/{id}/reset")))
            .send()
            .await?
            .error_for_status()?;

        Ok(())
    }

    async fn enable_builder(&self, id: i32) -> Result<()> {
        self.post(Cow::Owned(format!("api/v1/builders/{id}/enable")))
            .send()
            .await?
            .error_for_status()?;

        Ok(())
    }

    async fn disable_builder(&self, id: i32, reason: String) -> Result<()> {
        self.post(Cow::Owned(format!("api/v1/builders/{id}/disable")))
            .json(&DisableBuilderRequest { reason })
            .send()
            .await?
            .error_for_status()?;

        Ok(())
    }

    async fn list_queue(&self) -> Result<Vec<QueueEntry>> {
        let records = self
            .get(Cow::Borrowed("api/v1/queue"))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(records)
    }

    async fn set_manual_score(&self, id: i32, score: i32) -> Result<()> {
        self.post(Cow::Owned(format!("api/v1/queue/{id}/score")))
            .json(&ScoreRequest { score })
            .send()
            .await?
            .error_for_status()?;

        Ok(())
    }

    async fn suspend_queue_entry(&self, id: i32) -> Result<()> {
        self.post(Cow::Owned(format!("api/v1/queue/{id}/suspend")))
            .send()
            .await?
            .error_for_status()?;

        Ok(())
    }

    async fn resume_queue_entry(&self, id: i32) -> Result<()> {
        self.post(Cow::Owned(format!("api/v1/queue/{id}/resume")))
            .send()
            .await?
            .error_for_status()?;

        Ok(())
    }

    async fn request_build(&self, request: &BuildRequest) -> Result<QueuedBuild> {
        let queued = self
            .post(Cow::Borrowed("api/v1/builds"))
            .json(request)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(queued)
    }

    async fn get_build(&self, id: i32) -> Result<BuildInfo> {
        let record = self
            .get(Cow::Owned(format!("api/v1/builds/{id}")))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(record)
    }

    async fn cancel_build(&self, id: i32) -> Result<CancelState> {
        let state = self
            .post(Cow::Owned(format!("api/v1/builds/{id}/cancel")))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(state)
    }

    async fn retry_build(&self, id: i32) -> Result<QueuedBuild> {
        let queued = self
            .post(Cow::Owned(format!("api/v1/builds/{id}/retry")))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(queued)
    }

    async fn supersede_build(&self, id: i32) -> Result<()> {
        self.post(Cow::Owned(format!("api/v1/builds/{id}/supersede")))
            .send()
            .await?
            .error_for_status()?;

        Ok(())
    }

    async fn complete_upload(&self, id: i32, success: bool) -> Result<()> {
        self.post(Cow::Owned(format!("api/v1/builds/{id}/upload")))
            .json(&UploadResult { success })
            .send()
            .await?
            .error_for_status()?;

        Ok(())
    }
}
