use crate::models::{BuildQueueId, Builder, BuilderId};
use async_trait::async_trait;
use buildfarm_common::api::worker::{BuilderState, JobPayload, WorkerStatus};
use buildfarm_common::errors::*;
use buildfarm_common::http;
use buildfarm_common::ResetProtocol;
use std::time::Duration;

/// What's needed to talk to a builder, copied out of the store so no lock is
/// held while the request is in flight.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuilderHandle {
    pub id: BuilderId,
    pub name: String,
    pub url: String,
    pub reset_protocol: ResetProtocol,
}

impl From<&Builder> for BuilderHandle {
    fn from(builder: &Builder) -> BuilderHandle {
        BuilderHandle {
            id: builder.id,
            name: builder.name.clone(),
            url: builder.url.clone(),
            reset_protocol: builder.reset_protocol,
        }
    }
}

/// Control channel to the builders. These are the only calls in the
/// scheduler that block.
#[async_trait]
pub trait WorkerChannel: Send + Sync {
    async fn dispatch(&self, builder: &BuilderHandle, payload: &JobPayload) -> Result<()>;

    async fn poll_status(&self, builder: &BuilderHandle, queue_id: BuildQueueId)
        -> Result<WorkerStatus>;

    async fn abort(&self, builder: &BuilderHandle, queue_id: BuildQueueId) -> Result<()>;

    /// With protocol 1.1 this returns once the builder is clean again, with
    /// 2.0 it only confirms the builder started cleaning.
    async fn reset(&self, builder: &BuilderHandle) -> Result<()>;

    async fn status(&self, builder: &BuilderHandle) -> Result<BuilderState>;
}

/// Talks json over http to the builder's `url`.
pub struct HttpWorkerChannel {
    client: http::Client,
}

impl HttpWorkerChannel {
    pub fn new(timeout: Duration) -> Result<HttpWorkerChannel> {
        let client = http::client(timeout)?;
        Ok(HttpWorkerChannel { client })
    }

    fn url(builder: &BuilderHandle, path: &str) -> String {
        format!("{}/{}", builder.url.trim_end_matches('/'), path)
    }
}

#[async_trait]
impl WorkerChannel for HttpWorkerChannel {
    async fn dispatch(&self, builder: &BuilderHandle, payload: &JobPayload) -> Result<()> {
        self.client
            .post(Self::url(builder, "build"))
            .json(payload)
            .send()
            .await?
            .error_for_status()
            .with_context(|| anyhow!("Builder {:?} refused job", builder.name))?;
        Ok(())
    }

    async fn poll_status(
        &self,
        builder: &BuilderHandle,
        queue_id: BuildQueueId,
    ) -> Result<WorkerStatus> {
        let status = self
            .client
            .get(Self::url(builder, &format!("build/{}", queue_id.0)))
            .send()
            .await?
            .error_for_status()?
            .json::<WorkerStatus>()
            .await
            .with_context(|| anyhow!("Failed to parse status from {:?}", builder.name))?;
        Ok(status)
    }

    async fn abort(&self, builder: &BuilderHandle, queue_id: BuildQueueId) -> Result<()> {
        self.client
            .post(Self::url(builder, &format!("build/{}/abort", queue_id.0)))
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    async fn reset(&self, builder: &BuilderHandle) -> Result<()> {
        self.client
            .post(Self::url(builder, "reset"))
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    async fn status(&self, builder: &BuilderHandle) -> Result<BuilderState> {
        let state = self
            .client
            .get(Self::url(builder, "status"))
            .send()
            .await?
            .error_for_status()?
            .json::<BuilderState>()
            .await?;
        Ok(state)
    }
}
