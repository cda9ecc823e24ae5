use super::PushAgent;
use crate::{
    collaborator::ServerCollaborator,
    error::PushError,
    platform::{AgentHost, FetchRequest, FetchResponse},
};

impl<H, S> PushAgent<H, S>
where
    H: AgentHost,
    S: ServerCollaborator,
{
    /// Seeds the current cache generation, then activates without waiting for
    /// old pages to close.
    pub(crate) async fn install(&self) -> Result<(), PushError> {
        let cache = &self.config.cache_name;
        tracing::info!(%cache, assets = self.config.precache.len(), "agent installing");

        self.host
            .add_all(cache, &self.config.precache)
            .await
            .map_err(|source| PushError::CacheSeedFailed {
                cache: cache.clone(),
                source,
            })?;

        self.host.skip_waiting().await?;
        Ok(())
    }

    /// Drops every cache generation but the current one and takes control of
    /// open pages.
    pub(crate) async fn activate(&self) -> Result<(), PushError> {
        let current = &self.config.cache_name;
        tracing::info!(%current, "agent activating");

        for name in self.host.cache_names().await? {
            if &name != current {
                tracing::debug!(cache = %name, "deleting stale cache");
                self.host.delete_cache(&name).await?;
            }
        }

        self.host.claim().await?;
        Ok(())
    }

    /// Network pass-through; nothing is served from cache.
    pub(crate) async fn fetch(&self, request: FetchRequest) -> Result<FetchResponse, PushError> {
        tracing::trace!(method = %request.method, url = %request.url, "fetch");
        Ok(self.host.fetch(request).await?)
    }
}
