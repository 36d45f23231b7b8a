use async_trait::async_trait;
use devis_core::{
    HistoryEntry, PersistedProposal, ProposalId, ProposalPayload, ProposalStore, StoreError,
};

use crate::response::{check_status, from_reqwest, parse_response};

/// Client for the `/proposals/` REST resource.
#[derive(Debug, Clone)]
pub struct HttpProposalStore {
    pub(crate) client: reqwest::Client,
    base_url: String,
}

impl HttpProposalStore {
    /// `base_url` is the API root, e.g. `http://localhost:8000/api/`.
    pub fn new(base_url: &str) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    /// Reuses an existing [`reqwest::Client`] for connection pooling.
    pub fn with_client(
        client: reqwest::Client,
        base_url: &str,
    ) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub(crate) fn collection_url(&self) -> String {
        format!("{}/proposals/", self.base_url)
    }

    pub(crate) fn item_url(
        &self,
        id: ProposalId,
    ) -> String {
        format!("{}/proposals/{}/", self.base_url, id)
    }

    pub(crate) fn action_url(
        &self,
        id: ProposalId,
        action: &str,
    ) -> String {
        format!("{}/proposals/{}/{}/", self.base_url, id, action)
    }
}

#[async_trait]
impl ProposalStore for HttpProposalStore {
    async fn list(&self) -> Result<Vec<PersistedProposal>, StoreError> {
        let url = self.collection_url();
        tracing::debug!(%url, "listing proposals");
        let response = self.client.get(&url).send().await.map_err(from_reqwest)?;
        let proposals: Vec<PersistedProposal> = parse_response(response).await?;
        tracing::info!(count = proposals.len(), "fetched proposals");
        Ok(proposals)
    }

    async fn get(
        &self,
        id: ProposalId,
    ) -> Result<PersistedProposal, StoreError> {
        let url = self.item_url(id);
        tracing::debug!(%url, "fetching proposal");
        let response = self.client.get(&url).send().await.map_err(from_reqwest)?;
        parse_response(response).await
    }

    async fn create(
        &self,
        payload: &ProposalPayload,
    ) -> Result<PersistedProposal, StoreError> {
        let url = self.collection_url();
        tracing::debug!(%url, opportunity = %payload.opportunity_number, "creating proposal");
        let response = self
            .client
            .post(&url)
            .json(payload)
            .send()
            .await
            .map_err(from_reqwest)?;
        let record: PersistedProposal = parse_response(response).await?;
        tracing::info!(id = record.id, "proposal created");
        Ok(record)
    }

    async fn update(
        &self,
        id: ProposalId,
        payload: &ProposalPayload,
    ) -> Result<PersistedProposal, StoreError> {
        let url = self.item_url(id);
        tracing::debug!(%url, "updating proposal");
        let response = self
            .client
            .put(&url)
            .json(payload)
            .send()
            .await
            .map_err(from_reqwest)?;
        let record: PersistedProposal = parse_response(response).await?;
        tracing::info!(id = record.id, "proposal updated");
        Ok(record)
    }

    async fn delete(
        &self,
        id: ProposalId,
    ) -> Result<(), StoreError> {
        let url = self.item_url(id);
        tracing::debug!(%url, "deleting proposal");
        let response = self.client.delete(&url).send().await.map_err(from_reqwest)?;
        check_status(response).await?;
        tracing::info!(id, "proposal deleted");
        Ok(())
    }

    async fn history(
        &self,
        id: ProposalId,
    ) -> Result<Vec<HistoryEntry>, StoreError> {
        let url = self.action_url(id, "history");
        tracing::debug!(%url, "fetching proposal history");
        let response = self.client.get(&url).send().await.map_err(from_reqwest)?;
        parse_response(response).await
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn urls_follow_the_rest_layout() {
        let store = HttpProposalStore::new("http://localhost:8000/api/");

        assert_eq!(store.collection_url(), "http://localhost:8000/api/proposals/");
        assert_eq!(store.item_url(42), "http://localhost:8000/api/proposals/42/");
        assert_eq!(
            store.action_url(42, "generate-document"),
            "http://localhost:8000/api/proposals/42/generate-document/"
        );
    }

    #[test]
    fn base_url_without_trailing_slash_is_accepted() {
        let store = HttpProposalStore::new("https://devis.example.com/api");

        assert_eq!(store.item_url(1), "https://devis.example.com/api/proposals/1/");
    }

    #[tokio::test]
    async fn unreachable_server_is_a_connection_error() {
        let store = HttpProposalStore::new("http://127.0.0.1:9/api/");

        let result = store.list().await;

        assert!(matches!(result, Err(StoreError::Connection(_))));
    }
}
