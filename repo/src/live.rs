//! JSON-over-HTTP remote source.

use std::marker::PhantomData;

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::entity::Entity;
use crate::error::RepoError;
use crate::remote::RemoteSource;

/// LiveRemote talks to a REST-style collection endpoint.
///
/// Entities live at `{base_url}/{collection}/{id}`; batches are requested as
/// `{base_url}/{collection}?ids=a,b,c`. Authentication and retries belong to
/// the `reqwest::Client` handed to [`LiveRemote::with_client`].
pub struct LiveRemote<E> {
    client: Client,
    base_url: String,
    collection: String,
    _entity: PhantomData<fn() -> E>,
}

impl<E> LiveRemote<E> {
    pub fn new(base_url: &str, collection: &str) -> Self {
        Self::with_client(Client::new(), base_url, collection)
    }

    pub fn with_client(client: Client, base_url: &str, collection: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            collection: collection.trim_matches('/').to_string(),
            _entity: PhantomData,
        }
    }

    fn collection_url(&self) -> String {
        format!("{}/{}", self.base_url, self.collection)
    }

    fn entity_url(&self, id: &impl std::fmt::Display) -> String {
        format!("{}/{}/{}", self.base_url, self.collection, id)
    }
}

/// Maps a non-success status to a repository error.
async fn check_status(resp: Response, id: &str) -> Result<Response, RepoError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    if status == StatusCode::NOT_FOUND {
        return Err(RepoError::NotFound(id.to_string()));
    }
    let body = resp.text().await.unwrap_or_default();
    Err(RepoError::RemoteUnavailable(format!("HTTP {status}: {body}")))
}

async fn decode<T: DeserializeOwned>(resp: Response) -> Result<T, RepoError> {
    let bytes = resp.bytes().await?;
    serde_json::from_slice(&bytes).map_err(|e| RepoError::Decode(e.to_string()))
}

#[async_trait]
impl<E> RemoteSource<E> for LiveRemote<E>
where
    E: Entity + Serialize + DeserializeOwned,
{
    async fn fetch(&self, id: &E::Id) -> Result<E, RepoError> {
        let resp = self.client.get(self.entity_url(id)).send().await?;
        decode(check_status(resp, &id.to_string()).await?).await
    }

    async fn fetch_batch(&self, ids: &[E::Id]) -> Result<Vec<E>, RepoError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let joined = ids
            .iter()
            .map(|id| id.to_string())
            .collect::<Vec<_>>()
            .join(",");
        let resp = self
            .client
            .get(self.collection_url())
            .query(&[("ids", joined.as_str())])
            .send()
            .await?;
        decode(check_status(resp, &self.collection).await?).await
    }

    async fn create(&self, entity: E) -> Result<E, RepoError> {
        let resp = self
            .client
            .post(self.collection_url())
            .json(&entity)
            .send()
            .await?;
        decode(check_status(resp, &entity.id().to_string()).await?).await
    }

    async fn update(&self, entity: E) -> Result<E, RepoError> {
        let id = entity.id();
        let resp = self
            .client
            .put(self.entity_url(&id))
            .json(&entity)
            .send()
            .await?;
        decode(check_status(resp, &id.to_string()).await?).await
    }

    async fn delete(&self, id: &E::Id) -> Result<(), RepoError> {
        let resp = self.client.delete(self.entity_url(id)).send().await?;
        check_status(resp, &id.to_string()).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{Post, PostId};

    #[test]
    fn test_urls() {
        let remote = LiveRemote::<Post>::new("https://api.example.com/v1/", "/posts/");
        assert_eq!(remote.collection_url(), "https://api.example.com/v1/posts");
        assert_eq!(
            remote.entity_url(&PostId::from("p1")),
            "https://api.example.com/v1/posts/p1"
        );
    }

    #[tokio::test]
    async fn test_unreachable_host_is_remote_unavailable() {
        // Port 9 (discard) on localhost is not expected to serve HTTP.
        let remote = LiveRemote::<Post>::new("http://127.0.0.1:9", "posts");
        let err = remote.fetch(&PostId::from("p1")).await.unwrap_err();
        assert!(matches!(err, RepoError::RemoteUnavailable(_)), "got {err:?}");
    }
}
