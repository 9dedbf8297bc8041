//! Blob storage over HTTP (path-style addressing)

use async_trait::async_trait;
use tracing::debug;

use super::PlatformClient;
use crate::error::Result;
use crate::s3::S3Uri;
use crate::session::BlobStore;

impl PlatformClient {
    fn object_url(&self, uri: &S3Uri) -> String {
        format!("{}/{}/{}", self.storage_url, uri.bucket, uri.key)
    }
}

#[async_trait]
impl BlobStore for PlatformClient {
    async fn put_object(&self, uri: &S3Uri, body: Vec<u8>) -> Result<()> {
        let url = self.object_url(uri);
        debug!(%uri, bytes = body.len(), "Putting object");
        let response = self.client.put(&url).body(body).send().await?;

        self.check_status(response).await?;
        Ok(())
    }

    async fn get_object(&self, uri: &S3Uri) -> Result<Vec<u8>> {
        let url = self.object_url(uri);
        let this = self;

        self.retry
            .run("GetObject", move || {
                let url = url.clone();
                async move {
                    let response = this.client.get(&url).send().await?;
                    let response = this.check_status(response).await?;
                    Ok(response.bytes().await?.to_vec())
                }
            })
            .await
    }
}
