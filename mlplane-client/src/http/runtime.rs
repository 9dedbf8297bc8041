//! Inference runtime over HTTP

use async_trait::async_trait;
use reqwest::header::{ACCEPT, CONTENT_TYPE};

use super::PlatformClient;
use crate::error::Result;
use crate::session::{InferenceRuntime, InvokeRequest, InvokeResponse};

#[async_trait]
impl InferenceRuntime for PlatformClient {
    async fn invoke_endpoint(&self, req: &InvokeRequest) -> Result<InvokeResponse> {
        let url = format!(
            "{}/endpoints/{}/invocations",
            self.runtime_url, req.endpoint_name
        );

        let mut request = self.client.post(&url).body(req.body.clone());
        if let Some(content_type) = &req.content_type {
            request = request.header(CONTENT_TYPE, content_type);
        }
        if let Some(accept) = &req.accept {
            request = request.header(ACCEPT, accept);
        }

        let response = self.check_status(request.send().await?).await?;
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        Ok(InvokeResponse {
            body: response.bytes().await?.to_vec(),
            content_type,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClientConfig;
    use httpmock::prelude::*;

    #[tokio::test]
    async fn test_invoke_sends_content_headers() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/endpoints/ep/invocations")
                .header("content-type", "text/csv")
                .header("accept", "application/json")
                .body("1,2,3");
            then.status(200)
                .header("content-type", "application/json")
                .body("[0.5]");
        });

        let client =
            PlatformClient::new(&ClientConfig::new(server.base_url(), "us-west-2")).unwrap();
        let response = client
            .invoke_endpoint(&InvokeRequest {
                endpoint_name: "ep".to_string(),
                body: b"1,2,3".to_vec(),
                content_type: Some("text/csv".to_string()),
                accept: Some("application/json".to_string()),
            })
            .await
            .unwrap();

        mock.assert();
        assert_eq!(response.body, b"[0.5]");
        assert_eq!(response.content_type.as_deref(), Some("application/json"));
    }
}
