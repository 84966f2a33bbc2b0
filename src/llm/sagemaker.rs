use super::InferenceEndpoint;
use crate::config::InferenceConfig;
use crate::error::{Result, ServiceError};
use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_sagemakerruntime::config::Credentials;
use aws_sdk_sagemakerruntime::primitives::Blob;
use aws_sdk_sagemakerruntime::Client;
use log::info;
use serde_json::Value;

/// Invokes a SageMaker real-time inference endpoint
pub struct SageMakerEndpoint {
    client: Client,
    endpoint_name: String,
}

impl SageMakerEndpoint {
    /// Builds an SDK client from the static credentials in `config`
    pub async fn new(config: &InferenceConfig) -> Self {
        let creds = &config.credentials;
        let credentials = Credentials::new(
            creds.access_key_id.clone(),
            creds.secret_access_key.clone(),
            Some(creds.session_token.clone()),
            None,
            "repodiagram-env",
        );

        let sdk_config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(creds.region.clone()))
            .credentials_provider(credentials)
            .load()
            .await;

        info!("SageMaker configured for endpoint: {}", config.endpoint_name);
        Self {
            client: Client::new(&sdk_config),
            endpoint_name: config.endpoint_name.clone(),
        }
    }
}

#[async_trait]
impl InferenceEndpoint for SageMakerEndpoint {
    async fn invoke(&self, payload: &Value) -> Result<Value> {
        let body = serde_json::to_vec(payload)?;

        let output = self
            .client
            .invoke_endpoint()
            .endpoint_name(&self.endpoint_name)
            .content_type("application/json")
            .body(Blob::new(body))
            .send()
            .await
            .map_err(|e| {
                ServiceError::Inference(aws_sdk_sagemakerruntime::error::DisplayErrorContext(e).to_string())
            })?;

        let bytes = output
            .body()
            .map(|blob| blob.as_ref().to_vec())
            .ok_or_else(|| ServiceError::Inference("endpoint returned an empty body".into()))?;

        Ok(serde_json::from_slice(&bytes)?)
    }
}
