//! S3 implementation of [`ObjectStore`].

use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region, SdkConfig};
use aws_credential_types::provider::ProvideCredentials;
use aws_sdk_s3::config::Credentials;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use std::path::Path;
use tracing::{debug, info};

use super::{CredentialStrategy, ObjectStore};
use crate::config::StorageConfig;
use crate::error::{BackfillError, BackfillResult};

const SESSION_NAME_PREFIX: &str = "historical-backfill";

/// Uploads through aws-sdk-s3, resolving credentials on every upload.
///
/// Assumed-role sessions are re-created per upload so that a backfill
/// running longer than the session lifetime keeps working.
#[derive(Debug, Clone)]
pub struct S3ObjectStore {
    base: SdkConfig,
    strategy: CredentialStrategy,
    endpoint_url: Option<String>,
    session_name: String,
}

impl S3ObjectStore {
    /// Load the ambient AWS configuration (region, default chain) and bind
    /// the configured credential strategy to it.
    pub async fn from_config(storage: &StorageConfig, run_id: uuid::Uuid) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let Some(region) = &storage.region {
            loader = loader.region(Region::new(region.clone()));
        }
        let base = loader.load().await;

        info!(
            credentials = %storage.credentials.describe(),
            region = ?base.region().map(|r| r.to_string()),
            endpoint_url = ?storage.endpoint_url,
            "S3 object store configured"
        );

        Self {
            base,
            strategy: storage.credentials.clone(),
            endpoint_url: storage.endpoint_url.clone(),
            session_name: format!("{SESSION_NAME_PREFIX}-{}", run_id.simple()),
        }
    }

    async fn client(&self) -> BackfillResult<Client> {
        let credentials = match &self.strategy {
            CredentialStrategy::AssumeRole { role_arn } => Some(self.assume_role(role_arn).await?),
            CredentialStrategy::StaticKeys {
                access_key_id,
                secret_access_key,
            } => Some(Credentials::new(
                access_key_id.clone(),
                secret_access_key.clone(),
                None,
                None,
                "backfill-static-keys",
            )),
            CredentialStrategy::Ambient => {
                self.check_ambient_identity().await?;
                None
            }
        };

        let mut builder = aws_sdk_s3::config::Builder::from(&self.base);
        if let Some(credentials) = credentials {
            builder = builder.credentials_provider(credentials);
        }
        if let Some(endpoint_url) = &self.endpoint_url {
            builder = builder.endpoint_url(endpoint_url.clone()).force_path_style(true);
        }
        Ok(Client::from_conf(builder.build()))
    }

    async fn assume_role(&self, role_arn: &str) -> BackfillResult<Credentials> {
        let sts = aws_sdk_sts::Client::new(&self.base);
        let output = sts
            .assume_role()
            .role_arn(role_arn)
            .role_session_name(&self.session_name)
            .send()
            .await
            .map_err(|e| {
                BackfillError::CredentialError(format!(
                    "failed to assume role {role_arn}: {}",
                    DisplayErrorContext(&e)
                ))
            })?;

        let session = output.credentials().ok_or_else(|| {
            BackfillError::CredentialError(format!("assume role {role_arn} returned no credentials"))
        })?;

        debug!(role_arn = %role_arn, session_name = %self.session_name, "Assumed upload role");

        Ok(Credentials::new(
            session.access_key_id(),
            session.secret_access_key(),
            Some(session.session_token().to_string()),
            None,
            "backfill-assumed-role",
        ))
    }

    async fn check_ambient_identity(&self) -> BackfillResult<()> {
        let provider = self.base.credentials_provider().ok_or_else(|| {
            BackfillError::CredentialError(
                "no AWS credentials configured; provide an IAM role or an access key pair"
                    .to_string(),
            )
        })?;
        provider.provide_credentials().await.map_err(|e| {
            BackfillError::CredentialError(format!(
                "AWS credentials not found; provide valid credentials or use an IAM role: {e}"
            ))
        })?;
        Ok(())
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn put_object(&self, bucket: &str, key: &str, local_path: &Path) -> BackfillResult<()> {
        let client = self.client().await?;
        let body = ByteStream::from_path(local_path)
            .await
            .map_err(|e| BackfillError::publish(bucket, key, e))?;

        client
            .put_object()
            .bucket(bucket)
            .key(key)
            .content_type("text/csv")
            .body(body)
            .send()
            .await
            .map_err(|e| BackfillError::publish(bucket, key, DisplayErrorContext(&e)))?;
        Ok(())
    }
}
