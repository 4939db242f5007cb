//! Provider configuration
//!
//! Credentials and connection settings for the Alibaba Cloud KVStore API,
//! resolved from the environment the same way the official CLI reads them.

use crate::error::{AlicloudError, Result};

const DEFAULT_ENDPOINT: &str = "https://r-kvstore.aliyuncs.com";
const DEFAULT_REGION: &str = "cn-hangzhou";

/// Configuration for the KVStore client
#[derive(Debug, Clone)]
pub struct AlicloudConfig {
    pub access_key_id: String,
    pub access_key_secret: String,
    pub region_id: String,
    pub endpoint: String,
}

impl AlicloudConfig {
    /// Create a config from environment variables.
    ///
    /// `ALICLOUD_ACCESS_KEY` and `ALICLOUD_SECRET_KEY` are required.
    /// `ALICLOUD_REGION` and `ALICLOUD_KVSTORE_ENDPOINT` fall back to the
    /// public defaults when unset.
    pub fn from_env() -> Result<Self> {
        let access_key_id = std::env::var("ALICLOUD_ACCESS_KEY")
            .map_err(|_| AlicloudError::MissingEnvVar("ALICLOUD_ACCESS_KEY".to_string()))?;
        let access_key_secret = std::env::var("ALICLOUD_SECRET_KEY")
            .map_err(|_| AlicloudError::MissingEnvVar("ALICLOUD_SECRET_KEY".to_string()))?;
        let region_id =
            std::env::var("ALICLOUD_REGION").unwrap_or_else(|_| DEFAULT_REGION.to_string());
        let endpoint = std::env::var("ALICLOUD_KVSTORE_ENDPOINT")
            .unwrap_or_else(|_| DEFAULT_ENDPOINT.to_string());

        let config = Self {
            access_key_id,
            access_key_secret,
            region_id,
            endpoint,
        };
        config.validate()?;
        Ok(config)
    }

    /// Create a config with explicit credentials and the default endpoint.
    pub fn new(
        access_key_id: impl Into<String>,
        access_key_secret: impl Into<String>,
        region_id: impl Into<String>,
    ) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            access_key_secret: access_key_secret.into(),
            region_id: region_id.into(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
        }
    }

    /// Override the API endpoint, e.g. for a regional VPC domain.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.access_key_id.trim().is_empty() {
            return Err(AlicloudError::InvalidConfig(
                "access key id must not be empty".to_string(),
            ));
        }
        if self.access_key_secret.trim().is_empty() {
            return Err(AlicloudError::InvalidConfig(
                "access key secret must not be empty".to_string(),
            ));
        }
        if self.region_id.trim().is_empty() {
            return Err(AlicloudError::InvalidConfig(
                "region id must not be empty".to_string(),
            ));
        }
        if !self.endpoint.starts_with("http://") && !self.endpoint.starts_with("https://") {
            return Err(AlicloudError::InvalidConfig(format!(
                "endpoint must be an http(s) URL, got: {}",
                self.endpoint
            )));
        }
        Ok(())
    }
}
