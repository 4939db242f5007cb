//! KVStore OpenAPI client
//!
//! RPC-style client for the ApsaraDB for Redis ("r-kvstore") endpoint.
//! Operations are POST requests carrying their parameters in the query
//! string, authenticated with an ACS3-HMAC-SHA256 signature. Resources
//! depend on the [`KvStoreApi`] trait rather than this client directly.

use crate::config::AlicloudConfig;
use crate::error::{AlicloudError, Result};
use crate::sign::{Signer, canonical_query_string, sha256_hex};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

const API_VERSION: &str = "2015-01-01";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Default page size for paged listings.
pub const DEFAULT_PAGE_SIZE: u32 = 50;

/// How `ModifySecurityIps` combines the submitted list with the
/// group's current membership.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModifyMode {
    /// Replace the whole membership
    Cover,
    /// Add to the membership
    Append,
    /// Remove from the membership
    Delete,
}

impl ModifyMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModifyMode::Cover => "Cover",
            ModifyMode::Append => "Append",
            ModifyMode::Delete => "Delete",
        }
    }
}

impl fmt::Display for ModifyMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Parameters for one `ModifySecurityIps` call
#[derive(Debug, Clone)]
pub struct ModifySecurityIpsRequest {
    pub instance_id: String,
    pub group_name: String,
    /// Comma-joined IP/CIDR list, never empty
    pub security_ips: String,
    pub modify_mode: ModifyMode,
}

/// Parameters for one `DescribeInstances` page
#[derive(Debug, Clone)]
pub struct DescribeInstancesRequest {
    /// 1-based page number
    pub page_number: u32,
    pub page_size: u32,
    pub instance_type: Option<String>,
    pub instance_status: Option<String>,
}

impl Default for DescribeInstancesRequest {
    fn default() -> Self {
        Self {
            page_number: 1,
            page_size: DEFAULT_PAGE_SIZE,
            instance_type: None,
            instance_status: None,
        }
    }
}

/// One whitelist group as reported by `DescribeSecurityIps`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityIpGroup {
    #[serde(rename = "SecurityIpGroupName")]
    pub group_name: String,

    #[serde(rename = "SecurityIpGroupAttribute", default)]
    pub attribute: String,

    /// Comma-joined membership
    #[serde(rename = "SecurityIpList", default)]
    pub ip_list: String,
}

#[derive(Debug, Default, Deserialize)]
struct DescribeSecurityIpsResponse {
    #[serde(rename = "SecurityIpGroups", default)]
    security_ip_groups: SecurityIpGroupList,
}

#[derive(Debug, Default, Deserialize)]
struct SecurityIpGroupList {
    #[serde(rename = "SecurityIpGroup", default)]
    security_ip_group: Vec<SecurityIpGroup>,
}

#[derive(Debug, Deserialize)]
struct ModifySecurityIpsResponse {
    #[serde(rename = "RequestId", default)]
    #[allow(dead_code)]
    request_id: String,
}

/// One page of `DescribeInstances` results
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct InstancePage {
    #[serde(default)]
    pub page_number: u32,

    #[serde(default)]
    pub page_size: u32,

    #[serde(default)]
    pub total_count: u32,

    #[serde(default)]
    pub instances: InstanceList,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InstanceList {
    #[serde(rename = "KVStoreInstance", default)]
    pub kv_store_instance: Vec<KvStoreInstance>,
}

/// One managed store instance as reported by `DescribeInstances`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct KvStoreInstance {
    pub instance_id: String,

    #[serde(default)]
    pub instance_name: String,

    #[serde(default)]
    pub instance_class: String,

    /// "Redis" or "Memcache"
    #[serde(default)]
    pub instance_type: String,

    /// "PostPaid" or "PrePaid"
    #[serde(default)]
    pub charge_type: String,

    #[serde(default)]
    pub region_id: String,

    #[serde(default)]
    pub zone_id: String,

    #[serde(default)]
    pub instance_status: String,

    #[serde(default)]
    pub vpc_id: String,

    #[serde(rename = "VSwitchId", default)]
    pub vswitch_id: String,

    #[serde(default)]
    pub private_ip: String,

    #[serde(default)]
    pub connection_domain: String,

    #[serde(default)]
    pub port: i64,

    /// Memory capacity in MB
    #[serde(default)]
    pub capacity: i64,

    #[serde(default)]
    pub bandwidth: i64,

    #[serde(default)]
    pub connections: i64,

    #[serde(default)]
    pub create_time: String,

    #[serde(default)]
    pub end_time: String,

    #[serde(default)]
    pub user_name: String,
}

#[derive(Debug, Default, Deserialize)]
struct ApiErrorBody {
    #[serde(rename = "Code", default)]
    code: String,

    #[serde(rename = "Message", default)]
    message: String,

    #[serde(rename = "RequestId", default)]
    request_id: String,
}

/// Operations the provider needs from the KVStore control plane.
#[async_trait]
pub trait KvStoreApi: Send + Sync {
    /// Fetch one page of instances.
    async fn describe_instances(&self, request: &DescribeInstancesRequest) -> Result<InstancePage>;

    /// List all whitelist groups of one instance.
    async fn describe_security_ips(&self, instance_id: &str) -> Result<Vec<SecurityIpGroup>>;

    /// Write one whitelist group's membership.
    async fn modify_security_ips(&self, request: &ModifySecurityIpsRequest) -> Result<()>;
}

/// Signed reqwest client for the public r-kvstore endpoint
pub struct RKvStoreClient {
    http: reqwest::Client,
    signer: Signer,
    endpoint: String,
    host: String,
    region_id: String,
}

impl RKvStoreClient {
    pub fn new(config: AlicloudConfig) -> Result<Self> {
        config.validate()?;

        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        let endpoint = config.endpoint.trim_end_matches('/').to_string();
        let host = endpoint
            .trim_start_matches("https://")
            .trim_start_matches("http://")
            .to_string();

        Ok(Self {
            http,
            signer: Signer::new(&config.access_key_id, &config.access_key_secret),
            endpoint,
            host,
            region_id: config.region_id,
        })
    }

    /// Build a client from `ALICLOUD_*` environment variables.
    pub fn from_env() -> Result<Self> {
        Self::new(AlicloudConfig::from_env()?)
    }

    fn base_query(&self) -> Vec<(String, String)> {
        vec![("RegionId".to_string(), self.region_id.clone())]
    }

    async fn call<T: serde::de::DeserializeOwned>(
        &self,
        action: &str,
        query: &[(String, String)],
    ) -> Result<T> {
        let date = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string();
        let nonce = uuid::Uuid::new_v4().to_string();
        let payload_hash = sha256_hex(b"");

        let headers = vec![
            ("host".to_string(), self.host.clone()),
            ("x-acs-action".to_string(), action.to_string()),
            ("x-acs-version".to_string(), API_VERSION.to_string()),
            ("x-acs-date".to_string(), date),
            ("x-acs-signature-nonce".to_string(), nonce),
            ("x-acs-content-sha256".to_string(), payload_hash.clone()),
        ];
        let authorization = self
            .signer
            .authorization("POST", "/", query, &headers, &payload_hash);

        let url = format!("{}/?{}", self.endpoint, canonical_query_string(query));
        tracing::debug!("Calling {} on {}", action, self.host);

        let mut builder = self.http.post(&url);
        for (name, value) in &headers {
            // reqwest derives Host from the URL
            if name.as_str() != "host" {
                builder = builder.header(name.as_str(), value.as_str());
            }
        }

        let response = builder
            .header("Authorization", authorization)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(parse_api_error(status.as_u16(), &body));
        }

        Ok(serde_json::from_str(&body)?)
    }
}

/// Map a non-success response to the typed API error when the body has
/// the standard `{Code, Message, RequestId}` shape.
fn parse_api_error(status: u16, body: &str) -> AlicloudError {
    match serde_json::from_str::<ApiErrorBody>(body) {
        Ok(parsed) if !parsed.code.is_empty() => AlicloudError::Api {
            code: parsed.code,
            message: parsed.message,
            request_id: parsed.request_id,
        },
        _ => AlicloudError::Status {
            status,
            body: body.chars().take(200).collect(),
        },
    }
}

#[async_trait]
impl KvStoreApi for RKvStoreClient {
    async fn describe_instances(&self, request: &DescribeInstancesRequest) -> Result<InstancePage> {
        let mut query = self.base_query();
        query.push(("PageNumber".to_string(), request.page_number.to_string()));
        query.push(("PageSize".to_string(), request.page_size.to_string()));
        if let Some(instance_type) = &request.instance_type {
            query.push(("InstanceType".to_string(), instance_type.clone()));
        }
        if let Some(instance_status) = &request.instance_status {
            query.push(("InstanceStatus".to_string(), instance_status.clone()));
        }

        self.call("DescribeInstances", &query).await
    }

    async fn describe_security_ips(&self, instance_id: &str) -> Result<Vec<SecurityIpGroup>> {
        let mut query = self.base_query();
        query.push(("InstanceId".to_string(), instance_id.to_string()));

        let response: DescribeSecurityIpsResponse =
            self.call("DescribeSecurityIps", &query).await?;
        Ok(response.security_ip_groups.security_ip_group)
    }

    async fn modify_security_ips(&self, request: &ModifySecurityIpsRequest) -> Result<()> {
        let mut query = self.base_query();
        query.push(("InstanceId".to_string(), request.instance_id.clone()));
        query.push(("SecurityIpGroupName".to_string(), request.group_name.clone()));
        query.push(("SecurityIps".to_string(), request.security_ips.clone()));
        query.push(("ModifyMode".to_string(), request.modify_mode.as_str().to_string()));

        let _: ModifySecurityIpsResponse = self.call("ModifySecurityIps", &query).await?;
        tracing::debug!(
            "Modified security ips of group {} on {} ({} mode)",
            request.group_name,
            request.instance_id,
            request.modify_mode
        );
        Ok(())
    }
}
