//! Alibaba Cloud KVStore provider for Terrane
//!
//! This crate implements the ManagedResource trait for ApsaraDB for Redis
//! ("r-kvstore"), covering whitelist management and instance discovery.
//!
//! # Features
//!
//! - Security IP whitelist groups (create, read, update, reset, import)
//! - Instance listing with regex, status and type filters
//! - Signed API access (ACS3-HMAC-SHA256) via an injectable client trait
//!
//! # Requirements
//!
//! - `ALICLOUD_ACCESS_KEY` and `ALICLOUD_SECRET_KEY` env vars
//! - Optional: `ALICLOUD_REGION`, `ALICLOUD_KVSTORE_ENDPOINT`
//!
//! # Example
//!
//! ```ignore
//! use terrane_alicloud::{RKvStoreClient, SecurityIpGroupConfig, SecurityIpGroupResource};
//! use terrane_provider::ManagedResource;
//!
//! let client = RKvStoreClient::from_env()?;
//! let resource = SecurityIpGroupResource::new(client);
//!
//! let config = SecurityIpGroupConfig::new("r-abc123", "default", ["10.0.0.1"])?;
//! let observed = resource.create(&config).await?;
//! println!("created {}", observed.id);
//! ```
//!
//! # Instance discovery
//!
//! ```ignore
//! use terrane_alicloud::{InstanceLister, InstanceQuery, RKvStoreClient};
//!
//! let lister = InstanceLister::new(RKvStoreClient::from_env()?);
//! let listing = lister
//!     .list(&InstanceQuery {
//!         name_regex: Some("^cache-".to_string()),
//!         ..InstanceQuery::default()
//!     })
//!     .await?;
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod instances;
pub mod security_ip_group;
pub mod sign;

pub use client::{
    DescribeInstancesRequest, InstancePage, KvStoreApi, KvStoreInstance, ModifyMode,
    ModifySecurityIpsRequest, RKvStoreClient, SecurityIpGroup,
};
pub use config::AlicloudConfig;
pub use error::{AlicloudError, Result};
pub use instances::{InstanceLister, InstanceListing, InstanceQuery, InstanceRecord};
pub use security_ip_group::{
    IP_LIST_SEPARATOR, LOOPBACK_SENTINEL, SecurityIpGroupConfig, SecurityIpGroupId,
    SecurityIpGroupResource, SecurityIpGroupState,
};
