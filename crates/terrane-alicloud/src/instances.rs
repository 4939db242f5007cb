//! Instance listing data source
//!
//! Read-only query over the account's KVStore instances. Status and type
//! filters are pushed down to the API; the name filter is a client-side
//! regex because the API only supports exact name matching.

use crate::client::{DEFAULT_PAGE_SIZE, DescribeInstancesRequest, KvStoreApi, KvStoreInstance};
use crate::error::{AlicloudError, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

const FINGERPRINT_LEN: usize = 16;

/// Filters for one listing query
#[derive(Debug, Clone, Default)]
pub struct InstanceQuery {
    /// Regex matched against instance names
    pub name_regex: Option<String>,

    /// Exact instance status, e.g. "Normal"
    pub status: Option<String>,

    /// "Redis" or "Memcache"
    pub instance_type: Option<String>,
}

/// Flat projection of one instance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstanceRecord {
    pub id: String,
    pub name: String,
    pub instance_class: String,
    pub instance_type: String,
    pub charge_type: String,
    pub region_id: String,
    pub availability_zone: String,
    pub vpc_id: String,
    pub vswitch_id: String,
    pub private_ip: String,
    pub connection_domain: String,
    pub port: i64,
    pub capacity: i64,
    pub bandwidth: i64,
    pub connections: i64,
    pub status: String,
    pub create_time: String,
    pub expire_time: String,
    pub username: String,
}

impl From<KvStoreInstance> for InstanceRecord {
    fn from(instance: KvStoreInstance) -> Self {
        Self {
            id: instance.instance_id,
            name: instance.instance_name,
            instance_class: instance.instance_class,
            instance_type: instance.instance_type,
            charge_type: instance.charge_type,
            region_id: instance.region_id,
            availability_zone: instance.zone_id,
            vpc_id: instance.vpc_id,
            vswitch_id: instance.vswitch_id,
            private_ip: instance.private_ip,
            connection_domain: instance.connection_domain,
            port: instance.port,
            capacity: instance.capacity,
            bandwidth: instance.bandwidth,
            connections: instance.connections,
            status: instance.instance_status,
            create_time: instance.create_time,
            expire_time: instance.end_time,
            username: instance.user_name,
        }
    }
}

/// Result of one listing query
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstanceListing {
    /// Deterministic fingerprint of the matched instance ids
    pub id: String,

    /// Records in API order
    pub instances: Vec<InstanceRecord>,
}

/// Paged instance lister over an injected API client
pub struct InstanceLister<C: KvStoreApi> {
    client: C,
    page_size: u32,
}

impl<C: KvStoreApi> InstanceLister<C> {
    pub fn new(client: C) -> Self {
        Self {
            client,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    /// Fetch every page and project the matching instances.
    pub async fn list(&self, query: &InstanceQuery) -> Result<InstanceListing> {
        let name_filter = match &query.name_regex {
            Some(pattern) => Some(Regex::new(pattern).map_err(|err| {
                AlicloudError::InvalidConfig(format!("invalid name_regex {pattern:?}: {err}"))
            })?),
            None => None,
        };

        let mut fetched = Vec::new();
        let mut page_number = 1;
        loop {
            let request = DescribeInstancesRequest {
                page_number,
                page_size: self.page_size,
                instance_type: query.instance_type.clone(),
                instance_status: query.status.clone(),
            };
            let page = self.client.describe_instances(&request).await?;
            let count = page.instances.kv_store_instance.len();
            fetched.extend(page.instances.kv_store_instance);
            tracing::debug!(
                "Fetched instance page {} ({} of {} total)",
                page_number,
                fetched.len(),
                page.total_count
            );

            if count < self.page_size as usize || fetched.len() as u64 >= u64::from(page.total_count)
            {
                break;
            }
            page_number += 1;
        }

        let instances: Vec<InstanceRecord> = fetched
            .into_iter()
            .filter(|instance| {
                name_filter
                    .as_ref()
                    .map_or(true, |regex| regex.is_match(&instance.instance_name))
            })
            .map(InstanceRecord::from)
            .collect();

        tracing::info!("Listed {} matching kvstore instances", instances.len());
        Ok(InstanceListing {
            id: fingerprint(&instances),
            instances,
        })
    }
}

/// Hash of the sorted matched ids, stable across page boundaries and
/// listing order.
fn fingerprint(instances: &[InstanceRecord]) -> String {
    let mut ids: Vec<&str> = instances.iter().map(|record| record.id.as_str()).collect();
    ids.sort_unstable();

    let mut hasher = Sha256::new();
    for id in ids {
        hasher.update(id.as_bytes());
        hasher.update(b"\n");
    }
    hex::encode(hasher.finalize())[..FINGERPRINT_LEN].to_string()
}
