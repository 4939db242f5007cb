//! Security IP whitelist group resource
//!
//! Manages one named IP whitelist attached to a KVStore instance. The
//! backend has no dedicated object for a whitelist group: `ModifySecurityIps`
//! both creates and updates, and "deleting" means clearing the membership,
//! after which the backend falls back to the loopback sentinel. Identity is
//! synthesized as `<instance_id>:<group_name>` because the API never issues
//! one.

use crate::client::{KvStoreApi, ModifyMode, ModifySecurityIpsRequest};
use crate::error::{AlicloudError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use terrane_provider::{CompositeId, IdentityError, ManagedResource, Observed, RetryPolicy};

/// Address written upstream whenever the desired whitelist is empty.
/// An empty `SecurityIps` value is not accepted by the API.
pub const LOOPBACK_SENTINEL: &str = "127.0.0.1";

/// Wire separator for IP list values.
pub const IP_LIST_SEPARATOR: &str = ",";

pub const RESOURCE_TYPE: &str = "kvstore-security-ip-group";

/// Desired shape of one whitelist group
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityIpGroupConfig {
    /// Parent instance, immutable after creation
    pub instance_id: String,

    /// Whitelist group name, mutable
    pub group_name: String,

    /// Permitted IPs/CIDR blocks; empty means "loopback only"
    pub security_ips: BTreeSet<String>,
}

impl SecurityIpGroupConfig {
    /// Validate and build a config.
    ///
    /// `instance_id` and `group_name` must be usable as identity components,
    /// and every entry of `security_ips` must be a single non-empty token
    /// without the list separator.
    pub fn new(
        instance_id: impl Into<String>,
        group_name: impl Into<String>,
        security_ips: impl IntoIterator<Item = impl Into<String>>,
    ) -> Result<Self> {
        let instance_id = instance_id.into();
        let group_name = group_name.into();

        // Rejects empty or separator-carrying components before any call
        // can bake them into an identity.
        SecurityIpGroupId::new(&instance_id, &group_name)?;

        let mut ips = BTreeSet::new();
        for entry in security_ips {
            let entry = entry.into();
            let trimmed = entry.trim();
            if trimmed.is_empty() {
                return Err(AlicloudError::InvalidConfig(
                    "security ip entries must not be empty".to_string(),
                ));
            }
            if trimmed.contains(IP_LIST_SEPARATOR) || trimmed.contains(char::is_whitespace) {
                return Err(AlicloudError::InvalidConfig(format!(
                    "security ip entry {trimmed:?} must be a single address or CIDR block"
                )));
            }
            ips.insert(trimmed.to_string());
        }

        Ok(Self {
            instance_id,
            group_name,
            security_ips: ips,
        })
    }
}

/// Observed shape of one whitelist group
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityIpGroupState {
    pub instance_id: String,
    pub group_name: String,
    pub security_ips: BTreeSet<String>,
}

/// Identity of one whitelist group: `<instance_id>:<group_name>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecurityIpGroupId(CompositeId);

impl SecurityIpGroupId {
    pub fn new(instance_id: &str, group_name: &str) -> std::result::Result<Self, IdentityError> {
        Ok(Self(CompositeId::new(instance_id, group_name)?))
    }

    pub fn instance_id(&self) -> &str {
        self.0.parent()
    }

    pub fn group_name(&self) -> &str {
        self.0.name()
    }
}

impl fmt::Display for SecurityIpGroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl FromStr for SecurityIpGroupId {
    type Err = IdentityError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(s.parse()?))
    }
}

/// Comma-joined wire value, with the sentinel substituted for empty sets.
fn effective_ip_list(ips: &BTreeSet<String>) -> String {
    if ips.is_empty() {
        LOOPBACK_SENTINEL.to_string()
    } else {
        ips.iter().cloned().collect::<Vec<_>>().join(IP_LIST_SEPARATOR)
    }
}

/// The membership a write with this desired set converges on.
fn effective_ip_set(ips: &BTreeSet<String>) -> BTreeSet<String> {
    if ips.is_empty() {
        BTreeSet::from([LOOPBACK_SENTINEL.to_string()])
    } else {
        ips.clone()
    }
}

/// Parse a `SecurityIpList` wire value.
fn split_ip_list(list: &str) -> BTreeSet<String> {
    list.split(IP_LIST_SEPARATOR)
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(str::to_string)
        .collect()
}

/// Whitelist group resource over an injected API client
pub struct SecurityIpGroupResource<C: KvStoreApi> {
    client: C,
    retry: RetryPolicy,
}

impl<C: KvStoreApi> SecurityIpGroupResource<C> {
    pub fn new(client: C) -> Self {
        Self {
            client,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Issue one membership write under the retry policy.
    async fn write_group(
        &self,
        instance_id: &str,
        group_name: &str,
        security_ips: &BTreeSet<String>,
        modify_mode: ModifyMode,
    ) -> Result<()> {
        let request = ModifySecurityIpsRequest {
            instance_id: instance_id.to_string(),
            group_name: group_name.to_string(),
            security_ips: effective_ip_list(security_ips),
            modify_mode,
        };

        self.retry
            .run(AlicloudError::is_retryable, || {
                self.client.modify_security_ips(&request)
            })
            .await
            .map_err(AlicloudError::from)
    }

    /// Fetch the group's observed state by identity.
    async fn fetch(
        &self,
        id: &SecurityIpGroupId,
    ) -> Result<Option<Observed<SecurityIpGroupId, SecurityIpGroupState>>> {
        let groups = match self.client.describe_security_ips(id.instance_id()).await {
            Ok(groups) => groups,
            Err(err) if err.is_instance_not_found() => {
                tracing::debug!(
                    "Instance {} is gone, treating group {} as deleted",
                    id.instance_id(),
                    id.group_name()
                );
                return Ok(None);
            }
            Err(err) => return Err(err),
        };

        Ok(groups
            .into_iter()
            .find(|group| group.group_name == id.group_name())
            .map(|group| Observed {
                id: id.clone(),
                state: SecurityIpGroupState {
                    instance_id: id.instance_id().to_string(),
                    group_name: group.group_name,
                    security_ips: split_ip_list(&group.ip_list),
                },
            }))
    }
}

#[async_trait::async_trait]
impl<C: KvStoreApi> ManagedResource for SecurityIpGroupResource<C> {
    type Config = SecurityIpGroupConfig;
    type State = SecurityIpGroupState;
    type Id = SecurityIpGroupId;
    type Error = AlicloudError;

    fn resource_type(&self) -> &'static str {
        RESOURCE_TYPE
    }

    fn matches(&self, config: &Self::Config, state: &Self::State) -> bool {
        config.group_name == state.group_name
            && effective_ip_set(&config.security_ips) == state.security_ips
    }

    fn requires_replacement(&self, config: &Self::Config, state: &Self::State) -> bool {
        config.instance_id != state.instance_id
    }

    async fn create(
        &self,
        config: &Self::Config,
    ) -> Result<Observed<Self::Id, Self::State>> {
        self.write_group(
            &config.instance_id,
            &config.group_name,
            &config.security_ips,
            ModifyMode::Cover,
        )
        .await?;

        let id = SecurityIpGroupId::new(&config.instance_id, &config.group_name)?;
        match self.fetch(&id).await? {
            Some(observed) => Ok(observed),
            None => Err(AlicloudError::GroupNotVisible {
                instance: config.instance_id.clone(),
                group: config.group_name.clone(),
            }),
        }
    }

    async fn read(
        &self,
        id: &Self::Id,
    ) -> Result<Option<Observed<Self::Id, Self::State>>> {
        self.fetch(id).await
    }

    /// The write is addressed at the tracked instance and the desired group
    /// name, so a rename converges on the new name and the returned identity
    /// reflects it. A previously named group may remain listed upstream with
    /// its old membership.
    async fn update(
        &self,
        id: &Self::Id,
        config: &Self::Config,
    ) -> Result<Observed<Self::Id, Self::State>> {
        self.write_group(
            id.instance_id(),
            &config.group_name,
            &config.security_ips,
            ModifyMode::Cover,
        )
        .await?;

        let refreshed = SecurityIpGroupId::new(id.instance_id(), &config.group_name)?;
        match self.fetch(&refreshed).await? {
            Some(observed) => Ok(observed),
            None => Err(AlicloudError::GroupNotVisible {
                instance: id.instance_id().to_string(),
                group: config.group_name.clone(),
            }),
        }
    }

    /// Clears the tracked membership with a `Delete`-mode write. The backend
    /// keeps the group record and reports its membership as the sentinel
    /// afterwards.
    async fn reset(&self, id: &Self::Id, state: &Self::State) -> Result<()> {
        self.write_group(
            id.instance_id(),
            id.group_name(),
            &state.security_ips,
            ModifyMode::Delete,
        )
        .await
    }

    async fn import(
        &self,
        raw: &str,
    ) -> Result<Option<Observed<Self::Id, Self::State>>> {
        let id: SecurityIpGroupId = raw.parse()?;
        self.fetch(&id).await
    }
}
