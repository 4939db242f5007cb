use std::collections::{BTreeMap, BTreeSet, HashSet, VecDeque};
use std::sync::{Arc, Mutex};

use anyhow::Context;
use terrane_alicloud::client::{
    DescribeInstancesRequest, InstanceList, InstancePage, KvStoreApi, KvStoreInstance, ModifyMode,
    ModifySecurityIpsRequest, SecurityIpGroup,
};
use terrane_alicloud::{AlicloudError, LOOPBACK_SENTINEL, Result};
use terrane_provider::{ResourceRecord, StateStore};

/// Route provider tracing through the test harness so `--nocapture`
/// shows the reconcile decisions next to the assertions.
#[allow(dead_code)]
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

/// Record a reconciled resource in the on-disk state document and
/// return its record key.
#[allow(dead_code)]
pub async fn persist_record<S: serde::Serialize>(
    store: &StateStore,
    resource_type: &str,
    id: String,
    state: &S,
) -> anyhow::Result<String> {
    let mut document = store.load().await.context("loading state document")?;
    let record = ResourceRecord::encode(resource_type, id, state)
        .context("encoding resource attributes")?;
    let key = record.key();
    document.upsert(record);
    store.save(&document).await.context("saving state document")?;
    Ok(key)
}

#[derive(Default)]
struct FakeState {
    instances: Vec<KvStoreInstance>,
    known_instances: HashSet<String>,
    groups: BTreeMap<String, BTreeMap<String, BTreeSet<String>>>,
    modify_failures: VecDeque<AlicloudError>,
    modify_calls: u32,
}

/// In-memory control plane with `ModifySecurityIps` semantics: Cover
/// replaces a group's membership, Append extends it, Delete removes the
/// submitted entries and leaves the loopback sentinel behind when the
/// membership would become empty.
#[derive(Clone, Default)]
pub struct FakeKvStore {
    state: Arc<Mutex<FakeState>>,
}

impl FakeKvStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an instance id so calls against it succeed.
    #[allow(dead_code)]
    pub fn with_instance(self, instance_id: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .known_instances
            .insert(instance_id.to_string());
        self
    }

    /// Register a full instance record for listing.
    #[allow(dead_code)]
    pub fn with_listed_instance(self, instance: KvStoreInstance) -> Self {
        {
            let mut state = self.state.lock().unwrap();
            state.known_instances.insert(instance.instance_id.clone());
            state.instances.push(instance);
        }
        self
    }

    /// Fail the next modify call with `error`, then fall through.
    #[allow(dead_code)]
    pub fn queue_modify_failure(&self, error: AlicloudError) {
        self.state.lock().unwrap().modify_failures.push_back(error);
    }

    /// Current membership of one group, as the backend stores it.
    #[allow(dead_code)]
    pub fn group_ips(&self, instance_id: &str, group_name: &str) -> Option<BTreeSet<String>> {
        self.state
            .lock()
            .unwrap()
            .groups
            .get(instance_id)
            .and_then(|groups| groups.get(group_name))
            .cloned()
    }

    #[allow(dead_code)]
    pub fn modify_calls(&self) -> u32 {
        self.state.lock().unwrap().modify_calls
    }

    #[allow(dead_code)]
    pub fn throttling_error() -> AlicloudError {
        AlicloudError::Api {
            code: "Throttling.User".to_string(),
            message: "Request was denied due to user flow control.".to_string(),
            request_id: "00000000-0000-0000-0000-000000000000".to_string(),
        }
    }

    #[allow(dead_code)]
    pub fn invalid_parameter_error() -> AlicloudError {
        AlicloudError::Api {
            code: "InvalidParameter".to_string(),
            message: "The specified parameter is not valid.".to_string(),
            request_id: "00000000-0000-0000-0000-000000000000".to_string(),
        }
    }

    fn instance_not_found(instance_id: &str) -> AlicloudError {
        AlicloudError::Api {
            code: "InvalidInstanceId.NotFound".to_string(),
            message: format!("The specified instance {instance_id} does not exist."),
            request_id: "00000000-0000-0000-0000-000000000000".to_string(),
        }
    }
}

#[async_trait::async_trait]
impl KvStoreApi for FakeKvStore {
    async fn describe_instances(&self, request: &DescribeInstancesRequest) -> Result<InstancePage> {
        let state = self.state.lock().unwrap();
        let matching: Vec<KvStoreInstance> = state
            .instances
            .iter()
            .filter(|instance| {
                request
                    .instance_type
                    .as_deref()
                    .map_or(true, |wanted| instance.instance_type == wanted)
            })
            .filter(|instance| {
                request
                    .instance_status
                    .as_deref()
                    .map_or(true, |wanted| instance.instance_status == wanted)
            })
            .cloned()
            .collect();

        let start = ((request.page_number.max(1) - 1) * request.page_size) as usize;
        let page: Vec<KvStoreInstance> = matching
            .iter()
            .skip(start)
            .take(request.page_size as usize)
            .cloned()
            .collect();

        Ok(InstancePage {
            page_number: request.page_number,
            page_size: request.page_size,
            total_count: matching.len() as u32,
            instances: InstanceList {
                kv_store_instance: page,
            },
        })
    }

    async fn describe_security_ips(&self, instance_id: &str) -> Result<Vec<SecurityIpGroup>> {
        let state = self.state.lock().unwrap();
        if !state.known_instances.contains(instance_id) {
            return Err(Self::instance_not_found(instance_id));
        }

        Ok(state
            .groups
            .get(instance_id)
            .map(|groups| {
                groups
                    .iter()
                    .map(|(name, ips)| SecurityIpGroup {
                        group_name: name.clone(),
                        attribute: String::new(),
                        ip_list: ips.iter().cloned().collect::<Vec<_>>().join(","),
                    })
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn modify_security_ips(&self, request: &ModifySecurityIpsRequest) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.modify_calls += 1;

        if let Some(error) = state.modify_failures.pop_front() {
            return Err(error);
        }
        if !state.known_instances.contains(&request.instance_id) {
            return Err(Self::instance_not_found(&request.instance_id));
        }

        let submitted: BTreeSet<String> = request
            .security_ips
            .split(',')
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
            .map(str::to_string)
            .collect();

        let groups = state.groups.entry(request.instance_id.clone()).or_default();
        match request.modify_mode {
            ModifyMode::Cover => {
                groups.insert(request.group_name.clone(), submitted);
            }
            ModifyMode::Append => {
                groups
                    .entry(request.group_name.clone())
                    .or_default()
                    .extend(submitted);
            }
            ModifyMode::Delete => {
                if let Some(membership) = groups.get_mut(&request.group_name) {
                    for entry in &submitted {
                        membership.remove(entry);
                    }
                    if membership.is_empty() {
                        membership.insert(LOOPBACK_SENTINEL.to_string());
                    }
                }
            }
        }
        Ok(())
    }
}
