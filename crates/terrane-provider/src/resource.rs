//! Resource lifecycle abstraction
//!
//! Managed resources implement [`ManagedResource`] to give the apply loop
//! a uniform create/read/update/reset surface. The framework invokes the
//! lifecycle methods sequentially for any one resource; implementations
//! talk to the backend through an injected client and always hand back
//! the backend's authoritative view, never locally assumed values.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Authoritative view of a resource after a successful backend round-trip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Observed<Id, S> {
    /// Provider-synthesized identity
    pub id: Id,

    /// Attributes as reported by the backend
    pub state: S,
}

/// One managed cloud resource type.
#[async_trait]
pub trait ManagedResource {
    /// Desired configuration, validated at construction.
    type Config: Send + Sync;

    /// Attributes observed from the backend.
    type State: Send + Sync;

    /// Provider-synthesized identity.
    type Id: fmt::Display + Clone + Send + Sync;

    /// Operation error.
    type Error: std::error::Error + Send + Sync;

    /// Short type name used in state keys and logs (e.g. "kvstore-security-ip-group").
    fn resource_type(&self) -> &'static str;

    /// Whether the observed state already satisfies the desired configuration.
    fn matches(&self, config: &Self::Config, state: &Self::State) -> bool;

    /// Whether converging on `config` requires destroying and recreating
    /// the object (an immutable attribute changed).
    fn requires_replacement(&self, config: &Self::Config, state: &Self::State) -> bool;

    /// Create the backend object and return its refreshed state.
    async fn create(
        &self,
        config: &Self::Config,
    ) -> Result<Observed<Self::Id, Self::State>, Self::Error>;

    /// Fetch authoritative state.
    ///
    /// `Ok(None)` means the backend no longer reports the object (logical
    /// deletion); the caller should drop it from tracked state. Absence is
    /// not an error.
    async fn read(
        &self,
        id: &Self::Id,
    ) -> Result<Option<Observed<Self::Id, Self::State>>, Self::Error>;

    /// Apply the desired configuration to an existing object.
    ///
    /// The returned identity may differ from `id`, e.g. after a rename.
    async fn update(
        &self,
        id: &Self::Id,
        config: &Self::Config,
    ) -> Result<Observed<Self::Id, Self::State>, Self::Error>;

    /// Return the object to its default, empty shape.
    ///
    /// For resources with no deletable backing object this is the whole of
    /// "destroy"; the caller forgets the resource afterwards.
    async fn reset(&self, id: &Self::Id, state: &Self::State) -> Result<(), Self::Error>;

    /// Resolve an externally supplied identity string to live state.
    async fn import(
        &self,
        raw: &str,
    ) -> Result<Option<Observed<Self::Id, Self::State>>, Self::Error>;
}

/// What a reconcile pass decided to do
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    /// Create a new backend object
    Create,
    /// Update an existing object in place
    Update,
    /// Reset and recreate because an immutable attribute changed
    Replace,
    /// No changes needed
    NoOp,
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionKind::Create => write!(f, "create"),
            ActionKind::Update => write!(f, "update"),
            ActionKind::Replace => write!(f, "replace"),
            ActionKind::NoOp => write!(f, "no-op"),
        }
    }
}

/// Outcome of one reconcile pass
#[derive(Debug, Clone)]
pub struct ReconcileOutcome<Id, S> {
    pub action: ActionKind,
    pub remote: Observed<Id, S>,
}

/// Drive one resource toward its desired configuration.
///
/// `tracked` is the identity recorded by a previous apply, if any. A
/// tracked object the backend no longer reports is recreated rather than
/// treated as an error.
pub async fn reconcile<R: ManagedResource>(
    resource: &R,
    tracked: Option<&R::Id>,
    desired: &R::Config,
) -> Result<ReconcileOutcome<R::Id, R::State>, R::Error> {
    let observed = match tracked {
        Some(id) => resource.read(id).await?,
        None => None,
    };

    match observed {
        None => {
            let remote = resource.create(desired).await?;
            tracing::info!("Created {} {}", resource.resource_type(), remote.id);
            Ok(ReconcileOutcome {
                action: ActionKind::Create,
                remote,
            })
        }
        Some(remote) if resource.requires_replacement(desired, &remote.state) => {
            resource.reset(&remote.id, &remote.state).await?;
            let fresh = resource.create(desired).await?;
            tracing::info!(
                "Replaced {} {} with {}",
                resource.resource_type(),
                remote.id,
                fresh.id
            );
            Ok(ReconcileOutcome {
                action: ActionKind::Replace,
                remote: fresh,
            })
        }
        Some(remote) if resource.matches(desired, &remote.state) => {
            tracing::debug!("{} {} is up to date", resource.resource_type(), remote.id);
            Ok(ReconcileOutcome {
                action: ActionKind::NoOp,
                remote,
            })
        }
        Some(remote) => {
            let refreshed = resource.update(&remote.id, desired).await?;
            tracing::info!("Updated {} {}", resource.resource_type(), refreshed.id);
            Ok(ReconcileOutcome {
                action: ActionKind::Update,
                remote: refreshed,
            })
        }
    }
}
