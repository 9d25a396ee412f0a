//! # Lifecycle
//!
//! Finalizer protocol predicates.
//!
//! An object moves through `NoFinalizer -> Active -> DeletionRequested -> Purged`.
//! The predicates here only observe that state; every side effect (adding or removing
//! the finalizer, remote cleanup) happens in the reconciler.

use k8s_openapi::apimachinery::pkg::apis::meta::v1::Time;

/// Capability needed by the lifecycle predicates
///
/// Implemented for every `kube::Resource`, so all resource types share one
/// implementation of the finalizer protocol.
pub trait Finalizable {
    /// Deletion timestamp set by the API server when deletion was requested
    fn deletion_timestamp(&self) -> Option<&Time>;

    /// Whether the object carries the given finalizer
    fn has_finalizer(&self, finalizer: &str) -> bool;
}

impl<K: kube::Resource> Finalizable for K {
    fn deletion_timestamp(&self) -> Option<&Time> {
        self.meta().deletion_timestamp.as_ref()
    }

    fn has_finalizer(&self, finalizer: &str) -> bool {
        self.meta()
            .finalizers
            .as_ref()
            .is_some_and(|finalizers| finalizers.iter().any(|f| f == finalizer))
    }
}

/// Lifecycle state of an object with respect to one finalizer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    /// Not marked for deletion and the finalizer has not been added yet
    NoFinalizer,
    /// Finalizer present, remote resource exists or is being created
    Active,
    /// Deletion requested while remote cleanup is still owed
    DeletionRequested,
    /// Finalizer removed after deletion, the object may be garbage collected
    Purged,
}

/// Reports true when the object is not marked for deletion and lacks the finalizer
pub fn needs_finalizer_add<T: Finalizable + ?Sized>(object: &T, finalizer: &str) -> bool {
    object.deletion_timestamp().is_none() && !object.has_finalizer(finalizer)
}

/// Reports true when the object is marked for deletion and still carries the finalizer
pub fn is_deletion_candidate<T: Finalizable + ?Sized>(object: &T, finalizer: &str) -> bool {
    object.deletion_timestamp().is_some() && object.has_finalizer(finalizer)
}

/// Classify an object into its lifecycle state
pub fn lifecycle_state<T: Finalizable + ?Sized>(object: &T, finalizer: &str) -> LifecycleState {
    match (object.deletion_timestamp().is_some(), object.has_finalizer(finalizer)) {
        (false, false) => LifecycleState::NoFinalizer,
        (false, true) => LifecycleState::Active,
        (true, true) => LifecycleState::DeletionRequested,
        (true, false) => LifecycleState::Purged,
    }
}

/// Finalizer list with `finalizer` appended, keeping existing entries
pub fn with_finalizer(finalizers: Option<&Vec<String>>, finalizer: &str) -> Vec<String> {
    let mut list = finalizers.cloned().unwrap_or_default();
    if !list.iter().any(|f| f == finalizer) {
        list.push(finalizer.to_string());
    }
    list
}

/// Finalizer list with every occurrence of `finalizer` removed
pub fn without_finalizer(finalizers: Option<&Vec<String>>, finalizer: &str) -> Vec<String> {
    finalizers
        .into_iter()
        .flatten()
        .filter(|f| *f != finalizer)
        .cloned()
        .collect()
}
