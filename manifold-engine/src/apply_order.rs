//! Apply-order sorting.
//!
//! Objects are ordered by `(rank(kind), namespace, name, kind)`. The rank
//! table below is versioned policy data: kinds earlier in the list are
//! applied first. Kinds not in the table share a single rank placed after
//! every namespaced and networking kind and before admission webhooks, so
//! new kinds sort deterministically and never block on webhooks that govern
//! them.
//!
//! | Ranks | Group                                                  |
//! |-------|--------------------------------------------------------|
//! | 0     | `Namespace`                                            |
//! | 1     | `CustomResourceDefinition`                             |
//! | 2–6   | quotas, priority and storage classes, volumes          |
//! | 7–11  | identity and RBAC                                      |
//! | 12–25 | namespaced config, claims, services and workloads      |
//! | 26–29 | networking and API aggregation                         |
//! | 30    | unknown kinds                                          |
//! | 31–32 | admission webhook configurations                       |

use std::cmp::Ordering;

use manifold_core::{PostRenderer, ResourceObject};

/// Kinds ranked ahead of the unknown bucket, in apply order.
pub const KIND_ORDER: &[&str] = &[
    "Namespace",
    "CustomResourceDefinition",
    "ResourceQuota",
    "LimitRange",
    "PriorityClass",
    "StorageClass",
    "PersistentVolume",
    "ServiceAccount",
    "ClusterRole",
    "ClusterRoleBinding",
    "Role",
    "RoleBinding",
    "Secret",
    "ConfigMap",
    "PersistentVolumeClaim",
    "Service",
    "Pod",
    "ReplicationController",
    "ReplicaSet",
    "Deployment",
    "DaemonSet",
    "StatefulSet",
    "Job",
    "CronJob",
    "HorizontalPodAutoscaler",
    "PodDisruptionBudget",
    "IngressClass",
    "Ingress",
    "NetworkPolicy",
    "APIService",
];

/// Kinds ranked after the unknown bucket, in apply order.
pub const LAST_KINDS: &[&str] = &[
    "MutatingWebhookConfiguration",
    "ValidatingWebhookConfiguration",
];

/// Rank shared by every kind not listed in [`KIND_ORDER`] or [`LAST_KINDS`].
pub const UNKNOWN_RANK: usize = KIND_ORDER.len();

/// Apply-order rank of `kind`. Lower ranks are applied first.
pub fn rank(kind: &str) -> usize {
    if let Some(i) = KIND_ORDER.iter().position(|k| *k == kind) {
        return i;
    }
    match LAST_KINDS.iter().position(|k| *k == kind) {
        Some(i) => UNKNOWN_RANK + 1 + i,
        None => UNKNOWN_RANK,
    }
}

/// Total order used by [`sort`].
///
/// The trailing `kind` comparison only matters inside the unknown bucket,
/// where different kinds share a rank.
pub fn compare(a: &ResourceObject, b: &ResourceObject) -> Ordering {
    rank(a.kind())
        .cmp(&rank(b.kind()))
        .then_with(|| a.namespace().cmp(b.namespace()))
        .then_with(|| a.name().cmp(b.name()))
        .then_with(|| a.kind().cmp(b.kind()))
}

/// Stable in-place apply-order sort.
pub fn sort(objects: &mut [ResourceObject]) {
    objects.sort_by(compare);
}

/// Post-renderer that sorts the whole batch into apply order. Never fails.
pub fn apply_order() -> PostRenderer {
    PostRenderer::new("apply-order", |_ctx, mut objects: Vec<ResourceObject>| {
        sort(&mut objects);
        Ok(objects)
    })
}
