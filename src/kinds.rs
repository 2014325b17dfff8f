//! Built-in resource kinds
//!
//! Each kind is a zero-sized marker implementing [`Kind`]. The same table
//! registers the default repositories and generates the typed accessors on
//! [`Client`] (`client.pods()`, `client.deployments()`, ...).

use crate::client::Client;
use crate::model::Kind;
use crate::registry::RepositoryEntry;
use crate::repository::Repository;
use crate::Result;
use std::sync::Arc;

macro_rules! resource_kinds {
    ($(
        $(#[$doc:meta])*
        $kind:ident => $api_version:literal, $resource:literal,
            namespaced: $namespaced:literal, plural: $plural:literal,
            $accessor:literal => $method:ident;
    )*) => {
        $(
            $(#[$doc])*
            #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
            pub struct $kind;

            impl Kind for $kind {
                const KIND: &'static str = stringify!($kind);
                const API_VERSION: &'static str = $api_version;
                const PLURAL_KIND: bool = $plural;
                const RESOURCE: &'static str = $resource;
                const NAMESPACED: bool = $namespaced;
            }
        )*

        /// Accessor names and entries of the default registry
        pub(crate) fn builtin_entries() -> Vec<(&'static str, RepositoryEntry)> {
            vec![$(($accessor, RepositoryEntry::of::<$kind>()),)*]
        }

        impl Client {
            $(
                #[doc = concat!("Repository registered as `", $accessor, "`")]
                pub fn $method(&self) -> Result<Arc<Repository<$kind>>> {
                    self.repository::<$kind>($accessor)
                }
            )*
        }
    };
}

resource_kinds! {
    ConfigMap => "v1", "configmaps", namespaced: true, plural: false, "configMaps" => config_maps;
    /// Serialized as `Endpoints`
    Endpoint => "v1", "endpoints", namespaced: true, plural: true, "endpoints" => endpoints;
    Event => "v1", "events", namespaced: true, plural: false, "events" => events;
    LimitRange => "v1", "limitranges", namespaced: true, plural: false, "limitRanges" => limit_ranges;
    Namespace => "v1", "namespaces", namespaced: false, plural: false, "namespaces" => namespaces;
    Node => "v1", "nodes", namespaced: false, plural: false, "nodes" => nodes;
    PersistentVolume => "v1", "persistentvolumes", namespaced: false, plural: false,
        "persistentVolume" => persistent_volume;
    PersistentVolumeClaim => "v1", "persistentvolumeclaims", namespaced: true, plural: false,
        "persistentVolumeClaims" => persistent_volume_claims;
    Pod => "v1", "pods", namespaced: true, plural: false, "pods" => pods;
    ReplicationController => "v1", "replicationcontrollers", namespaced: true, plural: false,
        "replicationControllers" => replication_controllers;
    ResourceQuota => "v1", "resourcequotas", namespaced: true, plural: false,
        "resourceQuotas" => resource_quotas;
    Secret => "v1", "secrets", namespaced: true, plural: false, "secrets" => secrets;
    ServiceAccount => "v1", "serviceaccounts", namespaced: true, plural: false,
        "serviceAccounts" => service_accounts;
    Service => "v1", "services", namespaced: true, plural: false, "services" => services;

    Job => "batch/v1", "jobs", namespaced: true, plural: false, "jobs" => jobs;
    CronJob => "batch/v1", "cronjobs", namespaced: true, plural: false, "cronJobs" => cron_jobs;

    Deployment => "apps/v1", "deployments", namespaced: true, plural: false,
        "deployments" => deployments;
    StatefulSet => "apps/v1", "statefulsets", namespaced: true, plural: false,
        "statefulsets" => stateful_sets;
    ReplicaSet => "apps/v1", "replicasets", namespaced: true, plural: false,
        "replicaSets" => replica_sets;
    DaemonSet => "apps/v1", "daemonsets", namespaced: true, plural: false,
        "daemonSets" => daemon_sets;

    Ingress => "networking.k8s.io/v1", "ingresses", namespaced: true, plural: false,
        "ingresses" => ingresses;
    NetworkPolicy => "networking.k8s.io/v1", "networkpolicies", namespaced: true, plural: false,
        "networkPolicies" => network_policies;

    HorizontalPodAutoscaler => "autoscaling/v2", "horizontalpodautoscalers", namespaced: true,
        plural: false, "horizontalPodAutoscalers" => horizontal_pod_autoscalers;

    /// cert-manager certificate
    Certificate => "cert-manager.io/v1", "certificates", namespaced: true, plural: false,
        "certificates" => certificates;
    /// cert-manager issuer
    Issuer => "cert-manager.io/v1", "issuers", namespaced: true, plural: false,
        "issuers" => issuers;

    Role => "rbac.authorization.k8s.io/v1", "roles", namespaced: true, plural: false,
        "roles" => roles;
    RoleBinding => "rbac.authorization.k8s.io/v1", "rolebindings", namespaced: true, plural: false,
        "roleBindings" => role_bindings;
    ClusterRole => "rbac.authorization.k8s.io/v1", "clusterroles", namespaced: false,
        plural: false, "clusterRoles" => cluster_roles;
    ClusterRoleBinding => "rbac.authorization.k8s.io/v1", "clusterrolebindings",
        namespaced: false, plural: false, "clusterRoleBindings" => cluster_role_bindings;

    /// Hierarchical namespace controller anchor
    SubnamespaceAnchor => "hnc.x-k8s.io/v1alpha2", "subnamespaceanchors", namespaced: true,
        plural: false, "subnamespacesAnchors" => subnamespaces_anchors;
}
