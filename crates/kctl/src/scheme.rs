use std::{fmt::Display, sync::OnceLock};

use k8s_openapi::{
    ClusterResourceScope, NamespaceResourceScope,
    api::{
        apps::v1 as apps_v1, autoscaling::v1 as autoscaling_v1, autoscaling::v2 as autoscaling_v2,
        batch::v1 as batch_v1, core::v1 as core_v1, networking::v1 as networking_v1,
        policy::v1 as policy_v1, rbac::v1 as rbac_v1,
    },
    apiextensions_apiserver::pkg::apis::apiextensions::v1 as apiextensions_v1,
};
use kube::api::{ApiResource, DynamicObject, GroupVersionKind};
use serde::{Serialize, de::DeserializeOwned};

use crate::{error::ResolutionError, state::State};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Namespaced,
    Cluster,
}

/// Maps the k8s-openapi scope marker types onto [`Scope`].
pub trait ScopeKind {
    const SCOPE: Scope;
}

impl ScopeKind for NamespaceResourceScope {
    const SCOPE: Scope = Scope::Namespaced;
}

impl ScopeKind for ClusterResourceScope {
    const SCOPE: Scope = Scope::Cluster;
}

/// Binds a group/version/kind to the REST resource able to create it.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeMapping {
    pub gvk: GroupVersionKind,
    pub resource: ApiResource,
    pub scope: Scope,
}

impl TypeMapping {
    pub fn is_namespaced(&self) -> bool {
        self.scope == Scope::Namespaced
    }

    /// `deployments.apps`, or just `pods` for the core group.
    pub fn qualified_resource(&self) -> String {
        if self.gvk.group.is_empty() {
            self.resource.plural.clone()
        } else {
            format!("{}.{}", self.resource.plural, self.gvk.group)
        }
    }

    /// `deployment.apps`, or just `pod` for the core group.
    pub fn qualified_kind(&self) -> String {
        let kind = self.gvk.kind.to_lowercase();

        if self.gvk.group.is_empty() {
            kind
        } else {
            format!("{}.{}", kind, self.gvk.group)
        }
    }
}

impl Display for TypeMapping {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.gvk.group.is_empty() {
            f.write_fmt(format_args!("{}/{}", self.gvk.version, self.gvk.kind))
        } else {
            f.write_fmt(format_args!(
                "{}/{}/{}",
                self.gvk.group, self.gvk.version, self.gvk.kind
            ))
        }
    }
}

type DecodeFn = fn(serde_json::Value) -> Result<DynamicObject, serde_json::Error>;

struct SchemeEntry {
    mapping: TypeMapping,
    decode: DecodeFn,
}

/// Registry of the kinds this client knows how to decode.
///
/// Entries are kept in priority order: groups in the order they were
/// registered, and within a group the preferred version first.
#[derive(Default)]
pub struct Scheme {
    entries: Vec<SchemeEntry>,
}

impl Scheme {
    pub fn register<K>(&mut self) -> &mut Self
    where
        K: k8s_openapi::Resource + Serialize + DeserializeOwned,
        K::Scope: ScopeKind,
    {
        let gvk = GroupVersionKind::gvk(K::GROUP, K::VERSION, K::KIND);
        let resource = ApiResource::from_gvk_with_plural(&gvk, K::URL_PATH_SEGMENT);

        self.entries.push(SchemeEntry {
            mapping: TypeMapping {
                gvk,
                resource,
                scope: <K::Scope as ScopeKind>::SCOPE,
            },
            decode: decode_typed::<K>,
        });

        self
    }

    pub fn builtin() -> Self {
        let mut scheme = Self::default();

        scheme
            .register::<core_v1::Pod>()
            .register::<core_v1::Service>()
            .register::<core_v1::ConfigMap>()
            .register::<core_v1::Secret>()
            .register::<core_v1::ServiceAccount>()
            .register::<core_v1::Namespace>()
            .register::<core_v1::PersistentVolumeClaim>()
            .register::<core_v1::PersistentVolume>()
            .register::<apps_v1::Deployment>()
            .register::<apps_v1::StatefulSet>()
            .register::<apps_v1::DaemonSet>()
            .register::<apps_v1::ReplicaSet>()
            .register::<batch_v1::Job>()
            .register::<batch_v1::CronJob>()
            .register::<autoscaling_v2::HorizontalPodAutoscaler>()
            .register::<autoscaling_v1::HorizontalPodAutoscaler>()
            .register::<networking_v1::Ingress>()
            .register::<networking_v1::NetworkPolicy>()
            .register::<policy_v1::PodDisruptionBudget>()
            .register::<rbac_v1::Role>()
            .register::<rbac_v1::RoleBinding>()
            .register::<rbac_v1::ClusterRole>()
            .register::<rbac_v1::ClusterRoleBinding>()
            .register::<apiextensions_v1::CustomResourceDefinition>();

        scheme
    }

    /// Group versions in the order they are searched, without duplicates.
    pub fn prioritized_versions(&self) -> Vec<String> {
        let mut versions: Vec<String> = Vec::new();

        for entry in &self.entries {
            let api_version = entry.mapping.gvk.api_version();
            if !versions.contains(&api_version) {
                versions.push(api_version);
            }
        }

        versions
    }

    /// Matches a raw document against the registered kinds and decodes it
    /// through the concrete type, erasing it again afterwards.
    pub fn decode(
        &self,
        source_name: &str,
        value: serde_json::Value,
    ) -> Result<(TypeMapping, DynamicObject), ResolutionError> {
        let (api_version, kind) = type_info(&value).ok_or_else(|| {
            ResolutionError::MissingTypeInfo {
                source_name: source_name.into(),
            }
        })?;

        let Some(entry) = self.find(&api_version, &kind) else {
            tracing::debug!(
                searched = ?self.prioritized_versions(),
                "no registered kind matched"
            );

            return Err(ResolutionError::NoMatch {
                source_name: source_name.into(),
                api_version,
                kind,
            });
        };

        let object = (entry.decode)(value).map_err(|e| ResolutionError::Decode {
            source_name: source_name.into(),
            kind,
            source: e,
        })?;

        Ok((entry.mapping.clone(), object))
    }

    fn find(&self, api_version: &str, kind: &str) -> Option<&SchemeEntry> {
        let (group, version) = split_api_version(api_version);

        self.entries.iter().find(|e| {
            let gvk = &e.mapping.gvk;

            gvk.group == group && gvk.version == version && gvk.kind == kind
        })
    }
}

/// Splits `apps/v1` into `("apps", "v1")`; the core group has no prefix.
pub fn split_api_version(api_version: &str) -> (&str, &str) {
    match api_version.split_once('/') {
        Some((group, version)) => (group, version),
        None => ("", api_version),
    }
}

pub fn type_info(value: &serde_json::Value) -> Option<(String, String)> {
    let api_version = value.get("apiVersion")?.as_str()?;
    let kind = value.get("kind")?.as_str()?;

    if api_version.is_empty() || kind.is_empty() {
        return None;
    }

    Some((api_version.to_string(), kind.to_string()))
}

fn decode_typed<K>(value: serde_json::Value) -> Result<DynamicObject, serde_json::Error>
where
    K: Serialize + DeserializeOwned,
{
    let typed: K = serde_json::from_value(value)?;

    serde_json::from_value(serde_json::to_value(&typed)?)
}

pub trait SchemeState {
    fn scheme(&self) -> &'static Scheme;
}

impl SchemeState for State {
    fn scheme(&self) -> &'static Scheme {
        static SCHEME: OnceLock<Scheme> = OnceLock::new();

        SCHEME.get_or_init(|| {
            tracing::trace!("registering builtin kinds");

            Scheme::builtin()
        })
    }
}
