//! Per-call payload descriptors and the objects they produce

use rand::distr::{Alphanumeric, SampleString};
use rand::Rng;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Label key stamped on every created object so they can be found later.
pub const KUBE_STRESS: &str = "kube-stress";

/// Object kinds the create command knows how to build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectType {
    ConfigMaps,
}

impl ObjectType {
    pub fn resource(&self) -> &'static str {
        match self {
            ObjectType::ConfigMaps => "configmaps",
        }
    }
}

/// What each dispatched call does. The dispatcher only passes it through.
#[derive(Debug, Clone, PartialEq)]
pub enum ApiRequest {
    Create {
        namespace: String,
        object_type: ObjectType,
        object_size: usize,
    },
    List {
        /// `None` lists across all namespaces
        namespace: Option<String>,
        resource: String,
        /// 0 disables pagination
        page_size: u32,
    },
}

impl ApiRequest {
    pub fn verb(&self) -> &'static str {
        match self {
            ApiRequest::Create { .. } => "create",
            ApiRequest::List { .. } => "list",
        }
    }

    /// API path relative to the server root.
    pub fn path(&self) -> String {
        match self {
            ApiRequest::Create {
                namespace,
                object_type,
                ..
            } => format!(
                "/api/v1/namespaces/{}/{}",
                namespace,
                object_type.resource()
            ),
            ApiRequest::List {
                namespace: Some(namespace),
                resource,
                ..
            } => format!("/api/v1/namespaces/{}/{}", namespace, resource),
            ApiRequest::List {
                namespace: None,
                resource,
                ..
            } => format!("/api/v1/{}", resource),
        }
    }
}

impl fmt::Display for ApiRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiRequest::Create {
                namespace,
                object_type,
                object_size,
            } => write!(
                f,
                "create {} ({} bytes each) in namespace '{}'",
                object_type.resource(),
                object_size,
                namespace
            ),
            ApiRequest::List {
                namespace,
                resource,
                page_size,
            } => write!(
                f,
                "list {} in {} (page size = {})",
                resource,
                namespace
                    .as_deref()
                    .map(|ns| format!("namespace '{}'", ns))
                    .unwrap_or_else(|| "all namespaces".to_string()),
                page_size
            ),
        }
    }
}

// =============================================================================
// Objects
// =============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigMap {
    pub api_version: &'static str,
    pub kind: &'static str,
    pub metadata: ObjectMeta,
    pub data: BTreeMap<String, String>,
}

#[derive(Debug, Serialize)]
pub struct ObjectMeta {
    pub name: String,
    pub labels: BTreeMap<String, String>,
}

impl ConfigMap {
    /// Fresh uniquely named ConfigMap carrying `size` random bytes of data.
    pub fn random(size: usize) -> Self {
        let name = format!("configmap-{:032x}", rand::rng().random::<u128>());
        let labels = BTreeMap::from([(KUBE_STRESS.to_string(), name.clone())]);
        let data = BTreeMap::from([(name.clone(), random_string(size))]);

        Self {
            api_version: "v1",
            kind: "ConfigMap",
            metadata: ObjectMeta { name, labels },
            data,
        }
    }
}

pub fn random_string(len: usize) -> String {
    Alphanumeric.sample_string(&mut rand::rng(), len)
}
