//! Kubernetes connectivity: kubeconfig resolution and the client pool provider

mod client;
mod config;

pub use client::{build_pool, KubeClient};
pub use config::{Auth, KubeConfig};
