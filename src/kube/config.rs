//! Kubeconfig loading
//!
//! Only the pieces needed to reach a cluster are understood: the current
//! context's server, its CA, and either a bearer token or a client
//! certificate for the user.

use crate::error::{Error, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::debug;
use url::Url;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct RawKubeConfig {
    #[serde(default)]
    current_context: Option<String>,
    #[serde(default)]
    contexts: Vec<Named<RawContext>>,
    #[serde(default)]
    clusters: Vec<Named<RawCluster>>,
    #[serde(default)]
    users: Vec<Named<RawUser>>,
}

#[derive(Debug, Deserialize)]
struct Named<T> {
    name: String,
    #[serde(alias = "context", alias = "cluster", alias = "user")]
    value: T,
}

#[derive(Debug, Deserialize)]
struct RawContext {
    cluster: String,
    user: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct RawCluster {
    server: String,
    #[serde(default)]
    certificate_authority: Option<PathBuf>,
    #[serde(default)]
    certificate_authority_data: Option<String>,
    #[serde(default)]
    insecure_skip_tls_verify: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct RawUser {
    #[serde(default)]
    token: Option<String>,
    #[serde(default)]
    client_certificate: Option<PathBuf>,
    #[serde(default)]
    client_certificate_data: Option<String>,
    #[serde(default)]
    client_key: Option<PathBuf>,
    #[serde(default)]
    client_key_data: Option<String>,
}

/// Resolved connection settings for the current context.
#[derive(Debug, Clone)]
pub struct KubeConfig {
    pub server: Url,
    pub ca_pem: Option<Vec<u8>>,
    pub insecure_skip_tls_verify: bool,
    pub auth: Auth,
}

#[derive(Clone)]
pub enum Auth {
    None,
    Token(String),
    /// PEM certificate chain followed by its private key
    ClientCertificate(Vec<u8>),
}

impl std::fmt::Debug for Auth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Auth::None => f.write_str("None"),
            Auth::Token(_) => f.write_str("Token(..)"),
            Auth::ClientCertificate(_) => f.write_str("ClientCertificate(..)"),
        }
    }
}

impl KubeConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::kubeconfig(path, format!("failed to read file: {}", e)))?;
        let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
        Self::from_yaml(&content, base_dir).map_err(|message| Error::kubeconfig(path, message))
    }

    /// Parse kubeconfig text. Relative file references resolve against `base_dir`.
    pub fn from_yaml(content: &str, base_dir: &Path) -> std::result::Result<Self, String> {
        let raw: RawKubeConfig =
            serde_yaml::from_str(content).map_err(|e| format!("invalid YAML: {}", e))?;

        let context_name = raw
            .current_context
            .as_deref()
            .filter(|name| !name.is_empty())
            .ok_or("no current-context set")?;
        let context = find(&raw.contexts, context_name, "context")?;
        let cluster = find(&raw.clusters, &context.cluster, "cluster")?;
        let user = raw
            .users
            .iter()
            .find(|u| u.name == context.user)
            .map(|u| &u.value);

        debug!(
            "Using context '{}' (cluster '{}', user '{}')",
            context_name, context.cluster, context.user
        );

        let server =
            Url::parse(&cluster.server).map_err(|e| format!("invalid server URL: {}", e))?;

        let ca_pem = read_data_or_file(
            cluster.certificate_authority_data.as_deref(),
            cluster.certificate_authority.as_deref(),
            base_dir,
        )?;

        let auth = match user {
            None => Auth::None,
            Some(user) => resolve_auth(user, base_dir)?,
        };

        Ok(Self {
            server,
            ca_pem,
            insecure_skip_tls_verify: cluster.insecure_skip_tls_verify,
            auth,
        })
    }
}

fn find<'a, T>(
    entries: &'a [Named<T>],
    name: &str,
    kind: &str,
) -> std::result::Result<&'a T, String> {
    entries
        .iter()
        .find(|e| e.name == name)
        .map(|e| &e.value)
        .ok_or_else(|| format!("{} '{}' not found", kind, name))
}

fn resolve_auth(user: &RawUser, base_dir: &Path) -> std::result::Result<Auth, String> {
    if let Some(token) = &user.token {
        return Ok(Auth::Token(token.clone()));
    }

    let cert = read_data_or_file(
        user.client_certificate_data.as_deref(),
        user.client_certificate.as_deref(),
        base_dir,
    )?;
    let key = read_data_or_file(
        user.client_key_data.as_deref(),
        user.client_key.as_deref(),
        base_dir,
    )?;

    match (cert, key) {
        (Some(mut cert), Some(key)) => {
            if !cert.ends_with(b"\n") {
                cert.push(b'\n');
            }
            cert.extend_from_slice(&key);
            Ok(Auth::ClientCertificate(cert))
        }
        (None, None) => Ok(Auth::None),
        _ => Err("client certificate and client key must be set together".to_string()),
    }
}

fn read_data_or_file(
    data: Option<&str>,
    file: Option<&Path>,
    base_dir: &Path,
) -> std::result::Result<Option<Vec<u8>>, String> {
    if let Some(data) = data {
        return STANDARD
            .decode(data.trim())
            .map(Some)
            .map_err(|e| format!("invalid base64 data: {}", e));
    }
    match file {
        Some(file) => {
            let path = base_dir.join(file);
            std::fs::read(&path)
                .map(Some)
                .map_err(|e| format!("failed to read {:?}: {}", path, e))
        }
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOKEN_CONFIG: &str = r#"
apiVersion: v1
kind: Config
current-context: stress
contexts:
- name: stress
  context:
    cluster: test-cluster
    user: admin
clusters:
- name: test-cluster
  cluster:
    server: https://127.0.0.1:6443
    insecure-skip-tls-verify: true
users:
- name: admin
  user:
    token: secret-token
"#;

    #[test]
    fn test_token_config() {
        let config = KubeConfig::from_yaml(TOKEN_CONFIG, Path::new(".")).unwrap();
        assert_eq!(config.server.as_str(), "https://127.0.0.1:6443/");
        assert!(config.insecure_skip_tls_verify);
        assert!(config.ca_pem.is_none());
        assert!(matches!(config.auth, Auth::Token(ref t) if t == "secret-token"));
    }

    #[test]
    fn test_debug_hides_token() {
        let config = KubeConfig::from_yaml(TOKEN_CONFIG, Path::new(".")).unwrap();
        assert!(!format!("{:?}", config).contains("secret-token"));
    }

    #[test]
    fn test_certificate_data() {
        let yaml = format!(
            r#"
current-context: c
contexts:
- name: c
  context: {{cluster: k, user: u}}
clusters:
- name: k
  cluster:
    server: https://example.test
    certificate-authority-data: {}
users:
- name: u
  user:
    client-certificate-data: {}
    client-key-data: {}
"#,
            STANDARD.encode("CA"),
            STANDARD.encode("CERT"),
            STANDARD.encode("KEY")
        );
        let config = KubeConfig::from_yaml(&yaml, Path::new(".")).unwrap();
        assert_eq!(config.ca_pem.as_deref(), Some(&b"CA"[..]));
        match config.auth {
            Auth::ClientCertificate(pem) => assert_eq!(pem, b"CERT\nKEY"),
            other => panic!("unexpected auth {:?}", other),
        }
    }

    #[test]
    fn test_certificate_file_relative_to_config() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("ca.crt"), "FILE-CA").unwrap();
        let yaml = r#"
current-context: c
contexts:
- name: c
  context: {cluster: k, user: u}
clusters:
- name: k
  cluster:
    server: https://example.test
    certificate-authority: ca.crt
users: []
"#;
        let config = KubeConfig::from_yaml(yaml, dir.path()).unwrap();
        assert_eq!(config.ca_pem.as_deref(), Some(&b"FILE-CA"[..]));
        assert!(matches!(config.auth, Auth::None));
    }

    #[test]
    fn test_missing_context() {
        let yaml = "current-context: nope\ncontexts: []\nclusters: []\nusers: []\n";
        let err = KubeConfig::from_yaml(yaml, Path::new(".")).unwrap_err();
        assert!(err.contains("context 'nope' not found"));
    }

    #[test]
    fn test_cert_without_key_rejected() {
        let yaml = format!(
            r#"
current-context: c
contexts:
- name: c
  context: {{cluster: k, user: u}}
clusters:
- name: k
  cluster: {{server: "https://example.test"}}
users:
- name: u
  user:
    client-certificate-data: {}
"#,
            STANDARD.encode("CERT")
        );
        assert!(KubeConfig::from_yaml(&yaml, Path::new(".")).is_err());
    }

    #[test]
    fn test_load_missing_file() {
        let err = KubeConfig::load(Path::new("/nonexistent/kubeconfig")).unwrap_err();
        assert!(matches!(err, Error::KubeConfig { .. }));
    }
}
