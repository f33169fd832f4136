//! Command-line surface

use crate::config::{RunConfig, StopCondition};
use crate::error::ConfigError;
use crate::request::{ApiRequest, ObjectType, KUBE_STRESS};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "kube-stress")]
#[command(about = "Simple tool for generating stress on a Kubernetes cluster", long_about = None)]
pub struct Cli {
    /// Path to the kubeconfig file (defaults to ~/.kube/config)
    #[arg(long, env = "KUBECONFIG", global = true)]
    pub kubeconfig: Option<PathBuf>,

    /// Write one CSV row per call (latency, outcome) to this file
    #[arg(long, env = "LATENCY_FILE", global = true)]
    pub latency_file: Option<PathBuf>,

    /// Upper bound on a single API call
    #[arg(long, env = "REQUEST_TIMEOUT", global = true, value_parser = humantime::parse_duration, default_value = "60s")]
    pub request_timeout: Duration,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create objects of a given type in the cluster
    Create(CreateArgs),
    /// List objects of a given type in the cluster
    List(ListArgs),
}

#[derive(Args, Debug)]
pub struct CreateArgs {
    /// Namespace where the test objects will be created
    #[arg(long, env = "NAMESPACE", default_value = KUBE_STRESS)]
    pub namespace: String,

    /// Type of objects to create (supported values: configmaps)
    #[arg(long, env = "OBJECT_TYPE", default_value = "configmaps")]
    pub object_type: String,

    /// Size of each object's data in bytes
    #[arg(long = "object-size-bytes", env = "OBJECT_SIZE_BYTES", default_value = "40000")]
    pub object_size: usize,

    /// Number of clients to spread the calls over
    #[arg(long, env = "NUM_CLIENTS", default_value = "10")]
    pub num_clients: usize,

    /// Target calls per second
    #[arg(long, env = "QPS", default_value = "10.0")]
    pub qps: f64,

    /// Number of objects to create (default 100)
    #[arg(long, env = "OBJECT_COUNT", conflicts_with = "total_duration")]
    pub object_count: Option<u64>,

    /// Create for this long instead of up to a count (e.g. 90s, 5m)
    #[arg(long, env = "TOTAL_DURATION", value_parser = humantime::parse_duration)]
    pub total_duration: Option<Duration>,
}

#[derive(Args, Debug)]
pub struct ListArgs {
    /// Namespace to list objects from (empty value means all namespaces)
    #[arg(long, env = "NAMESPACE", default_value = KUBE_STRESS)]
    pub namespace: String,

    /// Resource to list (e.g. configmaps, pods)
    #[arg(long, env = "OBJECT_TYPE", default_value = "configmaps")]
    pub object_type: String,

    /// Objects per page, i.e. the `limit` parameter (0 means no pagination)
    #[arg(long, env = "PAGE_SIZE", default_value = "0")]
    pub page_size: u32,

    /// Number of clients to spread the calls over
    #[arg(long, env = "NUM_CLIENTS", default_value = "10")]
    pub num_clients: usize,

    /// Target calls per second
    #[arg(long, env = "QPS", default_value = "2.0")]
    pub qps: f64,

    /// Total time to keep listing (default 5m)
    #[arg(long, env = "TOTAL_DURATION", value_parser = humantime::parse_duration, conflicts_with = "object_count")]
    pub total_duration: Option<Duration>,

    /// Stop after this many successful lists instead of after a duration
    #[arg(long, env = "OBJECT_COUNT")]
    pub object_count: Option<u64>,
}

impl Cli {
    pub fn kubeconfig_path(&self) -> PathBuf {
        self.kubeconfig.clone().unwrap_or_else(|| {
            std::env::var_os("HOME")
                .map(PathBuf::from)
                .unwrap_or_default()
                .join(".kube")
                .join("config")
        })
    }

    pub fn run_config(&self) -> Result<RunConfig, ConfigError> {
        match &self.command {
            Command::Create(args) => {
                let object_type = match args.object_type.as_str() {
                    "configmaps" => ObjectType::ConfigMaps,
                    other => return Err(ConfigError::UnsupportedObjectType(other.to_string())),
                };
                let stop = StopCondition::resolve(
                    args.object_count,
                    args.total_duration,
                    StopCondition::Count(100),
                )?;
                RunConfig::new(
                    args.qps,
                    args.num_clients,
                    stop,
                    ApiRequest::Create {
                        namespace: args.namespace.clone(),
                        object_type,
                        object_size: args.object_size,
                    },
                    self.request_timeout,
                )
            }
            Command::List(args) => {
                let stop = StopCondition::resolve(
                    args.object_count,
                    args.total_duration,
                    StopCondition::Deadline(Duration::from_secs(5 * 60)),
                )?;
                let namespace = Some(args.namespace.clone()).filter(|ns| !ns.is_empty());
                RunConfig::new(
                    args.qps,
                    args.num_clients,
                    stop,
                    ApiRequest::List {
                        namespace,
                        resource: args.object_type.clone(),
                        page_size: args.page_size,
                    },
                    self.request_timeout,
                )
            }
        }
    }
}
