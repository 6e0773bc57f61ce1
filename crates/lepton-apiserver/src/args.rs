use std::path::PathBuf;

use clap::Parser;

use lepton_common::workspace::ParseWorkspaceStateError;
use lepton_common::WorkspaceState;

#[derive(Debug, Parser)]
#[command(author, version, about)]
pub struct Args {
    #[arg(long, env = "LEPTON_APISERVER_ADDR", default_value = "0.0.0.0:20863")]
    pub listen_addr: String,

    /// Without an endpoint, objects are kept in memory for the life of the process.
    #[arg(long, env = "ETCD_ENDPOINT")]
    pub etcd_endpoint: Option<String>,

    #[arg(long, env = "LEPTON_NAMESPACE", default_value = "default")]
    pub namespace: String,

    #[arg(long, env = "LEPTON_WORKSPACE_NAME")]
    pub workspace_name: String,

    /// normal, paused or terminated.
    #[arg(long, env = "LEPTON_WORKSPACE_STATE", default_value = "normal")]
    pub workspace_state: String,

    /// Root directory of the backup bucket.
    #[arg(long, env = "LEPTON_BACKUP_DIR", default_value = "/var/lib/lepton/backups")]
    pub backup_dir: PathBuf,

    #[arg(long, env = "LEPTON_BUCKET_NAME", default_value = "")]
    pub bucket_name: String,

    #[arg(long, env = "LEPTON_EFS_ID", default_value = "")]
    pub efs_id: String,

    #[arg(long, env = "LEPTON_ROOT_DOMAIN", default_value = "")]
    pub root_domain: String,

    #[arg(long, env = "LEPTON_WORKSPACE_TOKEN", default_value = "")]
    pub workspace_token: String,

    #[arg(long, env = "LEPTON_CERTIFICATE_ARN", default_value = "")]
    pub certificate_arn: String,

    /// Registry photon images are pulled from, e.g. "123.dkr.ecr.us-east-1.amazonaws.com/photons".
    #[arg(long, env = "LEPTON_IMAGE_REGISTRY", default_value = "")]
    pub image_registry: String,

    /// Re-create missing objects from the last backup before serving.
    #[arg(long, env = "LEPTON_RESTORE_FROM_BACKUP", default_value_t = false)]
    pub restore_from_backup: bool,

    #[arg(long, env = "OTLP_ENDPOINT")]
    pub otlp_endpoint: Option<String>,

    #[arg(long, env = "OTLP_TOKEN")]
    pub otlp_token: Option<String>,
}

/// Everything about the workspace a request handler needs to know.
#[derive(Debug, Clone, Default)]
pub struct WorkspaceConfig {
    pub namespace: String,
    pub workspace_name: String,
    pub state: WorkspaceState,
    pub bucket_name: String,
    pub efs_id: String,
    pub root_domain: String,
    pub workspace_token: String,
    pub certificate_arn: String,
    pub image_registry: String,
}

impl Args {
    pub fn workspace_config(&self) -> Result<WorkspaceConfig, ParseWorkspaceStateError> {
        Ok(WorkspaceConfig {
            namespace: self.namespace.clone(),
            workspace_name: self.workspace_name.clone(),
            state: self.workspace_state.parse()?,
            bucket_name: self.bucket_name.clone(),
            efs_id: self.efs_id.clone(),
            root_domain: self.root_domain.clone(),
            workspace_token: self.workspace_token.clone(),
            certificate_arn: self.certificate_arn.clone(),
            image_registry: self.image_registry.clone(),
        })
    }
}

impl WorkspaceConfig {
    /// Rewrites a photon image to be pulled from the workspace registry.
    ///
    /// The registry host of `image` (if any) is replaced, the repository
    /// path and tag are kept.
    pub fn rewrite_image(&self, image: &str) -> String {
        let registry = self.image_registry.trim_end_matches('/');
        if registry.is_empty() {
            return image.to_string();
        }
        let repo = match image.split_once('/') {
            Some((host, rest))
                if host.contains('.') || host.contains(':') || host == "localhost" =>
            {
                rest
            }
            _ => image,
        };
        format!("{registry}/{repo}")
    }

    pub fn bucket_path(&self, deployment_id: &str) -> String {
        format!("s3://{}/{}/deployments/{}", self.bucket_name, self.workspace_name, deployment_id)
    }

    pub fn efs_path(&self) -> String {
        format!("{}:/{}", self.efs_id, self.workspace_name)
    }

    /// Public host name of a deployment; empty without a root domain.
    pub fn deployment_domain(&self, deployment_id: &str) -> String {
        if self.root_domain.is_empty() {
            return String::new();
        }
        format!("{}-{}.{}", deployment_id, self.workspace_name, self.root_domain)
    }
}
