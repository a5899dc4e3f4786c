use std::{
    ffi::OsStr,
    path::{Path, PathBuf},
};

use kube::config::{KubeConfigOptions, Kubeconfig};

use crate::{error::ConfigurationError, state::State};

const DEFAULT_NAMESPACE: &str = "default";
const KUBECONFIG_ENV: &str = "KUBECONFIG";

/// Flags shared by every subcommand that talks to the cluster.
#[derive(clap::Args, Clone, Debug, Default)]
pub struct ConfigFlags {
    /// Path to the kubeconfig file to use, instead of $KUBECONFIG or ~/.kube/config
    #[arg(long, global = true)]
    pub kubeconfig: Option<PathBuf>,

    /// The kubeconfig context to use instead of the current one
    #[arg(long, global = true)]
    pub context: Option<String>,

    /// Namespace scope for this request
    #[arg(long, short = 'n', global = true)]
    pub namespace: Option<String>,
}

impl ConfigFlags {
    /// The flag names a single file. Without it `KUBECONFIG` may list several,
    /// separated like `PATH`.
    fn kubeconfig_paths(&self) -> Result<Vec<PathBuf>, ConfigurationError> {
        if let Some(kubeconfig) = self
            .kubeconfig
            .as_ref()
            .filter(|k| !k.as_os_str().is_empty())
        {
            return Ok(vec![kubeconfig.clone()]);
        }

        if let Some(paths) = std::env::var_os(KUBECONFIG_ENV)
            .map(|value| split_kubeconfig_paths(&value))
            .filter(|paths| !paths.is_empty())
        {
            return Ok(paths);
        }

        let home = dirs::home_dir().ok_or(ConfigurationError::NoHomeDir)?;

        Ok(vec![home.join(".kube").join("config")])
    }
}

fn split_kubeconfig_paths(value: &OsStr) -> Vec<PathBuf> {
    std::env::split_paths(value)
        .filter(|p| !p.as_os_str().is_empty())
        .collect()
}

/// The loaded kubeconfig plus the overrides given on the command line.
#[derive(Clone, Debug)]
pub struct ClientConfig {
    kubeconfig: Kubeconfig,
    context: Option<String>,
    namespace_override: Option<String>,
}

impl ClientConfig {
    #[tracing::instrument(level = "trace")]
    pub fn load(flags: &ConfigFlags) -> Result<Self, ConfigurationError> {
        Self::load_paths(&flags.kubeconfig_paths()?, flags)
    }

    /// Merges the kubeconfig files in order, the first file to set a value
    /// wins. Files that do not exist are skipped, as long as one does.
    pub fn load_paths(paths: &[PathBuf], flags: &ConfigFlags) -> Result<Self, ConfigurationError> {
        let present = paths.iter().filter(|p| p.exists()).collect::<Vec<_>>();
        if present.is_empty() {
            return Err(ConfigurationError::Missing(
                paths.first().cloned().unwrap_or_default(),
            ));
        }

        let mut merged: Option<Kubeconfig> = None;

        for path in present {
            let kubeconfig = read_kubeconfig(path)?;

            merged = Some(match merged {
                Some(existing) => existing
                    .merge(kubeconfig)
                    .map_err(|source| ConfigurationError::Merge {
                        path: path.clone(),
                        source,
                    })?,
                None => kubeconfig,
            });
        }

        Self::from_kubeconfig(merged.unwrap_or_default(), flags)
    }

    pub fn from_kubeconfig(
        kubeconfig: Kubeconfig,
        flags: &ConfigFlags,
    ) -> Result<Self, ConfigurationError> {
        let context = flags
            .context
            .clone()
            .or_else(|| kubeconfig.current_context.clone())
            .filter(|c| !c.is_empty());

        if let Some(context) = &context
            && !kubeconfig.contexts.iter().any(|c| &c.name == context)
        {
            return Err(ConfigurationError::UnknownContext(context.clone()));
        }

        Ok(Self {
            kubeconfig,
            context,
            namespace_override: flags.namespace.clone().filter(|n| !n.is_empty()),
        })
    }

    /// Returns the effective namespace, and whether it was set explicitly and
    /// therefore has to be enforced on the objects being sent.
    pub fn namespace(&self) -> (String, bool) {
        if let Some(namespace) = &self.namespace_override {
            return (namespace.clone(), true);
        }

        let namespace = self
            .context
            .as_ref()
            .and_then(|name| self.kubeconfig.contexts.iter().find(|c| &c.name == name))
            .and_then(|c| c.context.as_ref())
            .and_then(|c| c.namespace.clone())
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| DEFAULT_NAMESPACE.to_string());

        (namespace, false)
    }

    pub fn context(&self) -> Option<&str> {
        self.context.as_deref()
    }

    #[tracing::instrument(skip(self), level = "trace")]
    pub async fn client(&self) -> Result<kube::Client, ConfigurationError> {
        let options = KubeConfigOptions {
            context: self.context.clone(),
            ..Default::default()
        };

        let config = kube::Config::from_custom_kubeconfig(self.kubeconfig.clone(), &options)
            .await
            .map_err(ConfigurationError::Client)?;

        tracing::debug!(cluster = config.cluster_url.to_string(), "creating api client");

        kube::Client::try_from(config).map_err(ConfigurationError::Connect)
    }
}

fn read_kubeconfig(path: &Path) -> Result<Kubeconfig, ConfigurationError> {
    tracing::debug!(path = path.display().to_string(), "loading kubeconfig");

    Kubeconfig::read_from(path).map_err(|source| ConfigurationError::Load {
        path: path.to_path_buf(),
        source,
    })
}

pub trait ClientConfigState {
    fn client_config(&self) -> Result<ClientConfig, ConfigurationError>;
}

impl ClientConfigState for State {
    fn client_config(&self) -> Result<ClientConfig, ConfigurationError> {
        ClientConfig::load(&self.config_flags)
    }
}
