use kube::api::{Api, DynamicObject, PostParams};

use crate::{error::SubmissionError, resource::ResourceInfo, scheme::TypeMapping};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DryRun {
    #[default]
    None,
    Server,
}

impl DryRun {
    pub fn is_server(&self) -> bool {
        matches!(self, DryRun::Server)
    }
}

/// Creates objects against the endpoint described by a [`TypeMapping`].
#[async_trait::async_trait]
pub trait ResourceClient {
    async fn create(
        &self,
        mapping: &TypeMapping,
        namespace: Option<&str>,
        object: &DynamicObject,
        dry_run: DryRun,
    ) -> Result<DynamicObject, SubmissionError>;
}

pub struct KubeResourceClient {
    client: kube::Client,
}

impl KubeResourceClient {
    pub fn new(client: kube::Client) -> Self {
        Self { client }
    }

    fn api_for(&self, mapping: &TypeMapping, namespace: Option<&str>) -> Api<DynamicObject> {
        match namespace {
            Some(namespace) if mapping.is_namespaced() => {
                Api::namespaced_with(self.client.clone(), namespace, &mapping.resource)
            }
            _ => Api::all_with(self.client.clone(), &mapping.resource),
        }
    }
}

#[async_trait::async_trait]
impl ResourceClient for KubeResourceClient {
    async fn create(
        &self,
        mapping: &TypeMapping,
        namespace: Option<&str>,
        object: &DynamicObject,
        dry_run: DryRun,
    ) -> Result<DynamicObject, SubmissionError> {
        let params = PostParams {
            dry_run: dry_run.is_server(),
            ..Default::default()
        };

        self.api_for(mapping, namespace)
            .create(&params, object)
            .await
            .map_err(|e| submission_error(mapping, object, e))
    }
}

fn submission_error(
    mapping: &TypeMapping,
    object: &DynamicObject,
    error: kube::Error,
) -> SubmissionError {
    let kind = mapping.qualified_resource();
    let name = object
        .metadata
        .name
        .clone()
        .filter(|n| !n.is_empty())
        .or_else(|| object.metadata.generate_name.clone())
        .unwrap_or_default();

    match error {
        kube::Error::Api(response) => match response.code {
            409 => SubmissionError::Conflict { kind, name },
            401 | 403 => SubmissionError::Unauthorized {
                kind,
                name,
                message: response.message,
            },
            code => SubmissionError::Rejected {
                kind,
                name,
                code,
                message: response.message,
            },
        },
        source => SubmissionError::Transport { kind, name, source },
    }
}

/// Sends a single resolved object to the cluster, exactly once.
pub struct Submitter<C> {
    client: C,
}

impl<C: ResourceClient> Submitter<C> {
    pub fn new(client: C) -> Self {
        Self { client }
    }

    #[tracing::instrument(skip(self, info), fields(mapping = %info.mapping, name = %info.name), level = "debug")]
    pub async fn create(
        &self,
        info: &ResourceInfo,
        dry_run: DryRun,
    ) -> Result<DynamicObject, SubmissionError> {
        let mut object = info.object.clone();
        object.metadata.resource_version = None;

        tracing::debug!(
            source = info.source.as_str(),
            namespace = info.namespace.as_deref().unwrap_or_default(),
            "creating object"
        );

        self.client
            .create(&info.mapping, info.namespace.as_deref(), &object, dry_run)
            .await
    }

    #[cfg(test)]
    pub fn client(&self) -> &C {
        &self.client
    }
}


#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::{fake::InMemoryClient, *};
    use crate::scheme::Scheme;

    fn config_map(name: &str) -> anyhow::Result<ResourceInfo> {
        let (mapping, mut object) = Scheme::builtin().decode(
            "test",
            json!({
                "apiVersion": "v1",
                "kind": "ConfigMap",
                "metadata": { "name": name, "resourceVersion": "42" }
            }),
        )?;
        object.metadata.namespace = Some("default".into());

        Ok(ResourceInfo {
            source: "test".into(),
            mapping,
            namespace: Some("default".into()),
            name: name.into(),
            object,
        })
    }

    #[tokio::test]
    async fn test_create_clears_resource_version() -> anyhow::Result<()> {
        let submitter = Submitter::new(InMemoryClient::default());

        let created = submitter.create(&config_map("settings")?, DryRun::None).await?;

        assert_eq!(Some("settings".to_string()), created.metadata.name);
        assert_eq!(None, created.metadata.resource_version);
        assert_eq!(Some("uid-0".to_string()), created.metadata.uid);
        assert_eq!(1, submitter.client().calls());
        assert_eq!(1, submitter.client().stored().len());

        Ok(())
    }

    #[tokio::test]
    async fn test_second_create_conflicts() -> anyhow::Result<()> {
        let submitter = Submitter::new(InMemoryClient::default());
        let info = config_map("settings")?;

        submitter.create(&info, DryRun::None).await?;
        let err = submitter.create(&info, DryRun::None).await.unwrap_err();

        assert!(matches!(
            err,
            SubmissionError::Conflict { kind, name } if kind == "configmaps" && name == "settings"
        ));
        assert_eq!(2, submitter.client().calls());
        assert_eq!(
            "configmaps \"settings\" already exists",
            SubmissionError::Conflict {
                kind: "configmaps".into(),
                name: "settings".into()
            }
            .to_string()
        );

        Ok(())
    }

    #[tokio::test]
    async fn test_server_dry_run_does_not_persist() -> anyhow::Result<()> {
        let submitter = Submitter::new(InMemoryClient::default());
        let info = config_map("settings")?;

        submitter.create(&info, DryRun::Server).await?;
        submitter.create(&info, DryRun::None).await?;

        assert_eq!(1, submitter.client().stored().len());

        Ok(())
    }

    #[tokio::test]
    async fn test_unauthorized() -> anyhow::Result<()> {
        let submitter = Submitter::new(InMemoryClient::rejecting(403));

        let err = submitter
            .create(&config_map("settings")?, DryRun::None)
            .await
            .unwrap_err();

        assert!(matches!(err, SubmissionError::Unauthorized { .. }));

        Ok(())
    }

    #[test]
    fn test_api_errors_are_classified() -> anyhow::Result<()> {
        let info = config_map("settings")?;
        let response = |code: u16| {
            kube::Error::Api(kube::error::ErrorResponse {
                status: "Failure".into(),
                message: "nope".into(),
                reason: "Test".into(),
                code,
            })
        };

        assert!(matches!(
            submission_error(&info.mapping, &info.object, response(409)),
            SubmissionError::Conflict { .. }
        ));
        assert!(matches!(
            submission_error(&info.mapping, &info.object, response(401)),
            SubmissionError::Unauthorized { .. }
        ));
        assert!(matches!(
            submission_error(&info.mapping, &info.object, response(422)),
            SubmissionError::Rejected { code: 422, .. }
        ));

        Ok(())
    }

    #[test]
    fn test_api_errors_name_generated_objects() -> anyhow::Result<()> {
        let mut info = config_map("settings")?;
        info.object.metadata.name = Some(String::new());
        info.object.metadata.generate_name = Some("settings-".into());

        let err = submission_error(
            &info.mapping,
            &info.object,
            kube::Error::Api(kube::error::ErrorResponse {
                status: "Failure".into(),
                message: "exists".into(),
                reason: "AlreadyExists".into(),
                code: 409,
            }),
        );

        assert!(matches!(
            err,
            SubmissionError::Conflict { name, .. } if name == "settings-"
        ));

        Ok(())
    }
}
