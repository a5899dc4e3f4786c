use std::io::{IsTerminal, Write};

use anyhow::Context;

use crate::{
    client_config::{ClientConfig, ClientConfigState},
    error::{ConfigurationError, Error, ResolutionError, ValidationError},
    printer::{OutputFormat, ResourcePrinter},
    resource::{FilenameOptions, Resolver},
    scheme::{Scheme, SchemeState},
    state::State,
    submitter::{DryRun, KubeResourceClient, ResourceClient, Submitter},
};

const FOO_LONG: &str = "Create the resource described in a file.

The file is decoded against the kinds this client knows, the object is placed
in the current namespace unless it names its own, and a single create request
is sent to the cluster.";

const FOO_EXAMPLE: &str = "Examples:
  # Create the resource in foo-resource.yaml
  kctl foo --count 3 --filename foo-resource.yaml

  # Read the resource from stdin and print it back as yaml
  cat foo-resource.yaml | kctl foo -f - -o yaml";

/// Create a resource from a file
#[derive(clap::Parser, Debug)]
#[command(long_about = FOO_LONG, after_help = FOO_EXAMPLE)]
pub struct FooCommand {
    /// Number of copies requested, has to be zero or more
    #[arg(long, short = 'c', default_value_t = 0, allow_negative_numbers = true)]
    pub(crate) count: i64,

    #[command(flatten)]
    pub(crate) filenames: FilenameOptions,

    /// Output format. One of: name, json, yaml, jsonpath=TEMPLATE
    #[arg(long, short = 'o', default_value = "name")]
    pub(crate) output: OutputFormat,

    /// Keep metadata.managedFields when printing objects in json, yaml or jsonpath
    #[arg(long)]
    pub(crate) show_managed_fields: bool,
}

impl FooCommand {
    #[tracing::instrument(skip(self, state), level = "trace")]
    pub async fn execute(&self, state: &State) -> anyhow::Result<()> {
        let mut options =
            FooOptions::new(self.count, self.filenames.clone(), self.output.clone())
                .with_managed_fields(self.show_managed_fields);

        let config = options
            .complete(state)
            .context("failed to load client configuration")?;
        options.validate()?;

        let client = config.client().await?;
        let submitter = Submitter::new(KubeResourceClient::new(client));
        let printer = options
            .printer()
            .with_color(std::io::stdout().is_terminal());

        options
            .run(state.scheme(), &submitter, &printer, &mut std::io::stdout())
            .await?;

        Ok(())
    }
}

#[derive(Debug)]
pub struct FooOptions {
    count: i64,
    filenames: FilenameOptions,
    output: OutputFormat,
    show_managed_fields: bool,
    dry_run: DryRun,

    namespace: String,
    enforce_namespace: bool,
}

impl FooOptions {
    pub fn new(count: i64, filenames: FilenameOptions, output: OutputFormat) -> Self {
        Self {
            count,
            filenames,
            output,
            show_managed_fields: false,
            dry_run: DryRun::None,
            namespace: String::new(),
            enforce_namespace: false,
        }
    }

    pub fn with_managed_fields(mut self, show_managed_fields: bool) -> Self {
        self.show_managed_fields = show_managed_fields;
        self
    }

    /// Loads the client configuration and takes the target namespace from it.
    pub fn complete(
        &mut self,
        state: &impl ClientConfigState,
    ) -> Result<ClientConfig, ConfigurationError> {
        let config = state.client_config()?;

        (self.namespace, self.enforce_namespace) = config.namespace();

        tracing::debug!(
            context = config.context().unwrap_or_default(),
            namespace = self.namespace,
            enforce_namespace = self.enforce_namespace,
            "completed options"
        );

        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.count < 0 {
            return Err(ValidationError::NegativeCount(self.count));
        }

        Ok(())
    }

    pub fn printer(&self) -> ResourcePrinter {
        ResourcePrinter::new(self.output.clone(), "created")
            .with_managed_fields(self.show_managed_fields)
    }

    /// Resolves the files, creates the first object that resolves and prints it.
    ///
    /// Locations that cannot be expanded fail the run before anything is sent.
    /// Objects that fail to resolve before the first good one are logged and
    /// skipped; when nothing resolves the first failure is returned.
    pub async fn run<C: ResourceClient>(
        &self,
        scheme: &Scheme,
        submitter: &Submitter<C>,
        printer: &ResourcePrinter,
        out: &mut dyn Write,
    ) -> Result<(), Error> {
        tracing::debug!(count = self.count, "running foo");

        let resolver = Resolver::new(scheme, &self.namespace, self.enforce_namespace);
        let mut first_error: Option<ResolutionError> = None;

        for item in resolver.visit(&self.filenames)? {
            let info = match item {
                Ok(info) => info,
                Err(error) => {
                    tracing::warn!(error = %error, "skipping object that failed to resolve");
                    first_error.get_or_insert(error);
                    continue;
                }
            };

            let created = submitter.create(&info, self.dry_run).await?;

            printer
                .print(&info.mapping, &created, self.dry_run, out)
                .map_err(Error::Output)?;

            return Ok(());
        }

        Err(first_error.unwrap_or(ResolutionError::NoObjects).into())
    }
}
