use std::path::{Path, PathBuf};

use kube::api::DynamicObject;
use serde::Deserialize;

use crate::{
    error::ResolutionError,
    scheme::{Scheme, TypeMapping},
};

const FILE_EXTENSIONS: [&str; 3] = ["json", "yaml", "yml"];
const STDIN_SOURCE: &str = "STDIN";

#[derive(clap::Args, Clone, Debug, Default)]
pub struct FilenameOptions {
    /// Filename, directory, or '-' for stdin, containing the resource to create
    #[arg(long, short = 'f', required = true)]
    pub filename: Vec<String>,

    /// Process the directory used in -f, --filename recursively
    #[arg(long, short = 'R')]
    pub recursive: bool,
}

/// A decoded object together with the mapping used to create it.
#[derive(Debug, Clone)]
pub struct ResourceInfo {
    pub source: String,
    pub mapping: TypeMapping,
    pub namespace: Option<String>,
    /// `metadata.name`, or the `generateName` prefix when the server picks the name.
    pub name: String,
    pub object: DynamicObject,
}

#[derive(Debug, Clone, PartialEq)]
enum Source {
    Stdin,
    File(PathBuf),
}

impl Source {
    fn name(&self) -> String {
        match self {
            Source::Stdin => STDIN_SOURCE.to_string(),
            Source::File(path) => path.display().to_string(),
        }
    }

    fn read(&self) -> Result<String, ResolutionError> {
        let content = match self {
            Source::Stdin => std::io::read_to_string(std::io::stdin()),
            Source::File(path) => std::fs::read_to_string(path),
        };

        content.map_err(|source| ResolutionError::Read {
            source_name: self.name(),
            source,
        })
    }
}

pub struct Resolver<'a> {
    scheme: &'a Scheme,
    namespace: String,
    enforce_namespace: bool,
}

impl<'a> Resolver<'a> {
    pub fn new(scheme: &'a Scheme, namespace: impl Into<String>, enforce_namespace: bool) -> Self {
        Self {
            scheme,
            namespace: namespace.into(),
            enforce_namespace,
        }
    }

    /// Lazily resolves every object behind the given locations.
    ///
    /// Locations are expanded up front, so a missing path or a bad pattern
    /// fails before anything is read. Files are only read once iteration
    /// reaches them. A failing file or document shows up as an `Err` item and
    /// the sequence carries on.
    pub fn visit<'b>(
        &'b self,
        options: &'b FilenameOptions,
    ) -> Result<impl Iterator<Item = Result<ResourceInfo, ResolutionError>> + 'b, ResolutionError>
    {
        tracing::trace!(
            versions = self.scheme.prioritized_versions().join(","),
            "resolving against known versions"
        );

        let sources = options.sources()?;

        Ok(sources
            .into_iter()
            .flat_map(|source| read_documents(&source))
            .map(move |document| {
                document.and_then(|(source_name, value)| self.resolve(&source_name, value))
            }))
    }

    fn resolve(
        &self,
        source_name: &str,
        value: serde_json::Value,
    ) -> Result<ResourceInfo, ResolutionError> {
        let (mapping, mut object) = self.scheme.decode(source_name, value)?;

        let namespace = if mapping.is_namespaced() {
            let namespace = match object.metadata.namespace.as_deref().filter(|n| !n.is_empty()) {
                Some(object_namespace)
                    if self.enforce_namespace && object_namespace != self.namespace =>
                {
                    return Err(ResolutionError::NamespaceMismatch {
                        object_namespace: object_namespace.to_string(),
                        namespace: self.namespace.clone(),
                    });
                }
                Some(object_namespace) => object_namespace.to_string(),
                None => self.namespace.clone(),
            };

            object.metadata.namespace = Some(namespace.clone());

            Some(namespace)
        } else {
            object.metadata.namespace = None;
            None
        };

        object.metadata.name = object.metadata.name.take().filter(|n| !n.is_empty());

        let name = object
            .metadata
            .name
            .clone()
            .or_else(|| object.metadata.generate_name.clone())
            .filter(|n| !n.is_empty())
            .ok_or_else(|| ResolutionError::MissingName {
                source_name: source_name.into(),
            })?;

        tracing::trace!(
            source = source_name,
            mapping = mapping.to_string(),
            name = name.as_str(),
            "resolved object"
        );

        Ok(ResourceInfo {
            source: source_name.into(),
            mapping,
            namespace,
            name,
            object,
        })
    }
}

impl FilenameOptions {
    fn sources(&self) -> Result<Vec<Source>, ResolutionError> {
        let mut sources = Vec::new();

        for location in &self.filename {
            if location == "-" {
                if sources.contains(&Source::Stdin) {
                    return Err(ResolutionError::StdinInUse);
                }

                sources.push(Source::Stdin);
                continue;
            }

            sources.extend(expand(location, self.recursive)?);
        }

        Ok(sources)
    }
}

/// Turns a location into files. Locations that do not exist are tried as a
/// glob pattern before giving up.
fn expand(location: &str, recursive: bool) -> Result<Vec<Source>, ResolutionError> {
    let path = PathBuf::from(location);
    if path.exists() {
        return expand_path(path, recursive);
    }

    let matches = glob::glob(location)
        .map_err(|source| ResolutionError::InvalidPattern {
            pattern: location.into(),
            source,
        })?
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| ResolutionError::Read {
            source_name: e.path().display().to_string(),
            source: e.into_error(),
        })?;

    if matches.is_empty() {
        return Err(ResolutionError::PathNotFound(path));
    }

    tracing::debug!(pattern = location, matches = matches.len(), "expanded pattern");

    let mut sources = Vec::new();
    for path in matches {
        sources.extend(expand_path(path, recursive)?);
    }

    Ok(sources)
}

fn expand_path(path: PathBuf, recursive: bool) -> Result<Vec<Source>, ResolutionError> {
    if !path.is_dir() {
        return Ok(vec![Source::File(path)]);
    }

    let max_depth = if recursive { usize::MAX } else { 1 };
    let mut sources = Vec::new();

    for entry in walkdir::WalkDir::new(&path)
        .max_depth(max_depth)
        .follow_links(true)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|source| ResolutionError::Walk {
            path: path.clone(),
            source,
        })?;

        if !entry.file_type().is_file() || !has_recognized_extension(entry.path()) {
            continue;
        }

        sources.push(Source::File(entry.into_path()));
    }

    if sources.is_empty() {
        return Err(ResolutionError::NoRecognizedFiles(path));
    }

    Ok(sources)
}

fn has_recognized_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| FILE_EXTENSIONS.contains(&e))
}

fn read_documents(source: &Source) -> Vec<Result<(String, serde_json::Value), ResolutionError>> {
    let source_name = source.name();

    tracing::debug!(source = source_name, "reading resources");

    match source.read() {
        Ok(content) => parse_documents(&source_name, &content)
            .into_iter()
            .map(|document| document.map(|value| (source_name.clone(), value)))
            .collect(),
        Err(e) => vec![Err(e)],
    }
}

/// Splits a stream of YAML (or JSON) documents into single objects, with
/// list kinds flattened into their items. Parsing stops at the first
/// broken document.
fn parse_documents(
    source_name: &str,
    content: &str,
) -> Vec<Result<serde_json::Value, ResolutionError>> {
    let mut documents = Vec::new();

    for document in serde_yaml::Deserializer::from_str(content) {
        match serde_json::Value::deserialize(document) {
            Ok(serde_json::Value::Null) => continue,
            Ok(value) => flatten(value, &mut documents),
            Err(source) => {
                documents.push(Err(ResolutionError::Parse {
                    source_name: source_name.into(),
                    source,
                }));
                break;
            }
        }
    }

    documents
}

fn flatten(
    value: serde_json::Value,
    documents: &mut Vec<Result<serde_json::Value, ResolutionError>>,
) {
    if !is_list(&value) {
        documents.push(Ok(value));
        return;
    }

    if let serde_json::Value::Object(mut list) = value
        && let Some(serde_json::Value::Array(items)) = list.remove("items")
    {
        for item in items {
            flatten(item, documents);
        }
    }
}

fn is_list(value: &serde_json::Value) -> bool {
    let is_list_kind = value
        .get("kind")
        .and_then(|k| k.as_str())
        .is_some_and(|k| k.ends_with("List"));

    is_list_kind && value.get("items").is_some_and(|i| i.is_array())
}
