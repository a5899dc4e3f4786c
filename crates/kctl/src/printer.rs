use std::{io::Write, str::FromStr};

use anyhow::Context;
use colored_json::{ColorMode, ToColoredJson};
use kube::api::DynamicObject;
use serde_json_path::JsonPath;

use crate::{scheme::TypeMapping, submitter::DryRun};

const JSONPATH_PREFIX: &str = "jsonpath=";

#[derive(Clone, Debug, Default, PartialEq)]
pub enum OutputFormat {
    #[default]
    Name,
    Json,
    Yaml,
    JsonPath(JsonPathTemplate),
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "name" => Ok(Self::Name),
            "json" => Ok(Self::Json),
            "yaml" => Ok(Self::Yaml),
            _ => match s.strip_prefix(JSONPATH_PREFIX) {
                Some(template) => JsonPathTemplate::parse(template).map(Self::JsonPath),
                None => Err(format!(
                    "unable to match a printer suitable for the output format \"{s}\", allowed formats are: name, json, yaml, jsonpath"
                )),
            },
        }
    }
}

#[derive(Clone, Debug)]
enum Segment {
    Text(String),
    Path(JsonPath),
}

/// A kubectl style template such as `{.metadata.name}{"\n"}`.
///
/// Expressions between braces are relative to the object and evaluated as
/// JSONPath; quoted expressions are printed as they are.
#[derive(Clone, Debug)]
pub struct JsonPathTemplate {
    source: String,
    segments: Vec<Segment>,
}

impl PartialEq for JsonPathTemplate {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

impl JsonPathTemplate {
    pub fn parse(template: &str) -> Result<Self, String> {
        let mut segments = Vec::new();
        let mut rest = template;

        while let Some(start) = rest.find('{') {
            if start > 0 {
                segments.push(Segment::Text(rest[..start].to_string()));
            }

            let expression = &rest[start + 1..];
            let end = closing_brace(expression)
                .ok_or_else(|| format!("unclosed action in template \"{template}\""))?;

            segments.push(parse_expression(expression[..end].trim())?);
            rest = &expression[end + 1..];
        }

        if !rest.is_empty() {
            segments.push(Segment::Text(rest.to_string()));
        }

        Ok(Self {
            source: template.to_string(),
            segments,
        })
    }

    fn render(&self, object: &serde_json::Value) -> anyhow::Result<String> {
        let mut output = String::new();

        for segment in &self.segments {
            match segment {
                Segment::Text(text) => output.push_str(text),
                Segment::Path(path) => {
                    let values = path
                        .query(object)
                        .all()
                        .into_iter()
                        .map(|value| match value {
                            serde_json::Value::String(s) => Ok(s.clone()),
                            other => serde_json::to_string(other),
                        })
                        .collect::<Result<Vec<_>, _>>()?;

                    output.push_str(&values.join(" "));
                }
            }
        }

        Ok(output)
    }
}

/// Finds the `}` closing an expression, skipping over quoted text.
fn closing_brace(expression: &str) -> Option<usize> {
    let mut quoted = false;
    let mut escaped = false;

    for (i, c) in expression.char_indices() {
        match c {
            _ if escaped => escaped = false,
            '\\' if quoted => escaped = true,
            '"' => quoted = !quoted,
            '}' if !quoted => return Some(i),
            _ => {}
        }
    }

    None
}

fn parse_expression(expression: &str) -> Result<Segment, String> {
    if expression.starts_with('"') {
        return serde_json::from_str::<String>(expression)
            .map(Segment::Text)
            .map_err(|e| format!("invalid string {expression}: {e}"));
    }

    let path = match expression.chars().next() {
        Some('$') => expression.to_string(),
        Some('.') | Some('[') => format!("${expression}"),
        _ => return Err(format!("unrecognized jsonpath expression \"{expression}\"")),
    };

    JsonPath::parse(&path)
        .map(Segment::Path)
        .map_err(|e| format!("invalid jsonpath expression \"{expression}\": {e}"))
}

pub struct ResourcePrinter {
    format: OutputFormat,
    operation: String,
    color: bool,
    show_managed_fields: bool,
}

impl ResourcePrinter {
    pub fn new(format: OutputFormat, operation: impl Into<String>) -> Self {
        Self {
            format,
            operation: operation.into(),
            color: false,
            show_managed_fields: false,
        }
    }

    pub fn with_color(mut self, color: bool) -> Self {
        self.color = color;
        self
    }

    pub fn with_managed_fields(mut self, show_managed_fields: bool) -> Self {
        self.show_managed_fields = show_managed_fields;
        self
    }

    pub fn print(
        &self,
        mapping: &TypeMapping,
        object: &DynamicObject,
        dry_run: DryRun,
        out: &mut dyn Write,
    ) -> anyhow::Result<()> {
        let mut object = object.clone();
        if !self.show_managed_fields {
            object.metadata.managed_fields = None;
        }

        match &self.format {
            OutputFormat::Name => {
                let name = object.metadata.name.as_deref().unwrap_or_default();
                let suffix = if dry_run.is_server() {
                    " (server dry run)"
                } else {
                    ""
                };

                writeln!(
                    out,
                    "{}/{} {}{}",
                    mapping.qualified_kind(),
                    name,
                    self.operation,
                    suffix
                )?;
            }
            OutputFormat::Json => {
                let output = if self.color {
                    serde_json::to_string_pretty(&object)?.to_colored_json(ColorMode::On)?
                } else {
                    serde_json::to_string_pretty(&object)?
                };

                writeln!(out, "{output}")?;
            }
            OutputFormat::Yaml => {
                let output = serde_yaml::to_string(&object).context("failed to encode object")?;

                out.write_all(output.as_bytes())?;
            }
            OutputFormat::JsonPath(template) => {
                let value = serde_json::to_value(&object).context("failed to encode object")?;

                out.write_all(template.render(&value)?.as_bytes())?;
            }
        }

        out.flush()?;

        Ok(())
    }
}
