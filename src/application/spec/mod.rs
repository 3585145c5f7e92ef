//! Specification intake and parsing.
//!
//! Intake turns whatever a client submitted into a validated document plus a detected
//! [`SpecFormat`]. Parsing turns a stored document into a [`ParsedSpecification`], the
//! format-neutral view the documentation generator and quality scorer work from.

mod graphql;
mod intake;
mod json_schema;
mod openapi;

pub use intake::{
    NormalizedSpecification, decode_text, detect_format, format_from_file_name, normalize,
    validate,
};

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::domain::types::SpecFormat;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum SpecError {
    #[error("invalid specification: {0}")]
    Validation(String),
    #[error("failed to parse {format} specification: {message}")]
    Parse { format: SpecFormat, message: String },
}

impl SpecError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn parse(format: SpecFormat, message: impl Into<String>) -> Self {
        Self::Parse {
            format,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParsedSpecification {
    pub format: SpecFormat,
    pub title: String,
    pub version: String,
    pub description: Option<String>,
    pub base_url: Option<String>,
    pub endpoints: Vec<Endpoint>,
    pub schemas: Vec<SchemaDefinition>,
    pub tags: Vec<String>,
    pub servers: Vec<String>,
    /// Whether the document declares any authentication scheme.
    pub has_security: bool,
}

impl ParsedSpecification {
    fn empty(format: SpecFormat, title: impl Into<String>) -> Self {
        Self {
            format,
            title: title.into(),
            version: "1.0.0".to_string(),
            description: None,
            base_url: None,
            endpoints: Vec::new(),
            schemas: Vec::new(),
            tags: Vec::new(),
            servers: Vec::new(),
            has_security: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Endpoint {
    pub path: String,
    pub method: String,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub operation_id: Option<String>,
    pub tags: Vec<String>,
    pub parameters: Vec<Parameter>,
    pub request_body: Option<Value>,
    pub responses: Vec<ResponseSpec>,
}

impl Endpoint {
    fn new(method: &str, path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            method: method.to_ascii_uppercase(),
            summary: None,
            description: None,
            operation_id: None,
            tags: Vec::new(),
            parameters: Vec::new(),
            request_body: None,
            responses: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Parameter {
    pub name: String,
    pub location: String,
    pub required: bool,
    pub schema_type: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResponseSpec {
    pub status: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SchemaDefinition {
    pub name: String,
    pub schema_type: Option<String>,
    pub description: Option<String>,
    pub properties: Vec<PropertyDefinition>,
    pub required: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PropertyDefinition {
    pub name: String,
    pub property_type: Option<String>,
    pub description: Option<String>,
}

/// Parse a stored, already validated document into its format-neutral view.
pub fn parse_specification(
    format: SpecFormat,
    document: &Value,
) -> Result<ParsedSpecification, SpecError> {
    match format {
        SpecFormat::OpenApi => openapi::parse(document),
        SpecFormat::Graphql => graphql::parse(document),
        SpecFormat::JsonSchema => json_schema::parse(document),
    }
}

fn string_field(value: &Value, key: &str) -> Option<String> {
    value
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn string_list(value: &Value, key: &str) -> Vec<String> {
    value
        .get(key)
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// Reads an object-shaped JSON Schema into a named definition.
fn schema_definition(name: &str, schema: &Value) -> SchemaDefinition {
    let properties = schema
        .get("properties")
        .and_then(Value::as_object)
        .map(|props| {
            props
                .iter()
                .map(|(prop_name, prop)| PropertyDefinition {
                    name: prop_name.clone(),
                    property_type: schema_type(prop),
                    description: string_field(prop, "description"),
                })
                .collect()
        })
        .unwrap_or_default();

    SchemaDefinition {
        name: name.to_string(),
        schema_type: schema_type(schema),
        description: string_field(schema, "description"),
        properties,
        required: string_list(schema, "required"),
    }
}

fn schema_type(schema: &Value) -> Option<String> {
    match schema.get("type") {
        Some(Value::String(kind)) => Some(kind.clone()),
        Some(Value::Array(kinds)) => {
            let joined: Vec<&str> = kinds.iter().filter_map(Value::as_str).collect();
            (!joined.is_empty()).then(|| joined.join(" | "))
        }
        _ => schema
            .get("$ref")
            .and_then(Value::as_str)
            .and_then(|reference| reference.rsplit('/').next())
            .map(str::to_string),
    }
}
