use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

use super::SpecError;
use crate::domain::types::SpecFormat;

const GRAPHQL_DEFINITION_KEYWORDS: [&str; 7] = [
    "type",
    "schema",
    "input",
    "enum",
    "interface",
    "scalar",
    "union",
];

/// A submitted specification after decoding, format resolution and validation.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedSpecification {
    pub format: SpecFormat,
    /// JSON document, or a JSON string holding GraphQL SDL.
    pub document: Value,
    pub hash: String,
}

/// Decode, resolve the format of, and validate a submitted specification.
///
/// `source_hint` is the URL or file name the document came from, used only when the
/// caller did not declare a format and the content alone is not conclusive.
pub fn normalize(
    raw: Value,
    declared: Option<SpecFormat>,
    source_hint: Option<&str>,
) -> Result<NormalizedSpecification, SpecError> {
    let document = match raw {
        Value::String(text) if declared == Some(SpecFormat::Graphql) => {
            let trimmed = text.trim();
            if trimmed.is_empty() {
                return Err(SpecError::validation("specification is empty"));
            }
            Value::String(trimmed.to_string())
        }
        Value::String(text) => decode_text(&text)?,
        Value::Object(map) => Value::Object(map),
        Value::Null => return Err(SpecError::validation("specification is required")),
        _ => {
            return Err(SpecError::validation(
                "specification must be an object or a string",
            ));
        }
    };

    let format = match declared {
        Some(format) => format,
        None => detect_format(&document, source_hint).ok_or_else(|| {
            SpecError::validation(
                "could not detect the specification format; set `spec_format` explicitly",
            )
        })?,
    };

    let document = validate(format, document)?;
    let hash = specification_hash(&document);

    Ok(NormalizedSpecification {
        format,
        document,
        hash,
    })
}

/// Decode submitted text as JSON, then YAML. A YAML mapping is only kept when it passes
/// as OpenAPI or JSON Schema, since one-line SDL such as `type Query { ok: Boolean }`
/// also reads as a mapping. Everything else stays verbatim for the GraphQL check.
pub fn decode_text(text: &str) -> Result<Value, SpecError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(SpecError::validation("specification is empty"));
    }

    if let Ok(value @ Value::Object(_)) = serde_json::from_str::<Value>(trimmed) {
        return Ok(value);
    }

    if let Ok(value @ Value::Object(_)) = serde_yaml::from_str::<Value>(trimmed)
        && [SpecFormat::OpenApi, SpecFormat::JsonSchema]
            .into_iter()
            .any(|format| validate(format, value.clone()).is_ok())
    {
        return Ok(value);
    }

    Ok(Value::String(trimmed.to_string()))
}

/// Guess the format of a decoded document, trying a file-name hint first.
pub fn detect_format(document: &Value, source_hint: Option<&str>) -> Option<SpecFormat> {
    if let Some(hinted) = source_hint.and_then(format_from_file_name)
        && validate(hinted, document.clone()).is_ok()
    {
        return Some(hinted);
    }

    detection_order(document)
        .into_iter()
        .find(|candidate| validate(*candidate, document.clone()).is_ok())
}

/// Map a URL or file name onto a likely format using its extension and name.
pub fn format_from_file_name(source: &str) -> Option<SpecFormat> {
    let without_query = source.split(['?', '#']).next().unwrap_or(source);
    let name = without_query
        .rsplit('/')
        .next()
        .unwrap_or(without_query)
        .to_ascii_lowercase();

    if name.ends_with(".graphql") || name.ends_with(".gql") {
        return Some(SpecFormat::Graphql);
    }

    let structured = [".json", ".yaml", ".yml"]
        .iter()
        .any(|ext| name.ends_with(ext));
    if !structured {
        return None;
    }

    if ["openapi", "swagger", "api"]
        .iter()
        .any(|pattern| name.contains(pattern))
    {
        return Some(SpecFormat::OpenApi);
    }
    if name.ends_with(".json") && name.contains("schema") {
        return Some(SpecFormat::JsonSchema);
    }
    None
}

fn detection_order(document: &Value) -> Vec<SpecFormat> {
    let mut order = Vec::with_capacity(3);
    if let Value::Object(map) = document {
        if ["openapi", "swagger", "info", "paths"]
            .iter()
            .any(|key| map.contains_key(*key))
        {
            order.push(SpecFormat::OpenApi);
        }
        if ["$schema", "definitions", "properties"]
            .iter()
            .any(|key| map.contains_key(*key))
            && !map.contains_key("paths")
        {
            order.push(SpecFormat::JsonSchema);
        }
    }
    for format in [
        SpecFormat::OpenApi,
        SpecFormat::JsonSchema,
        SpecFormat::Graphql,
    ] {
        if !order.contains(&format) {
            order.push(format);
        }
    }
    order
}

/// Check a decoded document against the structural rules of `format`, returning the
/// document in its stored shape.
pub fn validate(format: SpecFormat, document: Value) -> Result<Value, SpecError> {
    match format {
        SpecFormat::OpenApi => validate_openapi(document),
        SpecFormat::JsonSchema => validate_json_schema(document),
        SpecFormat::Graphql => validate_graphql(document),
    }
}

fn validate_openapi(document: Value) -> Result<Value, SpecError> {
    let Value::Object(map) = &document else {
        return Err(SpecError::validation(
            "OpenAPI specification must be a JSON or YAML object",
        ));
    };

    if !map.contains_key("openapi") && !map.contains_key("swagger") {
        return Err(SpecError::validation(
            "OpenAPI specification must declare an `openapi` or `swagger` version",
        ));
    }

    if let Some(info) = map.get("info")
        && !info.is_object()
    {
        return Err(SpecError::validation("OpenAPI `info` must be an object"));
    }

    if let Some(paths) = map.get("paths")
        && !paths.is_object()
    {
        return Err(SpecError::validation("OpenAPI `paths` must be an object"));
    }

    Ok(document)
}

fn validate_json_schema(document: Value) -> Result<Value, SpecError> {
    let Value::Object(map) = &document else {
        return Err(SpecError::validation("JSON Schema must be an object"));
    };

    if !["$schema", "type", "properties", "definitions"]
        .iter()
        .any(|key| map.contains_key(*key))
    {
        return Err(SpecError::validation(
            "JSON Schema must contain one of `$schema`, `type`, `properties` or `definitions`",
        ));
    }

    if let Some(properties) = map.get("properties")
        && !properties.is_object()
    {
        return Err(SpecError::validation(
            "JSON Schema `properties` must be an object",
        ));
    }

    Ok(document)
}

fn validate_graphql(document: Value) -> Result<Value, SpecError> {
    let sdl = match document {
        Value::String(sdl) => sdl,
        Value::Object(map) => graphql_sdl_from_object(map)?,
        _ => {
            return Err(SpecError::validation(
                "GraphQL specification must be SDL text",
            ));
        }
    };

    check_graphql_sdl(&sdl)?;
    Ok(Value::String(sdl))
}

fn graphql_sdl_from_object(mut map: Map<String, Value>) -> Result<String, SpecError> {
    for key in ["schema", "data", "sdl"] {
        if let Some(Value::String(sdl)) = map.remove(key) {
            return Ok(sdl);
        }
    }
    Err(SpecError::validation(
        "GraphQL specification object must carry SDL text under `schema` or `data`",
    ))
}

fn check_graphql_sdl(sdl: &str) -> Result<(), SpecError> {
    let stripped = strip_graphql_comments(sdl);

    let has_definition = stripped.lines().any(|line| {
        let mut words = line.split_whitespace();
        let first = match words.next() {
            Some("extend") => words.next(),
            other => other,
        };
        first.is_some_and(|word| {
            let keyword = word.trim_end_matches('{');
            GRAPHQL_DEFINITION_KEYWORDS.contains(&keyword)
        })
    });
    if !has_definition {
        return Err(SpecError::validation(
            "GraphQL SDL must contain at least one type, schema, input, enum, interface, scalar or union definition",
        ));
    }

    let mut depth: i64 = 0;
    for ch in stripped.chars() {
        match ch {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth < 0 {
                    return Err(SpecError::validation("GraphQL SDL has unbalanced braces"));
                }
            }
            _ => {}
        }
    }
    if depth != 0 {
        return Err(SpecError::validation("GraphQL SDL has unbalanced braces"));
    }

    Ok(())
}

/// Drop `#` comments and quoted descriptions so they do not count towards structure.
pub(super) fn strip_graphql_comments(sdl: &str) -> String {
    let mut out = String::with_capacity(sdl.len());
    let mut chars = sdl.chars().peekable();
    let mut in_comment = false;
    let mut in_string = false;

    while let Some(ch) = chars.next() {
        if in_comment {
            if ch == '\n' {
                in_comment = false;
                out.push('\n');
            }
            continue;
        }
        if in_string {
            if ch == '\\' {
                chars.next();
            } else if ch == '"' {
                in_string = false;
            } else if ch == '\n' {
                out.push('\n');
            }
            continue;
        }
        match ch {
            '#' => in_comment = true,
            '"' => in_string = true,
            _ => out.push(ch),
        }
    }
    out
}

/// Hex SHA-256 of the canonical document text. `serde_json` maps are ordered, so equal
/// documents hash equally regardless of submitted key order.
fn specification_hash(document: &Value) -> String {
    let canonical = match document {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    };
    hex::encode(Sha256::digest(canonical.as_bytes()))
}
