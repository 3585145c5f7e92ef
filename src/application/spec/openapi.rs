use serde_json::Value;

use super::{
    Endpoint, Parameter, ParsedSpecification, ResponseSpec, SpecError, schema_definition,
    schema_type, string_field, string_list,
};
use crate::domain::types::SpecFormat;

const HTTP_METHODS: [&str; 7] = ["get", "post", "put", "patch", "delete", "head", "options"];

pub(super) fn parse(document: &Value) -> Result<ParsedSpecification, SpecError> {
    let root = document
        .as_object()
        .ok_or_else(|| SpecError::parse(SpecFormat::OpenApi, "document is not an object"))?;

    let info = root.get("info").cloned().unwrap_or(Value::Null);
    let mut parsed = ParsedSpecification::empty(
        SpecFormat::OpenApi,
        string_field(&info, "title").unwrap_or_else(|| "API Documentation".to_string()),
    );
    if let Some(version) = string_field(&info, "version") {
        parsed.version = version;
    }
    parsed.description = string_field(&info, "description");

    parsed.servers = root
        .get("servers")
        .and_then(Value::as_array)
        .map(|servers| {
            servers
                .iter()
                .filter_map(|server| string_field(server, "url"))
                .collect()
        })
        .unwrap_or_default();
    parsed.base_url = parsed.servers.first().cloned().or_else(|| swagger_base_url(document));

    parsed.tags = root
        .get("tags")
        .and_then(Value::as_array)
        .map(|tags| tags.iter().filter_map(|tag| string_field(tag, "name")).collect())
        .unwrap_or_default();

    if let Some(paths) = root.get("paths") {
        let paths = paths.as_object().ok_or_else(|| {
            SpecError::parse(SpecFormat::OpenApi, "`paths` must be an object")
        })?;
        for (path, item) in paths {
            let shared_parameters = parameters(item.get("parameters"));
            for method in HTTP_METHODS {
                if let Some(operation) = item.get(method) {
                    parsed
                        .endpoints
                        .push(endpoint(method, path, operation, &shared_parameters));
                }
            }
        }
    }

    let schemas = document
        .pointer("/components/schemas")
        .or_else(|| root.get("definitions"))
        .and_then(Value::as_object);
    if let Some(schemas) = schemas {
        parsed.schemas = schemas
            .iter()
            .map(|(name, schema)| schema_definition(name, schema))
            .collect();
    }

    parsed.has_security = document.pointer("/components/securitySchemes").is_some()
        || root.contains_key("securityDefinitions")
        || root.contains_key("security");

    Ok(parsed)
}

fn endpoint(method: &str, path: &str, operation: &Value, shared: &[Parameter]) -> Endpoint {
    let mut endpoint = Endpoint::new(method, path);
    endpoint.summary = string_field(operation, "summary");
    endpoint.description = string_field(operation, "description");
    endpoint.operation_id = string_field(operation, "operationId");
    endpoint.tags = string_list(operation, "tags");

    let own = parameters(operation.get("parameters"));
    let mut merged: Vec<Parameter> = shared
        .iter()
        .filter(|p| !own.iter().any(|o| o.name == p.name && o.location == p.location))
        .cloned()
        .collect();
    merged.extend(own);
    endpoint.parameters = merged;

    endpoint.request_body = operation.get("requestBody").cloned();
    endpoint.responses = operation
        .get("responses")
        .and_then(Value::as_object)
        .map(|responses| {
            responses
                .iter()
                .map(|(status, response)| ResponseSpec {
                    status: status.clone(),
                    description: string_field(response, "description"),
                })
                .collect()
        })
        .unwrap_or_default();
    endpoint
}

fn parameters(value: Option<&Value>) -> Vec<Parameter> {
    value
        .and_then(Value::as_array)
        .map(|params| {
            params
                .iter()
                .filter_map(|param| {
                    let name = string_field(param, "name")?;
                    let location = string_field(param, "in").unwrap_or_else(|| "query".into());
                    Some(Parameter {
                        required: param
                            .get("required")
                            .and_then(Value::as_bool)
                            .unwrap_or(location == "path"),
                        schema_type: param
                            .get("schema")
                            .and_then(schema_type)
                            .or_else(|| string_field(param, "type")),
                        description: string_field(param, "description"),
                        name,
                        location,
                    })
                })
                .collect()
        })
        .unwrap_or_default()
}

/// Swagger 2.0 splits the base URL into `schemes`, `host` and `basePath`.
fn swagger_base_url(document: &Value) -> Option<String> {
    let host = string_field(document, "host")?;
    let scheme = document
        .get("schemes")
        .and_then(Value::as_array)
        .and_then(|schemes| schemes.first())
        .and_then(Value::as_str)
        .unwrap_or("https");
    let base_path = string_field(document, "basePath").unwrap_or_default();
    Some(format!("{scheme}://{host}{base_path}"))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn reads_operations_parameters_and_schemas() {
        let doc = json!({
            "openapi": "3.0.0",
            "info": {"title": "Pet Store", "version": "2.1.0", "description": "Pets"},
            "servers": [{"url": "https://api.pets.test/v2"}],
            "paths": {
                "/pets/{id}": {
                    "parameters": [{"name": "id", "in": "path", "schema": {"type": "string"}}],
                    "get": {
                        "summary": "Fetch a pet",
                        "operationId": "getPet",
                        "tags": ["pets"],
                        "parameters": [{"name": "fields", "in": "query"}],
                        "responses": {"200": {"description": "ok"}, "404": {"description": "missing"}}
                    },
                    "delete": {"responses": {"204": {"description": "gone"}}}
                }
            },
            "components": {
                "schemas": {"Pet": {"type": "object", "required": ["id"], "properties": {"id": {"type": "string"}}}},
                "securitySchemes": {"key": {"type": "apiKey"}}
            }
        });

        let parsed = parse(&doc).expect("parse");
        assert_eq!(parsed.title, "Pet Store");
        assert_eq!(parsed.version, "2.1.0");
        assert_eq!(parsed.base_url.as_deref(), Some("https://api.pets.test/v2"));
        assert_eq!(parsed.endpoints.len(), 2);

        let get = &parsed.endpoints[0];
        assert_eq!(get.method, "GET");
        assert_eq!(get.operation_id.as_deref(), Some("getPet"));
        assert_eq!(get.parameters.len(), 2);
        assert!(get.parameters.iter().any(|p| p.name == "id" && p.required));
        assert_eq!(get.responses.len(), 2);

        assert_eq!(parsed.schemas.len(), 1);
        assert_eq!(parsed.schemas[0].required, vec!["id".to_string()]);
        assert!(parsed.has_security);
    }

    #[test]
    fn swagger_two_definitions_and_host() {
        let doc = json!({
            "swagger": "2.0",
            "host": "legacy.test",
            "basePath": "/v1",
            "schemes": ["http"],
            "paths": {},
            "definitions": {"User": {"type": "object"}}
        });

        let parsed = parse(&doc).expect("parse");
        assert_eq!(parsed.title, "API Documentation");
        assert_eq!(parsed.base_url.as_deref(), Some("http://legacy.test/v1"));
        assert_eq!(parsed.schemas[0].name, "User");
        assert!(!parsed.has_security);
    }
    #[test]
    fn operation_parameters_override_shared_ones() {
        let doc = json!({
            "openapi": "3.0.0",
            "paths": {
                "/orders/{id}": {
                    "parameters": [
                        {"name": "id", "in": "path", "description": "shared"},
                        {"name": "trace", "in": "header"}
                    ],
                    "get": {
                        "parameters": [{"name": "id", "in": "path", "description": "own"}],
                        "responses": {"200": {"description": "ok"}}
                    }
                }
            }
        });

        let parsed = parse(&doc).expect("parse");
        let params = &parsed.endpoints[0].parameters;
        assert_eq!(params.len(), 2);
        assert_eq!(params[0].name, "trace");
        assert_eq!(params[1].name, "id");
        assert_eq!(params[1].description.as_deref(), Some("own"));
    }
}
