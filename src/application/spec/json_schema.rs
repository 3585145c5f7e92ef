use serde_json::{Map, Value};

use super::{
    Endpoint, Parameter, ParsedSpecification, ResponseSpec, SpecError, schema_definition,
    string_field,
};
use crate::domain::types::SpecFormat;

/// A bare JSON Schema exposes no operations, so each schema is documented through a
/// synthetic validation endpoint.
pub(super) fn parse(document: &Value) -> Result<ParsedSpecification, SpecError> {
    let root = document
        .as_object()
        .ok_or_else(|| SpecError::parse(SpecFormat::JsonSchema, "document is not an object"))?;

    let mut parsed = ParsedSpecification::empty(
        SpecFormat::JsonSchema,
        string_field(document, "title").unwrap_or_else(|| "JSON Schema".to_string()),
    );
    if let Some(version) = string_field(document, "version") {
        parsed.version = version;
    }
    parsed.description = string_field(document, "description");
    parsed.tags = vec!["Validation".to_string()];

    let definitions = definitions(root);

    parsed.endpoints.push(validation_endpoint(
        "/validate".to_string(),
        "Validate data against schema".to_string(),
        "validate_data".to_string(),
        vec!["Validation".to_string()],
    ));
    for name in definitions.keys() {
        let lower = name.to_lowercase();
        parsed.endpoints.push(validation_endpoint(
            format!("/validate/{lower}"),
            format!("Validate {name}"),
            format!("validate_{lower}"),
            vec!["Validation".to_string(), name.clone()],
        ));
    }

    if root.contains_key("type") || root.contains_key("properties") {
        parsed.schemas.push(schema_definition("RootSchema", document));
    }
    parsed.schemas.extend(
        definitions
            .iter()
            .map(|(name, schema)| schema_definition(name, schema)),
    );

    Ok(parsed)
}

/// `definitions` (draft 4-7) wins over `$defs` (2019-09+) when both are present and non-empty.
fn definitions(root: &Map<String, Value>) -> Map<String, Value> {
    ["definitions", "$defs"]
        .iter()
        .filter_map(|key| root.get(*key).and_then(Value::as_object))
        .find(|defs| !defs.is_empty())
        .cloned()
        .unwrap_or_default()
}

fn validation_endpoint(
    path: String,
    summary: String,
    operation_id: String,
    tags: Vec<String>,
) -> Endpoint {
    let mut endpoint = Endpoint::new("post", path);
    endpoint.description = Some(format!("{summary} using the declared schema rules"));
    endpoint.summary = Some(summary);
    endpoint.operation_id = Some(operation_id);
    endpoint.tags = tags;
    endpoint.parameters = vec![Parameter {
        name: "data".into(),
        location: "body".into(),
        required: true,
        schema_type: Some("object".into()),
        description: Some("Data to validate".into()),
    }];
    endpoint.responses = vec![
        ResponseSpec {
            status: "200".into(),
            description: Some("Validation successful".into()),
        },
        ResponseSpec {
            status: "400".into(),
            description: Some("Validation failed".into()),
        },
    ];
    endpoint
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn root_and_definitions_produce_schemas_and_endpoints() {
        let doc = json!({
            "$schema": "http://json-schema.org/draft-07/schema#",
            "title": "Order",
            "type": "object",
            "required": ["id"],
            "properties": {"id": {"type": "string"}, "item": {"$ref": "#/definitions/LineItem"}},
            "definitions": {"LineItem": {"type": "object", "properties": {"sku": {"type": "string"}}}}
        });

        let parsed = parse(&doc).expect("parse");
        assert_eq!(parsed.title, "Order");
        assert_eq!(parsed.version, "1.0.0");

        let paths: Vec<&str> = parsed.endpoints.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(paths, vec!["/validate", "/validate/lineitem"]);
        assert!(parsed.endpoints.iter().all(|e| e.method == "POST"));
        assert_eq!(
            parsed.endpoints[1].operation_id.as_deref(),
            Some("validate_lineitem")
        );

        assert_eq!(parsed.schemas.len(), 2);
        assert_eq!(parsed.schemas[0].name, "RootSchema");
        assert_eq!(
            parsed.schemas[0].properties[1].property_type.as_deref(),
            Some("LineItem")
        );
        assert_eq!(parsed.schemas[1].name, "LineItem");
    }

    #[test]
    fn falls_back_to_defs_and_default_title() {
        let doc = json!({"$defs": {"Tag": {"type": "string"}}});

        let parsed = parse(&doc).expect("parse");
        assert_eq!(parsed.title, "JSON Schema");
        assert_eq!(parsed.endpoints.len(), 2);
        assert_eq!(parsed.schemas.len(), 1);
        assert_eq!(parsed.schemas[0].name, "Tag");
    }
}
