//! Section selection and prompt construction.

use serde::Serialize;
use serde_json::Value;

use crate::application::spec::ParsedSpecification;
use crate::domain::types::SpecFormat;

/// A documentation section the generator can ask the GenAI service for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DocSection {
    Overview,
    Endpoints,
    Schemas,
    Examples,
    Authentication,
    ErrorHandling,
}

impl DocSection {
    pub fn as_str(self) -> &'static str {
        match self {
            DocSection::Overview => "overview",
            DocSection::Endpoints => "endpoints",
            DocSection::Schemas => "schemas",
            DocSection::Examples => "examples",
            DocSection::Authentication => "authentication",
            DocSection::ErrorHandling => "error_handling",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            DocSection::Overview => "Overview",
            DocSection::Endpoints => "API Endpoints",
            DocSection::Schemas => "Data Models",
            DocSection::Examples => "Code Examples",
            DocSection::Authentication => "Authentication",
            DocSection::ErrorHandling => "Error Handling",
        }
    }

    /// Heading anchor as produced by GitHub-style slugging of [`DocSection::title`].
    pub fn anchor(self) -> String {
        self.title().to_ascii_lowercase().replace(' ', "-")
    }

    fn instructions(self) -> &'static str {
        match self {
            DocSection::Overview => {
                "Write an overview of the API: what the service does, its key features, \
                 the base URL and versioning, and a short quick start with one request."
            }
            DocSection::Endpoints => {
                "Document every endpoint: HTTP method and path, purpose, path and query \
                 parameters with types and whether they are required, the request body, \
                 response status codes and example responses."
            }
            DocSection::Schemas => {
                "Document every data model: its purpose, each property with type and \
                 constraints, required fields, relationships between models, and a \
                 complete example object."
            }
            DocSection::Examples => {
                "Provide copy-pasteable request examples with curl, Python (requests) and \
                 JavaScript (fetch). Show headers, authentication, request bodies, and how \
                 to handle success and error responses."
            }
            DocSection::Authentication => {
                "Explain how clients authenticate: supported schemes, how to obtain \
                 credentials, where to send them, scopes, and common authentication errors."
            }
            DocSection::ErrorHandling => {
                "Describe error handling: the error response format, status codes and their \
                 meaning, retryable versus permanent errors, and recommended client behaviour."
            }
        }
    }
}

/// Decide which sections are worth generating for a parsed specification.
pub fn select_sections(parsed: &ParsedSpecification) -> Vec<DocSection> {
    let mut sections = vec![DocSection::Overview];
    let has_endpoints = !parsed.endpoints.is_empty();

    match parsed.format {
        SpecFormat::OpenApi => {
            if has_endpoints {
                sections.extend([DocSection::Endpoints, DocSection::Examples]);
            }
            if !parsed.schemas.is_empty() {
                sections.push(DocSection::Schemas);
            }
            if parsed.has_security {
                sections.push(DocSection::Authentication);
            }
            if has_endpoints {
                sections.push(DocSection::ErrorHandling);
            }
        }
        SpecFormat::Graphql => {
            sections.extend([DocSection::Schemas, DocSection::Examples]);
            if has_endpoints {
                sections.push(DocSection::Endpoints);
            }
            sections.extend([DocSection::Authentication, DocSection::ErrorHandling]);
        }
        SpecFormat::JsonSchema => {
            sections.extend([DocSection::Schemas, DocSection::Examples]);
        }
    }

    sections
}

/// Who the documentation is for; interpolated into every prompt.
#[derive(Debug, Clone, Copy)]
pub struct PromptContext<'a> {
    pub service_name: &'a str,
    pub team_id: &'a str,
    pub format: SpecFormat,
    pub document: &'a Value,
}

pub fn build_prompt(section: DocSection, context: &PromptContext<'_>) -> String {
    let specification = match context.document {
        Value::String(sdl) => sdl.clone(),
        other => serde_json::to_string_pretty(other).unwrap_or_else(|_| other.to_string()),
    };

    format!(
        "You are a technical writer producing API documentation for developers.\n\
         Write clear, accurate Markdown. Use headings, lists and fenced code blocks.\n\
         Call out required fields, authentication and error conditions.\n\n\
         Output Format: markdown\n\
         Service Name: {service}\n\
         Team: {team}\n\n\
         Section: {title}\n\
         {instructions}\n\n\
         Specification Type: {format}\n\
         Specification Content:\n{specification}\n",
        service = context.service_name,
        team = context.team_id,
        title = section.title(),
        instructions = section.instructions(),
        format = context.format,
    )
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::application::spec::parse_specification;

    #[test]
    fn openapi_sections_follow_content() {
        let doc = json!({
            "openapi": "3.0.0",
            "info": {"title": "T", "version": "1"},
            "paths": {"/a": {"get": {"responses": {"200": {"description": "ok"}}}}},
            "components": {"securitySchemes": {"k": {"type": "apiKey"}}}
        });
        let parsed = parse_specification(SpecFormat::OpenApi, &doc).expect("parse");
        assert_eq!(
            select_sections(&parsed),
            vec![
                DocSection::Overview,
                DocSection::Endpoints,
                DocSection::Examples,
                DocSection::Authentication,
                DocSection::ErrorHandling,
            ]
        );
    }

    #[test]
    fn openapi_without_paths_only_gets_overview() {
        let doc = json!({"openapi": "3.0.0", "info": {"title": "T"}, "paths": {}});
        let parsed = parse_specification(SpecFormat::OpenApi, &doc).expect("parse");
        assert_eq!(select_sections(&parsed), vec![DocSection::Overview]);
    }

    #[test]
    fn json_schema_sections() {
        let doc = json!({"type": "object", "properties": {"id": {"type": "string"}}});
        let parsed = parse_specification(SpecFormat::JsonSchema, &doc).expect("parse");
        assert_eq!(
            select_sections(&parsed),
            vec![DocSection::Overview, DocSection::Schemas, DocSection::Examples]
        );
    }

    #[test]
    fn prompt_carries_context_and_document() {
        let doc = json!({"type": "object"});
        let prompt = build_prompt(
            DocSection::Schemas,
            &PromptContext {
                service_name: "billing",
                team_id: "payments",
                format: SpecFormat::JsonSchema,
                document: &doc,
            },
        );
        assert!(prompt.contains("Service Name: billing"));
        assert!(prompt.contains("Team: payments"));
        assert!(prompt.contains("Section: Data Models"));
        assert!(prompt.contains("Specification Type: json_schema"));
        assert!(prompt.contains("\"type\": \"object\""));
    }

    #[test]
    fn anchors_match_heading_slugs() {
        assert_eq!(DocSection::Endpoints.anchor(), "api-endpoints");
        assert_eq!(DocSection::ErrorHandling.anchor(), "error-handling");
    }
}
