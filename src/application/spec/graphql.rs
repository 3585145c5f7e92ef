//! Minimal GraphQL SDL reader.
//!
//! Only the structure needed for documentation is extracted: root operation fields,
//! object/input/interface fields, enum values, scalars and unions. Descriptions and
//! comments are dropped by [`strip_graphql_comments`] before tokenizing.

use serde_json::Value;

use super::intake::strip_graphql_comments;
use super::{Endpoint, Parameter, ParsedSpecification, PropertyDefinition, ResponseSpec};
use super::{SchemaDefinition, SpecError};
use crate::domain::types::SpecFormat;

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Name(String),
    Punct(char),
}

#[derive(Debug, Clone)]
struct Field {
    name: String,
    ty: String,
    args: Vec<Field>,
}

pub(super) fn parse(document: &Value) -> Result<ParsedSpecification, SpecError> {
    let sdl = document.as_str().ok_or_else(|| {
        SpecError::parse(SpecFormat::Graphql, "stored GraphQL document is not SDL text")
    })?;
    let tokens = tokenize(&strip_graphql_comments(sdl));
    let mut reader = Reader { tokens, pos: 0 };

    let mut roots = RootTypes::default();
    let mut objects: Vec<(String, &'static str, Vec<Field>)> = Vec::new();
    let mut schemas: Vec<SchemaDefinition> = Vec::new();

    while let Some(token) = reader.next() {
        let Token::Name(keyword) = token else {
            continue;
        };
        match keyword.as_str() {
            "schema" => roots = reader.schema_block(roots),
            "type" | "input" | "interface" => {
                let kind = match keyword.as_str() {
                    "type" => "type",
                    "input" => "input",
                    _ => "interface",
                };
                let Some(name) = reader.name() else { continue };
                let fields = reader.fields_block();
                match objects.iter_mut().find(|(existing, _, _)| *existing == name) {
                    // `extend type` appends to an earlier definition.
                    Some((_, _, existing)) => existing.extend(fields),
                    None => objects.push((name, kind, fields)),
                }
            }
            "enum" => {
                let Some(name) = reader.name() else { continue };
                let values = reader.enum_block();
                schemas.push(SchemaDefinition {
                    name,
                    schema_type: Some("enum".into()),
                    description: None,
                    properties: values
                        .into_iter()
                        .map(|value| PropertyDefinition {
                            name: value,
                            property_type: None,
                            description: None,
                        })
                        .collect(),
                    required: Vec::new(),
                });
            }
            "scalar" => {
                if let Some(name) = reader.name() {
                    schemas.push(SchemaDefinition {
                        name,
                        schema_type: Some("scalar".into()),
                        description: None,
                        properties: Vec::new(),
                        required: Vec::new(),
                    });
                }
            }
            "union" => {
                let Some(name) = reader.name() else { continue };
                let members = reader.union_members();
                schemas.push(SchemaDefinition {
                    name,
                    schema_type: Some("union".into()),
                    description: None,
                    properties: members
                        .into_iter()
                        .map(|member| PropertyDefinition {
                            property_type: Some(member.clone()),
                            name: member,
                            description: None,
                        })
                        .collect(),
                    required: Vec::new(),
                });
            }
            "directive" => reader.skip_directive_definition(),
            _ => {}
        }
    }

    let mut parsed = ParsedSpecification::empty(SpecFormat::Graphql, "GraphQL API");
    let mut object_schemas = Vec::new();
    for (name, kind, fields) in objects {
        match roots.operation_for(&name) {
            Some(operation) if kind == "type" => {
                let method = if operation == "mutation" { "POST" } else { "GET" };
                parsed
                    .endpoints
                    .extend(fields.iter().map(|field| field_endpoint(operation, method, field)));
            }
            _ => object_schemas.push(SchemaDefinition {
                schema_type: Some(kind.into()),
                description: None,
                required: fields
                    .iter()
                    .filter(|field| field.ty.ends_with('!'))
                    .map(|field| field.name.clone())
                    .collect(),
                properties: fields
                    .into_iter()
                    .map(|field| PropertyDefinition {
                        name: field.name,
                        property_type: Some(field.ty),
                        description: None,
                    })
                    .collect(),
                name,
            }),
        }
    }
    object_schemas.extend(schemas);
    parsed.schemas = object_schemas;
    for endpoint in &parsed.endpoints {
        if let Some(tag) = endpoint.tags.first()
            && !parsed.tags.contains(tag)
        {
            parsed.tags.push(tag.clone());
        }
    }

    Ok(parsed)
}

fn field_endpoint(operation: &str, method: &str, field: &Field) -> Endpoint {
    let mut endpoint = Endpoint::new(method, format!("/{operation}/{}", field.name));
    endpoint.summary = Some(field.name.clone());
    endpoint.operation_id = Some(format!("{operation}_{}", field.name));
    endpoint.tags = vec![capitalize(operation)];
    endpoint.parameters = field
        .args
        .iter()
        .map(|arg| Parameter {
            name: arg.name.clone(),
            location: "argument".into(),
            required: arg.ty.ends_with('!'),
            schema_type: Some(arg.ty.clone()),
            description: None,
        })
        .collect();
    endpoint.responses = vec![ResponseSpec {
        status: "200".into(),
        description: Some(format!("Successful {operation}")),
    }];
    endpoint
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[derive(Debug, Clone)]
struct RootTypes {
    query: String,
    mutation: String,
    subscription: String,
}

impl Default for RootTypes {
    fn default() -> Self {
        Self {
            query: "Query".into(),
            mutation: "Mutation".into(),
            subscription: "Subscription".into(),
        }
    }
}

impl RootTypes {
    fn operation_for(&self, type_name: &str) -> Option<&'static str> {
        if type_name == self.query {
            Some("query")
        } else if type_name == self.mutation {
            Some("mutation")
        } else if type_name == self.subscription {
            Some("subscription")
        } else {
            None
        }
    }
}

fn tokenize(sdl: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut current = String::new();

    for ch in sdl.chars() {
        if ch.is_alphanumeric() || ch == '_' || ch == '-' || ch == '.' {
            current.push(ch);
            continue;
        }
        if !current.is_empty() {
            tokens.push(Token::Name(std::mem::take(&mut current)));
        }
        if "{}()[]:!=|@&".contains(ch) {
            tokens.push(Token::Punct(ch));
        }
    }
    if !current.is_empty() {
        tokens.push(Token::Name(current));
    }
    tokens
}

struct Reader {
    tokens: Vec<Token>,
    pos: usize,
}

impl Reader {
    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn peek_punct(&self, ch: char) -> bool {
        self.peek() == Some(&Token::Punct(ch))
    }

    fn name(&mut self) -> Option<String> {
        match self.peek() {
            Some(Token::Name(name)) => {
                let name = name.clone();
                self.pos += 1;
                Some(name)
            }
            _ => None,
        }
    }

    /// Skip a balanced group starting at the current opening delimiter.
    fn skip_group(&mut self, open: char, close: char) {
        if !self.peek_punct(open) {
            return;
        }
        let mut depth = 0usize;
        while let Some(token) = self.next() {
            match token {
                Token::Punct(ch) if ch == open => depth += 1,
                Token::Punct(ch) if ch == close => {
                    depth = depth.saturating_sub(1);
                    if depth == 0 {
                        return;
                    }
                }
                _ => {}
            }
        }
    }

    fn skip_directives(&mut self) {
        while self.peek_punct('@') {
            self.pos += 1;
            self.name();
            self.skip_group('(', ')');
        }
    }

    /// Advance to the opening brace of a definition body, skipping `implements` clauses
    /// and directives. Returns `false` when the definition has no body.
    fn seek_body(&mut self) -> bool {
        loop {
            match self.peek() {
                Some(Token::Punct('{')) => {
                    self.pos += 1;
                    return true;
                }
                Some(Token::Punct('@')) => self.skip_directives(),
                Some(Token::Name(word)) if is_definition_keyword(word) => return false,
                Some(_) => self.pos += 1,
                None => return false,
            }
        }
    }

    fn schema_block(&mut self, mut roots: RootTypes) -> RootTypes {
        if !self.seek_body() {
            return roots;
        }
        while let Some(token) = self.next() {
            match token {
                Token::Punct('}') => break,
                Token::Name(operation) => {
                    if !self.peek_punct(':') {
                        continue;
                    }
                    self.pos += 1;
                    if let Some(type_name) = self.name() {
                        match operation.as_str() {
                            "query" => roots.query = type_name,
                            "mutation" => roots.mutation = type_name,
                            "subscription" => roots.subscription = type_name,
                            _ => {}
                        }
                    }
                }
                Token::Punct(_) => {}
            }
        }
        roots
    }

    fn fields_block(&mut self) -> Vec<Field> {
        let mut fields = Vec::new();
        if !self.seek_body() {
            return fields;
        }
        loop {
            match self.peek() {
                None => break,
                Some(Token::Punct('}')) => {
                    self.pos += 1;
                    break;
                }
                Some(Token::Name(_)) => {
                    if let Some(field) = self.field() {
                        fields.push(field);
                    }
                }
                Some(Token::Punct(_)) => self.pos += 1,
            }
        }
        fields
    }

    fn field(&mut self) -> Option<Field> {
        let name = self.name()?;
        let mut args = Vec::new();
        if self.peek_punct('(') {
            self.pos += 1;
            loop {
                match self.peek() {
                    None => break,
                    Some(Token::Punct(')')) => {
                        self.pos += 1;
                        break;
                    }
                    Some(Token::Name(_)) => {
                        if let Some(arg) = self.field() {
                            args.push(arg);
                        }
                    }
                    Some(Token::Punct(_)) => self.pos += 1,
                }
            }
        }
        if !self.peek_punct(':') {
            return None;
        }
        self.pos += 1;
        let ty = self.type_ref()?;
        if self.peek_punct('=') {
            self.pos += 1;
            self.skip_value();
        }
        self.skip_directives();
        Some(Field { name, ty, args })
    }

    fn type_ref(&mut self) -> Option<String> {
        let mut ty = if self.peek_punct('[') {
            self.pos += 1;
            let inner = self.type_ref()?;
            if self.peek_punct(']') {
                self.pos += 1;
            }
            format!("[{inner}]")
        } else {
            self.name()?
        };
        if self.peek_punct('!') {
            self.pos += 1;
            ty.push('!');
        }
        Some(ty)
    }

    fn skip_value(&mut self) {
        match self.peek() {
            Some(Token::Punct('[')) => self.skip_group('[', ']'),
            Some(Token::Punct('{')) => self.skip_group('{', '}'),
            Some(_) => self.pos += 1,
            None => {}
        }
    }

    fn enum_block(&mut self) -> Vec<String> {
        let mut values = Vec::new();
        if !self.seek_body() {
            return values;
        }
        while let Some(token) = self.next() {
            match token {
                Token::Punct('}') => break,
                Token::Punct('@') => {
                    self.name();
                    self.skip_group('(', ')');
                }
                Token::Name(value) => values.push(value),
                Token::Punct(_) => {}
            }
        }
        values
    }

    fn union_members(&mut self) -> Vec<String> {
        self.skip_directives();
        if !self.peek_punct('=') {
            return Vec::new();
        }
        self.pos += 1;
        let mut members = Vec::new();
        loop {
            match self.peek() {
                Some(Token::Punct('|')) => self.pos += 1,
                Some(Token::Name(word)) if !is_definition_keyword(word) => {
                    members.push(word.clone());
                    self.pos += 1;
                }
                _ => break,
            }
        }
        members
    }

    fn skip_directive_definition(&mut self) {
        if self.peek_punct('@') {
            self.pos += 1;
        }
        self.name();
        self.skip_group('(', ')');
        while let Some(token) = self.peek() {
            match token {
                Token::Name(word) if is_definition_keyword(word) => break,
                _ => self.pos += 1,
            }
        }
    }
}

fn is_definition_keyword(word: &str) -> bool {
    matches!(
        word,
        "type"
            | "input"
            | "interface"
            | "enum"
            | "scalar"
            | "union"
            | "schema"
            | "directive"
            | "extend"
    )
}
