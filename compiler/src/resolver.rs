use std::collections::{HashMap, HashSet};
use std::fmt;

use tracing::debug;

use crate::{
    codec::{field_ident, type_ident},
    error::DgenError,
    service::{method_ident, service_ident},
    types::{EnumDecl, MessageDecl, ScalarKind, Schema, ServiceDecl, TypeExpr},
    utils::{first_upper, quote, to_snake_case},
};

/// A field type after every `Named` identifier has been classified.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ResolvedType {
    Scalar(ScalarKind),
    /// By value; encoded as its `uint32` discriminant.
    Enum(String),
    /// By reference; another message, owned through an indirection.
    Message(String),
    List(Box<ResolvedType>),
    Map(ScalarKind, Box<ResolvedType>),
}

impl ResolvedType {
    /// The canonical type signature. Two usages with the same signature share
    /// one generated container routine pair.
    pub fn signature(&self) -> String {
        self.to_string()
    }

    pub fn is_by_reference(&self) -> bool {
        matches!(self, ResolvedType::Message(_))
    }
}

impl fmt::Display for ResolvedType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolvedType::Scalar(kind)    => write!(f, "{}", kind),
            ResolvedType::Enum(name)      => f.write_str(name),
            ResolvedType::Message(name)   => f.write_str(name),
            ResolvedType::List(elem)      => write!(f, "list[{}]", elem),
            ResolvedType::Map(key, value) => write!(f, "map[{}]{}", key, value),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedField {
    pub name:     String,
    pub seq:      u8,
    pub optional: bool,
    pub ty:       ResolvedType,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedMessage {
    pub name:   String,
    pub fields: Vec<ResolvedField>,
}

/// The schema with every field type classified. Services keep their shape
/// but their request/response names are normalized to the declared message
/// names.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedSchema {
    pub enums:    Vec<EnumDecl>,
    pub messages: Vec<ResolvedMessage>,
    pub services: Vec<ServiceDecl>,
}

/// Lookups take names as written in a schema: `person` finds `Person`.
impl ResolvedSchema {
    pub fn message(&self, name: &str) -> Option<&ResolvedMessage> {
        let name = first_upper(name);
        self.messages.iter().find(|m| m.name == name)
    }

    pub fn enum_decl(&self, name: &str) -> Option<&EnumDecl> {
        let name = first_upper(name);
        self.enums.iter().find(|e| e.name == name)
    }
}

#[derive(Clone, Copy, PartialEq)]
enum DeclKind {
    Enum { empty: bool },
    Message,
    Service,
}

/// Classifies every field type of every message. Needs the complete schema:
/// declarations may reference types declared later in the file.
pub fn resolve_schema(schema: &Schema) -> Result<ResolvedSchema, DgenError> {
    let mut kinds: HashMap<String, DeclKind> = HashMap::new();
    let mut idents: HashSet<String> = HashSet::new();

    let declared = schema
        .enums
        .iter()
        .map(|e| (&e.name, DeclKind::Enum { empty: e.variants.is_empty() }))
        .chain(schema.messages.iter().map(|m| (&m.name, DeclKind::Message)));
    for (name, kind) in declared {
        if kinds.insert(name.clone(), kind).is_some() || !idents.insert(type_ident(name)) {
            return Err(DgenError::DuplicateDefinition(quote(name)));
        }
    }

    // A service occupies its trait name plus the generated handler and
    // adapter names, all in the same module as the types.
    let mut registrations: HashSet<String> = HashSet::new();
    for service in &schema.services {
        let name = service_ident(&service.name);
        for ident in [format!("{}Handler", name), format!("{}Adapter", name), name] {
            if !idents.insert(ident.clone()) {
                return Err(DgenError::DuplicateDefinition(quote(&ident)));
            }
        }
        let register = format!("register_{}", to_snake_case(&service.name));
        if !registrations.insert(register.clone()) {
            return Err(DgenError::DuplicateDefinition(quote(&register)));
        }
        kinds.insert(first_upper(&service.name), DeclKind::Service);
    }

    for decl in &schema.enums {
        check_unique(&decl.name, decl.variants.iter().map(|v| type_ident(v)))?;
    }

    let messages = schema
        .messages
        .iter()
        .map(|message| resolve_message(message, &kinds))
        .collect::<Result<Vec<_>, _>>()?;

    let services = schema
        .services
        .iter()
        .map(|service| resolve_service(service, &kinds))
        .collect::<Result<Vec<_>, _>>()?;

    debug!(
        enums = schema.enums.len(),
        messages = messages.len(),
        services = services.len(),
        "resolved schema"
    );

    Ok(ResolvedSchema {
        enums: schema.enums.clone(),
        messages,
        services,
    })
}

/// Rejects two members that map to the same Rust identifier, e.g. fields
/// `pageNumber` and `page_number`.
fn check_unique(owner: &str, idents: impl Iterator<Item = String>) -> Result<(), DgenError> {
    let mut seen = HashSet::new();
    for ident in idents {
        if seen.contains(&ident) {
            return Err(DgenError::DuplicateDefinition(quote(&format!("{}.{}", owner, ident))));
        }
        seen.insert(ident);
    }
    Ok(())
}

fn resolve_message(
    message: &MessageDecl,
    kinds: &HashMap<String, DeclKind>,
) -> Result<ResolvedMessage, DgenError> {
    check_unique(&message.name, message.fields.iter().map(|f| field_ident(&f.name)))?;

    let fields = message
        .fields
        .iter()
        .map(|field| {
            let used_by = format!("{}.{}", message.name, field.name);
            Ok::<_, DgenError>(ResolvedField {
                name:     field.name.clone(),
                seq:      field.seq,
                optional: field.optional,
                ty:       resolve_type(&field.ty, &used_by, kinds)?,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(ResolvedMessage {
        name: message.name.clone(),
        fields,
    })
}

fn resolve_type(
    ty: &TypeExpr,
    used_by: &str,
    kinds: &HashMap<String, DeclKind>,
) -> Result<ResolvedType, DgenError> {
    match ty {
        TypeExpr::Scalar(kind) => Ok(ResolvedType::Scalar(*kind)),
        TypeExpr::Named(name) => {
            let normalized = first_upper(name);
            match kinds.get(&normalized) {
                Some(DeclKind::Message) => Ok(ResolvedType::Message(normalized)),
                Some(DeclKind::Enum { empty: false }) => Ok(ResolvedType::Enum(normalized)),
                Some(DeclKind::Enum { empty: true }) => Err(DgenError::EmptyEnum {
                    field: used_by.to_string(),
                    name:  normalized,
                }),
                Some(DeclKind::Service) | None => Err(DgenError::UnresolvedType {
                    name:    quote(name),
                    used_by: used_by.to_string(),
                }),
            }
        }
        TypeExpr::List(elem) => Ok(ResolvedType::List(Box::new(resolve_type(elem, used_by, kinds)?))),
        TypeExpr::Map(key, value) => {
            if !key.is_valid_map_key() {
                return Err(DgenError::UnsupportedMapKey {
                    field: used_by.to_string(),
                    key:   key.to_string(),
                });
            }
            Ok(ResolvedType::Map(*key, Box::new(resolve_type(value, used_by, kinds)?)))
        }
    }
}

fn resolve_service(
    service: &ServiceDecl,
    kinds: &HashMap<String, DeclKind>,
) -> Result<ServiceDecl, DgenError> {
    check_unique(&service.name, service.methods.iter().map(method_ident))?;

    let message_name = |name: &str, used_by: String| {
        let normalized = first_upper(name);
        match kinds.get(&normalized) {
            Some(DeclKind::Message) => Ok(normalized),
            _ => Err(DgenError::UnresolvedType {
                name: quote(name),
                used_by,
            }),
        }
    };

    let mut resolved = service.clone();
    for method in &mut resolved.methods {
        let used_by = format!("{}.{}", service.name, method.name);
        method.request = message_name(&method.request, used_by.clone())?;
        if let Some(response) = &method.response {
            method.response = Some(message_name(response, used_by)?);
        }
    }
    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{parser::parse_schema, tokenizer::tokenize_schema};

    fn resolve(input: &str) -> Result<ResolvedSchema, DgenError> {
        let schema = parse_schema(&tokenize_schema(input)).expect("parse_schema failed");
        resolve_schema(&schema)
    }

    #[test]
    fn test_forward_references_and_by_reference_marking() {
        let schema = resolve(
            r#"
            message Outer {
                seq=1 Inner inner;
                seq=2 list[Inner] inners;
                optional seq=3 map[string]list[Inner] grouped;
                optional seq=4 Color color;
                optional seq=5 list[color] colors;
                optional seq=6 int64 id;
            }
            message inner { seq=1 string name; }
            enum Color { red, green }
            "#,
        )
        .unwrap();

        let outer = schema.message("Outer").unwrap();
        let inner = || ResolvedType::Message("Inner".into());
        assert_eq!(outer.fields[0].ty, inner());
        assert!(outer.fields[0].ty.is_by_reference());
        assert_eq!(outer.fields[1].ty, ResolvedType::List(Box::new(inner())));
        assert_eq!(
            outer.fields[2].ty,
            ResolvedType::Map(
                ScalarKind::String,
                Box::new(ResolvedType::List(Box::new(inner())))
            )
        );
        assert_eq!(outer.fields[3].ty, ResolvedType::Enum("Color".into()));
        assert!(!outer.fields[3].ty.is_by_reference());
        assert_eq!(outer.fields[4].ty.signature(), "list[Color]");
        assert_eq!(outer.fields[5].ty, ResolvedType::Scalar(ScalarKind::Int64));
        assert!(schema.message("Inner").is_some());
    }

    #[test]
    fn test_unresolved_type_is_rejected() {
        let err = resolve("message A { seq=1 list[Missing] xs; }").unwrap_err();
        assert_eq!(
            err.to_string(),
            "The type \"Missing\" used by A.xs is not declared as a message or enum"
        );
    }

    #[test]
    fn test_duplicate_definitions_are_rejected() {
        let err = resolve("message A {}\nenum a { x }").unwrap_err();
        assert!(matches!(err, DgenError::DuplicateDefinition(ref n) if n == "\"A\""));

        let err = resolve("enum E { x, y, x }").unwrap_err();
        assert!(matches!(err, DgenError::DuplicateDefinition(ref n) if n == "\"E.X\""));

        let err = resolve("message A { seq=1 int32 a; seq=2 int32 a; }").unwrap_err();
        assert!(matches!(err, DgenError::DuplicateDefinition(_)));
    }

    #[test]
    fn test_service_names_share_the_type_namespace() {
        let err = resolve("message Search {}\nservice search { Do(Search); }").unwrap_err();
        assert!(matches!(err, DgenError::DuplicateDefinition(ref n) if n == "\"Search\""), "got {:?}", err);

        let err = resolve("message Req {}\nmessage SearchHandler {}\nservice Search { Do(Req); }")
            .unwrap_err();
        assert!(
            matches!(err, DgenError::DuplicateDefinition(ref n) if n == "\"SearchHandler\""),
            "got {:?}",
            err
        );

        let err = resolve("message Req {}\nenum SearchAdapter { x }\nservice Search { Do(Req); }")
            .unwrap_err();
        assert!(matches!(err, DgenError::DuplicateDefinition(ref n) if n == "\"SearchAdapter\""));

        let err = resolve("service Idle {}\nservice idle {}").unwrap_err();
        assert!(matches!(err, DgenError::DuplicateDefinition(_)));

        let err = resolve("service FooBar {}\nservice foo_bar {}").unwrap_err();
        assert!(matches!(err, DgenError::DuplicateDefinition(ref n) if n == "\"register_foo_bar\""));
    }

    #[test]
    fn test_members_are_compared_as_rust_identifiers() {
        let err = resolve("message A { seq=1 int32 pageNumber; seq=2 int32 page_number; }").unwrap_err();
        assert!(
            matches!(err, DgenError::DuplicateDefinition(ref n) if n == "\"A.page_number\""),
            "got {:?}",
            err
        );

        let err = resolve("message A { seq=1 int32 type; seq=2 int32 type_; }").unwrap_err();
        assert!(matches!(err, DgenError::DuplicateDefinition(ref n) if n == "\"A.type_\""));

        let err = resolve("message Req {}\nservice S { Search(Req); search(Req); }").unwrap_err();
        assert!(matches!(err, DgenError::DuplicateDefinition(ref n) if n == "\"S.search\""));
    }

    #[test]
    fn test_lookups_accept_schema_spelling() {
        let schema = resolve("message person { seq=1 string name; }\nenum color { red }").unwrap();
        assert_eq!(schema.message("person").map(|m| m.name.as_str()), Some("Person"));
        assert!(schema.message("Person").is_some());
        assert!(schema.enum_decl("color").is_some());
        assert!(schema.message("nobody").is_none());
    }

    #[test]
    fn test_duplicate_seq_numbers_are_kept() {
        let schema = resolve("message A { seq=1 int32 a; seq=1 int32 b; }").unwrap();
        let seqs: Vec<u8> = schema.messages[0].fields.iter().map(|f| f.seq).collect();
        assert_eq!(seqs, vec![1, 1]);
    }

    #[test]
    fn test_float_map_keys_are_rejected() {
        let err = resolve("message A { seq=1 map[float32]string m; }").unwrap_err();
        assert!(
            matches!(err, DgenError::UnsupportedMapKey { ref key, .. } if key == "float32"),
            "got {:?}",
            err
        );
    }

    #[test]
    fn test_empty_enum_cannot_be_a_field_type() {
        assert!(resolve("enum Nothing {}").is_ok());
        let err = resolve("enum Nothing {}\nmessage A { optional seq=1 Nothing n; }").unwrap_err();
        assert!(matches!(err, DgenError::EmptyEnum { .. }));
    }

    #[test]
    fn test_service_types_must_be_messages() {
        let schema = resolve(
            "service S { Do(req) return (resp); Fire(Req); }\nmessage Req {}\nmessage Resp {}",
        )
        .unwrap();
        let methods = &schema.services[0].methods;
        assert_eq!(methods[0].request, "Req");
        assert_eq!(methods[0].response.as_deref(), Some("Resp"));

        let err = resolve("enum Color { red }\nservice S { Do(Color); }").unwrap_err();
        assert!(matches!(err, DgenError::UnresolvedType { ref used_by, .. } if used_by == "S.Do"));
    }
}
