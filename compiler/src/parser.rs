use lazy_static::lazy_static;
use regex::Regex;

use crate::{
    error::DgenError,
    tokenizer::{Token, TokenKind},
    types::{EnumDecl, Field, MessageDecl, Method, ScalarKind, Schema, ServiceDecl, TypeExpr},
    utils::{error, first_upper, quote},
};

lazy_static! {
    static ref IDENTIFIER: Regex = Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap();
}

static EOF_TOKEN: Token = Token {
    kind:   TokenKind::Eof,
    text:   String::new(),
    line:   0,
    column: 0,
};

/// Parses a token stream into a `Schema`. The first grammar error aborts the
/// whole parse; no partial schema is returned.
pub fn parse_schema(tokens: &[Token]) -> Result<Schema, DgenError> {
    Parser { tokens, index: 0 }.parse()
}

struct Parser<'a> {
    tokens: &'a [Token],
    index:  usize,
}

impl<'a> Parser<'a> {
    fn current_token(&self) -> &'a Token {
        self.tokens
            .get(self.index)
            .or_else(|| self.tokens.last())
            .unwrap_or(&EOF_TOKEN)
    }

    fn eat(&mut self, kind: TokenKind) -> bool {
        if self.current_token().kind == kind {
            self.index += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: TokenKind, expected: &str) -> Result<&'a Token, DgenError> {
        let tok = self.current_token();
        if !self.eat(kind) {
            return Err(error(
                &format!("Expected {} but found {}", expected, describe(tok)),
                tok.line,
                tok.column,
            ));
        }
        Ok(tok)
    }

    /// Expects an identifier token whose text is also a valid Rust identifier.
    fn identifier(&mut self, expected: &str) -> Result<&'a Token, DgenError> {
        let tok = self.expect(TokenKind::Identifier, expected)?;
        check_identifier(tok)?;
        Ok(tok)
    }

    fn unexpected_token(&self) -> DgenError {
        let tok = self.current_token();
        error(
            &format!("Unexpected token {}", describe(tok)),
            tok.line,
            tok.column,
        )
    }

    fn parse(mut self) -> Result<Schema, DgenError> {
        let mut schema = Schema::default();

        loop {
            let tok = self.current_token();
            match tok.kind {
                TokenKind::Eof => break,
                TokenKind::Enum => {
                    self.index += 1;
                    schema.enums.push(self.parse_enum(tok)?);
                }
                TokenKind::Message => {
                    self.index += 1;
                    schema.messages.push(self.parse_message(tok)?);
                }
                TokenKind::Service => {
                    self.index += 1;
                    schema.services.push(self.parse_service(tok)?);
                }
                _ => return Err(self.unexpected_token()),
            }
        }

        Ok(schema)
    }

    fn parse_enum(&mut self, keyword: &Token) -> Result<EnumDecl, DgenError> {
        let name_tok = self.identifier("identifier")?;
        self.expect(TokenKind::LBrace, "\"{\"")?;

        let mut variants = Vec::new();
        while self.current_token().kind == TokenKind::Identifier {
            let variant = self.identifier("identifier")?;
            variants.push(first_upper(&variant.text));
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::RBrace, "\"}\"")?;

        Ok(EnumDecl {
            name:   first_upper(&name_tok.text),
            line:   keyword.line,
            column: keyword.column,
            variants,
        })
    }

    fn parse_message(&mut self, keyword: &Token) -> Result<MessageDecl, DgenError> {
        let name_tok = self.identifier("identifier")?;
        self.expect(TokenKind::LBrace, "\"{\"")?;

        let mut fields = Vec::new();
        while !self.eat(TokenKind::RBrace) {
            fields.push(self.parse_field()?);
        }

        Ok(MessageDecl {
            name:   first_upper(&name_tok.text),
            line:   keyword.line,
            column: keyword.column,
            fields,
        })
    }

    fn parse_field(&mut self) -> Result<Field, DgenError> {
        let start = self.current_token();
        let optional = self.eat(TokenKind::Optional);
        self.expect(TokenKind::Seq, "\"seq\"")?;
        self.expect(TokenKind::Assign, "\"=\"")?;

        let seq_tok = self.expect(TokenKind::Number, "number")?;
        let seq = seq_tok.text.parse::<u8>().map_err(|_| {
            error(
                &format!("Invalid seq {}, expected a number from 0 to 255", quote(&seq_tok.text)),
                seq_tok.line,
                seq_tok.column,
            )
        })?;

        let ty = self.parse_type()?;
        let name_tok = self.identifier("identifier")?;
        self.expect(TokenKind::Semicolon, "\";\"")?;

        Ok(Field {
            name:   name_tok.text.clone(),
            line:   start.line,
            column: start.column,
            seq,
            optional,
            ty,
        })
    }

    fn parse_type(&mut self) -> Result<TypeExpr, DgenError> {
        let tok = self.current_token();
        match tok.kind {
            TokenKind::Builtin => {
                self.index += 1;
                match tok.text.as_str() {
                    "map" => self.parse_map(),
                    "list" => self.parse_list(),
                    other => ScalarKind::from_name(other)
                        .map(TypeExpr::Scalar)
                        .ok_or_else(|| self.unexpected_at(tok)),
                }
            }
            TokenKind::Identifier => {
                self.index += 1;
                check_identifier(tok)?;
                Ok(TypeExpr::Named(tok.text.clone()))
            }
            _ => Err(error(
                &format!("Expected type but found {}", describe(tok)),
                tok.line,
                tok.column,
            )),
        }
    }

    fn parse_map(&mut self) -> Result<TypeExpr, DgenError> {
        self.expect(TokenKind::LBracket, "\"[\"")?;

        let key_tok = self.current_token();
        let key = match key_tok.kind {
            TokenKind::Builtin => ScalarKind::from_name(&key_tok.text),
            _ => None,
        }
        .ok_or_else(|| {
            error(
                &format!("Expected scalar map key type but found {}", describe(key_tok)),
                key_tok.line,
                key_tok.column,
            )
        })?;
        self.index += 1;

        self.expect(TokenKind::RBracket, "\"]\"")?;
        let value = self.parse_type()?;
        Ok(TypeExpr::Map(key, Box::new(value)))
    }

    fn parse_list(&mut self) -> Result<TypeExpr, DgenError> {
        self.expect(TokenKind::LBracket, "\"[\"")?;
        let elem = self.parse_type()?;
        self.expect(TokenKind::RBracket, "\"]\"")?;
        Ok(TypeExpr::List(Box::new(elem)))
    }

    fn parse_service(&mut self, keyword: &Token) -> Result<ServiceDecl, DgenError> {
        let name_tok = self.identifier("identifier")?;
        self.expect(TokenKind::LBrace, "\"{\"")?;

        let mut methods = Vec::new();
        while !self.eat(TokenKind::RBrace) {
            methods.push(self.parse_method()?);
        }

        Ok(ServiceDecl {
            name:   name_tok.text.clone(),
            line:   keyword.line,
            column: keyword.column,
            methods,
        })
    }

    fn parse_method(&mut self) -> Result<Method, DgenError> {
        let name_tok = self.identifier("method name")?;
        self.expect(TokenKind::LParen, "\"(\"")?;
        let request = self.identifier("request type")?;
        self.expect(TokenKind::RParen, "\")\"")?;

        let response = if self.eat(TokenKind::Return) {
            self.expect(TokenKind::LParen, "\"(\"")?;
            let response = self.identifier("response type")?;
            self.expect(TokenKind::RParen, "\")\"")?;
            Some(response.text.clone())
        } else {
            None
        };
        self.expect(TokenKind::Semicolon, "\";\"")?;

        Ok(Method {
            name:     name_tok.text.clone(),
            line:     name_tok.line,
            column:   name_tok.column,
            request:  request.text.clone(),
            response,
        })
    }

    fn unexpected_at(&self, tok: &Token) -> DgenError {
        error(
            &format!("Unexpected token {}", describe(tok)),
            tok.line,
            tok.column,
        )
    }
}

fn check_identifier(tok: &Token) -> Result<(), DgenError> {
    if IDENTIFIER.is_match(&tok.text) {
        Ok(())
    } else {
        Err(error(
            &format!("Invalid identifier {}", quote(&tok.text)),
            tok.line,
            tok.column,
        ))
    }
}

fn describe(tok: &Token) -> String {
    match tok.kind {
        TokenKind::Eof => "end of file".to_string(),
        _ => quote(&tok.text),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokenizer::tokenize_schema;

    fn parse(input: &str) -> Result<Schema, DgenError> {
        parse_schema(&tokenize_schema(input))
    }

    fn parse_error(input: &str) -> (String, usize, usize) {
        match parse(input) {
            Err(DgenError::ParseError { msg, line, column }) => (msg, line, column),
            other => panic!("expected a ParseError but got {:?}", other),
        }
    }

    #[test]
    fn test_parse_enums() {
        let schema = parse(
            r#"
            enum color {
                red, green, blue, alpha
            }

            enum fruit {
                orange, banana, tomato,
            }

            enum empty {
            }
            "#,
        )
        .unwrap();

        assert_eq!(schema.enums.len(), 3);
        assert_eq!(schema.enums[0].name, "Color");
        assert_eq!(schema.enums[0].variants, vec!["Red", "Green", "Blue", "Alpha"]);
        assert_eq!(schema.enums[1].variants, vec!["Orange", "Banana", "Tomato"]);
        assert!(schema.enums[2].variants.is_empty());
        assert_eq!((schema.enums[0].line, schema.enums[0].column), (2, 13));
    }

    #[test]
    fn test_parse_messages_with_nested_containers() {
        let schema = parse(
            r#"
            message searchResponse {
                seq=1 string result;
                optional seq=20 list[map[int32]list[map[int32]string]] pages;
                optional seq=3 map[string]list[Point] points;
            }

            message Point { seq=1 float64 x; seq=2 float64 y; }
            message nothing {}
            "#,
        )
        .unwrap();

        assert_eq!(schema.messages.len(), 3);
        let m = &schema.messages[0];
        assert_eq!(m.name, "SearchResponse");
        assert_eq!(m.fields.len(), 3);

        assert_eq!(m.fields[0].seq, 1);
        assert!(!m.fields[0].optional);
        assert_eq!(m.fields[0].ty, TypeExpr::Scalar(ScalarKind::String));
        assert_eq!(m.fields[0].name, "result");

        assert_eq!(m.fields[1].seq, 20);
        assert!(m.fields[1].optional);
        assert_eq!(
            m.fields[1].ty.to_string(),
            "list[map[int32]list[map[int32]string]]"
        );

        assert_eq!(
            m.fields[2].ty,
            TypeExpr::Map(
                ScalarKind::String,
                Box::new(TypeExpr::List(Box::new(TypeExpr::Named("Point".into()))))
            )
        );
        assert!(schema.messages[2].fields.is_empty());
    }

    #[test]
    fn test_parse_services() {
        let schema = parse(
            r#"
            service SearchService {
                Search(SearchRequest) return (SearchResponse);
                Query(QueryRequest);
            }

            service Clear {
            }
            "#,
        )
        .unwrap();

        assert_eq!(schema.services.len(), 2);
        let s = &schema.services[0];
        assert_eq!(s.name, "SearchService");
        assert_eq!(s.methods[0].name, "Search");
        assert_eq!(s.methods[0].request, "SearchRequest");
        assert_eq!(s.methods[0].response.as_deref(), Some("SearchResponse"));
        assert_eq!(s.methods[1].name, "Query");
        assert_eq!(s.methods[1].response, None);
        assert!(schema.services[1].methods.is_empty());
    }

    #[test]
    fn test_parse_declarations_in_any_order() {
        let schema = parse(
            "service S { Do(A); }\nmessage A { seq=1 B b; }\nenum B { x }\n",
        )
        .unwrap();
        assert_eq!(schema.services.len(), 1);
        assert_eq!(schema.messages.len(), 1);
        assert_eq!(schema.enums.len(), 1);
    }

    #[test]
    fn test_unexpected_top_level_token() {
        let (msg, line, column) = parse_error("\n  struct Foo {}");
        assert_eq!(msg, "Unexpected token \"struct\"");
        assert_eq!((line, column), (2, 3));
    }

    #[test]
    fn test_missing_semicolon() {
        let (msg, line, column) = parse_error("message P {\n  seq=1 string name\n}");
        assert_eq!(msg, "Expected \";\" but found \"}\"");
        assert_eq!((line, column), (3, 1));
    }

    #[test]
    fn test_seq_out_of_range() {
        let (msg, line, column) = parse_error("message P { seq=256 string name; }");
        assert!(msg.starts_with("Invalid seq \"256\""), "got {}", msg);
        assert_eq!((line, column), (1, 17));

        let (msg, _, _) = parse_error("message P { seq=x string name; }");
        assert_eq!(msg, "Expected number but found \"x\"");
    }

    #[test]
    fn test_unterminated_message_reports_end_of_file() {
        let (msg, line, column) = parse_error("message P {\n  seq=1 string name;\n");
        assert_eq!(msg, "Expected \"seq\" but found end of file");
        assert_eq!((line, column), (3, 1));
    }

    #[test]
    fn test_names_must_be_rust_identifiers() {
        let (msg, line, column) = parse_error("message A { seq=1 int32 my-field; }");
        assert_eq!(msg, "Invalid identifier \"my-field\"");
        assert_eq!((line, column), (1, 25));

        let (msg, _, _) = parse_error("enum Color { red, 9lives }");
        assert_eq!(msg, "Invalid identifier \"9lives\"");

        let (msg, line, column) = parse_error("message A {\n  seq=1 list[Pt.x] xs;\n}");
        assert_eq!(msg, "Invalid identifier \"Pt.x\"");
        assert_eq!((line, column), (2, 14));

        let (msg, _, _) = parse_error("service S$ {}");
        assert_eq!(msg, "Invalid identifier \"S$\"");

        let (msg, _, _) = parse_error("service S { Do(a-b); }");
        assert_eq!(msg, "Invalid identifier \"a-b\"");

        assert!(parse("message _a { seq=1 int32 b_2; }").is_ok());
    }

    #[test]
    fn test_map_key_must_be_scalar() {
        let (msg, _, _) = parse_error("message P { seq=1 map[list]int32 m; }");
        assert_eq!(msg, "Expected scalar map key type but found \"list\"");

        let (msg, _, _) = parse_error("message P { seq=1 map[Point]int32 m; }");
        assert_eq!(msg, "Expected scalar map key type but found \"Point\"");
    }

    #[test]
    fn test_bad_type_and_bad_method() {
        let (msg, _, _) = parse_error("message P { seq=1 ; name; }");
        assert_eq!(msg, "Expected type but found \";\"");

        let (msg, line, column) = parse_error("service S { Do(A) return B; }");
        assert_eq!(msg, "Expected \"(\" but found \"B\"");
        assert_eq!((line, column), (1, 26));
    }
}
