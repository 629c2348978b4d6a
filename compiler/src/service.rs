//! Service stub generation.
//!
//! For each service `S` the output holds:
//! - `trait S`: the typed methods a server implements;
//! - `trait SHandler`: the same methods over raw request bytes;
//! - `struct SAdapter<T>`: turns any `S` into an `SHandler` by decoding the
//!   request, calling the typed method and encoding the reply;
//! - `fn register_s`: binds every method under `"<service_name>.<Method>"`
//!   on a `dgen::rpc::Registrar`.

use crate::{
    codec::type_ident,
    gen_rust::header,
    types::{Method, ServiceDecl},
    utils::{escape_rust_keyword, first_upper, to_snake_case},
};

const RPC_RESULT: &str = "::std::result::Result";
const RPC_ERROR: &str = "::dgen::rpc::RpcError";

/// Rust name of the service trait: `search` becomes `Search`.
pub(crate) fn service_ident(name: &str) -> String {
    type_ident(&first_upper(name))
}

pub(crate) fn method_ident(method: &Method) -> String {
    escape_rust_keyword(&to_snake_case(&method.name))
}

fn handler_ident(method: &Method) -> String {
    format!("{}_handler", to_snake_case(&method.name))
}

fn service_trait(service: &ServiceDecl, name: &str) -> String {
    let mut lines = vec![format!("pub trait {} {{", name)];
    for method in &service.methods {
        let response = match &method.response {
            Some(response) => type_ident(response),
            None => "()".to_string(),
        };
        lines.push(format!(
            "    fn {}(&self, req: &{}) -> {}<{}, {}>;",
            method_ident(method),
            type_ident(&method.request),
            RPC_RESULT,
            response,
            RPC_ERROR
        ));
    }
    lines.push("}\n".to_string());
    lines.join("\n")
}

fn handler_trait(service: &ServiceDecl, name: &str) -> String {
    let mut lines = vec![format!("pub trait {}Handler {{", name)];
    for method in &service.methods {
        lines.push(format!(
            "    fn {}(&self, req: &[u8]) -> {}<::std::vec::Vec<u8>, {}>;",
            handler_ident(method),
            RPC_RESULT,
            RPC_ERROR
        ));
    }
    lines.push("}\n".to_string());
    lines.join("\n")
}

fn adapter(service: &ServiceDecl, name: &str) -> String {
    let mut lines = vec![
        format!("/// Serves a `{}` implementation through `{}Handler`.", name, name),
        format!("pub struct {}Adapter<T> {{", name),
        "    service: T,".to_string(),
        "}\n".to_string(),
        format!("impl<T> {}Adapter<T> {{", name),
        "    pub fn new(service: T) -> Self {".to_string(),
        "        Self { service }".to_string(),
        "    }\n".to_string(),
        "    pub fn into_inner(self) -> T {".to_string(),
        "        self.service".to_string(),
        "    }".to_string(),
        "}\n".to_string(),
    ];

    if service.methods.is_empty() {
        lines.push(format!("impl<T: {}> {}Handler for {}Adapter<T> {{}}\n", name, name, name));
        return lines.join("\n");
    }

    lines.push(format!("impl<T: {}> {}Handler for {}Adapter<T> {{", name, name, name));
    let mut bodies = Vec::new();
    for method in &service.methods {
        let mut body = vec![
            format!(
                "    fn {}(&self, req: &[u8]) -> {}<::std::vec::Vec<u8>, {}> {{",
                handler_ident(method),
                RPC_RESULT,
                RPC_ERROR
            ),
            format!(
                "        let args = <{} as ::dgen::wire::Message>::unmarshal(req)?;",
                type_ident(&method.request)
            ),
        ];
        if method.response.is_some() {
            body.push(format!("        let reply = self.service.{}(&args)?;", method_ident(method)));
            body.push("        Ok(::dgen::wire::Message::marshal(&reply)?)".to_string());
        } else {
            body.push(format!("        self.service.{}(&args)?;", method_ident(method)));
            body.push("        Ok(::std::vec::Vec::new())".to_string());
        }
        body.push("    }".to_string());
        bodies.push(body.join("\n"));
    }
    lines.push(bodies.join("\n\n"));
    lines.push("}\n".to_string());
    lines.join("\n")
}

fn register_fn(service: &ServiceDecl, name: &str) -> String {
    let mut lines = vec![
        format!(
            "/// Registers every `{}` method as `\"<service_name>.<Method>\"`.",
            name
        ),
        format!(
            "pub fn register_{}<R, T>(server: &mut R, service_name: &str, service: T)",
            to_snake_case(&service.name)
        ),
        "where".to_string(),
        "    R: ::dgen::rpc::Registrar + ?Sized,".to_string(),
        format!("    T: {} + Send + Sync + 'static,", name),
        "{".to_string(),
    ];

    if service.methods.is_empty() {
        lines.push("    let _ = (server, service_name, service);".to_string());
        lines.push("}\n".to_string());
        return lines.join("\n");
    }

    lines.push(format!(
        "    let adapter = ::std::sync::Arc::new({}Adapter::new(service));",
        name
    ));
    for method in &service.methods {
        lines.push("    {".to_string());
        lines.push("        let adapter = ::std::sync::Arc::clone(&adapter);".to_string());
        lines.push("        server.register(".to_string());
        lines.push(format!("            format!(\"{{}}.{{}}\", service_name, {:?}),", method.name));
        lines.push(format!(
            "            ::std::boxed::Box::new(move |req: &[u8]| adapter.{}(req)),",
            handler_ident(method)
        ));
        lines.push("        );".to_string());
        lines.push("    }".to_string());
    }
    lines.push("}\n".to_string());
    lines.join("\n")
}

/// Renders the stub file for every service. A schema without services still
/// gets a file holding just the header.
pub fn compile_services_to_rust(services: &[ServiceDecl], source_name: &str) -> String {
    let mut rust_code = vec![header(source_name)];
    for service in services {
        let name = service_ident(&service.name);
        rust_code.push(service_trait(service, &name));
        rust_code.push(handler_trait(service, &name));
        rust_code.push(adapter(service, &name));
        rust_code.push(register_fn(service, &name));
    }
    rust_code.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::compile_schema;

    fn stubs(input: &str) -> String {
        let schema = compile_schema(input).expect("compile_schema failed");
        compile_services_to_rust(&schema.services, "search.dg")
    }

    const SEARCH: &str = r#"
        message SearchRequest { seq=1 string query; }
        message SearchResponse { optional seq=1 list[string] results; }
        service SearchService {
            Search(SearchRequest) return (SearchResponse);
            Notify(searchRequest);
        }
    "#;

    #[test]
    fn test_service_trait() {
        let out = stubs(SEARCH);
        assert!(out.contains(
            "pub trait SearchService {\n    fn search(&self, req: &SearchRequest) -> ::std::result::Result<SearchResponse, ::dgen::rpc::RpcError>;\n"
        ));
        assert!(out.contains(
            "    fn notify(&self, req: &SearchRequest) -> ::std::result::Result<(), ::dgen::rpc::RpcError>;\n}"
        ));
    }

    #[test]
    fn test_handler_and_adapter() {
        let out = stubs(SEARCH);
        assert!(out.contains("pub trait SearchServiceHandler {"));
        assert!(out.contains("    fn search_handler(&self, req: &[u8]) -> ::std::result::Result<::std::vec::Vec<u8>, ::dgen::rpc::RpcError>;"));
        assert!(out.contains("impl<T: SearchService> SearchServiceHandler for SearchServiceAdapter<T> {"));
        assert!(out.contains("        let reply = self.service.search(&args)?;"));
        // Fire-and-forget methods reply with an empty payload.
        assert!(out.contains("        self.service.notify(&args)?;\n        Ok(::std::vec::Vec::new())"));
    }

    #[test]
    fn test_registration_uses_service_name_prefix() {
        let out = stubs(SEARCH);
        assert!(out.contains("pub fn register_search_service<R, T>(server: &mut R, service_name: &str, service: T)"));
        assert!(out.contains("            format!(\"{}.{}\", service_name, \"Search\"),"));
        assert!(out.contains("            format!(\"{}.{}\", service_name, \"Notify\"),"));
        assert!(out.contains("move |req: &[u8]| adapter.notify_handler(req)"));
    }

    #[test]
    fn test_no_services_yields_header_only() {
        let out = stubs("message A {}");
        assert_eq!(out, "// Code generated by dgen from search.dg. DO NOT EDIT.\n");
    }

    #[test]
    fn test_empty_service() {
        let out = stubs("service Idle {}");
        assert!(out.contains("pub trait Idle {\n}"));
        assert!(out.contains("impl<T: Idle> IdleHandler for IdleAdapter<T> {}"));
        assert!(out.contains("    let _ = (server, service_name, service);"));
    }
}
