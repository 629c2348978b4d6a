use std::sync::{Arc, Mutex};
use std::thread;

use dgen::{Message, Router, RpcError, WireError};
use example_app::search::{
    register_search_service, Hit, Ping, SearchRequest, SearchResponse, SearchService,
    SearchServiceAdapter, SearchServiceHandler,
};

#[derive(Clone, Default)]
struct Engine {
    pings: Arc<Mutex<Vec<i64>>>,
}

impl SearchService for Engine {
    fn search(&self, req: &SearchRequest) -> Result<SearchResponse, RpcError> {
        if req.query == "boom" {
            return Err(RpcError::service("index unavailable"));
        }
        Ok(SearchResponse {
            hits: vec![Hit {
                url: format!("https://example.com/?q={}", req.query),
                title: req.query.to_uppercase(),
                score: 0.5,
                snippets: vec![req.query.clone()],
            }],
            total: 1,
            ..Default::default()
        })
    }

    fn record(&self, req: &Ping) -> Result<(), RpcError> {
        self.pings.lock().unwrap().push(req.nonce);
        Ok(())
    }
}

fn request(query: &str) -> Vec<u8> {
    SearchRequest { query: query.to_string(), ..Default::default() }
        .marshal()
        .unwrap()
}

#[test]
fn methods_are_registered_under_the_service_name() {
    let mut router = Router::new();
    register_search_service(&mut router, "search.v1", Engine::default());
    assert_eq!(router.methods(), vec!["search.v1.Record", "search.v1.Search"]);
    assert!(!router.contains("SearchService.Search"));
}

#[test]
fn request_response_call() {
    let mut router = Router::new();
    register_search_service(&mut router, "search", Engine::default());

    let reply = router.call("search.Search", &request("rust")).unwrap();
    let response = SearchResponse::unmarshal(&reply).unwrap();
    assert_eq!(response.total, 1);
    assert_eq!(response.hits[0].title, "RUST");
    assert_eq!(response.hits[0].url, "https://example.com/?q=rust");
}

#[test]
fn fire_and_forget_replies_with_nothing() {
    let engine = Engine::default();
    let mut router = Router::new();
    register_search_service(&mut router, "search", engine.clone());

    let reply = router.call("search.Record", &Ping { nonce: 11 }.marshal().unwrap()).unwrap();
    assert!(reply.is_empty());
    assert_eq!(*engine.pings.lock().unwrap(), vec![11]);
}

#[test]
fn errors_reach_the_caller() {
    let mut router = Router::new();
    register_search_service(&mut router, "search", Engine::default());

    let err = router.call("search.Search", &request("boom")).unwrap_err();
    assert!(matches!(err, RpcError::Service(_)), "got {:?}", err);
    assert_eq!(err.to_string(), "service error: index unavailable");

    let err = router.call("search.Search", &[]).unwrap_err();
    assert!(
        matches!(err, RpcError::Wire(WireError::FieldNotFound(ref f)) if f == "query"),
        "got {:?}",
        err
    );

    let err = router.call("search.Delete", &[]).unwrap_err();
    assert!(matches!(err, RpcError::UnknownMethod(ref m) if m == "search.Delete"));
}

#[test]
fn adapter_serves_raw_bytes() {
    let adapter = SearchServiceAdapter::new(Engine::default());
    let reply = adapter.search_handler(&request("bytes")).unwrap();
    assert_eq!(SearchResponse::unmarshal(&reply).unwrap().hits[0].snippets, vec!["bytes"]);
    assert!(adapter.into_inner().pings.lock().unwrap().is_empty());
}

#[test]
fn router_is_shared_across_threads() {
    let engine = Engine::default();
    let mut router = Router::new();
    register_search_service(&mut router, "search", engine.clone());
    let router = Arc::new(router);

    let workers: Vec<_> = (0..4i64)
        .map(|nonce| {
            let router = Arc::clone(&router);
            thread::spawn(move || {
                router.call("search.Record", &Ping { nonce }.marshal().unwrap()).unwrap();
                let reply = router.call("search.Search", &request("threads")).unwrap();
                SearchResponse::unmarshal(&reply).unwrap().total
            })
        })
        .collect();

    for worker in workers {
        assert_eq!(worker.join().unwrap(), 1);
    }
    let mut pings = engine.pings.lock().unwrap().clone();
    pings.sort_unstable();
    assert_eq!(pings, vec![0, 1, 2, 3]);
}
