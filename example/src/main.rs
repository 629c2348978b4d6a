// example/src/main.rs

use std::sync::atomic::{AtomicU64, Ordering};

use dgen::{Message, Router, RpcError};
use example_app::search::{
    register_search_service, Corpus, Hit, Ping, SearchRequest, SearchResponse, SearchService,
};

/// Answers every query with one canned hit per tag.
#[derive(Default)]
struct CannedSearch {
    pings: AtomicU64,
}

impl SearchService for CannedSearch {
    fn search(&self, req: &SearchRequest) -> Result<SearchResponse, RpcError> {
        let hits = req
            .tags
            .iter()
            .map(|tag| Hit {
                url: format!("https://example.com/{}?q={}", tag, req.query),
                title: tag.clone(),
                score: 1.0,
                snippets: vec![format!("all about {}", tag)],
            })
            .collect::<Vec<_>>();

        Ok(SearchResponse {
            total: hits.len() as u64,
            hits,
            echo: Some(Box::new(req.clone())),
            ..Default::default()
        })
    }

    fn record(&self, _req: &Ping) -> Result<(), RpcError> {
        self.pings.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

fn main() -> Result<(), RpcError> {
    let mut router = Router::new();
    register_search_service(&mut router, "search", CannedSearch::default());
    println!("Registered methods: {:?}", router.methods());

    let request = SearchRequest {
        query: "rust".to_string(),
        page_number: 1,
        corpus: Corpus::Web,
        tags: vec!["docs".to_string(), "blog".to_string()],
        ..Default::default()
    };
    let bytes = request.marshal()?;
    println!("Encoded request: {} bytes {:?}", bytes.len(), bytes);

    let reply = router.call("search.Search", &bytes)?;
    let response = SearchResponse::unmarshal(&reply)?;
    for hit in &response.hits {
        println!("{} ({})", hit.url, hit.title);
    }

    router.call("search.Record", &Ping { nonce: 7 }.marshal()?)?;
    Ok(())
}
