//! Types and service stubs generated from `schema/*.dg` by `build.rs`.

/// The search service, binary encoded.
pub mod search {
    include!(concat!(env!("OUT_DIR"), "/search.rs"));
    include!(concat!(env!("OUT_DIR"), "/search_rpc.rs"));
}

/// Messages covering the edges of the binary wire format.
pub mod cases {
    include!(concat!(env!("OUT_DIR"), "/cases.rs"));
    include!(concat!(env!("OUT_DIR"), "/cases_rpc.rs"));
}

/// A JSON encoded directory service.
pub mod contacts {
    include!(concat!(env!("OUT_DIR"), "/contacts.rs"));
    include!(concat!(env!("OUT_DIR"), "/contacts_rpc.rs"));
}
