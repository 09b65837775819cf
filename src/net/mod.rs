//! Network layer: the TLS listener.
//!
//! Plaintext serving goes straight through `axum::serve`; TLS terminates
//! rustls per connection and hands the stream to hyper.

pub mod tls;
