//! Bangumi API client layer
//!
//! This module provides:
//! - `Transport` trait, the single seam where requests leave the process
//! - `BangumiClient` with one typed method per backend operation
//! - `ReqwestTransport` for production and `MockTransport` for tests

pub mod client;
pub mod mock;
pub mod transport;

pub use client::{ApiResponse, BangumiClient, ImageType, query_pairs};
pub use mock::MockTransport;
pub use transport::{ApiRequest, DEFAULT_BASE_URL, RawResponse, ReqwestTransport, Transport};
