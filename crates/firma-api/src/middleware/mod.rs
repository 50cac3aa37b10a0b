//! # Tower/Axum Middleware
//!
//! HTTP-level middleware for the API service. Request tracing comes from
//! `tower_http::trace::TraceLayer`; this module adds Prometheus metrics.

pub mod metrics;
