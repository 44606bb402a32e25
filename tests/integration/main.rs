//! Integration tests for cws-lister
//!
//! These tests use wiremock to stand in for the store and exercise the
//! fetcher, the resolver and whole runs end-to-end.

mod common;
mod fetcher_tests;
mod resolver_tests;
mod run_tests;
