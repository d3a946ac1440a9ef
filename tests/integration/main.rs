//! Integration tests for the crawler

mod crawl_tests;
