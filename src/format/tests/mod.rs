//! Unit tests for the dataset file formats.
//!
//! These tests check how the on-disk JSON documents are read and written,
//! including the legacy and malformed inputs found in older datasets.

mod manifest_tests;
