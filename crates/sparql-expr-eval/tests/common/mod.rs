//! Common test utilities for expression evaluation
//!
//! This module provides shared testing infrastructure including:
//! - Constructors for algebra nodes and literals
//! - Evaluation helpers for both evaluators
//! - Mock capabilities for existence checks, aggregates and extensions

#![allow(dead_code)]

pub mod algebra;
pub mod mocks;

pub use algebra::{
    boolean, decimal, double, eval, eval_async, eval_async_with, eval_with, int, iri, lang, named, op, string,
    typed, var,
};
pub use mocks::{CountingExtension, MockAsyncHooks, exists_if_bound, failing_extension, upper_extension};
