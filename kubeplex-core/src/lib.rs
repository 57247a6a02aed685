//! Kubeplex Core
//!
//! Core types for running transcoder workloads as Kubernetes pods.
//!
//! This crate contains:
//! - Domain types: the subset of the Kubernetes Pod model we read and write
//! - Template: derivation of a worker pod from the caller's own pod

pub mod domain;
pub mod template;

pub use template::{DeriveError, derive_worker_pod};
