//! Core domain types
//!
//! These structures mirror the parts of the Kubernetes `v1` API that Kubeplex
//! touches. They are shared between the client (wire format) and the
//! transcoder (lifecycle decisions).

pub mod pod;
