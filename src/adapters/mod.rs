//! Adapter layer modules for external collaborators.
//!
//! Provides adapters for:
//! - Package readers that supply signatures and content digests
//! - Trusted root certificate stores
//! - Revocation clients (static and CRL based)
//! - HTTP retrieval of CRLs from distribution points

pub mod crl_http_client;
pub mod package;
pub mod revocation;
pub mod trust_store;
