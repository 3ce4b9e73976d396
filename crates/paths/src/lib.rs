//! Shared artifact path definitions for S3 and Azure Blob Storage
//!
//! This crate centralizes the content-pack key layout and the REST path
//! fragments used by the artifact providers, so the providers and their
//! mock-server tests agree on a single source of truth.
//!
//! ## Key layout
//!
//! Custom content packs are stored as
//! `content/packs/{pack_id}/{pack_version}/{pack_id}.zip`, identical on every
//! backend. See [`pack`].

pub mod azure;
pub mod pack;

pub use pack::{
    pack_archive_key, pack_prefix, parse_pack_key, PackKey, CHECKSUM_METADATA_KEY, PACKS_ROOT,
};
