//! # Media Pipeline
//!
//! Stores uploaded media, derives one thumbnail per configured format, keeps
//! the files on a pluggable (optionally replicated) filesystem and hands out
//! public URLs through a CDN that can be asked to invalidate them.
//!
//! # Architecture
//!
//! A media flows through its provider in four steps:
//!
//! ```text
//! 1. transform     upload bytes  →  box, content type, reference name
//! 2. post_persist  reference     →  original + one thumbnail per format
//! 3. post_update   new upload    →  files replaced, CDN flush requested
//! 4. remove        media         →  files deleted, CDN flushed
//! ```
//!
//! Every step is assembled from small strategies behind traits, so a
//! provider is a composition rather than a subclass:
//!
//! ```text
//! Pool ─▶ ImageProvider ─┬─ Generator       id → directory
//!                        ├─ Filesystem      keys → bytes (local, memory, replicated)
//!                        ├─ Thumbnail       format → key, generation policy
//!                        │    └─ Resizer    box math → ImageBackend → MetadataBuilder
//!                        └─ Cdn             key → public URL, invalidation
//! ```
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`imaging`] | Box geometry and the pure-Rust codec backend |
//! | [`format`] | Format settings and per-provider catalogs |
//! | [`media`] | The media record and its lookup trait |
//! | [`metadata`] | Object metadata attached to written files |
//! | [`filesystem`] | Key/value storage adapters and the replication adapter |
//! | [`generator`] | Storage directory per media |
//! | [`resizer`] | `simple`, `square` and `crop` resizing strategies |
//! | [`thumbnail`] | Synchronous, queued and cache-resolved thumbnail policies |
//! | [`cdn`] | Public paths and invalidation (server, CloudFront, Panther, fallback) |
//! | [`provider`] | The media lifecycle |
//! | [`pool`] | Provider and context registry, upload size validation |
//! | [`config`] | `media.toml` loading, validation and pool assembly |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Content-Addressed Originals
//!
//! The stored original is named after the SHA-256 of its bytes. Re-uploading
//! the same file yields the same key, and replacing content always yields a
//! new key, which is what lets `post_update` delete the old original safely.
//!
//! ## Stable Paths
//!
//! Generators are pure functions of the media id and context. A thumbnail's
//! key never changes, so regenerating it overwrites in place and the only
//! cache that can go stale is the CDN's, which `post_update` flushes.
//!
//! ## Transports Behind Traits
//!
//! CloudFront, Panther and the message bus are reached through small client
//! traits. The crate ships in-process implementations and test doubles; a
//! host application plugs in its own HTTP or queue client.

pub mod cdn;
pub mod config;
pub mod filesystem;
pub mod format;
pub mod generator;
pub mod imaging;
pub mod media;
pub mod metadata;
pub mod output;
pub mod pool;
pub mod provider;
pub mod resizer;
pub mod thumbnail;

#[cfg(test)]
pub(crate) mod test_helpers;
