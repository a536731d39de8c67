//! Durable media storage for Vesper.
//!
//! Generated images arrive as transient URLs or inline bytes. This crate
//! downloads them and writes them to a [`MediaStore`] under a fresh,
//! owner-namespaced path so that no two uploads ever share a location.

mod config;
mod fetch;
mod filesystem;
mod object;
mod path;
mod store;

pub use config::{StorageConfig, build_store};
pub use fetch::{DownloadedAsset, download};
pub use filesystem::FileSystemStore;
pub use object::ObjectStore;
pub use path::{extension_for, object_path};
pub use store::MediaStore;
