//! NAS document storage: remote store clients, folder layout, uploads,
//! reconciliation and the read-only proxy.

pub mod cache;
pub mod classify;
pub mod error;
pub mod ftp;
pub mod paths;
pub mod provision;
pub mod proxy;
pub mod service;
pub mod store;
pub mod sync;
pub mod webdav;

pub use cache::{NasConnector, ProviderChain, StoreCache, StoreFactory};
pub use error::{FailureKind, NasError, NasResult, RemoteStoreError, StoreResult};
pub use paths::{BusinessModule, PropertyCategory};
pub use service::{
    ContactDocumentUpload, DocumentUpload, Download, FileUpload, ImageUpload, IndexKind,
    NasService,
};
pub use store::{EntryKind, RemoteEntry, RemoteStore};
pub use sync::SyncSummary;
