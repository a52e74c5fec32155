pub mod core;
pub mod storage;
pub mod parallel;
pub mod query;
pub mod collection;

pub use crate::core::completion::{Deferred, Settle};
pub use crate::core::config::Config;
pub use crate::core::database::Database;
pub use crate::core::error::{Error, ErrorKind, Result};
pub use crate::core::types::{DocId, Document, Fields};
pub use crate::query::predicate::Predicate;

/*
┌──────────────────────────────────────────────────────────────────────────────┐
│                          DOCSHELF STRUCT ARCHITECTURE                        │
└──────────────────────────────────────────────────────────────────────────────┘

┌────────────────────────────────── CORE LAYER ────────────────────────────────┐
│  struct Database                                                             │
│  │ config: Config                  // Roots, extension, pretty printing      │
│  │ store: CollectionStore          // Async operation set                    │
│  │ runtime: Handle                 // Where operations are spawned           │
│                                                                              │
│  Deferred<T> ◄── Settle<T>         // Settle-once outcome, await or callback │
└──────────────────────────────────────────────────────────────────────────────┘
                │ insert / find / update / delete / drop
                ▼
┌─────────────────────────────── COLLECTION LAYER ─────────────────────────────┐
│  struct CollectionStore                                                      │
│  │ layout: Arc<StorageLayout>      // <root>/collections/<name>/<id>.<ext>   │
│  │ codec: DocumentCodec            // JSON encode/decode, id generation      │
│                                                                              │
│  FanOut<T>                         // Spawn N file ops, reassemble by index  │
│  query::matcher::matches           // Subset equality on a Predicate         │
└──────────────────────────────────────────────────────────────────────────────┘
                │ tokio::fs
                ▼
┌───────────────────────────────── FILESYSTEM ─────────────────────────────────┐
│  <root>/collections/<collection>/<uuid-v7>.json   one document per file      │
│  <root>/indexes/                                  reserved, opt-in           │
└──────────────────────────────────────────────────────────────────────────────┘
*/
