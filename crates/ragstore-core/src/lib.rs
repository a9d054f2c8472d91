#![deny(warnings)]
#![deny(dead_code)]
#![deny(unused_variables)]
#![deny(unused_imports)]

pub mod config;
pub mod loader;
pub mod error;
pub mod ledger;
pub mod normalize;
pub mod traits;
pub mod types;

pub use error::{Error, Result};
pub use ledger::DedupLedger;
pub use normalize::{content_hash, normalize};
pub use types::{Collection, ContentHash, Document, Meta, Position, SearchHit, SourceKind};
