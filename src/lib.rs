//! mathsearch - semantic retrieval over a corpus of worked math problems.
//!
//! A corpus laid out as `<root>/<subject>/<name>.json` is embedded with a
//! BERT sentence encoder (via [candle](https://github.com/huggingface/candle))
//! and stored in a local [redb](https://github.com/cberner/redb) vector
//! collection. Queries are answered with an exact cosine top-k scan.
//!
//! # Quick start
//!
//! ```no_run
//! use mathsearch::{DataDir, ModelManager, PointDb};
//! use mathsearch::ingest::{self, IngestParams};
//! use mathsearch::search::{self, SearchParams};
//!
//! let data_dir = DataDir::resolve(None).unwrap();
//! let store = PointDb::open(&data_dir.points_db()).unwrap();
//! let mut model = ModelManager::new();
//!
//! ingest::ingest(
//!     &store,
//!     &mut model,
//!     &IngestParams {
//!         collection: "math_problems",
//!         corpus_root: std::path::Path::new("./train"),
//!         show_progress: false,
//!     },
//! )
//! .unwrap();
//!
//! let params = SearchParams {
//!     collection: "math_problems",
//!     query: "area of a triangle inscribed in a circle",
//!     top_k: 5,
//! };
//! for r in search::search(&store, &mut model, &params).unwrap() {
//!     println!("{}. {} ({:.3})", r.rank, r.payload.problem, r.score);
//! }
//! ```

pub mod cli;
pub mod config;
pub mod data_dir;
pub mod embedding;
pub mod error;
pub mod ingest;
pub mod mcp;
pub mod model_manager;
pub mod point_db;
pub mod record;
pub mod search;
pub mod vector_store;
pub mod walker;

pub use config::Settings;
pub use data_dir::DataDir;
pub use embedding::Embedder;
pub use error::{Error, Result};
pub use model_manager::ModelManager;
pub use point_db::PointDb;
pub use vector_store::VectorStore;
