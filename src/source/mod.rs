//! Opened image resources and the handle cache.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │              Tile Service               │
//! └───────┬─────────────────────┬───────────┘
//!         │ image id            │ path
//!         ▼                     ▼
//! ┌────────────────┐   ┌─────────────────────┐
//! │ResourceResolver│   │ DecoderHandleCache  │
//! │ (id -> path)   │   │ (LRU, singleflight) │
//! └────────────────┘   └──────────┬──────────┘
//!                                 │ Arc<ImageSource>
//!                                 ▼
//!                      ┌─────────────────────┐
//!                      │    ImageSource      │
//!                      │ (handle + its lock) │
//!                      └─────────────────────┘
//! ```

mod cache;
mod image;
mod resolver;

pub use cache::{CacheStats, DecoderHandleCache, DEFAULT_HANDLE_CACHE_CAPACITY};
pub use image::{FrameInfo, ImageMetadata, ImageSource, IndexRange};
pub use resolver::{ResourceResolver, DEFAULT_ALLOWED_EXTENSIONS};
