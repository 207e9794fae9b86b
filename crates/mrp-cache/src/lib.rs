//! # MRP Cache
//!
//! 緩存模組：同一 (成品, BOM 版本) 只展開一次

pub mod bom_expansion;

// Re-export 主要類型
pub use bom_expansion::{BomExpansion, BomExpansionCache, CacheStats, ExpandedLine};
