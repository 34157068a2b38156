//! 도메인 모델.

pub mod asset;
pub mod collection;
pub mod marketplace;

pub use asset::{Asset, NewAsset};
pub use collection::Collection;
pub use marketplace::{MarketplaceKind, PaginationStyle};
