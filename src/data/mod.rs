/// Data layer: core types, loading, filtering and aggregation.
///
/// Architecture:
/// ```text
///  .csv / .parquet / .json
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  parse file → Dataset (rows without a model year dropped)
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  cache    │  one Dataset per source path, shared behind Arc
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  filter   │  FilterState → FilteredView (order preserved)
///   └──────────┘
///        │
///        ▼
///   ┌───────────┐
///   │ aggregate  │  top-N, growth, distribution, numeric groups
///   └───────────┘
///        │
///        ▼
///   ┌──────────┐
///   │ pipeline  │  every chart for one FilterState
///   └──────────┘
/// ```

pub mod aggregate;
pub mod cache;
pub mod filter;
pub mod loader;
pub mod model;
pub mod pipeline;
