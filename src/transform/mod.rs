//! Pure transformation stages. Each takes frames by value and returns new
//! frames; none of them touches I/O.

pub mod assembler;
pub mod orders;
pub mod products;
pub mod projector;
pub mod reviews;

pub use assembler::{assemble_facts, AssembledFacts, Dimensions};
pub use orders::{enrich_delivered_orders, DELIVERED_STATUS};
pub use products::{clean_products, normalize_category, UNKNOWN_CATEGORY};
pub use projector::project_fact_sales;
pub use reviews::{clean_reviews, latest_review_per_order};
