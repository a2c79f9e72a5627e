//! Fact Assembler
//!
//! Joins the delivered orders to their line items and left-joins every
//! dimension onto that grain. Only the first join may drop rows.

use crate::error::{PipelineError, Result};
use polars::prelude::*;
use tracing::{debug, warn};

/// Cleaned dimension datasets joined onto the fact grain.
pub struct Dimensions {
    pub customers: DataFrame,
    pub sellers: DataFrame,
    pub products: DataFrame,
    pub reviews: DataFrame,
}

/// Wide joined frame plus the row counts observed while building it.
#[derive(Debug)]
pub struct AssembledFacts {
    pub frame: DataFrame,
    /// Rows after the order/line-item join
    pub grain_rows: usize,
    /// Extra rows introduced by orders with more than one review
    pub review_fan_out: usize,
}

fn join_on(
    left: DataFrame,
    right: DataFrame,
    key: &str,
    join_type: JoinType,
    stage: &'static str,
) -> Result<DataFrame> {
    left.lazy()
        .join(right.lazy(), [col(key)], [col(key)], JoinArgs::new(join_type))
        .collect()
        .map_err(|e| PipelineError::transform(stage, format!("Join on {} failed: {}", key, e)))
}

/// Copy a dimension's own identifier into a key column before the join, so the
/// key stays null when the dimension has no matching row.
fn with_key(dimension: DataFrame, source: &str, key: &str) -> Result<DataFrame> {
    dimension
        .lazy()
        .with_column(col(source).alias(key))
        .collect()
        .map_err(|e| PipelineError::transform("dimension keys", e))
}

pub fn assemble_facts(
    orders: DataFrame,
    order_items: DataFrame,
    dimensions: Dimensions,
) -> Result<AssembledFacts> {
    let Dimensions {
        customers,
        sellers,
        products,
        reviews,
    } = dimensions;

    let facts = join_on(orders, order_items, "order_id", JoinType::Inner, "line item join")?;
    let grain_rows = facts.height();
    debug!("Fact grain established at {} line items", grain_rows);

    let customers = with_key(customers, "customer_unique_id", "customer_key")?;
    let facts = join_on(facts, customers, "customer_id", JoinType::Left, "customer join")?;

    let sellers = with_key(sellers, "seller_id", "seller_key")?;
    let facts = join_on(facts, sellers, "seller_id", JoinType::Left, "seller join")?;

    let products = with_key(products, "product_id", "product_key")?;
    let facts = join_on(facts, products, "product_id", JoinType::Left, "product join")?;

    let before_reviews = facts.height();
    let facts = join_on(facts, reviews, "order_id", JoinType::Left, "review join")?;
    let review_fan_out = facts.height() - before_reviews;
    if review_fan_out > 0 {
        warn!(
            "Review join fanned out {} extra rows ({} -> {}); orders with several reviews repeat per review",
            review_fan_out,
            before_reviews,
            facts.height()
        );
    }

    Ok(AssembledFacts {
        frame: facts,
        grain_rows,
        review_fan_out,
    })
}
