use crate::error::{PipelineError, Result};
use crate::schema::parse_timestamp;
use polars::prelude::*;

/// Narrow the review extract to the columns the fact table needs.
///
/// `review_created_at` is the creation date parsed as a timestamp; values that
/// do not parse become null and the row is kept.
pub fn clean_reviews(reviews: DataFrame) -> Result<DataFrame> {
    reviews
        .lazy()
        .select([
            col("review_id"),
            col("order_id"),
            col("review_comment_message"),
            parse_timestamp(col("review_creation_date")).alias("review_created_at"),
            col("review_score").cast(DataType::Int32).alias("review_rating"),
        ])
        .collect()
        .map_err(|e| PipelineError::transform("review cleaning", e))
}

/// Keep a single review per order: the latest by `review_created_at`.
///
/// Reviews without a timestamp lose against any dated review; remaining ties
/// go to the smallest `review_id`.
pub fn latest_review_per_order(reviews: DataFrame) -> Result<DataFrame> {
    reviews
        .lazy()
        .sort(
            ["order_id", "review_created_at", "review_id"],
            SortMultipleOptions::default()
                .with_order_descendings([false, true, false])
                .with_nulls_last(true)
                .with_maintain_order(true),
        )
        .unique_stable(
            Some(vec!["order_id".to_string()]),
            UniqueKeepStrategy::First,
        )
        .collect()
        .map_err(|e| PipelineError::transform("review dedupe", e))
}
