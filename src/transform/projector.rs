use crate::error::{PipelineError, Result};
use polars::prelude::*;

/// (source column in the joined frame, published fact column)
pub const FACT_SALES_PROJECTION: [(&str, &str); 14] = [
    ("order_id", "order_id"),
    ("customer_key", "customer_key"),
    ("seller_key", "seller_key"),
    ("product_key", "product_key"),
    ("price", "product_price"),
    ("freight_value", "shipping_cost"),
    ("review_rating", "review_rating"),
    ("delivery_time_days", "delivery_time_days"),
    ("order_status", "order_status"),
    ("purchase_month_key", "purchase_month_key"),
    ("order_purchase_timestamp", "purchase_date"),
    ("customer_city", "customer_city"),
    ("customer_state", "customer_state"),
    ("product_category_standard", "product_category"),
];

/// Select and rename the published fact columns; everything else is dropped.
pub fn project_fact_sales(wide: DataFrame) -> Result<DataFrame> {
    let exprs: Vec<Expr> = FACT_SALES_PROJECTION
        .iter()
        .map(|(source, target)| col(source).alias(target))
        .collect();

    wide.lazy()
        .select(exprs)
        .collect()
        .map_err(|e| PipelineError::transform("fact projection", e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::FACT_SALES_COLUMNS;

    #[test]
    fn test_projection_targets_match_fact_columns() {
        let targets: Vec<&str> = FACT_SALES_PROJECTION.iter().map(|(_, t)| *t).collect();
        assert_eq!(targets, FACT_SALES_COLUMNS.to_vec());
    }

    #[test]
    fn test_projection_renames_and_drops_join_columns() {
        let wide = df! [
            "order_id" => ["o1"],
            "customer_id" => ["c1"],
            "seller_id" => ["s1"],
            "customer_key" => ["u1"],
            "seller_key" => ["s1"],
            "product_key" => ["p1"],
            "price" => [10.5],
            "freight_value" => [2.0],
            "review_rating" => [4i32],
            "delivery_time_days" => [3i32],
            "order_status" => ["delivered"],
            "purchase_month_key" => [201803i32],
            "order_purchase_timestamp" => ["2018-03-15 12:00:00"],
            "customer_city" => ["recife"],
            "customer_state" => ["PE"],
            "product_category_standard" => ["toys"],
            "review_comment_message" => ["legal"]
        ]
        .unwrap();

        let fact = project_fact_sales(wide).unwrap();

        assert_eq!(fact.get_column_names(), FACT_SALES_COLUMNS.to_vec());
        assert_eq!(fact.column("product_price").unwrap().f64().unwrap().get(0), Some(10.5));
        assert_eq!(fact.column("shipping_cost").unwrap().f64().unwrap().get(0), Some(2.0));
        assert_eq!(fact.column("product_category").unwrap().str().unwrap().get(0), Some("toys"));
    }
}
