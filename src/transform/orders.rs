use crate::error::{PipelineError, Result};
use polars::prelude::*;

pub const DELIVERED_STATUS: &str = "delivered";

/// Whole calendar days between purchase and delivery (delivery minus
/// purchase). Negative values pass through.
fn delivery_time_days() -> Expr {
    let as_day_number = |name: &str| col(name).cast(DataType::Date).cast(DataType::Int32);
    (as_day_number("order_delivered_customer_date") - as_day_number("order_purchase_timestamp"))
        .alias("delivery_time_days")
}

/// `yyyyMM` of the purchase timestamp as an integer, e.g. 201803.
fn purchase_month_key() -> Expr {
    let purchased = col("order_purchase_timestamp");
    (purchased.clone().dt().year().cast(DataType::Int32) * lit(100i32)
        + purchased.dt().month().cast(DataType::Int32))
    .alias("purchase_month_key")
}

/// Keep delivered orders only and add `delivery_time_days` and
/// `purchase_month_key`.
///
/// The status match is exact and case-sensitive.
pub fn enrich_delivered_orders(orders: DataFrame) -> Result<DataFrame> {
    orders
        .lazy()
        .filter(col("order_status").eq(lit(DELIVERED_STATUS)))
        .with_columns([delivery_time_days(), purchase_month_key()])
        .collect()
        .map_err(|e| PipelineError::transform("order enrichment", e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{conform, Entity};

    fn orders() -> DataFrame {
        let raw = df! [
            "order_id" => ["o1", "o2", "o3", "o4", "o5"],
            "customer_id" => ["c1", "c2", "c3", "c4", "c5"],
            "order_status" => ["delivered", "canceled", "Delivered", "delivered", "shipped"],
            "order_purchase_timestamp" => [
                "2018-01-10 23:15:00",
                "2018-01-11 10:00:00",
                "2018-01-12 10:00:00",
                "2017-11-03 08:00:00",
                "2018-02-01 09:00:00"
            ],
            "order_delivered_customer_date" => [
                Some("2018-01-15 01:00:00"),
                None,
                Some("2018-01-20 10:00:00"),
                Some("2017-11-01 12:00:00"),
                None
            ]
        ]
        .unwrap();
        conform(Entity::Orders, raw).unwrap()
    }

    #[test]
    fn test_only_exact_delivered_status_survives() {
        let enriched = enrich_delivered_orders(orders()).unwrap();

        let ids: Vec<Option<&str>> = enriched.column("order_id").unwrap().str().unwrap().into_iter().collect();
        assert_eq!(ids, vec![Some("o1"), Some("o4")]);
    }

    #[test]
    fn test_delivery_time_days_uses_calendar_dates() {
        let enriched = enrich_delivered_orders(orders()).unwrap();

        let days = enriched.column("delivery_time_days").unwrap().i32().unwrap();
        // 2018-01-10 23:15 -> 2018-01-15 01:00 counts as 5 days
        assert_eq!(days.get(0), Some(5));
        // inconsistent data is passed through as a negative value
        assert_eq!(days.get(1), Some(-2));
    }

    #[test]
    fn test_purchase_month_key() {
        let enriched = enrich_delivered_orders(orders()).unwrap();

        let keys = enriched.column("purchase_month_key").unwrap().i32().unwrap();
        assert_eq!(keys.get(0), Some(201801));
        assert_eq!(keys.get(1), Some(201711));
    }

    #[test]
    fn test_missing_delivery_date_gives_null_days() {
        let raw = df! [
            "order_id" => ["o1"],
            "customer_id" => ["c1"],
            "order_status" => ["delivered"],
            "order_purchase_timestamp" => ["2018-03-15 12:00:00"],
            "order_delivered_customer_date" => [None::<&str>]
        ]
        .unwrap();
        let enriched = enrich_delivered_orders(conform(Entity::Orders, raw).unwrap()).unwrap();

        assert_eq!(enriched.height(), 1);
        let days = enriched.column("delivery_time_days").unwrap().i32().unwrap();
        assert_eq!(days.get(0), None);
        let keys = enriched.column("purchase_month_key").unwrap().i32().unwrap();
        assert_eq!(keys.get(0), Some(201803));
    }
}
