//! Declared Schemas
//!
//! Every raw dataset is read against an explicit column list instead of
//! inferred types, so two runs over the same files always agree on dtypes.
//! `conform` is the single place where raw text becomes typed columns.

use crate::error::{PipelineError, Result};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Timestamp layouts accepted for raw text, tried in order.
pub const TIMESTAMP_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%d"];

/// The six raw extracts the fact table is built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Entity {
    Customers,
    Orders,
    OrderItems,
    Products,
    Sellers,
    Reviews,
}

/// Logical column types used in declared schemas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Text,
    Integer,
    Decimal,
    Timestamp,
}

impl ColumnType {
    pub fn dtype(&self) -> DataType {
        match self {
            ColumnType::Text => DataType::String,
            ColumnType::Integer => DataType::Int64,
            ColumnType::Decimal => DataType::Float64,
            ColumnType::Timestamp => DataType::Datetime(TimeUnit::Microseconds, None),
        }
    }
}

impl Entity {
    pub const ALL: [Entity; 6] = [
        Entity::Customers,
        Entity::Orders,
        Entity::OrderItems,
        Entity::Products,
        Entity::Sellers,
        Entity::Reviews,
    ];

    /// Logical dataset name used in logs and errors.
    pub fn dataset_name(&self) -> &'static str {
        match self {
            Entity::Customers => "customers",
            Entity::Orders => "orders",
            Entity::OrderItems => "order_items",
            Entity::Products => "products",
            Entity::Sellers => "sellers",
            Entity::Reviews => "order_reviews",
        }
    }

    pub fn declared_columns(&self) -> &'static [(&'static str, ColumnType)] {
        use ColumnType::*;
        match self {
            Entity::Customers => &[
                ("customer_id", Text),
                ("customer_unique_id", Text),
                ("customer_city", Text),
                ("customer_state", Text),
            ],
            Entity::Orders => &[
                ("order_id", Text),
                ("customer_id", Text),
                ("order_status", Text),
                ("order_purchase_timestamp", Timestamp),
                ("order_delivered_customer_date", Timestamp),
            ],
            Entity::OrderItems => &[
                ("order_id", Text),
                ("order_item_id", Integer),
                ("product_id", Text),
                ("seller_id", Text),
                ("price", Decimal),
                ("freight_value", Decimal),
            ],
            Entity::Products => &[
                ("product_id", Text),
                ("product_category_name", Text),
                ("product_photos_qty", Integer),
                ("product_weight_g", Decimal),
                ("product_length_cm", Decimal),
                ("product_height_cm", Decimal),
                ("product_width_cm", Decimal),
            ],
            Entity::Sellers => &[("seller_id", Text)],
            // review_creation_date stays text here; the review cleaner owns that cast
            Entity::Reviews => &[
                ("review_id", Text),
                ("order_id", Text),
                ("review_score", Integer),
                ("review_comment_message", Text),
                ("review_creation_date", Text),
            ],
        }
    }

    pub fn declared_schema(&self) -> Schema {
        Schema::from_iter(
            self.declared_columns()
                .iter()
                .map(|(name, ty)| Field::new(name, ty.dtype())),
        )
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dataset_name())
    }
}

/// Lenient text-to-timestamp parse. Values matching none of
/// `TIMESTAMP_FORMATS` become null.
pub fn parse_timestamp(expr: Expr) -> Expr {
    let parse = |format: &str| -> Expr {
        expr.clone().str().to_datetime(
            Some(TimeUnit::Microseconds),
            None,
            StrptimeOptions {
                format: Some(format.into()),
                strict: false,
                exact: true,
                cache: true,
            },
            lit("raise"),
        )
    };

    TIMESTAMP_FORMATS
        .iter()
        .skip(1)
        .fold(parse(TIMESTAMP_FORMATS[0]), |acc, format| {
            acc.fill_null(parse(*format))
        })
}

/// Project a raw frame onto the entity's declared schema.
///
/// Fails when a declared column is absent. Extra columns are dropped. Values
/// that do not fit the declared type become null.
pub fn conform(entity: Entity, raw: DataFrame) -> Result<DataFrame> {
    let present: Vec<String> = raw
        .get_column_names()
        .iter()
        .map(|s| s.to_string())
        .collect();

    let missing: Vec<&str> = entity
        .declared_columns()
        .iter()
        .map(|(name, _)| *name)
        .filter(|name| !present.iter().any(|p| p.as_str() == *name))
        .collect();
    if !missing.is_empty() {
        return Err(PipelineError::read(
            entity.dataset_name(),
            format!("missing declared columns: {}", missing.join(", ")),
        ));
    }

    let mut exprs = Vec::with_capacity(entity.declared_columns().len());
    for (name, ty) in entity.declared_columns() {
        let source_dtype = raw.column(name)?.dtype().clone();
        let expr = match (ty, &source_dtype) {
            (ColumnType::Timestamp, DataType::String) => parse_timestamp(col(name)),
            _ => col(name).cast(ty.dtype()),
        };
        exprs.push(expr.alias(name));
    }

    raw.lazy()
        .select(exprs)
        .collect()
        .map_err(|e| PipelineError::read(entity.dataset_name(), e))
}

/// Output columns of the fact table, in their published order.
pub const FACT_SALES_COLUMNS: [&str; 14] = [
    "order_id",
    "customer_key",
    "seller_key",
    "product_key",
    "product_price",
    "shipping_cost",
    "review_rating",
    "delivery_time_days",
    "order_status",
    "purchase_month_key",
    "purchase_date",
    "customer_city",
    "customer_state",
    "product_category",
];

pub fn fact_sales_schema() -> Schema {
    let dtypes = [
        DataType::String,
        DataType::String,
        DataType::String,
        DataType::String,
        DataType::Float64,
        DataType::Float64,
        DataType::Int32,
        DataType::Int32,
        DataType::String,
        DataType::Int32,
        DataType::Datetime(TimeUnit::Microseconds, None),
        DataType::String,
        DataType::String,
        DataType::String,
    ];
    Schema::from_iter(
        FACT_SALES_COLUMNS
            .iter()
            .zip(dtypes)
            .map(|(name, dtype)| Field::new(name, dtype)),
    )
}
