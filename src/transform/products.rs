use crate::error::{PipelineError, Result};
use lazy_static::lazy_static;
use polars::prelude::*;
use regex::Regex;

pub const UNKNOWN_CATEGORY: &str = "unknown";

const NUMERIC_DEFAULTS: [&str; 5] = [
    "product_photos_qty",
    "product_weight_g",
    "product_length_cm",
    "product_height_cm",
    "product_width_cm",
];

const CATEGORY_SEPARATOR_PATTERN: &str = r"[- ]+";

lazy_static! {
    static ref CATEGORY_SEPARATORS: Regex =
        Regex::new(CATEGORY_SEPARATOR_PATTERN).expect("static regex");
}

/// Lowercase a category name and collapse each run of hyphens or spaces to a
/// single underscore. Applying it twice gives the same result as once.
pub fn normalize_category(name: &str) -> String {
    CATEGORY_SEPARATORS
        .replace_all(&name.to_lowercase(), "_")
        .into_owned()
}

/// Fill missing product attributes and derive `product_category_standard`.
///
/// The category is normalized after the fill, so a missing name ends up as
/// `"unknown"`.
pub fn clean_products(products: DataFrame) -> Result<DataFrame> {
    let mut fills = vec![col("product_category_name").fill_null(lit(UNKNOWN_CATEGORY))];
    for name in NUMERIC_DEFAULTS {
        fills.push(col(name).fill_null(lit(0)).alias(name));
    }

    products
        .lazy()
        .with_columns(fills)
        .with_columns([col("product_category_name")
            .str()
            .to_lowercase()
            .str()
            .replace_all(lit(CATEGORY_SEPARATOR_PATTERN), lit("_"), false)
            .alias("product_category_standard")])
        .collect()
        .map_err(|e| PipelineError::transform("product cleaning", e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{conform, Entity};

    #[test]
    fn test_normalize_category() {
        assert_eq!(normalize_category("Home Appliances"), "home_appliances");
        assert_eq!(normalize_category("home-appliances"), "home_appliances");
        assert_eq!(normalize_category("Home - Appliances"), "home_appliances");
        assert_eq!(normalize_category("cama_mesa_banho"), "cama_mesa_banho");
    }

    #[test]
    fn test_normalize_category_is_idempotent() {
        for raw in ["Home Appliances", "Fashion--Shoes", "  padded  ", "unknown"] {
            let once = normalize_category(raw);
            assert_eq!(normalize_category(&once), once);
        }
    }

    #[test]
    fn test_clean_products_fills_defaults_before_normalizing() {
        let raw = df! [
            "product_id" => ["p1", "p2"],
            "product_category_name" => [Some("Home Appliances"), None],
            "product_photos_qty" => [Some("2"), None],
            "product_weight_g" => [Some("500"), None],
            "product_length_cm" => [Some("20"), None],
            "product_height_cm" => [Some("10"), None],
            "product_width_cm" => [Some("15"), None]
        ]
        .unwrap();
        let products = conform(Entity::Products, raw).unwrap();

        let cleaned = clean_products(products).unwrap();

        assert_eq!(cleaned.height(), 2);
        let category = cleaned.column("product_category_name").unwrap().str().unwrap();
        assert_eq!(category.get(1), Some(UNKNOWN_CATEGORY));
        let standard = cleaned.column("product_category_standard").unwrap().str().unwrap();
        assert_eq!(standard.get(0), Some("home_appliances"));
        assert_eq!(standard.get(1), Some("unknown"));
        for (raw, normalized) in category.into_iter().zip(standard.into_iter()) {
            assert_eq!(raw.map(normalize_category).as_deref(), normalized);
        }

        for name in NUMERIC_DEFAULTS {
            assert_eq!(cleaned.column(name).unwrap().null_count(), 0, "{name}");
        }
        let photos = cleaned.column("product_photos_qty").unwrap().i64().unwrap();
        assert_eq!(photos.get(1), Some(0));
        let weight = cleaned.column("product_weight_g").unwrap().f64().unwrap();
        assert_eq!(weight.get(1), Some(0.0));
    }
}
