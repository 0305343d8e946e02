//! Demo catalogue seeding.

use stockroom_core::{Money, ProductStatus};
use stockroom_storefront::db::stock::{create_product, list_products};
use stockroom_storefront::models::NewProduct;

use super::{CliError, connect};

/// `(name, price in whole units, stock)` for the demo catalogue.
const DEMO_PRODUCTS: &[(&str, i64, i32)] = &[
    ("Walnut writing desk", 24_000, 5),
    ("Oak bookshelf", 18_500, 8),
    ("Linen armchair", 32_000, 3),
    ("Ceramic table lamp", 4_200, 25),
    ("Wool throw blanket", 3_600, 40),
    ("Brass wall clock", 7_900, 12),
];

/// Insert the demo products.
///
/// Does nothing when products already exist, unless `force` is set.
///
/// # Errors
///
/// Returns an error if the database is unreachable or an insert fails.
pub async fn products(force: bool) -> Result<(), CliError> {
    let pool = connect().await?;

    let existing = list_products(&pool).await?;
    if !existing.is_empty() && !force {
        tracing::warn!(
            count = existing.len(),
            "products already exist, skipping (use --force to seed anyway)"
        );
        return Ok(());
    }

    for &(name, price, stock) in DEMO_PRODUCTS {
        let product = create_product(
            &pool,
            &NewProduct {
                name: name.to_string(),
                price: Money::from_units(price),
                stock,
                status: ProductStatus::Active,
            },
        )
        .await?;
        tracing::info!(id = %product.id, name, stock, "seeded product");
    }

    tracing::info!(count = DEMO_PRODUCTS.len(), "seeding complete");
    Ok(())
}
