//! Stock inspection.

use stockroom_storefront::db::stock::list_products;

use super::{CliError, connect};

/// Print every live product with its price, status, and available units.
///
/// # Errors
///
/// Returns an error if the database is unreachable.
#[allow(clippy::print_stdout)]
pub async fn list() -> Result<(), CliError> {
    let pool = connect().await?;
    let products = list_products(&pool).await?;

    println!("{:>6}  {:<28} {:>10}  {:<8} {:>6}", "ID", "NAME", "PRICE", "STATUS", "STOCK");
    for product in &products {
        println!(
            "{:>6}  {:<28} {:>10}  {:<8} {:>6}",
            product.id.to_string(),
            product.name,
            product.price.to_string(),
            format!("{:?}", product.status).to_lowercase(),
            product.stock
        );
    }
    Ok(())
}
