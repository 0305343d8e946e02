//! Cart line persistence.
//!
//! Lines are never deleted; removal sets the `removed` tombstone and every
//! read below filters on it. The owner is stored as two nullable columns,
//! exactly one of which is set.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use stockroom_core::{CartLineId, CartOwner, GuestKey, Money, ProductId, UserId};

use super::{PgTx, RepositoryError, map_unique_violation};
use crate::models::{CartItem, CartLine, CartStats};

/// Cart line operations inside a transaction.
#[async_trait]
pub trait CartStore: Send {
    /// Read a live line owned by `owner`, without locking it.
    async fn line(
        &mut self,
        owner: CartOwner,
        id: CartLineId,
    ) -> Result<Option<CartLine>, RepositoryError>;

    /// Lock and re-read a live line owned by `owner`.
    ///
    /// Callers must already hold the lock on the line's product.
    async fn lock_line(
        &mut self,
        owner: CartOwner,
        id: CartLineId,
    ) -> Result<Option<CartLine>, RepositoryError>;

    /// Lock the live line for `(owner, product)`, if one exists.
    async fn find_active_line(
        &mut self,
        owner: CartOwner,
        product_id: ProductId,
    ) -> Result<Option<CartLine>, RepositoryError>;

    /// Create a new live line.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if a live line for the same owner
    /// and product already exists.
    async fn insert_line(
        &mut self,
        owner: CartOwner,
        product_id: ProductId,
        quantity: i32,
        unit_price: Money,
    ) -> Result<CartLine, RepositoryError>;

    /// Overwrite a line's quantity and touch `updated_at`.
    async fn set_line_quantity(
        &mut self,
        id: CartLineId,
        quantity: i32,
    ) -> Result<(), RepositoryError>;

    /// Tombstone a line.
    async fn remove_line(&mut self, id: CartLineId) -> Result<(), RepositoryError>;

    /// All live lines of an owner, oldest first.
    async fn active_lines(&mut self, owner: CartOwner) -> Result<Vec<CartLine>, RepositoryError>;

    /// Live lines joined with their product, skipping inactive and deleted
    /// products.
    async fn priced_lines(&mut self, owner: CartOwner) -> Result<Vec<CartItem>, RepositoryError>;

    /// Distinct live products and total reserved units for an owner.
    async fn stats(&mut self, owner: CartOwner) -> Result<CartStats, RepositoryError>;
}

/// Raw `cart_line` row before the owner columns are validated.
#[derive(Debug, sqlx::FromRow)]
struct CartLineRow {
    id: CartLineId,
    user_id: Option<UserId>,
    guest_key: Option<Uuid>,
    product_id: ProductId,
    quantity: i32,
    unit_price: Money,
    removed: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<CartLineRow> for CartLine {
    type Error = RepositoryError;

    fn try_from(row: CartLineRow) -> Result<Self, Self::Error> {
        let owner = match (row.user_id, row.guest_key) {
            (Some(user), None) => CartOwner::User(user),
            (None, Some(key)) => CartOwner::Guest(GuestKey::from_uuid(key)),
            _ => {
                return Err(RepositoryError::DataCorruption(format!(
                    "cart line {} must have exactly one owner",
                    row.id
                )));
            }
        };
        Ok(Self {
            id: row.id,
            owner,
            product_id: row.product_id,
            quantity: row.quantity,
            unit_price: row.unit_price,
            removed: row.removed,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

const LINE_COLUMNS: &str =
    "id, user_id, guest_key, product_id, quantity, unit_price, removed, created_at, updated_at";

const OWNER_MATCH: &str =
    "user_id IS NOT DISTINCT FROM $1 AND guest_key IS NOT DISTINCT FROM $2";

fn owner_columns(owner: CartOwner) -> (Option<UserId>, Option<Uuid>) {
    (owner.user_id(), owner.guest_key().map(|key| key.as_uuid()))
}

fn into_lines(rows: Vec<CartLineRow>) -> Result<Vec<CartLine>, RepositoryError> {
    rows.into_iter().map(CartLine::try_from).collect()
}

impl PgTx {
    async fn fetch_line(
        &mut self,
        owner: CartOwner,
        id: CartLineId,
        lock: bool,
    ) -> Result<Option<CartLine>, RepositoryError> {
        let (user_id, guest_key) = owner_columns(owner);
        let suffix = if lock { " FOR UPDATE" } else { "" };
        let row = sqlx::query_as::<_, CartLineRow>(&format!(
            "SELECT {LINE_COLUMNS} FROM storefront.cart_line \
             WHERE {OWNER_MATCH} AND id = $3 AND NOT removed{suffix}"
        ))
        .bind(user_id)
        .bind(guest_key)
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?;
        row.map(CartLine::try_from).transpose()
    }
}

#[async_trait]
impl CartStore for PgTx {
    async fn line(
        &mut self,
        owner: CartOwner,
        id: CartLineId,
    ) -> Result<Option<CartLine>, RepositoryError> {
        self.fetch_line(owner, id, false).await
    }

    async fn lock_line(
        &mut self,
        owner: CartOwner,
        id: CartLineId,
    ) -> Result<Option<CartLine>, RepositoryError> {
        self.fetch_line(owner, id, true).await
    }

    async fn find_active_line(
        &mut self,
        owner: CartOwner,
        product_id: ProductId,
    ) -> Result<Option<CartLine>, RepositoryError> {
        let (user_id, guest_key) = owner_columns(owner);
        let row = sqlx::query_as::<_, CartLineRow>(&format!(
            "SELECT {LINE_COLUMNS} FROM storefront.cart_line \
             WHERE {OWNER_MATCH} AND product_id = $3 AND NOT removed FOR UPDATE"
        ))
        .bind(user_id)
        .bind(guest_key)
        .bind(product_id)
        .fetch_optional(&mut *self.tx)
        .await?;
        row.map(CartLine::try_from).transpose()
    }

    async fn insert_line(
        &mut self,
        owner: CartOwner,
        product_id: ProductId,
        quantity: i32,
        unit_price: Money,
    ) -> Result<CartLine, RepositoryError> {
        let (user_id, guest_key) = owner_columns(owner);
        let row = sqlx::query_as::<_, CartLineRow>(&format!(
            r"
            INSERT INTO storefront.cart_line (user_id, guest_key, product_id, quantity, unit_price)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {LINE_COLUMNS}
            "
        ))
        .bind(user_id)
        .bind(guest_key)
        .bind(product_id)
        .bind(quantity)
        .bind(unit_price)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| map_unique_violation(e, "cart line for this product"))?;
        CartLine::try_from(row)
    }

    async fn set_line_quantity(
        &mut self,
        id: CartLineId,
        quantity: i32,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE storefront.cart_line
            SET quantity = $2, updated_at = NOW()
            WHERE id = $1 AND NOT removed
            ",
        )
        .bind(id)
        .bind(quantity)
        .execute(&mut *self.tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn remove_line(&mut self, id: CartLineId) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE storefront.cart_line
            SET removed = TRUE, updated_at = NOW()
            WHERE id = $1 AND NOT removed
            ",
        )
        .bind(id)
        .execute(&mut *self.tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn active_lines(&mut self, owner: CartOwner) -> Result<Vec<CartLine>, RepositoryError> {
        let (user_id, guest_key) = owner_columns(owner);
        let rows = sqlx::query_as::<_, CartLineRow>(&format!(
            "SELECT {LINE_COLUMNS} FROM storefront.cart_line \
             WHERE {OWNER_MATCH} AND NOT removed ORDER BY id"
        ))
        .bind(user_id)
        .bind(guest_key)
        .fetch_all(&mut *self.tx)
        .await?;
        into_lines(rows)
    }

    async fn priced_lines(&mut self, owner: CartOwner) -> Result<Vec<CartItem>, RepositoryError> {
        let (user_id, guest_key) = owner_columns(owner);
        let items = sqlx::query_as::<_, CartItem>(
            r"
            SELECT l.id AS line_id, l.product_id, p.name, l.quantity, l.unit_price
            FROM storefront.cart_line l
            JOIN storefront.product p ON p.id = l.product_id
            WHERE l.user_id IS NOT DISTINCT FROM $1
              AND l.guest_key IS NOT DISTINCT FROM $2
              AND NOT l.removed
              AND p.status = 'active'
              AND p.deleted_at IS NULL
            ORDER BY l.id
            ",
        )
        .bind(user_id)
        .bind(guest_key)
        .fetch_all(&mut *self.tx)
        .await?;
        Ok(items)
    }

    async fn stats(&mut self, owner: CartOwner) -> Result<CartStats, RepositoryError> {
        let (user_id, guest_key) = owner_columns(owner);
        let stats = sqlx::query_as::<_, CartStats>(&format!(
            r"
            SELECT COUNT(DISTINCT product_id) AS items_count,
                   COALESCE(SUM(quantity), 0)::BIGINT AS total_quantity
            FROM storefront.cart_line
            WHERE {OWNER_MATCH} AND NOT removed
            "
        ))
        .bind(user_id)
        .bind(guest_key)
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(user_id: Option<UserId>, guest_key: Option<Uuid>) -> CartLineRow {
        CartLineRow {
            id: CartLineId::new(1),
            user_id,
            guest_key,
            product_id: ProductId::new(2),
            quantity: 3,
            unit_price: Money::from_units(100),
            removed: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_row_with_user_owner() {
        let line = CartLine::try_from(row(Some(UserId::new(9)), None));
        assert!(matches!(line, Ok(CartLine { owner: CartOwner::User(id), .. }) if id == UserId::new(9)));
    }

    #[test]
    fn test_row_with_guest_owner() {
        let key = Uuid::new_v4();
        let line = CartLine::try_from(row(None, Some(key)));
        assert!(matches!(
            line,
            Ok(CartLine { owner: CartOwner::Guest(guest), .. }) if guest.as_uuid() == key
        ));
    }

    #[test]
    fn test_row_without_owner_is_corrupt() {
        assert!(matches!(
            CartLine::try_from(row(None, None)),
            Err(RepositoryError::DataCorruption(_))
        ));
        assert!(matches!(
            CartLine::try_from(row(Some(UserId::new(1)), Some(Uuid::new_v4()))),
            Err(RepositoryError::DataCorruption(_))
        ));
    }
}
