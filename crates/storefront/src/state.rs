//! Application state shared across handlers.

use std::sync::Arc;

use crate::config::StorefrontConfig;
use crate::db::InventoryStore;
use crate::services::{OrderNotifier, OrderService, ReservationService};

/// Application state shared across all handlers.
///
/// Cheaply cloneable via `Arc`. Holds the store and the services built on it.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    store: Arc<dyn InventoryStore>,
    reservations: ReservationService,
    orders: OrderService,
}

impl AppState {
    /// Build the state and its services over a store and notifier.
    #[must_use]
    pub fn new(
        config: StorefrontConfig,
        store: Arc<dyn InventoryStore>,
        notifier: Arc<dyn OrderNotifier>,
    ) -> Self {
        let reservations = ReservationService::new(Arc::clone(&store), config.shipping);
        let orders = OrderService::new(Arc::clone(&store), notifier, config.shipping);

        Self {
            inner: Arc::new(AppStateInner {
                config,
                store,
                reservations,
                orders,
            }),
        }
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the backing store.
    #[must_use]
    pub fn store(&self) -> &dyn InventoryStore {
        self.inner.store.as_ref()
    }

    /// Cart reservation service.
    #[must_use]
    pub fn reservations(&self) -> &ReservationService {
        &self.inner.reservations
    }

    /// Order lifecycle service.
    #[must_use]
    pub fn orders(&self) -> &OrderService {
        &self.inner.orders
    }
}
