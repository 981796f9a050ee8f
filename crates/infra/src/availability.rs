use std::sync::Arc;

use tracing::{debug, instrument};

use groupbuy_core::ProductId;
use groupbuy_inventory::availability;
use groupbuy_inventory::{AvailabilityReport, Product, StockRequest, validate_requests};

use crate::error::ServiceResult;
use crate::store::StorefrontStore;

/// Advisory batch availability check.
///
/// Reads without locks and reserves nothing; a passing report can still be
/// followed by `InsufficientStock` from the ledger.
pub struct AvailabilityChecker<S: ?Sized> {
    store: Arc<S>,
}

impl<S: ?Sized> Clone for AvailabilityChecker<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
        }
    }
}

impl<S: StorefrontStore + ?Sized> AvailabilityChecker<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    #[instrument(skip(self, items), fields(items = items.len()), err)]
    pub async fn check_availability(
        &self,
        items: &[StockRequest],
    ) -> ServiceResult<AvailabilityReport> {
        validate_requests(items)?;
        if items.is_empty() {
            return Ok(availability::evaluate(items, std::iter::empty::<&Product>()));
        }

        let ids: Vec<ProductId> = items.iter().map(|i| i.product_id).collect();
        let products = self.store.find_products(&ids, false).await?;
        let report = availability::evaluate(items, &products);

        debug!(all_available = report.all_available, "availability checked");
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use groupbuy_core::Money;
    use groupbuy_inventory::UnavailableReason;

    use crate::error::ServiceError;
    use crate::store::InMemoryStore;

    #[tokio::test]
    async fn reports_each_failure_kind() {
        let store = Arc::new(InMemoryStore::new());
        let price = Money::from_minor(900).unwrap();
        let ok = Product::new(ProductId::new(), "Sweet potatoes", price, 10, 2).unwrap();
        let off = Product::new(ProductId::new(), "Chestnuts", price, 10, 2)
            .unwrap()
            .with_active(false);
        store.save_product(&ok).await.unwrap();
        store.save_product(&off).await.unwrap();

        let checker = AvailabilityChecker::new(store);
        let report = checker
            .check_availability(&[
                StockRequest::new(ok.id_typed(), 10),
                StockRequest::new(ok.id_typed(), 11),
                StockRequest::new(off.id_typed(), 1),
                StockRequest::new(ProductId::new(), 1),
            ])
            .await
            .unwrap();

        assert!(!report.all_available);
        assert!(report.items[0].available);
        assert_eq!(report.items[1].reason, Some(UnavailableReason::InsufficientStock));
        assert_eq!(report.items[2].reason, Some(UnavailableReason::Inactive));
        assert_eq!(report.items[3].reason, Some(UnavailableReason::NotFound));
    }

    #[tokio::test]
    async fn rejects_non_positive_quantities() {
        let checker = AvailabilityChecker::new(Arc::new(InMemoryStore::new()));
        let err = checker
            .check_availability(&[StockRequest::new(ProductId::new(), 0)])
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }

    #[tokio::test]
    async fn empty_request_is_available() {
        let checker = AvailabilityChecker::new(Arc::new(InMemoryStore::new()));
        let report = checker.check_availability(&[]).await.unwrap();
        assert!(report.all_available);
        assert!(report.items.is_empty());
    }
}
