use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use groupbuy_core::{DomainError, DomainResult, Money, OrderId, OrderItemId, ProductId, UserId};
use groupbuy_inventory::{Product, StockRequest};

use crate::order_number::OrderNumber;

/// Order status lifecycle.
///
/// `Paid → Confirmed → Processing → Shipped → Delivered`, with `Cancelled`
/// as a terminal alternative reachable before shipping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Paid,
    Confirmed,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Paid => "PAID",
            OrderStatus::Confirmed => "CONFIRMED",
            OrderStatus::Processing => "PROCESSING",
            OrderStatus::Shipped => "SHIPPED",
            OrderStatus::Delivered => "DELIVERED",
            OrderStatus::Cancelled => "CANCELLED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
    }

    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        matches!(
            (self, next),
            (Paid, Confirmed)
                | (Confirmed, Processing)
                | (Processing, Shipped)
                | (Shipped, Delivered)
                | (Paid | Confirmed | Processing, Cancelled)
        )
    }
}

impl core::str::FromStr for OrderStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PAID" => Ok(OrderStatus::Paid),
            "CONFIRMED" => Ok(OrderStatus::Confirmed),
            "PROCESSING" => Ok(OrderStatus::Processing),
            "SHIPPED" => Ok(OrderStatus::Shipped),
            "DELIVERED" => Ok(OrderStatus::Delivered),
            "CANCELLED" => Ok(OrderStatus::Cancelled),
            other => Err(DomainError::validation(format!("unknown order status '{other}'"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Completed,
    Refunded,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Completed => "COMPLETED",
            PaymentStatus::Refunded => "REFUNDED",
        }
    }
}

impl core::str::FromStr for PaymentStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "COMPLETED" => Ok(PaymentStatus::Completed),
            "REFUNDED" => Ok(PaymentStatus::Refunded),
            other => Err(DomainError::validation(format!("unknown payment status '{other}'"))),
        }
    }
}

/// Buyer identity frozen at order time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerSnapshot {
    pub user_id: UserId,
    pub name: String,
    pub email: String,
    pub phone: String,
}

/// A priced line before it belongs to an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricedLine {
    pub product_id: ProductId,
    pub product_name: String,
    pub product_image: Option<String>,
    pub unit_price: Money,
    pub quantity: i64,
    pub subtotal: Money,
}

/// Price each requested item against the current product state.
///
/// Lines keep request order; `products` must contain every requested id.
/// Returns the lines and their total (checked integer arithmetic).
pub fn price_lines(
    items: &[StockRequest],
    products: &[Product],
) -> DomainResult<(Vec<PricedLine>, Money)> {
    let mut lines = Vec::with_capacity(items.len());
    let mut total = Money::ZERO;

    for item in items {
        let product = products
            .iter()
            .find(|p| p.id_typed() == item.product_id)
            .ok_or_else(|| DomainError::not_found(format!("product {}", item.product_id)))?;

        let subtotal = product.price().times(item.quantity)?;
        total = total.checked_add(subtotal)?;

        lines.push(PricedLine {
            product_id: item.product_id,
            product_name: product.name().to_string(),
            product_image: product.image().map(str::to_string),
            unit_price: product.price(),
            quantity: item.quantity,
            subtotal,
        });
    }

    Ok((lines, total))
}

/// Order line item: snapshot of product + price at order time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: OrderItemId,
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub product_name: String,
    pub product_image: Option<String>,
    /// Price in smallest currency unit (e.g., cents).
    pub unit_price: Money,
    pub quantity: i64,
    pub subtotal: Money,
}

/// Storage shape of an order, used to rehydrate a persisted [`Order`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderParts {
    pub id: OrderId,
    pub order_number: OrderNumber,
    pub customer: CustomerSnapshot,
    pub total_amount: Money,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub customer_note: Option<String>,
    pub admin_note: Option<String>,
    pub items: Vec<OrderItem>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A placed order with its line items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    id: OrderId,
    order_number: OrderNumber,
    customer: CustomerSnapshot,
    total_amount: Money,
    status: OrderStatus,
    payment_status: PaymentStatus,
    customer_note: Option<String>,
    admin_note: Option<String>,
    items: Vec<OrderItem>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Order {
    /// Create a freshly paid order from priced lines.
    pub fn place(
        id: OrderId,
        order_number: OrderNumber,
        customer: CustomerSnapshot,
        customer_note: Option<String>,
        admin_note: Option<String>,
        lines: Vec<PricedLine>,
        at: DateTime<Utc>,
    ) -> DomainResult<Self> {
        if lines.is_empty() {
            return Err(DomainError::validation("order must contain at least one item"));
        }
        if customer.phone.trim().is_empty() {
            return Err(DomainError::validation("customer phone is required"));
        }

        let mut total = Money::ZERO;
        let mut items = Vec::with_capacity(lines.len());
        for line in lines {
            if line.quantity <= 0 {
                return Err(DomainError::validation("quantity must be positive"));
            }
            if line.unit_price.times(line.quantity)? != line.subtotal {
                return Err(DomainError::invariant(format!(
                    "subtotal mismatch for product {}",
                    line.product_id
                )));
            }
            total = total.checked_add(line.subtotal)?;
            items.push(OrderItem {
                id: OrderItemId::new(),
                order_id: id,
                product_id: line.product_id,
                product_name: line.product_name,
                product_image: line.product_image,
                unit_price: line.unit_price,
                quantity: line.quantity,
                subtotal: line.subtotal,
            });
        }

        Ok(Self {
            id,
            order_number,
            customer,
            total_amount: total,
            status: OrderStatus::Paid,
            payment_status: PaymentStatus::Completed,
            customer_note: normalize_note(customer_note),
            admin_note: normalize_note(admin_note),
            items,
            created_at: at,
            updated_at: at,
        })
    }

    /// Rebuild a persisted order, re-checking the total invariant.
    pub fn rehydrate(parts: OrderParts) -> DomainResult<Self> {
        if parts.items.is_empty() {
            return Err(DomainError::invariant(format!(
                "order {} has no items",
                parts.order_number
            )));
        }
        let mut sum = Money::ZERO;
        for item in &parts.items {
            sum = sum.checked_add(item.subtotal)?;
        }
        if sum != parts.total_amount {
            return Err(DomainError::invariant(format!(
                "order {} total {} does not match item subtotals {}",
                parts.order_number, parts.total_amount, sum
            )));
        }

        Ok(Self {
            id: parts.id,
            order_number: parts.order_number,
            customer: parts.customer,
            total_amount: parts.total_amount,
            status: parts.status,
            payment_status: parts.payment_status,
            customer_note: parts.customer_note,
            admin_note: parts.admin_note,
            items: parts.items,
            created_at: parts.created_at,
            updated_at: parts.updated_at,
        })
    }

    pub fn id_typed(&self) -> OrderId {
        self.id
    }

    pub fn order_number(&self) -> &OrderNumber {
        &self.order_number
    }

    pub fn customer(&self) -> &CustomerSnapshot {
        &self.customer
    }

    pub fn user_id(&self) -> UserId {
        self.customer.user_id
    }

    pub fn total_amount(&self) -> Money {
        self.total_amount
    }

    pub fn status(&self) -> OrderStatus {
        self.status
    }

    pub fn payment_status(&self) -> PaymentStatus {
        self.payment_status
    }

    pub fn customer_note(&self) -> Option<&str> {
        self.customer_note.as_deref()
    }

    pub fn admin_note(&self) -> Option<&str> {
        self.admin_note.as_deref()
    }

    pub fn items(&self) -> &[OrderItem] {
        &self.items
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Move along the lifecycle. Cancelling refunds the payment; stock is
    /// not touched here.
    pub fn transition(
        &mut self,
        next: OrderStatus,
        admin_note: Option<String>,
        at: DateTime<Utc>,
    ) -> DomainResult<()> {
        if !self.status.can_transition_to(next) {
            return Err(DomainError::validation(format!(
                "cannot move order {} from {} to {}",
                self.order_number,
                self.status.as_str(),
                next.as_str()
            )));
        }

        self.status = next;
        if next == OrderStatus::Cancelled {
            self.payment_status = PaymentStatus::Refunded;
        }
        if let Some(note) = normalize_note(admin_note) {
            self.admin_note = Some(note);
        }
        self.updated_at = at;
        Ok(())
    }
}

fn normalize_note(note: Option<String>) -> Option<String> {
    note.map(|n| n.trim().to_string()).filter(|n| !n.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use proptest::prelude::*;

    fn test_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 8, 2, 9, 0, 0).unwrap()
    }

    fn customer() -> CustomerSnapshot {
        CustomerSnapshot {
            user_id: UserId::new(),
            name: "Kim Minji".into(),
            email: "minji@example.com".into(),
            phone: "010-1234-5678".into(),
        }
    }

    fn product(price: i64, stock: i64) -> Product {
        Product::new(
            ProductId::new(),
            "Strawberries 1kg",
            Money::from_minor(price).unwrap(),
            stock,
            1,
        )
        .unwrap()
            .with_image(Some("https://cdn.example.com/strawberry.jpg".into()))
    }

    fn number() -> OrderNumber {
        OrderNumber::compose(test_time(), 1).unwrap()
    }

    fn place(lines: Vec<PricedLine>) -> DomainResult<Order> {
        Order::place(OrderId::new(), number(), customer(), None, None, lines, test_time())
    }

    #[test]
    fn price_lines_snapshots_current_price() {
        let p = product(10_000, 3);
        let (lines, total) =
            price_lines(&[StockRequest::new(p.id_typed(), 2)], &[p.clone()]).unwrap();

        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].unit_price.minor_units(), 10_000);
        assert_eq!(lines[0].quantity, 2);
        assert_eq!(lines[0].subtotal.minor_units(), 20_000);
        assert_eq!(lines[0].product_name, "Strawberries 1kg");
        assert_eq!(lines[0].product_image.as_deref(), p.image());
        assert_eq!(total.minor_units(), 20_000);
    }

    #[test]
    fn price_lines_fails_for_unknown_product() {
        let err = price_lines(&[StockRequest::new(ProductId::new(), 1)], &[]).unwrap_err();
        assert!(matches!(err, DomainError::NotFound(_)));
    }

    #[test]
    fn place_creates_paid_order_with_consistent_total() {
        let a = product(10_000, 3);
        let b = product(2_550, 9);
        let (lines, total) = price_lines(
            &[StockRequest::new(a.id_typed(), 2), StockRequest::new(b.id_typed(), 3)],
            &[a, b],
        )
        .unwrap();
        let order_id = OrderId::new();
        let order = Order::place(
            order_id,
            number(),
            customer(),
            Some("  leave at door ".into()),
            None,
            lines,
            test_time(),
        )
        .unwrap();

        assert_eq!(order.status(), OrderStatus::Paid);
        assert_eq!(order.payment_status(), PaymentStatus::Completed);
        assert_eq!(order.total_amount(), total);
        assert_eq!(order.total_amount().minor_units(), 27_650);
        assert_eq!(order.customer_note(), Some("leave at door"));
        assert!(order.items().iter().all(|i| i.order_id == order_id));
    }

    #[test]
    fn place_rejects_empty_orders_and_missing_phone() {
        assert!(place(vec![]).is_err());

        let p = product(100, 1);
        let (lines, _) = price_lines(&[StockRequest::new(p.id_typed(), 1)], &[p]).unwrap();
        let mut c = customer();
        c.phone = " ".into();
        assert!(matches!(
            Order::place(OrderId::new(), number(), c, None, None, lines, test_time()),
            Err(DomainError::Validation(_))
        ));
    }

    #[test]
    fn rehydrate_rejects_inconsistent_totals() {
        let p = product(100, 5);
        let (lines, _) = price_lines(&[StockRequest::new(p.id_typed(), 2)], &[p]).unwrap();
        let order = place(lines).unwrap();

        let parts = OrderParts {
            id: order.id_typed(),
            order_number: order.order_number().clone(),
            customer: order.customer().clone(),
            total_amount: Money::from_minor(999).unwrap(),
            status: order.status(),
            payment_status: order.payment_status(),
            customer_note: None,
            admin_note: None,
            items: order.items().to_vec(),
            created_at: order.created_at(),
            updated_at: order.updated_at(),
        };
        assert!(matches!(
            Order::rehydrate(parts.clone()),
            Err(DomainError::InvariantViolation(_))
        ));

        let ok = OrderParts {
            total_amount: order.total_amount(),
            ..parts
        };
        assert_eq!(Order::rehydrate(ok).unwrap(), order);
    }

    #[test]
    fn lifecycle_transitions() {
        use OrderStatus::*;
        assert!(Paid.can_transition_to(Confirmed));
        assert!(Shipped.can_transition_to(Delivered));
        assert!(Processing.can_transition_to(Cancelled));
        assert!(!Shipped.can_transition_to(Cancelled));
        assert!(!Delivered.can_transition_to(Paid));
        assert!(!Paid.can_transition_to(Shipped));
        assert!(Cancelled.is_terminal());
    }

    #[test]
    fn cancelling_refunds_payment() {
        let p = product(100, 5);
        let (lines, _) = price_lines(&[StockRequest::new(p.id_typed(), 1)], &[p]).unwrap();
        let mut order = place(lines).unwrap();

        order.transition(OrderStatus::Cancelled, Some("buyer request".into()), Utc::now()).unwrap();
        assert_eq!(order.status(), OrderStatus::Cancelled);
        assert_eq!(order.payment_status(), PaymentStatus::Refunded);
        assert_eq!(order.admin_note(), Some("buyer request"));

        let err = order.transition(OrderStatus::Confirmed, None, Utc::now()).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn status_strings_round_trip() {
        for s in ["PAID", "CONFIRMED", "PROCESSING", "SHIPPED", "DELIVERED", "CANCELLED"] {
            assert_eq!(s.parse::<OrderStatus>().unwrap().as_str(), s);
        }
        assert_eq!(serde_json::to_string(&PaymentStatus::Refunded).unwrap(), "\"REFUNDED\"");
    }

    proptest! {
        /// Property: total == sum(subtotals) and subtotal == unit_price * quantity.
        #[test]
        fn totals_are_consistent(
            lines in proptest::collection::vec((0i64..1_000_000, 1i64..20), 1..10)
        ) {
            let products: Vec<Product> =
                lines.iter().map(|(price, _)| product(*price, 100)).collect();
            let items: Vec<StockRequest> = products
                .iter()
                .zip(lines.iter())
                .map(|(p, (_, qty))| StockRequest::new(p.id_typed(), *qty))
                .collect();

            let (priced, total) = price_lines(&items, &products).unwrap();
            let order = place(priced).unwrap();

            let sum: i64 = order.items().iter().map(|i| i.subtotal.minor_units()).sum();
            prop_assert_eq!(order.total_amount().minor_units(), sum);
            prop_assert_eq!(order.total_amount(), total);
            for item in order.items() {
                prop_assert_eq!(
                    item.subtotal.minor_units(),
                    item.unit_price.minor_units() * item.quantity
                );
            }
        }
    }
}
