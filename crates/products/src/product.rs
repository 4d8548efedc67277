use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use shelfpulse_core::{Aggregate, AggregateId, AggregateRoot, DomainError};
use shelfpulse_events::Event;

/// Product identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(pub AggregateId);

impl ProductId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for ProductId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Product status lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProductStatus {
    Active,
    Discontinued,
}

/// Aggregate root: Product.
///
/// Catalog master data only. Stock lives in the per-product `StockLedger`;
/// the `min_stock` threshold here is what read paths compare against.
#[derive(Debug, Clone, PartialEq)]
pub struct Product {
    id: ProductId,
    item_id: String,
    name: String,
    category: String,
    mrp: f64,
    min_stock: i64,
    status: ProductStatus,
    version: u64,
    created: bool,
}

impl Product {
    /// Create an empty, not-yet-created aggregate instance for rehydration.
    pub fn empty(id: ProductId) -> Self {
        Self {
            id,
            item_id: String::new(),
            name: String::new(),
            category: String::new(),
            mrp: 0.0,
            min_stock: 0,
            status: ProductStatus::Active,
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> ProductId {
        self.id
    }

    pub fn item_id(&self) -> &str {
        &self.item_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn mrp(&self) -> f64 {
        self.mrp
    }

    pub fn min_stock(&self) -> i64 {
        self.min_stock
    }

    pub fn status(&self) -> ProductStatus {
        self.status
    }

    pub fn exists(&self) -> bool {
        self.created
    }

    /// Check if product can be sold (discontinued products cannot).
    pub fn can_be_sold(&self) -> bool {
        self.created && self.status == ProductStatus::Active
    }

    /// Low-stock check against the catalog threshold.
    pub fn low_stock(&self, total_stock: i64) -> bool {
        total_stock < self.min_stock
    }
}

impl AggregateRoot for Product {
    type Id = ProductId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: DefineProduct.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DefineProduct {
    pub product_id: ProductId,
    pub item_id: String,
    pub name: String,
    pub category: String,
    pub mrp: f64,
    pub min_stock: i64,
    pub occurred_at: DateTime<Utc>,
}

/// Command: UpdateProduct (name / list price / minimum stock).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateProduct {
    pub product_id: ProductId,
    pub name: Option<String>,
    pub mrp: Option<f64>,
    pub min_stock: Option<i64>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: DiscontinueProduct.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscontinueProduct {
    pub product_id: ProductId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ProductCommand {
    DefineProduct(DefineProduct),
    UpdateProduct(UpdateProduct),
    DiscontinueProduct(DiscontinueProduct),
}

/// Event: ProductDefined.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductDefined {
    pub product_id: ProductId,
    pub item_id: String,
    pub name: String,
    pub category: String,
    pub mrp: f64,
    pub min_stock: i64,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ProductUpdated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductUpdated {
    pub product_id: ProductId,
    pub name: Option<String>,
    pub mrp: Option<f64>,
    pub min_stock: Option<i64>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ProductDiscontinued.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductDiscontinued {
    pub product_id: ProductId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ProductEvent {
    ProductDefined(ProductDefined),
    ProductUpdated(ProductUpdated),
    ProductDiscontinued(ProductDiscontinued),
}

impl Event for ProductEvent {
    fn event_type(&self) -> &'static str {
        match self {
            ProductEvent::ProductDefined(_) => "catalog.product.defined",
            ProductEvent::ProductUpdated(_) => "catalog.product.updated",
            ProductEvent::ProductDiscontinued(_) => "catalog.product.discontinued",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            ProductEvent::ProductDefined(e) => e.occurred_at,
            ProductEvent::ProductUpdated(e) => e.occurred_at,
            ProductEvent::ProductDiscontinued(e) => e.occurred_at,
        }
    }
}

impl Aggregate for Product {
    type Command = ProductCommand;
    type Event = ProductEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            ProductEvent::ProductDefined(e) => {
                self.id = e.product_id;
                self.item_id = e.item_id.clone();
                self.name = e.name.clone();
                self.category = e.category.clone();
                self.mrp = e.mrp;
                self.min_stock = e.min_stock;
                self.status = ProductStatus::Active;
                self.created = true;
            }
            ProductEvent::ProductUpdated(e) => {
                if let Some(name) = &e.name {
                    self.name = name.clone();
                }
                if let Some(mrp) = e.mrp {
                    self.mrp = mrp;
                }
                if let Some(min_stock) = e.min_stock {
                    self.min_stock = min_stock;
                }
            }
            ProductEvent::ProductDiscontinued(_) => {
                self.status = ProductStatus::Discontinued;
            }
        }

        // Deterministic version tracking: +1 per applied event.
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            ProductCommand::DefineProduct(cmd) => self.handle_define(cmd),
            ProductCommand::UpdateProduct(cmd) => self.handle_update(cmd),
            ProductCommand::DiscontinueProduct(cmd) => self.handle_discontinue(cmd),
        }
    }
}

impl Product {
    fn ensure_product_id(&self, product_id: ProductId) -> Result<(), DomainError> {
        if self.id != product_id {
            return Err(DomainError::invariant("product_id mismatch"));
        }
        Ok(())
    }

    fn handle_define(&self, cmd: &DefineProduct) -> Result<Vec<ProductEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("product already exists"));
        }
        if cmd.item_id.trim().is_empty() {
            return Err(DomainError::validation("item_id cannot be empty"));
        }
        if cmd.name.trim().is_empty() {
            return Err(DomainError::validation("name cannot be empty"));
        }
        if cmd.category.trim().is_empty() {
            return Err(DomainError::validation("category cannot be empty"));
        }
        if !(cmd.mrp.is_finite() && cmd.mrp > 0.0) {
            return Err(DomainError::validation("mrp must be positive"));
        }
        if cmd.min_stock < 0 {
            return Err(DomainError::validation("min_stock cannot be negative"));
        }

        Ok(vec![ProductEvent::ProductDefined(ProductDefined {
            product_id: cmd.product_id,
            item_id: cmd.item_id.clone(),
            name: cmd.name.clone(),
            category: cmd.category.clone(),
            mrp: cmd.mrp,
            min_stock: cmd.min_stock,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_update(&self, cmd: &UpdateProduct) -> Result<Vec<ProductEvent>, DomainError> {
        if !self.created {
            return Err(DomainError::ProductNotFound);
        }
        self.ensure_product_id(cmd.product_id)?;

        if self.status == ProductStatus::Discontinued {
            return Err(DomainError::invariant(
                "cannot update a discontinued product",
            ));
        }

        if let Some(name) = &cmd.name {
            if name.trim().is_empty() {
                return Err(DomainError::validation("name cannot be empty"));
            }
        }
        if let Some(mrp) = cmd.mrp {
            if !(mrp.is_finite() && mrp > 0.0) {
                return Err(DomainError::validation("mrp must be positive"));
            }
        }
        if let Some(min_stock) = cmd.min_stock {
            if min_stock < 0 {
                return Err(DomainError::validation("min_stock cannot be negative"));
            }
        }
        if cmd.name.is_none() && cmd.mrp.is_none() && cmd.min_stock.is_none() {
            return Err(DomainError::validation("nothing to update"));
        }

        Ok(vec![ProductEvent::ProductUpdated(ProductUpdated {
            product_id: cmd.product_id,
            name: cmd.name.clone(),
            mrp: cmd.mrp,
            min_stock: cmd.min_stock,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_discontinue(
        &self,
        cmd: &DiscontinueProduct,
    ) -> Result<Vec<ProductEvent>, DomainError> {
        if !self.created {
            return Err(DomainError::ProductNotFound);
        }
        self.ensure_product_id(cmd.product_id)?;

        if self.status == ProductStatus::Discontinued {
            return Err(DomainError::conflict("product already discontinued"));
        }

        Ok(vec![ProductEvent::ProductDiscontinued(
            ProductDiscontinued {
                product_id: cmd.product_id,
                occurred_at: cmd.occurred_at,
            },
        )])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_product_id() -> ProductId {
        ProductId::new(AggregateId::new())
    }

    fn test_time() -> DateTime<Utc> {
        Utc::now()
    }

    fn define_cmd(product_id: ProductId) -> DefineProduct {
        DefineProduct {
            product_id,
            item_id: "FDX07".to_string(),
            name: "Orange Juice 1L".to_string(),
            category: "Soft Drinks".to_string(),
            mrp: 45.0,
            min_stock: 10,
            occurred_at: test_time(),
        }
    }

    #[test]
    fn define_product_emits_product_defined_event() {
        let product_id = test_product_id();
        let product = Product::empty(product_id);

        let events = product
            .handle(&ProductCommand::DefineProduct(define_cmd(product_id)))
            .unwrap();
        assert_eq!(events.len(), 1);

        match &events[0] {
            ProductEvent::ProductDefined(e) => {
                assert_eq!(e.product_id, product_id);
                assert_eq!(e.item_id, "FDX07");
                assert_eq!(e.category, "Soft Drinks");
                assert_eq!(e.mrp, 45.0);
            }
            _ => panic!("Expected ProductDefined event"),
        }
    }

    #[test]
    fn cannot_define_twice() {
        let product_id = test_product_id();
        let mut product = Product::empty(product_id);

        let events = product
            .handle(&ProductCommand::DefineProduct(define_cmd(product_id)))
            .unwrap();
        product.apply(&events[0]);

        let err = product
            .handle(&ProductCommand::DefineProduct(define_cmd(product_id)))
            .unwrap_err();
        match err {
            DomainError::Conflict(_) => {}
            _ => panic!("Expected Conflict"),
        }
    }

    #[test]
    fn define_rejects_non_positive_mrp() {
        let product_id = test_product_id();
        let product = Product::empty(product_id);

        let mut cmd = define_cmd(product_id);
        cmd.mrp = 0.0;
        let err = product
            .handle(&ProductCommand::DefineProduct(cmd))
            .unwrap_err();
        match err {
            DomainError::Validation(msg) => assert!(msg.contains("mrp")),
            _ => panic!("Expected Validation"),
        }
    }

    #[test]
    fn update_on_missing_product_is_product_not_found() {
        let product_id = test_product_id();
        let product = Product::empty(product_id);

        let cmd = UpdateProduct {
            product_id,
            name: None,
            mrp: Some(50.0),
            min_stock: None,
            occurred_at: test_time(),
        };
        let err = product
            .handle(&ProductCommand::UpdateProduct(cmd))
            .unwrap_err();
        assert_eq!(err, DomainError::ProductNotFound);
    }

    #[test]
    fn update_applies_only_provided_fields() {
        let product_id = test_product_id();
        let mut product = Product::empty(product_id);

        let events = product
            .handle(&ProductCommand::DefineProduct(define_cmd(product_id)))
            .unwrap();
        product.apply(&events[0]);

        let cmd = UpdateProduct {
            product_id,
            name: None,
            mrp: Some(49.5),
            min_stock: None,
            occurred_at: test_time(),
        };
        let events = product.handle(&ProductCommand::UpdateProduct(cmd)).unwrap();
        product.apply(&events[0]);

        assert_eq!(product.mrp(), 49.5);
        assert_eq!(product.name(), "Orange Juice 1L");
        assert_eq!(product.min_stock(), 10);
    }

    #[test]
    fn discontinued_product_cannot_be_sold_or_updated() {
        let product_id = test_product_id();
        let mut product = Product::empty(product_id);

        let events = product
            .handle(&ProductCommand::DefineProduct(define_cmd(product_id)))
            .unwrap();
        product.apply(&events[0]);
        assert!(product.can_be_sold());

        let cmd = DiscontinueProduct {
            product_id,
            occurred_at: test_time(),
        };
        let events = product
            .handle(&ProductCommand::DiscontinueProduct(cmd))
            .unwrap();
        product.apply(&events[0]);

        assert_eq!(product.status(), ProductStatus::Discontinued);
        assert!(!product.can_be_sold());

        let cmd = UpdateProduct {
            product_id,
            name: Some("New Name".to_string()),
            mrp: None,
            min_stock: None,
            occurred_at: test_time(),
        };
        let err = product
            .handle(&ProductCommand::UpdateProduct(cmd))
            .unwrap_err();
        match err {
            DomainError::InvariantViolation(_) => {}
            _ => panic!("Expected InvariantViolation"),
        }
    }

    #[test]
    fn low_stock_compares_against_min_stock() {
        let product_id = test_product_id();
        let mut product = Product::empty(product_id);

        let events = product
            .handle(&ProductCommand::DefineProduct(define_cmd(product_id)))
            .unwrap();
        product.apply(&events[0]);

        assert!(product.low_stock(9));
        assert!(!product.low_stock(10));
        assert!(!product.low_stock(11));
    }

    #[cfg(test)]
    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #![proptest_config(ProptestConfig {
                cases: 256,
                ..ProptestConfig::default()
            })]

            /// Property: Handle is deterministic (same state + command = same events).
            #[test]
            fn handle_is_deterministic(
                item_id in "[A-Z0-9]{1,10}",
                name in "[A-Za-z][A-Za-z0-9 ]{0,40}",
                mrp in 0.01f64..10_000.0,
                min_stock in 0i64..500,
            ) {
                let product_id = test_product_id();
                let mut product = Product::empty(product_id);

                let cmd = DefineProduct {
                    product_id,
                    item_id,
                    name,
                    category: "Snack Foods".to_string(),
                    mrp,
                    min_stock,
                    occurred_at: test_time(),
                };
                let events = product.handle(&ProductCommand::DefineProduct(cmd)).unwrap();
                product.apply(&events[0]);

                let state_before = product.clone();
                let update = UpdateProduct {
                    product_id,
                    name: None,
                    mrp: Some(mrp + 1.0),
                    min_stock: None,
                    occurred_at: test_time(),
                };

                let events1 = product.handle(&ProductCommand::UpdateProduct(update.clone()));
                prop_assert_eq!(&state_before, &product);

                let events2 = product.handle(&ProductCommand::UpdateProduct(update));
                prop_assert_eq!(&state_before, &product);

                prop_assert_eq!(events1, events2);
            }

            /// Property: Apply is deterministic (same events = same final state).
            #[test]
            fn apply_is_deterministic(
                mrp in 0.01f64..10_000.0,
                min_stock in 0i64..500,
            ) {
                let product_id = test_product_id();
                let events = vec![
                    ProductEvent::ProductDefined(ProductDefined {
                        product_id,
                        item_id: "SKU-1".to_string(),
                        name: "Milk 500ml".to_string(),
                        category: "Dairy".to_string(),
                        mrp,
                        min_stock,
                        occurred_at: test_time(),
                    }),
                    ProductEvent::ProductUpdated(ProductUpdated {
                        product_id,
                        name: None,
                        mrp: Some(mrp * 2.0),
                        min_stock: None,
                        occurred_at: test_time(),
                    }),
                    ProductEvent::ProductDiscontinued(ProductDiscontinued {
                        product_id,
                        occurred_at: test_time(),
                    }),
                ];

                let mut product1 = Product::empty(product_id);
                let mut product2 = Product::empty(product_id);
                for event in &events {
                    product1.apply(event);
                    product2.apply(event);
                }

                prop_assert_eq!(&product1, &product2);
                prop_assert_eq!(product1.version(), 3);
                prop_assert_eq!(product1.status(), ProductStatus::Discontinued);
            }
        }
    }
}
