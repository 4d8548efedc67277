use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use shelfpulse_core::{round2, Aggregate, AggregateRoot, DomainError, Entity, ValueObject};
use shelfpulse_events::Event;
use shelfpulse_products::ProductId;

use crate::expiry::{classify, ExpiryStatus};

/// Batch identifier.
///
/// Batches are entities inside the `StockLedger` aggregate, not aggregates of
/// their own; their IDs are minted by the caller and carried in commands so
/// `handle` stays deterministic.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BatchId(Uuid);

impl BatchId {
    /// Uses UUIDv7 (time-ordered). Prefer passing IDs explicitly in tests.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for BatchId {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Display for BatchId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// A discrete receipt of stock with its own expiry date and remaining quantity.
///
/// Quantity is mutated only by applying ledger events. A batch at quantity 0
/// is inert but retained for audit history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Batch {
    pub id: BatchId,
    pub batch_number: String,
    pub quantity: i64,
    pub cost_price: f64,
    pub manufacture_date: Option<NaiveDate>,
    pub expiry_date: NaiveDate,
    /// Position in receipt order (1-based); FIFO tie-break for equal expiry dates.
    pub received_seq: u32,
    pub received_at: DateTime<Utc>,
}

impl Batch {
    pub fn days_left(&self, today: NaiveDate) -> i64 {
        (self.expiry_date - today).num_days()
    }

    pub fn expiry_status(&self, today: NaiveDate) -> ExpiryStatus {
        classify(self.days_left(today))
    }
}

impl Entity for Batch {
    type Id = BatchId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// One batch's share of a sale allocation.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchDeduction {
    pub batch_id: BatchId,
    pub quantity: i64,
}

impl ValueObject for BatchDeduction {}

/// Aggregate root: StockLedger.
///
/// One ledger per product. All batch quantity changes flow through here so the
/// FIFO ordering and the non-negativity invariant hold by construction.
#[derive(Debug, Clone, PartialEq)]
pub struct StockLedger {
    id: ProductId,
    item_id: String,
    batches: Vec<Batch>,
    /// Count of batches ever received (drives `B{item_id}-NN` numbering).
    batches_received: u32,
    version: u64,
    opened: bool,
}

impl StockLedger {
    /// Create an empty, not-yet-opened aggregate instance for rehydration.
    pub fn empty(id: ProductId) -> Self {
        Self {
            id,
            item_id: String::new(),
            batches: Vec::new(),
            batches_received: 0,
            version: 0,
            opened: false,
        }
    }

    pub fn id_typed(&self) -> ProductId {
        self.id
    }

    pub fn item_id(&self) -> &str {
        &self.item_id
    }

    pub fn is_open(&self) -> bool {
        self.opened
    }

    pub fn batches(&self) -> &[Batch] {
        &self.batches
    }

    pub fn batch(&self, batch_id: BatchId) -> Option<&Batch> {
        self.batches.iter().find(|b| b.id == batch_id)
    }

    /// Sum of quantity over batches with stock, recomputed from current state.
    pub fn total_stock(&self) -> i64 {
        self.batches
            .iter()
            .filter(|b| b.quantity > 0)
            .map(|b| b.quantity)
            .sum()
    }

    /// Batches with stock, in depletion order: ascending expiry date, receipt
    /// sequence breaking ties. Every allocation observes this one ordering.
    fn depletion_order(&self) -> Vec<&Batch> {
        let mut available: Vec<&Batch> = self.batches.iter().filter(|b| b.quantity > 0).collect();
        available.sort_by_key(|b| (b.expiry_date, b.received_seq));
        available
    }
}

impl AggregateRoot for StockLedger {
    type Id = ProductId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: OpenLedger. Issued once, when the product is defined.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenLedger {
    pub product_id: ProductId,
    pub item_id: String,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ReceiveBatch (restock).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReceiveBatch {
    pub product_id: ProductId,
    pub batch_id: BatchId,
    pub quantity: i64,
    pub cost_price: f64,
    pub manufacture_date: Option<NaiveDate>,
    pub expiry_date: NaiveDate,
    pub occurred_at: DateTime<Utc>,
}

/// Command: AllocateSale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocateSale {
    pub product_id: ProductId,
    pub quantity: i64,
    pub unit_price: f64,
    pub occurred_at: DateTime<Utc>,
}

/// Command: RecordWastage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordWastage {
    pub product_id: ProductId,
    pub batch_id: BatchId,
    pub quantity: i64,
    pub unit_price: f64,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LedgerCommand {
    OpenLedger(OpenLedger),
    ReceiveBatch(ReceiveBatch),
    AllocateSale(AllocateSale),
    RecordWastage(RecordWastage),
}

/// Event: LedgerOpened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerOpened {
    pub product_id: ProductId,
    pub item_id: String,
    pub occurred_at: DateTime<Utc>,
}

/// Event: BatchReceived.
///
/// Doubles as the restock audit record: `total_amount` is the restock cost,
/// already rounded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchReceived {
    pub product_id: ProductId,
    pub batch_id: BatchId,
    pub batch_number: String,
    pub quantity: i64,
    pub cost_price: f64,
    pub manufacture_date: Option<NaiveDate>,
    pub expiry_date: NaiveDate,
    pub total_amount: f64,
    pub occurred_at: DateTime<Utc>,
}

/// Event: SaleAllocated.
///
/// Carries the full FIFO deduction plan; conservation holds:
/// Σ deductions == quantity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaleAllocated {
    pub product_id: ProductId,
    pub quantity: i64,
    pub unit_price: f64,
    pub total_amount: f64,
    pub deductions: Vec<BatchDeduction>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: WastageRecorded.
///
/// `written_off` is clamped to the batch's remaining quantity; `requested` is
/// what the caller asked to write off.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WastageRecorded {
    pub product_id: ProductId,
    pub batch_id: BatchId,
    pub requested: i64,
    pub written_off: i64,
    pub unit_price: f64,
    pub total_amount: f64,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LedgerEvent {
    LedgerOpened(LedgerOpened),
    BatchReceived(BatchReceived),
    SaleAllocated(SaleAllocated),
    WastageRecorded(WastageRecorded),
}

impl Event for LedgerEvent {
    fn event_type(&self) -> &'static str {
        match self {
            LedgerEvent::LedgerOpened(_) => "ledger.opened",
            LedgerEvent::BatchReceived(_) => "ledger.batch_received",
            LedgerEvent::SaleAllocated(_) => "ledger.sale_allocated",
            LedgerEvent::WastageRecorded(_) => "ledger.wastage_recorded",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            LedgerEvent::LedgerOpened(e) => e.occurred_at,
            LedgerEvent::BatchReceived(e) => e.occurred_at,
            LedgerEvent::SaleAllocated(e) => e.occurred_at,
            LedgerEvent::WastageRecorded(e) => e.occurred_at,
        }
    }
}

impl Aggregate for StockLedger {
    type Command = LedgerCommand;
    type Event = LedgerEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            LedgerEvent::LedgerOpened(e) => {
                self.id = e.product_id;
                self.item_id = e.item_id.clone();
                self.batches.clear();
                self.batches_received = 0;
                self.opened = true;
            }
            LedgerEvent::BatchReceived(e) => {
                self.batches_received += 1;
                self.batches.push(Batch {
                    id: e.batch_id,
                    batch_number: e.batch_number.clone(),
                    quantity: e.quantity,
                    cost_price: e.cost_price,
                    manufacture_date: e.manufacture_date,
                    expiry_date: e.expiry_date,
                    received_seq: self.batches_received,
                    received_at: e.occurred_at,
                });
            }
            LedgerEvent::SaleAllocated(e) => {
                for deduction in &e.deductions {
                    if let Some(batch) = self.batches.iter_mut().find(|b| b.id == deduction.batch_id)
                    {
                        batch.quantity -= deduction.quantity;
                    }
                }
            }
            LedgerEvent::WastageRecorded(e) => {
                if let Some(batch) = self.batches.iter_mut().find(|b| b.id == e.batch_id) {
                    batch.quantity -= e.written_off;
                }
            }
        }

        // Deterministic version tracking: +1 per applied event.
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            LedgerCommand::OpenLedger(cmd) => self.handle_open(cmd),
            LedgerCommand::ReceiveBatch(cmd) => self.handle_receive(cmd),
            LedgerCommand::AllocateSale(cmd) => self.handle_allocate(cmd),
            LedgerCommand::RecordWastage(cmd) => self.handle_wastage(cmd),
        }
    }
}

impl StockLedger {
    fn ensure_product_id(&self, product_id: ProductId) -> Result<(), DomainError> {
        if self.id != product_id {
            return Err(DomainError::invariant("product_id mismatch"));
        }
        Ok(())
    }

    fn handle_open(&self, cmd: &OpenLedger) -> Result<Vec<LedgerEvent>, DomainError> {
        if self.opened {
            return Err(DomainError::conflict("ledger already opened"));
        }
        if cmd.item_id.trim().is_empty() {
            return Err(DomainError::validation("item_id cannot be empty"));
        }

        Ok(vec![LedgerEvent::LedgerOpened(LedgerOpened {
            product_id: cmd.product_id,
            item_id: cmd.item_id.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_receive(&self, cmd: &ReceiveBatch) -> Result<Vec<LedgerEvent>, DomainError> {
        if !self.opened {
            return Err(DomainError::ProductNotFound);
        }
        self.ensure_product_id(cmd.product_id)?;

        if cmd.quantity <= 0 {
            return Err(DomainError::validation("quantity must be positive"));
        }
        if !(cmd.cost_price.is_finite() && cmd.cost_price >= 0.0) {
            return Err(DomainError::validation("cost_price cannot be negative"));
        }
        if self.batches.iter().any(|b| b.id == cmd.batch_id) {
            return Err(DomainError::conflict("batch_id already received"));
        }

        let batch_number = format!("B{}-{:02}", self.item_id, self.batches_received + 1);

        Ok(vec![LedgerEvent::BatchReceived(BatchReceived {
            product_id: cmd.product_id,
            batch_id: cmd.batch_id,
            batch_number,
            quantity: cmd.quantity,
            cost_price: cmd.cost_price,
            manufacture_date: cmd.manufacture_date,
            expiry_date: cmd.expiry_date,
            total_amount: round2(cmd.quantity as f64 * cmd.cost_price),
            occurred_at: cmd.occurred_at,
        })])
    }

    /// FIFO-by-expiry allocation: plan first, emit only if the whole request
    /// can be satisfied. `handle` never mutates, so a failed allocation leaves
    /// every batch untouched (all-or-nothing).
    fn handle_allocate(&self, cmd: &AllocateSale) -> Result<Vec<LedgerEvent>, DomainError> {
        if !self.opened {
            return Err(DomainError::ProductNotFound);
        }
        self.ensure_product_id(cmd.product_id)?;

        if cmd.quantity <= 0 {
            return Err(DomainError::validation("quantity must be positive"));
        }
        if !(cmd.unit_price.is_finite() && cmd.unit_price >= 0.0) {
            return Err(DomainError::validation("unit_price cannot be negative"));
        }

        let available = self.depletion_order();
        let total: i64 = available.iter().map(|b| b.quantity).sum();
        if total < cmd.quantity {
            return Err(DomainError::insufficient_stock(cmd.quantity, total));
        }

        let mut remaining = cmd.quantity;
        let mut deductions = Vec::new();
        for batch in available {
            if remaining == 0 {
                break;
            }
            let deduct = batch.quantity.min(remaining);
            deductions.push(BatchDeduction {
                batch_id: batch.id,
                quantity: deduct,
            });
            remaining -= deduct;
        }

        Ok(vec![LedgerEvent::SaleAllocated(SaleAllocated {
            product_id: cmd.product_id,
            quantity: cmd.quantity,
            unit_price: cmd.unit_price,
            total_amount: round2(cmd.quantity as f64 * cmd.unit_price),
            deductions,
            occurred_at: cmd.occurred_at,
        })])
    }

    /// Wastage is a write-off, not a hard constraint: the deduction is clamped
    /// to what the batch still holds and never fails on excess.
    fn handle_wastage(&self, cmd: &RecordWastage) -> Result<Vec<LedgerEvent>, DomainError> {
        if !self.opened {
            return Err(DomainError::ProductNotFound);
        }
        self.ensure_product_id(cmd.product_id)?;

        if cmd.quantity <= 0 {
            return Err(DomainError::validation("quantity must be positive"));
        }
        if !(cmd.unit_price.is_finite() && cmd.unit_price >= 0.0) {
            return Err(DomainError::validation("unit_price cannot be negative"));
        }

        let batch = self
            .batch(cmd.batch_id)
            .ok_or(DomainError::BatchNotFound)?;

        let written_off = batch.quantity.min(cmd.quantity);

        Ok(vec![LedgerEvent::WastageRecorded(WastageRecorded {
            product_id: cmd.product_id,
            batch_id: cmd.batch_id,
            requested: cmd.quantity,
            written_off,
            unit_price: cmd.unit_price,
            total_amount: round2(cmd.quantity as f64 * cmd.unit_price),
            occurred_at: cmd.occurred_at,
        })])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shelfpulse_core::AggregateId;

    fn test_product_id() -> ProductId {
        ProductId::new(AggregateId::new())
    }

    fn test_time() -> DateTime<Utc> {
        Utc::now()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn opened_ledger(product_id: ProductId) -> StockLedger {
        let mut ledger = StockLedger::empty(product_id);
        let events = ledger
            .handle(&LedgerCommand::OpenLedger(OpenLedger {
                product_id,
                item_id: "FDX07".to_string(),
                occurred_at: test_time(),
            }))
            .unwrap();
        ledger.apply(&events[0]);
        ledger
    }

    fn receive(
        ledger: &mut StockLedger,
        quantity: i64,
        expiry_date: NaiveDate,
    ) -> BatchId {
        let batch_id = BatchId::new();
        let events = ledger
            .handle(&LedgerCommand::ReceiveBatch(ReceiveBatch {
                product_id: ledger.id_typed(),
                batch_id,
                quantity,
                cost_price: 12.5,
                manufacture_date: None,
                expiry_date,
                occurred_at: test_time(),
            }))
            .unwrap();
        ledger.apply(&events[0]);
        batch_id
    }

    fn allocate(ledger: &mut StockLedger, quantity: i64) -> SaleAllocated {
        let events = ledger
            .handle(&LedgerCommand::AllocateSale(AllocateSale {
                product_id: ledger.id_typed(),
                quantity,
                unit_price: 20.0,
                occurred_at: test_time(),
            }))
            .unwrap();
        let allocated = match &events[0] {
            LedgerEvent::SaleAllocated(e) => e.clone(),
            _ => panic!("Expected SaleAllocated event"),
        };
        ledger.apply(&events[0]);
        allocated
    }

    #[test]
    fn receive_numbers_batches_sequentially() {
        let product_id = test_product_id();
        let mut ledger = opened_ledger(product_id);

        let batch_id = BatchId::new();
        let events = ledger
            .handle(&LedgerCommand::ReceiveBatch(ReceiveBatch {
                product_id,
                batch_id,
                quantity: 40,
                cost_price: 10.0,
                manufacture_date: Some(date(2026, 1, 2)),
                expiry_date: date(2026, 6, 1),
                occurred_at: test_time(),
            }))
            .unwrap();
        match &events[0] {
            LedgerEvent::BatchReceived(e) => {
                assert_eq!(e.batch_number, "BFDX07-01");
                assert_eq!(e.total_amount, 400.0);
            }
            _ => panic!("Expected BatchReceived event"),
        }
        ledger.apply(&events[0]);

        receive(&mut ledger, 10, date(2026, 7, 1));
        assert_eq!(ledger.batches()[1].batch_number, "BFDX07-02");
        assert_eq!(ledger.total_stock(), 50);
    }

    #[test]
    fn allocation_deducts_soonest_expiring_batch_first() {
        let product_id = test_product_id();
        let mut ledger = opened_ledger(product_id);
        let today = date(2026, 3, 1);

        let a = receive(&mut ledger, 50, today + chrono::Days::new(60));
        let b = receive(&mut ledger, 20, today + chrono::Days::new(10));

        let allocated = allocate(&mut ledger, 25);
        assert_eq!(allocated.deductions.len(), 2);
        assert_eq!(allocated.deductions[0].batch_id, b);
        assert_eq!(allocated.deductions[0].quantity, 20);
        assert_eq!(allocated.deductions[1].batch_id, a);
        assert_eq!(allocated.deductions[1].quantity, 5);

        assert_eq!(ledger.batch(b).unwrap().quantity, 0);
        assert_eq!(ledger.batch(a).unwrap().quantity, 45);
    }

    #[test]
    fn expired_but_unsold_stock_is_depleted_first() {
        // A(50, +60d), B(20, +10d), C(10, -5d): C first, then B, then A.
        let product_id = test_product_id();
        let mut ledger = opened_ledger(product_id);
        let today = date(2026, 3, 1);

        let a = receive(&mut ledger, 50, today + chrono::Days::new(60));
        let b = receive(&mut ledger, 20, today + chrono::Days::new(10));
        let c = receive(&mut ledger, 10, today - chrono::Days::new(5));

        let allocated = allocate(&mut ledger, 15);
        assert_eq!(
            allocated.deductions,
            vec![
                BatchDeduction { batch_id: c, quantity: 10 },
                BatchDeduction { batch_id: b, quantity: 5 },
            ]
        );

        assert_eq!(ledger.batch(c).unwrap().quantity, 0);
        assert_eq!(ledger.batch(b).unwrap().quantity, 15);
        assert_eq!(ledger.batch(a).unwrap().quantity, 50);
        assert_eq!(ledger.total_stock(), 65);
    }

    #[test]
    fn equal_expiry_dates_deplete_in_receipt_order() {
        let product_id = test_product_id();
        let mut ledger = opened_ledger(product_id);
        let expiry = date(2026, 4, 10);

        let first = receive(&mut ledger, 10, expiry);
        let second = receive(&mut ledger, 10, expiry);

        let allocated = allocate(&mut ledger, 12);
        assert_eq!(allocated.deductions[0].batch_id, first);
        assert_eq!(allocated.deductions[0].quantity, 10);
        assert_eq!(allocated.deductions[1].batch_id, second);
        assert_eq!(allocated.deductions[1].quantity, 2);
    }

    #[test]
    fn sale_conserves_quantity_and_total_stock() {
        let product_id = test_product_id();
        let mut ledger = opened_ledger(product_id);

        receive(&mut ledger, 30, date(2026, 5, 1));
        receive(&mut ledger, 30, date(2026, 6, 1));
        let before = ledger.total_stock();

        let allocated = allocate(&mut ledger, 42);
        let deducted: i64 = allocated.deductions.iter().map(|d| d.quantity).sum();
        assert_eq!(deducted, 42);
        assert_eq!(allocated.total_amount, 840.0);
        assert_eq!(ledger.total_stock(), before - 42);
    }

    #[test]
    fn insufficient_stock_fails_without_mutation() {
        let product_id = test_product_id();
        let mut ledger = opened_ledger(product_id);
        receive(&mut ledger, 10, date(2026, 5, 1));
        receive(&mut ledger, 5, date(2026, 6, 1));

        let before = ledger.clone();
        let err = ledger
            .handle(&LedgerCommand::AllocateSale(AllocateSale {
                product_id,
                quantity: 16,
                unit_price: 20.0,
                occurred_at: test_time(),
            }))
            .unwrap_err();

        assert_eq!(
            err,
            DomainError::InsufficientStock {
                requested: 16,
                available: 15
            }
        );
        assert_eq!(ledger, before);
        assert_eq!(ledger.total_stock(), 15);
    }

    #[test]
    fn sale_on_unopened_ledger_is_product_not_found() {
        let product_id = test_product_id();
        let ledger = StockLedger::empty(product_id);

        let err = ledger
            .handle(&LedgerCommand::AllocateSale(AllocateSale {
                product_id,
                quantity: 1,
                unit_price: 10.0,
                occurred_at: test_time(),
            }))
            .unwrap_err();
        assert_eq!(err, DomainError::ProductNotFound);
    }

    #[test]
    fn exhausted_batches_are_retained_but_skipped() {
        let product_id = test_product_id();
        let mut ledger = opened_ledger(product_id);

        let early = receive(&mut ledger, 10, date(2026, 4, 1));
        let late = receive(&mut ledger, 10, date(2026, 5, 1));

        allocate(&mut ledger, 10);
        assert_eq!(ledger.batch(early).unwrap().quantity, 0);
        assert_eq!(ledger.batches().len(), 2);

        let allocated = allocate(&mut ledger, 3);
        assert_eq!(allocated.deductions.len(), 1);
        assert_eq!(allocated.deductions[0].batch_id, late);
    }

    #[test]
    fn wastage_clamps_to_remaining_quantity() {
        let product_id = test_product_id();
        let mut ledger = opened_ledger(product_id);
        let batch_id = receive(&mut ledger, 8, date(2026, 4, 1));

        let events = ledger
            .handle(&LedgerCommand::RecordWastage(RecordWastage {
                product_id,
                batch_id,
                quantity: 20,
                unit_price: 12.5,
                occurred_at: test_time(),
            }))
            .unwrap();
        match &events[0] {
            LedgerEvent::WastageRecorded(e) => {
                assert_eq!(e.requested, 20);
                assert_eq!(e.written_off, 8);
            }
            _ => panic!("Expected WastageRecorded event"),
        }
        ledger.apply(&events[0]);

        assert_eq!(ledger.batch(batch_id).unwrap().quantity, 0);
        assert_eq!(ledger.total_stock(), 0);
    }

    #[test]
    fn wastage_on_unknown_batch_is_batch_not_found() {
        let product_id = test_product_id();
        let mut ledger = opened_ledger(product_id);
        receive(&mut ledger, 8, date(2026, 4, 1));

        let err = ledger
            .handle(&LedgerCommand::RecordWastage(RecordWastage {
                product_id,
                batch_id: BatchId::new(),
                quantity: 1,
                unit_price: 12.5,
                occurred_at: test_time(),
            }))
            .unwrap_err();
        assert_eq!(err, DomainError::BatchNotFound);
    }

    #[test]
    fn batch_days_left_and_status_follow_the_shared_classifier() {
        let product_id = test_product_id();
        let mut ledger = opened_ledger(product_id);
        let today = date(2026, 3, 1);
        let batch_id = receive(&mut ledger, 5, today + chrono::Days::new(5));

        let batch = ledger.batch(batch_id).unwrap();
        assert_eq!(batch.days_left(today), 5);
        assert_eq!(batch.expiry_status(today), ExpiryStatus::Critical);
    }

    #[cfg(test)]
    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        fn arb_batches() -> impl Strategy<Value = Vec<(i64, i64)>> {
            // (quantity, expiry offset in days from an arbitrary anchor)
            proptest::collection::vec((0i64..60, -30i64..120), 1..8)
        }

        proptest! {
            #![proptest_config(ProptestConfig {
                cases: 512,
                ..ProptestConfig::default()
            })]

            /// Property: a successful allocation conserves quantity, leaves no
            /// batch negative, and deducts in expiry order; a failed one
            /// leaves the ledger untouched.
            #[test]
            fn fifo_allocation_is_conservative_and_ordered(
                batch_set in arb_batches(),
                requested in 1i64..200,
            ) {
                let product_id = test_product_id();
                let mut ledger = opened_ledger(product_id);
                let anchor = date(2026, 3, 1);
                for (quantity, offset) in &batch_set {
                    if *quantity > 0 {
                        let expiry = if *offset >= 0 {
                            anchor + chrono::Days::new(*offset as u64)
                        } else {
                            anchor - chrono::Days::new(offset.unsigned_abs())
                        };
                        receive(&mut ledger, *quantity, expiry);
                    }
                }

                let before = ledger.clone();
                let total_before = ledger.total_stock();
                let result = ledger.handle(&LedgerCommand::AllocateSale(AllocateSale {
                    product_id,
                    quantity: requested,
                    unit_price: 5.0,
                    occurred_at: test_time(),
                }));

                match result {
                    Ok(events) => {
                        prop_assert!(total_before >= requested);
                        let allocated = match &events[0] {
                            LedgerEvent::SaleAllocated(e) => e.clone(),
                            _ => panic!("Expected SaleAllocated event"),
                        };
                        let deducted: i64 = allocated.deductions.iter().map(|d| d.quantity).sum();
                        prop_assert_eq!(deducted, requested);

                        // Deductions follow the single depletion ordering.
                        let expiries: Vec<_> = allocated
                            .deductions
                            .iter()
                            .map(|d| before.batch(d.batch_id).unwrap().expiry_date)
                            .collect();
                        prop_assert!(expiries.windows(2).all(|w| w[0] <= w[1]));

                        ledger.apply(&events[0]);
                        prop_assert_eq!(ledger.total_stock(), total_before - requested);
                        prop_assert!(ledger.batches().iter().all(|b| b.quantity >= 0));
                    }
                    Err(DomainError::InsufficientStock { requested: r, available }) => {
                        prop_assert_eq!(r, requested);
                        prop_assert_eq!(available, total_before);
                        prop_assert!(total_before < requested);
                        prop_assert_eq!(&ledger, &before);
                    }
                    Err(other) => prop_assert!(false, "unexpected error: {:?}", other),
                }
            }

            /// Property: wastage never drives a batch negative, whatever is requested.
            #[test]
            fn wastage_never_goes_negative(
                quantity in 1i64..40,
                requested in 1i64..200,
            ) {
                let product_id = test_product_id();
                let mut ledger = opened_ledger(product_id);
                let batch_id = receive(&mut ledger, quantity, date(2026, 4, 1));

                let events = ledger
                    .handle(&LedgerCommand::RecordWastage(RecordWastage {
                        product_id,
                        batch_id,
                        quantity: requested,
                        unit_price: 1.0,
                        occurred_at: test_time(),
                    }))
                    .unwrap();
                ledger.apply(&events[0]);

                let batch = ledger.batch(batch_id).unwrap();
                prop_assert!(batch.quantity >= 0);
                prop_assert_eq!(batch.quantity, (quantity - requested).max(0));
            }
        }
    }
}
