use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use shelfpulse_core::{Aggregate, AggregateId, AggregateRoot, DomainError};
use shelfpulse_events::Event;

/// Supplier identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SupplierId(pub AggregateId);

impl SupplierId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for SupplierId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Aggregate root: Supplier.
///
/// Models the "one primary supplier per category" policy: replenishment looks
/// suppliers up by product category, so the directory keeps category unique.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Supplier {
    id: SupplierId,
    name: String,
    category: String,
    contact_email: Option<String>,
    phone: Option<String>,
    version: u64,
    created: bool,
}

impl Supplier {
    /// Create an empty, not-yet-created aggregate instance for rehydration.
    pub fn empty(id: SupplierId) -> Self {
        Self {
            id,
            name: String::new(),
            category: String::new(),
            contact_email: None,
            phone: None,
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> SupplierId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn contact_email(&self) -> Option<&str> {
        self.contact_email.as_deref()
    }

    pub fn phone(&self) -> Option<&str> {
        self.phone.as_deref()
    }

    pub fn exists(&self) -> bool {
        self.created
    }
}

impl AggregateRoot for Supplier {
    type Id = SupplierId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: RegisterSupplier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterSupplier {
    pub supplier_id: SupplierId,
    pub name: String,
    pub category: String,
    pub contact_email: Option<String>,
    pub phone: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: UpdateSupplierContact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateSupplierContact {
    pub supplier_id: SupplierId,
    pub contact_email: Option<String>,
    pub phone: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SupplierCommand {
    RegisterSupplier(RegisterSupplier),
    UpdateSupplierContact(UpdateSupplierContact),
}

/// Event: SupplierRegistered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupplierRegistered {
    pub supplier_id: SupplierId,
    pub name: String,
    pub category: String,
    pub contact_email: Option<String>,
    pub phone: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: SupplierContactUpdated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupplierContactUpdated {
    pub supplier_id: SupplierId,
    pub contact_email: Option<String>,
    pub phone: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SupplierEvent {
    SupplierRegistered(SupplierRegistered),
    SupplierContactUpdated(SupplierContactUpdated),
}

impl Event for SupplierEvent {
    fn event_type(&self) -> &'static str {
        match self {
            SupplierEvent::SupplierRegistered(_) => "parties.supplier.registered",
            SupplierEvent::SupplierContactUpdated(_) => "parties.supplier.contact_updated",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            SupplierEvent::SupplierRegistered(e) => e.occurred_at,
            SupplierEvent::SupplierContactUpdated(e) => e.occurred_at,
        }
    }
}

impl Aggregate for Supplier {
    type Command = SupplierCommand;
    type Event = SupplierEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            SupplierEvent::SupplierRegistered(e) => {
                self.id = e.supplier_id;
                self.name = e.name.clone();
                self.category = e.category.clone();
                self.contact_email = e.contact_email.clone();
                self.phone = e.phone.clone();
                self.created = true;
            }
            SupplierEvent::SupplierContactUpdated(e) => {
                self.contact_email = e.contact_email.clone();
                self.phone = e.phone.clone();
            }
        }

        // Deterministic version tracking: +1 per applied event.
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            SupplierCommand::RegisterSupplier(cmd) => self.handle_register(cmd),
            SupplierCommand::UpdateSupplierContact(cmd) => self.handle_update_contact(cmd),
        }
    }
}

impl Supplier {
    fn handle_register(&self, cmd: &RegisterSupplier) -> Result<Vec<SupplierEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("supplier already exists"));
        }
        if cmd.name.trim().is_empty() {
            return Err(DomainError::validation("name cannot be empty"));
        }
        if cmd.category.trim().is_empty() {
            return Err(DomainError::validation("category cannot be empty"));
        }

        Ok(vec![SupplierEvent::SupplierRegistered(SupplierRegistered {
            supplier_id: cmd.supplier_id,
            name: cmd.name.clone(),
            category: cmd.category.clone(),
            contact_email: cmd.contact_email.clone(),
            phone: cmd.phone.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_update_contact(
        &self,
        cmd: &UpdateSupplierContact,
    ) -> Result<Vec<SupplierEvent>, DomainError> {
        if !self.created {
            return Err(DomainError::SupplierNotFound);
        }
        if self.id != cmd.supplier_id {
            return Err(DomainError::invariant("supplier_id mismatch"));
        }

        Ok(vec![SupplierEvent::SupplierContactUpdated(
            SupplierContactUpdated {
                supplier_id: cmd.supplier_id,
                contact_email: cmd.contact_email.clone(),
                phone: cmd.phone.clone(),
                occurred_at: cmd.occurred_at,
            },
        )])
    }
}
