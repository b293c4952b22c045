pub mod entities;
pub mod enums;
pub mod memory;
pub mod services;
pub mod store;

pub use memory::InMemoryStore;
pub use services::status_store::SeaOrmStore;
pub use store::{IncidentStore, ServiceStore, StoreError};
