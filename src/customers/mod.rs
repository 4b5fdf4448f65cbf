//! Customer registry: records, repository and the cached service layer.

pub mod error;
pub mod model;
pub mod repository;
pub mod service;


pub use error::{CustomerError, CustomerResult};
pub use model::{Customer, CustomerFilter, CustomerPatch, NewCustomer, Page, ValidCustomer};
pub use repository::{CustomerRepository, InMemoryCustomerRepository};
pub use service::{CUSTOMER_KEYS, CustomerService};
