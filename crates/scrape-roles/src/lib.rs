//! Scrape Roles
//!
//! Declarative descriptions of the four monitored cluster components and the
//! address book that topology discovery fills in for them.
//!
//! - `labels`: well-known namespaces, label keys, annotation keys and selectors
//! - `role`: `RoleSpec` and friends, one immutable value per monitored role
//! - `address_book`: discovered master/node addresses and the deployment mode

pub mod address_book;
pub mod labels;
pub mod role;

pub use address_book::*;
pub use labels::*;
pub use role::*;
