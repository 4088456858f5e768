//! Chat session ownership and persistence.

mod store;

pub use store::SessionStore;
