//! CrudService: generic CRUD over the catalog and the injected store.

mod crud;
mod record;
pub use crud::CrudService;
pub use record::{parse_id, RecordDecoder};
