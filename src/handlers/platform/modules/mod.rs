// handlers/platform/modules/mod.rs - Module catalog handlers

pub mod list;   // GET /api/platform/modules
pub mod upsert; // POST /api/platform/modules

pub use list::module_list;
pub use upsert::module_upsert;
