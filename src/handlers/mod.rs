// handlers/mod.rs - HTTP handlers grouped by audience
//
// Public handlers serve the modify form (key-based access); admin handlers
// serve the admin panel. Both are mounted under /api by `server::app`.

pub mod admin;
pub mod public;
