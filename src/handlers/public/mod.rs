// handlers/public/mod.rs - Endpoints used by the public modify form
//
// Access to a record is granted by its modification key alone; there is no
// session or account.

pub mod groups;
pub mod links;
pub mod members;

pub use groups::get_groups;
pub use links::get_mod_link;
pub use members::{get_user_by_key, modify_user};
