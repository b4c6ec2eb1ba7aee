// handlers/admin/mod.rs - Admin panel endpoints
//
// These carry no authentication of their own; deployments put them behind
// the same network boundary as the admin panel.

pub mod groups;
pub mod members;

pub use groups::{create as group_create, delete as group_delete, list as group_list, rename as group_rename};
pub use members::{create_user, list_users};
