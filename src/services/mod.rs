pub mod directory_service;

pub use directory_service::{
    looks_like_email, DirectoryError, DirectoryResult, DirectoryService, ModLink, Modification,
};
