pub mod extract;
pub mod health_handlers;
pub mod identity;
pub mod image_handlers;
pub mod metadata_handlers;
