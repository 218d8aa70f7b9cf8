//! SeaORM entity definitions
//!
//! These are database-specific entities separate from domain models.

pub mod message;
pub mod outbox_entry;

// Re-exports for public API convenience
#[allow(unused_imports)]
pub use message::{ActiveModel as MessageActiveModel, Entity as MessageEntity, Model as MessageModel};
#[allow(unused_imports)]
pub use outbox_entry::{
    ActiveModel as OutboxActiveModel, Entity as OutboxEntity, Model as OutboxModel,
};
