//! Entity module - Contains all SeaORM entity definitions for the database.
//! These entities represent the database tables and their relationships.
//! Each entity has a Model struct for data and an Entity struct for operations.

pub mod dining_table;
pub mod item_variant;
pub mod menu_item;
pub mod modifier;
pub mod order;
pub mod order_item;
pub mod restaurant;
pub mod system_state;
pub mod transaction;

// Re-export specific types to avoid conflicts
pub use dining_table::{
    Column as DiningTableColumn, Entity as DiningTable, Model as DiningTableModel,
};
pub use item_variant::{
    Column as ItemVariantColumn, Entity as ItemVariant, Model as ItemVariantModel,
};
pub use menu_item::{Column as MenuItemColumn, Entity as MenuItem, Model as MenuItemModel};
pub use modifier::{Column as ModifierColumn, Entity as Modifier, Model as ModifierModel};
pub use order::{Column as OrderColumn, Entity as Order, Model as OrderModel};
pub use order_item::{Column as OrderItemColumn, Entity as OrderItem, Model as OrderItemModel};
pub use restaurant::{Column as RestaurantColumn, Entity as Restaurant, Model as RestaurantModel};
pub use system_state::{
    Column as SystemStateColumn, Entity as SystemState, Model as SystemStateModel,
};
pub use transaction::{
    Column as TransactionColumn, Entity as Transaction, Model as TransactionModel,
};
