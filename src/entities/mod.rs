//! Entity module - Contains all SeaORM entity definitions for the database.
//! These entities represent the database tables and their relationships.
//! Each entity has a Model struct for data and an Entity struct for operations.

pub mod auth_token;
pub mod cart;
pub mod cart_item;
pub mod category;
pub mod feedback;
pub mod item;
pub mod menu;
pub mod menu_item;
pub mod order;
pub mod order_item;
pub mod payment;
pub mod reservation;
pub mod reservation_item;
pub mod user;

// Re-export specific types to avoid conflicts
pub use auth_token::Entity as AuthToken;
pub use cart::Entity as Cart;
pub use cart_item::Entity as CartItem;
pub use category::Entity as Category;
pub use feedback::Entity as Feedback;
pub use item::Entity as Item;
pub use menu::Entity as Menu;
pub use menu_item::Entity as MenuItem;
pub use order::{Entity as Order, OrderStatus};
pub use order_item::Entity as OrderItem;
pub use payment::{Entity as Payment, PaymentMethod, PaymentStatus};
pub use reservation::{Entity as Reservation, ReservationStatus};
pub use reservation_item::Entity as ReservationItem;
pub use user::{Entity as User, Role};
