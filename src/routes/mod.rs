pub mod callable;
pub mod events;
pub mod health;
