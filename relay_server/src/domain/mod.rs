pub mod entities;
pub mod errors;
pub mod ports;

pub use entities::{Grant, Permission, is_valid_group_name};
pub use errors::{AccessError, GroupError};
pub use ports::{Clock, TokenStore};
