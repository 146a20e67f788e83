pub mod account;
pub mod events;
pub mod password;
pub mod reset;
pub mod role;
pub mod validation;
