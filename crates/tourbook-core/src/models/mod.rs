//! Request and resource types exchanged with the backend.
//!
//! - `user`: login/registration credentials, profile and password updates
//! - `category`: library categories

pub mod category;
pub mod user;

pub use category::Category;
pub use user::{Credentials, PasswordChange, Registration, UserInfoUpdate};
