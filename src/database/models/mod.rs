pub mod contact;
pub mod user;

pub use contact::{Contact, ContactModel};
pub use user::{NewUser, User, UserModel};
