// Identity and role model: who the actor is and what their role lets them do.

pub mod directory;
pub mod password;
pub mod role;
pub mod user;

pub use directory::{NewUser, UserDirectory};
pub use role::{Action, Role};
pub use user::{authorize, has_permission, Denial, User};
