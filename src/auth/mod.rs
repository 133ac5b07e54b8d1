//! User accounts, password hashing, and cookie based authentication.

mod cookie;
mod log_in;
mod middleware;
mod password;
mod token;
mod user;

pub use cookie::DEFAULT_COOKIE_DURATION;
pub use log_in::{post_log_in, post_log_out};
pub use middleware::auth_guard;
pub use password::PasswordHash;
pub(super) use token::Token;
pub use user::{User, UserID, create_user, create_user_table, get_user_by_id};

#[cfg(test)]
pub use cookie::COOKIE_TOKEN;

#[cfg(test)]
pub use middleware::AuthState;
