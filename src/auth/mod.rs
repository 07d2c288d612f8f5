//! Authentication for taskhub
//!
//! Provides:
//! - JWT session token generation and validation
//! - Password hashing with Argon2
//! - The session gate that protects HTTP routes and the notification channel

pub mod jwt;
pub mod password;
pub mod session;

pub use jwt::{extract_token_from_header, extract_token_from_query, Claims, TokenSigner};
pub use password::{hash_password, verify_password};
pub use session::{authenticate, AuthContext};
