//! Authentication for the HTTP API.
//!
//! Callers present an HS256 access token from the identity provider. The
//! token names the user; the role comes from that user's profile.

pub mod jwt;
pub mod middleware;

pub use jwt::{AuthError, Claims, JwtVerifier};
pub use middleware::{BearerToken, RequireAdmin, SessionUser};
