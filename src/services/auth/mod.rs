pub mod authenticator;
pub mod factory;
pub mod jwt;
pub mod token_service;

pub use authenticator::{Authentication, Authenticator, FileAuthenticator};
pub use factory::{build_authenticator, build_token_service};
pub use jwt::{JwtError, JwtIssuer, TokenKind};
pub use token_service::TokenService;
