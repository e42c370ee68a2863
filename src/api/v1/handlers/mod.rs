pub mod health;
pub mod jwe;
pub mod token;
pub mod tokens;
