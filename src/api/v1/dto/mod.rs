pub mod jwe;
pub mod token;
