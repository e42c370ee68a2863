/*
 * Responsibility
 * - file-backed stores (API key records, users)
 * - I/O and YAML errors surface as RepoError
 */
pub mod api_key_repo;
pub mod error;
pub mod user_repo;
