pub mod token;
pub mod token_cache;

pub use token::AccessToken;
pub use token_cache::TokenCache;
