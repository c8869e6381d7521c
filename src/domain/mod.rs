pub mod chain;
pub mod constants;
pub mod crypto;
pub mod issue;
pub mod policy;
pub mod signature;
pub mod verification;
