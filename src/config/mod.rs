//! Configuration persistence: vault key acquisition, payload encryption and
//! the encrypted hosts/keys documents.

pub mod keychain;
pub mod store;
pub mod vault;

pub use keychain::{Keychain, MemorySecretStore, SecretStore};
pub use store::ConfigStore;
pub use vault::Vault;
