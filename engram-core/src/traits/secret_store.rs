use crate::errors::EngramResult;

/// External secret store, used only for the database encryption key.
pub trait ISecretStore: Send + Sync {
    fn get(&self, key_name: &str) -> EngramResult<Option<String>>;
    fn set(&self, key_name: &str, value: &str) -> EngramResult<()>;
}
