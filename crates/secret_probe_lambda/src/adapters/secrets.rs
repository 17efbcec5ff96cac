use secret_probe_core::contract::SecretRequest;

pub trait SecretSource {
    /// Returns the `SecretString` payload selected by `request`.
    fn get_secret_string(&self, request: &SecretRequest) -> Result<String, String>;
}
