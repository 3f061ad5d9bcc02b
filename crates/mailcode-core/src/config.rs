/// Trait for loading service configuration from environment variables.
///
/// Implementors derive `serde::Deserialize` (field `code_ttl_secs` maps to the
/// `CODE_TTL_SECS` env var) and call `Config::from_env()` at startup.
///
/// # Panics
///
/// Panics if any required env var is missing or cannot be deserialized.
pub trait Config: Sized + serde::de::DeserializeOwned {
    fn from_env() -> Self {
        envy::from_env().expect("failed to load config from environment")
    }

    /// Like `from_env`, but reads from an explicit iterator of `(KEY, value)` pairs.
    fn from_iter<I>(vars: I) -> Result<Self, envy::Error>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        envy::from_iter(vars)
    }
}
