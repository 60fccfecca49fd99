use super::Config;
use std::path::PathBuf;

pub const BASE_URL_ENV: &str = "SAAS_PULL_BASE_URL";
pub const CLIENT_ID_ENV: &str = "SAAS_PULL_CLIENT_ID";
pub const CLIENT_SECRET_ENV: &str = "SAAS_PULL_CLIENT_SECRET";
pub const ENCRYPTION_KEY_ENV: &str = "SAAS_PULL_ENCRYPTION_KEY";
pub const OUTPUT_DIR_ENV: &str = "SAAS_PULL_OUTPUT_DIR";

impl Config {
    /// Overlay values from the environment on top of the file config.
    ///
    /// `lookup` is `std::env::var` in production; unset or empty values are ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.is_empty());

        if let Some(v) = get(BASE_URL_ENV) {
            self.api.base_url = v;
        }
        if let Some(v) = get(CLIENT_ID_ENV) {
            self.api.client_id = v;
        }
        if let Some(v) = get(CLIENT_SECRET_ENV) {
            self.api.client_secret = v;
        }
        if let Some(v) = get(ENCRYPTION_KEY_ENV) {
            self.state.encryption_key = Some(v);
        }
        if let Some(v) = get(OUTPUT_DIR_ENV) {
            self.output.directory = PathBuf::from(v);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_overrides_replace_file_values() {
        let mut config = Config::from_toml(
            r#"
            [api]
            base_url = "https://file.example.com"
            client_id = "file-id"
            client_secret = "file-secret"
            "#,
        )
        .unwrap();

        let env: HashMap<&str, &str> = [
            (CLIENT_ID_ENV, "env-id"),
            (CLIENT_SECRET_ENV, ""),
            (OUTPUT_DIR_ENV, "/tmp/events"),
        ]
        .into_iter()
        .collect();

        config.apply_overrides(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.api.base_url, "https://file.example.com");
        assert_eq!(config.api.client_id, "env-id");
        // empty values do not clobber the file
        assert_eq!(config.api.client_secret, "file-secret");
        assert_eq!(config.output.directory, PathBuf::from("/tmp/events"));
        assert!(config.state.encryption_key.is_none());
    }
}
