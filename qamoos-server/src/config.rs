//! Process environment → configuration keys.
//!
//! Conventional variables are mapped first, then any `QAMOOS__A__B`
//! variable overrides the key `a.b`.

use anyhow::{anyhow, Result};
use qamoos_core::DictConfig;

pub const ENV_PREFIX: &str = "QAMOOS";

/// Configure every setting from the process environment.
pub fn config(config: &mut DictConfig) -> Result<()> {
    apply_env(config, |key| std::env::var(key).ok())?;
    config.load_env(ENV_PREFIX);
    Ok(())
}

/// Apply conventional variables read through `var`.
pub fn apply_env<F>(config: &mut DictConfig, var: F) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    let lookup = |key: &str| {
        var(key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    };

    configure_http(config, &lookup)?;
    configure_auth(config, &lookup);
    configure_media(config, &lookup);
    configure_staging(config, &lookup);
    Ok(())
}

fn configure_http(config: &mut DictConfig, var: &impl Fn(&str) -> Option<String>) -> Result<()> {
    if let Some(host) = var("HTTP_HOST") {
        config.set("http.host", host);
    }
    if let Some(port) = var("HTTP_PORT").or_else(|| var("PORT")) {
        port.parse::<u16>()
            .map_err(|e| anyhow!("invalid HTTP_PORT '{port}': {e}"))?;
        config.set("http.port", port);
    }
    Ok(())
}

fn configure_auth(config: &mut DictConfig, var: &impl Fn(&str) -> Option<String>) {
    if let Some(secret) = var("AUTH_JWT_SECRET").or_else(|| var("JWT_SECRET")) {
        config.set("auth.jwt.secret", secret);
    }
    if let Some(lifetime) = var("AUTH_JWT_EXPIRES_IN") {
        config.set("auth.jwt.expires_in", lifetime);
    }
    if let Some(username) = var("ADMIN_USERNAME") {
        config.set("auth.admin.username", username);
    }
    if let Some(password) = var("ADMIN_PASSWORD") {
        config.set("auth.admin.password", password);
    }
}

fn configure_media(config: &mut DictConfig, var: &impl Fn(&str) -> Option<String>) {
    if let Some(url) = var("CLOUDINARY_URL") {
        config.set("cloudinary.url", url);
    }
    for (env, key) in [
        ("CLOUDINARY_CLOUD_NAME", "cloudinary.cloud_name"),
        ("CLOUDINARY_API_KEY", "cloudinary.api_key"),
        ("CLOUDINARY_API_SECRET", "cloudinary.api_secret"),
    ] {
        if let Some(value) = var(env) {
            config.set(key, value);
        }
    }
    if let Some(folder) = var("MEDIA_FOLDER") {
        config.set("media.folder", folder);
    }
}

fn configure_staging(config: &mut DictConfig, var: &impl Fn(&str) -> Option<String>) {
    if let Some(dir) = var("STAGING_DIR") {
        config.set("staging.dir", dir);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn conventional_variables_map_to_keys() {
        let vars = env(&[
            ("HTTP_PORT", "8080"),
            ("JWT_SECRET", "a-long-enough-secret"),
            ("ADMIN_USERNAME", "admin"),
            ("CLOUDINARY_URL", "cloudinary://k:s@demo"),
            ("STAGING_DIR", "/tmp/up"),
        ]);
        let mut cfg = DictConfig::new();
        apply_env(&mut cfg, |k| vars.get(k).cloned()).unwrap();

        assert_eq!(cfg.get("http.port"), Some("8080"));
        assert_eq!(cfg.get("auth.jwt.secret"), Some("a-long-enough-secret"));
        assert_eq!(cfg.get("auth.admin.username"), Some("admin"));
        assert_eq!(cfg.get("cloudinary.url"), Some("cloudinary://k:s@demo"));
        assert_eq!(cfg.get("staging.dir"), Some("/tmp/up"));
        assert!(!cfg.has("auth.admin.password"));
    }

    #[test]
    fn blank_values_are_ignored() {
        let vars = env(&[("HTTP_HOST", "  ")]);
        let mut cfg = DictConfig::new();
        cfg.set("http.host", "127.0.0.1");
        apply_env(&mut cfg, |k| vars.get(k).cloned()).unwrap();
        assert_eq!(cfg.get("http.host"), Some("127.0.0.1"));
    }

    #[test]
    fn bad_port_is_an_error() {
        let vars = env(&[("HTTP_PORT", "eighty")]);
        let mut cfg = DictConfig::new();
        assert!(apply_env(&mut cfg, |k| vars.get(k).cloned()).is_err());
    }
}
