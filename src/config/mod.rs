use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;
use tracing::warn;

/// Firebase project the listings live in
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FirebaseConfig {
    pub project_id: String,
    /// Web API key; without one the admin runs against an in-memory store
    pub api_key: Option<String>,
    pub firestore_base: String,
    pub identity_base: String,
    pub token_base: String,
}

impl Default for FirebaseConfig {
    fn default() -> Self {
        Self {
            project_id: "main-to-let".into(),
            api_key: None,
            firestore_base: "https://firestore.googleapis.com/v1".into(),
            identity_base: "https://identitytoolkit.googleapis.com/v1".into(),
            token_base: "https://securetoken.googleapis.com/v1".into(),
        }
    }
}

/// Cloudinary account used for unsigned image uploads
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CloudinaryConfig {
    pub cloud_name: String,
    pub upload_preset: String,
    pub api_base: String,
}

impl Default for CloudinaryConfig {
    fn default() -> Self {
        Self {
            cloud_name: "dvtye0dk9".into(),
            upload_preset: "to-let".into(),
            api_base: "https://api.cloudinary.com".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminConfig {
    pub firebase: FirebaseConfig,
    pub cloudinary: CloudinaryConfig,
    /// How often the live listing feed re-reads the collection
    pub poll_interval: Duration,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            firebase: FirebaseConfig::default(),
            cloudinary: CloudinaryConfig::default(),
            poll_interval: Duration::from_secs(5),
        }
    }
}

impl AdminConfig {
    /// Defaults overlaid with the process environment
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Defaults overlaid with values from `lookup`; blank values are ignored
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        if let Some(project_id) = get("TOLET_FIREBASE_PROJECT_ID") {
            config.firebase.project_id = project_id;
        }
        config.firebase.api_key = get("TOLET_FIREBASE_API_KEY");
        if let Some(cloud_name) = get("CLOUDINARY_CLOUD_NAME") {
            config.cloudinary.cloud_name = cloud_name;
        }
        if let Some(preset) = get("CLOUDINARY_UPLOAD_PRESET") {
            config.cloudinary.upload_preset = preset;
        }
        if let Some(api_base) = get("CLOUDINARY_API_BASE") {
            config.cloudinary.api_base = api_base.trim_end_matches('/').to_string();
        }
        if let Some(secs) = get("TOLET_POLL_INTERVAL_SECS") {
            match secs.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => config.poll_interval = Duration::from_secs(secs),
                _ => warn!("Ignoring invalid TOLET_POLL_INTERVAL_SECS={}", secs),
            }
        }

        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults_without_environment() {
        let config = AdminConfig::from_lookup(|_| None);
        assert_eq!(config.cloudinary.cloud_name, "dvtye0dk9");
        assert_eq!(config.cloudinary.upload_preset, "to-let");
        assert_eq!(config.firebase.project_id, "main-to-let");
        assert!(config.firebase.api_key.is_none());
        assert_eq!(config.poll_interval, Duration::from_secs(5));
    }

    #[test]
    fn test_environment_overrides() {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("TOLET_FIREBASE_API_KEY", "key-123"),
            ("CLOUDINARY_CLOUD_NAME", "demo"),
            ("CLOUDINARY_UPLOAD_PRESET", " "),
            ("CLOUDINARY_API_BASE", "http://127.0.0.1:9000/"),
            ("TOLET_POLL_INTERVAL_SECS", "0"),
        ]);
        let config = AdminConfig::from_lookup(|k| vars.get(k).map(|v| v.to_string()));

        assert_eq!(config.firebase.api_key.as_deref(), Some("key-123"));
        assert_eq!(config.cloudinary.cloud_name, "demo");
        assert_eq!(config.cloudinary.upload_preset, "to-let");
        assert_eq!(config.cloudinary.api_base, "http://127.0.0.1:9000");
        assert_eq!(config.poll_interval, Duration::from_secs(5));
    }
}
