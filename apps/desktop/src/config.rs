use std::{collections::HashMap, fs};

use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub server_url: String,
    pub user_id: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_url: "http://127.0.0.1:8000".into(),
            user_id: "guest".into(),
        }
    }
}

pub fn load_settings() -> Settings {
    let mut settings = Settings::default();

    if let Ok(raw) = fs::read_to_string("chat.toml") {
        apply_file_config(&mut settings, &raw);
    }

    if let Ok(v) = std::env::var("SERVER_URL") {
        settings.server_url = v;
    }
    if let Ok(v) = std::env::var("APP__SERVER_URL") {
        settings.server_url = v;
    }

    if let Ok(v) = std::env::var("CHAT_USER") {
        settings.user_id = v;
    }
    if let Ok(v) = std::env::var("APP__USER_ID") {
        settings.user_id = v;
    }

    settings
}

fn apply_file_config(settings: &mut Settings, raw: &str) {
    if let Ok(file_cfg) = toml::from_str::<HashMap<String, String>>(raw) {
        if let Some(v) = file_cfg.get("server_url") {
            settings.server_url = v.clone();
        }
        if let Some(v) = file_cfg.get("user_id") {
            settings.user_id = v.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_point_at_the_local_server() {
        let settings = Settings::default();
        assert_eq!(settings.server_url, "http://127.0.0.1:8000");
        assert_eq!(settings.user_id, "guest");
    }

    #[test]
    fn file_config_overrides_defaults() {
        let mut settings = Settings::default();
        apply_file_config(
            &mut settings,
            "server_url = \"http://chat.example:9000\"\nuser_id = \"alice\"\n",
        );
        assert_eq!(settings.server_url, "http://chat.example:9000");
        assert_eq!(settings.user_id, "alice");
    }

    #[test]
    fn unreadable_file_config_leaves_defaults() {
        let mut settings = Settings::default();
        apply_file_config(&mut settings, "not valid toml [");
        assert_eq!(settings.server_url, Settings::default().server_url);
    }
}
