use serde::Deserialize;
use std::env;
use std::fs;
use std::path::PathBuf;

pub const DEFAULT_IMAGE_URL: &str = "https://images.unsplash.com/photo-1682687220742-aba19b51f9a8";
pub const DEFAULT_VIDEO_URL: &str = "https://videos.sumup.example/placeholder/generated.mp4";
pub const DEFAULT_AUDIO_URL: &str = "https://audio.sumup.example/placeholder/narration.mp3";
pub const DEFAULT_SIGN_URL: &str = "https://videos.sumup.example/placeholder/sign-language.mp4";

#[derive(Debug, Default)]
pub struct Config {
    pub debug: Option<bool>,
    pub database_url: Option<String>,
    pub data: Option<DataDirConfig>,
    pub mock: MockConfig,
    pub auth: AuthConfig,
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct DataDirConfig {
    pub directory: Option<String>,
}

#[derive(Debug, Clone)]
pub struct MockConfig {
    pub delay_ms: u64,
    pub image_url: String,
    pub video_url: String,
    pub audio_url: String,
    pub sign_url: String,
}

impl Default for MockConfig {
    fn default() -> Self {
        MockConfig {
            delay_ms: 2000,
            image_url: DEFAULT_IMAGE_URL.to_string(),
            video_url: DEFAULT_VIDEO_URL.to_string(),
            audio_url: DEFAULT_AUDIO_URL.to_string(),
            sign_url: DEFAULT_SIGN_URL.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub client_id: Option<String>,
    pub starting_credits: u32,
}

impl Default for AuthConfig {
    fn default() -> Self {
        AuthConfig { client_id: None, starting_credits: 100 }
    }
}

/// Raw shape of a config file; every field optional so files only override what they name.
#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
struct PartialConfig {
    debug: Option<bool>,
    database_url: Option<String>,
    data: Option<DataDirConfig>,
    mock: Option<PartialMock>,
    auth: Option<PartialAuth>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
struct PartialMock {
    delay_ms: Option<u64>,
    image_url: Option<String>,
    video_url: Option<String>,
    audio_url: Option<String>,
    sign_url: Option<String>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
struct PartialAuth {
    client_id: Option<String>,
    starting_credits: Option<u32>,
}

impl Config {
    pub fn load() -> Self {
        let mut cfg = Self::load_from_files();

        if let Some(debug_env) = env::var("SUMUP_DEBUG").ok().and_then(|s| s.parse::<bool>().ok()) {
            cfg.debug = Some(debug_env);
        }
        if let Ok(url) = env::var("SUMUP_DATABASE_URL") {
            if !url.is_empty() {
                cfg.database_url = Some(url);
            }
        }
        if let Some(delay) = env::var("SUMUP_MOCK_DELAY_MS").ok().and_then(|s| s.parse::<u64>().ok()) {
            cfg.mock.delay_ms = delay;
        }

        cfg
    }

    fn load_from_files() -> Self {
        let mut config = Config::default();

        let config_paths = [
            dirs::home_dir().map(|p| p.join(".sumup.json")),
            dirs::config_dir().map(|p| p.join("sumup/.sumup.json")),
            Some(PathBuf::from("./.sumup.json")),
        ];

        // Later paths win, so the working directory overrides the home directory.
        for path in config_paths.iter().flatten() {
            if !path.exists() {
                continue;
            }
            log::debug!("Attempting to load config from: {:?}", path);
            match fs::read_to_string(path) {
                Ok(content) => match serde_json::from_str::<PartialConfig>(&content) {
                    Ok(partial) => {
                        config.merge(partial);
                        log::info!("Successfully loaded and merged config from: {:?}", path);
                    }
                    Err(e) => log::warn!("Failed to parse config file at {:?}: {}", path, e),
                },
                Err(e) => log::warn!("Failed to read config file at {:?}: {}", path, e),
            }
        }
        config
    }

    fn merge(&mut self, loaded: PartialConfig) {
        if loaded.debug.is_some() { self.debug = loaded.debug; }
        if let Some(url) = loaded.database_url.filter(|u| !u.is_empty()) {
            self.database_url = Some(url);
        }
        if let Some(dir) = loaded.data.and_then(|d| d.directory).filter(|d| !d.is_empty()) {
            self.data.get_or_insert_with(Default::default).directory = Some(dir);
        }
        if let Some(mock) = loaded.mock {
            if let Some(v) = mock.delay_ms { self.mock.delay_ms = v; }
            if let Some(v) = mock.image_url { self.mock.image_url = v; }
            if let Some(v) = mock.video_url { self.mock.video_url = v; }
            if let Some(v) = mock.audio_url { self.mock.audio_url = v; }
            if let Some(v) = mock.sign_url { self.mock.sign_url = v; }
        }
        if let Some(auth) = loaded.auth {
            if auth.client_id.is_some() { self.auth.client_id = auth.client_id; }
            if let Some(v) = auth.starting_credits { self.auth.starting_credits = v; }
        }
    }

    pub fn data_directory(&self) -> PathBuf {
        match self.data.as_ref().and_then(|d| d.directory.as_ref()) {
            Some(dir) => PathBuf::from(dir),
            None => dirs::data_local_dir()
                .map(|p| p.join("sumup"))
                .unwrap_or_else(|| PathBuf::from(".sumup")),
        }
    }

    /// Store location; relative to the data directory unless configured explicitly.
    pub fn database_url(&self) -> String {
        match &self.database_url {
            Some(url) => url.clone(),
            None => format!("sqlite:{}", self.data_directory().join("sumup.db").display()),
        }
    }

    pub fn debug_enabled(&self) -> bool {
        self.debug.unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn later_files_override_earlier_ones() {
        let mut config = Config::default();
        config.merge(serde_json::from_str(r#"{"debug": true, "mock": {"delayMs": 500}}"#).unwrap());
        config.merge(serde_json::from_str(r#"{"mock": {"imageUrl": "https://cdn.test/i.png"}, "auth": {"startingCredits": 40}}"#).unwrap());

        assert_eq!(config.debug, Some(true));
        assert_eq!(config.mock.delay_ms, 500);
        assert_eq!(config.mock.image_url, "https://cdn.test/i.png");
        assert_eq!(config.mock.video_url, DEFAULT_VIDEO_URL);
        assert_eq!(config.auth.starting_credits, 40);
    }

    #[test]
    fn database_url_defaults_under_data_directory() {
        let mut config = Config::default();
        config.merge(serde_json::from_str(r#"{"data": {"directory": "/tmp/sumup-test"}}"#).unwrap());
        assert_eq!(config.database_url(), "sqlite:/tmp/sumup-test/sumup.db");

        config.merge(serde_json::from_str(r#"{"databaseUrl": "sqlite::memory:"}"#).unwrap());
        assert_eq!(config.database_url(), "sqlite::memory:");
    }

    #[test]
    fn empty_values_do_not_override() {
        let mut config = Config::default();
        config.merge(serde_json::from_str(r#"{"databaseUrl": "", "data": {"directory": ""}}"#).unwrap());
        assert!(config.database_url.is_none());
        assert!(config.data.is_none());
    }
}
