use std::env;
use tracing::warn;

pub const DEFAULT_MEETING_LINK_TYPE: &str = "google_meet";
pub const DEFAULT_CUSTOM_MEETING_BASE_URL: &str = "https://meet.medflow.com";
pub const DEFAULT_GOOGLE_API_BASE_URL: &str = "https://www.googleapis.com/calendar/v3";
pub const DEFAULT_GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub supabase_jwt_secret: String,
    pub meeting_link_type: String,
    pub custom_meeting_base_url: String,
    pub enable_custom_meeting_platform: bool,
    pub google_client_id: Option<String>,
    pub google_client_secret: Option<String>,
    pub google_refresh_token: Option<String>,
    pub google_service_account_key_file: Option<String>,
    pub google_calendar_id: String,
    pub google_api_base_url: String,
    pub google_token_url: String,
    pub port: u16,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            supabase_url: String::new(),
            supabase_anon_key: String::new(),
            supabase_jwt_secret: String::new(),
            meeting_link_type: DEFAULT_MEETING_LINK_TYPE.to_string(),
            custom_meeting_base_url: DEFAULT_CUSTOM_MEETING_BASE_URL.to_string(),
            enable_custom_meeting_platform: false,
            google_client_id: None,
            google_client_secret: None,
            google_refresh_token: None,
            google_service_account_key_file: None,
            google_calendar_id: "primary".to_string(),
            google_api_base_url: DEFAULT_GOOGLE_API_BASE_URL.to_string(),
            google_token_url: DEFAULT_GOOGLE_TOKEN_URL.to_string(),
            port: 3000,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let config = Self {
            supabase_url: env::var("SUPABASE_URL")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_URL not set, using empty value");
                    String::new()
                }),
            supabase_anon_key: env::var("SUPABASE_ANON_PUBLIC_KEY")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_ANON_PUBLIC_KEY not set, using empty value");
                    String::new()
                }),
            supabase_jwt_secret: env::var("SUPABASE_JWT_SECRET")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_JWT_SECRET not set, using empty value");
                    String::new()
                }),
            meeting_link_type: env::var("MEETING_LINK_TYPE")
                .unwrap_or_else(|_| DEFAULT_MEETING_LINK_TYPE.to_string()),
            custom_meeting_base_url: env::var("CUSTOM_MEETING_BASE_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or_else(|_| DEFAULT_CUSTOM_MEETING_BASE_URL.to_string()),
            enable_custom_meeting_platform: env::var("ENABLE_CUSTOM_MEETING_PLATFORM")
                .map(|value| value == "true")
                .unwrap_or(false),
            google_client_id: optional_var("GOOGLE_CLIENT_ID"),
            google_client_secret: optional_var("GOOGLE_CLIENT_SECRET"),
            google_refresh_token: optional_var("GOOGLE_REFRESH_TOKEN"),
            google_service_account_key_file: optional_var("GOOGLE_SERVICE_ACCOUNT_KEY_FILE"),
            google_calendar_id: env::var("GOOGLE_CALENDAR_ID")
                .unwrap_or_else(|_| "primary".to_string()),
            google_api_base_url: env::var("GOOGLE_API_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_GOOGLE_API_BASE_URL.to_string()),
            google_token_url: env::var("GOOGLE_TOKEN_URL")
                .unwrap_or_else(|_| DEFAULT_GOOGLE_TOKEN_URL.to_string()),
            port: env::var("PORT")
                .ok()
                .and_then(|port| port.parse().ok())
                .unwrap_or(3000),
        };

        if !config.is_configured() {
            warn!("Application not fully configured - missing environment variables");
        }

        if !config.is_google_calendar_configured() {
            warn!("Google Calendar credentials not set, calendar sync disabled");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        !self.supabase_url.is_empty()
            && !self.supabase_anon_key.is_empty()
            && !self.supabase_jwt_secret.is_empty()
    }

    /// Calendar sync needs either an OAuth client pair or a service account key file.
    pub fn is_google_calendar_configured(&self) -> bool {
        let has_oauth_client = self.google_client_id.is_some() && self.google_client_secret.is_some();
        has_oauth_client || self.google_service_account_key_file.is_some()
    }
}

fn optional_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_uses_google_meet() {
        let config = AppConfig::default();
        assert_eq!(config.meeting_link_type, "google_meet");
        assert_eq!(config.custom_meeting_base_url, "https://meet.medflow.com");
        assert!(!config.enable_custom_meeting_platform);
        assert!(!config.is_configured());
    }

    #[test]
    fn google_calendar_needs_client_pair_or_key_file() {
        let mut config = AppConfig::default();
        assert!(!config.is_google_calendar_configured());

        config.google_client_id = Some("client".to_string());
        assert!(!config.is_google_calendar_configured());

        config.google_client_secret = Some("secret".to_string());
        assert!(config.is_google_calendar_configured());

        let key_only = AppConfig {
            google_service_account_key_file: Some("/etc/medflow/key.json".to_string()),
            ..AppConfig::default()
        };
        assert!(key_only.is_google_calendar_configured());
    }
}
