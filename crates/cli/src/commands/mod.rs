pub mod chat;
pub mod doctor;
pub mod inventory;
pub mod onboard;
pub mod search;

use pharmabot_config::AppConfig;

/// Load config, turning failures into a fatal, user-facing message.
pub fn load_config() -> Result<AppConfig, Box<dyn std::error::Error>> {
    AppConfig::load().map_err(|e| format!("Failed to load config: {e}").into())
}
