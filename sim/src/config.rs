use gridsnake_engine::simulation::SimulationConfig;
use std::fs;

/// Load simulation configuration from config.toml, with defaults if not found or invalid
pub fn load_config() -> SimulationConfig {
    let default_config = SimulationConfig::default();
    if let Ok(contents) = fs::read_to_string("config.toml") {
        match toml::from_str(&contents) {
            Ok(loaded) => {
                tracing::info!("Config loaded successfully from config.toml");
                loaded
            }
            Err(e) => {
                tracing::warn!("Failed to parse config.toml: {}, using defaults", e);
                default_config
            }
        }
    } else {
        tracing::info!("config.toml not found, using defaults");
        default_config
    }
}

/// Save simulation configuration to config.toml
pub fn save_config(config: &SimulationConfig) {
    if let Ok(toml_str) = toml::to_string(config) {
        let _ = fs::write("config.toml", toml_str);
    }
}
