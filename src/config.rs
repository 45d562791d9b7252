use std::env;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub api_base: String,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            api_base: env::var("FINSIGHT_API_BASE")
                .unwrap_or_else(|_| "http://localhost:3000/api".to_string()),
        }
    }
}
