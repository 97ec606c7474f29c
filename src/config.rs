pub const DEFAULT_UPSTREAM_BASE_URL: &str = "https://api.api-ninjas.com";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    /// api-ninjas key. Optional at startup; its absence is reported per call
    /// so the rest of the API keeps working without it.
    pub api_ninjas_key: Option<String>,
    pub upstream_base_url: String,
    pub port: u16,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")
            .map_err(|_| anyhow::anyhow!("Missing DATABASE_URL in environment configuration."))?;
        let api_ninjas_key = std::env::var("API_NINJAS_KEY")
            .ok()
            .filter(|k| !k.is_empty());
        let upstream_base_url = std::env::var("UPSTREAM_BASE_URL")
            .unwrap_or_else(|_| DEFAULT_UPSTREAM_BASE_URL.into());
        let port = std::env::var("APP_PORT")
            .ok()
            .and_then(|v| v.parse::<u16>().ok())
            .unwrap_or(5001);
        Ok(Self {
            database_url,
            api_ninjas_key,
            upstream_base_url,
            port,
        })
    }
}
