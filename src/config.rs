use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
    pub refresh_ttl_minutes: i64,
}

/// Connection settings for the meal recommendation model.
#[derive(Debug, Clone, Deserialize)]
pub struct LlmConfig {
    pub api_url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt: JwtConfig,
    pub llm: LlmConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")?;
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "glicocare".into()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "glicocare-users".into()),
            ttl_minutes: env_parse("JWT_TTL_MINUTES").unwrap_or(60),
            refresh_ttl_minutes: env_parse("JWT_REFRESH_TTL_MINUTES").unwrap_or(60 * 24 * 14),
        };
        let llm = LlmConfig {
            api_url: std::env::var("LLM_API_URL")
                .unwrap_or_else(|_| "https://api.openai.com/v1/chat/completions".into()),
            api_key: std::env::var("LLM_API_KEY").ok().filter(|k| !k.trim().is_empty()),
            model: std::env::var("LLM_MODEL").unwrap_or_else(|_| "gpt-4o-mini".into()),
            timeout_secs: env_parse("LLM_TIMEOUT_SECS").unwrap_or(30),
        };
        Ok(Self {
            database_url,
            jwt,
            llm,
        })
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse::<T>().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_parse_ignores_garbage() {
        std::env::set_var("GLICOCARE_TEST_NUM", "abc");
        assert_eq!(env_parse::<u64>("GLICOCARE_TEST_NUM"), None);
        std::env::set_var("GLICOCARE_TEST_NUM", " 42 ");
        assert_eq!(env_parse::<u64>("GLICOCARE_TEST_NUM"), Some(42));
        std::env::remove_var("GLICOCARE_TEST_NUM");
        assert_eq!(env_parse::<u64>("GLICOCARE_TEST_NUM"), None);
    }
}
