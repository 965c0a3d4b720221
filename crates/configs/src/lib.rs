use anyhow::Result;
use serde::Deserialize;
use anyhow::anyhow;

#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub admin: AdminConfig,
    #[serde(default)]
    pub mail: MailConfig,
    #[serde(default)]
    pub jobs: JobsConfig,
    #[serde(default)]
    pub cache: CacheConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub worker_threads: Option<usize>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { host: "127.0.0.1".into(), port: 5000, worker_threads: Some(4) }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct DatabaseConfig {
    #[serde(default)]
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,
    #[serde(default = "default_max_lifetime")]
    pub max_lifetime_secs: u64,
    #[serde(default = "default_acquire_timeout")]
    pub acquire_timeout_secs: u64,
    #[serde(default)]
    pub sqlx_logging: bool,
}

fn default_max_connections() -> u32 { 10 }
fn default_min_connections() -> u32 { 2 }
fn default_connect_timeout() -> u64 { 30 }
fn default_idle_timeout() -> u64 { 600 }
fn default_max_lifetime() -> u64 { 3600 }
fn default_acquire_timeout() -> u64 { 30 }

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    #[serde(default)]
    pub jwt_secret: String,
    #[serde(default = "default_access_ttl")]
    pub access_token_ttl_secs: i64,
    #[serde(default = "default_refresh_ttl")]
    pub refresh_token_ttl_secs: i64,
}

fn default_access_ttl() -> i64 { 60 * 60 }
fn default_refresh_ttl() -> i64 { 30 * 24 * 60 * 60 }

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: String::new(),
            access_token_ttl_secs: default_access_ttl(),
            refresh_token_ttl_secs: default_refresh_ttl(),
        }
    }
}

/// Seed account ensured at startup.
#[derive(Debug, Clone, Deserialize)]
pub struct AdminConfig {
    pub email: String,
    pub password: String,
    #[serde(default = "default_admin_name")]
    pub name: String,
}

fn default_admin_name() -> String { "Admin".into() }

impl Default for AdminConfig {
    fn default() -> Self {
        Self { email: "admin@fixrify.com".into(), password: "admin123".into(), name: default_admin_name() }
    }
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum MailProvider {
    /// Only log outgoing mail.
    #[default]
    Log,
    /// POST JSON to `api_url`.
    Http,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MailConfig {
    #[serde(default)]
    pub provider: MailProvider,
    #[serde(default)]
    pub api_url: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_sender")]
    pub from: String,
    #[serde(default = "default_test_recipient")]
    pub test_recipient: String,
    /// Per-request timeout for the mail API.
    #[serde(default = "default_mail_timeout")]
    pub timeout_secs: u64,
}

fn default_sender() -> String { "noreply@fixrify.com".into() }
fn default_test_recipient() -> String { "test@example.com".into() }
fn default_mail_timeout() -> u64 { 10 }

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            provider: MailProvider::Log,
            api_url: String::new(),
            api_key: String::new(),
            from: default_sender(),
            test_recipient: default_test_recipient(),
            timeout_secs: default_mail_timeout(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct JobsConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_daily_interval")]
    pub daily_reminder_interval_secs: u64,
    #[serde(default = "default_monthly_interval")]
    pub monthly_report_interval_secs: u64,
}

fn default_true() -> bool { true }
fn default_daily_interval() -> u64 { 24 * 60 * 60 }
fn default_monthly_interval() -> u64 { 30 * 24 * 60 * 60 }

impl Default for JobsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            daily_reminder_interval_secs: default_daily_interval(),
            monthly_report_interval_secs: default_monthly_interval(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_cache_ttl")]
    pub ttl_secs: u64,
}

fn default_cache_ttl() -> u64 { 300 }

impl Default for CacheConfig {
    fn default() -> Self { Self { ttl_secs: default_cache_ttl() } }
}

pub fn load_default() -> Result<AppConfig> {
    let path = std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
    load_from_file(&path)
}

pub fn load_from_file(path: &str) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path)?;
    let cfg: AppConfig = toml::from_str(&content)?;
    Ok(cfg)
}

impl AppConfig {
    /// Load `config.toml` (or `CONFIG_PATH`), falling back to defaults when the
    /// file is absent, then apply env overrides and validate.
    pub fn load_and_validate() -> Result<Self> {
        let mut cfg = match load_default() {
            Ok(cfg) => cfg,
            Err(e) if is_missing_file(&e) => AppConfig::default(),
            Err(e) => return Err(e),
        };
        cfg.normalize_and_validate()?;
        Ok(cfg)
    }

    pub fn normalize_and_validate(&mut self) -> Result<()> {
        self.server.normalize()?;
        self.database.normalize_from_env();
        self.database.validate()?;
        self.auth.normalize_from_env();
        self.auth.validate()?;
        self.admin.normalize_from_env();
        self.mail.normalize_from_env();
        self.mail.validate()?;
        self.jobs.validate()?;
        if self.cache.ttl_secs == 0 {
            return Err(anyhow!("cache.ttl_secs must be > 0"));
        }
        Ok(())
    }
}

fn is_missing_file(e: &anyhow::Error) -> bool {
    e.downcast_ref::<std::io::Error>()
        .map(|io| io.kind() == std::io::ErrorKind::NotFound)
        .unwrap_or(false)
}

fn env_non_empty(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

impl ServerConfig {
    fn normalize(&mut self) -> Result<()> {
        if self.host.trim().is_empty() {
            self.host = "127.0.0.1".to_string();
        }
        if self.port == 0 {
            return Err(anyhow!("server.port must be within 1..=65535"));
        }
        match self.worker_threads {
            Some(0) | None => self.worker_threads = Some(4),
            Some(_) => {}
        }
        Ok(())
    }
}

impl DatabaseConfig {
    pub fn normalize_from_env(&mut self) {
        if let Some(url) = env_non_empty("DATABASE_URL") {
            self.url = url;
        }
        if self.url.trim().is_empty() {
            self.url = "sqlite://fixrify.db?mode=rwc".to_string();
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.url.trim().is_empty() {
            return Err(anyhow!("database.url is empty; set it in config.toml or DATABASE_URL"));
        }
        let lower = self.url.to_lowercase();
        if !(lower.starts_with("postgresql://") || lower.starts_with("postgres://") || lower.starts_with("sqlite:")) {
            return Err(anyhow!("database.url must start with postgres://, postgresql:// or sqlite:"));
        }
        if self.min_connections == 0 {
            return Err(anyhow!("database.min_connections must be >= 1"));
        }
        if self.max_connections < self.min_connections {
            return Err(anyhow!("database.max_connections must be >= min_connections"));
        }
        if self.connect_timeout_secs == 0 || self.acquire_timeout_secs == 0 {
            return Err(anyhow!("database timeouts must be positive seconds"));
        }
        Ok(())
    }
}

impl AuthConfig {
    pub fn normalize_from_env(&mut self) {
        if let Some(secret) = env_non_empty("JWT_SECRET") {
            self.jwt_secret = secret;
        }
        if self.jwt_secret.trim().is_empty() {
            self.jwt_secret = "dev-secret-change-me".to_string();
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.access_token_ttl_secs <= 0 || self.refresh_token_ttl_secs <= 0 {
            return Err(anyhow!("auth token TTLs must be positive"));
        }
        if self.refresh_token_ttl_secs < self.access_token_ttl_secs {
            return Err(anyhow!("auth.refresh_token_ttl_secs must be >= access_token_ttl_secs"));
        }
        Ok(())
    }
}

impl AdminConfig {
    pub fn normalize_from_env(&mut self) {
        if let Some(email) = env_non_empty("ADMIN_EMAIL") {
            self.email = email;
        }
        if let Some(password) = env_non_empty("ADMIN_PASSWORD") {
            self.password = password;
        }
    }
}

impl MailConfig {
    pub fn normalize_from_env(&mut self) {
        if let Some(url) = env_non_empty("MAIL_API_URL") {
            self.api_url = url;
            self.provider = MailProvider::Http;
        }
        if let Some(key) = env_non_empty("MAIL_API_KEY") {
            self.api_key = key;
        }
        if let Some(from) = env_non_empty("MAIL_DEFAULT_SENDER") {
            self.from = from;
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.provider == MailProvider::Http
            && !(self.api_url.starts_with("http://") || self.api_url.starts_with("https://"))
        {
            return Err(anyhow!("mail.api_url must be an http(s) URL when provider = \"http\""));
        }
        if !self.from.contains('@') {
            return Err(anyhow!("mail.from must be an email address"));
        }
        if self.timeout_secs == 0 {
            return Err(anyhow!("mail.timeout_secs must be > 0"));
        }
        Ok(())
    }
}

impl JobsConfig {
    pub fn validate(&self) -> Result<()> {
        if self.daily_reminder_interval_secs == 0 || self.monthly_report_interval_secs == 0 {
            return Err(anyhow!("jobs intervals must be > 0"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_partial_toml_with_defaults() {
        let cfg: AppConfig = toml::from_str(
            r#"
            [server]
            host = "0.0.0.0"
            port = 8080

            [database]
            url = "postgres://u:p@localhost/fixrify"

            [jobs]
            enabled = false
            "#,
        )
        .unwrap();
        assert_eq!(cfg.server.port, 8080);
        assert_eq!(cfg.database.max_connections, 10);
        assert!(!cfg.jobs.enabled);
        assert_eq!(cfg.jobs.daily_reminder_interval_secs, 86_400);
        assert_eq!(cfg.auth.access_token_ttl_secs, 3_600);
        assert_eq!(cfg.cache.ttl_secs, 300);
        assert_eq!(cfg.mail.provider, MailProvider::Log);
    }

    #[test]
    fn database_url_scheme_is_checked() {
        let mut db = DatabaseConfig { url: "mysql://x".into(), min_connections: 1, max_connections: 2, connect_timeout_secs: 1, acquire_timeout_secs: 1, ..Default::default() };
        assert!(db.validate().is_err());
        db.url = "sqlite::memory:".into();
        assert!(db.validate().is_ok());
    }

    #[test]
    fn http_mail_requires_url() {
        let mail = MailConfig { provider: MailProvider::Http, ..Default::default() };
        assert!(mail.validate().is_err());
        let mail = MailConfig { provider: MailProvider::Http, api_url: "https://mail.example.com/send".into(), ..Default::default() };
        assert!(mail.validate().is_ok());
        assert_eq!(mail.timeout_secs, 10);
        assert!(MailConfig { timeout_secs: 0, ..mail }.validate().is_err());
    }

    #[test]
    fn refresh_ttl_must_outlive_access_ttl() {
        let auth = AuthConfig { jwt_secret: "s".into(), access_token_ttl_secs: 100, refresh_token_ttl_secs: 10 };
        assert!(auth.validate().is_err());
    }

    #[test]
    fn zero_port_rejected() {
        let mut s = ServerConfig { host: "".into(), port: 0, worker_threads: None };
        assert!(s.normalize().is_err());
        s.port = 80;
        s.normalize().unwrap();
        assert_eq!(s.host, "127.0.0.1");
        assert_eq!(s.worker_threads, Some(4));
    }
}
