use serde::Deserialize;
use std::fs;
use std::path::Path;

#[derive(Deserialize, Debug, Clone, Default)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub from: String,
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct SmsConfig {
    pub api_url: String,
    pub api_key: String,
    pub api_secret: String,
    pub sender: String,
}

#[derive(Deserialize, Debug, Clone)]
pub struct PaymentConfig {
    pub api_url: String,
    pub api_secret: Option<String>,
    pub store_id: Option<String>,
    pub channel_key: Option<String>,
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct NewsCollectorConfig {
    pub naver_client_id: Option<String>,
    pub naver_client_secret: Option<String>,
    pub keywords: Vec<String>,
    /// 0 disables the in-process timer; the cron endpoint still works.
    pub interval_secs: u64,
}

#[derive(Deserialize, Debug, Clone)]
pub struct ServerConfig {
    pub database_url: String,
    pub database_name: String,
    pub jwt_secret: String,
    pub bind_address: String,
    pub frontend_url: String,
    pub log_dir: String,
    pub upload_dir: String,
    pub cron_secret: Option<String>,
    pub cookie_secure: bool,
    pub admin_email: Option<String>,
    pub admin_phone: Option<String>,
    pub smtp: Option<SmtpConfig>,
    pub sms: Option<SmsConfig>,
    pub payment: PaymentConfig,
    pub news: NewsCollectorConfig,
}

// Partial config for layering. Field names double as env var names (upper-cased by envy).
#[derive(Deserialize, Default, Debug)]
struct PartialServerConfig {
    database_url: Option<String>,
    database_name: Option<String>,
    jwt_secret: Option<String>,
    bind_address: Option<String>,
    frontend_url: Option<String>,
    log_dir: Option<String>,
    upload_dir: Option<String>,
    cron_secret: Option<String>,
    cookie_secure: Option<bool>,
    admin_email: Option<String>,
    admin_phone: Option<String>,

    smtp_host: Option<String>,
    smtp_port: Option<u16>,
    smtp_username: Option<String>,
    smtp_password: Option<String>,
    smtp_from: Option<String>,

    sms_api_url: Option<String>,
    sms_api_key: Option<String>,
    sms_api_secret: Option<String>,
    sms_sender: Option<String>,

    payment_api_url: Option<String>,
    payment_api_secret: Option<String>,
    payment_store_id: Option<String>,
    payment_channel_key: Option<String>,

    naver_client_id: Option<String>,
    naver_client_secret: Option<String>,
    news_keywords: Option<String>,
    news_collect_interval_secs: Option<u64>,
}

fn default_database_name() -> String {
    "academy".to_string()
}

fn default_bind_address() -> String {
    "0.0.0.0:3000".to_string()
}

fn default_frontend_url() -> String {
    "http://localhost:3000".to_string()
}

fn default_log_dir() -> String {
    "logs".to_string()
}

fn default_upload_dir() -> String {
    "uploads".to_string()
}

fn default_payment_api_url() -> String {
    "https://api.portone.io".to_string()
}

fn default_news_keywords() -> Vec<String> {
    vec![
        "코딩교육".to_string(),
        "로봇교육".to_string(),
        "어린이 코딩".to_string(),
    ]
}

fn split_keywords(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|k| k.trim())
        .filter(|k| !k.is_empty())
        .map(str::to_string)
        .collect()
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl ServerConfig {
    pub fn load(config_path: Option<&str>) -> Result<Self, String> {
        dotenv::dotenv().ok();

        // 1. Load from file (optional)
        let file_config: PartialServerConfig = if let Some(path_str) = config_path {
            let path = Path::new(path_str);
            if path.exists() {
                let contents = fs::read_to_string(path)
                    .map_err(|e| format!("Failed to read config file at {path:?}: {e}"))?;
                toml::from_str(&contents)
                    .map_err(|e| format!("Failed to parse TOML from config file at {path:?}: {e}"))?
            } else {
                PartialServerConfig::default()
            }
        } else {
            PartialServerConfig::default()
        };

        // 2. Load from environment variables
        let env_config: PartialServerConfig = envy::from_env::<PartialServerConfig>()
            .map_err(|e| format!("Failed to load config from environment: {e}"))?;

        // 3. Merge: environment overrides file
        Self::merge(env_config, file_config)
    }

    fn merge(env: PartialServerConfig, file: PartialServerConfig) -> Result<Self, String> {
        let smtp = match non_empty(env.smtp_host.or(file.smtp_host)) {
            Some(host) => Some(SmtpConfig {
                host,
                port: env.smtp_port.or(file.smtp_port).unwrap_or(587),
                username: non_empty(env.smtp_username.or(file.smtp_username)),
                password: non_empty(env.smtp_password.or(file.smtp_password)),
                from: env
                    .smtp_from
                    .or(file.smtp_from)
                    .ok_or("SMTP_FROM is required when SMTP_HOST is set")?,
            }),
            None => None,
        };

        let sms_api_key = non_empty(env.sms_api_key.or(file.sms_api_key));
        let sms = match (non_empty(env.sms_api_url.or(file.sms_api_url)), sms_api_key) {
            (Some(api_url), Some(api_key)) => Some(SmsConfig {
                api_url,
                api_key,
                api_secret: env.sms_api_secret.or(file.sms_api_secret).unwrap_or_default(),
                sender: env
                    .sms_sender
                    .or(file.sms_sender)
                    .ok_or("SMS_SENDER is required when the SMS gateway is configured")?,
            }),
            _ => None,
        };

        let keywords = env
            .news_keywords
            .or(file.news_keywords)
            .map(|raw| split_keywords(&raw))
            .filter(|k| !k.is_empty())
            .unwrap_or_else(default_news_keywords);

        Ok(ServerConfig {
            database_url: env
                .database_url
                .or(file.database_url)
                .ok_or("DATABASE_URL is required")?,
            database_name: env
                .database_name
                .or(file.database_name)
                .unwrap_or_else(default_database_name),
            jwt_secret: non_empty(env.jwt_secret.or(file.jwt_secret))
                .ok_or("JWT_SECRET is required")?,
            bind_address: env
                .bind_address
                .or(file.bind_address)
                .unwrap_or_else(default_bind_address),
            frontend_url: env
                .frontend_url
                .or(file.frontend_url)
                .unwrap_or_else(default_frontend_url),
            log_dir: env.log_dir.or(file.log_dir).unwrap_or_else(default_log_dir),
            upload_dir: env
                .upload_dir
                .or(file.upload_dir)
                .unwrap_or_else(default_upload_dir),
            cron_secret: non_empty(env.cron_secret.or(file.cron_secret)),
            cookie_secure: env.cookie_secure.or(file.cookie_secure).unwrap_or(true),
            admin_email: non_empty(env.admin_email.or(file.admin_email)),
            admin_phone: non_empty(env.admin_phone.or(file.admin_phone)),
            smtp,
            sms,
            payment: PaymentConfig {
                api_url: env
                    .payment_api_url
                    .or(file.payment_api_url)
                    .unwrap_or_else(default_payment_api_url),
                api_secret: non_empty(env.payment_api_secret.or(file.payment_api_secret)),
                store_id: non_empty(env.payment_store_id.or(file.payment_store_id)),
                channel_key: non_empty(env.payment_channel_key.or(file.payment_channel_key)),
            },
            news: NewsCollectorConfig {
                naver_client_id: non_empty(env.naver_client_id.or(file.naver_client_id)),
                naver_client_secret: non_empty(
                    env.naver_client_secret.or(file.naver_client_secret),
                ),
                keywords,
                interval_secs: env
                    .news_collect_interval_secs
                    .or(file.news_collect_interval_secs)
                    .unwrap_or(0),
            },
        })
    }

    /// Minimal config for tests and tooling.
    pub fn for_tests(database_url: &str, jwt_secret: &str) -> Self {
        let env = PartialServerConfig {
            database_url: Some(database_url.to_string()),
            jwt_secret: Some(jwt_secret.to_string()),
            cookie_secure: Some(false),
            ..Default::default()
        };
        Self::merge(env, PartialServerConfig::default())
            .expect("database_url and jwt_secret are always set here")
    }
}
