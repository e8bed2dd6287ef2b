use std::env;

use crate::error::PortalError;

/// Top-level remote folders that define the scope of every search.
pub const CATEGORIES: &[&str] = &["Gammes operatoires", "Procedures maintenance", "REX"];

/// Process-wide configuration, read once at startup and immutable thereafter.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub github_owner: String,
    pub repo_name: String,
    pub branch: String,
    pub github_token: Option<String>,
    pub secret_key: String,
    pub admin_password: String,
    pub tech_password: String,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, PortalError> {
        let host = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = env::var("PORT")
            .unwrap_or_else(|_| "5000".to_string())
            .parse::<u16>()
            .map_err(|e| PortalError::Config(format!("invalid PORT: {}", e)))?;

        let github_owner =
            env::var("GITHUB_OWNER").unwrap_or_else(|_| "LAKRADHicham".to_string());
        let repo_name = env::var("REPO_NAME").unwrap_or_else(|_| "Documentation".to_string());
        let branch = env::var("BRANCH").unwrap_or_else(|_| "main".to_string());
        let github_token = env::var("GITHUB_TOKEN").ok().filter(|t| !t.is_empty());

        let secret_key = env::var("SECRET_KEY")
            .unwrap_or_else(|_| "votre_cle_secrete_complexe_ici".to_string());

        let admin_password = env::var("ADMIN_PASSWORD").unwrap_or_else(|_| "admin123".to_string());
        let tech_password = env::var("TECH_PASSWORD").unwrap_or_else(|_| "tech123".to_string());

        Ok(Self {
            host,
            port,
            github_owner,
            repo_name,
            branch,
            github_token,
            secret_key,
            admin_password,
            tech_password,
        })
    }
}
