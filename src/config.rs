use clap::Parser;
use serde::Deserialize;
use std::path::PathBuf;

/// Longest admin session a config may ask for: one year.
pub const MAX_SESSION_HOURS: u64 = 24 * 365;

#[derive(Parser, Debug)]
#[command(name = "qrshare", about = "QR campaign sharing server")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Host to bind to
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Path to data directory
    #[arg(long)]
    pub data_dir: Option<PathBuf>,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub storage: StorageConfig,
    pub auth: AuthConfig,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Absolute base URL used for image links and QR landing links.
    /// When unset, image URLs are relative and QR links use the LAN address.
    pub public_url: Option<String>,
    pub cors_origin: String,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: Option<PathBuf>,
}

/// Root directory holding one folder per campaign.
#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct StorageConfig {
    pub path: Option<PathBuf>,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct AuthConfig {
    pub admin_username: String,
    /// bcrypt hash of the admin password. Admin login is disabled while unset.
    pub admin_password_hash: Option<String>,
    pub session_hours: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 4000,
            public_url: None,
            cors_origin: "*".to_string(),
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            admin_username: "admin".to_string(),
            admin_password_hash: None,
            session_hours: 12,
        }
    }
}

impl Config {
    pub fn load(cli: &Cli) -> anyhow::Result<Self> {
        let data_dir = Self::data_dir(cli)?;
        let config_path = cli
            .config
            .clone()
            .unwrap_or_else(|| data_dir.join("config.toml"));

        let mut config = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            toml::from_str(&content)?
        } else {
            Config::default()
        };

        // CLI overrides
        if let Some(ref host) = cli.host {
            config.server.host = host.clone();
        }
        if let Some(port) = cli.port {
            config.server.port = port;
        }

        // Resolve paths relative to data dir
        if config.database.path.is_none() {
            config.database.path = Some(data_dir.join("qrshare.db"));
        }
        if config.storage.path.is_none() {
            config.storage.path = Some(data_dir.join("campaigns"));
        }

        let hours = config.auth.session_hours;
        if hours == 0 || hours > MAX_SESSION_HOURS {
            anyhow::bail!(
                "auth.session_hours must be between 1 and {}, got {}",
                MAX_SESSION_HOURS,
                hours
            );
        }

        Ok(config)
    }

    pub fn data_dir(cli: &Cli) -> anyhow::Result<PathBuf> {
        match cli.data_dir.clone() {
            Some(dir) => Ok(dir),
            None => dirs::home_dir()
                .map(|home| home.join(".qrshare"))
                .ok_or_else(|| anyhow::anyhow!("Could not determine home directory")),
        }
    }

    pub fn db_path(&self) -> PathBuf {
        self.database
            .path
            .clone()
            .unwrap_or_else(|| PathBuf::from("qrshare.db"))
    }

    pub fn campaigns_path(&self) -> PathBuf {
        self.storage
            .path
            .clone()
            .unwrap_or_else(|| PathBuf::from("campaigns"))
    }

    /// Base for absolute links, without a trailing slash.
    pub fn public_base(&self) -> Option<&str> {
        self.server
            .public_url
            .as_deref()
            .map(|url| url.trim_end_matches('/'))
            .filter(|url| !url.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cli_with(data_dir: Option<PathBuf>) -> Cli {
        Cli {
            config: None,
            host: None,
            port: None,
            data_dir,
        }
    }

    #[test]
    fn default_config_has_expected_values() {
        let config = Config::default();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 4000);
        assert_eq!(config.server.cors_origin, "*");
        assert_eq!(config.auth.admin_username, "admin");
        assert!(config.auth.admin_password_hash.is_none());
        assert_eq!(config.auth.session_hours, 12);
        assert!(config.database.path.is_none());
        assert!(config.storage.path.is_none());
    }

    #[test]
    fn data_dir_uses_cli_override() {
        let cli = cli_with(Some(PathBuf::from("/tmp/test-qrshare")));
        assert_eq!(
            Config::data_dir(&cli).unwrap(),
            PathBuf::from("/tmp/test-qrshare")
        );
    }

    #[test]
    fn data_dir_defaults_to_home_dot_qrshare() {
        let dir = Config::data_dir(&cli_with(None)).unwrap();
        assert!(dir.ends_with(".qrshare"));
    }

    #[test]
    fn load_with_no_config_file_uses_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        let config = Config::load(&cli_with(Some(tmp.path().to_path_buf()))).unwrap();
        assert_eq!(config.server.port, 4000);
        assert_eq!(config.db_path(), tmp.path().join("qrshare.db"));
        assert_eq!(config.campaigns_path(), tmp.path().join("campaigns"));
        assert!(config.public_base().is_none());
    }

    #[test]
    fn load_reads_toml_file_and_cli_overrides_win() {
        let tmp = tempfile::tempdir().unwrap();
        let config_path = tmp.path().join("config.toml");
        std::fs::write(
            &config_path,
            r#"
[server]
host = "192.168.1.1"
port = 9000
public_url = "https://share.example.com/"

[auth]
admin_username = "owner"
session_hours = 2
"#,
        )
        .unwrap();

        let cli = Cli {
            config: Some(config_path),
            host: None,
            port: Some(4100),
            data_dir: Some(tmp.path().to_path_buf()),
        };
        let config = Config::load(&cli).unwrap();
        assert_eq!(config.server.host, "192.168.1.1");
        assert_eq!(config.server.port, 4100);
        assert_eq!(config.public_base(), Some("https://share.example.com"));
        assert_eq!(config.auth.admin_username, "owner");
        assert_eq!(config.auth.session_hours, 2);
    }

    #[test]
    fn load_rejects_out_of_range_session_hours() {
        for hours in ["0", "10000000000"] {
            let tmp = tempfile::tempdir().unwrap();
            let config_path = tmp.path().join("config.toml");
            std::fs::write(&config_path, format!("[auth]\nsession_hours = {}\n", hours)).unwrap();

            let cli = Cli {
                config: Some(config_path),
                host: None,
                port: None,
                data_dir: Some(tmp.path().to_path_buf()),
            };
            let err = Config::load(&cli).unwrap_err();
            assert!(err.to_string().contains("session_hours"));
        }
    }
}
