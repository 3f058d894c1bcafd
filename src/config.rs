use crate::registry::DEFAULT_ENTRY_MODE;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Load environment variables from a .env file.
/// Values may contain spaces and may be wrapped in single or double quotes.
///
/// Must be called while the process is still single-threaded.
pub fn load_dotenv() {
    load_dotenv_from(Path::new(".env"));
}

/// Same as [`load_dotenv`] for an explicit file.
pub fn load_dotenv_from(env_path: &Path) {
    let Ok(content) = fs::read_to_string(env_path) else {
        return;
    };

    for (key, value) in parse_dotenv(&content) {
        // Environment wins over the file
        if std::env::var(key).is_err() {
            // SAFETY: callers run this from a plain `fn main` before the tokio
            // runtime (or any other thread) is started
            unsafe { std::env::set_var(key, value) };
        }
    }
}

fn parse_dotenv(content: &str) -> Vec<(&str, &str)> {
    let mut pairs = Vec::new();
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let key = key.trim();
        let mut value = value.trim();
        if value.len() >= 2
            && ((value.starts_with('"') && value.ends_with('"'))
                || (value.starts_with('\'') && value.ends_with('\'')))
        {
            value = &value[1..value.len() - 1];
        }
        pairs.push((key, value));
    }
    pairs
}

/// Parse permission bits written in octal, with or without a leading `0o`/`0`.
pub fn parse_mode(raw: &str) -> Option<u32> {
    let digits = raw.trim().trim_start_matches("0o");
    u32::from_str_radix(digits, 8).ok().filter(|mode| *mode <= 0o7777)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub gpio: GpioConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub socket_path: PathBuf,
    pub socket_mode: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GpioConfig {
    /// Permission bits given to each registered pseudo-file.
    pub entry_mode: u32,
}

impl ServerConfig {
    /// Default socket location: the user runtime dir when there is one, else /tmp.
    pub fn default_socket_path() -> PathBuf {
        dirs::runtime_dir()
            .unwrap_or_else(|| PathBuf::from("/tmp"))
            .join("virtual-gpio.sock")
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                socket_path: ServerConfig::default_socket_path(),
                socket_mode: 0o666,
            },
            gpio: GpioConfig {
                entry_mode: DEFAULT_ENTRY_MODE,
            },
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(path) = std::env::var("GPIO_SOCKET_PATH") {
            config.server.socket_path = PathBuf::from(path);
        }
        if let Ok(mode) = std::env::var("GPIO_SOCKET_MODE")
            && let Some(m) = parse_mode(&mode)
        {
            config.server.socket_mode = m;
        }
        if let Ok(mode) = std::env::var("GPIO_ENTRY_MODE")
            && let Some(m) = parse_mode(&mode)
        {
            config.gpio.entry_mode = m;
        }

        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_dotenv() {
        let content = "\
# comment
GPIO_SOCKET_PATH = /run/gpio sim.sock

GPIO_SOCKET_MODE='660'
GPIO_ENTRY_MODE=\"644\"
not a pair
EMPTY=
";
        let pairs = parse_dotenv(content);
        assert_eq!(
            pairs,
            vec![
                ("GPIO_SOCKET_PATH", "/run/gpio sim.sock"),
                ("GPIO_SOCKET_MODE", "660"),
                ("GPIO_ENTRY_MODE", "644"),
                ("EMPTY", ""),
            ]
        );
    }

    #[test]
    fn test_parse_mode() {
        assert_eq!(parse_mode("666"), Some(0o666));
        assert_eq!(parse_mode("0644"), Some(0o644));
        assert_eq!(parse_mode("0o600"), Some(0o600));
        assert_eq!(parse_mode("rw"), None);
        assert_eq!(parse_mode("99"), None);
        assert_eq!(parse_mode("177777"), None);
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.server.socket_mode, 0o666);
        assert_eq!(config.gpio.entry_mode, 0o666);
        assert!(config.server.socket_path.ends_with("virtual-gpio.sock"));
    }

    #[test]
    fn test_load_dotenv_keeps_existing_values() {
        let path = std::env::temp_dir().join(format!("virtual-gpio-{}.env", uuid::Uuid::new_v4()));
        fs::write(
            &path,
            "VGPIO_TEST_DOTENV_NEW=from-file\nVGPIO_TEST_DOTENV_SET=from-file\n",
        )
        .unwrap();

        // SAFETY: the variable names are unique to this test
        unsafe { std::env::set_var("VGPIO_TEST_DOTENV_SET", "from-env") };
        load_dotenv_from(&path);
        let _ = fs::remove_file(&path);

        assert_eq!(std::env::var("VGPIO_TEST_DOTENV_NEW").unwrap(), "from-file");
        assert_eq!(std::env::var("VGPIO_TEST_DOTENV_SET").unwrap(), "from-env");
    }
}
