use std::env::var_os;
use std::ffi::OsString;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use serde::{Serialize, Deserialize};

/// Which way the GPIO lines are reached.
#[derive(Serialize, Deserialize, Copy, Clone, Debug, Default, Eq, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum GpioBackend {
    /// Memory-mapped registers through `/dev/gpiomem`. Needs no root.
    #[default]
    Gpiomem,
    /// Memory-mapped registers through `/dev/mem`.
    Mem,
    /// The GPIO character device at [Config::gpiod_chip].
    Gpiod,
}

#[derive(Serialize, Deserialize, Clone, Debug, Eq, PartialEq)]
#[serde(default)]
pub struct Config {
    pub backend: GpioBackend,
    pub gpiod_chip: String,
}

impl Config {
    /// `CONFIG_FILE` if set, `config.json` otherwise.
    pub fn path() -> PathBuf {
        PathBuf::from(var_os("CONFIG_FILE").unwrap_or_else(|| OsString::from("config.json")))
    }

    /// Loads the config file, or returns `None` if there is none.
    pub fn try_load() -> eyre::Result<Option<Self>> {
        let path = Self::path();
        if path.exists() {
            Ok(Some(Self::load_from(&path)?))
        } else {
            Ok(None)
        }
    }

    pub fn load_from(path: &Path) -> eyre::Result<Self> {
        let reader = BufReader::new(File::open(path)?);
        Ok(serde_json::from_reader(reader)?)
    }

    pub fn save(&self) -> eyre::Result<()> {
        self.save_to(&Self::path())
    }

    pub fn save_to(&self, path: &Path) -> eyre::Result<()> {
        let writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            backend: GpioBackend::default(),
            gpiod_chip: "/dev/gpiochip0".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_take_defaults() {
        let config: Config = serde_json::from_str(r#"{ "backend": "gpiod" }"#).unwrap();

        assert_eq!(config.backend, GpioBackend::Gpiod);
        assert_eq!(config.gpiod_chip, "/dev/gpiochip0");

        let config: Config = serde_json::from_str("{}").unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn unknown_backend_is_rejected() {
        assert!(serde_json::from_str::<Config>(r#"{ "backend": "spi" }"#).is_err());
    }

    #[test]
    fn save_then_load() {
        let path = std::env::temp_dir().join(format!("pinpad-config-{}.json", std::process::id()));
        let config = Config {
            backend: GpioBackend::Mem,
            gpiod_chip: "/dev/gpiochip4".to_string(),
        };

        config.save_to(&path).unwrap();
        let loaded = Config::load_from(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(loaded, config);
    }
}
