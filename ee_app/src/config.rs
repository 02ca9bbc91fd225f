use std::path::{Path, PathBuf};
use std::str::FromStr;

use ee_lib::ee::memory::ram::RAM_SIZE;
use ee_lib::settings::CoreSettings;
use ini::{Ini, Properties};
use tracing::warn;

use crate::error::Result;

/// Default location of the guest image in memory, also used as the entry point
const DEFAULT_LOAD_ADDRESS: u32 = 0x0010_0000;

pub struct Config {
    /// Raw guest binary
    pub image: Option<PathBuf>,
    pub load_address: u32,
    pub entry: u32,
    /// Number of `run_to_branch` blocks to execute
    pub blocks: u64,
    /// Main RAM size in MB
    pub ram_size: usize,
    pub core: CoreSettings,
    /// Where to write a save state once the run is over
    pub save_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Config {
        Config {
            image: None,
            load_address: DEFAULT_LOAD_ADDRESS,
            entry: DEFAULT_LOAD_ADDRESS,
            blocks: 100_000,
            ram_size: 32,
            core: CoreSettings::default(),
            save_path: None,
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Config> {
        let ini = Ini::load_from_file(path)?;

        Ok(Config::from(&ini))
    }

    /// Main RAM size in bytes, `None` if the configured size can't be used
    pub fn ram_bytes(&self) -> Option<usize> {
        ram_bytes(self.ram_size)
    }
}

/// RAM sizes must be a power of two, up to four times the retail 32MB
fn ram_bytes(megabytes: usize) -> Option<usize> {
    megabytes
        .checked_mul(1024 * 1024)
        .filter(|&b| b.is_power_of_two() && b <= RAM_SIZE * 4)
}

impl From<&Ini> for Config {
    fn from(ini: &Ini) -> Self {
        let mut config = Config::default();

        if let Some(image) = ini.section(Some("Image")) {
            config.image = image.get("Path").map(PathBuf::from);
            config.load_address = hex(image, "Image", "LoadAddress", config.load_address);
            // The entry point follows the load address unless given explicitly
            config.entry = hex(image, "Image", "Entry", config.load_address);
        }

        if let Some(run) = ini.section(Some("Run")) {
            config.blocks = value(run, "Run", "Blocks", config.blocks);
            config.ram_size = value(run, "Run", "RamSize", config.ram_size);

            if ram_bytes(config.ram_size).is_none() {
                warn!("Invalid value for [Run] RamSize: {} MB", config.ram_size);
                config.ram_size = Config::default().ram_size;
            }
        }

        if let Some(core) = ini.section(Some("Core")) {
            config.core.log_bios_calls =
                boolean(core, "Core", "LogBiosCalls", config.core.log_bios_calls);
            config.core.sif_tag_budget =
                value(core, "Core", "SifTagBudget", config.core.sif_tag_budget);
        }

        if let Some(state) = ini.section(Some("State")) {
            config.save_path = state.get("SavePath").map(PathBuf::from);
        }

        config
    }
}

fn value<T: FromStr>(props: &Properties, section: &str, key: &str, default: T) -> T {
    match props.get(key) {
        Some(v) => match v.trim().parse() {
            Ok(v) => v,
            Err(_) => {
                warn!("Invalid value for [{}] {}: {}", section, key, v);
                default
            }
        },
        None => default,
    }
}

fn hex(props: &Properties, section: &str, key: &str, default: u32) -> u32 {
    match props.get(key) {
        Some(v) => {
            let digits = v.trim();
            let digits = digits
                .strip_prefix("0x")
                .or_else(|| digits.strip_prefix("0X"))
                .unwrap_or(digits);

            match u32::from_str_radix(digits, 16) {
                Ok(v) => v,
                Err(_) => {
                    warn!("Invalid address for [{}] {}: {}", section, key, v);
                    default
                }
            }
        }
        None => default,
    }
}

fn boolean(props: &Properties, section: &str, key: &str, default: bool) -> bool {
    match props.get(key).map(|v| v.trim().to_ascii_lowercase()) {
        Some(v) => match v.as_str() {
            "true" | "1" | "yes" | "on" => true,
            "false" | "0" | "no" | "off" => false,
            _ => {
                warn!("Invalid boolean for [{}] {}: {}", section, key, v);
                default
            }
        },
        None => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_config() {
        let ini = Ini::load_from_str(
            "[Image]\n\
             Path = guest.bin\n\
             LoadAddress = 0x80200000\n\
             Entry = 80200100\n\
             [Run]\n\
             Blocks = 50\n\
             RamSize = 4\n\
             [Core]\n\
             LogBiosCalls = false\n\
             SifTagBudget = 16\n\
             [State]\n\
             SavePath = out.state\n",
        )
        .unwrap();

        let config = Config::from(&ini);

        assert_eq!(config.image, Some(PathBuf::from("guest.bin")));
        assert_eq!(config.load_address, 0x8020_0000);
        assert_eq!(config.entry, 0x8020_0100);
        assert_eq!(config.blocks, 50);
        assert_eq!(config.ram_size, 4);
        assert!(!config.core.log_bios_calls);
        assert_eq!(config.core.sif_tag_budget, 16);
        assert_eq!(config.save_path, Some(PathBuf::from("out.state")));
    }

    #[test]
    fn bad_values_fall_back_to_defaults() {
        let ini = Ini::load_from_str(
            "[Image]\n\
             LoadAddress = 0x200000\n\
             [Run]\n\
             Blocks = lots\n\
             [Core]\n\
             LogBiosCalls = maybe\n",
        )
        .unwrap();

        let config = Config::from(&ini);

        assert_eq!(config.image, None);
        assert_eq!(config.entry, 0x20_0000);
        assert_eq!(config.blocks, Config::default().blocks);
        assert!(config.core.log_bios_calls);
    }

    #[test]
    fn unusable_ram_sizes_are_defaulted() {
        for size in ["18446744073709551615", "3", "0", "1024"] {
            let ini = Ini::load_from_str(&format!("[Run]\nRamSize = {}\n", size)).unwrap();
            let config = Config::from(&ini);

            assert_eq!(config.ram_size, Config::default().ram_size, "RamSize = {}", size);
            assert_eq!(config.ram_bytes(), Some(32 * 1024 * 1024));
        }

        let ini = Ini::load_from_str("[Run]\nRamSize = 64\n").unwrap();
        assert_eq!(Config::from(&ini).ram_bytes(), Some(64 * 1024 * 1024));
    }
}
