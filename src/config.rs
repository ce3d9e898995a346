use std::{fs, path::Path};

use stratavox_world::WorldConfig;
use tracing::warn;

pub const DEFAULT_WORLD_CONFIG_PATH: &str = "config/world.toml";

/// Load world configuration, falling back to defaults on errors.
///
/// A missing file at the default path is expected and only noted; a missing
/// file at an explicit path, unreadable files and bad TOML are warned about.
pub fn load_world_config(path: &Path) -> WorldConfig {
    match fs::read_to_string(path) {
        Ok(contents) => match toml::from_str::<WorldConfig>(&contents) {
            Ok(cfg) => cfg,
            Err(err) => {
                warn!("Failed to parse {}: {err}. Using defaults", path.display());
                WorldConfig::default()
            }
        },
        Err(err) => {
            if path != Path::new(DEFAULT_WORLD_CONFIG_PATH)
                || err.kind() != std::io::ErrorKind::NotFound
            {
                warn!("Failed to read {}: {err}. Using defaults", path.display());
            } else {
                tracing::debug!(
                    "World config not found at {}. Using defaults",
                    path.display()
                );
            }
            WorldConfig::default()
        }
    }
}

/// Command line overrides applied on top of the file configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Overrides {
    pub seed: Option<u64>,
    pub radius: Option<i32>,
    pub workers: Option<usize>,
}

impl Overrides {
    pub fn apply(self, mut config: WorldConfig) -> WorldConfig {
        if let Some(seed) = self.seed {
            config.seed = seed;
        }
        if let Some(radius) = self.radius {
            config.load_radius = radius;
            config.unload_radius = config.unload_radius.max(radius);
            config.max_resident_chunks = config
                .max_resident_chunks
                .max(config.load_area_chunks());
        }
        if let Some(workers) = self.workers {
            config.worker_threads = workers;
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_path(name: &str) -> std::path::PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        std::env::temp_dir().join(format!("stratavox-{name}-{nanos}.toml"))
    }

    #[test]
    fn loads_partial_file_over_defaults() {
        let path = temp_path("partial");
        fs::write(&path, "seed = 99\nload_radius = 2\n").unwrap();
        let config = load_world_config(&path);
        assert_eq!(config.seed, 99);
        assert_eq!(config.load_radius, 2);
        assert_eq!(config.worker_threads, WorldConfig::default().worker_threads);
        fs::remove_file(&path).ok();
    }

    #[test]
    fn bad_toml_falls_back_to_defaults() {
        let path = temp_path("bad");
        fs::write(&path, "seed = \"not a number\"").unwrap();
        let config = load_world_config(&path);
        assert_eq!(config.seed, WorldConfig::default().seed);
        fs::remove_file(&path).ok();
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let config = load_world_config(&temp_path("missing"));
        assert_eq!(config.max_resident_chunks, WorldConfig::default().max_resident_chunks);
    }

    #[test]
    fn overrides_replace_file_values() {
        let base = WorldConfig {
            seed: 1,
            load_radius: 2,
            unload_radius: 3,
            ..WorldConfig::default()
        };
        let config = Overrides {
            seed: Some(7),
            radius: Some(5),
            workers: None,
        }
        .apply(base);
        assert_eq!(config.seed, 7);
        assert_eq!(config.load_radius, 5);
        assert_eq!(config.unload_radius, 5);
        assert_eq!(config.max_resident_chunks, WorldConfig::default().max_resident_chunks);
        config.validate().unwrap();
    }

    #[test]
    fn large_radius_override_grows_capacity() {
        let config = Overrides {
            radius: Some(10),
            ..Overrides::default()
        }
        .apply(WorldConfig::default());
        assert_eq!(config.max_resident_chunks, 21 * 21);
        config.validate().unwrap();
    }
}
