//! Option functions for code-only setups
//!
//! ```ignore
//! let config = Config::new([with_nr_app_name("billing"), with_file_size(50)]);
//! let sink = FileSink::new(Level::Info, &config.file);
//! ```

use crate::sink::{FileConfig, RemoteConfig};

/// Settings shared by the sink constructors
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Config {
    pub nr: RemoteConfig,
    pub file: FileConfig,
}

/// One deferred change to a [`Config`]
pub type ConfigOpt = Box<dyn FnOnce(&mut Config)>;

impl Config {
    /// Start from empty values and apply `opts` in order.
    pub fn new(opts: impl IntoIterator<Item = ConfigOpt>) -> Self {
        let mut config = Config::default();
        for opt in opts {
            opt(&mut config);
        }
        config
    }
}

pub fn with_nr_app_name(name: impl Into<String>) -> ConfigOpt {
    let name = name.into();
    Box::new(move |c| c.nr.app = name)
}

pub fn with_nr_license(license: impl Into<String>) -> ConfigOpt {
    let license = license.into();
    Box::new(move |c| c.nr.license = license)
}

/// Target file, parent directories are created on first write.
pub fn with_file_path(path: impl Into<String>) -> ConfigOpt {
    let path = path.into();
    Box::new(move |c| c.file.path = path)
}

/// Size in megabytes before rotation.
pub fn with_file_size(size: u64) -> ConfigOpt {
    Box::new(move |c| c.file.size = size)
}

/// Days to keep rotated files.
pub fn with_file_age(age: u32) -> ConfigOpt {
    Box::new(move |c| c.file.age = age)
}

/// Rotated files to keep.
pub fn with_file_max_backup(max: u32) -> ConfigOpt {
    Box::new(move |c| c.file.num = max)
}
