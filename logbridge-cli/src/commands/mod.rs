pub mod check;
pub mod emit;

use clap::Args;
use logbridge_core::config::options::{with_file_path, with_nr_app_name, with_nr_license, Config};
use logbridge_core::config::LogSettings;

/// Command-line values layered over the settings file
#[derive(Args, Debug, Default)]
pub struct Overrides {
    /// Log file path
    #[arg(long, global = true)]
    pub file_path: Option<String>,

    /// Remote telemetry application name
    #[arg(long, global = true)]
    pub nr_app: Option<String>,

    /// Remote telemetry license key
    #[arg(long, global = true)]
    pub nr_license: Option<String>,
}

impl Overrides {
    pub fn apply(self, settings: &mut LogSettings) {
        let opts = [
            self.file_path.map(with_file_path),
            self.nr_app.map(with_nr_app_name),
            self.nr_license.map(with_nr_license),
        ];
        settings.apply_options(&Config::new(opts.into_iter().flatten()));
    }
}
