use anyhow::Result;
use logbridge_core::config::LogSettings;
use logbridge_core::sink::Output;
use logbridge_core::Level;

/// One line per configured output, in build order.
fn describe(settings: &LogSettings) -> Result<Vec<String>> {
    settings.validate()?;
    let log = &settings.log;

    let mut lines = vec![format!(
        "backend={} init_timeout={:?} flush_timeout={:?}",
        log.backend,
        settings.init_timeout(),
        settings.flush_timeout()
    )];
    for output in settings.outputs()? {
        let line = match output {
            Output::Console => {
                format!("console level={}", Level::parse_or_debug(&log.console.level))
            }
            Output::File => {
                let policy = log.file.rotation.resolve(log.file.defaults.defaults());
                format!(
                    "file level={} path={} size={}MB age={}d backups={}",
                    Level::parse_or_debug(&log.file.level),
                    policy.path.display(),
                    policy.max_size_mb(),
                    policy.max_age_days,
                    policy.max_backups
                )
            }
            Output::Remote => {
                let credential = match log.newrelic.remote.validate() {
                    Ok(()) => "ok".to_string(),
                    Err(e) => e.to_string(),
                };
                format!(
                    "newrelic level={} app={} credential={}",
                    Level::parse_or_debug(&log.newrelic.level),
                    log.newrelic.remote.app,
                    credential
                )
            }
        };
        lines.push(line);
    }
    Ok(lines)
}

/// Print the resolved settings without building any sink.
pub fn run(settings: &LogSettings) -> Result<()> {
    for line in describe(settings)? {
        println!("{}", line);
    }
    Ok(())
}
