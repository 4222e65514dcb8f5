use std::{fmt, fs::OpenOptions, path::PathBuf};

use serde::Deserialize;
use tracing_subscriber::{filter::LevelFilter, prelude::*};

use crate::prelude::*;


#[derive(Debug, confique::Config)]
pub(crate) struct LogConfig {
    /// Minimum level of messages to emit. One of "off", "error", "warn",
    /// "info", "debug" or "trace".
    #[config(default = "info")]
    pub(crate) level: Level,

    /// If this is set, log messages are also appended to this file.
    pub(crate) file: Option<PathBuf>,

    /// If this is set to `false`, log messages are not written to stdout.
    #[config(default = true)]
    pub(crate) stdout: bool,
}

#[derive(Clone, Copy, Deserialize)]
#[serde(try_from = "String")]
pub(crate) struct Level(pub(crate) LevelFilter);

impl TryFrom<String> for Level {
    type Error = String;
    fn try_from(value: String) -> Result<Self, Self::Error> {
        let filter = match value.as_str() {
            "off" => LevelFilter::OFF,
            "error" => LevelFilter::ERROR,
            "warn" => LevelFilter::WARN,
            "info" => LevelFilter::INFO,
            "debug" => LevelFilter::DEBUG,
            "trace" => LevelFilter::TRACE,
            other => return Err(format!("invalid log level '{other}'")),
        };
        Ok(Self(filter))
    }
}

impl fmt::Debug for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Installs our logger globally. Must only be called once!
pub(crate) fn init(config: &LogConfig) -> Result<()> {
    let stdout_output = config.stdout.then(|| {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stdout)
    });

    let file_output = config.file.as_ref()
        .map(|path| -> Result<_> {
            let file = OpenOptions::new()
                .append(true)
                .create(true)
                .open(path)
                .with_context(|| format!("failed to open/create log file '{}'", path.display()))?;

            Ok(tracing_subscriber::fmt::layer().with_writer(file).with_ansi(false))
        })
        .transpose()?;

    tracing_subscriber::registry()
        .with(config.level.0)
        .with(file_output)
        .with(stdout_output)
        .init();

    Ok(())
}


#[cfg(test)]
mod tests {
    use super::Level;

    #[test]
    fn level_parse() {
        for valid in ["off", "error", "warn", "info", "debug", "trace"] {
            Level::try_from(valid.to_owned()).unwrap();
        }

        for invalid in ["", "verbose", "INFO", "warning"] {
            Level::try_from(invalid.to_owned()).unwrap_err();
        }
    }
}
