//! Logger setup: `env_logger` with millisecond timestamps, optionally
//! mirrored into a log file

use crate::config::LoggingConfig;
use env_logger::{Builder, Env, Target};
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};

/// Console and/or file sink for formatted log lines
struct LogWriter {
    console: bool,
    file: Option<File>,
}

impl Write for LogWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.console {
            io::stderr().write_all(buf)?;
        }
        if let Some(file) = self.file.as_mut() {
            file.write_all(buf)?;
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        if self.console {
            io::stderr().flush()?;
        }
        if let Some(file) = self.file.as_mut() {
            file.flush()?;
        }
        Ok(())
    }
}

/// Initialise the global logger. `RUST_LOG` wins over `config.level`.
pub fn init(config: &LoggingConfig) -> io::Result<()> {
    let file = match &config.file {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)?;
            }
            Some(OpenOptions::new().create(true).append(true).open(path)?)
        }
        None => None,
    };

    let writer = LogWriter {
        console: config.console,
        file,
    };

    Builder::from_env(Env::default().default_filter_or(config.level.as_str()))
        .format(|buf, record| {
            writeln!(
                buf,
                "{} - {} - {}",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S,%3f"),
                record.level(),
                record.args()
            )
        })
        .target(Target::Pipe(Box::new(writer)))
        .try_init()
        .map_err(|e| io::Error::new(io::ErrorKind::AlreadyExists, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_writer_mirrors_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("monitoring.log");
        let mut writer = LogWriter {
            console: false,
            file: Some(File::create(&path).unwrap()),
        };

        writer.write_all(b"2026-01-01 00:00:00,000 - INFO - hello\n").unwrap();
        writer.flush().unwrap();

        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "2026-01-01 00:00:00,000 - INFO - hello\n"
        );
    }
}
