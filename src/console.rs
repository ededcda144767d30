//! A [`JobSink`] printing results for the command line front end.

use log::{debug, warn};
use serde::Serialize;
use std::io::{self, Write};
use std::sync::{Mutex, PoisonError};

use crate::host::{InfoState, JobSink, Status};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
enum Line<'a> {
    Package {
        info: InfoState,
        package_id: &'a str,
        summary: &'a str,
    },
    Files {
        package_id: &'a str,
        files: &'a [String],
    },
}

pub struct ConsoleSink {
    format: OutputFormat,
    out: Mutex<Box<dyn Write + Send>>,
}

impl ConsoleSink {
    pub fn new(out: Box<dyn Write + Send>, format: OutputFormat) -> Self {
        Self {
            format,
            out: Mutex::new(out),
        }
    }

    pub fn stdout(format: OutputFormat) -> Self {
        Self::new(Box::new(io::stdout()), format)
    }

    fn write_lines(&self, lines: &[String]) {
        let mut out = self.out.lock().unwrap_or_else(PoisonError::into_inner);
        for line in lines {
            if let Err(e) = writeln!(out, "{}", line) {
                warn!("Failed to write output: {}", e);
                return;
            }
        }
        let _ = out.flush();
    }

    fn write_json(&self, line: &Line<'_>) {
        match serde_json::to_string(line) {
            Ok(json) => self.write_lines(&[json]),
            Err(e) => warn!("Failed to serialize output: {}", e),
        }
    }
}

impl JobSink for ConsoleSink {
    fn set_status(&self, status: Status) {
        debug!("status: {:?}", status);
    }

    fn set_percentage(&self, percentage: u32) {
        debug!("progress: {}%", percentage);
    }

    fn set_allow_cancel(&self, allow: bool) {
        debug!("allow cancel: {}", allow);
    }

    fn package(&self, info: InfoState, package_id: &str, summary: &str) {
        match self.format {
            OutputFormat::Text => {
                self.write_lines(&[format!("{}\t{}\t{}", info, package_id, summary)])
            }
            OutputFormat::Json => self.write_json(&Line::Package {
                info,
                package_id,
                summary,
            }),
        }
    }

    fn files(&self, package_id: &str, files: &[String]) {
        match self.format {
            OutputFormat::Text => {
                let lines: Vec<String> = files
                    .iter()
                    .map(|file| format!("{}\t{}", package_id, file))
                    .collect();
                self.write_lines(&lines);
            }
            OutputFormat::Json => self.write_json(&Line::Files { package_id, files }),
        }
    }

    fn finished(&self) {
        debug!("finished");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    /// Writer whose contents stay readable after being handed to the sink.
    #[derive(Clone, Default)]
    struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl SharedBuffer {
        fn contents(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    #[test]
    fn test_text_output() {
        let buffer = SharedBuffer::default();
        let sink = ConsoleSink::new(Box::new(buffer.clone()), OutputFormat::Text);

        sink.package(InfoState::Installed, "foo;1.0;x86_64;base", "The foo tool");
        sink.files("foo;1.0;x86_64;base", &["/usr/bin/foo".into(), "/etc/foo".into()]);

        assert_eq!(
            buffer.contents(),
            "installed\tfoo;1.0;x86_64;base\tThe foo tool\n\
             foo;1.0;x86_64;base\t/usr/bin/foo\n\
             foo;1.0;x86_64;base\t/etc/foo\n"
        );
    }

    #[test]
    fn test_json_output() {
        let buffer = SharedBuffer::default();
        let sink = ConsoleSink::new(Box::new(buffer.clone()), OutputFormat::Json);

        sink.package(InfoState::Installed, "foo;1.0;x86_64;base", "");
        sink.files("foo;1.0;x86_64;base", &["/usr/bin/foo".into()]);

        let lines: Vec<serde_json::Value> = buffer
            .contents()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();

        assert_eq!(lines[0]["type"], "package");
        assert_eq!(lines[0]["info"], "installed");
        assert_eq!(lines[0]["package_id"], "foo;1.0;x86_64;base");
        assert_eq!(lines[1]["type"], "files");
        assert_eq!(lines[1]["files"][0], "/usr/bin/foo");
    }

    #[test]
    fn test_status_produces_no_output() {
        let buffer = SharedBuffer::default();
        let sink = ConsoleSink::new(Box::new(buffer.clone()), OutputFormat::Text);

        sink.set_status(Status::Query);
        sink.set_percentage(50);
        sink.finished();

        assert!(buffer.contents().is_empty());
    }
}
