use std::fs::File;
use std::io::{self, Write};
use std::path::Path;
use std::sync::{Arc, Mutex};

use tracing::Level;

pub struct DelegatingWriter {
    inner: DelegatingInner,
}

enum DelegatingInner {
    File(Arc<Mutex<File>>),
    Stderr(io::Stderr),
}

impl Write for DelegatingWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match &mut self.inner {
            DelegatingInner::File(file) => {
                let mut guard = file.lock().map_err(|_| io::Error::other("log file poisoned"))?;
                guard.write(buf)
            }
            DelegatingInner::Stderr(stderr) => stderr.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match &mut self.inner {
            DelegatingInner::File(file) => {
                let mut guard = file.lock().map_err(|_| io::Error::other("log file poisoned"))?;
                guard.flush()
            }
            DelegatingInner::Stderr(stderr) => stderr.flush(),
        }
    }
}

#[derive(Clone)]
pub struct SubscriberMakeWriter {
    file: Option<Arc<Mutex<File>>>,
}

impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for SubscriberMakeWriter {
    type Writer = DelegatingWriter;

    fn make_writer(&'a self) -> Self::Writer {
        let inner = match &self.file {
            Some(file) => DelegatingInner::File(Arc::clone(file)),
            None => DelegatingInner::Stderr(io::stderr()),
        };
        DelegatingWriter { inner }
    }
}

/// Initialize the tracing subscriber writing to stderr. Raw-mode hosts will
/// want [`init_file`] instead, since stderr shares the terminal with the UI.
/// Safe to call multiple times; subsequent calls are no-ops for the global
/// subscriber.
pub fn init_default() {
    init_with(SubscriberMakeWriter { file: None });
}

/// Initialize the tracing subscriber appending to a log file.
pub fn init_file(path: &Path) -> io::Result<()> {
    let file = File::options().create(true).append(true).open(path)?;
    init_with(SubscriberMakeWriter {
        file: Some(Arc::new(Mutex::new(file))),
    });
    Ok(())
}

fn init_with(writer: SubscriberMakeWriter) {
    let _ = tracing_subscriber::fmt()
        .with_max_level(Level::DEBUG)
        .with_writer(writer)
        .with_target(false)
        .with_thread_names(false)
        .try_init();
}
