//! Fire-and-forget warning channel for policy outcomes the compositor
//! swallows instead of raising, capacity rejections mostly. Hosts plug in
//! their own sink to surface toasts; the default just logs.

pub trait NotificationSink {
    fn warn(&mut self, message: &str);
}

/// Default sink forwarding warnings to the tracing pipeline.
#[derive(Debug, Default)]
pub struct LogNotifier;

impl NotificationSink for LogNotifier {
    fn warn(&mut self, message: &str) {
        tracing::warn!("overlay notification: {message}");
    }
}

/// Sink that queues messages for the host to drain and display, e.g. in a
/// status bar.
#[derive(Debug, Default)]
pub struct BufferedNotifier {
    messages: Vec<String>,
}

impl BufferedNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn take_messages(&mut self) -> Vec<String> {
        std::mem::take(&mut self.messages)
    }
}

impl NotificationSink for BufferedNotifier {
    fn warn(&mut self, message: &str) {
        self.messages.push(message.to_string());
    }
}

// Lets a host hand the manager a sink while keeping a handle to drain it.
impl<T: NotificationSink> NotificationSink for std::rc::Rc<std::cell::RefCell<T>> {
    fn warn(&mut self, message: &str) {
        self.borrow_mut().warn(message);
    }
}
