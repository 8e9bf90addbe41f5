use std::sync::mpsc::Sender;

/// Where the receiver surfaces decoded text.
pub trait TextSink: Send + 'static {
    fn deliver(&mut self, text: &str);
}

/// Prints every payload on its own line.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleSink;

impl TextSink for ConsoleSink {
    fn deliver(&mut self, text: &str) {
        println!("{}", text);
    }
}

/// Forwards payloads to another thread; a dropped receiver is ignored.
impl TextSink for Sender<String> {
    fn deliver(&mut self, text: &str) {
        let _ = self.send(text.to_string());
    }
}
