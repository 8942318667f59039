//! Line-buffered output capture.
//!
//! Engine sessions stream bytes into two [`StreamWriter`]s (stdout and
//! stderr).  The writer buffers until a newline and invokes a callback per
//! complete line; [`StreamWriter::flush_lines`] emits any trailing partial
//! line.  Because every tool call constructs its own pair of writers, workers
//! running tool calls in parallel never contend on a shared stream.

use std::io::Write;

/// Callback invoked once per complete output line (without the trailing
/// newline).
pub type LineCallback = Box<dyn FnMut(&str) + Send>;

/// A writer that buffers bytes and emits them line by line.
pub struct StreamWriter {
    buf: Vec<u8>,
    on_line: LineCallback,
}

impl StreamWriter {
    /// Create a writer that invokes `on_line` for every complete line.
    pub fn new(on_line: impl FnMut(&str) + Send + 'static) -> Self {
        Self {
            buf: Vec::new(),
            on_line: Box::new(on_line),
        }
    }

    /// Append bytes, emitting a callback for each completed line.
    pub fn push(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);

        // Drain every complete line from the front of the buffer.
        while let Some(pos) = self.buf.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buf.drain(..=pos).collect();
            let text = String::from_utf8_lossy(&line[..line.len() - 1]);
            let text = text.strip_suffix('\r').unwrap_or(&text);
            (self.on_line)(text);
        }
    }

    /// Convenience for string payloads.
    pub fn push_str(&mut self, s: &str) {
        self.push(s.as_bytes());
    }

    /// Emit the trailing partial line, if any.  Also runs on drop, so a
    /// session that forgets to flush still surfaces its final output.
    pub fn flush_lines(&mut self) {
        if !self.buf.is_empty() {
            let rest = std::mem::take(&mut self.buf);
            (self.on_line)(&String::from_utf8_lossy(&rest));
        }
    }
}

impl Drop for StreamWriter {
    fn drop(&mut self) {
        self.flush_lines();
    }
}

impl Write for StreamWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.push(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.flush_lines();
        Ok(())
    }
}

impl std::fmt::Debug for StreamWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamWriter")
            .field("buffered", &self.buf.len())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn collector() -> (Arc<Mutex<Vec<String>>>, StreamWriter) {
        let lines = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&lines);
        let writer = StreamWriter::new(move |line| sink.lock().unwrap().push(line.to_owned()));
        (lines, writer)
    }

    #[test]
    fn complete_lines_are_emitted() {
        let (lines, mut w) = collector();
        w.push_str("first\nsecond\n");
        assert_eq!(*lines.lock().unwrap(), vec!["first", "second"]);
    }

    #[test]
    fn partial_line_waits_for_flush() {
        let (lines, mut w) = collector();
        w.push_str("no newline yet");
        assert!(lines.lock().unwrap().is_empty());

        w.flush_lines();
        assert_eq!(*lines.lock().unwrap(), vec!["no newline yet"]);
    }

    #[test]
    fn line_split_across_writes() {
        let (lines, mut w) = collector();
        w.push_str("hel");
        w.push_str("lo\nwor");
        w.push_str("ld\n");
        assert_eq!(*lines.lock().unwrap(), vec!["hello", "world"]);
    }

    #[test]
    fn crlf_is_stripped() {
        let (lines, mut w) = collector();
        w.push_str("windows\r\n");
        assert_eq!(*lines.lock().unwrap(), vec!["windows"]);
    }

    #[test]
    fn flush_on_empty_buffer_is_noop() {
        let (lines, mut w) = collector();
        w.flush_lines();
        assert!(lines.lock().unwrap().is_empty());
    }

    #[test]
    fn drop_flushes_partial_line() {
        let (lines, mut w) = collector();
        w.push_str("tail");
        drop(w);
        assert_eq!(*lines.lock().unwrap(), vec!["tail"]);
    }
}
