const LINE_FEED: u8 = 0x0A;

/// Telemetry lines are a few dozen bytes; anything longer without a
/// delimiter is wrong-baud garbage, not a line in progress.
const MAX_LINE_BYTES: usize = 512;

/// Reassembles LF-terminated lines from arbitrary byte chunks. The
/// delimiter stays on the emitted line; the telemetry parser trims it.
#[derive(Debug, Default)]
pub struct LineFramer {
    buffer: Vec<u8>,
}

impl LineFramer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed raw bytes; returns every line completed by this chunk.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        let mut lines = Vec::new();
        for &byte in bytes {
            self.buffer.push(byte);
            if byte == LINE_FEED {
                lines.push(String::from_utf8_lossy(&self.buffer).into_owned());
                self.buffer.clear();
            } else if self.buffer.len() >= MAX_LINE_BYTES {
                log::warn!("discarding {} unterminated bytes", self.buffer.len());
                self.buffer.clear();
            }
        }
        lines
    }

    #[cfg(test)]
    fn pending(&self) -> usize {
        self.buffer.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn holds_partial_lines_until_the_delimiter() {
        let mut framer = LineFramer::new();
        assert!(framer.push(b"POS,1.0").is_empty());
        assert_eq!(framer.push(b",2.0\n"), vec!["POS,1.0,2.0\n"]);
    }

    #[test]
    fn splits_batched_chunks_into_lines() {
        let mut framer = LineFramer::new();
        assert_eq!(
            framer.push(b"STATUS,RUN\nPOS,1.0,2.0\nPOS,3"),
            vec!["STATUS,RUN\n", "POS,1.0,2.0\n"]
        );
        assert_eq!(framer.push(b".0,4.0\n"), vec!["POS,3.0,4.0\n"]);
    }

    #[test]
    fn resets_after_each_line() {
        let mut framer = LineFramer::new();
        framer.push(b"a\n");
        assert_eq!(framer.push(b"b\n"), vec!["b\n"]);
    }

    #[test]
    fn unterminated_garbage_never_grows_past_the_cap() {
        let mut framer = LineFramer::new();
        assert!(framer.push(&[b'x'; 10_000]).is_empty());
        assert!(framer.pending() < MAX_LINE_BYTES);

        // Whatever garbage is left flushes as one bogus line, then the
        // framer is back in sync.
        assert_eq!(framer.push(b"\n").len(), 1);
        assert_eq!(framer.push(b"STATUS,RUN\n"), vec!["STATUS,RUN\n"]);
    }
}
