//! Line reassembly across driver reads.
//!
//! One driver read can return several lines, a fraction of a line, or
//! nothing at all, so the framer keeps the unterminated tail of each chunk
//! and prepends it to the next one. The tail holds at most one partial
//! line and is never emitted as a line itself.

/// Splits raw chunks into complete lines, carrying partial lines across polls.
#[derive(Debug, Default)]
pub struct LineFramer {
    carryover: String,
}

impl LineFramer {
    pub fn new() -> Self {
        Self::default()
    }

    /// The unterminated tail retained from the last chunk.
    pub fn carryover(&self) -> &str {
        &self.carryover
    }

    /// Feed one raw chunk and return the complete lines it closes.
    ///
    /// The carryover plus the chunk is split on `\r\n`, `\r`, or `\n`,
    /// keeping trailing empty segments so a chunk ending exactly on a line
    /// boundary leaves an empty carryover. The final segment always becomes
    /// the new carryover; everything before it is emitted in order. An
    /// empty chunk emits nothing and leaves the carryover untouched.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        let mut text = std::mem::take(&mut self.carryover);
        text.push_str(&String::from_utf8_lossy(chunk));

        let mut segments = split_keeping_trailing_empty(&text);
        // split always yields at least one segment
        self.carryover = segments.pop().unwrap_or_default();
        segments
    }
}

/// Split on `\r\n`, `\r`, or `\n`, preserving trailing empty fields.
fn split_keeping_trailing_empty(text: &str) -> Vec<String> {
    let bytes = text.as_bytes();
    let mut segments = Vec::new();
    let mut start = 0;
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'\r' => {
                segments.push(text[start..i].to_string());
                i += if bytes.get(i + 1) == Some(&b'\n') { 2 } else { 1 };
                start = i;
            }
            b'\n' => {
                segments.push(text[start..i].to_string());
                i += 1;
                start = i;
            }
            _ => i += 1,
        }
    }
    segments.push(text[start..].to_string());
    segments
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_complete_line() {
        let mut framer = LineFramer::new();
        let lines = framer.push(b"MAC:AA,RSSI:-45,ADV:0201\r\n");
        assert_eq!(lines, ["MAC:AA,RSSI:-45,ADV:0201"]);
        assert_eq!(framer.carryover(), "");
    }

    #[test]
    fn test_line_split_across_two_chunks() {
        let mut framer = LineFramer::new();
        let lines = framer.push(b"MAC:AA,RSSI:");
        assert!(lines.is_empty());
        assert_eq!(framer.carryover(), "MAC:AA,RSSI:");

        let lines = framer.push(b"-45,ADV:0201\r\nMAC:BB");
        assert_eq!(lines, ["MAC:AA,RSSI:-45,ADV:0201"]);
        assert_eq!(framer.carryover(), "MAC:BB");
    }

    #[test]
    fn test_multiple_lines_in_one_chunk() {
        let mut framer = LineFramer::new();
        let lines = framer.push(b"one\r\ntwo\nthree\rfour");
        assert_eq!(lines, ["one", "two", "three"]);
        assert_eq!(framer.carryover(), "four");
    }

    #[test]
    fn test_empty_chunk_preserves_carryover() {
        let mut framer = LineFramer::new();
        framer.push(b"partial");
        let lines = framer.push(b"");
        assert!(lines.is_empty());
        assert_eq!(framer.carryover(), "partial");
    }

    #[test]
    fn test_chunk_ending_on_boundary_yields_empty_carryover() {
        let mut framer = LineFramer::new();
        let lines = framer.push(b"one\r\ntwo\r\n");
        assert_eq!(lines, ["one", "two"]);
        assert_eq!(framer.carryover(), "");
    }

    #[test]
    fn test_crlf_is_one_terminator() {
        let mut framer = LineFramer::new();
        let lines = framer.push(b"a\r\nb\r\n");
        assert_eq!(lines, ["a", "b"]);
    }

    #[test]
    fn test_crlf_split_across_chunks() {
        // \r arrives at the end of one chunk, \n at the start of the next;
        // the lone \r closes the line and the \n closes an empty one.
        let mut framer = LineFramer::new();
        let lines = framer.push(b"one\r");
        assert_eq!(lines, ["one"]);
        let lines = framer.push(b"\ntwo\r\n");
        assert_eq!(lines, ["", "two"]);
    }

    #[test]
    fn test_blank_lines_are_emitted() {
        let mut framer = LineFramer::new();
        let lines = framer.push(b"\r\n\r\nx\r\n");
        assert_eq!(lines, ["", "", "x"]);
    }

    #[test]
    fn test_reassembly_identity() {
        // emitted lines rejoined with a terminator plus the final carryover
        // reconstruct the concatenated input
        let chunks: [&[u8]; 4] = [b"MAC:AA,RS", b"SI:-1,ADV:02\n", b"MAC:BB,RSSI:-2,", b"RSP:03\ntail"];
        let mut framer = LineFramer::new();
        let mut emitted = Vec::new();
        for chunk in chunks {
            emitted.extend(framer.push(chunk));
        }
        let mut rebuilt = emitted.join("\n");
        rebuilt.push('\n');
        rebuilt.push_str(framer.carryover());
        let original: Vec<u8> = chunks.concat();
        assert_eq!(rebuilt.as_bytes(), original.as_slice());
    }
}
