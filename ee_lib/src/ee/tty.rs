/// Longest line buffered before it's emitted without waiting for a newline
pub const TTY_LINE_MAX: usize = 1024;

/// Line buffer for the guest console output
#[derive(Default)]
pub struct Tty {
    line: String,
    /// Completed lines, oldest first. Only kept when capture is enabled.
    captured: Option<Vec<String>>,
}

impl Tty {
    pub fn new() -> Tty {
        Tty::default()
    }

    /// Keep a copy of every completed line, retrieved with `take_lines`
    pub fn capture(&mut self) {
        self.captured.get_or_insert_with(Vec::new);
    }

    pub fn push_byte(&mut self, b: u8) {
        match b {
            b'\n' => self.flush(),
            b'\r' => (),
            _ => {
                self.line.push(char::from(b));

                if self.line.len() >= TTY_LINE_MAX {
                    self.flush();
                }
            }
        }
    }

    pub fn push_bytes(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.push_byte(b);
        }
    }

    /// Emit the pending line, if any
    pub fn flush(&mut self) {
        if self.line.is_empty() {
            return;
        }

        info!("EE console: {}", self.line);

        if let Some(lines) = &mut self.captured {
            lines.push(self.line.clone());
        }

        self.line.clear();
    }

    pub fn take_lines(&mut self) -> Vec<String> {
        self.captured.as_mut().map(std::mem::take).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_buffering() {
        let mut tty = Tty::new();

        tty.capture();
        tty.push_bytes(b"hello\r\nwor");
        assert_eq!(tty.take_lines(), vec!["hello".to_string()]);

        tty.push_bytes(b"ld\n\n");
        assert_eq!(tty.take_lines(), vec!["world".to_string()]);
    }

    #[test]
    fn endless_line_is_split() {
        let mut tty = Tty::new();

        tty.capture();
        tty.push_bytes(&[b'x'; TTY_LINE_MAX * 2 + 10]);

        let lines = tty.take_lines();

        assert_eq!(lines.len(), 2);
        assert!(lines.iter().all(|l| l.len() == TTY_LINE_MAX));

        tty.push_byte(b'\n');
        assert_eq!(tty.take_lines(), vec!["x".repeat(10)]);
    }
}
