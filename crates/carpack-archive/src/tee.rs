use std::io::{self, Write};

/// Writes every byte to two destinations.
///
/// A failure on either side fails the write; nothing is retried and the
/// two sides may then disagree, so the caller must discard both.
#[derive(Debug)]
pub struct TeeWriter<A, B> {
    primary: A,
    secondary: B,
}

impl<A: Write, B: Write> TeeWriter<A, B> {
    pub fn new(primary: A, secondary: B) -> Self {
        Self { primary, secondary }
    }

    pub fn into_inner(self) -> (A, B) {
        (self.primary, self.secondary)
    }
}

impl<A: Write, B: Write> Write for TeeWriter<A, B> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.primary.write_all(buf)?;
        self.secondary.write_all(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.primary.flush()?;
        self.secondary.flush()
    }
}
