use chrono;
use std::io::{self, Write};
use super::{NamedSample, Outcome, Transport, TransportError};

/// Buffers a cycle's samples and prints them on flush. Useful for looking at
/// what a reporter would send without sending it anywhere.
pub struct Console {
    out: Box<dyn Write + Send>,
    buffer: Vec<NamedSample>,
}

impl Default for Console {
    fn default() -> Console {
        Console::new(Box::new(io::stdout()))
    }
}

impl Console {
    /// Create a new `Console` printing to `out`.
    pub fn new(out: Box<dyn Write + Send>) -> Console {
        Console {
            out: out,
            buffer: Vec::new(),
        }
    }

    fn print(&mut self) -> io::Result<()> {
        let now = chrono::Utc::now();
        writeln!(self.out, "Flushing metrics: {}", now.to_rfc3339())?;
        for sample in &self.buffer {
            writeln!(self.out, "    {}: {}", sample.name, sample.value)?;
        }
        self.out.flush()
    }
}

impl Transport for Console {
    fn deliver(&mut self, sample: &NamedSample) -> Outcome {
        self.buffer.push(sample.clone());
        Outcome::Skipped
    }

    fn flush(&mut self) -> Outcome {
        if self.buffer.is_empty() {
            return Outcome::Skipped;
        }
        let res = self.print();
        let total = self.buffer.len();
        self.buffer.clear();
        match res {
            Ok(()) => Outcome::Delivered(total),
            Err(e) => Outcome::Failed(TransportError::Network(e.to_string())),
        }
    }
}
