//! Queued command sequence for one bus transaction.
//!
//! A [`CommandLink`] is built up front and handed to the master driver in
//! one piece, which runs it as a single blocking transaction.

/// Acknowledge policy the master applies to bytes it reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadAck {
    /// ACK every byte.
    Ack,
    /// NACK every byte.
    Nack,
    /// ACK every byte except the last, which is NACKed to end the read.
    LastNack,
}

impl ReadAck {
    /// Whether the master ACKs byte `index` of a `len` byte read.
    pub fn acks(self, index: usize, len: usize) -> bool {
        match self {
            ReadAck::Ack => true,
            ReadAck::Nack => false,
            ReadAck::LastNack => index + 1 < len,
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum Command<'a> {
    /// START, or a repeated START when the bus is already held.
    Start,
    WriteByte { byte: u8, ack_check: bool },
    Write { bytes: &'a [u8], ack_check: bool },
    Read { buf: &'a mut [u8], ack: ReadAck },
    Stop,
}

#[derive(Debug, Default)]
pub struct CommandLink<'a> {
    commands: Vec<Command<'a>>,
}

impl<'a> CommandLink<'a> {
    pub fn new() -> Self {
        Self {
            commands: Vec::new(),
        }
    }

    pub fn start(&mut self) -> &mut Self {
        self.commands.push(Command::Start);
        self
    }

    pub fn write_byte(&mut self, byte: u8, ack_check: bool) -> &mut Self {
        self.commands.push(Command::WriteByte { byte, ack_check });
        self
    }

    /// Queues `bytes`. An empty slice queues nothing.
    pub fn write(&mut self, bytes: &'a [u8], ack_check: bool) -> &mut Self {
        if !bytes.is_empty() {
            self.commands.push(Command::Write { bytes, ack_check });
        }
        self
    }

    /// Queues a read filling `buf`. An empty buffer queues nothing.
    pub fn read(&mut self, buf: &'a mut [u8], ack: ReadAck) -> &mut Self {
        if !buf.is_empty() {
            self.commands.push(Command::Read { buf, ack });
        }
        self
    }

    pub fn stop(&mut self) -> &mut Self {
        self.commands.push(Command::Stop);
        self
    }

    pub fn commands(&self) -> &[Command<'a>] {
        &self.commands
    }

    pub fn commands_mut(&mut self) -> &mut [Command<'a>] {
        &mut self.commands
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Number of payload bytes the link transmits, address bytes included.
    pub fn write_len(&self) -> usize {
        self.commands
            .iter()
            .map(|c| match c {
                Command::WriteByte { .. } => 1,
                Command::Write { bytes, .. } => bytes.len(),
                _ => 0,
            })
            .sum()
    }

    /// Number of bytes the link reads back.
    pub fn read_len(&self) -> usize {
        self.commands
            .iter()
            .map(|c| match c {
                Command::Read { buf, .. } => buf.len(),
                _ => 0,
            })
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_last_nack() {
        assert!(ReadAck::LastNack.acks(0, 2));
        assert!(!ReadAck::LastNack.acks(1, 2));
        assert!(!ReadAck::LastNack.acks(0, 1));
        assert!(ReadAck::Ack.acks(1, 2));
        assert!(!ReadAck::Nack.acks(0, 2));
    }

    #[test]
    fn test_empty_segments_are_skipped() {
        let mut buf = [0u8; 0];
        let mut link = CommandLink::new();
        link.start()
            .write(&[], true)
            .read(&mut buf, ReadAck::LastNack)
            .stop();
        assert_eq!(link.commands(), &[Command::Start, Command::Stop]);
    }

    #[test]
    fn test_lengths() {
        let payload = [1u8, 2, 3];
        let mut out = [0u8; 2];
        let mut link = CommandLink::new();
        link.start()
            .write_byte(0x46, true)
            .write(&payload, true)
            .start()
            .write_byte(0x47, true)
            .read(&mut out, ReadAck::LastNack)
            .stop();
        assert_eq!(link.len(), 7);
        assert_eq!(link.write_len(), 5);
        assert_eq!(link.read_len(), 2);
    }
}
