use std::collections::VecDeque;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::time::Duration;

use crate::{Transport, TransportError};

/// An in-memory, in-process `Transport` used by the workspace's tests in
/// place of a real socket. `DuplexPipe::pair` returns two connected ends;
/// bytes written to one are readable from the other.
pub struct DuplexPipe {
    tx: Option<Sender<Vec<u8>>>,
    rx: Receiver<Vec<u8>>,
    pending: VecDeque<u8>,
    recv_timeout: Option<Duration>,
}

impl DuplexPipe {
    #[must_use]
    pub fn pair() -> (Self, Self) {
        let (tx_a, rx_a) = mpsc::channel();
        let (tx_b, rx_b) = mpsc::channel();
        let a = Self {
            tx: Some(tx_a),
            rx: rx_b,
            pending: VecDeque::new(),
            recv_timeout: None,
        };
        let b = Self {
            tx: Some(tx_b),
            rx: rx_a,
            pending: VecDeque::new(),
            recv_timeout: None,
        };
        (a, b)
    }

    fn fill_pending(&mut self) -> Result<(), TransportError> {
        let chunk = match self.recv_timeout {
            None => self.rx.recv().map_err(|_| TransportError::Closed)?,
            Some(timeout) => match self.rx.recv_timeout(timeout) {
                Ok(chunk) => chunk,
                Err(RecvTimeoutError::Timeout) => return Err(TransportError::Timeout),
                Err(RecvTimeoutError::Disconnected) => return Err(TransportError::Closed),
            },
        };
        self.pending.extend(chunk);
        Ok(())
    }
}

impl Transport for DuplexPipe {
    fn send(&mut self, buf: &[u8]) -> Result<usize, TransportError> {
        let tx = self.tx.as_ref().ok_or(TransportError::Closed)?;
        tx.send(buf.to_vec()).map_err(|_| TransportError::Closed)?;
        Ok(buf.len())
    }

    fn recv(&mut self, buf: &mut [u8]) -> Result<usize, TransportError> {
        if buf.is_empty() {
            return Ok(0);
        }
        if self.pending.is_empty() {
            self.fill_pending()?;
        }
        let n = buf.len().min(self.pending.len());
        for slot in buf.iter_mut().take(n) {
            *slot = self.pending.pop_front().expect("checked len above");
        }
        Ok(n)
    }

    fn set_recv_timeout(&mut self, timeout: Option<Duration>) -> Result<(), TransportError> {
        self.recv_timeout = timeout;
        Ok(())
    }

    fn close(&mut self) -> Result<(), TransportError> {
        self.tx = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bytes_written_on_one_end_are_read_on_the_other() {
        let (mut a, mut b) = DuplexPipe::pair();
        a.send(b"hello").unwrap();
        let mut buf = [0u8; 5];
        let n = b.recv(&mut buf).unwrap();
        assert_eq!(&buf[..n], b"hello");
    }

    #[test]
    fn recv_splits_across_smaller_buffers() {
        let (mut a, mut b) = DuplexPipe::pair();
        a.send(b"hello world").unwrap();
        let mut first = [0u8; 5];
        let mut second = [0u8; 6];
        assert_eq!(b.recv(&mut first).unwrap(), 5);
        assert_eq!(b.recv(&mut second).unwrap(), 6);
        assert_eq!(&first, b"hello");
        assert_eq!(&second, b" world");
    }

    #[test]
    fn recv_times_out_when_nothing_arrives() {
        let (_a, mut b) = DuplexPipe::pair();
        b.set_recv_timeout(Some(Duration::from_millis(10))).unwrap();
        let mut buf = [0u8; 4];
        assert_eq!(b.recv(&mut buf), Err(TransportError::Timeout));
    }

    #[test]
    fn recv_reports_closed_after_peer_closes() {
        let (mut a, mut b) = DuplexPipe::pair();
        a.close().unwrap();
        let mut buf = [0u8; 4];
        assert_eq!(b.recv(&mut buf), Err(TransportError::Closed));
    }
}
