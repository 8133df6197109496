//! The socket read side.
//!
//! A spawned thread owns the read half of the connection and does nothing
//! but frame: it reads the 4-byte header, then the payload, and hands each
//! complete frame to the session over a channel. Payloads are never
//! interpreted here.
//!
//! On a read error or clean EOF the thread delivers exactly one
//! [`RecvEvent::Closed`] and exits. If the session side has gone away the
//! thread exits quietly.

use std::io::Read;
use std::net::TcpStream;
use std::sync::mpsc;
use std::thread;

use log::{debug, warn};

use crate::protocol::PacketHeader;

/// An event delivered by the receiver thread.
#[derive(Debug)]
pub enum RecvEvent {
    /// A complete frame, in wire order.
    Frame { payload: Vec<u8>, seq: u8 },
    /// The socket closed or failed; delivered exactly once.
    Closed { reason: String },
}

/// Handle to the receiver thread's frame stream.
#[derive(Debug)]
pub struct Receiver {
    rx: mpsc::Receiver<RecvEvent>,
}

impl Receiver {
    /// Spawn the read loop on the given read half.
    pub fn spawn(stream: TcpStream) -> std::io::Result<Self> {
        let (tx, rx) = mpsc::channel();
        thread::Builder::new()
            .name("mylite-recv".to_string())
            .spawn(move || read_loop(stream, &tx))?;
        Ok(Self { rx })
    }

    /// Block until the next event arrives.
    ///
    /// If the thread died without delivering its close event, that is
    /// reported as a close.
    pub fn next_event(&self) -> RecvEvent {
        self.rx.recv().unwrap_or_else(|_| RecvEvent::Closed {
            reason: "receiver exited".to_string(),
        })
    }
}

fn read_loop(mut stream: TcpStream, tx: &mpsc::Sender<RecvEvent>) {
    loop {
        let mut header_buf = [0u8; 4];
        if let Err(e) = stream.read_exact(&mut header_buf) {
            close(tx, &e);
            return;
        }

        let header = PacketHeader::from_bytes(&header_buf);
        let mut payload = vec![0u8; header.payload_length as usize];
        if let Err(e) = stream.read_exact(&mut payload) {
            close(tx, &e);
            return;
        }

        let frame = RecvEvent::Frame {
            payload,
            seq: header.sequence_id,
        };
        if tx.send(frame).is_err() {
            // Session dropped its end; nothing left to deliver to.
            return;
        }
    }
}

fn close(tx: &mpsc::Sender<RecvEvent>, err: &std::io::Error) {
    if err.kind() == std::io::ErrorKind::UnexpectedEof {
        debug!("server closed the connection");
    } else {
        warn!("socket read failed: {err}");
    }
    let _ = tx.send(RecvEvent::Closed {
        reason: err.to_string(),
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::net::TcpListener;

    fn frame(payload: &[u8], seq: u8) -> Vec<u8> {
        crate::protocol::writer::build_frame(payload, seq)
    }

    #[test]
    fn delivers_frames_in_order_then_close() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        let server = thread::spawn(move || {
            let (mut sock, _) = listener.accept().unwrap();
            sock.write_all(&frame(b"first", 0)).unwrap();
            sock.write_all(&frame(b"second", 1)).unwrap();
            // Dropping the socket closes the connection.
        });

        let stream = TcpStream::connect(addr).unwrap();
        let recv = Receiver::spawn(stream).unwrap();

        match recv.next_event() {
            RecvEvent::Frame { payload, seq } => {
                assert_eq!(payload, b"first");
                assert_eq!(seq, 0);
            }
            other => panic!("expected frame, got {other:?}"),
        }
        match recv.next_event() {
            RecvEvent::Frame { payload, seq } => {
                assert_eq!(payload, b"second");
                assert_eq!(seq, 1);
            }
            other => panic!("expected frame, got {other:?}"),
        }
        match recv.next_event() {
            RecvEvent::Closed { .. } => {}
            other => panic!("expected close, got {other:?}"),
        }

        server.join().unwrap();
    }

    #[test]
    fn empty_payload_frame() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        let server = thread::spawn(move || {
            let (mut sock, _) = listener.accept().unwrap();
            sock.write_all(&frame(b"", 3)).unwrap();
        });

        let stream = TcpStream::connect(addr).unwrap();
        let recv = Receiver::spawn(stream).unwrap();

        match recv.next_event() {
            RecvEvent::Frame { payload, seq } => {
                assert!(payload.is_empty());
                assert_eq!(seq, 3);
            }
            other => panic!("expected frame, got {other:?}"),
        }

        server.join().unwrap();
    }
}
