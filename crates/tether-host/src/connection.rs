//! Per-connection command loop.
//!
//! Each accepted client gets one handler thread that owns the socket for
//! its whole lifetime. Frames are consumed strictly in arrival order: a
//! full submit/wait/respond round trip completes before the next read,
//! so pipelined commands on one connection are answered in the order
//! they were written.

use std::net::TcpStream;
use std::time::Duration;

use tracing::{debug, warn};

use tether_protocol::{CommandEnvelope, FrameBuffer, FrameError, ResponseEnvelope, write_frame};

use crate::scheduler::JobSubmitter;
use crate::transport::ConnectionHandler;

const CONNECTION_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::connection");

/// Connection handler that frames commands and round-trips them through
/// the host-thread scheduler.
pub(crate) struct BridgeConnectionHandler {
    submitter: JobSubmitter,
    command_timeout: Duration,
}

impl BridgeConnectionHandler {
    pub(crate) fn new(submitter: JobSubmitter, command_timeout: Duration) -> Self {
        Self {
            submitter,
            command_timeout,
        }
    }

    fn serve(&self, mut stream: TcpStream) {
        let mut frames = FrameBuffer::new();
        loop {
            let frame = match frames.read_frame(&mut stream) {
                Ok(Some(frame)) => frame,
                Ok(None) => {
                    debug!(target: CONNECTION_TARGET, "client disconnected");
                    return;
                }
                Err(error @ FrameError::TooLarge { .. }) => {
                    // The stream cannot be resynchronised past an
                    // overlong line; answer and drop the connection.
                    warn!(target: CONNECTION_TARGET, %error, "oversized frame");
                    let _ = write_frame(&mut stream, &ResponseEnvelope::error(error.to_string()));
                    return;
                }
                Err(error) => {
                    warn!(target: CONNECTION_TARGET, %error, "connection read failed");
                    return;
                }
            };

            let response = self.respond(&frame);
            if let Err(error) = write_frame(&mut stream, &response) {
                warn!(target: CONNECTION_TARGET, %error, "failed to write response");
                return;
            }
        }
    }

    /// Produces the response for one inbound frame; never fails.
    fn respond(&self, frame: &[u8]) -> ResponseEnvelope {
        let envelope = match CommandEnvelope::parse(frame) {
            Ok(envelope) => envelope,
            Err(error) => {
                debug!(target: CONNECTION_TARGET, %error, "malformed command frame");
                return ResponseEnvelope::error(error.to_string());
            }
        };

        debug!(
            target: CONNECTION_TARGET,
            command = %envelope.name,
            "dispatching command"
        );
        match self.submitter.submit(envelope.name, envelope.params) {
            Ok(pending) => pending.wait(self.command_timeout),
            Err(error) => ResponseEnvelope::error(error.to_string()),
        }
    }
}

impl ConnectionHandler for BridgeConnectionHandler {
    fn handle(&self, stream: TcpStream) {
        self.serve(stream);
    }
}

#[cfg(test)]
mod tests {
    use std::io::{BufRead, BufReader, Write};
    use std::net::{TcpListener, TcpStream};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::thread::{self, JoinHandle};

    use rstest::{fixture, rstest};
    use serde_json::json;

    use crate::dispatch::CommandDispatcher;
    use crate::registry::CommandRegistry;
    use crate::scheduler::{TIMEOUT_MESSAGE, scheduler};

    use super::*;

    /// One live connection against a real scheduler with a pumping host
    /// thread.
    ///
    /// Responses are read through one persistent buffered reader so
    /// pipelined response lines are never lost to a discarded buffer.
    struct ConnectionHarness {
        client: TcpStream,
        reader: BufReader<TcpStream>,
        server: Option<JoinHandle<()>>,
        pump_stop: Arc<AtomicBool>,
        pump: Option<JoinHandle<()>>,
    }

    impl ConnectionHarness {
        fn send(&mut self, raw: &[u8]) {
            self.client.write_all(raw).expect("write request");
            self.client.flush().expect("flush request");
        }

        fn read_line(&mut self) -> String {
            let mut line = String::new();
            self.reader
                .read_line(&mut line)
                .expect("read response line");
            line
        }
    }

    impl Drop for ConnectionHarness {
        fn drop(&mut self) {
            let _ = self.client.shutdown(std::net::Shutdown::Both);
            if let Some(server) = self.server.take() {
                server.join().expect("server thread");
            }
            self.pump_stop.store(true, Ordering::SeqCst);
            if let Some(pump) = self.pump.take() {
                pump.join().expect("pump thread");
            }
        }
    }

    fn test_registry() -> CommandRegistry {
        let mut registry = CommandRegistry::new();
        registry.register("ping", Some("Responds with pong"), |_| Ok(json!("pong")));
        registry.register("echo", None, |params| {
            params
                .get("payload")
                .cloned()
                .ok_or_else(|| "missing required parameter: payload".into())
        });
        registry.register("fail", None, |_| Err("handler deliberately failed".into()));
        registry.register("slow", None, |_| {
            thread::sleep(Duration::from_millis(300));
            Ok(json!("done"))
        });
        registry
    }

    #[fixture]
    fn harness() -> ConnectionHarness {
        harness_with_timeout(Duration::from_secs(5))
    }

    fn harness_with_timeout(command_timeout: Duration) -> ConnectionHarness {
        let dispatcher = CommandDispatcher::new(Arc::new(test_registry()));
        let (submitter, ticks) = scheduler(dispatcher);

        let pump_stop = Arc::new(AtomicBool::new(false));
        let stop_flag = Arc::clone(&pump_stop);
        let pump = thread::spawn(move || {
            while !stop_flag.load(Ordering::SeqCst) {
                ticks.run_pending();
                thread::sleep(Duration::from_millis(1));
            }
        });

        let listener = TcpListener::bind(("127.0.0.1", 0)).expect("bind");
        let addr = listener.local_addr().expect("addr");
        let server = thread::spawn(move || {
            let (stream, _) = listener.accept().expect("accept");
            BridgeConnectionHandler::new(submitter, command_timeout).handle(stream);
        });

        let client = TcpStream::connect(addr).expect("connect");
        let reader = BufReader::new(client.try_clone().expect("clone client stream"));
        ConnectionHarness {
            client,
            reader,
            server: Some(server),
            pump_stop,
            pump: Some(pump),
        }
    }

    #[rstest]
    fn ping_round_trip(mut harness: ConnectionHarness) {
        harness.send(b"{\"type\":\"ping\",\"params\":{}}\n");
        let line = harness.read_line();
        assert_eq!(line.trim_end(), r#"{"status":"success","result":"pong"}"#);
    }

    #[rstest]
    fn unknown_command_keeps_connection_usable(mut harness: ConnectionHarness) {
        harness.send(b"{\"type\":\"missing_cmd\",\"params\":{}}\n");
        let line = harness.read_line();
        assert_eq!(
            line.trim_end(),
            r#"{"status":"error","message":"Unknown command type: missing_cmd"}"#
        );

        harness.send(b"{\"type\":\"ping\",\"params\":{}}\n");
        let line = harness.read_line();
        assert!(line.contains(r#""status":"success""#));
    }

    #[rstest]
    fn handler_error_keeps_connection_usable(mut harness: ConnectionHarness) {
        harness.send(b"{\"type\":\"fail\",\"params\":{}}\n");
        let line = harness.read_line();
        assert!(line.contains("handler deliberately failed"));

        harness.send(b"{\"type\":\"ping\",\"params\":{}}\n");
        assert!(harness.read_line().contains(r#""result":"pong""#));
    }

    #[rstest]
    fn malformed_frame_gets_error_and_connection_survives(mut harness: ConnectionHarness) {
        harness.send(b"this is not json\n");
        let line = harness.read_line();
        assert!(line.contains(r#""status":"error""#));

        harness.send(b"{\"type\":\"ping\",\"params\":{}}\n");
        assert!(harness.read_line().contains(r#""result":"pong""#));
    }

    #[rstest]
    fn pipelined_commands_answered_in_order(mut harness: ConnectionHarness) {
        harness.send(
            b"{\"type\":\"echo\",\"params\":{\"payload\":1}}\n{\"type\":\"echo\",\"params\":{\"payload\":2}}\n",
        );
        let first = harness.read_line();
        let second = harness.read_line();
        assert!(first.contains(r#""result":1"#), "first: {first}");
        assert!(second.contains(r#""result":2"#), "second: {second}");
    }

    #[test]
    fn slow_handler_times_out_caller() {
        let mut harness = harness_with_timeout(Duration::from_millis(50));
        harness.send(b"{\"type\":\"slow\",\"params\":{}}\n");
        let line = harness.read_line();
        assert!(line.contains(TIMEOUT_MESSAGE), "line: {line}");
    }
}
