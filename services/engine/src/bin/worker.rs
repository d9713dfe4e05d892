//! Subprocess-tier worker for the event engine.
//!
//! Binds the loopback port handed over as the single argument (the engine's
//! default when absent), then serves the line protocol: one UTF-8 JSON
//! envelope per line, one request/response pair per connection. Requests are
//! executed against the same aggregate handler the embedded tier uses.

use std::io::{BufRead, BufReader, Write};
use std::net::{Shutdown, TcpListener, TcpStream};
use std::thread;

use anyhow::Context;
use tracing::{debug, info, warn};

use adapter::OpHandler;
use engine::AggregateHandler;
use envelope::{codes, Response, Tier};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let port = std::env::args()
        .nth(1)
        .and_then(|arg| arg.parse().ok())
        .unwrap_or(engine::DEFAULT_PORT);
    serve(port)
}

fn serve(port: u16) -> anyhow::Result<()> {
    let listener = TcpListener::bind(("127.0.0.1", port))
        .with_context(|| format!("failed to bind 127.0.0.1:{port}"))?;
    info!(port, "engine worker listening");

    for connection in listener.incoming() {
        match connection {
            Ok(stream) => {
                thread::spawn(move || handle(stream));
            }
            Err(error) => warn!(%error, "accept failed"),
        }
    }
    Ok(())
}

fn handle(stream: TcpStream) {
    let reader = match stream.try_clone() {
        Ok(clone) => BufReader::new(clone),
        Err(error) => {
            warn!(%error, "failed to clone connection");
            return;
        }
    };
    let mut writer = stream;

    for line in reader.lines() {
        let Ok(line) = line else { break };
        let response = respond(&line);
        let encoded = match envelope::encode(&response) {
            Ok(encoded) => encoded,
            Err(error) => {
                warn!(%error, "failed to encode response");
                break;
            }
        };
        if writeln!(writer, "{encoded}").is_err() {
            break;
        }
    }
    debug!("connection closed");
    let _ = writer.shutdown(Shutdown::Both);
}

fn respond(line: &str) -> Response {
    match envelope::decode_request(line) {
        Ok(request) => match AggregateHandler.execute(&request) {
            Ok(result) => Response::success(result, Tier::Subprocess),
            Err(op_error) => Response::failure(op_error.code(), Tier::Subprocess),
        },
        Err(_) => Response::failure(codes::INVALID_REQUEST, Tier::Subprocess),
    }
}
