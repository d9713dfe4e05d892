//! Per-tier request dispatch.
//!
//! One request in, one response out, whatever happens. Transport and
//! marshalling failures are converted to failure responses here - this is the
//! designed recoverable-error path, not a crash path.

use std::io::{BufRead, BufReader, Write};
use std::net::{SocketAddr, TcpStream};
use std::sync::Arc;

use tracing::{debug, warn};

use envelope::{codes, Request, Response, Tier};

use crate::config::AdapterConfig;
use crate::error::AdapterError;
use crate::handler::OpHandler;
use crate::native::NativeModule;
use crate::supervisor::ProcessSupervisor;

/// The execution strategy an adapter bound at resolution time.
pub(crate) enum BoundTier {
    Linked(NativeModule),
    Subprocess(ProcessSupervisor),
    Embedded(Arc<dyn OpHandler>),
}

pub(crate) fn dispatch(bound: &BoundTier, config: &AdapterConfig, request: &Request) -> Response {
    match bound {
        BoundTier::Embedded(handler) => match handler.execute(request) {
            Ok(result) => Response::success(result, Tier::Embedded),
            Err(op_error) => Response::failure(op_error.code(), Tier::Embedded),
        },

        BoundTier::Linked(module) => match execute_linked(module, request) {
            Ok(response) => response,
            Err(error) => {
                warn!(%error, op = %request.op, "linked call failed");
                Response::failure(codes::NATIVE_ERROR, Tier::Linked)
            }
        },

        BoundTier::Subprocess(_) => match execute_subprocess(config, request) {
            Ok(response) => response,
            Err(AdapterError::NoResponse) => {
                debug!(op = %request.op, "worker closed connection without a response");
                Response::failure(codes::IPC_NO_RESPONSE, Tier::Subprocess)
            }
            Err(error) => {
                debug!(%error, op = %request.op, "worker call failed");
                Response::failure(codes::IPC_ERROR, Tier::Subprocess)
            }
        },
    }
}

fn execute_linked(module: &NativeModule, request: &Request) -> crate::Result<Response> {
    let line = envelope::encode(request)?;
    let out = module.execute(&line)?;
    Ok(envelope::decode_response(&out)?)
}

/// Connection per call: dial, write one line, read one line.
///
/// Connections are never reused, so concurrent callers on the same adapter
/// share no connection state. Both the dial and the read are time-boxed so a
/// hung worker cannot stall the caller indefinitely.
fn execute_subprocess(config: &AdapterConfig, request: &Request) -> crate::Result<Response> {
    let line = envelope::encode(request)?;
    let addr = SocketAddr::from(([127, 0, 0, 1], config.port));

    let mut stream = TcpStream::connect_timeout(&addr, config.call_timeout)?;
    stream.set_read_timeout(Some(config.call_timeout))?;

    stream.write_all(line.as_bytes())?;
    stream.write_all(b"\n")?;
    stream.flush()?;

    let mut reply = String::new();
    let bytes_read = BufReader::new(stream).read_line(&mut reply)?;
    if bytes_read == 0 {
        return Err(AdapterError::NoResponse);
    }
    Ok(envelope::decode_response(&reply)?)
}
