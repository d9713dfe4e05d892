//! Probe-once tier resolution.
//!
//! Strict precedence: Linked, then Subprocess, then Embedded. Each probe is
//! isolated - any failure is logged at debug level and cascades to the next
//! tier, never to the caller. Resolution runs exactly once per adapter; there
//! is no re-resolution and no mid-session retry.

use std::net::{SocketAddr, TcpStream};
use std::sync::Arc;

use tracing::{debug, info};

use crate::channel::BoundTier;
use crate::config::AdapterConfig;
use crate::handler::OpHandler;
use crate::native::NativeModule;
use crate::supervisor::ProcessSupervisor;

pub(crate) fn resolve(config: &AdapterConfig, embedded: Arc<dyn OpHandler>) -> BoundTier {
    if let Some(module) = probe_linked(config) {
        info!(subsystem = %config.subsystem, "bound linked tier");
        return BoundTier::Linked(module);
    }
    if let Some(supervisor) = probe_subprocess(config) {
        info!(subsystem = %config.subsystem, port = config.port, "bound subprocess tier");
        return BoundTier::Subprocess(supervisor);
    }
    info!(subsystem = %config.subsystem, "bound embedded tier");
    BoundTier::Embedded(embedded)
}

fn probe_linked(config: &AdapterConfig) -> Option<NativeModule> {
    match NativeModule::load(&config.native_module) {
        Ok(module) => Some(module),
        Err(error) => {
            debug!(
                module = %config.native_module.display(),
                %error,
                "linked tier unavailable"
            );
            None
        }
    }
}

fn probe_subprocess(config: &AdapterConfig) -> Option<ProcessSupervisor> {
    if !config.worker_bin.exists() {
        debug!(
            worker = %config.worker_bin.display(),
            "subprocess tier unavailable: worker binary not found"
        );
        return None;
    }

    let supervisor = ProcessSupervisor::new();
    if let Err(error) = supervisor.spawn(&config.worker_bin, config.port, config.spawn_grace) {
        debug!(%error, "subprocess tier unavailable: spawn failed");
        return None;
    }

    let addr = SocketAddr::from(([127, 0, 0, 1], config.port));
    match TcpStream::connect_timeout(&addr, config.probe_timeout) {
        Ok(_probe) => Some(supervisor),
        Err(error) => {
            debug!(%error, "subprocess tier unavailable: worker did not accept");
            supervisor.shutdown();
            None
        }
    }
}
