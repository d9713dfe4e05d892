//! # Strata Tiered Execution Adapter
//!
//! ## Purpose
//!
//! Every subsystem hands its units of work to an "accelerated" implementation
//! that may or may not be available at runtime, and must keep working when it
//! is not. This crate is the one generic answer to that problem: it decides,
//! once per adapter instance, which of three execution tiers is usable, then
//! exchanges request/response envelopes with whichever tier was chosen.
//!
//! ## Tier selection
//!
//! [`Adapter::resolve`] probes in strict precedence, each probe isolated so a
//! failure can never propagate past it:
//!
//! 1. **Linked** - load a native module (`<PREFIX>_NATIVE_LIB` override or a
//!    platform default name). Any load or link failure cascades silently.
//! 2. **Subprocess** - spawn the worker binary (`<PREFIX>_WORKER_BIN` override
//!    or the default relative location), wait a fixed grace period, then probe
//!    its loopback listener once with a short timeout.
//! 3. **Embedded** - the in-process [`OpHandler`] supplied by the subsystem.
//!    Always available, so resolution is infallible.
//!
//! The bound tier and any retained worker handle are write-once at
//! construction and read-only afterwards; no synchronization is needed to
//! call [`Adapter::execute`] from concurrent threads.
//!
//! ## Failure containment
//!
//! Per-call failures never escape as errors. Transport faults surface as
//! structured failure responses (`ipc_error`, `ipc_no_response`,
//! `native_error`) and computation faults as op-specific codes; the caller
//! keeps running and keeps counting. The only fallible surface is
//! construction itself, which rejects invalid configuration.

pub mod config;
pub mod error;
pub mod handler;
pub mod store;
pub mod supervisor;

mod channel;
mod native;
mod resolver;

pub use config::AdapterConfig;
pub use error::{AdapterError, Result};
pub use handler::{OpError, OpHandler};
pub use store::StoreHandler;
pub use supervisor::ProcessSupervisor;

use std::sync::Arc;

use envelope::{Request, Response, Tier};

use crate::channel::BoundTier;

/// A resolved execution adapter: one bound tier, one uniform `execute`.
pub struct Adapter {
    config: AdapterConfig,
    bound: BoundTier,
}

impl Adapter {
    /// Probe the tiers once and bind the first usable one.
    ///
    /// `embedded` is the subsystem's in-process operation handler, which also
    /// serves as the unconditional fallback. Fails only on invalid
    /// configuration - tier probing itself cannot fail.
    pub fn resolve(config: AdapterConfig, embedded: Arc<dyn OpHandler>) -> Result<Self> {
        config.validate()?;
        let bound = resolver::resolve(&config, embedded);
        Ok(Self { config, bound })
    }

    /// Execute one request on the bound tier.
    ///
    /// Never returns an error: every transport or computation failure is
    /// converted into a failure [`Response`] at this boundary.
    pub fn execute(&self, request: &Request) -> Response {
        channel::dispatch(&self.bound, &self.config, request)
    }

    /// The tier this adapter bound at construction.
    pub fn tier(&self) -> Tier {
        match &self.bound {
            BoundTier::Linked(_) => Tier::Linked,
            BoundTier::Subprocess(_) => Tier::Subprocess,
            BoundTier::Embedded(_) => Tier::Embedded,
        }
    }

    /// Tear down the adapter. Idempotent: terminates the worker process if
    /// one was retained, otherwise does nothing. Safe to call repeatedly.
    pub fn shutdown(&self) {
        if let BoundTier::Subprocess(supervisor) = &self.bound {
            supervisor.shutdown();
        }
    }
}
