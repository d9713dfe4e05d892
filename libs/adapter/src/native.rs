//! Linked-tier native module loading and call marshalling.
//!
//! The module contract is two exported symbols over C strings:
//!
//! ```c
//! char *native_execute(const char *request_line);
//! void  native_release(char *response_line);
//! ```
//!
//! `native_execute` receives one encoded request line and returns one encoded
//! response line, ownership of which is handed back through
//! `native_release`. Both symbols are resolved eagerly at load time so a
//! half-linked module fails the probe instead of the first call.

use std::ffi::{c_char, CStr, CString};
use std::path::Path;

use libloading::{Library, Symbol};
use tracing::debug;

use crate::error::{AdapterError, Result};

type ExecuteFn = unsafe extern "C" fn(*const c_char) -> *mut c_char;
type ReleaseFn = unsafe extern "C" fn(*mut c_char);

const EXECUTE_SYMBOL: &[u8] = b"native_execute\0";
const RELEASE_SYMBOL: &[u8] = b"native_release\0";

/// A loaded native module with its call symbols verified.
pub(crate) struct NativeModule {
    library: Library,
}

impl NativeModule {
    /// Load the module at `path` and verify both contract symbols resolve.
    pub(crate) fn load(path: &Path) -> Result<Self> {
        // SAFETY: loading a library runs its initializers; the module path is
        // operator-supplied configuration, the same trust boundary as the
        // worker binary.
        let library = unsafe { Library::new(path) }?;
        unsafe {
            library.get::<ExecuteFn>(EXECUTE_SYMBOL)?;
            library.get::<ReleaseFn>(RELEASE_SYMBOL)?;
        }
        debug!(module = %path.display(), "native module loaded");
        Ok(Self { library })
    }

    /// Execute one encoded request line, returning the encoded response line.
    pub(crate) fn execute(&self, line: &str) -> Result<String> {
        let request = CString::new(line)
            .map_err(|_| AdapterError::NativeCall("request contains NUL byte".to_string()))?;

        // SAFETY: symbols were verified at load time; the response pointer is
        // owned by the module and returned to it via native_release before
        // this function exits.
        unsafe {
            let execute: Symbol<ExecuteFn> = self.library.get(EXECUTE_SYMBOL)?;
            let release: Symbol<ReleaseFn> = self.library.get(RELEASE_SYMBOL)?;

            let raw = execute(request.as_ptr());
            if raw.is_null() {
                return Err(AdapterError::NativeCall(
                    "module returned a null response".to_string(),
                ));
            }
            let response = CStr::from_ptr(raw).to_string_lossy().into_owned();
            release(raw);
            Ok(response)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_module_fails_to_load() {
        assert!(NativeModule::load(Path::new("definitely-not-a-module.so")).is_err());
    }
}
