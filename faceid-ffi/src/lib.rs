//! C ABI for the faceid host SDK
//!
//! Exposes the preview adapter (`rsid_*_preview`), version information and
//! status descriptions. The matching declarations live in
//! `include/rsid_c/rsid_preview.h`.
//!
//! Strings returned to C are NUL-terminated and live for the whole process.

use std::collections::HashMap;
use std::ffi::{CStr, CString};
use std::os::raw::{c_char, c_int};
use std::panic::{self, AssertUnwindSafe};
use std::sync::OnceLock;

use parking_lot::Mutex;
use tracing::warn;

use faceid_core::{version, AuthenticateStatus, EnrollStatus, Status};

pub mod image;
pub mod preview;

pub use image::{rsid_image, rsid_image_metadata};
pub use preview::{
    clear_preview_factory, install_preview_factory, rsid_preview, rsid_preview_clbk,
    rsid_preview_config, PreviewFactory,
};

/// Stable C copy of a static string
fn intern(s: &'static str) -> *const c_char {
    static STRINGS: OnceLock<Mutex<HashMap<&'static str, CString>>> = OnceLock::new();

    let mut strings = STRINGS.get_or_init(Default::default).lock();
    if let Some(c) = strings.get(s) {
        return c.as_ptr();
    }

    // The heap buffer does not move when the map grows
    match CString::new(s) {
        Ok(c) => strings.entry(s).or_insert(c).as_ptr(),
        Err(_) => c"".as_ptr(),
    }
}

fn guarded_str(name: &str, f: impl FnOnce() -> &'static str) -> *const c_char {
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(s) => intern(s),
        Err(_) => {
            warn!("Panic caught in {}", name);
            c"".as_ptr()
        }
    }
}

/// Library version, e.g. "0.18.1"
#[unsafe(no_mangle)]
pub extern "C" fn rsid_version() -> *const c_char {
    guarded_str("rsid_version", version::version)
}

/// Oldest firmware major.minor supported by this library
#[unsafe(no_mangle)]
pub extern "C" fn rsid_compatible_firmware_version() -> *const c_char {
    guarded_str(
        "rsid_compatible_firmware_version",
        version::compatible_firmware_version,
    )
}

/// 1 when firmware `fw_version` (e.g. "2.8.0.37") works with this library.
///
/// # Safety
///
/// `fw_version` must be null or a valid NUL-terminated string.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn rsid_is_fw_compatible_with_host(fw_version: *const c_char) -> c_int {
    if fw_version.is_null() {
        return 0;
    }

    // SAFETY: non-null and NUL-terminated per the contract above
    let fw_version = unsafe { CStr::from_ptr(fw_version) };
    let compatible = panic::catch_unwind(|| match fw_version.to_str() {
        Ok(fw) => version::is_fw_compatible_with_host(fw),
        Err(_) => false,
    });

    c_int::from(compatible.unwrap_or(false))
}

/// Description of a `Status` code
#[unsafe(no_mangle)]
pub extern "C" fn rsid_status_str(status: c_int) -> *const c_char {
    guarded_str("rsid_status_str", || Status::describe(status))
}

/// Description of an `EnrollStatus` code
#[unsafe(no_mangle)]
pub extern "C" fn rsid_enroll_status_str(status: c_int) -> *const c_char {
    guarded_str("rsid_enroll_status_str", || EnrollStatus::describe(status))
}

/// Description of an `AuthenticateStatus` code
#[unsafe(no_mangle)]
pub extern "C" fn rsid_auth_status_str(status: c_int) -> *const c_char {
    guarded_str("rsid_auth_status_str", || AuthenticateStatus::describe(status))
}
