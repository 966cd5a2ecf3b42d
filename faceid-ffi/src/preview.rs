//! `rsid_*` preview functions
//!
//! A handle owns its preview backend and the registration of its C callback.
//! Starting a handle again replaces only that handle's callback. Backends are
//! created by the factory installed with [`install_preview_factory`].
//!
//! Every entry point returns `1` on success and `0` on failure (or a null
//! handle from [`rsid_create_preview`]); panics are caught and reported as
//! failures.

use std::ffi::c_void;
use std::os::raw::c_int;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, warn};

use faceid::{Preview, PreviewConfig, PreviewImageReadyCallback};
use faceid_core::PreviewMode;
use faceid_types::ImageRef;

use crate::image::{image_mut, image_ref, rsid_image, to_c};

/// Builds a preview backend for a configuration
pub type PreviewFactory = dyn Fn(PreviewConfig) -> faceid::Result<Box<dyn Preview>> + Send + Sync;

static FACTORY: RwLock<Option<Arc<PreviewFactory>>> = RwLock::new(None);

/// Install the backend used by [`rsid_create_preview`], replacing any
/// previous one. Existing handles keep their backend.
pub fn install_preview_factory<F>(factory: F)
where
    F: Fn(PreviewConfig) -> faceid::Result<Box<dyn Preview>> + Send + Sync + 'static,
{
    *FACTORY.write() = Some(Arc::new(factory));
    debug!("Preview factory installed");
}

/// Remove the installed backend; later creations return null
pub fn clear_preview_factory() {
    FACTORY.write().take();
}

#[allow(non_camel_case_types)]
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct rsid_preview_config {
    pub camera_number: c_int,
    pub preview_mode: c_int,
}

#[allow(non_camel_case_types)]
pub type rsid_preview_clbk = Option<extern "C" fn(image: rsid_image, ctx: *mut c_void)>;

/// Opaque preview handle
#[allow(non_camel_case_types)]
pub struct rsid_preview {
    preview: Box<dyn Preview>,
    callback: Option<Arc<CPreviewCallback>>,
}

struct CPreviewCallback {
    clbk: rsid_preview_clbk,
    ctx: *mut c_void,
}

// SAFETY: the C caller registering `ctx` guarantees it may be used from the
// thread delivering preview frames.
unsafe impl Send for CPreviewCallback {}
unsafe impl Sync for CPreviewCallback {}

impl PreviewImageReadyCallback for CPreviewCallback {
    fn on_preview_image_ready(&self, image: ImageRef<'_>) {
        if let Some(clbk) = self.clbk {
            clbk(to_c(&image), self.ctx);
        }
    }
}

fn guarded<T>(name: &str, failure: T, f: impl FnOnce() -> T) -> T {
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(rv) => rv,
        Err(_) => {
            warn!("Panic caught in {}", name);
            failure
        }
    }
}

fn status(name: &str, result: faceid::Result<()>) -> c_int {
    match result {
        Ok(()) => 1,
        Err(e) => {
            debug!("{} failed: {}", name, e);
            0
        }
    }
}

fn build_preview(
    config: &rsid_preview_config,
    factory: Option<Arc<PreviewFactory>>,
) -> Option<Box<rsid_preview>> {
    let Ok(preview_mode) = PreviewMode::try_from(config.preview_mode) else {
        warn!(mode = config.preview_mode, "Unknown preview mode");
        return None;
    };

    let Some(factory) = factory else {
        warn!("No preview backend installed");
        return None;
    };

    let config = PreviewConfig {
        camera_number: config.camera_number,
        preview_mode,
    };

    match factory(config) {
        Ok(preview) => Some(Box::new(rsid_preview {
            preview,
            callback: None,
        })),
        Err(e) => {
            warn!("Preview creation failed: {}", e);
            None
        }
    }
}

/// Create a preview handle, or null on failure.
///
/// # Safety
///
/// `preview_config` must be null or point to a valid `rsid_preview_config`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn rsid_create_preview(
    preview_config: *const rsid_preview_config,
) -> *mut rsid_preview {
    guarded("rsid_create_preview", std::ptr::null_mut(), || {
        // SAFETY: null or valid per the contract above
        let Some(config) = (unsafe { preview_config.as_ref() }) else {
            return std::ptr::null_mut();
        };

        let factory = FACTORY.read().clone();
        build_preview(config, factory).map_or(std::ptr::null_mut(), Box::into_raw)
    })
}

/// Stop and release a preview handle; null is ignored.
///
/// # Safety
///
/// `preview_handle` must be null or a handle returned by
/// [`rsid_create_preview`] that has not been destroyed.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn rsid_destroy_preview(preview_handle: *mut rsid_preview) {
    if preview_handle.is_null() {
        return;
    }

    // SAFETY: ownership returns to Rust exactly once per the contract above
    let mut handle = unsafe { Box::from_raw(preview_handle) };
    guarded("rsid_destroy_preview", (), move || {
        if let Err(e) = handle.preview.stop() {
            debug!("Stop on destroy failed: {}", e);
        }
        handle.callback = None;
    });
}

/// Run `f` on a live handle; null gives 0
///
/// # Safety
///
/// `preview_handle` must be null or a live handle not used concurrently.
unsafe fn with_handle(
    name: &str,
    preview_handle: *mut rsid_preview,
    f: impl FnOnce(&mut rsid_preview) -> c_int,
) -> c_int {
    // SAFETY: upheld by the caller
    let Some(handle) = (unsafe { preview_handle.as_mut() }) else {
        return 0;
    };
    guarded(name, 0, || f(handle))
}

/// Start streaming frames to `clbk`, replacing this handle's previous
/// callback.
///
/// # Safety
///
/// `preview_handle` must be null or a live handle; `ctx` must stay valid
/// until the preview is stopped, restarted or destroyed.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn rsid_start_preview(
    preview_handle: *mut rsid_preview,
    clbk: rsid_preview_clbk,
    ctx: *mut c_void,
) -> c_int {
    // SAFETY: forwarded contract
    unsafe {
        with_handle("rsid_start_preview", preview_handle, |handle| {
            let callback = Arc::new(CPreviewCallback { clbk, ctx });
            let rv = status(
                "rsid_start_preview",
                handle.preview.start(callback.clone()),
            );
            if rv == 1 {
                handle.callback = Some(callback);
            }
            rv
        })
    }
}

/// # Safety
///
/// `preview_handle` must be null or a live handle.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn rsid_pause_preview(preview_handle: *mut rsid_preview) -> c_int {
    // SAFETY: forwarded contract
    unsafe {
        with_handle("rsid_pause_preview", preview_handle, |handle| {
            status("rsid_pause_preview", handle.preview.pause())
        })
    }
}

/// # Safety
///
/// `preview_handle` must be null or a live handle.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn rsid_resume_preview(preview_handle: *mut rsid_preview) -> c_int {
    // SAFETY: forwarded contract
    unsafe {
        with_handle("rsid_resume_preview", preview_handle, |handle| {
            status("rsid_resume_preview", handle.preview.resume())
        })
    }
}

/// Stop streaming and release this handle's callback.
///
/// # Safety
///
/// `preview_handle` must be null or a live handle.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn rsid_stop_preview(preview_handle: *mut rsid_preview) -> c_int {
    // SAFETY: forwarded contract
    unsafe {
        with_handle("rsid_stop_preview", preview_handle, |handle| {
            let rv = status("rsid_stop_preview", handle.preview.stop());
            if rv == 1 {
                handle.callback = None;
            }
            rv
        })
    }
}

/// Convert a RAW10 frame to RGB24. On success `out_c_img` is rewritten to
/// describe the converted frame in its own buffer.
///
/// # Safety
///
/// `preview_handle` must be null or a live handle. Non-null image pointers
/// must point to valid images whose buffers hold `size` bytes; the two
/// buffers must not overlap.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn rsid_raw_to_rgb(
    preview_handle: *mut rsid_preview,
    in_c_img: *const rsid_image,
    out_c_img: *mut rsid_image,
) -> c_int {
    if in_c_img.is_null() || out_c_img.is_null() {
        return 0;
    }

    // SAFETY: forwarded contract
    unsafe {
        with_handle("rsid_raw_to_rgb", preview_handle, |handle| {
            let input = image_ref(&*in_c_img);
            let mut output = image_mut(&*out_c_img);

            let rv = status(
                "rsid_raw_to_rgb",
                handle.preview.raw_to_rgb(&input, &mut output),
            );
            if rv == 1 {
                *out_c_img = to_c(&output.view());
            }
            rv
        })
    }
}
