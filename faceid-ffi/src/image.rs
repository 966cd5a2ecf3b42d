//! C mirrors of the preview image types
//!
//! Header fields are copied by value in both directions. Pixel buffers are
//! never copied: a C image is re-borrowed as a Rust slice of `size` bytes and
//! a Rust image hands its slice pointer back to C.
//!
//! A null C buffer is borrowed as an empty slice at `NonNull::dangling()`,
//! and that address goes back to C as null. Any other pointer, including a
//! non-null one with `size == 0`, goes back unchanged.

use std::os::raw::{c_uchar, c_uint};
use std::ptr::{self, NonNull};
use std::slice;

use faceid_types::{Image, ImageMetadata, ImageMut, ImageRef};

#[allow(non_camel_case_types)]
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct rsid_image_metadata {
    pub led: bool,
    pub projector: bool,
    pub sensor_id: c_uint,
    pub status: c_uint,
    pub timestamp: c_uint,
}

#[allow(non_camel_case_types)]
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct rsid_image {
    pub buffer: *mut c_uchar,
    pub size: c_uint,
    pub width: c_uint,
    pub height: c_uint,
    pub stride: c_uint,
    pub number: c_uint,
    pub metadata: rsid_image_metadata,
}

impl Default for rsid_image {
    fn default() -> Self {
        Self {
            buffer: ptr::null_mut(),
            size: 0,
            width: 0,
            height: 0,
            stride: 0,
            number: 0,
            metadata: rsid_image_metadata::default(),
        }
    }
}

impl From<rsid_image_metadata> for ImageMetadata {
    fn from(m: rsid_image_metadata) -> Self {
        Self {
            led: m.led,
            projector: m.projector,
            sensor_id: m.sensor_id,
            status: m.status,
            timestamp: m.timestamp,
        }
    }
}

impl From<ImageMetadata> for rsid_image_metadata {
    fn from(m: ImageMetadata) -> Self {
        Self {
            led: m.led,
            projector: m.projector,
            sensor_id: m.sensor_id,
            status: m.status,
            timestamp: m.timestamp,
        }
    }
}

/// Borrow a C image.
///
/// # Safety
///
/// When `img.buffer` is not null it must point to `img.size` readable bytes
/// that stay valid and unmodified for `'a`.
pub unsafe fn image_ref<'a>(img: &rsid_image) -> ImageRef<'a> {
    // SAFETY: non-null buffers are upheld by the caller; the dangling
    // pointer is valid for an empty slice
    let buffer: &'a [u8] = unsafe { slice::from_raw_parts(c_buffer(img), c_len(img)) };
    with_header(buffer, img)
}

/// Mutably borrow a C image; `size` is the capacity of the buffer.
///
/// # Safety
///
/// When `img.buffer` is not null it must point to `img.size` writable bytes,
/// not aliased by any other live reference, valid for `'a`.
pub unsafe fn image_mut<'a>(img: &rsid_image) -> ImageMut<'a> {
    // SAFETY: as in `image_ref`
    let buffer: &'a mut [u8] =
        unsafe { slice::from_raw_parts_mut(c_buffer(img), c_len(img)) };
    with_header(buffer, img)
}

/// Pointer a slice can start at; null becomes dangling with length 0
fn c_buffer(img: &rsid_image) -> *mut u8 {
    if img.buffer.is_null() {
        // a null buffer carries no bytes whatever `size` claims
        return NonNull::dangling().as_ptr();
    }
    img.buffer
}

fn c_len(img: &rsid_image) -> usize {
    if img.buffer.is_null() { 0 } else { img.size as usize }
}

fn with_header<B>(buffer: B, img: &rsid_image) -> Image<B> {
    Image {
        buffer,
        size: img.size,
        width: img.width,
        height: img.height,
        stride: img.stride,
        number: img.number,
        metadata: img.metadata.into(),
    }
}

/// C view of a Rust image; a dangling empty buffer becomes a null pointer
pub fn to_c(image: &ImageRef<'_>) -> rsid_image {
    let data = image.buffer.as_ptr().cast_mut();
    let buffer = if image.buffer.is_empty() && data == NonNull::dangling().as_ptr() {
        ptr::null_mut()
    } else {
        data
    };

    rsid_image {
        buffer,
        size: image.size,
        width: image.width,
        height: image.height,
        stride: image.stride,
        number: image.number,
        metadata: image.metadata.into(),
    }
}
