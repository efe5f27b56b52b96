//! Bitmap handling for decoded images and audio

use crate::error::MtmdError;
use crate::session::SessionContext;
use llama_mtmd_sys as sys;
use std::ffi::{CStr, CString};
use std::ptr::NonNull;

/// What a bitmap's buffer holds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BitmapKind {
    /// RGB image data
    Image,
    /// PCM F32 audio samples
    Audio,
}

/// A decoded image or audio buffer, exclusive owner of one native handle.
///
/// A bitmap is either bound to a native buffer or disposed; there is no
/// partial state. Accessors on a disposed bitmap fail with
/// [`MtmdError::BitmapDisposed`], and [`Bitmap::dispose`] may be called any
/// number of times.
#[derive(Debug)]
pub struct Bitmap {
    ptr: Option<NonNull<sys::mtmd_bitmap>>,
}

impl Bitmap {
    /// Decode an encoded media buffer (PNG, JPEG, WAV, ...) into a bitmap.
    ///
    /// Fails when `session` has no multimodal sub-context bound, or when the
    /// external decoder rejects the buffer.
    pub fn from_encoded_buffer(session: &SessionContext, buf: &[u8]) -> Result<Self, MtmdError> {
        let mctx = session.multimodal_required()?;

        let ptr = unsafe {
            sys::mtmd_helper_bitmap_init_from_buf(mctx.as_ptr().as_ptr(), buf.as_ptr(), buf.len())
        };

        NonNull::new(ptr)
            .map(|ptr| Self { ptr: Some(ptr) })
            .ok_or(MtmdError::DecodeFailed)
    }

    /// Create an image bitmap from raw RGB data.
    ///
    /// `data` must be `width * height * 3` bytes in RGBRGB... order.
    pub fn from_rgb(width: u32, height: u32, data: &[u8]) -> Result<Self, MtmdError> {
        let expected = width as usize * height as usize * 3;
        if data.len() != expected {
            return Err(MtmdError::InvalidImageDimensions { width, height });
        }

        let ptr = unsafe { sys::mtmd_bitmap_init(width, height, data.as_ptr()) };

        NonNull::new(ptr)
            .map(|ptr| Self { ptr: Some(ptr) })
            .ok_or(MtmdError::InitializationFailed)
    }

    /// Create an audio bitmap from PCM F32 samples
    pub fn from_audio(samples: &[f32]) -> Result<Self, MtmdError> {
        if samples.is_empty() {
            return Err(MtmdError::InvalidAudioSamples { count: 0 });
        }

        let ptr = unsafe { sys::mtmd_bitmap_init_from_audio(samples.len(), samples.as_ptr()) };

        NonNull::new(ptr)
            .map(|ptr| Self { ptr: Some(ptr) })
            .ok_or(MtmdError::InitializationFailed)
    }

    fn handle(&self) -> Result<NonNull<sys::mtmd_bitmap>, MtmdError> {
        self.ptr.ok_or(MtmdError::BitmapDisposed)
    }

    /// Borrow the native handle for a deep copy or a pointer snapshot
    pub(crate) fn raw(&self) -> Result<NonNull<sys::mtmd_bitmap>, MtmdError> {
        self.handle()
    }

    /// A fresh copy of the buffer contents.
    ///
    /// Image copies are sized `width * height * 3`; the 3-byte-per-pixel
    /// layout is assumed, not validated. Audio copies carry the full sample
    /// byte length.
    pub fn data(&self) -> Result<Vec<u8>, MtmdError> {
        let ptr = self.handle()?;

        unsafe {
            let data = sys::mtmd_bitmap_get_data(ptr.as_ptr());
            if data.is_null() {
                return Err(MtmdError::NullPointer);
            }

            let len = if sys::mtmd_bitmap_is_audio(ptr.as_ptr()) {
                sys::mtmd_bitmap_get_n_bytes(ptr.as_ptr())
            } else {
                let nx = sys::mtmd_bitmap_get_nx(ptr.as_ptr()) as usize;
                let ny = sys::mtmd_bitmap_get_ny(ptr.as_ptr()) as usize;
                nx * ny * 3
            };

            Ok(std::slice::from_raw_parts(data, len).to_vec())
        }
    }

    /// Decoder-reported `(width, height)`, or `(samples, 1)` for audio
    pub fn dimensions(&self) -> Result<(u32, u32), MtmdError> {
        let ptr = self.handle()?;
        unsafe {
            Ok((
                sys::mtmd_bitmap_get_nx(ptr.as_ptr()),
                sys::mtmd_bitmap_get_ny(ptr.as_ptr()),
            ))
        }
    }

    /// Whether this bitmap holds audio samples
    pub fn is_audio(&self) -> Result<bool, MtmdError> {
        let ptr = self.handle()?;
        Ok(unsafe { sys::mtmd_bitmap_is_audio(ptr.as_ptr()) })
    }

    /// The kind of buffer this bitmap holds
    pub fn kind(&self) -> Result<BitmapKind, MtmdError> {
        Ok(if self.is_audio()? {
            BitmapKind::Audio
        } else {
            BitmapKind::Image
        })
    }

    /// The identifier set on this bitmap, if any
    pub fn id(&self) -> Result<Option<String>, MtmdError> {
        let ptr = self.handle()?;
        unsafe {
            let id = sys::mtmd_bitmap_get_id(ptr.as_ptr());
            if id.is_null() {
                Ok(None)
            } else {
                Ok(Some(CStr::from_ptr(id).to_str()?.to_string()))
            }
        }
    }

    /// Set an identifier (used by the engine for media caching)
    pub fn set_id(&mut self, id: &str) -> Result<(), MtmdError> {
        let ptr = self.handle()?;
        let c_id = CString::new(id)?;
        unsafe {
            sys::mtmd_bitmap_set_id(ptr.as_ptr(), c_id.as_ptr());
        }
        Ok(())
    }

    /// Whether the native handle was already released
    pub fn is_disposed(&self) -> bool {
        self.ptr.is_none()
    }

    /// Release the native handle. Subsequent calls are no-ops.
    pub fn dispose(&mut self) {
        if let Some(ptr) = self.ptr.take() {
            unsafe {
                sys::mtmd_bitmap_free(ptr.as_ptr());
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn disposed_for_test() -> Self {
        Self { ptr: None }
    }
}

impl Drop for Bitmap {
    fn drop(&mut self) {
        self.dispose();
    }
}

// Safety: Bitmap can be sent between threads
unsafe impl Send for Bitmap {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rgb_buffer_length_is_validated_before_any_native_call() {
        let err = Bitmap::from_rgb(4, 4, &[0u8; 10]).unwrap_err();
        assert!(matches!(
            err,
            MtmdError::InvalidImageDimensions {
                width: 4,
                height: 4
            }
        ));
    }

    #[test]
    fn empty_audio_is_rejected_before_any_native_call() {
        let err = Bitmap::from_audio(&[]).unwrap_err();
        assert!(matches!(err, MtmdError::InvalidAudioSamples { count: 0 }));
    }

    #[test]
    fn dispose_is_idempotent() {
        let mut bitmap = Bitmap::disposed_for_test();
        bitmap.dispose();
        bitmap.dispose();
        assert!(bitmap.is_disposed());
    }

    #[test]
    fn accessors_fail_uniformly_after_disposal() {
        let mut bitmap = Bitmap::disposed_for_test();

        assert!(matches!(
            bitmap.data().unwrap_err(),
            MtmdError::BitmapDisposed
        ));
        assert!(matches!(
            bitmap.dimensions().unwrap_err(),
            MtmdError::BitmapDisposed
        ));
        assert!(matches!(bitmap.id().unwrap_err(), MtmdError::BitmapDisposed));
        assert!(matches!(
            bitmap.set_id("img-1").unwrap_err(),
            MtmdError::BitmapDisposed
        ));
        assert!(matches!(
            bitmap.kind().unwrap_err(),
            MtmdError::BitmapDisposed
        ));
    }
}
