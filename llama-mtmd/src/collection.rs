//! Ordered collections of independently owned bitmap copies

use crate::bitmap::Bitmap;
use crate::error::MtmdError;
use llama_mtmd_sys as sys;
use std::ptr::NonNull;

/// An ordered batch of bitmaps for tokenization.
///
/// Every [`add`](BitmapCollection::add) deep-copies the source bitmap's
/// buffer and identifier into a freshly allocated native handle owned by the
/// collection, so the source may be disposed independently at any point
/// afterwards.
#[derive(Debug, Default)]
pub struct BitmapCollection {
    entries: Vec<OwnedBitmap>,
}

/// One owned deep copy inside a collection
#[derive(Debug)]
struct OwnedBitmap(NonNull<sys::mtmd_bitmap>);

impl Drop for OwnedBitmap {
    fn drop(&mut self) {
        unsafe {
            sys::mtmd_bitmap_free(self.0.as_ptr());
        }
    }
}

impl BitmapCollection {
    /// Create an empty collection
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a deep copy of `bitmap`.
    ///
    /// Fails with [`MtmdError::BitmapDisposed`] before any native call if the
    /// source was already disposed.
    pub fn add(&mut self, bitmap: &Bitmap) -> Result<(), MtmdError> {
        let src = bitmap.raw()?;

        let copy = unsafe {
            let data = sys::mtmd_bitmap_get_data(src.as_ptr());

            if sys::mtmd_bitmap_is_audio(src.as_ptr()) {
                let n_bytes = sys::mtmd_bitmap_get_n_bytes(src.as_ptr());
                let n_samples = n_bytes / std::mem::size_of::<f32>();
                sys::mtmd_bitmap_init_from_audio(n_samples, data.cast())
            } else {
                let nx = sys::mtmd_bitmap_get_nx(src.as_ptr());
                let ny = sys::mtmd_bitmap_get_ny(src.as_ptr());
                sys::mtmd_bitmap_init(nx, ny, data)
            }
        };

        let copy = NonNull::new(copy).ok_or(MtmdError::NullPointer)?;

        // Carry the identifier over; the native setter copies the string.
        unsafe {
            let id = sys::mtmd_bitmap_get_id(src.as_ptr());
            if !id.is_null() {
                sys::mtmd_bitmap_set_id(copy.as_ptr(), id);
            }
        }

        self.entries.push(OwnedBitmap(copy));
        Ok(())
    }

    /// Number of owned copies
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the collection holds no bitmaps
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Release every owned copy. Safe to call repeatedly.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Read-only snapshot of the native pointers, borrowed for the duration
    /// of a tokenize call. The collection must outlive the returned vector.
    pub(crate) fn pointer_snapshot(&self) -> Vec<*const sys::mtmd_bitmap> {
        self.entries
            .iter()
            .map(|entry| entry.0.as_ptr().cast_const())
            .collect()
    }
}

// Safety: the collection exclusively owns its native copies
unsafe impl Send for BitmapCollection {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_collection_is_empty() {
        let collection = BitmapCollection::new();
        assert_eq!(collection.len(), 0);
        assert!(collection.is_empty());
        assert!(collection.pointer_snapshot().is_empty());
    }

    #[test]
    fn adding_a_disposed_bitmap_fails_without_touching_the_collection() {
        let mut collection = BitmapCollection::new();
        let disposed = Bitmap::disposed_for_test();

        let err = collection.add(&disposed).unwrap_err();
        assert!(matches!(err, MtmdError::BitmapDisposed));
        assert_eq!(collection.len(), 0);
    }

    #[test]
    fn clear_is_idempotent_on_an_empty_collection() {
        let mut collection = BitmapCollection::new();
        collection.clear();
        collection.clear();
        assert!(collection.is_empty());
    }
}
