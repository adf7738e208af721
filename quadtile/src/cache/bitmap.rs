//! Bitmap abstraction.
//!
//! The cache never touches pixels itself. Decoded tiles are handed to a
//! caller-supplied [`BitmapFactory`] which turns raw RGBA8 pixels into
//! whatever texture or image type the renderer draws with.

/// A decoded tile image owned by the renderer's graphics layer.
///
/// Dropping the last reference releases the bitmap's resources.
pub trait Bitmap: Send + Sync + 'static {
    /// Width and height in pixels.
    fn dimensions(&self) -> (u32, u32);
}

/// Creates bitmaps from decoded pixels.
///
/// Called from worker threads, so implementations must be thread-safe.
pub trait BitmapFactory: Send + Sync + 'static {
    /// The bitmap type produced.
    type Bitmap: Bitmap;

    /// Builds a bitmap from tightly packed RGBA8 pixels.
    ///
    /// Ownership of `pixels` moves into the factory.
    fn create(&self, width: u32, height: u32, pixels: Vec<u8>) -> Self::Bitmap;
}

/// Plain in-memory RGBA8 bitmap.
///
/// Useful for headless operation and tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RgbaBitmap {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl Bitmap for RgbaBitmap {
    fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

/// Factory producing [`RgbaBitmap`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct RgbaBitmapFactory;

impl BitmapFactory for RgbaBitmapFactory {
    type Bitmap = RgbaBitmap;

    fn create(&self, width: u32, height: u32, pixels: Vec<u8>) -> RgbaBitmap {
        RgbaBitmap {
            width,
            height,
            pixels,
        }
    }
}
