use macroquad::texture::Image;

/// Pixel rectangle inside an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(missing_docs)]
pub struct TileRegion {
    pub start_x: u32,
    pub start_y: u32,
    pub width: u32,
    pub height: u32,
}

impl TileRegion {
    /// Region of `width` x `height` pixels starting at (`start_x`, `start_y`).
    pub fn new(start_x: u32, start_y: u32, width: u32, height: u32) -> Self {
        TileRegion {
            start_x,
            start_y,
            width,
            height,
        }
    }

    /// Whether the region lies entirely inside `image`.
    pub fn fits_in(&self, image: &Image) -> bool {
        let (w, h) = image_size(image);
        self.start_x
            .checked_add(self.width)
            .is_some_and(|right| right <= w)
            && self
                .start_y
                .checked_add(self.height)
                .is_some_and(|bottom| bottom <= h)
    }
}

/// Copy of one tile block from a source image into a destination image.
pub struct BlitCommand {
    /// Block to copy from the source
    pub src: TileRegion,
    /// Top-left pixel in the destination
    pub dest: (u32, u32),
}

impl BlitCommand {
    /// Both regions must already be checked with [`TileRegion::fits_in`].
    pub fn apply(&self, source: &Image, target: &mut Image) {
        let src_stride = source.width() * 4;
        let dst_stride = target.width() * 4;
        let row_bytes = self.src.width as usize * 4;

        for row in 0..self.src.height as usize {
            let s = (self.src.start_y as usize + row) * src_stride + self.src.start_x as usize * 4;
            let d = (self.dest.1 as usize + row) * dst_stride + self.dest.0 as usize * 4;
            target.bytes[d..d + row_bytes].copy_from_slice(&source.bytes[s..s + row_bytes]);
        }
    }
}

#[inline]
pub fn image_size(image: &Image) -> (u32, u32) {
    (image.width() as u32, image.height() as u32)
}

/// RGBA bytes at (x, y).
#[inline]
pub fn pixel(image: &Image, x: u32, y: u32) -> [u8; 4] {
    let i = (y as usize * image.width() + x as usize) * 4;
    [
        image.bytes[i],
        image.bytes[i + 1],
        image.bytes[i + 2],
        image.bytes[i + 3],
    ]
}

#[inline]
pub fn put_pixel(image: &mut Image, x: u32, y: u32, rgba: [u8; 4]) {
    let i = (y as usize * image.width() + x as usize) * 4;
    image.bytes[i..i + 4].copy_from_slice(&rgba);
}
