/// Decoded sprite sheet. One square cell per sprite code, counted row-major
/// from the top-left, code 0 included (the renderer simply never asks for
/// empty tiles).
#[derive(Debug, Clone)]
pub struct TileAtlas {
    width: u32,
    height: u32,
    tile_size_px: u32,
    columns: u32,
    rows: u32,
    rgba: Vec<u8>,
}

impl TileAtlas {
    /// `rgba` must hold `width * height * 4` bytes. Partial cells at the
    /// right or bottom edge are ignored.
    pub(crate) fn from_rgba(width: u32, height: u32, tile_size_px: u32, rgba: Vec<u8>) -> Self {
        Self {
            width,
            height,
            tile_size_px,
            columns: width / tile_size_px,
            rows: height / tile_size_px,
            rgba,
        }
    }

    pub fn tile_size_px(&self) -> u32 {
        self.tile_size_px
    }

    pub fn cell_count(&self) -> u32 {
        self.columns * self.rows
    }

    /// Top-left pixel of the cell for `code`, or `None` when the code lies
    /// beyond the sheet.
    pub fn sprite_origin(&self, code: u16) -> Option<(u32, u32)> {
        let code = u32::from(code);
        if self.columns == 0 || code >= self.cell_count() {
            return None;
        }
        Some((
            (code % self.columns) * self.tile_size_px,
            (code / self.columns) * self.tile_size_px,
        ))
    }

    /// RGBA at an absolute atlas coordinate. Out-of-range reads come back
    /// transparent rather than panicking.
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        if x >= self.width || y >= self.height {
            return [0, 0, 0, 0];
        }
        let offset = (y as usize * self.width as usize + x as usize) * 4;
        match self.rgba.get(offset..offset + 4) {
            Some(bytes) => [bytes[0], bytes[1], bytes[2], bytes[3]],
            None => [0, 0, 0, 0],
        }
    }
}
