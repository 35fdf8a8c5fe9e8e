//! Boolean raster masks returned by the segmentation model.

/// A row-major boolean raster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaskBitmap {
    width: u32,
    height: u32,
    data: Vec<bool>,
}

impl MaskBitmap {
    /// Create an all-false mask.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![false; (width as usize) * (height as usize)],
        }
    }

    /// Create a mask from row-major data. Returns `None` on a size mismatch.
    pub fn from_vec(width: u32, height: u32, data: Vec<bool>) -> Option<Self> {
        if data.len() != (width as usize) * (height as usize) {
            return None;
        }
        Some(Self {
            width,
            height,
            data,
        })
    }

    /// Create a mask by evaluating `f(x, y)` for every pixel.
    pub fn from_fn(width: u32, height: u32, mut f: impl FnMut(u32, u32) -> bool) -> Self {
        let mut data = Vec::with_capacity((width as usize) * (height as usize));
        for y in 0..height {
            for x in 0..width {
                data.push(f(x, y));
            }
        }
        Self {
            width,
            height,
            data,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Pixel value; out-of-bounds reads are false.
    pub fn get(&self, x: i64, y: i64) -> bool {
        if x < 0 || y < 0 || x >= i64::from(self.width) || y >= i64::from(self.height) {
            return false;
        }
        self.data[(y as usize) * (self.width as usize) + (x as usize)]
    }

    pub fn set(&mut self, x: u32, y: u32, value: bool) {
        if x < self.width && y < self.height {
            self.data[(y as usize) * (self.width as usize) + (x as usize)] = value;
        }
    }

    /// Number of set pixels.
    pub fn area(&self) -> u64 {
        self.data.iter().filter(|v| **v).count() as u64
    }

    pub fn is_empty(&self) -> bool {
        !self.data.iter().any(|v| *v)
    }

    /// Tight pixel bounding box `[x, y, width, height]` of the set pixels.
    pub fn bounds(&self) -> Option<[u32; 4]> {
        let mut min_x = u32::MAX;
        let mut min_y = u32::MAX;
        let mut max_x = 0;
        let mut max_y = 0;
        let mut found = false;
        for y in 0..self.height {
            for x in 0..self.width {
                if self.data[(y as usize) * (self.width as usize) + (x as usize)] {
                    found = true;
                    min_x = min_x.min(x);
                    min_y = min_y.min(y);
                    max_x = max_x.max(x);
                    max_y = max_y.max(y);
                }
            }
        }
        found.then(|| [min_x, min_y, max_x - min_x + 1, max_y - min_y + 1])
    }

    /// Run lengths over the mask in column-major order, starting with a run
    /// of unset pixels (which may be zero).
    pub fn column_major_runs(&self) -> Vec<u64> {
        let mut counts = Vec::new();
        let mut current = false;
        let mut run = 0u64;
        for x in 0..self.width {
            for y in 0..self.height {
                let value = self.data[(y as usize) * (self.width as usize) + (x as usize)];
                if value != current {
                    counts.push(run);
                    run = 0;
                    current = value;
                }
                run += 1;
            }
        }
        counts.push(run);
        counts
    }
}
