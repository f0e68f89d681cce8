//! Monochrome frame buffer
use log::debug;

/// Width of the display in its default resolution
pub const LOW_RES_WIDTH: usize = 64;
/// Height of the display in its default resolution
pub const LOW_RES_HEIGHT: usize = 32;
/// Width of the display in high-resolution mode
pub const HIGH_RES_WIDTH: usize = 128;
/// Height of the display in high-resolution mode
pub const HIGH_RES_HEIGHT: usize = 64;

/// Behavior of sprite pixels that fall past the right or bottom edge
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Edge {
    /// Pixels reappear on the opposite edge
    Wrap,
    /// Pixels are discarded
    Clip,
}

/// Grid of on/off pixels, drawn by XOR
#[derive(Clone, Debug)]
pub struct Display {
    width: usize,
    height: usize,
    pixels: Vec<bool>,
}

impl Default for Display {
    fn default() -> Self {
        Self::new()
    }
}

impl Display {
    /// Builds a blank low-resolution display
    pub fn new() -> Self {
        Self {
            width: LOW_RES_WIDTH,
            height: LOW_RES_HEIGHT,
            pixels: vec![false; LOW_RES_WIDTH * LOW_RES_HEIGHT],
        }
    }

    /// Current width, in pixels
    pub fn width(&self) -> usize {
        self.width
    }

    /// Current height, in pixels
    pub fn height(&self) -> usize {
        self.height
    }

    /// Checks whether high-resolution mode is active
    pub fn is_high_resolution(&self) -> bool {
        self.width == HIGH_RES_WIDTH
    }

    /// Turns every pixel off
    pub fn clear(&mut self) {
        self.pixels.fill(false);
    }

    /// Switches resolution, keeping the picture
    ///
    /// Going up, each pixel becomes a 2×2 block; going down, each 2×2 block
    /// takes the value of its top-left pixel.  Callers that want a blank
    /// screen follow this with [`Display::clear`].
    pub fn set_high_resolution(&mut self, hires: bool) {
        if hires == self.is_high_resolution() {
            return;
        }
        let (w, h, scale_up) = if hires {
            (HIGH_RES_WIDTH, HIGH_RES_HEIGHT, true)
        } else {
            (LOW_RES_WIDTH, LOW_RES_HEIGHT, false)
        };
        debug!("display resolution set to {w}x{h}");
        let old = std::mem::take(&mut self.pixels);
        let old_width = self.width;
        self.pixels = (0..w * h)
            .map(|k| {
                let (x, y) = (k % w, k / w);
                if scale_up {
                    old[(y / 2) * old_width + x / 2]
                } else {
                    old[(y * 2) * old_width + x * 2]
                }
            })
            .collect();
        self.width = w;
        self.height = h;
    }

    /// XORs an 8-pixel-wide sprite onto the display
    ///
    /// The origin is taken modulo the display size.  Returns the number of
    /// rows in which a pixel was turned off.
    pub fn draw(
        &mut self,
        x: usize,
        y: usize,
        rows: &[u8],
        edge: Edge,
    ) -> usize {
        self.blit(x, y, rows.iter().map(|r| u16::from(*r) << 8), 8, edge)
    }

    /// XORs a 16-pixel-wide sprite onto the display
    ///
    /// Same semantics as [`Display::draw`].
    pub fn draw_wide(
        &mut self,
        x: usize,
        y: usize,
        rows: &[u16],
        edge: Edge,
    ) -> usize {
        self.blit(x, y, rows.iter().copied(), 16, edge)
    }

    /// Number of sprite rows starting at `y` that fall below the bottom edge
    /// and are discarded under [`Edge::Clip`]
    pub fn clipped_rows(&self, y: usize, rows: usize, edge: Edge) -> usize {
        match edge {
            Edge::Clip => (y % self.height + rows).saturating_sub(self.height),
            Edge::Wrap => 0,
        }
    }

    /// Shared sprite blitter; each row is left-aligned in a `u16`
    fn blit<I: Iterator<Item = u16>>(
        &mut self,
        x: usize,
        y: usize,
        rows: I,
        row_width: usize,
        edge: Edge,
    ) -> usize {
        let x = x % self.width;
        let y = y % self.height;
        let mut collided_rows = 0;
        for (dy, row) in rows.enumerate() {
            let mut py = y + dy;
            if py >= self.height {
                match edge {
                    Edge::Clip => break,
                    Edge::Wrap => py %= self.height,
                }
            }
            let mut collision = false;
            for dx in 0..row_width {
                if row & (0x8000 >> dx) == 0 {
                    continue;
                }
                let mut px = x + dx;
                if px >= self.width {
                    match edge {
                        Edge::Clip => break,
                        Edge::Wrap => px %= self.width,
                    }
                }
                let p = &mut self.pixels[py * self.width + px];
                collision |= *p;
                *p = !*p;
            }
            collided_rows += usize::from(collision);
        }
        collided_rows
    }

    /// Moves the picture down by `n` rows, blanking the rows exposed at the top
    pub fn scroll_down(&mut self, n: usize) {
        let n = n.min(self.height) * self.width;
        self.pixels.rotate_right(n);
        self.pixels[..n].fill(false);
    }

    /// Moves the picture right by 4 pixels
    pub fn scroll_right(&mut self) {
        let w = self.width;
        for row in self.pixels.chunks_exact_mut(w) {
            row.rotate_right(4);
            row[..4].fill(false);
        }
    }

    /// Moves the picture left by 4 pixels
    pub fn scroll_left(&mut self) {
        let w = self.width;
        for row in self.pixels.chunks_exact_mut(w) {
            row.rotate_left(4);
            row[w - 4..].fill(false);
        }
    }

    /// Copies the current contents into an owned [`Frame`]
    pub fn snapshot(&self) -> Frame {
        Frame {
            width: self.width,
            height: self.height,
            pixels: self.pixels.clone(),
        }
    }
}

/// Immutable copy of the display, handed to the host
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Frame {
    width: usize,
    height: usize,
    pixels: Vec<bool>,
}

impl Frame {
    /// Width, in pixels
    pub fn width(&self) -> usize {
        self.width
    }

    /// Height, in pixels
    pub fn height(&self) -> usize {
        self.height
    }

    /// Reads a pixel; coordinates outside the frame read as off
    pub fn get(&self, x: usize, y: usize) -> bool {
        x < self.width && y < self.height && self.pixels[y * self.width + x]
    }

    /// Number of pixels that are on
    pub fn lit(&self) -> usize {
        self.pixels.iter().filter(|p| **p).count()
    }

    /// Pixels in row-major order
    pub fn pixels(&self) -> &[bool] {
        &self.pixels
    }
}

impl std::fmt::Display for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for row in self.pixels.chunks_exact(self.width) {
            for p in row {
                f.write_str(if *p { "#" } else { "." })?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn collision() {
        let mut d = Display::new();
        assert_eq!(d.draw(0, 0, &[0xFF], Edge::Wrap), 0);
        assert_eq!(d.snapshot().lit(), 8);
        assert_eq!(d.draw(4, 0, &[0xF0], Edge::Wrap), 1);
        assert_eq!(d.snapshot().lit(), 4);
        assert!(d.snapshot().get(0, 0));
        assert!(!d.snapshot().get(4, 0));
    }

    #[test]
    fn wrap_and_clip() {
        let mut d = Display::new();
        d.draw(62, 31, &[0xC0 | 0x30, 0xF0], Edge::Wrap);
        let f = d.snapshot();
        assert!(f.get(62, 31) && f.get(63, 31) && f.get(0, 31) && f.get(1, 31));
        assert!(f.get(62, 0) && f.get(1, 0));
        assert_eq!(f.lit(), 8);

        let mut d = Display::new();
        d.draw(62, 31, &[0xF0, 0xF0], Edge::Clip);
        let f = d.snapshot();
        assert_eq!(f.lit(), 2);
        assert!(!f.get(0, 31) && !f.get(62, 0));
    }

    #[test]
    fn origin_wraps() {
        let mut d = Display::new();
        d.draw(64 + 3, 32 + 2, &[0x80], Edge::Clip);
        assert!(d.snapshot().get(3, 2));
    }

    #[test]
    fn collided_rows() {
        let mut d = Display::new();
        d.draw(0, 0, &[0x80, 0x80, 0x00, 0x80], Edge::Wrap);
        assert_eq!(d.draw(0, 0, &[0x80, 0xFF, 0x80, 0x80], Edge::Wrap), 3);
        assert_eq!(d.clipped_rows(30, 4, Edge::Clip), 2);
        assert_eq!(d.clipped_rows(30 + 32, 4, Edge::Clip), 2);
        assert_eq!(d.clipped_rows(30, 4, Edge::Wrap), 0);
        assert_eq!(d.clipped_rows(0, 4, Edge::Clip), 0);
    }

    #[test]
    fn resolution_change_keeps_picture() {
        let mut d = Display::new();
        d.draw(1, 1, &[0x80], Edge::Wrap);
        d.set_high_resolution(true);
        assert!(d.is_high_resolution());
        let f = d.snapshot();
        assert_eq!(f.lit(), 4);
        assert!(f.get(2, 2) && f.get(3, 2) && f.get(2, 3) && f.get(3, 3));

        d.draw(10, 10, &[0x80], Edge::Wrap);
        d.draw(13, 13, &[0x80], Edge::Wrap);
        d.set_high_resolution(false);
        assert!(!d.is_high_resolution());
        let f = d.snapshot();
        assert_eq!((f.width(), f.height()), (64, 32));
        assert_eq!(f.lit(), 2);
        assert!(f.get(1, 1) && f.get(5, 5) && !f.get(6, 6));

        // Switching to the current resolution changes nothing
        d.set_high_resolution(false);
        assert_eq!(d.snapshot(), f);
    }

    #[test]
    fn scrolling() {
        let mut d = Display::new();
        d.set_high_resolution(true);
        assert_eq!((d.width(), d.height()), (128, 64));
        d.draw_wide(0, 0, &[0x8001], Edge::Wrap);
        d.scroll_right();
        let f = d.snapshot();
        assert!(f.get(4, 0) && f.get(19, 0));
        d.scroll_down(3);
        let f = d.snapshot();
        assert!(f.get(4, 3) && !f.get(4, 0));
        d.scroll_left();
        d.scroll_left();
        let f = d.snapshot();
        assert_eq!(f.lit(), 1);
        assert!(f.get(11, 3));
    }

    #[test]
    fn text_rendering() {
        let mut d = Display::new();
        d.draw(0, 0, &[0xA0], Edge::Wrap);
        let s = d.snapshot().to_string();
        let first = s.lines().next().unwrap();
        assert_eq!(first.len(), 64);
        assert!(first.starts_with("#.#."));
        assert_eq!(s.lines().count(), 32);
    }
}
