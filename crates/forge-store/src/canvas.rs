use forge_types::SPRITE_SIZE;

/// Caller-owned RGBA drawing surface.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Canvas {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl Canvas {
    /// Fully transparent canvas.
    pub fn new(width: u32, height: u32) -> Self {
        Self::filled(width, height, [0, 0, 0, 0])
    }

    pub fn filled(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        let data = rgba
            .iter()
            .copied()
            .cycle()
            .take(width as usize * height as usize * 4)
            .collect();
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

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn into_data(self) -> Vec<u8> {
        self.data
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = (y as usize * self.width as usize + x as usize) * 4;
        let mut out = [0u8; 4];
        out.copy_from_slice(&self.data[i..i + 4]);
        Some(out)
    }

    /// Alpha-composite a 32x32 RGBA tile with its top-left corner at
    /// `(x, y)`. Parts outside the canvas are clipped.
    pub fn draw_sprite(&mut self, pixels: &[u8], x: i32, y: i32) {
        for sy in 0..SPRITE_SIZE as i32 {
            let dy = y + sy;
            if dy < 0 || dy >= self.height as i32 {
                continue;
            }
            for sx in 0..SPRITE_SIZE as i32 {
                let dx = x + sx;
                if dx < 0 || dx >= self.width as i32 {
                    continue;
                }
                let si = ((sy * SPRITE_SIZE as i32 + sx) * 4) as usize;
                let Some(src) = pixels.get(si..si + 4) else {
                    return;
                };
                let alpha = src[3] as u32;
                if alpha == 0 {
                    continue;
                }
                let di = (dy as usize * self.width as usize + dx as usize) * 4;
                let dst = &mut self.data[di..di + 4];
                if alpha == 255 {
                    dst.copy_from_slice(src);
                } else {
                    for c in 0..3 {
                        dst[c] = ((src[c] as u32 * alpha + dst[c] as u32 * (255 - alpha)) / 255) as u8;
                    }
                    dst[3] = (alpha + dst[3] as u32 * (255 - alpha) / 255) as u8;
                }
            }
        }
    }
}
