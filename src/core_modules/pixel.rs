// THEORY:
// The `Pixel` module is the smallest unit of the motion grid. It is a "dumb" data
// container for one RGBA sample plus the single comparison the differencer needs:
// how far apart two colors are in RGB space.
//
// Alpha is carried through untouched and never takes part in the distance. The
// distance is exposed both squared (the hot path, no root per pixel) and as a
// plain Euclidean value for callers that want the real number.

pub type Byte = u8;
pub type Channel = Byte;
pub type Distance = f64;
pub type SquaredDistance = u32;

pub const CHANNELS: usize = 4;

/// A single RGBA pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Pixel {
    /// The red channel value (0-255).
    pub red: Channel,
    /// The green channel value (0-255).
    pub green: Channel,
    /// The blue channel value (0-255).
    pub blue: Channel,
    /// The alpha (transparency) channel value (0-255).
    pub alpha: Channel,
}

impl Pixel {
    pub const BLACK: Pixel = Pixel::new(0, 0, 0, 255);
    pub const WHITE: Pixel = Pixel::new(255, 255, 255, 255);

    pub const fn new(red: Channel, green: Channel, blue: Channel, alpha: Channel) -> Self {
        Pixel {
            red,
            green,
            blue,
            alpha,
        }
    }

    /// Squared Euclidean distance between the RGB parts of two pixels.
    pub fn squared_distance(&self, other: &Pixel) -> SquaredDistance {
        let dr = self.red.abs_diff(other.red) as u32;
        let dg = self.green.abs_diff(other.green) as u32;
        let db = self.blue.abs_diff(other.blue) as u32;
        dr * dr + dg * dg + db * db
    }

    pub fn distance(&self, other: &Pixel) -> Distance {
        (self.squared_distance(other) as Distance).sqrt()
    }

    pub fn to_bytes(self) -> [Byte; CHANNELS] {
        [self.red, self.green, self.blue, self.alpha]
    }
}

impl From<[Byte; CHANNELS]> for Pixel {
    fn from(bytes: [Byte; CHANNELS]) -> Self {
        Pixel::new(bytes[0], bytes[1], bytes[2], bytes[3])
    }
}

impl TryFrom<&[Byte]> for Pixel {
    type Error = usize;

    /// Fails with the offending slice length when it is not exactly one pixel.
    fn try_from(bytes: &[Byte]) -> Result<Self, Self::Error> {
        match bytes {
            [r, g, b, a] => Ok(Pixel::new(*r, *g, *b, *a)),
            _ => Err(bytes.len()),
        }
    }
}
