//! Coherent value noise.
//!
//! A table of [`TABLE_SIZE`] uniform random values is blended across four
//! octaves with a cosine ease curve. Output lies in `[0, AMPLITUDE_SUM]`;
//! callers rescale it themselves.
//!
//! Negative coordinates are folded with `abs`, so the field mirrors around
//! each axis origin instead of continuing smoothly through zero.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

/// Number of random values in the lattice table.
pub const TABLE_SIZE: usize = 4096;

const TABLE_MASK: i64 = TABLE_SIZE as i64 - 1;
const Y_WRAP_BITS: u32 = 4;
const Y_WRAP: i64 = 1 << Y_WRAP_BITS;
const Z_WRAP_BITS: u32 = 8;
const Z_WRAP: i64 = 1 << Z_WRAP_BITS;

/// Octaves summed per sample.
pub const OCTAVES: u32 = 4;

/// Amplitude multiplier between octaves.
pub const AMPLITUDE_FALLOFF: f32 = 0.5;

/// Upper bound of [`NoiseField::sample`]: 0.5 + 0.25 + 0.125 + 0.0625.
pub const AMPLITUDE_SUM: f32 = 0.9375;

/// How the lattice table is refreshed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum NoiseMode {
    /// One table per field; nearby coordinates give similar values.
    #[default]
    Coherent,
    /// A fresh table before every sample. Adjacent samples are unrelated,
    /// which gives a chaotic field. Still driven by the seeded RNG.
    Reseeded,
}

/// Seeded value-noise generator.
pub struct NoiseField {
    table: Vec<f32>,
    rng: SmallRng,
    mode: NoiseMode,
}

impl NoiseField {
    /// Create a coherent noise field from a seed.
    pub fn new(seed: u64) -> Self {
        Self::with_mode(seed, NoiseMode::Coherent)
    }

    /// Create a noise field with an explicit table mode.
    pub fn with_mode(seed: u64, mode: NoiseMode) -> Self {
        let mut rng = SmallRng::seed_from_u64(seed);
        let table = (0..TABLE_SIZE).map(|_| rng.gen::<f32>()).collect();
        Self { table, rng, mode }
    }

    /// The table refresh mode.
    pub fn mode(&self) -> NoiseMode {
        self.mode
    }

    /// Refill the table from the internal RNG.
    pub fn reseed(&mut self) {
        for v in &mut self.table {
            *v = self.rng.gen();
        }
    }

    /// Sample the field, honouring [`NoiseMode`].
    pub fn next_sample(&mut self, x: f32, y: f32, z: f32) -> f32 {
        if self.mode == NoiseMode::Reseeded {
            self.reseed();
        }
        self.sample(x, y, z)
    }

    /// Sample the current table at `(x, y, z)`. Result is in `[0, AMPLITUDE_SUM]`.
    pub fn sample(&self, x: f32, y: f32, z: f32) -> f32 {
        let (x, y, z) = (x.abs(), y.abs(), z.abs());

        let mut xi = x.floor() as i64;
        let mut yi = y.floor() as i64;
        let mut zi = z.floor() as i64;
        let mut xf = x - xi as f32;
        let mut yf = y - yi as f32;
        let mut zf = z - zi as f32;

        let mut r = 0.0;
        let mut ampl = 0.5;

        for _ in 0..OCTAVES {
            let mut of = xi + (yi << Y_WRAP_BITS) + (zi << Z_WRAP_BITS);

            let rxf = ease(xf);
            let ryf = ease(yf);

            let mut n1 = self.at(of);
            n1 += rxf * (self.at(of + 1) - n1);
            let mut n2 = self.at(of + Y_WRAP);
            n2 += rxf * (self.at(of + Y_WRAP + 1) - n2);
            n1 += ryf * (n2 - n1);

            of += Z_WRAP;
            n2 = self.at(of);
            n2 += rxf * (self.at(of + 1) - n2);
            let mut n3 = self.at(of + Y_WRAP);
            n3 += rxf * (self.at(of + Y_WRAP + 1) - n3);
            n2 += ryf * (n3 - n2);

            n1 += ease(zf) * (n2 - n1);

            r += n1 * ampl;
            ampl *= AMPLITUDE_FALLOFF;

            xi <<= 1;
            xf *= 2.0;
            yi <<= 1;
            yf *= 2.0;
            zi <<= 1;
            zf *= 2.0;

            if xf >= 1.0 {
                xi += 1;
                xf -= 1.0;
            }
            if yf >= 1.0 {
                yi += 1;
                yf -= 1.0;
            }
            if zf >= 1.0 {
                zi += 1;
                zf -= 1.0;
            }
        }

        r
    }

    #[inline]
    fn at(&self, offset: i64) -> f32 {
        self.table[(offset & TABLE_MASK) as usize]
    }
}

/// Cosine ease curve, 0 at t=0 and 1 at t=1.
#[inline]
fn ease(t: f32) -> f32 {
    0.5 * (1.0 - (t * std::f32::consts::PI).cos())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_seed_same_values() {
        let a = NoiseField::new(7);
        let b = NoiseField::new(7);
        for i in 0..32 {
            let x = i as f32 * 0.37;
            assert_eq!(a.sample(x, 1.5, 2.25), b.sample(x, 1.5, 2.25));
        }
    }

    #[test]
    fn test_output_range() {
        let noise = NoiseField::new(42);
        for i in 0..500 {
            let t = i as f32 * 0.731;
            let v = noise.sample(t, t * 0.5, t * 0.25);
            assert!((0.0..=AMPLITUDE_SUM).contains(&v), "sample {} out of range", v);
        }
    }

    #[test]
    fn test_coherent_nearby_values_are_close() {
        let noise = NoiseField::new(3);
        let a = noise.sample(5.0, 0.0, 0.0);
        let b = noise.sample(5.001, 0.0, 0.0);
        assert!((a - b).abs() < 0.01);
    }

    #[test]
    fn test_negative_coordinates_mirror() {
        let noise = NoiseField::new(11);
        assert_eq!(noise.sample(-3.4, -1.2, -0.5), noise.sample(3.4, 1.2, 0.5));
    }

    #[test]
    fn test_ease_endpoints() {
        assert!(ease(0.0).abs() < 1e-6);
        assert!((ease(1.0) - 1.0).abs() < 1e-6);
        assert!((ease(0.5) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_reseeded_mode_changes_table() {
        let mut noise = NoiseField::with_mode(5, NoiseMode::Reseeded);
        let first = noise.next_sample(2.5, 0.0, 0.0);
        let second = noise.next_sample(2.5, 0.0, 0.0);
        assert_ne!(first, second);

        let mut coherent = NoiseField::new(5);
        assert_eq!(coherent.next_sample(2.5, 0.0, 0.0), coherent.next_sample(2.5, 0.0, 0.0));
    }
}
