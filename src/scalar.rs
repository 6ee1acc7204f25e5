//! Element types stored in tensors.
//!
//! The `Scalar` trait abstracts over real, complex and half-precision
//! elements for block operations and tensor files.

use std::fmt::Debug;
use std::io::{self, Read, Write};
use std::ops::{Add, AddAssign, Div, Mul, MulAssign, Neg, Sub};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use half::f16;
use ndarray::LinalgScalar;
use num_complex::{Complex32, Complex64};
use num_traits::{One, Zero};
use rand::Rng;

/// Trait for element types used in tensor operations.
pub trait Scalar:
    Copy
    + Debug
    + Default
    + PartialEq
    + Zero
    + One
    + Add<Output = Self>
    + Sub<Output = Self>
    + Mul<Output = Self>
    + Div<Output = Self>
    + Neg<Output = Self>
    + AddAssign
    + MulAssign
    + LinalgScalar
    + Send
    + Sync
    + 'static
{
    /// Short type name, used in logs and benchmark names.
    const NAME: &'static str;

    /// Create a scalar from f64.
    fn from_f64(val: f64) -> Self;

    /// Complex conjugate (identity for real types).
    fn conj(self) -> Self;

    /// Squared modulus as f64.
    fn abs_sqr(self) -> f64;

    /// Uniform sample from `[0, 1)` (both parts for complex types).
    fn random<R: Rng + ?Sized>(rng: &mut R) -> Self;

    /// Writes the value in little-endian order.
    fn write_le<W: Write>(self, writer: &mut W) -> io::Result<()>;

    /// Reads a value written by [`Scalar::write_le`].
    fn read_le<R: Read>(reader: &mut R) -> io::Result<Self>;
}

impl Scalar for f64 {
    const NAME: &'static str = "f64";

    fn from_f64(val: f64) -> Self {
        val
    }

    fn conj(self) -> Self {
        self
    }

    fn abs_sqr(self) -> f64 {
        self * self
    }

    fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        rng.r#gen::<f64>()
    }

    fn write_le<W: Write>(self, writer: &mut W) -> io::Result<()> {
        writer.write_f64::<LittleEndian>(self)
    }

    fn read_le<R: Read>(reader: &mut R) -> io::Result<Self> {
        reader.read_f64::<LittleEndian>()
    }
}

impl Scalar for f32 {
    const NAME: &'static str = "f32";

    fn from_f64(val: f64) -> Self {
        val as f32
    }

    fn conj(self) -> Self {
        self
    }

    fn abs_sqr(self) -> f64 {
        (self as f64) * (self as f64)
    }

    fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        rng.r#gen::<f32>()
    }

    fn write_le<W: Write>(self, writer: &mut W) -> io::Result<()> {
        writer.write_f32::<LittleEndian>(self)
    }

    fn read_le<R: Read>(reader: &mut R) -> io::Result<Self> {
        reader.read_f32::<LittleEndian>()
    }
}

impl Scalar for f16 {
    const NAME: &'static str = "f16";

    fn from_f64(val: f64) -> Self {
        f16::from_f64(val)
    }

    fn conj(self) -> Self {
        self
    }

    fn abs_sqr(self) -> f64 {
        let v = self.to_f64();
        v * v
    }

    fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        f16::from_f32(rng.r#gen::<f32>())
    }

    fn write_le<W: Write>(self, writer: &mut W) -> io::Result<()> {
        writer.write_u16::<LittleEndian>(self.to_bits())
    }

    fn read_le<R: Read>(reader: &mut R) -> io::Result<Self> {
        reader.read_u16::<LittleEndian>().map(f16::from_bits)
    }
}

impl Scalar for Complex64 {
    const NAME: &'static str = "c64";

    fn from_f64(val: f64) -> Self {
        Complex64::new(val, 0.0)
    }

    fn conj(self) -> Self {
        Complex64::conj(&self)
    }

    fn abs_sqr(self) -> f64 {
        self.norm_sqr()
    }

    fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Complex64::new(rng.r#gen::<f64>(), rng.r#gen::<f64>())
    }

    fn write_le<W: Write>(self, writer: &mut W) -> io::Result<()> {
        writer.write_f64::<LittleEndian>(self.re)?;
        writer.write_f64::<LittleEndian>(self.im)
    }

    fn read_le<R: Read>(reader: &mut R) -> io::Result<Self> {
        let re = reader.read_f64::<LittleEndian>()?;
        let im = reader.read_f64::<LittleEndian>()?;
        Ok(Complex64::new(re, im))
    }
}

impl Scalar for Complex32 {
    const NAME: &'static str = "c32";

    fn from_f64(val: f64) -> Self {
        Complex32::new(val as f32, 0.0)
    }

    fn conj(self) -> Self {
        Complex32::conj(&self)
    }

    fn abs_sqr(self) -> f64 {
        self.norm_sqr() as f64
    }

    fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Complex32::new(rng.r#gen::<f32>(), rng.r#gen::<f32>())
    }

    fn write_le<W: Write>(self, writer: &mut W) -> io::Result<()> {
        writer.write_f32::<LittleEndian>(self.re)?;
        writer.write_f32::<LittleEndian>(self.im)
    }

    fn read_le<R: Read>(reader: &mut R) -> io::Result<Self> {
        let re = reader.read_f32::<LittleEndian>()?;
        let im = reader.read_f32::<LittleEndian>()?;
        Ok(Complex32::new(re, im))
    }
}
