use core::{
    fmt::{Debug, Display},
    ops::{Add, AddAssign, Div, Mul, MulAssign, Neg, Sub, SubAssign},
};

use num_traits::{One, Zero};

pub use num_complex::{Complex32 as C32, Complex64 as C64};

// DATATYPE TAGS
// ================================================================================================

/// Element datatype of a matrix operand.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum DType {
    F32,
    F64,
    C32,
    C64,
}

/// Domain component of a datatype.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Domain {
    Real,
    Complex,
}

/// Precision component of a datatype.
#[derive(Copy, Clone, Debug, Eq, PartialEq, PartialOrd, Ord)]
pub enum Precision {
    Single,
    Double,
}

impl DType {
    /// All datatypes, in table order. The discriminant doubles as a table index.
    pub const ALL: [DType; 4] = [DType::F32, DType::F64, DType::C32, DType::C64];

    pub const fn index(self) -> usize {
        match self {
            DType::F32 => 0,
            DType::F64 => 1,
            DType::C32 => 2,
            DType::C64 => 3,
        }
    }

    pub const fn domain(self) -> Domain {
        match self {
            DType::F32 | DType::F64 => Domain::Real,
            DType::C32 | DType::C64 => Domain::Complex,
        }
    }

    pub const fn precision(self) -> Precision {
        match self {
            DType::F32 | DType::C32 => Precision::Single,
            DType::F64 | DType::C64 => Precision::Double,
        }
    }

    pub const fn is_complex(self) -> bool {
        matches!(self.domain(), Domain::Complex)
    }

    /// Datatype with the same precision in the real domain.
    pub const fn project_to_real(self) -> DType {
        match self {
            DType::F32 | DType::C32 => DType::F32,
            DType::F64 | DType::C64 => DType::F64,
        }
    }

    /// Datatype assembled from a domain and a precision.
    pub const fn from_parts(domain: Domain, prec: Precision) -> DType {
        match (domain, prec) {
            (Domain::Real, Precision::Single) => DType::F32,
            (Domain::Real, Precision::Double) => DType::F64,
            (Domain::Complex, Precision::Single) => DType::C32,
            (Domain::Complex, Precision::Double) => DType::C64,
        }
    }

    pub const fn elem_size(self) -> usize {
        match self {
            DType::F32 => 4,
            DType::F64 => 8,
            DType::C32 => 8,
            DType::C64 => 16,
        }
    }
}

// MATRIX PROPERTY TAGS
// ================================================================================================

/// Structure of a matrix operand.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Struc {
    General,
    Triangular,
    Symmetric,
    Hermitian,
}

/// Which triangle of a structured operand is stored.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Uplo {
    Lower,
    Upper,
}

impl Uplo {
    pub const fn toggled(self) -> Uplo {
        match self {
            Uplo::Lower => Uplo::Upper,
            Uplo::Upper => Uplo::Lower,
        }
    }
}

/// Interpretation of the diagonal of a triangular operand.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum DiagKind {
    NonUnit,
    Unit,
}

/// Operand side for hemm/symm/trmm/trsm.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Side {
    Left,
    Right,
}

impl Side {
    pub const fn toggled(self) -> Side {
        match self {
            Side::Left => Side::Right,
            Side::Right => Side::Left,
        }
    }
}

/// Partitioning direction of a blocked loop.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Dir {
    Fwd,
    Bwd,
}

/// In-memory layout of a packed operand.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum PackSchema {
    NotPacked,
    RowPanels,
    ColPanels,
    RowPanels1m,
    ColPanels1m,
}

impl PackSchema {
    pub const fn is_1m(self) -> bool {
        matches!(self, PackSchema::RowPanels1m | PackSchema::ColPanels1m)
    }

    pub const fn is_packed(self) -> bool {
        !matches!(self, PackSchema::NotPacked)
    }
}

// SCALAR TRAIT
// ================================================================================================

/// Capability surface of the four element types.
///
/// This trait is the generic replacement for the original framework's token-pasted per-type
/// function families: one generic function bounded on [`Scalar`] covers all four datatypes,
/// and mixed-datatype variants become generic-pair instantiations via [`CastFrom`].
pub trait Scalar:
    Copy
    + PartialEq
    + Debug
    + Display
    + Send
    + Sync
    + 'static
    + Add<Output = Self>
    + Sub<Output = Self>
    + Mul<Output = Self>
    + Div<Output = Self>
    + Neg<Output = Self>
    + AddAssign
    + SubAssign
    + MulAssign
    + Zero
    + One
{
    /// Real type with the same precision.
    type Real: Scalar<Real = Self::Real> + PartialOrd;

    /// Runtime tag corresponding to this type.
    const DTYPE: DType;

    const IS_COMPLEX: bool;

    /// Complex conjugate; identity in the real domain.
    fn conj(self) -> Self;

    /// Multiplicative inverse, used for trsm diagonal pre-inversion.
    fn recip(self) -> Self;

    fn from_real(re: Self::Real) -> Self;

    fn real(self) -> Self::Real;

    /// Imaginary part; zero in the real domain.
    fn imag(self) -> Self::Real;

    /// Assembles a value from real and imaginary parts; the imaginary part is discarded in the
    /// real domain.
    fn from_parts(re: Self::Real, im: Self::Real) -> Self;

    fn from_f64_parts(re: f64, im: f64) -> Self;

    fn to_f64_parts(self) -> (f64, f64);
}

impl Scalar for f32 {
    type Real = f32;

    const DTYPE: DType = DType::F32;
    const IS_COMPLEX: bool = false;

    #[inline(always)]
    fn conj(self) -> Self {
        self
    }

    #[inline(always)]
    fn recip(self) -> Self {
        1.0 / self
    }

    #[inline(always)]
    fn from_real(re: f32) -> Self {
        re
    }

    #[inline(always)]
    fn real(self) -> f32 {
        self
    }

    #[inline(always)]
    fn imag(self) -> f32 {
        0.0
    }

    #[inline(always)]
    fn from_parts(re: f32, _im: f32) -> Self {
        re
    }

    #[inline(always)]
    fn from_f64_parts(re: f64, _im: f64) -> Self {
        re as f32
    }

    #[inline(always)]
    fn to_f64_parts(self) -> (f64, f64) {
        (self as f64, 0.0)
    }
}

impl Scalar for f64 {
    type Real = f64;

    const DTYPE: DType = DType::F64;
    const IS_COMPLEX: bool = false;

    #[inline(always)]
    fn conj(self) -> Self {
        self
    }

    #[inline(always)]
    fn recip(self) -> Self {
        1.0 / self
    }

    #[inline(always)]
    fn from_real(re: f64) -> Self {
        re
    }

    #[inline(always)]
    fn real(self) -> f64 {
        self
    }

    #[inline(always)]
    fn imag(self) -> f64 {
        0.0
    }

    #[inline(always)]
    fn from_parts(re: f64, _im: f64) -> Self {
        re
    }

    #[inline(always)]
    fn from_f64_parts(re: f64, _im: f64) -> Self {
        re
    }

    #[inline(always)]
    fn to_f64_parts(self) -> (f64, f64) {
        (self, 0.0)
    }
}

impl Scalar for C32 {
    type Real = f32;

    const DTYPE: DType = DType::C32;
    const IS_COMPLEX: bool = true;

    #[inline(always)]
    fn conj(self) -> Self {
        num_complex::Complex::conj(&self)
    }

    #[inline(always)]
    fn recip(self) -> Self {
        self.inv()
    }

    #[inline(always)]
    fn from_real(re: f32) -> Self {
        C32::new(re, 0.0)
    }

    #[inline(always)]
    fn real(self) -> f32 {
        self.re
    }

    #[inline(always)]
    fn imag(self) -> f32 {
        self.im
    }

    #[inline(always)]
    fn from_parts(re: f32, im: f32) -> Self {
        C32::new(re, im)
    }

    #[inline(always)]
    fn from_f64_parts(re: f64, im: f64) -> Self {
        C32::new(re as f32, im as f32)
    }

    #[inline(always)]
    fn to_f64_parts(self) -> (f64, f64) {
        (self.re as f64, self.im as f64)
    }
}

impl Scalar for C64 {
    type Real = f64;

    const DTYPE: DType = DType::C64;
    const IS_COMPLEX: bool = true;

    #[inline(always)]
    fn conj(self) -> Self {
        num_complex::Complex::conj(&self)
    }

    #[inline(always)]
    fn recip(self) -> Self {
        self.inv()
    }

    #[inline(always)]
    fn from_real(re: f64) -> Self {
        C64::new(re, 0.0)
    }

    #[inline(always)]
    fn real(self) -> f64 {
        self.re
    }

    #[inline(always)]
    fn imag(self) -> f64 {
        self.im
    }

    #[inline(always)]
    fn from_parts(re: f64, im: f64) -> Self {
        C64::new(re, im)
    }

    #[inline(always)]
    fn from_f64_parts(re: f64, im: f64) -> Self {
        C64::new(re, im)
    }

    #[inline(always)]
    fn to_f64_parts(self) -> (f64, f64) {
        (self.re, self.im)
    }
}

// DATATYPE CASTS
// ================================================================================================

/// Value-level cast between element types. Complex-to-real takes the real part; real-to-complex
/// sets a zero imaginary part; double-to-single narrows.
pub trait CastFrom<S: Scalar>: Scalar {
    fn cast_from(s: S) -> Self;
}

macro_rules! impl_cast_from {
    ($($src:ty => $dst:ty),* $(,)?) => {
        $(
            impl CastFrom<$src> for $dst {
                #[inline(always)]
                fn cast_from(s: $src) -> Self {
                    let (re, im) = s.to_f64_parts();
                    <$dst>::from_f64_parts(re, im)
                }
            }
        )*
    };
}

impl_cast_from!(
    f32 => f32, f32 => f64, f32 => C32, f32 => C64,
    f64 => f32, f64 => f64, f64 => C32, f64 => C64,
    C32 => f32, C32 => f64, C32 => C32, C32 => C64,
    C64 => f32, C64 => f64, C64 => C32, C64 => C64,
);

// SCALAR VALUES
// ================================================================================================

/// Datatype-erased scalar, used for α/β arguments and for the scalar a dispatch front-end
/// attaches to an operand. Stored as a double-precision complex pair, which embeds all four
/// element types losslessly.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ScalarVal {
    re: f64,
    im: f64,
}

impl ScalarVal {
    pub const ZERO: ScalarVal = ScalarVal { re: 0.0, im: 0.0 };
    pub const ONE: ScalarVal = ScalarVal { re: 1.0, im: 0.0 };
    pub const MINUS_ONE: ScalarVal = ScalarVal { re: -1.0, im: 0.0 };

    pub const fn new(re: f64, im: f64) -> Self {
        Self { re, im }
    }

    pub const fn from_real(re: f64) -> Self {
        Self { re, im: 0.0 }
    }

    pub fn re(self) -> f64 {
        self.re
    }

    pub fn im(self) -> f64 {
        self.im
    }

    pub fn is_zero(self) -> bool {
        self.re == 0.0 && self.im == 0.0
    }

    pub fn is_one(self) -> bool {
        self.re == 1.0 && self.im == 0.0
    }

    pub fn is_real(self) -> bool {
        self.im == 0.0
    }

    pub fn conj(self) -> Self {
        Self { re: self.re, im: -self.im }
    }

    /// Typed view of the value.
    pub fn to<T: Scalar>(self) -> T {
        T::from_f64_parts(self.re, self.im)
    }

    pub fn from_typed<T: Scalar>(v: T) -> Self {
        let (re, im) = v.to_f64_parts();
        Self { re, im }
    }

    /// Product of two erased scalars, computed in the complex double domain.
    pub fn mul(self, rhs: ScalarVal) -> Self {
        Self {
            re: self.re * rhs.re - self.im * rhs.im,
            im: self.re * rhs.im + self.im * rhs.re,
        }
    }
}

impl From<f32> for ScalarVal {
    fn from(v: f32) -> Self {
        Self::from_real(v as f64)
    }
}

impl From<f64> for ScalarVal {
    fn from(v: f64) -> Self {
        Self::from_real(v)
    }
}

impl From<C32> for ScalarVal {
    fn from(v: C32) -> Self {
        Self::new(v.re as f64, v.im as f64)
    }
}

impl From<C64> for ScalarVal {
    fn from(v: C64) -> Self {
        Self::new(v.re, v.im)
    }
}

// TESTS
// ================================================================================================
