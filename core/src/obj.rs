use alloc::vec::Vec;
use core::marker::PhantomData;

use crate::types::{DType, DiagKind, PackSchema, Scalar, ScalarVal, Struc, Uplo};

// OBJECT DESCRIPTOR
// ================================================================================================

/// Descriptor of a matrix operand.
///
/// An `Obj` carries everything an operation needs to know about an operand: dimensions, strides,
/// element datatype, computation precision, structure, the stored triangle, the diagonal kind
/// and offset, logical conjugation/transposition bits, a pack schema, an attached scalar, and
/// the buffer pointer. Element `(i, j)` lives at offset `i * rs + j * cs` from the buffer base.
///
/// Descriptors are plain values: a dispatch front-end aliases the caller's descriptor and
/// freely rewrites the alias (swapping operands, inducing transpositions, attaching scalars)
/// without the caller observing any of it. The buffer is borrowed, never owned; packed operands
/// instead point into arena blocks owned by the memory broker.
#[derive(Clone, Debug)]
pub struct Obj<'a> {
    dt: DType,
    target_dt: DType,
    comp_dt: DType,
    m: usize,
    n: usize,
    rs: isize,
    cs: isize,
    diag_off: isize,
    struc: Struc,
    uplo: Uplo,
    diag: DiagKind,
    conj: bool,
    trans: bool,
    schema: PackSchema,
    scalar: ScalarVal,
    buf: *mut u8,
    // Micro-panel geometry, meaningful only when `schema` is a packed layout: the padded short
    // axis extent, the within-panel leading dimension, and the element stride between panels.
    panel_dim_max: usize,
    panel_ld: usize,
    panel_stride: usize,
    _borrow: PhantomData<&'a mut ()>,
}

// The engine hands shared references to workers which write disjoint regions of the output
// operand through the raw buffer pointer.
unsafe impl Send for Obj<'_> {}
unsafe impl Sync for Obj<'_> {}

impl<'a> Obj<'a> {
    /// Creates a descriptor over a shared slice. The strides must be positive and every element
    /// of the `m x n` view must fall inside the slice.
    pub fn from_slice<T: Scalar>(m: usize, n: usize, rs: isize, cs: isize, data: &'a [T]) -> Obj<'a> {
        assert!(rs > 0 && cs > 0, "from_slice requires positive strides");
        if m > 0 && n > 0 {
            let last = (m - 1) as isize * rs + (n - 1) as isize * cs;
            assert!((last as usize) < data.len(), "matrix view exceeds slice bounds");
        }
        unsafe { Self::from_raw_parts(T::DTYPE, m, n, rs, cs, data.as_ptr() as *mut u8) }
    }

    /// Creates a writable descriptor over an exclusive slice.
    pub fn from_slice_mut<T: Scalar>(
        m: usize,
        n: usize,
        rs: isize,
        cs: isize,
        data: &'a mut [T],
    ) -> Obj<'a> {
        assert!(rs > 0 && cs > 0, "from_slice_mut requires positive strides");
        if m > 0 && n > 0 {
            let last = (m - 1) as isize * rs + (n - 1) as isize * cs;
            assert!((last as usize) < data.len(), "matrix view exceeds slice bounds");
        }
        unsafe { Self::from_raw_parts(T::DTYPE, m, n, rs, cs, data.as_mut_ptr() as *mut u8) }
    }

    /// Creates a descriptor from raw parts.
    ///
    /// # Safety
    /// `buf` must point to storage valid for the full `m x n` view under the given strides for
    /// the lifetime `'a`, and writes through the descriptor must not alias reads made through
    /// any other live descriptor except as the level-3 operations define (trmm/trsm update `B`
    /// in place).
    pub unsafe fn from_raw_parts(
        dt: DType,
        m: usize,
        n: usize,
        rs: isize,
        cs: isize,
        buf: *mut u8,
    ) -> Obj<'a> {
        Obj {
            dt,
            target_dt: dt,
            comp_dt: dt,
            m,
            n,
            rs,
            cs,
            diag_off: 0,
            struc: Struc::General,
            uplo: Uplo::Lower,
            diag: DiagKind::NonUnit,
            conj: false,
            trans: false,
            schema: PackSchema::NotPacked,
            scalar: ScalarVal::ONE,
            buf,
            panel_dim_max: 0,
            panel_ld: 0,
            panel_stride: 0,
            _borrow: PhantomData,
        }
    }

    // ACCESSORS
    // --------------------------------------------------------------------------------------------

    pub fn dt(&self) -> DType {
        self.dt
    }

    /// Datatype a pack of this operand converts to.
    pub fn target_dt(&self) -> DType {
        self.target_dt
    }

    /// Datatype accumulation is carried out in.
    pub fn comp_dt(&self) -> DType {
        self.comp_dt
    }

    pub fn length(&self) -> usize {
        self.m
    }

    pub fn width(&self) -> usize {
        self.n
    }

    /// Length of the operand once the logical transposition bit is applied.
    pub fn length_after_trans(&self) -> usize {
        if self.trans { self.n } else { self.m }
    }

    pub fn width_after_trans(&self) -> usize {
        if self.trans { self.m } else { self.n }
    }

    pub fn row_stride(&self) -> isize {
        self.rs
    }

    pub fn col_stride(&self) -> isize {
        self.cs
    }

    /// Signed distance of the diagonal from the top-left element: the diagonal is the set of
    /// `(i, j)` with `j - i == diag_off()`, so positive offsets push it toward the upper-right.
    pub fn diag_off(&self) -> isize {
        self.diag_off
    }

    pub fn struc(&self) -> Struc {
        self.struc
    }

    pub fn uplo(&self) -> Uplo {
        self.uplo
    }

    pub fn diag_kind(&self) -> DiagKind {
        self.diag
    }

    pub fn has_conj(&self) -> bool {
        self.conj
    }

    pub fn has_trans(&self) -> bool {
        self.trans
    }

    pub fn schema(&self) -> PackSchema {
        self.schema
    }

    pub fn scalar(&self) -> ScalarVal {
        self.scalar
    }

    pub fn buffer(&self) -> *mut u8 {
        self.buf
    }

    pub fn has_zero_dim(&self) -> bool {
        self.m == 0 || self.n == 0
    }

    pub fn is_general(&self) -> bool {
        self.struc == Struc::General
    }

    pub fn is_triangular(&self) -> bool {
        self.struc == Struc::Triangular
    }

    pub fn is_symmetric(&self) -> bool {
        self.struc == Struc::Symmetric
    }

    pub fn is_hermitian(&self) -> bool {
        self.struc == Struc::Hermitian
    }

    pub fn is_lower(&self) -> bool {
        self.uplo == Uplo::Lower
    }

    pub fn is_upper(&self) -> bool {
        self.uplo == Uplo::Upper
    }

    pub fn is_complex(&self) -> bool {
        self.dt.is_complex()
    }

    /// True when consecutive elements of a column are contiguous.
    pub fn is_col_stored(&self) -> bool {
        self.rs == 1
    }

    /// True when consecutive elements of a row are contiguous.
    pub fn is_row_stored(&self) -> bool {
        self.cs == 1
    }

    pub fn is_square(&self) -> bool {
        self.m == self.n
    }

    // MUTATORS
    // --------------------------------------------------------------------------------------------

    pub fn set_struc(&mut self, struc: Struc) {
        self.struc = struc;
    }

    pub fn set_uplo(&mut self, uplo: Uplo) {
        self.uplo = uplo;
    }

    pub fn set_diag_kind(&mut self, diag: DiagKind) {
        self.diag = diag;
    }

    pub fn set_diag_off(&mut self, off: isize) {
        self.diag_off = off;
    }

    pub fn set_conj(&mut self, conj: bool) {
        self.conj = conj;
    }

    pub fn set_trans(&mut self, trans: bool) {
        self.trans = trans;
    }

    pub fn toggle_conj(&mut self) {
        self.conj = !self.conj;
    }

    pub fn toggle_trans(&mut self) {
        self.trans = !self.trans;
    }

    pub fn set_schema(&mut self, schema: PackSchema) {
        self.schema = schema;
    }

    /// Records the micro-panel geometry of a packed operand.
    pub fn set_panel_geometry(&mut self, dim_max: usize, ld: usize, stride: usize) {
        self.panel_dim_max = dim_max;
        self.panel_ld = ld;
        self.panel_stride = stride;
    }

    /// Padded short-axis extent of the packed micro-panels.
    pub fn panel_dim_max(&self) -> usize {
        self.panel_dim_max
    }

    /// Within-panel leading dimension (elements between successive long-axis positions).
    pub fn panel_ld(&self) -> usize {
        self.panel_ld
    }

    /// Element stride between successive micro-panels.
    pub fn panel_stride(&self) -> usize {
        self.panel_stride
    }

    pub fn set_target_dt(&mut self, dt: DType) {
        self.target_dt = dt;
    }

    pub fn set_comp_dt(&mut self, dt: DType) {
        self.comp_dt = dt;
    }

    pub fn set_scalar(&mut self, s: ScalarVal) {
        self.scalar = s;
    }

    /// Folds another scalar into the attached scalar.
    pub fn scale_scalar_by(&mut self, s: ScalarVal) {
        self.scalar = self.scalar.mul(s);
    }

    // TRANSFORMATIONS
    // --------------------------------------------------------------------------------------------

    /// Non-owning alias of this descriptor; local modifications never reach the source object.
    pub fn alias(&self) -> Obj<'a> {
        self.clone()
    }

    /// Transposes the view unconditionally: dimensions, strides, the stored triangle, and the
    /// diagonal offset all flip, while the logical transposition bit is untouched. Because the
    /// effective operand is "view, then bit", this *changes* what the descriptor denotes; it is
    /// the primitive behind whole-operation transposition.
    pub fn transpose_view(&mut self) {
        core::mem::swap(&mut self.m, &mut self.n);
        core::mem::swap(&mut self.rs, &mut self.cs);
        self.diag_off = -self.diag_off;
        if self.struc != Struc::General {
            self.uplo = self.uplo.toggled();
        }
    }

    /// Realizes a pending logical transposition in the view and clears the bit. The effective
    /// operand is unchanged; afterwards consumers may ignore the transposition bit entirely.
    pub fn induce_trans(&mut self) {
        if self.trans {
            self.transpose_view();
            self.trans = false;
        }
    }

    /// Shifts the view to the `m x n` sub-matrix whose top-left element is `(i, j)`, updating
    /// the diagonal offset accordingly.
    pub fn shift_to(&mut self, i: usize, j: usize, m: usize, n: usize) {
        debug_assert!(i + m <= self.m && j + n <= self.n);
        let offset = i as isize * self.rs + j as isize * self.cs;
        self.buf = unsafe { self.buf.offset(offset * self.dt.elem_size() as isize) };
        self.diag_off += i as isize - j as isize;
        self.m = m;
        self.n = n;
    }

    /// Typed pointer to element `(i, j)` of the view (transposition bit not applied).
    ///
    /// # Safety
    /// `T` must match the descriptor's datatype and `(i, j)` must be inside the view.
    pub unsafe fn ptr_at<T: Scalar>(&self, i: usize, j: usize) -> *mut T {
        debug_assert_eq!(T::DTYPE, self.dt);
        debug_assert!(i < self.m && j < self.n);
        unsafe { (self.buf as *mut T).offset(i as isize * self.rs + j as isize * self.cs) }
    }

    /// Reads element `(i, j)` of the view.
    ///
    /// # Safety
    /// Same contract as [`Obj::ptr_at`].
    pub unsafe fn read_at<T: Scalar>(&self, i: usize, j: usize) -> T {
        unsafe { *self.ptr_at::<T>(i, j) }
    }

    /// Writes element `(i, j)` of the view.
    ///
    /// # Safety
    /// Same contract as [`Obj::ptr_at`], plus exclusive access to the element.
    pub unsafe fn write_at<T: Scalar>(&self, i: usize, j: usize, v: T) {
        unsafe { *self.ptr_at::<T>(i, j) = v }
    }
}

// OWNED MATRICES
// ================================================================================================

/// Owned column-major matrix storage, primarily a convenience for callers and tests.
#[derive(Clone, Debug, PartialEq)]
pub struct Matrix<T: Scalar> {
    m: usize,
    n: usize,
    data: Vec<T>,
}

impl<T: Scalar> Matrix<T> {
    /// Zero-filled `m x n` matrix.
    pub fn zeros(m: usize, n: usize) -> Self {
        Self { m, n, data: vec![T::zero(); m * n] }
    }

    /// Identity-like matrix with ones on the main diagonal.
    pub fn identity(n: usize) -> Self {
        let mut mat = Self::zeros(n, n);
        for i in 0..n {
            mat.set(i, i, T::one());
        }
        mat
    }

    /// Matrix built element-wise from a function of `(row, col)`.
    pub fn from_fn(m: usize, n: usize, mut f: impl FnMut(usize, usize) -> T) -> Self {
        let mut mat = Self::zeros(m, n);
        for j in 0..n {
            for i in 0..m {
                mat.set(i, j, f(i, j));
            }
        }
        mat
    }

    /// Wraps a column-major element vector.
    pub fn from_vec(m: usize, n: usize, data: Vec<T>) -> Self {
        assert_eq!(data.len(), m * n);
        Self { m, n, data }
    }

    pub fn nrows(&self) -> usize {
        self.m
    }

    pub fn ncols(&self) -> usize {
        self.n
    }

    pub fn at(&self, i: usize, j: usize) -> T {
        self.data[i + j * self.m]
    }

    pub fn set(&mut self, i: usize, j: usize, v: T) {
        self.data[i + j * self.m] = v;
    }

    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    /// Read-only descriptor over this matrix.
    pub fn obj(&self) -> Obj<'_> {
        Obj::from_slice(self.m, self.n, 1, self.m as isize, &self.data)
    }

    /// Writable descriptor over this matrix.
    pub fn obj_mut(&mut self) -> Obj<'_> {
        let m = self.m;
        let n = self.n;
        Obj::from_slice_mut(m, n, 1, m as isize, &mut self.data)
    }
}

// TESTS
// ================================================================================================

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::types::C64;

    #[test]
    fn induce_trans_realizes_pending_bit() {
        let mat = Matrix::<f64>::from_fn(3, 2, |i, j| (i * 10 + j) as f64);
        let mut o = mat.obj();
        o.set_struc(Struc::Triangular);
        o.set_uplo(Uplo::Lower);
        o.set_diag_off(1);
        o.set_trans(true);
        o.induce_trans();
        assert_eq!((o.length(), o.width()), (2, 3));
        assert_eq!(o.uplo(), Uplo::Upper);
        assert_eq!(o.diag_off(), -1);
        assert!(!o.has_trans());
        // Element (0, 1) of the transposed view is element (1, 0) of the source.
        assert_eq!(unsafe { o.read_at::<f64>(0, 1) }, 10.0);
        // Without a pending bit, inducing is a no-op.
        let before = (o.length(), o.width());
        o.induce_trans();
        assert_eq!((o.length(), o.width()), before);
    }

    #[test]
    fn shift_tracks_diagonal() {
        let mat = Matrix::<C64>::zeros(8, 8);
        let mut o = mat.obj();
        o.shift_to(2, 4, 4, 4);
        assert_eq!(o.diag_off(), -2);
        o.shift_to(0, 2, 2, 2);
        assert_eq!(o.diag_off(), -4);
    }

    #[test]
    fn alias_is_local() {
        let mat = Matrix::<f32>::zeros(4, 4);
        let o = mat.obj();
        let mut al = o.alias();
        al.toggle_conj();
        al.set_schema(PackSchema::RowPanels);
        assert!(!o.has_conj());
        assert_eq!(o.schema(), PackSchema::NotPacked);
    }
}
