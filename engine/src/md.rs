use lamina_core::{DType, Domain, Error, Obj, ScalarVal};
use tracing::debug;

// MIXED-DATATYPE STAGING
// ================================================================================================
//
// When the storage datatypes of the operands differ, or the computation precision of C is
// wider than its storage precision, the product is executed homogeneously in a computation
// datatype: the packers cast A and B on the fly (their target datatype is rewritten here), and
// when C itself does not match, the product is accumulated into a temporary conformal matrix
// with beta staged to zero. The front-end then folds the temporary back with a single
// cast-and-scale pass, halving the memory traffic on C compared to casting it both ways.

/// Temporary output matrix in the computation datatype, column-major.
pub(crate) struct MdTemp {
    mem: Vec<u64>,
    dt: DType,
    m: usize,
    n: usize,
}

impl MdTemp {
    fn new(dt: DType, m: usize, n: usize) -> Self {
        Self { mem: vec![0u64; (m * n * dt.elem_size()).div_ceil(8)], dt, m, n }
    }

    pub fn obj(&mut self) -> Obj<'_> {
        unsafe {
            Obj::from_raw_parts(
                self.dt,
                self.m,
                self.n,
                1,
                self.m as isize,
                self.mem.as_mut_ptr() as *mut u8,
            )
        }
    }
}

/// Decides the computation datatype and rewrites the local objects for mixed-datatype
/// execution. Returns the temporary C when one is required; in that case `beta` has been
/// rewritten to zero and the caller must accumulate the temporary back with the original beta.
pub(crate) fn gemm_md(
    a: &mut Obj<'_>,
    b: &mut Obj<'_>,
    beta: &mut ScalarVal,
    c: &mut Obj<'_>,
    extra_mem_enabled: bool,
) -> Result<Option<MdTemp>, Error> {
    let mixed = a.dt() != c.dt() || b.dt() != c.dt() || c.comp_dt() != c.dt();
    if !mixed {
        return Ok(None);
    }
    if !extra_mem_enabled {
        return Err(Error::UnsupportedDatatypeCombination { a: a.dt(), b: b.dt(), c: c.dt() });
    }

    let domain = if a.dt().is_complex() || b.dt().is_complex() || c.dt().is_complex() {
        Domain::Complex
    } else {
        Domain::Real
    };
    let exec_dt = DType::from_parts(domain, c.comp_dt().precision());
    debug!(?exec_dt, a_dt = ?a.dt(), b_dt = ?b.dt(), c_dt = ?c.dt(), "mixed-datatype staging");

    a.set_target_dt(exec_dt);
    b.set_target_dt(exec_dt);

    if c.dt() == exec_dt {
        return Ok(None);
    }

    let temp = MdTemp::new(exec_dt, c.length(), c.width());
    *beta = ScalarVal::ZERO;
    Ok(Some(temp))
}

// TESTS
// ================================================================================================

#[cfg(test)]
mod tests {
    use lamina_core::{C32, Matrix};

    use super::*;

    #[test]
    fn homogeneous_needs_no_staging() {
        let a = Matrix::<f64>::zeros(2, 2);
        let b = Matrix::<f64>::zeros(2, 2);
        let mut c = Matrix::<f64>::zeros(2, 2);
        let mut beta = ScalarVal::ONE;
        let (mut ao, mut bo, mut co) = (a.obj(), b.obj(), c.obj_mut());
        let t = gemm_md(&mut ao, &mut bo, &mut beta, &mut co, true).unwrap();
        assert!(t.is_none());
        assert_eq!(beta, ScalarVal::ONE);
    }

    #[test]
    fn mixed_domain_widens_to_complex_temp() {
        let a = Matrix::<C32>::zeros(2, 3);
        let b = Matrix::<f32>::zeros(3, 2);
        let mut c = Matrix::<f32>::zeros(2, 2);
        let mut beta = ScalarVal::from_real(3.0);
        let (mut ao, mut bo, mut co) = (a.obj(), b.obj(), c.obj_mut());
        let t = gemm_md(&mut ao, &mut bo, &mut beta, &mut co, true).unwrap();
        let mut t = t.expect("real C with complex operands needs a temporary");
        assert_eq!(t.obj().dt(), DType::C32);
        assert_eq!(beta, ScalarVal::ZERO);
        assert_eq!(ao.target_dt(), DType::C32);
        assert_eq!(bo.target_dt(), DType::C32);
    }

    #[test]
    fn disabled_extra_mem_rejects() {
        let a = Matrix::<f32>::zeros(2, 2);
        let b = Matrix::<f64>::zeros(2, 2);
        let mut c = Matrix::<f64>::zeros(2, 2);
        let mut beta = ScalarVal::ONE;
        let (mut ao, mut bo, mut co) = (a.obj(), b.obj(), c.obj_mut());
        assert!(gemm_md(&mut ao, &mut bo, &mut beta, &mut co, false).is_err());
    }
}
