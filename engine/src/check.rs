use lamina_core::{Error, Obj, ScalarVal, Side, Struc};

// ARGUMENT CHECKING
// ================================================================================================
//
// Consistency checks run before any work is dispatched, gated by the engine configuration.
// When checking is disabled the preconditions below become caller obligations.

fn err(msg: &str) -> Error {
    Error::InvalidArgument(msg.into())
}

fn conformal_mm(a: &Obj<'_>, b: &Obj<'_>, c: &Obj<'_>) -> Result<(), Error> {
    let (m, n) = (c.length(), c.width());
    if a.length_after_trans() != m {
        return Err(err("m dimension of A does not conform to C"));
    }
    if b.width_after_trans() != n {
        return Err(err("n dimension of B does not conform to C"));
    }
    if a.width_after_trans() != b.length_after_trans() {
        return Err(err("inner dimensions of A and B do not conform"));
    }
    Ok(())
}

fn homogeneous(a: &Obj<'_>, b: &Obj<'_>, c: &Obj<'_>) -> Result<(), Error> {
    if a.dt() != c.dt() || b.dt() != c.dt() {
        return Err(Error::UnsupportedDatatypeCombination { a: a.dt(), b: b.dt(), c: c.dt() });
    }
    Ok(())
}

fn square_structured(a: &Obj<'_>, what: &str) -> Result<(), Error> {
    if !a.is_square() {
        return Err(Error::InvalidArgument(format!("{what} operand must be square")));
    }
    Ok(())
}

pub(crate) fn gemm(a: &Obj<'_>, b: &Obj<'_>, c: &Obj<'_>) -> Result<(), Error> {
    conformal_mm(a, b, c)
}

pub(crate) fn gemmt(a: &Obj<'_>, b: &Obj<'_>, c: &Obj<'_>) -> Result<(), Error> {
    if !c.is_square() {
        return Err(err("gemmt output must be square"));
    }
    conformal_mm(a, b, c)?;
    homogeneous(a, b, c)
}

pub(crate) fn hemm_symm(
    side: Side,
    a: &Obj<'_>,
    b: &Obj<'_>,
    c: &Obj<'_>,
    hermitian: bool,
) -> Result<(), Error> {
    let want = if hermitian { Struc::Hermitian } else { Struc::Symmetric };
    if a.struc() != want {
        return Err(err("structured operand has the wrong structure tag"));
    }
    square_structured(a, "hemm/symm structured")?;
    let need = match side {
        Side::Left => c.length(),
        Side::Right => c.width(),
    };
    if a.length() != need {
        return Err(err("structured operand does not conform to C on the given side"));
    }
    if b.length_after_trans() != c.length() || b.width_after_trans() != c.width() {
        return Err(err("B does not conform to C"));
    }
    homogeneous(a, b, c)
}

pub(crate) fn trmm_trsm(side: Side, a: &Obj<'_>, b: &Obj<'_>) -> Result<(), Error> {
    if a.struc() != Struc::Triangular {
        return Err(err("triangular operand has the wrong structure tag"));
    }
    square_structured(a, "triangular")?;
    let need = match side {
        Side::Left => b.length(),
        Side::Right => b.width(),
    };
    if a.length() != need {
        return Err(err("triangular operand does not conform to B on the given side"));
    }
    if a.dt() != b.dt() {
        return Err(Error::UnsupportedDatatypeCombination { a: a.dt(), b: b.dt(), c: b.dt() });
    }
    Ok(())
}

pub(crate) fn trmm3(side: Side, a: &Obj<'_>, b: &Obj<'_>, c: &Obj<'_>) -> Result<(), Error> {
    trmm_trsm(side, a, b)?;
    if b.length_after_trans() != c.length() || b.width_after_trans() != c.width() {
        return Err(err("B does not conform to C"));
    }
    homogeneous(a, b, c)
}

pub(crate) fn herk_syrk(
    a: &Obj<'_>,
    c: &Obj<'_>,
    alpha: ScalarVal,
    beta: ScalarVal,
    hermitian: bool,
) -> Result<(), Error> {
    if !c.is_square() {
        return Err(err("rank-k output must be square"));
    }
    if a.length_after_trans() != c.length() {
        return Err(err("A does not conform to C"));
    }
    if a.dt() != c.dt() {
        return Err(Error::UnsupportedDatatypeCombination { a: a.dt(), b: a.dt(), c: c.dt() });
    }
    if hermitian && (!alpha.is_real() || !beta.is_real()) {
        return Err(err("herk requires real alpha and beta"));
    }
    Ok(())
}

pub(crate) fn her2k_syr2k(
    a: &Obj<'_>,
    b: &Obj<'_>,
    c: &Obj<'_>,
    beta: ScalarVal,
    hermitian: bool,
) -> Result<(), Error> {
    if !c.is_square() {
        return Err(err("rank-2k output must be square"));
    }
    if a.length_after_trans() != c.length() || b.length_after_trans() != c.length() {
        return Err(err("A/B do not conform to C"));
    }
    if a.width_after_trans() != b.width_after_trans() {
        return Err(err("A and B must share the k dimension"));
    }
    homogeneous(a, b, c)?;
    if hermitian && !beta.is_real() {
        return Err(err("her2k requires real beta"));
    }
    Ok(())
}

// TESTS
// ================================================================================================

#[cfg(test)]
mod tests {
    use lamina_core::Matrix;

    use super::*;

    #[test]
    fn gemm_dimension_mismatch_detected() {
        let a = Matrix::<f64>::zeros(3, 4);
        let b = Matrix::<f64>::zeros(5, 2);
        let c = Matrix::<f64>::zeros(3, 2);
        assert!(matches!(gemm(&a.obj(), &b.obj(), &c.obj()), Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn gemm_accepts_transposed_conforming() {
        let a = Matrix::<f64>::zeros(4, 3);
        let mut ao = a.obj();
        ao.set_trans(true);
        let b = Matrix::<f64>::zeros(4, 2);
        let c = Matrix::<f64>::zeros(3, 2);
        assert!(gemm(&ao, &b.obj(), &c.obj()).is_ok());
    }

    #[test]
    fn herk_rejects_complex_alpha() {
        let a = Matrix::<lamina_core::C64>::zeros(3, 2);
        let c = Matrix::<lamina_core::C64>::zeros(3, 3);
        let bad = ScalarVal::new(1.0, 0.5);
        assert!(herk_syrk(&a.obj(), &c.obj(), bad, ScalarVal::ONE, true).is_err());
        assert!(herk_syrk(&a.obj(), &c.obj(), ScalarVal::ONE, ScalarVal::ONE, true).is_ok());
    }
}
