use lamina_core::{Context, Error, Obj, Rntm, ScalarVal};
use tracing::instrument;

use crate::{elemwise::setid, engine::Engine};

// RANK-K AND RANK-2K UPDATES
// ================================================================================================
//
// These operations are compositions: herk/syrk are one triangular-output product against the
// (conjugate-)transposed operand, her2k/syr2k are two with beta applied only the first time.
// Hermitian results additionally zero the imaginary parts of the diagonal, which otherwise
// accumulate round-off.

impl Engine {
    /// Hermitian rank-k update: `C = alpha * A * A^H + beta * C` on the stored triangle of C.
    /// `alpha` and `beta` must be real; `Im(diag(C))` is exactly zero on return.
    #[instrument(skip_all, fields(m = c.length(), dt = ?c.dt()))]
    pub fn herk(
        &self,
        alpha: ScalarVal,
        a: &Obj<'_>,
        beta: ScalarVal,
        c: &Obj<'_>,
        cntx: Option<&Context>,
        rntm: Option<&Rntm>,
    ) -> Result<(), Error> {
        if self.config().error_checking {
            crate::check::herk_syrk(a, c, alpha, beta, true)?;
        }
        let mut ah = a.alias();
        ah.toggle_trans();
        ah.toggle_conj();
        self.gemmt(alpha, a, &ah, beta, c, cntx, rntm)?;
        setid(0.0, c);
        Ok(())
    }

    /// Symmetric rank-k update: `C = alpha * A * A^T + beta * C` on the stored triangle of C.
    #[instrument(skip_all, fields(m = c.length(), dt = ?c.dt()))]
    pub fn syrk(
        &self,
        alpha: ScalarVal,
        a: &Obj<'_>,
        beta: ScalarVal,
        c: &Obj<'_>,
        cntx: Option<&Context>,
        rntm: Option<&Rntm>,
    ) -> Result<(), Error> {
        if self.config().error_checking {
            crate::check::herk_syrk(a, c, alpha, beta, false)?;
        }
        let mut at = a.alias();
        at.toggle_trans();
        self.gemmt(alpha, a, &at, beta, c, cntx, rntm)
    }

    /// Hermitian rank-2k update: `C = alpha * A * B^H + conj(alpha) * B * A^H + beta * C` on
    /// the stored triangle of C. `beta` must be real; `Im(diag(C))` is exactly zero on return.
    #[instrument(skip_all, fields(m = c.length(), dt = ?c.dt()))]
    pub fn her2k(
        &self,
        alpha: ScalarVal,
        a: &Obj<'_>,
        b: &Obj<'_>,
        beta: ScalarVal,
        c: &Obj<'_>,
        cntx: Option<&Context>,
        rntm: Option<&Rntm>,
    ) -> Result<(), Error> {
        if self.config().error_checking {
            crate::check::her2k_syr2k(a, b, c, beta, true)?;
        }
        let alphah = alpha.conj();

        let mut ah = a.alias();
        ah.toggle_trans();
        ah.toggle_conj();

        let mut bh = b.alias();
        bh.toggle_trans();
        bh.toggle_conj();

        // Two triangular-output products, using beta only the first time.
        self.gemmt(alpha, a, &bh, beta, c, cntx, rntm)?;
        self.gemmt(alphah, b, &ah, ScalarVal::ONE, c, cntx, rntm)?;

        // The diagonal of a Hermitian rank-2k product is mathematically real, but round-off
        // leaves residue in the imaginary parts; clear it before returning.
        setid(0.0, c);
        Ok(())
    }

    /// Symmetric rank-2k update: `C = alpha * A * B^T + alpha * B * A^T + beta * C` on the
    /// stored triangle of C.
    #[instrument(skip_all, fields(m = c.length(), dt = ?c.dt()))]
    pub fn syr2k(
        &self,
        alpha: ScalarVal,
        a: &Obj<'_>,
        b: &Obj<'_>,
        beta: ScalarVal,
        c: &Obj<'_>,
        cntx: Option<&Context>,
        rntm: Option<&Rntm>,
    ) -> Result<(), Error> {
        if self.config().error_checking {
            crate::check::her2k_syr2k(a, b, c, beta, false)?;
        }
        let mut at = a.alias();
        at.toggle_trans();

        let mut bt = b.alias();
        bt.toggle_trans();

        self.gemmt(alpha, a, &bt, beta, c, cntx, rntm)?;
        self.gemmt(alpha, b, &at, ScalarVal::ONE, c, cntx, rntm)
    }
}

/// [`Engine::herk`] on the process-wide default engine.
pub fn herk(alpha: ScalarVal, a: &Obj<'_>, beta: ScalarVal, c: &Obj<'_>) -> Result<(), Error> {
    Engine::global().herk(alpha, a, beta, c, None, None)
}

/// [`Engine::syrk`] on the process-wide default engine.
pub fn syrk(alpha: ScalarVal, a: &Obj<'_>, beta: ScalarVal, c: &Obj<'_>) -> Result<(), Error> {
    Engine::global().syrk(alpha, a, beta, c, None, None)
}

/// [`Engine::her2k`] on the process-wide default engine.
pub fn her2k(
    alpha: ScalarVal,
    a: &Obj<'_>,
    b: &Obj<'_>,
    beta: ScalarVal,
    c: &Obj<'_>,
) -> Result<(), Error> {
    Engine::global().her2k(alpha, a, b, beta, c, None, None)
}

/// [`Engine::syr2k`] on the process-wide default engine.
pub fn syr2k(
    alpha: ScalarVal,
    a: &Obj<'_>,
    b: &Obj<'_>,
    beta: ScalarVal,
    c: &Obj<'_>,
) -> Result<(), Error> {
    Engine::global().syr2k(alpha, a, b, beta, c, None, None)
}
