use lamina_core::{Blksz, BszId, Context, DType, Dir, Obj, PackSchema, adjust_kc};

use crate::broker::BufClass;

// CONTROL-TREE NODES
// ================================================================================================
//
// A control tree encodes one operation's blocked loop schedule as data: each partition node
// carries the blocksizes and direction of one loop, each pack node describes what to pack and
// how, and the leaf names the macro-kernel family. The tree is built fresh per call by the
// dispatch front-end, owned by it for the duration of the thread decorator, and dropped when
// the call returns. The strict nesting is
// `JC > PC > packB > IC > packA > JR > IR > leaf`, with the trsm tree forking below IC into a
// gemm sub-branch and a trsm sub-branch.

/// Parameters of one partitioned loop.
#[derive(Clone, Copy, Debug)]
pub(crate) struct PartCntl {
    pub bsz: Blksz,
    /// Blocksize boundaries are kept on multiples of this value.
    pub mult: usize,
    pub dir: Dir,
    /// Balance thread ranges by triangular workload instead of iteration count.
    pub weighted: bool,
}

/// Parameters of one packing stage.
#[derive(Clone, Copy, Debug)]
pub(crate) struct PackCntl {
    pub src_dt: DType,
    pub dst_dt: DType,
    /// Blocksize id of the short panel axis: MR for the A side, NR for the B side.
    pub panel_dim_id: BszId,
    pub invert_diag: bool,
    pub rev_iter_if_upper: bool,
    pub rev_iter_if_lower: bool,
    pub schema: PackSchema,
    pub buf_class: BufClass,
    /// Short-axis duplication factor for micro-kernels that want pre-broadcast elements.
    pub panel_bcast: usize,
}

/// Macro-kernel family executed at the leaf.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum KerFamily {
    /// Plain product tile loop.
    Gemm,
    /// Product masked to the stored triangle of C.
    Gemmt,
    /// Fused solve over the diagonal block (trsm sub-branch only).
    Trsm,
}

#[derive(Debug)]
pub(crate) enum CntlNode {
    PartJc { part: PartCntl, child: Box<CntlNode> },
    /// `trsm` marks the solve schedule: uniform first-touch scaling instead of the triangular
    /// operand's zero-region banding.
    PartPc { part: PartCntl, trsm: bool, child: Box<CntlNode> },
    PackB { pack: PackCntl, child: Box<CntlNode> },
    PartIc { part: PartCntl, child: Box<CntlNode> },
    PackA { pack: PackCntl, child: Box<CntlNode> },
    Ker { family: KerFamily, jr: PartCntl, ir: PartCntl },
    /// The trsm m-loop: the `trsm` branch handles the diagonal-intersecting blocks, the `gemm`
    /// branch the rectangular remainder. Both branches are packA-over-leaf chains.
    TrsmIc { part: PartCntl, gemm: Box<CntlNode>, trsm: Box<CntlNode> },
}

// TREE CONSTRUCTION
// ================================================================================================

fn part(bsz: Blksz, mult: usize, dir: Dir, weighted: bool) -> PartCntl {
    PartCntl { bsz, mult, dir, weighted }
}

/// Builds the single-branch product tree
/// `JC(NC) > PC(KC) > packB > IC(MC) > packA > JR(NR) > IR(MR) > leaf`.
///
/// The KC direction comes from the triangular operand when one is present, so that in-place
/// triangular products read every source block before overwriting it; KC is also re-aligned to
/// the register blocksizes in that case so diagonal blocks land on micro-panel boundaries.
pub(crate) fn gemm_cntl(
    cntx: &Context,
    family: KerFamily,
    a: &Obj<'_>,
    b: &Obj<'_>,
    c: &Obj<'_>,
    schema_a: PackSchema,
    schema_b: PackSchema,
) -> CntlNode {
    let dt_exec = c.dt();
    let dt_ap = a.target_dt();
    let dt_bp = b.target_dt();

    let mr = cntx.blksz(dt_exec, BszId::Mr);
    let nr = cntx.blksz(dt_exec, BszId::Nr);
    let mc = cntx.blksz(dt_exec, BszId::Mc);
    let nc = cntx.blksz(dt_exec, BszId::Nc);
    let mut kc = cntx.blksz(dt_exec, BszId::Kc);

    let tri = a.is_triangular() || b.is_triangular();
    if tri {
        adjust_kc(cntx.blksz_table(), dt_exec, &mut kc);
    }
    let pc_dir = if a.is_triangular() {
        if a.is_lower() { Dir::Bwd } else { Dir::Fwd }
    } else if b.is_triangular() {
        if b.is_lower() { Dir::Fwd } else { Dir::Bwd }
    } else {
        Dir::Fwd
    };

    let weighted = family == KerFamily::Gemmt;

    let leaf = CntlNode::Ker {
        family,
        jr: part(nr, nr.def, Dir::Fwd, weighted),
        ir: part(mr, mr.def, Dir::Fwd, weighted),
    };
    let pack_a = CntlNode::PackA {
        pack: PackCntl {
            src_dt: a.dt(),
            dst_dt: dt_ap,
            panel_dim_id: BszId::Mr,
            invert_diag: false,
            rev_iter_if_upper: false,
            rev_iter_if_lower: false,
            schema: schema_a,
            buf_class: BufClass::ABlock,
            panel_bcast: 1,
        },
        child: Box::new(leaf),
    };
    let part_ic = CntlNode::PartIc {
        part: part(mc, mr.def, Dir::Fwd, weighted),
        child: Box::new(pack_a),
    };
    let pack_b = CntlNode::PackB {
        pack: PackCntl {
            src_dt: b.dt(),
            dst_dt: dt_bp,
            panel_dim_id: BszId::Nr,
            invert_diag: false,
            rev_iter_if_upper: false,
            rev_iter_if_lower: false,
            schema: schema_b,
            buf_class: BufClass::BPanel,
            panel_bcast: 1,
        },
        child: Box::new(part_ic),
    };
    let part_pc =
        CntlNode::PartPc { part: part(kc, 1, pc_dir, false), trsm: false, child: Box::new(pack_b) };
    CntlNode::PartJc { part: part(nc, nr.def, Dir::Fwd, weighted), child: Box::new(part_pc) }
}

/// Builds the two-branch left-side trsm tree. Right-side solves are cast to this form by the
/// dispatcher before the tree is created, so the triangular operand is always A; the traversal
/// direction follows its triangle (lower walks forward in m/k, upper backward).
pub(crate) fn trsm_cntl(
    cntx: &Context,
    a: &Obj<'_>,
    b: &Obj<'_>,
    c: &Obj<'_>,
    schema_a: PackSchema,
    schema_b: PackSchema,
    invert_diag: bool,
) -> CntlNode {
    let dt_exec = c.dt();

    let mr = cntx.blksz(dt_exec, BszId::Mr);
    let nr = cntx.blksz(dt_exec, BszId::Nr);
    let mc = cntx.blksz(dt_exec, BszId::Mc);
    let nc = cntx.blksz(dt_exec, BszId::Nc);
    let mut kc = cntx.blksz(dt_exec, BszId::Kc);
    adjust_kc(cntx.blksz_table(), dt_exec, &mut kc);

    let dir = if a.is_lower() { Dir::Fwd } else { Dir::Bwd };

    let gemm_leaf = CntlNode::Ker {
        family: KerFamily::Gemm,
        jr: part(nr, nr.def, Dir::Fwd, false),
        ir: part(mr, mr.def, Dir::Fwd, false),
    };
    let pack_a_gemm = CntlNode::PackA {
        pack: PackCntl {
            src_dt: a.dt(),
            dst_dt: a.target_dt(),
            panel_dim_id: BszId::Mr,
            invert_diag: false,
            rev_iter_if_upper: false,
            rev_iter_if_lower: false,
            schema: schema_a,
            buf_class: BufClass::ABlock,
            panel_bcast: 1,
        },
        child: Box::new(gemm_leaf),
    };

    let trsm_leaf = CntlNode::Ker {
        family: KerFamily::Trsm,
        jr: part(nr, nr.def, Dir::Fwd, false),
        ir: part(mr, mr.def, Dir::Fwd, false),
    };
    let pack_a_trsm = CntlNode::PackA {
        pack: PackCntl {
            src_dt: a.dt(),
            dst_dt: a.target_dt(),
            panel_dim_id: BszId::Mr,
            invert_diag,
            rev_iter_if_upper: true,
            rev_iter_if_lower: false,
            schema: schema_a,
            buf_class: BufClass::ABlock,
            panel_bcast: 1,
        },
        child: Box::new(trsm_leaf),
    };

    let part_ic = CntlNode::TrsmIc {
        part: part(mc, mr.def, dir, false),
        gemm: Box::new(pack_a_gemm),
        trsm: Box::new(pack_a_trsm),
    };
    let pack_b = CntlNode::PackB {
        pack: PackCntl {
            src_dt: b.dt(),
            dst_dt: b.target_dt(),
            panel_dim_id: BszId::Nr,
            invert_diag: false,
            rev_iter_if_upper: false,
            rev_iter_if_lower: false,
            schema: schema_b,
            buf_class: BufClass::BPanel,
            panel_bcast: 1,
        },
        child: Box::new(part_ic),
    };
    let part_pc =
        CntlNode::PartPc { part: part(kc, 1, dir, false), trsm: true, child: Box::new(pack_b) };
    CntlNode::PartJc { part: part(nc, nr.def, Dir::Fwd, false), child: Box::new(part_pc) }
}
