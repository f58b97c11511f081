use crate::types::DType;

// BLOCKSIZES
// ================================================================================================

/// Identifier of a cache or register blocksize.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum BszId {
    Mr,
    Nr,
    Mc,
    Kc,
    Nc,
}

impl BszId {
    pub const ALL: [BszId; 5] = [BszId::Mr, BszId::Nr, BszId::Mc, BszId::Kc, BszId::Nc];

    pub const fn index(self) -> usize {
        match self {
            BszId::Mr => 0,
            BszId::Nr => 1,
            BszId::Mc => 2,
            BszId::Kc => 3,
            BszId::Nc => 4,
        }
    }
}

/// Default and maximum extent of one blocksize. The maximum is used when the final partial
/// block of a loop would otherwise fall below the default by less than `max - def`.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Blksz {
    pub def: usize,
    pub max: usize,
}

impl Blksz {
    pub const fn new(def: usize, max: usize) -> Self {
        Self { def, max }
    }

    pub const fn square(v: usize) -> Self {
        Self { def: v, max: v }
    }
}

/// Per-datatype blocksize table: `(datatype, kind) -> (def, max)`.
#[derive(Clone, Debug)]
pub struct BlkszTable {
    vals: [[Blksz; 5]; 4],
}

impl BlkszTable {
    /// Builds a table from one row per datatype, ordered as [`DType::ALL`], each row ordered as
    /// [`BszId::ALL`]. Panics if the cache blocksizes are not whole multiples of their register
    /// blocksizes; that multiplicity is what keeps matrix diagonals off micro-panel interiors.
    pub fn new(vals: [[Blksz; 5]; 4]) -> Self {
        let table = Self { vals };
        for dt in DType::ALL {
            let mr = table.def(dt, BszId::Mr);
            let nr = table.def(dt, BszId::Nr);
            let mc = table.get(dt, BszId::Mc);
            let nc = table.get(dt, BszId::Nc);
            assert!(mr > 0 && nr > 0, "register blocksizes must be positive");
            assert!(
                mc.def % mr == 0 && mc.max % mr == 0,
                "MC must be a whole multiple of MR for {dt:?}"
            );
            assert!(
                nc.def % nr == 0 && nc.max % nr == 0,
                "NC must be a whole multiple of NR for {dt:?}"
            );
        }
        table
    }

    pub fn get(&self, dt: DType, id: BszId) -> Blksz {
        self.vals[dt.index()][id.index()]
    }

    pub fn def(&self, dt: DType, id: BszId) -> usize {
        self.get(dt, id).def
    }

    pub fn max(&self, dt: DType, id: BszId) -> usize {
        self.get(dt, id).max
    }

    /// Derives the table a 1m context presents for the complex datatypes: the real-domain
    /// blocksizes of the same precision, halved along the dimensions the 2x2 real embedding
    /// doubles (MR, MC, KC). Real datatypes are passed through.
    pub fn project_for_1m(&self) -> BlkszTable {
        let mut vals = self.vals;
        for dt in [DType::C32, DType::C64] {
            let r = dt.project_to_real();
            let halve = |b: Blksz| Blksz::new((b.def / 2).max(1), (b.max / 2).max(1));
            vals[dt.index()][BszId::Mr.index()] = halve(self.get(r, BszId::Mr));
            vals[dt.index()][BszId::Nr.index()] = self.get(r, BszId::Nr);
            vals[dt.index()][BszId::Mc.index()] = halve(self.get(r, BszId::Mc));
            vals[dt.index()][BszId::Kc.index()] = halve(self.get(r, BszId::Kc));
            vals[dt.index()][BszId::Nc.index()] = self.get(r, BszId::Nc);
        }
        BlkszTable { vals }
    }
}

/// Rounds the KC blocksize for operations with a triangular operand so that diagonal blocks
/// start and end on micro-panel boundaries: `def` is rounded down to a whole multiple of the
/// larger register blocksize (but never below it), and `max` is clamped to the result.
pub fn adjust_kc(table: &BlkszTable, dt: DType, kc: &mut Blksz) {
    let mr = table.def(dt, BszId::Mr);
    let nr = table.def(dt, BszId::Nr);
    let mult = mr.max(nr);
    let def = (kc.def / mult).max(1) * mult;
    kc.def = def;
    kc.max = def;
}

// TESTS
// ================================================================================================

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn table() -> BlkszTable {
        BlkszTable::new(
            [[Blksz::square(4), Blksz::square(4), Blksz::square(64), Blksz::new(128, 160), Blksz::square(256)]; 4],
        )
    }

    #[test]
    fn lookup() {
        let t = table();
        assert_eq!(t.def(DType::F64, BszId::Mc), 64);
        assert_eq!(t.max(DType::C32, BszId::Kc), 160);
    }

    #[test]
    fn adjust_kc_aligns_to_register_blocksize() {
        let t = table();
        let mut kc = Blksz::new(126, 160);
        adjust_kc(&t, DType::F64, &mut kc);
        assert_eq!(kc.def, 124);
        assert_eq!(kc.max, 124);
        assert_eq!(kc.def % 4, 0);
    }

    #[test]
    fn one_m_projection_halves_complex_mr() {
        let t = table().project_for_1m();
        assert_eq!(t.def(DType::C64, BszId::Mr), 2);
        assert_eq!(t.def(DType::C64, BszId::Nr), 4);
        assert_eq!(t.def(DType::C64, BszId::Kc), 64);
        assert_eq!(t.def(DType::F64, BszId::Mr), 4);
    }

    #[test]
    #[should_panic(expected = "whole multiple")]
    fn multiplicity_enforced() {
        BlkszTable::new(
            [[Blksz::square(4), Blksz::square(4), Blksz::square(66), Blksz::square(128), Blksz::square(256)]; 4],
        );
    }
}
