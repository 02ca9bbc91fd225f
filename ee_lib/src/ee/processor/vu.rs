//! Lockstep execution of the vector unit micro programs. The micro instruction semantics live
//! outside of this crate; the interpreter only decides how many steps to give them.

/// Maximum number of micro instructions run per block
pub const VU_BLOCK_CAP: u32 = 128;

/// VPU_STAT busy bits
pub const VPU_STAT_VU0_BUSY: u32 = 1 << 0;
pub const VPU_STAT_VU1_BUSY: u32 = 1 << 8;

/// A single vector unit running a micro program
pub trait MicroVu {
    /// Execute one micro instruction
    fn exec(&mut self);
    /// True while the micro program is running
    fn busy(&self) -> bool;
    /// True if the last instruction executed was a branch whose delay slot is pending
    fn in_branch(&self) -> bool;
    /// True if the end bit was seen and the final instruction is still pending
    fn ebit(&self) -> bool;
}

/// Step `vu` while it's busy, at most `VU_BLOCK_CAP` times. If the cap is reached with a branch
/// or an end bit pending one more instruction is executed so that the block never stops between
/// the two halves. Returns the number of instructions executed.
pub fn run_vu_block<V: MicroVu + ?Sized>(vu: &mut V) -> u32 {
    let mut executed = 0;

    while executed < VU_BLOCK_CAP && vu.busy() {
        vu.exec();
        executed += 1;
    }

    if executed == VU_BLOCK_CAP && (vu.in_branch() || vu.ebit()) {
        vu.exec();
        executed += 1;
    }

    executed
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum VuUnit {
    Vu0,
    Vu1,
}

impl VuUnit {
    fn busy_mask(self) -> u32 {
        match self {
            VuUnit::Vu0 => VPU_STAT_VU0_BUSY,
            VuUnit::Vu1 => VPU_STAT_VU1_BUSY,
        }
    }
}

/// Both vector units, sharing the VPU_STAT register
pub trait VuPair {
    fn vpu_stat(&self) -> u32;
    fn exec(&mut self, unit: VuUnit);
    fn in_branch(&self, unit: VuUnit) -> bool;
    fn ebit(&self, unit: VuUnit) -> bool;
}

/// One unit of a `VuPair`, busy according to its VPU_STAT bit
struct Unit<'a, P: VuPair + ?Sized> {
    pair: &'a mut P,
    unit: VuUnit,
}

impl<P: VuPair + ?Sized> MicroVu for Unit<'_, P> {
    fn exec(&mut self) {
        self.pair.exec(self.unit)
    }

    fn busy(&self) -> bool {
        self.pair.vpu_stat() & self.unit.busy_mask() != 0
    }

    fn in_branch(&self) -> bool {
        self.pair.in_branch(self.unit)
    }

    fn ebit(&self) -> bool {
        self.pair.ebit(self.unit)
    }
}

/// Run a block of `unit`'s micro program
pub fn execute_vu_block<P: VuPair + ?Sized>(pair: &mut P, unit: VuUnit) -> u32 {
    run_vu_block(&mut Unit { pair, unit })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Micro program of a fixed length. A branch is pending after every odd instruction, the end
    /// bit is raised one instruction before the end.
    #[derive(Default)]
    pub(crate) struct FakeVu {
        pub remaining: u32,
        pub executed: u32,
        pub branch_every_other: bool,
    }

    impl MicroVu for FakeVu {
        fn exec(&mut self) {
            self.executed += 1;
            self.remaining = self.remaining.saturating_sub(1);
        }

        fn busy(&self) -> bool {
            self.remaining > 0
        }

        fn in_branch(&self) -> bool {
            self.branch_every_other && self.executed % 2 == 0
        }

        fn ebit(&self) -> bool {
            self.remaining == 1
        }
    }

    #[test]
    fn short_program_runs_to_completion() {
        let mut vu = FakeVu {
            remaining: 10,
            ..FakeVu::default()
        };

        assert_eq!(run_vu_block(&mut vu), 10);
        assert!(!vu.busy());
        assert_eq!(run_vu_block(&mut vu), 0);
    }

    #[test]
    fn block_is_capped() {
        let mut vu = FakeVu {
            remaining: 1000,
            ..FakeVu::default()
        };

        assert_eq!(run_vu_block(&mut vu), VU_BLOCK_CAP);
        assert_eq!(vu.remaining, 1000 - VU_BLOCK_CAP);
    }

    #[test]
    fn pending_branch_gets_its_tail_step() {
        let mut vu = FakeVu {
            remaining: 1000,
            branch_every_other: true,
            ..FakeVu::default()
        };

        assert_eq!(run_vu_block(&mut vu), VU_BLOCK_CAP + 1);
    }

    #[test]
    fn pending_end_bit_gets_its_tail_step() {
        let mut vu = FakeVu {
            remaining: VU_BLOCK_CAP + 1,
            ..FakeVu::default()
        };

        assert_eq!(run_vu_block(&mut vu), VU_BLOCK_CAP + 1);
        assert!(!vu.busy());
    }

    /// Pair where each unit runs a fixed number of instructions and reports it in VPU_STAT
    #[derive(Default)]
    pub(crate) struct FakePair {
        pub remaining: [u32; 2],
        pub executed: [u32; 2],
    }

    fn index(unit: VuUnit) -> usize {
        match unit {
            VuUnit::Vu0 => 0,
            VuUnit::Vu1 => 1,
        }
    }

    impl VuPair for FakePair {
        fn vpu_stat(&self) -> u32 {
            let mut stat = 0;

            if self.remaining[0] > 0 {
                stat |= VPU_STAT_VU0_BUSY;
            }
            if self.remaining[1] > 0 {
                stat |= VPU_STAT_VU1_BUSY;
            }

            stat
        }

        fn exec(&mut self, unit: VuUnit) {
            let i = index(unit);

            self.remaining[i] = self.remaining[i].saturating_sub(1);
            self.executed[i] += 1;
        }

        fn in_branch(&self, _: VuUnit) -> bool {
            false
        }

        fn ebit(&self, _: VuUnit) -> bool {
            false
        }
    }

    #[test]
    fn units_use_their_own_status_bit() {
        let mut pair = FakePair {
            remaining: [3, 200],
            ..FakePair::default()
        };

        assert_eq!(execute_vu_block(&mut pair, VuUnit::Vu1), VU_BLOCK_CAP);
        assert_eq!(pair.executed, [0, VU_BLOCK_CAP]);

        assert_eq!(execute_vu_block(&mut pair, VuUnit::Vu0), 3);
        assert_eq!(pair.vpu_stat(), VPU_STAT_VU1_BUSY);
    }
}
