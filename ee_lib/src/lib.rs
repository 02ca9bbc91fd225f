//! PlayStation 2 Emotion Engine interpreter core

// ```
#![allow(clippy::needless_range_loop)]
// This one is not too terrible but I find it not very useful when writing an emulator because
// the vast majority of the time our types are actually constrained by the original
// hardware, so using "as" casts is not a problem the vast majority of the time.
#![allow(clippy::cast_lossless)]
// Wants to rewrite some numeric comparison chains as match when it doesn't make a lot of sense
// IMO.
#![allow(clippy::comparison_chain)]
// Not every piece of hardware state has a meaningful "default", `new` is enough
#![allow(clippy::new_without_default)]

#[macro_use]
extern crate arrayref;
#[macro_use]
extern crate log;

mod bitwise;
pub mod ee;
pub mod error;
pub mod settings;

use serde::Serialize;

use ee::bus::{Bus, SimpleBus};
use ee::memory::map::mask_region;
use ee::processor::cpu::{self, Cpu};
use ee::processor::vu::{self, VuPair, VuUnit};
use ee::sif::channel::SifDmaRegisters;
use ee::sif::{Sif, SifChannel, SifHost};
use error::{EeError, EeResult};
use settings::CoreSettings;

/// Magic bytes at the start of every save state
const STATE_MAGIC: [u8; 4] = *b"EES1";

/// Emulation context: the interpreter, the SIF engine and the machine they're plugged into
pub struct Ee<B: Bus + SifHost> {
    cpu: Cpu,
    sif: Sif,
    /// EE and IOP DMA channels used by the SIF
    dma: SifDmaRegisters,
    settings: CoreSettings,
    bus: B,
}

impl<B: Bus + SifHost> Ee<B> {
    pub fn new(bus: B, settings: CoreSettings) -> Ee<B> {
        let mut ee = Ee {
            cpu: Cpu::new(),
            sif: Sif::new(),
            dma: SifDmaRegisters::new(),
            settings: CoreSettings::default(),
            bus,
        };

        ee.apply_settings(settings);

        ee
    }

    pub fn apply_settings(&mut self, settings: CoreSettings) {
        self.cpu.set_bios_logging(settings.log_bios_calls);
        self.sif.set_tag_budget(settings.sif_tag_budget);
        self.settings = settings;
    }

    pub fn settings(&self) -> &CoreSettings {
        &self.settings
    }

    pub fn cpu(&self) -> &Cpu {
        &self.cpu
    }

    pub fn cpu_mut(&mut self) -> &mut Cpu {
        &mut self.cpu
    }

    pub fn bus(&self) -> &B {
        &self.bus
    }

    pub fn bus_mut(&mut self) -> &mut B {
        &mut self.bus
    }

    pub fn sif(&self) -> &Sif {
        &self.sif
    }

    pub fn sif_mut(&mut self) -> &mut Sif {
        &mut self.sif
    }

    pub fn dma(&self) -> &SifDmaRegisters {
        &self.dma
    }

    pub fn dma_mut(&mut self) -> &mut SifDmaRegisters {
        &mut self.dma
    }

    /// Execute a single instruction (and its delay slot if it's a branch)
    pub fn step(&mut self) {
        cpu::step(&mut self.cpu, &mut self.bus);
    }

    /// Execute instructions until a branch is committed, returns the number of instructions run
    pub fn run_to_branch(&mut self) -> u64 {
        cpu::run_to_branch(&mut self.cpu, &mut self.bus)
    }

    /// The EE DMA controller started the channel
    pub fn ee_kick(&mut self, channel: SifChannel) {
        self.sif.ee_kick(channel, &mut self.dma, &mut self.bus);
    }

    /// The IOP DMA controller started the channel
    pub fn iop_kick(&mut self, channel: SifChannel) {
        self.sif.iop_kick(channel, &mut self.dma, &mut self.bus);
    }

    /// Resume a transfer, for instance after a FIFO was drained or filled from elsewhere
    pub fn run_sif(&mut self, channel: SifChannel) {
        self.sif.run(channel, &mut self.dma, &mut self.bus);
    }

    pub fn execute_vu0_block<P: VuPair + ?Sized>(&mut self, pair: &mut P) -> u32 {
        vu::execute_vu_block(pair, VuUnit::Vu0)
    }

    pub fn execute_vu1_block<P: VuPair + ?Sized>(&mut self, pair: &mut P) -> u32 {
        vu::execute_vu_block(pair, VuUnit::Vu1)
    }

    /// Reset the CPU and the SIF. Memory and the bus devices are left alone.
    pub fn reset(&mut self) {
        info!("EE reset");

        self.cpu.reset();
        self.sif.reset();
        self.dma = SifDmaRegisters::new();
    }

    /// Serialize the CPU, the SIF and its DMA channels. The result starts with a 4-byte magic
    /// followed by the little-endian length of the flexbuffer payload.
    pub fn save_state(&self) -> EeResult<Vec<u8>> {
        let snapshot = SnapshotRef {
            cpu: &self.cpu,
            dma: &self.dma,
            sif: self.sif.save_state()?,
        };

        let mut fb = flexbuffers::FlexbufferSerializer::new();

        snapshot.serialize(&mut fb)?;

        let fbuf = fb.view();
        let mut buf = Vec::with_capacity(fbuf.len() + 8);

        buf.extend_from_slice(&STATE_MAGIC);
        buf.extend_from_slice(&(fbuf.len() as u32).to_le_bytes());
        buf.extend_from_slice(fbuf);

        Ok(buf)
    }

    /// Restore a state produced by `save_state`. Nothing is modified if the state is rejected.
    pub fn load_state(&mut self, buf: &[u8]) -> EeResult<()> {
        if buf.len() < 8 || buf[0..4] != STATE_MAGIC {
            return Err(EeError::InvalidState("bad magic".to_string()));
        }

        let len = u32::from_le_bytes(*array_ref![buf, 4, 4]) as usize;

        let payload = match buf.get(8..).and_then(|b| b.get(..len)) {
            Some(p) => p,
            None => {
                return Err(EeError::InvalidState(format!(
                    "truncated state ({} bytes, expected {})",
                    buf.len() - 8,
                    len
                )))
            }
        };

        let snapshot: Snapshot = flexbuffers::from_slice(payload)?;

        let mut sif = Sif::new();
        sif.set_tag_budget(self.settings.sif_tag_budget);
        sif.load_state(&snapshot.sif)?;

        self.cpu = snapshot.cpu;
        self.cpu.set_bios_logging(self.settings.log_bios_calls);
        self.sif = sif;
        self.dma = snapshot.dma;

        Ok(())
    }
}

impl Ee<SimpleBus> {
    /// Copy a raw guest binary in main RAM at `addr` and start executing it at `entry`
    pub fn load_image(&mut self, addr: u32, image: &[u8], entry: u32) -> EeResult<()> {
        self.bus.map.ram.load_image(mask_region(addr), image)?;
        self.cpu.set_pc(entry);

        info!(
            "Loaded {} bytes at 0x{:08x}, entry point 0x{:08x}",
            image.len(),
            addr,
            entry
        );

        Ok(())
    }
}

#[derive(serde::Serialize)]
struct SnapshotRef<'a> {
    cpu: &'a Cpu,
    dma: &'a SifDmaRegisters,
    sif: Vec<u8>,
}

#[derive(serde::Deserialize)]
struct Snapshot {
    cpu: Cpu,
    dma: SifDmaRegisters,
    sif: Vec<u8>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use ee::memory::ram::Ram;
    use ee::memory::Memory;
    use ee::processor::asm;
    use ee::processor::vu::tests::FakePair;
    use ee::processor::RegisterIndex;
    use ee::sif::channel::Chcr;
    use ee::sif::Side;

    fn machine() -> Ee<SimpleBus> {
        let ee_ram = Ram::with_size(2 * 1024 * 1024).unwrap();
        let iop_ram = Ram::with_size(256 * 1024).unwrap();

        Ee::new(SimpleBus::new(ee_ram, iop_ram), CoreSettings::default())
    }

    fn program(words: &[u32]) -> Vec<u8> {
        words.iter().flat_map(|w| w.to_le_bytes()).collect()
    }

    #[test]
    fn runs_a_loaded_image() {
        let mut ee = machine();

        let image = program(&[
            asm::addiu(8, 0, 3),
            // loop: t0 -= 1; bne t0, zero, loop
            asm::addiu(8, 8, -1),
            asm::bne(8, 0, -2),
            asm::addiu(9, 9, 1),
            asm::j(0x8010_0018),
            asm::nop(),
        ]);

        ee.load_image(0x8010_0000, &image, 0x8010_0000).unwrap();

        assert_eq!(ee.run_to_branch(), 4);
        assert_eq!(ee.cpu().pc(), 0x8010_0004);
        ee.run_to_branch();
        ee.run_to_branch();

        assert_eq!(ee.cpu().reg(RegisterIndex(8)).ud(0), 0);
        assert_eq!(ee.cpu().reg(RegisterIndex(9)).ud(0), 3);
        assert_eq!(ee.cpu().pc(), 0x8010_0018);
    }

    #[test]
    fn oversized_image_is_rejected() {
        let mut ee = machine();

        assert!(matches!(
            ee.load_image(0x001f_fff0, &[0; 32], 0),
            Err(EeError::ImageTooLarge { .. })
        ));
    }

    #[test]
    fn settings_reach_the_sif() {
        let mut ee = machine();

        ee.apply_settings(CoreSettings {
            log_bios_calls: false,
            sif_tag_budget: 3,
        });

        // Self-referencing NEXT tag
        ee.bus_mut().write32(0x1000, 2 << 28);
        ee.bus_mut().write32(0x1004, 0x1000);
        ee.dma_mut().ee[1].chcr = Chcr::new(0x185);
        ee.dma_mut().ee[1].tadr = 0x1000;
        ee.sif_mut().set_busy(Side::Iop, SifChannel::Sif1, true);

        ee.ee_kick(SifChannel::Sif1);

        assert!(ee.sif().busy(Side::Ee, SifChannel::Sif1));
        assert_eq!(ee.dma().ee[1].tadr, 0x1000);
        assert!(ee.bus().pending_irqs.is_empty());
    }

    #[test]
    fn sif_kicks_go_through_the_bus() {
        let mut ee = machine();

        // REFE, 1 quadword from 0x2000, followed by the IOP tag stored in that quadword
        ee.bus_mut().write32(0x1000, 1);
        ee.bus_mut().write32(0x1004, 0x2000);
        ee.bus_mut().write32(0x2000, 0xc000_4000);
        ee.bus_mut().write32(0x2004, 0);
        ee.dma_mut().ee[1].chcr = Chcr::new(0x185);
        ee.dma_mut().ee[1].tadr = 0x1000;

        ee.ee_kick(SifChannel::Sif1);
        assert!(ee.bus().pending_irqs.is_empty());

        ee.iop_kick(SifChannel::Sif1);

        let irqs = ee.bus_mut().take_irqs();

        assert_eq!(irqs.len(), 2);
        assert!(!ee.sif().busy(Side::Ee, SifChannel::Sif1));
        assert!(!ee.sif().busy(Side::Iop, SifChannel::Sif1));
        assert_eq!(ee.dma().iop[1].madr, 0x4000);
    }

    #[test]
    fn vu_blocks_use_their_unit() {
        let mut ee = machine();
        let mut pair = FakePair {
            remaining: [5, 300],
            ..FakePair::default()
        };

        assert_eq!(ee.execute_vu0_block(&mut pair), 5);
        assert_eq!(ee.execute_vu1_block(&mut pair), vu::VU_BLOCK_CAP);
        assert_eq!(pair.executed, [5, vu::VU_BLOCK_CAP]);
    }

    #[test]
    fn save_state_round_trip() {
        let mut ee = machine();
        let image = program(&[asm::addiu(8, 0, 42), asm::lui(9, 0x1234), asm::nop()]);

        ee.load_image(0x0010_0000, &image, 0x0010_0000).unwrap();
        ee.step();
        ee.step();
        ee.dma_mut().iop[0].madr = 0x1234;
        ee.sif_mut().set_busy(Side::Ee, SifChannel::Sif0, true);

        let state = ee.save_state().unwrap();

        let mut other = machine();
        other.load_state(&state).unwrap();

        assert_eq!(other.cpu().pc(), 0x0010_0008);
        assert_eq!(other.cpu().cycle(), 2);
        assert_eq!(other.cpu().reg(RegisterIndex(8)).ud(0), 42);
        assert_eq!(other.cpu().reg(RegisterIndex(9)).ud(0), 0x1234_0000);
        assert_eq!(other.dma(), ee.dma());
        assert!(other.sif().busy(Side::Ee, SifChannel::Sif0));
        assert!(!other.sif().busy(Side::Iop, SifChannel::Sif0));
    }

    #[test]
    fn bad_states_are_rejected() {
        let mut ee = machine();

        let mut state = ee.save_state().unwrap();

        assert!(ee.load_state(&state[..6]).is_err());
        assert!(ee.load_state(&state[..state.len() - 1]).is_err());

        state[0] = b'X';
        assert!(matches!(ee.load_state(&state), Err(EeError::InvalidState(_))));
    }

    #[test]
    fn reset_clears_cpu_and_sif() {
        let mut ee = machine();

        ee.cpu_mut().set_pc(0x1234);
        ee.sif_mut().set_busy(Side::Iop, SifChannel::Sif1, true);
        ee.dma_mut().ee[0].qwc = 5;

        ee.reset();

        assert_eq!(ee.cpu().pc(), cpu::RESET_PC);
        assert!(!ee.sif().busy(Side::Iop, SifChannel::Sif1));
        assert_eq!(ee.dma().ee[0].qwc, 0);
    }
}
