//! SIF: the DMA link between the EE and the IOP.
//!
//! Each of the two channels has an EE half and an IOP half exchanging words through a FIFO:
//! SIF0 moves data from IOP memory to EE memory, SIF1 from EE memory to IOP memory. Both halves
//! follow tag chains and are stepped alternately until neither can make progress. All of the
//! progress lives in the DMA channel registers and the FIFOs so the engine can be called again at
//! any point to resume.

pub mod channel;
pub mod fifo;
pub mod registers;
pub mod tag;

use self::channel::{DmaChannel, SifDmaRegisters};
use self::fifo::{Fifo, FIFO_SIZE};
use self::tag::{chain_step, DmaTag};
use crate::error::{EeError, EeResult};

/// EE cycles spent per quadword moved
pub const BIAS: u32 = 2;

/// Default limit on the number of tags a half may fetch in a single engine invocation
pub const DEFAULT_TAG_BUDGET: u32 = 4096;

/// Current save state layout. Version 1 didn't store the busy flags.
pub const SIF_STATE_VERSION: u32 = 2;

/// IOP tag flags ending the transfer after the current block
const IOP_TAG_END: u32 = 0xc000_0000;

#[derive(Clone, Copy, PartialEq, Eq, Debug, serde::Serialize, serde::Deserialize)]
pub enum Side {
    Ee,
    Iop,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, serde::Serialize, serde::Deserialize)]
pub enum SifChannel {
    /// IOP -> EE
    Sif0,
    /// EE -> IOP
    Sif1,
}

impl SifChannel {
    fn index(self) -> usize {
        match self {
            SifChannel::Sif0 => 0,
            SifChannel::Sif1 => 1,
        }
    }
}

/// What the SIF engine needs from the rest of the machine
pub trait SifHost {
    fn ee_load(&mut self, addr: u32) -> u32;
    fn ee_store(&mut self, addr: u32, val: u32);
    fn iop_load(&mut self, addr: u32) -> u32;
    fn iop_store(&mut self, addr: u32, val: u32);
    /// Queue the completion interrupt of one side of a channel `cycles` cycles from now
    fn schedule_interrupt(&mut self, side: Side, channel: SifChannel, cycles: u32);
}

/// Outcome of a single step of one half
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Step {
    /// Waiting on the other half (or out of tag budget)
    Idle,
    Progress,
    /// The half finished its transfer
    Done,
}

/// State of one channel beyond what's held in the DMA registers
#[derive(serde::Serialize, serde::Deserialize, Clone, Default, PartialEq, Eq, Debug)]
pub struct SifPath {
    fifo: Fifo,
    /// The EE half is following a tag chain
    chain: bool,
    /// The EE half read the last tag of its chain
    end: bool,
    /// SIF1 IOP half: flags of the current IOP tag
    tag_mode: u32,
    /// IOP half: words left in the current block
    counter: u32,
    /// SIF0 IOP half: first word of the current IOP tag
    data: u32,
    /// SIF0 IOP half: word count of the current IOP tag, rounded up to whole quadwords
    words: u32,
    /// Cycles accumulated by each half since its last interrupt
    ee_cycles: u32,
    iop_cycles: u32,
}

/// Move `count` words from EE memory at `addr` into the FIFO
fn ee_to_fifo<H: SifHost + ?Sized>(fifo: &mut Fifo, host: &mut H, addr: u32, count: usize) {
    let mut buf = [0u32; FIFO_SIZE];
    let buf = &mut buf[..count];

    for (i, w) in buf.iter_mut().enumerate() {
        *w = host.ee_load(addr.wrapping_add(i as u32 * 4));
    }

    fifo.write(buf);
}

fn iop_to_fifo<H: SifHost + ?Sized>(fifo: &mut Fifo, host: &mut H, addr: u32, count: usize) {
    let mut buf = [0u32; FIFO_SIZE];
    let buf = &mut buf[..count];

    for (i, w) in buf.iter_mut().enumerate() {
        *w = host.iop_load(addr.wrapping_add(i as u32 * 4));
    }

    fifo.write(buf);
}

impl SifPath {
    pub fn new() -> SifPath {
        SifPath::default()
    }

    pub fn fifo(&self) -> &Fifo {
        &self.fifo
    }

    pub fn fifo_mut(&mut self) -> &mut Fifo {
        &mut self.fifo
    }

    /// SIF0, IOP half: IOP memory -> FIFO, following the IOP tag list at TADR
    fn sif0_iop<H: SifHost + ?Sized>(
        &mut self,
        ch: &mut DmaChannel,
        host: &mut H,
        budget: &mut u32,
    ) -> Step {
        if self.counter > 0 {
            let n = (self.counter as usize).min(self.fifo.free());

            if n == 0 {
                return Step::Idle;
            }

            iop_to_fifo(&mut self.fifo, host, ch.madr, n);

            ch.madr = ch.madr.wrapping_add(n as u32 * 4);
            self.counter -= n as u32;
            self.iop_cycles = self.iop_cycles.wrapping_add((n as u32).div_ceil(4));

            return Step::Progress;
        }

        if self.data & IOP_TAG_END != 0 {
            self.data = 0;
            return Step::Done;
        }

        // The tag is followed by the EE tag which goes through the FIFO
        if self.fifo.free() < 4 || *budget == 0 {
            return Step::Idle;
        }

        *budget -= 1;

        self.data = host.iop_load(ch.tadr);
        self.words = (host.iop_load(ch.tadr.wrapping_add(4)).wrapping_add(3)) & !3;

        iop_to_fifo(&mut self.fifo, host, ch.tadr.wrapping_add(8), 4);

        trace!(
            "SIF0 IOP tag at 0x{:06x}: data 0x{:08x} words {}",
            ch.tadr,
            self.data,
            self.words
        );

        ch.madr = self.data & 0xff_ffff;
        ch.tadr = ch.tadr.wrapping_add(16);
        self.counter = self.words & 0xff_ffff;

        Step::Progress
    }

    /// SIF0, EE half: FIFO -> EE memory. Tags are read from the FIFO.
    fn sif0_ee<H: SifHost + ?Sized>(
        &mut self,
        ch: &mut DmaChannel,
        host: &mut H,
        budget: &mut u32,
    ) -> Step {
        let available_qw = (self.fifo.len() / 4) as u32;

        if ch.qwc > 0 {
            let n = ch.qwc.min(available_qw);

            if n == 0 {
                return Step::Idle;
            }

            let mut buf = [0u32; FIFO_SIZE];
            let buf = &mut buf[..(n as usize * 4)];

            self.fifo.read(buf);

            for (i, &w) in buf.iter().enumerate() {
                host.ee_store(ch.madr.wrapping_add(i as u32 * 4), w);
            }

            ch.madr = ch.madr.wrapping_add(n * 16);
            ch.qwc -= n;
            self.ee_cycles = self.ee_cycles.wrapping_add(n * BIAS);

            return Step::Progress;
        }

        if (ch.chcr.tie() && ch.chcr.tag_irq()) || self.end {
            self.end = false;
            self.chain = false;
            return Step::Done;
        }

        if available_qw == 0 || *budget == 0 {
            return Step::Idle;
        }

        *budget -= 1;

        let mut tag = [0u32; 4];
        self.fifo.read(&mut tag);

        let t = DmaTag::new(tag[0]);

        trace!("SIF0 EE tag: 0x{:08x} 0x{:08x}", tag[0], tag[1]);

        ch.qwc = u32::from(t.qwc());
        ch.madr = tag[1];
        ch.chcr.set_tag_upper(t.upper());
        self.chain = true;

        if tag[0] & 0x4000_0000 != 0 {
            self.end = true;
        }

        Step::Progress
    }

    /// SIF1, EE half: EE memory -> FIFO, following the EE source chain at TADR
    fn sif1_ee<H: SifHost + ?Sized>(
        &mut self,
        ch: &mut DmaChannel,
        host: &mut H,
        budget: &mut u32,
    ) -> Step {
        if ch.qwc > 0 {
            let n = ch.qwc.min((self.fifo.free() / 4) as u32);

            if n == 0 {
                return Step::Idle;
            }

            ee_to_fifo(&mut self.fifo, host, ch.madr, n as usize * 4);

            ch.madr = ch.madr.wrapping_add(n * 16);
            ch.qwc -= n;
            self.ee_cycles = self.ee_cycles.wrapping_add(n * BIAS);

            return Step::Progress;
        }

        if self.end || (ch.chcr.tie() && ch.chcr.tag_irq()) {
            self.chain = false;
            self.end = false;
            return Step::Done;
        }

        let tte = ch.chcr.tte();

        if (tte && self.fifo.free() < 2) || *budget == 0 {
            return Step::Idle;
        }

        *budget -= 1;

        let tadr = ch.tadr;
        let t = DmaTag::new(host.ee_load(tadr));
        let addr = host.ee_load(tadr.wrapping_add(4));

        trace!("SIF1 EE tag at 0x{:08x}: 0x{:08x} 0x{:08x}", tadr, t.raw(), addr);

        ch.chcr.set_tag_upper(t.upper());
        ch.qwc = u32::from(t.qwc());

        if tte {
            // Only the upper half of the tag is sent
            ee_to_fifo(&mut self.fifo, host, tadr.wrapping_add(8), 2);
        }

        match chain_step(t, addr, tadr) {
            Some(step) => {
                ch.madr = step.madr;
                ch.tadr = step.tadr;
                self.end |= step.end;
            }
            None => {
                // MADR is left as is but QWC was already loaded from the tag: that many
                // quadwords are still sent from the previous MADR before the next tag
                error!(
                    "SIF1: unknown tag ID {} at 0x{:08x}, skipping it",
                    t.raw_id(),
                    tadr
                );
                ch.tadr = tadr.wrapping_add(16);
            }
        }

        if ch.chcr.tie() && t.irq() {
            self.end = true;
        }

        self.chain = true;

        Step::Progress
    }

    /// SIF1, IOP half: FIFO -> IOP memory. IOP tags are read from the FIFO.
    fn sif1_iop<H: SifHost + ?Sized>(
        &mut self,
        ch: &mut DmaChannel,
        host: &mut H,
        budget: &mut u32,
    ) -> Step {
        if self.counter > 0 {
            let n = (self.counter as usize).min(self.fifo.len());

            if n == 0 {
                return Step::Idle;
            }

            let mut buf = [0u32; FIFO_SIZE];
            let buf = &mut buf[..n];

            self.fifo.read(buf);

            for (i, &w) in buf.iter().enumerate() {
                host.iop_store(ch.madr.wrapping_add(i as u32 * 4), w);
            }

            ch.madr = ch.madr.wrapping_add(n as u32 * 4);
            self.counter -= n as u32;
            self.iop_cycles = self.iop_cycles.wrapping_add((n as u32).div_ceil(4));

            return Step::Progress;
        }

        if self.tag_mode & 0xc0 != 0 {
            self.tag_mode = 0;
            return Step::Done;
        }

        if self.fifo.len() < 4 || *budget == 0 {
            return Step::Idle;
        }

        *budget -= 1;

        let mut tag = [0u32; 4];
        self.fifo.read(&mut tag);

        trace!("SIF1 IOP tag: 0x{:08x} 0x{:08x}", tag[0], tag[1]);

        ch.madr = tag[0] & 0xff_ffff;
        self.counter = tag[1];
        self.tag_mode = (tag[0] >> 24) & 0xff;

        Step::Progress
    }
}

/// The two SIF channels
pub struct Sif {
    paths: [SifPath; 2],
    ee_busy: [bool; 2],
    iop_busy: [bool; 2],
    tag_budget: u32,
}

impl Sif {
    pub fn new() -> Sif {
        Sif {
            paths: [SifPath::new(), SifPath::new()],
            ee_busy: [false; 2],
            iop_busy: [false; 2],
            tag_budget: DEFAULT_TAG_BUDGET,
        }
    }

    /// Maximum number of tags each half may fetch per engine invocation. A guest chain pointing
    /// back at itself would otherwise never let the engine return.
    pub fn set_tag_budget(&mut self, budget: u32) {
        self.tag_budget = budget.max(1);
    }

    pub fn reset(&mut self) {
        for path in self.paths.iter_mut() {
            *path = SifPath::new();
        }

        self.ee_busy = [false; 2];
        self.iop_busy = [false; 2];
    }

    pub fn path(&self, channel: SifChannel) -> &SifPath {
        &self.paths[channel.index()]
    }

    pub fn path_mut(&mut self, channel: SifChannel) -> &mut SifPath {
        &mut self.paths[channel.index()]
    }

    pub fn busy(&self, side: Side, channel: SifChannel) -> bool {
        match side {
            Side::Ee => self.ee_busy[channel.index()],
            Side::Iop => self.iop_busy[channel.index()],
        }
    }

    pub fn set_busy(&mut self, side: Side, channel: SifChannel, busy: bool) {
        match side {
            Side::Ee => self.ee_busy[channel.index()] = busy,
            Side::Iop => self.iop_busy[channel.index()] = busy,
        }
    }

    /// The EE started its DMA channel for `channel`
    pub fn ee_kick<H: SifHost + ?Sized>(
        &mut self,
        channel: SifChannel,
        regs: &mut SifDmaRegisters,
        host: &mut H,
    ) {
        let c = channel.index();

        if channel == SifChannel::Sif1 && !regs.ee[c].chcr.chain_mode() {
            warn!(
                "SIF1 EE DMA started outside of chain mode (CHCR 0x{:08x})",
                regs.ee[c].chcr.raw()
            );
        }

        self.ee_busy[c] = true;

        if self.iop_busy[c] {
            self.run(channel, regs, host);
        }
    }

    /// The IOP started its DMA channel for `channel`
    pub fn iop_kick<H: SifHost + ?Sized>(
        &mut self,
        channel: SifChannel,
        regs: &mut SifDmaRegisters,
        host: &mut H,
    ) {
        let c = channel.index();

        self.iop_busy[c] = true;

        if self.ee_busy[c] {
            self.run(channel, regs, host);
        }
    }

    /// Step both halves of `channel` until neither can make progress. Halves whose busy flag is
    /// clear are left alone.
    pub fn run<H: SifHost + ?Sized>(
        &mut self,
        channel: SifChannel,
        regs: &mut SifDmaRegisters,
        host: &mut H,
    ) {
        let c = channel.index();
        let mut ee_budget = self.tag_budget;
        let mut iop_budget = self.tag_budget;

        loop {
            let mut progress = false;

            if self.ee_busy[c] {
                let path = &mut self.paths[c];
                let ch = &mut regs.ee[c];

                let step = match channel {
                    SifChannel::Sif0 => path.sif0_ee(ch, host, &mut ee_budget),
                    SifChannel::Sif1 => path.sif1_ee(ch, host, &mut ee_budget),
                };

                match step {
                    Step::Idle => (),
                    Step::Progress => progress = true,
                    Step::Done => {
                        let cycles = std::mem::take(&mut path.ee_cycles);

                        self.ee_busy[c] = false;
                        host.schedule_interrupt(Side::Ee, channel, cycles);
                        progress = true;
                    }
                }
            }

            if self.iop_busy[c] {
                let path = &mut self.paths[c];
                let ch = &mut regs.iop[c];

                let step = match channel {
                    SifChannel::Sif0 => path.sif0_iop(ch, host, &mut iop_budget),
                    SifChannel::Sif1 => path.sif1_iop(ch, host, &mut iop_budget),
                };

                match step {
                    Step::Idle => (),
                    Step::Progress => progress = true,
                    Step::Done => {
                        let cycles = std::mem::take(&mut path.iop_cycles);

                        self.iop_busy[c] = false;
                        host.schedule_interrupt(Side::Iop, channel, cycles);
                        progress = true;
                    }
                }
            }

            if !progress {
                break;
            }
        }

        if ee_budget == 0 || iop_budget == 0 {
            debug!("{:?}: tag budget exhausted, deferring", channel);
        }
    }

    /// Serialize the FIFOs, chain state and busy flags
    pub fn save_state(&self) -> EeResult<Vec<u8>> {
        let state = SifState {
            version: SIF_STATE_VERSION,
            paths: self.paths.clone(),
            ee_busy: self.ee_busy,
            iop_busy: self.iop_busy,
        };

        Ok(flexbuffers::to_vec(&state)?)
    }

    /// Restore a state produced by `save_state`. Version 1 states predate the busy flags: every
    /// flag is set so that both halves get a chance to resume.
    pub fn load_state(&mut self, buf: &[u8]) -> EeResult<()> {
        let header: StateHeader = flexbuffers::from_slice(buf)?;

        match header.version {
            1 => {
                let state: SifStateV1 = flexbuffers::from_slice(buf)?;

                self.paths = state.paths;
                self.ee_busy = [true; 2];
                self.iop_busy = [true; 2];
            }
            SIF_STATE_VERSION => {
                let state: SifState = flexbuffers::from_slice(buf)?;

                self.paths = state.paths;
                self.ee_busy = state.ee_busy;
                self.iop_busy = state.iop_busy;
            }
            got => {
                return Err(EeError::UnsupportedStateVersion {
                    got,
                    newest: SIF_STATE_VERSION,
                })
            }
        }

        Ok(())
    }
}

impl Default for Sif {
    fn default() -> Sif {
        Sif::new()
    }
}

#[derive(serde::Deserialize)]
struct StateHeader {
    version: u32,
}

#[derive(serde::Serialize, serde::Deserialize)]
struct SifStateV1 {
    version: u32,
    paths: [SifPath; 2],
}

#[derive(serde::Serialize, serde::Deserialize)]
struct SifState {
    version: u32,
    paths: [SifPath; 2],
    ee_busy: [bool; 2],
    iop_busy: [bool; 2],
}
