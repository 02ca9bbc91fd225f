//! High level view of the BIOS system calls. Nothing here changes the architectural state: the
//! calls are traced and the guest's debug console output is captured, the BIOS code itself still
//! runs through the syscall exception.

use super::cpu::Cpu;
use super::reg;
use crate::ee::bus::Bus;
use crate::ee::memory::Memory;
use crate::ee::tty::Tty;

/// Deci2Call
const DECI2_CALL: u8 = 0x7c;
/// sceSifSetDma
const SIF_SET_DMA: u8 = 0x77;

/// Longest payload printed for a single deci2 "reqsend"
const DECI2_MAX_PRINT: u32 = 255;
/// Upper bound on the length of a "kputs" string, in case the guest passes garbage
const KPUTS_MAX_LEN: u32 = 1024;

pub struct BiosHle {
    /// Trace every system call
    pub log_calls: bool,
    /// Guest address of the deci2 channel block, 0 if no channel has been opened
    deci2_addr: u32,
    deci2_handler: u32,
    tty: Tty,
}

impl BiosHle {
    pub fn new() -> BiosHle {
        BiosHle {
            log_calls: true,
            deci2_addr: 0,
            deci2_handler: 0,
            tty: Tty::new(),
        }
    }

    pub fn tty(&mut self) -> &mut Tty {
        &mut self.tty
    }

    /// Handle a deci2 sub-call. `arg` is the guest address of the argument block.
    fn deci2_call<M: Memory + ?Sized>(&mut self, m: &mut M, function: u32, arg: u32) {
        match function {
            // open
            1 => {
                if arg == 0 {
                    warn!("Deci2 open with a NULL argument block");
                    return;
                }

                self.deci2_addr = m.read32(arg.wrapping_add(4));
                self.deci2_handler = m.read32(arg.wrapping_add(8));

                debug!(
                    "Deci2 channel opened: block 0x{:08x} handler 0x{:08x}",
                    self.deci2_addr, self.deci2_handler
                );
            }
            // reqsend
            3 => {
                let block = self.deci2_addr;

                if block == 0 {
                    return;
                }

                let len = m.read32(block.wrapping_add(4));

                if len > 0xc {
                    let data = m.read32(block.wrapping_add(16)).wrapping_add(0xc);
                    let count = (len - 0xc).min(DECI2_MAX_PRINT);

                    self.print(m, data, count);
                }

                m.write32(block.wrapping_add(12), 0);
            }
            // poll, exrecv, exsend
            2 | 4 | 5 | 6 => (),
            // kputs
            0x10 => {
                if arg == 0 {
                    return;
                }

                let s = m.read32(arg);

                if s != 0 {
                    self.print(m, s, KPUTS_MAX_LEN);
                }
            }
            _ => debug!("Unhandled deci2 call {}", function),
        }
    }

    /// Copy the NUL-terminated string at `addr` (at most `max` bytes) to the console
    fn print<M: Memory + ?Sized>(&mut self, m: &mut M, addr: u32, max: u32) {
        let text: Vec<u8> = (0..max)
            .map(|i| m.read8(addr.wrapping_add(i)))
            .take_while(|&b| b != 0)
            .collect();

        self.tty.push_bytes(&text);
    }
}

impl Default for BiosHle {
    fn default() -> BiosHle {
        BiosHle::new()
    }
}

/// Call number of the system call being made: the low byte of v1, negated if v1 is negative
/// (the "i" variants callable from interrupt handlers use negative numbers)
pub fn call_number(v1: u32) -> u8 {
    if (v1 as i32) < 0 {
        (v1 as i32).wrapping_neg() as u8
    } else {
        v1 as u8
    }
}

pub fn call_name(call: u8) -> &'static str {
    SYSCALL_NAMES[(call & 0x7f) as usize]
}

/// Called by SYSCALL before the exception is raised
pub fn syscall(cpu: &mut Cpu, bus: &mut dyn Bus) {
    let call = call_number(cpu.reg(reg::V1).ul(0));
    let a0 = cpu.reg(reg::A0).ul(0);
    let a1 = cpu.reg(reg::A1).ul(0);

    if cpu.bios.log_calls {
        trace!(
            "BIOS call 0x{:02x} {}(0x{:08x}, 0x{:08x}) from 0x{:08x}",
            call,
            call_name(call),
            a0,
            a1,
            cpu.pc().wrapping_sub(4)
        );
    }

    match call {
        SIF_SET_DMA => trace_sif_dma(bus, a0, a1),
        DECI2_CALL => {
            // Sub-calls above 0x10 don't exist
            if a0 <= 0x10 {
                cpu.bios.deci2_call(bus, a0, a1);
            }
        }
        _ => (),
    }
}

/// Log the last descriptor of an sceSifSetDma transfer list
fn trace_sif_dma<M: Memory + ?Sized>(m: &mut M, list: u32, count: u32) {
    if list == 0 || count == 0 {
        return;
    }

    let desc = list.wrapping_add((count - 1).wrapping_mul(16));

    let src = m.read32(desc);
    let dest = m.read32(desc.wrapping_add(4));
    let size = m.read32(desc.wrapping_add(8));
    let attr = m.read32(desc.wrapping_add(12));

    trace!(
        "sceSifSetDma: {} transfer(s), last: src 0x{:08x} dest 0x{:08x} size 0x{:x} attr 0x{:x}",
        count,
        src,
        dest,
        size,
        attr
    );
}

/// Names of the EE kernel system calls
#[rustfmt::skip]
static SYSCALL_NAMES: [&str; 128] = [
    // 0x00
    "RFU000_FullReset", "ResetEE", "SetGsCrt", "RFU003",
    "Exit", "RFU005", "LoadExecPS2", "ExecPS2",
    "RFU008", "RFU009", "AddSbusIntcHandler", "RemoveSbusIntcHandler",
    "Interrupt2Iop", "SetVTLBRefillHandler", "SetVCommonHandler", "SetVInterruptHandler",
    // 0x10
    "AddIntcHandler", "RemoveIntcHandler", "AddDmacHandler", "RemoveDmacHandler",
    "_EnableIntc", "_DisableIntc", "_EnableDmac", "_DisableDmac",
    "_SetAlarm", "_ReleaseAlarm", "_iEnableIntc", "_iDisableIntc",
    "_iEnableDmac", "_iDisableDmac", "_iSetAlarm", "_iReleaseAlarm",
    // 0x20
    "CreateThread", "DeleteThread", "StartThread", "ExitThread",
    "ExitDeleteThread", "TerminateThread", "iTerminateThread", "DisableDispatchThread",
    "EnableDispatchThread", "ChangeThreadPriority", "iChangeThreadPriority", "RotateThreadReadyQueue",
    "iRotateThreadReadyQueue", "ReleaseWaitThread", "iReleaseWaitThread", "GetThreadId",
    // 0x30
    "ReferThreadStatus", "iReferThreadStatus", "SleepThread", "WakeupThread",
    "_iWakeupThread", "CancelWakeupThread", "iCancelWakeupThread", "SuspendThread",
    "iSuspendThread", "ResumeThread", "iResumeThread", "JoinThread",
    "RFU060", "RFU061", "EndOfHeap", "RFU063",
    // 0x40
    "CreateSema", "DeleteSema", "SignalSema", "iSignalSema",
    "WaitSema", "PollSema", "iPollSema", "ReferSemaStatus",
    "iReferSemaStatus", "RFU073", "SetOsdConfigParam", "GetOsdConfigParam",
    "GetGsHParam", "GetGsVParam", "SetGsHParam", "SetGsVParam",
    // 0x50
    "RFU080_CreateEventFlag", "RFU081_DeleteEventFlag", "RFU082_SetEventFlag", "RFU083_iSetEventFlag",
    "RFU084_ClearEventFlag", "RFU085_iClearEventFlag", "RFU086_WaitEventFlag", "RFU087_PollEventFlag",
    "RFU088_iPollEventFlag", "RFU089_ReferEventFlagStatus", "RFU090_iReferEventFlagStatus", "RFU091_GetEntryAddress",
    "EnableIntcHandler_iEnableIntcHandler", "DisableIntcHandler_iDisableIntcHandler",
    "EnableDmacHandler_iEnableDmacHandler", "DisableDmacHandler_iDisableDmacHandler",
    // 0x60
    "KSeg0", "EnableCache", "DisableCache", "GetCop0",
    "FlushCache", "RFU101", "CpuConfig", "iGetCop0",
    "iFlushCache", "RFU105", "iCpuConfig", "sceSifStopDma",
    "SetCPUTimerHandler", "SetCPUTimer", "SetOsdConfigParam2", "SetOsdConfigParam2",
    // 0x70
    "GsGetIMR_iGsGetIMR", "GsGetIMR_iGsPutIMR", "SetPgifHandler", "SetVSyncFlag",
    "RFU116", "print", "sceSifDmaStat_isceSifDmaStat", "sceSifSetDma_isceSifSetDma",
    "sceSifSetDChain_isceSifSetDChain", "sceSifSetReg", "sceSifGetReg", "ExecOSD",
    "Deci2Call", "PSMode", "MachineType", "GetMemorySize",
];
