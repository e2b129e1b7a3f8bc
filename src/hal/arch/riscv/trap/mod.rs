//! M 态陷阱处理模块
//!
//! 固件只预期处理两类陷阱：
//! - 来自 S/U 态的 ecall，交给 SBI 分发层；
//! - 机器软件中断（HSM 唤醒用），清除挂起位即可。
//!
//! # Control Flow
//! 1. 硬件按 `mtvec` 跳到 `trap.S` 的 `__m_trap_entry`。
//! 2. 汇编把现场保存到 `mscratch - TRAP_FRAME_SIZE` 处的活动 frame。
//! 3. `m_trap_handler` 分发处理；域切换可能就地替换 frame 内容。
//! 4. 汇编从活动 frame 弹出现场并 `mret`，弹出的可能已是另一个域。

use core::arch::global_asm;

use riscv::register::mcause::{self, Exception, Interrupt, Trap};
use riscv::register::mtval;
use riscv::register::mtvec::{self, TrapMode};

use crate::hal::context::TrapFrame;

global_asm!(include_str!("trap.S"));

/// 设置 M 态 trap 入口
pub fn init() {
    extern "C" {
        fn __m_trap_entry();
    }
    unsafe {
        mtvec::write(__m_trap_entry as usize, TrapMode::Direct);
    }
}

/// M 态 trap 的统一分发入口
#[no_mangle]
pub extern "C" fn m_trap_handler(frame: &mut TrapFrame) {
    let cause = mcause::read();
    match cause.cause() {
        Trap::Exception(Exception::SupervisorEnvCall)
        | Trap::Exception(Exception::UserEnvCall) => {
            crate::ecall::handle_ecall(frame);
        }
        Trap::Interrupt(Interrupt::MachineSoft) => {
            super::clear_ipi();
        }
        _ => {
            panic!(
                "unsupported machine trap: {:?}, mtval = {:#x}, mepc = {:#x}",
                cause.cause(),
                mtval::read(),
                frame.mepc
            );
        }
    }
}
