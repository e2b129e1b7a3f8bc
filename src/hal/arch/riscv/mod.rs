//! RISC-V 裸机后端
//! # Overview
//! 本模块实现真实硬件上的 HAL 接口：M 态 CSR 访问、PMP 编程、
//! 串口输出、hart 间中断（CLINT MSIP）、以及通过 `mret`
//! 下降到 S/U 态的模式切换。
//!
//! # Design
//! - `boot` 模块包含入口汇编：为每个 hart 建立栈并设置 `mscratch`。
//! - `trap` 模块包含 trap 入口汇编与 M 态 trap 分发。
//! - `csr`/`pmp` 模块封装对 S 态 CSR 的原子交换和 PMP 单元的读改写。
//!
//! # Safety
//! - 这里的函数直接读写机器态寄存器，只能在 M 态、且满足各自
//!   文档约束的前提下调用。

use core::arch::asm;

use riscv::register::{mepc, mhartid, mscratch, mstatus};

use crate::config::{CLINT_BASE, TEST_DEVICE_BASE};
use crate::hal::context::{Mode, TrapFrame, TRAP_FRAME_SIZE};

pub mod boot;
pub mod csr;
pub mod pmp;
pub mod trap;
pub mod uart;

pub use csr::csr_swap_state;
pub use pmp::{pmp_configure, pmp_count, pmp_disable};

/// 当前 hart 的索引
///
/// 本平台的 hartid 连续编号，hartid 即 hart 索引。
pub fn current_hartindex() -> usize {
    mhartid::read()
}

/// 机器态初始化：trap 向量、串口与中断代理
///
/// # Overview
/// - 设置 `mtvec` 指向 trap 入口
/// - 把 S 态中断和大部分 S/U 态异常代理给 S 态，
///   ecall 保留在 M 态由固件分发
pub fn machine_init() {
    uart::init();
    trap::init();
    unsafe {
        // S 态软件/时钟/外部中断代理给 S 态
        asm!("csrw mideleg, {}", in(reg) 0x222usize);
        // 代理取指对齐、断点和页异常；ecall（bit 8/9）留在 M 态
        asm!("csrw medeleg, {}", in(reg) 0xb009usize);
    }
}

pub fn machine_intr_enabled() -> bool {
    mstatus::read().mie()
}

pub fn machine_intr_off() {
    unsafe {
        mstatus::clear_mie();
    }
}

pub fn machine_intr_on() {
    unsafe {
        mstatus::set_mie();
    }
}

/// 活动 trap frame 的位置：`mscratch - TRAP_FRAME_SIZE`
pub fn trap_frame_ptr() -> *mut TrapFrame {
    (mscratch::read() - TRAP_FRAME_SIZE) as *mut TrapFrame
}

/// 通过 `mret` 进入下级特权态，不再返回
///
/// 寄存器约定：`a0` = hartid，`a1` = 启动参数。
/// 只能在确定放弃当前 M 态执行流时调用（域启动、HSM 恢复）。
pub fn switch_mode(hartid: usize, arg1: usize, next_addr: usize, mode: Mode) -> ! {
    unsafe {
        match mode {
            Mode::Supervisor => mstatus::set_mpp(mstatus::MPP::Supervisor),
            Mode::User => mstatus::set_mpp(mstatus::MPP::User),
        }
        mepc::write(next_addr);
        // 进入下级后中断使能交由其自身的状态寄存器控制
        asm!("csrc mstatus, {}", in(reg) 1usize << 7);
        asm!("mret", in("a0") hartid, in("a1") arg1, options(noreturn));
    }
}

fn msip_ptr(hartindex: usize) -> *mut u32 {
    (CLINT_BASE + hartindex * 4) as *mut u32
}

/// 向目标 hart 发送软件中断，用于唤醒停靠中的 hart
pub fn send_ipi(hartindex: usize) {
    unsafe {
        msip_ptr(hartindex).write_volatile(1);
    }
}

/// 清除当前 hart 的软件中断挂起位
pub fn clear_ipi() {
    unsafe {
        msip_ptr(current_hartindex()).write_volatile(0);
    }
}

/// 等待中断到来（MSIP 挂起即可唤醒，与 MIE 无关）
pub fn wait_for_interrupt() {
    unsafe {
        riscv::asm::wfi();
    }
}

pub fn console_putchar(c: u8) {
    uart::putchar(c);
}

/// 通过 QEMU 测试设备关机
pub fn shutdown() -> ! {
    unsafe {
        (TEST_DEVICE_BASE as *mut u32).write_volatile(0x5555);
    }
    loop {
        wait_for_interrupt();
    }
}
