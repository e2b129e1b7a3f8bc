//! PMP 单元驱动
//!
//! # Overview
//! - 每条 PMP 表项由 `pmpaddr{i}` 和 `pmpcfg{0,2}` 中的一个字节组成。
//! - 域切换时先逐条关闭所有表项，再按目标域的区域列表重新编程：
//!   PMP 表项不能原子替换，新旧区域交叠时先关后开才不会出现
//!   瞬时的越权窗口。
//!
//! # Design
//! - 只使用 NAPOT 编址模式，区域由 `PmpRegion` 描述。
//! - RV64 下 `pmpcfg0` 承载表项 0-7，`pmpcfg2` 承载表项 8-15。

use core::arch::asm;

use crate::hal::context::PmpRegion;

/// 本平台实现的 PMP 表项数
pub const PMP_COUNT: usize = 16;

/// NAPOT 编址模式在 cfg 字节中的编码
const PMP_A_NAPOT: u8 = 0x18;

pub fn pmp_count() -> usize {
    PMP_COUNT
}

fn pmpcfg_read(group: usize) -> usize {
    let v: usize;
    unsafe {
        match group {
            0 => asm!("csrr {}, pmpcfg0", out(reg) v),
            _ => asm!("csrr {}, pmpcfg2", out(reg) v),
        }
    }
    v
}

fn pmpcfg_write(group: usize, v: usize) {
    unsafe {
        match group {
            0 => asm!("csrw pmpcfg0, {}", in(reg) v),
            _ => asm!("csrw pmpcfg2, {}", in(reg) v),
        }
    }
}

fn pmpaddr_write(i: usize, v: usize) {
    unsafe {
        match i {
            0 => asm!("csrw pmpaddr0, {}", in(reg) v),
            1 => asm!("csrw pmpaddr1, {}", in(reg) v),
            2 => asm!("csrw pmpaddr2, {}", in(reg) v),
            3 => asm!("csrw pmpaddr3, {}", in(reg) v),
            4 => asm!("csrw pmpaddr4, {}", in(reg) v),
            5 => asm!("csrw pmpaddr5, {}", in(reg) v),
            6 => asm!("csrw pmpaddr6, {}", in(reg) v),
            7 => asm!("csrw pmpaddr7, {}", in(reg) v),
            8 => asm!("csrw pmpaddr8, {}", in(reg) v),
            9 => asm!("csrw pmpaddr9, {}", in(reg) v),
            10 => asm!("csrw pmpaddr10, {}", in(reg) v),
            11 => asm!("csrw pmpaddr11, {}", in(reg) v),
            12 => asm!("csrw pmpaddr12, {}", in(reg) v),
            13 => asm!("csrw pmpaddr13, {}", in(reg) v),
            14 => asm!("csrw pmpaddr14, {}", in(reg) v),
            _ => asm!("csrw pmpaddr15, {}", in(reg) v),
        }
    }
}

/// 关闭一条 PMP 表项（清掉对应的 cfg 字节）
pub fn pmp_disable(i: usize) {
    debug_assert!(i < PMP_COUNT);
    let group = i / 8;
    let shift = (i % 8) * 8;
    let cfg = pmpcfg_read(group) & !(0xff << shift);
    pmpcfg_write(group, cfg);
}

/// 按区域列表从表项 0 起重新编程 PMP
///
/// 调用前所有表项必须已被关闭，多余的区域被忽略。
pub fn pmp_configure(regions: &[PmpRegion]) {
    for (i, region) in regions.iter().take(PMP_COUNT).enumerate() {
        pmpaddr_write(i, region.napot_addr());
        let group = i / 8;
        let shift = (i % 8) * 8;
        let byte = (region.perm.bits() | PMP_A_NAPOT) as usize;
        let cfg = (pmpcfg_read(group) & !(0xff << shift)) | (byte << shift);
        pmpcfg_write(group, cfg);
    }
}
