//! 硬件上下文类型
//!
//! 本模块定义跨后端共享的硬件状态快照类型：trap frame、
//! S 态 CSR 快照、特权级与 PMP 区域描述。
//!
//! # Overview
//! - `GeneralRegs`：RISC-V 32 个通用寄存器，按调用约定排列。
//! - `TrapFrame`：通用寄存器加 `mepc`/`mstatus`，trap 入口汇编按此布局
//!   保存与恢复，活动 frame 固定位于 `mscratch - TRAP_FRAME_SIZE`。
//! - `SCsrState`：域切换时保存/恢复的全部 S 态 CSR。
//! - `PmpRegion`：一条 NAPOT 对齐的物理内存区域及其访问权限。
//!
//! # Design
//! - 所有类型都是 `#[repr(C)]` 的纯数据，清零即为合法的“空白”状态，
//!   未初始化的域上下文槽就以全零形态存在。
//! - 汇编代码按字段偏移访问 `TrapFrame`，字段顺序不可调整。

use bitflags::bitflags;

/// 通用寄存器（General Purpose Registers）
///
/// 按照 RISC-V 寄存器编号排列，索引注释对应汇编中的保存顺序。
#[repr(C)]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct GeneralRegs {
    pub zero: usize, // 0
    pub ra: usize,   // 1
    pub sp: usize,   // 2
    pub gp: usize,   // 3
    pub tp: usize,   // 4
    pub t0: usize,   // 5
    pub t1: usize,   // 6
    pub t2: usize,   // 7
    pub s0: usize,   // 8
    pub s1: usize,   // 9
    pub a0: usize,   // 10
    pub a1: usize,   // 11
    pub a2: usize,   // 12
    pub a3: usize,   // 13
    pub a4: usize,   // 14
    pub a5: usize,   // 15
    pub a6: usize,   // 16
    pub a7: usize,   // 17
    pub s2: usize,   // 18
    pub s3: usize,   // 19
    pub s4: usize,   // 20
    pub s5: usize,   // 21
    pub s6: usize,   // 22
    pub s7: usize,   // 23
    pub s8: usize,   // 24
    pub s9: usize,   // 25
    pub s10: usize,  // 26
    pub s11: usize,  // 27
    pub t3: usize,   // 28
    pub t4: usize,   // 29
    pub t5: usize,   // 30
    pub t6: usize,   // 31
}

/// trap 上下文
///
/// 保存被打断执行流的完整 CPU 快照。域切换通过整体换入换出
/// 活动 frame 实现，trap 返回路径从活动 frame 弹出现场。
#[repr(C)]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TrapFrame {
    /// 通用寄存器状态
    pub general_regs: GeneralRegs,
    /// trap 发生时的程序计数器
    pub mepc: usize,
    /// trap 发生时的 mstatus
    pub mstatus: usize,
}

/// trap frame 的字节大小，trap.S 中的立即数必须与之一致
pub const TRAP_FRAME_SIZE: usize = core::mem::size_of::<TrapFrame>();

/// 域切换时保存/恢复的 S 态 CSR 集合
///
/// 除了最小集（stvec/sscratch/sie/sip/satp）外，还包含
/// sstatus/sepc/scause/stval/scounteren/senvcfg，
/// 避免跨切换丢失中断使能位和陷入现场。
#[repr(C)]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SCsrState {
    pub sstatus: usize,
    pub sie: usize,
    pub stvec: usize,
    pub sscratch: usize,
    pub sepc: usize,
    pub scause: usize,
    pub stval: usize,
    pub sip: usize,
    pub satp: usize,
    pub scounteren: usize,
    pub senvcfg: usize,
}

/// 进入下级特权态时的目标特权级
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Supervisor,
    User,
}

impl Mode {
    /// `mstatus.MPP` 字段的编码
    pub fn mpp_bits(self) -> usize {
        match self {
            Mode::Supervisor => 1,
            Mode::User => 0,
        }
    }
}

impl Default for Mode {
    fn default() -> Self {
        Mode::Supervisor
    }
}

bitflags! {
    /// PMP 区域访问权限
    pub struct RegionPerm: u8 {
        const R = 1 << 0;
        const W = 1 << 1;
        const X = 1 << 2;
    }
}

impl RegionPerm {
    pub const RWX: RegionPerm = RegionPerm::all();
}

/// 一条 NAPOT 对齐的物理内存区域
///
/// `base` 必须按 `2^order` 对齐，`order` 不小于 3（最小 8 字节）。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PmpRegion {
    pub base: usize,
    pub order: u32,
    pub perm: RegionPerm,
}

impl PmpRegion {
    pub fn new(base: usize, order: u32, perm: RegionPerm) -> Self {
        debug_assert!(order >= 3);
        debug_assert_eq!(base & ((1 << order) - 1), 0);
        Self { base, order, perm }
    }

    /// NAPOT 编码后的 `pmpaddr` 值
    pub fn napot_addr(&self) -> usize {
        (self.base | (((1usize << self.order) - 1) >> 1)) >> 2
    }
}
