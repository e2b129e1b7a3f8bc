//! 固件内存布局和平台相关常量
//!
//! 这些常量用于固件的堆分配、每个 hart 的栈空间、控制台设备，
//! 以及根域（ROOT 域）的内存区域与启动入口。
//! 所有大小都以字节为单位。

#![allow(unused)]

/// 固件支持的最大 hart 数
///
/// 域的 possible/assigned 掩码、上下文表以及 HSM 状态表
/// 都按该常量定长分配。
pub const MAX_HARTS: usize = 8;

/// 冷启动 hart 的编号
///
/// QEMU virt 平台上 hart 0 总是存在，由它完成全局初始化。
pub const COLD_BOOT_HARTID: usize = 0;

/// 每个 hart 的固件栈大小，16KB
///
/// 栈顶保留一个 trap frame（`mscratch` 指向栈顶，
/// 活动 trap frame 位于 `mscratch - TRAP_FRAME_SIZE`）。
pub const HART_STACK_SIZE: usize = 0x4000;

/// 固件堆大小，128KB
///
/// 域上下文槽、域描述信息等都从这里分配。
pub const FW_HEAP_SIZE: usize = 0x2_0000;

/// 物理内存起始地址（QEMU virt）
pub const MEMORY_BASE: usize = 0x8000_0000;

/// 物理内存大小，128MB
pub const MEMORY_SIZE: usize = 0x800_0000;

/// 根域载荷的入口地址
///
/// 固件自身占用 [MEMORY_BASE, ROOT_NEXT_ADDR)，载荷从 2MB 处开始。
pub const ROOT_NEXT_ADDR: usize = 0x8020_0000;

/// 16550 串口的 MMIO 基址（QEMU virt）
pub const UART_BASE: usize = 0x1000_0000;

/// CLINT 的 MMIO 基址，MSIP 寄存器用于 hart 间中断
pub const CLINT_BASE: usize = 0x200_0000;

/// QEMU virt 测试设备，用于关机
pub const TEST_DEVICE_BASE: usize = 0x10_0000;
