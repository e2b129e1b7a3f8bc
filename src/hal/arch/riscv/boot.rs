//! 启动入口汇编模块
//! # Overview
//! 所有 hart 从 `_start` 进入：按 `mhartid` 选取各自的固件栈，
//! 把 `mscratch` 指向栈顶（活动 trap frame 固定位于
//! `mscratch - TRAP_FRAME_SIZE`），然后带着 hartid 和 DTB 指针
//! 进入 `rust_main`。
//!
//! # Invariants
//! - 栈大小、trap frame 大小的立即数必须与 `config::HART_STACK_SIZE`
//!   和 `TRAP_FRAME_SIZE` 一致。

use core::arch::global_asm;

global_asm!(include_str!("entry.asm"));
