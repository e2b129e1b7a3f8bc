//! hart 状态管理（HSM）
//! # Overview
//! 维护每个 hart 的生命周期状态机，并实现 SBI HSM 语义的最小子集：
//! - `hart_start`：把处于 Stopped 的目标 hart 标记为 StartPending，
//!   记录恢复参数并发送软件中断唤醒它；
//! - `hart_stop`：停靠当前 hart，在 `wfi` 中等待，被启动后按记录的
//!   参数跳入下级特权态，不再返回；
//! - `hart_state`：查询状态。
//!
//! # Design
//! - 状态表跨 hart 共享（`hart_start` 写别的 hart 的表项），
//!   用自旋锁保护；锁只在短暂的状态翻转期间持有，停靠等待在
//!   锁外进行。
//! - 宿主构建下状态表是线程本地的：每个测试线程模拟一组独立
//!   的 hart，停靠以 panic 模拟。
//!
//! # Invariants
//! - 状态迁移只有 Stopped → StartPending →（被停靠 hart 自己确认）
//!   Started → Stopped。

use crate::config::MAX_HARTS;
use crate::error::{SbiError, SbiResult};
use crate::hal::{self, Mode};

/// 单个 hart 的生命周期状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HsmState {
    Stopped,
    StartPending,
    Started,
}

impl HsmState {
    /// SBI HSM 扩展的状态编码
    pub fn code(self) -> isize {
        match self {
            HsmState::Started => 0,
            HsmState::Stopped => 1,
            HsmState::StartPending => 2,
        }
    }
}

#[derive(Clone, Copy)]
struct HartCell {
    state: HsmState,
    resume_addr: usize,
    resume_arg1: usize,
    resume_mode: Mode,
}

impl HartCell {
    const fn new() -> Self {
        Self {
            state: HsmState::Stopped,
            resume_addr: 0,
            resume_arg1: 0,
            resume_mode: Mode::Supervisor,
        }
    }
}

#[cfg(target_os = "none")]
mod table {
    use super::{HartCell, MAX_HARTS};
    use lazy_static::lazy_static;
    use spin::Mutex;

    lazy_static! {
        static ref HSM_TABLE: Mutex<[HartCell; MAX_HARTS]> =
            Mutex::new([HartCell::new(); MAX_HARTS]);
    }

    pub fn with<R>(f: impl FnOnce(&mut [HartCell; MAX_HARTS]) -> R) -> R {
        f(&mut HSM_TABLE.lock())
    }
}

#[cfg(not(target_os = "none"))]
mod table {
    use super::{HartCell, MAX_HARTS};
    use std::cell::RefCell;

    thread_local! {
        static HSM_TABLE: RefCell<[HartCell; MAX_HARTS]> =
            RefCell::new([HartCell::new(); MAX_HARTS]);
    }

    pub fn with<R>(f: impl FnOnce(&mut [HartCell; MAX_HARTS]) -> R) -> R {
        HSM_TABLE.with(|t| f(&mut t.borrow_mut()))
    }
}

/// 冷启动路径上把正在运行的 hart 登记为 Started
pub fn mark_started(hartindex: usize) {
    table::with(|t| t[hartindex].state = HsmState::Started);
}

pub fn hart_state(hartindex: usize) -> SbiResult<HsmState> {
    if hartindex >= MAX_HARTS {
        return Err(SbiError::InvalidParam);
    }
    Ok(table::with(|t| t[hartindex].state))
}

/// 请求启动目标 hart
///
/// 目标必须处于 Stopped；记录恢复参数后发软件中断唤醒。
pub fn hart_start(hartindex: usize, addr: usize, mode: Mode, arg1: usize) -> SbiResult {
    if hartindex >= MAX_HARTS {
        return Err(SbiError::InvalidParam);
    }
    table::with(|t| {
        let cell = &mut t[hartindex];
        match cell.state {
            HsmState::Stopped => {
                cell.state = HsmState::StartPending;
                cell.resume_addr = addr;
                cell.resume_arg1 = arg1;
                cell.resume_mode = mode;
                Ok(())
            }
            _ => Err(SbiError::AlreadyAvailable),
        }
    })?;
    hal::send_ipi(hartindex);
    Ok(())
}

/// 停靠当前 hart，直到被 `hart_start` 唤醒后跳入记录的入口
pub fn hart_stop() -> ! {
    let me = hal::current_hartindex();
    // 停靠途中已有启动请求时保留它，首轮循环立即恢复
    table::with(|t| {
        let cell = &mut t[me];
        if cell.state != HsmState::StartPending {
            cell.state = HsmState::Stopped;
        }
    });
    loop {
        let pending = table::with(|t| {
            let cell = &mut t[me];
            if cell.state == HsmState::StartPending {
                cell.state = HsmState::Started;
                Some((cell.resume_addr, cell.resume_arg1, cell.resume_mode))
            } else {
                None
            }
        });
        if let Some((addr, arg1, mode)) = pending {
            hal::clear_ipi();
            hal::switch_mode(me, arg1, addr, mode);
        }
        hal::wait_for_interrupt();
        hal::clear_ipi();
    }
}
