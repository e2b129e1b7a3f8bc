//! SBI ecall 分发模块
//!
//! 来自下级特权态的 ecall 全部经由本模块分发。调用约定：
//! `a7` = 扩展 ID，`a6` = 功能 ID，参数在 `a0..a5`，
//! 返回 `(a0, a1)` = (错误码, 返回值)。
//!
//! # Overview
//! - BASE 扩展：规范版本、实现信息、扩展探测。
//! - HSM 扩展：hart 启动/停止/状态查询。
//! - 域上下文扩展：`enter`/`exit`，非安全域像过程调用一样
//!   进入安全域并在其退出时返回。
//!
//! # Design
//! 域切换会就地替换活动 trap frame，因此 `enter`/`exit` 的成功
//! 返回值必须在切换之前写入调用者的 frame：保存下来的调用者现场
//! 恢复时直接带着 `a0 = 0` 从 ecall 的下一条指令继续。失败路径
//! 不发生切换，frame 仍属于调用者，照常写入错误码。

use crate::domain;
use crate::error::{SbiError, SbiRet};
use crate::hal::TrapFrame;
use crate::hsm;

/// BASE 扩展
pub const SBI_EXT_BASE: usize = 0x10;
/// HSM 扩展（"HSM"）
pub const SBI_EXT_HSM: usize = 0x48534D;
/// 域上下文扩展（"DCM"）
pub const SBI_EXT_DOMAIN_CONTEXT: usize = 0x44434D;

const BASE_GET_SPEC_VERSION: usize = 0;
const BASE_GET_IMPL_ID: usize = 1;
const BASE_GET_IMPL_VERSION: usize = 2;
const BASE_PROBE_EXTENSION: usize = 3;

const HSM_HART_START: usize = 0;
const HSM_HART_STOP: usize = 1;
const HSM_HART_STATUS: usize = 2;

const DOMAIN_CONTEXT_ENTER: usize = 0;
const DOMAIN_CONTEXT_EXIT: usize = 1;

/// SBI 规范版本 2.0
const SPEC_VERSION: isize = 2 << 24;
/// 实验性实现 ID
const IMPL_ID: isize = 0x43;
const IMPL_VERSION: isize = 1;

/// ecall 统一入口，由 M 态 trap 分发调用
///
/// 进入时把 `mepc` 拨过 ecall 指令本身，调用者恢复执行时
/// 从下一条指令继续。
pub fn handle_ecall(frame: &mut TrapFrame) {
    frame.mepc += 4;

    let eid = frame.general_regs.a7;
    let fid = frame.general_regs.a6;
    let args = [frame.general_regs.a0, frame.general_regs.a1];

    let ret = match eid {
        SBI_EXT_BASE => base_handler(fid, args[0]),
        SBI_EXT_HSM => hsm_handler(fid, args),
        SBI_EXT_DOMAIN_CONTEXT => {
            // 成功的 enter/exit 会切走 frame，返回值已预先写好
            domain_context_handler(fid, frame);
            return;
        }
        _ => SbiRet::err(SbiError::NotSupported),
    };
    frame.general_regs.a0 = ret.error as usize;
    frame.general_regs.a1 = ret.value as usize;
}

fn base_handler(fid: usize, arg0: usize) -> SbiRet {
    match fid {
        BASE_GET_SPEC_VERSION => SbiRet::ok(SPEC_VERSION),
        BASE_GET_IMPL_ID => SbiRet::ok(IMPL_ID),
        BASE_GET_IMPL_VERSION => SbiRet::ok(IMPL_VERSION),
        BASE_PROBE_EXTENSION => SbiRet::ok(match arg0 {
            SBI_EXT_BASE | SBI_EXT_HSM | SBI_EXT_DOMAIN_CONTEXT => 1,
            _ => 0,
        }),
        _ => SbiRet::err(SbiError::NotSupported),
    }
}

fn hsm_handler(fid: usize, args: [usize; 2]) -> SbiRet {
    match fid {
        HSM_HART_START => hsm::hart_start(args[0], args[1], crate::hal::Mode::Supervisor, 0)
            .map(|_| 0)
            .into(),
        // 停靠不再返回；走到这里只可能是内部错误
        HSM_HART_STOP => hsm::hart_stop(),
        HSM_HART_STATUS => hsm::hart_state(args[0]).map(|state| state.code()).into(),
        _ => SbiRet::err(SbiError::NotSupported),
    }
}

/// 域上下文扩展的分发
///
/// 成功路径上 frame 在切换前被预置为 `(0, 0)`，随调用者现场一同
/// 保存；切换后 frame 已属于目标域，不得再写。失败路径没有切换，
/// 错误码直接写回调用者。
fn domain_context_handler(fid: usize, frame: &mut TrapFrame) {
    let result = match fid {
        DOMAIN_CONTEXT_ENTER => {
            let target = frame.general_regs.a0;
            frame.general_regs.a0 = 0;
            frame.general_regs.a1 = 0;
            domain::context::enter(target)
        }
        DOMAIN_CONTEXT_EXIT => {
            frame.general_regs.a0 = 0;
            frame.general_regs.a1 = 0;
            domain::context::exit()
        }
        _ => Err(SbiError::NotSupported),
    };
    if let Err(e) = result {
        frame.general_regs.a0 = e.code() as usize;
        frame.general_regs.a1 = 0;
    }
}
