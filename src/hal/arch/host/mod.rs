//! 宿主模拟后端
//! # Overview
//! 宿主构建（含测试）下的 HAL 实现：每个测试线程模拟一个独立的
//! hart，CSR、PMP 表、活动 trap frame 都是线程本地状态。
//! 测试以普通函数调用驱动固件逻辑，再对模拟硬件断言。
//!
//! # Design
//! - 与裸机后端导出同一组函数，由 `hal::arch` 按构建目标选择。
//! - `switch_mode` / `wait_for_interrupt` 在真实硬件上不返回，
//!   这里以带格式化信息的 panic 模拟，测试用
//!   `#[should_panic(expected = …)]` 捕获。
//! - 额外导出 `set_hartindex`、`read_scsrs` 等测试辅助函数，
//!   裸机后端没有这些接口。

use std::cell::{Cell, RefCell};
use std::vec::Vec;

use crate::hal::context::{Mode, PmpRegion, SCsrState, TrapFrame};

/// 模拟的 PMP 表项数
pub const PMP_COUNT: usize = 8;

thread_local! {
    static HARTINDEX: Cell<usize> = Cell::new(0);
    static MIE: Cell<bool> = Cell::new(false);
    static SCSRS: RefCell<SCsrState> = RefCell::new(SCsrState::default());
    static PMP_BANK: RefCell<[Option<PmpRegion>; PMP_COUNT]> = RefCell::new([None; PMP_COUNT]);
    static FRAME: RefCell<TrapFrame> = RefCell::new(TrapFrame::default());
    static IPIS: RefCell<Vec<usize>> = RefCell::new(Vec::new());
    static CONSOLE: RefCell<Vec<u8>> = RefCell::new(Vec::new());
}

pub fn current_hartindex() -> usize {
    HARTINDEX.with(|h| h.get())
}

/// 测试辅助：设定当前线程模拟的 hart 索引
pub fn set_hartindex(i: usize) {
    HARTINDEX.with(|h| h.set(i));
}

pub fn machine_init() {}

pub fn machine_intr_enabled() -> bool {
    MIE.with(|m| m.get())
}

pub fn machine_intr_off() {
    MIE.with(|m| m.set(false));
}

pub fn machine_intr_on() {
    MIE.with(|m| m.set(true));
}

/// 模拟 `csrrw`：旧值写入 `out`，新值成为现行 CSR
pub fn csr_swap_state(out: &mut SCsrState, incoming: &SCsrState) {
    SCSRS.with(|c| {
        let mut live = c.borrow_mut();
        *out = *live;
        *live = *incoming;
    });
}

/// 测试辅助：读取现行的 S 态 CSR 快照
pub fn read_scsrs() -> SCsrState {
    SCSRS.with(|c| *c.borrow())
}

/// 测试辅助：整体写入现行的 S 态 CSR
pub fn write_scsrs(v: SCsrState) {
    SCSRS.with(|c| *c.borrow_mut() = v);
}

pub fn pmp_count() -> usize {
    PMP_COUNT
}

pub fn pmp_disable(i: usize) {
    PMP_BANK.with(|b| b.borrow_mut()[i] = None);
}

pub fn pmp_configure(regions: &[PmpRegion]) {
    PMP_BANK.with(|b| {
        let mut bank = b.borrow_mut();
        for (i, region) in regions.iter().take(PMP_COUNT).enumerate() {
            bank[i] = Some(*region);
        }
    });
}

/// 测试辅助：当前启用的 PMP 表项
pub fn pmp_snapshot() -> [Option<PmpRegion>; PMP_COUNT] {
    PMP_BANK.with(|b| *b.borrow())
}

pub fn trap_frame_ptr() -> *mut TrapFrame {
    FRAME.with(|f| f.as_ptr())
}

/// 测试辅助：读取活动 trap frame
pub fn frame_snapshot() -> TrapFrame {
    FRAME.with(|f| *f.borrow())
}

/// 测试辅助：写入活动 trap frame
pub fn frame_store(v: TrapFrame) {
    FRAME.with(|f| *f.borrow_mut() = v);
}

pub fn switch_mode(hartid: usize, arg1: usize, next_addr: usize, mode: Mode) -> ! {
    panic!(
        "hart {} enters {:?} at {:#x}, a0 = {:#x}, a1 = {:#x}",
        current_hartindex(),
        mode,
        next_addr,
        hartid,
        arg1
    );
}

pub fn send_ipi(hartindex: usize) {
    IPIS.with(|v| v.borrow_mut().push(hartindex));
}

/// 测试辅助：已发送的 IPI 目标列表
pub fn sent_ipis() -> Vec<usize> {
    IPIS.with(|v| v.borrow().clone())
}

pub fn clear_ipi() {}

pub fn wait_for_interrupt() {
    panic!("hart {} parked", current_hartindex());
}

pub fn console_putchar(c: u8) {
    use std::io::Write;
    CONSOLE.with(|b| b.borrow_mut().push(c));
    std::io::stdout().write_all(&[c]).ok();
}

/// 测试辅助：取走控制台输出
pub fn console_take() -> std::string::String {
    CONSOLE.with(|b| String::from_utf8_lossy(&b.borrow_mut().split_off(0)).into_owned())
}

pub fn shutdown() -> ! {
    panic!("hart {} shutdown", current_hartindex());
}
