//! hart 本地同步原语
//! # Overview
//! 本模块提供两个构件：
//! - `PerHart<T>`：按 hart 索引切分的静态单元格，每个 hart 只访问自己的
//!   那一份，因此不需要锁（对应“每 hart 一个单元格，而不是真正的全局变量”
//!   这一建模方式）。
//! - `IntrMaskGuard`：RAII 的 M 态中断屏蔽守卫，支持嵌套，退出最外层时
//!   按进入前的状态恢复。上下文切换的临界区必须在该守卫内执行。
//!
//! # Safety
//! - `PerHart` 的安全性依赖“槽位 `i` 只被 hart `i` 访问”这一不变量，
//!   由调用方（固件的执行模型）保证。
//! - 中断屏蔽直接操作 `mstatus.MIE`，宿主构建下由 HAL 模拟。
//!
//! # Invariants
//! - 每个 hart 的屏蔽嵌套层数永远 >= 0。
//! - 多次嵌套 enter/drop 后中断状态与进入前一致。

use core::cell::UnsafeCell;

use crate::config::MAX_HARTS;
use crate::hal;

/// 按 hart 切分的单元格数组
///
/// INVARIANT:
/// - 槽位 `i` 只允许 hart `i` 访问，跨 hart 访问是未定义行为
pub struct PerHart<T> {
    slots: UnsafeCell<[T; MAX_HARTS]>,
}

// SAFETY: 每个槽位只被对应的 hart 访问，不存在跨 hart 共享。
unsafe impl<T> Sync for PerHart<T> {}

impl<T> PerHart<T> {
    pub const fn new(slots: [T; MAX_HARTS]) -> Self {
        Self {
            slots: UnsafeCell::new(slots),
        }
    }

    /// 以独占方式访问当前 hart 的槽位
    ///
    /// SAFETY:
    /// - 通过裸指针偏移取出单个元素，不会对整个数组构造引用，
    ///   因此不同 hart 并发访问各自槽位不构成别名冲突。
    pub fn with<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        let i = hal::current_hartindex();
        assert!(i < MAX_HARTS);
        unsafe { f(&mut *(self.slots.get() as *mut T).add(i)) }
    }
}

/// 单个 hart 的中断屏蔽嵌套状态
#[derive(Clone, Copy)]
struct MaskNest {
    depth: usize,
    enabled_before: bool,
}

static MASK_NEST: PerHart<MaskNest> = PerHart::new(
    [MaskNest {
        depth: 0,
        enabled_before: false,
    }; MAX_HARTS],
);

/// M 态中断屏蔽守卫
///
/// # Behavior
/// - `enter()` 记录第一层屏蔽前的 MIE 状态并清除 MIE
/// - 嵌套调用只增加层数，不重复保存状态
/// - drop 时减少层数，最外层按保存的状态恢复 MIE
pub struct IntrMaskGuard {
    // 阻止跨线程移动（宿主构建下屏蔽状态是线程本地的）
    _not_send: core::marker::PhantomData<*const ()>,
}

impl IntrMaskGuard {
    pub fn enter() -> Self {
        let enabled = hal::machine_intr_enabled();
        hal::machine_intr_off();
        MASK_NEST.with(|m| {
            if m.depth == 0 {
                m.enabled_before = enabled;
            }
            m.depth += 1;
        });
        Self {
            _not_send: core::marker::PhantomData,
        }
    }
}

impl Drop for IntrMaskGuard {
    fn drop(&mut self) {
        let reenable = MASK_NEST.with(|m| {
            m.depth -= 1;
            m.depth == 0 && m.enabled_before
        });
        if reenable {
            hal::machine_intr_on();
        }
    }
}
