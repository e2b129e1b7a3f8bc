//! 固件堆管理
//!
//! # Overview
//! - 裸机构建时以 `linked_list_allocator` 作为全局分配器，
//!   堆空间是 `.bss` 中的一块静态数组。
//! - 宿主构建（测试）直接使用 std 的分配器。
//! - `zalloc_box` 提供带失败检查的清零分配，域上下文槽从这里分配，
//!   分配失败向上返回 `SBI_ENOMEM` 而不是直接 panic。

use alloc::boxed::Box;
use core::alloc::Layout;

#[cfg(target_os = "none")]
use crate::config::FW_HEAP_SIZE;

#[cfg(target_os = "none")]
#[global_allocator]
static HEAP_ALLOCATOR: linked_list_allocator::LockedHeap = linked_list_allocator::LockedHeap::empty();

#[cfg(target_os = "none")]
static mut HEAP_SPACE: [u8; FW_HEAP_SIZE] = [0; FW_HEAP_SIZE];

/// 初始化固件堆，冷启动 hart 调用一次
pub fn init() {
    #[cfg(target_os = "none")]
    unsafe {
        HEAP_ALLOCATOR
            .lock()
            .init(HEAP_SPACE.as_mut_ptr(), FW_HEAP_SIZE);
    }
}

#[cfg(target_os = "none")]
#[alloc_error_handler]
fn handle_alloc_error(layout: Layout) -> ! {
    panic!("firmware heap exhausted, layout = {:?}", layout);
}

/// 清零分配一个 `T` 并写入初值
///
/// 与 `Box::new` 的区别在于分配失败返回 `None` 而不是中止，
/// 调用方据此返回 `SBI_ENOMEM`。先整体清零再写初值，
/// 保证新分配的上下文槽不携带任何残留字节。
pub fn zalloc_box<T>(value: T) -> Option<Box<T>> {
    let layout = Layout::new::<T>();
    if layout.size() == 0 {
        return Some(Box::new(value));
    }
    unsafe {
        let ptr = alloc::alloc::alloc_zeroed(layout) as *mut T;
        if ptr.is_null() {
            return None;
        }
        ptr.write(value);
        Some(Box::from_raw(ptr))
    }
}
