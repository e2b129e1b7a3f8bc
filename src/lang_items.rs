//! 语言项：panic 处理
//!
//! 固件中任何 panic 都是不可恢复的配置或逻辑错误，
//! 打印出错位置后直接关机。

use core::panic::PanicInfo;

use crate::hal::shutdown;

#[panic_handler]
fn panic(info: &PanicInfo) -> ! {
    if let Some(location) = info.location() {
        println!(
            "[firmware] panicked at {}:{}",
            location.file(),
            location.line()
        );
    }
    println!("[firmware] {}", info);
    shutdown();
}
