//! cute-sbi：带域上下文管理的 RISC-V SBI 固件
//!
//! 固件运行在 M 态，向下级载荷提供 SBI 服务，核心能力是把
//! hart 在互相隔离的域之间做同步协作式切换（`domain::context`）。
//!
//! 裸机构建（`target_os = "none"`）产出固件镜像；宿主构建用
//! 模拟 hart 后端跑测试套件。

#![cfg_attr(target_os = "none", no_std)]
#![cfg_attr(target_os = "none", no_main)]
#![cfg_attr(target_os = "none", feature(alloc_error_handler))]

extern crate alloc;

#[macro_use]
pub mod console;
pub mod config;
pub mod domain;
pub mod ecall;
pub mod error;
pub mod hal;
pub mod hsm;
#[cfg(target_os = "none")]
mod lang_items;
pub mod mm;
pub mod sync;

#[cfg(target_os = "none")]
use core::sync::atomic::{AtomicBool, Ordering};

#[cfg(target_os = "none")]
fn clear_bss() {
    extern "C" {
        fn sbss();
        fn ebss();
    }
    unsafe {
        core::slice::from_raw_parts_mut(
            sbss as *const () as usize as *mut u8,
            ebss as *const () as usize - sbss as usize,
        )
        .fill(0);
    }
}

/// 冷启动完成标志
///
/// 放在 .data 段：冷启动 hart 清 .bss 时它必须保持有效。
#[cfg(target_os = "none")]
#[link_section = ".data"]
static BOOT_READY: AtomicBool = AtomicBool::new(false);

#[cfg(target_os = "none")]
#[no_mangle]
pub extern "C" fn rust_main(hartid: usize, dtb: usize) -> ! {
    if hartid == config::COLD_BOOT_HARTID {
        clear_bss();
        hal::machine_init();
        console::init();
        println!("cute-sbi booting on hart {}", hartid);
        mm::init();
        if domain::init(dtb).is_err() {
            panic!("domain setup failed");
        }
        if domain::context::init().is_err() {
            panic!("domain context setup failed");
        }
        log::info!("domain contexts initialized");
        BOOT_READY.store(true, Ordering::Release);
        boot_into_assigned_domain(hartid);
    } else {
        while !BOOT_READY.load(Ordering::Acquire) {
            core::hint::spin_loop();
        }
        hal::machine_init();
        boot_into_assigned_domain(hartid);
    }
}

/// 把 hart 送进它在配置中归属的域
///
/// 先为该域编程本 hart 的 PMP（冷启动路径不经过切换器），
/// hart 是该域的引导 hart 时直接跳入其入口，否则停靠等待
/// 引导 hart 通过 HSM 拉起。
#[cfg(target_os = "none")]
fn boot_into_assigned_domain(hartid: usize) -> ! {
    let (boot_hartid, addr, arg1, mode) = {
        let table = domain::DOMAINS.lock();
        let d = table.get(table.domain_of_hart(hartid));
        for i in 0..hal::pmp_count() {
            hal::pmp_disable(i);
        }
        hal::pmp_configure(&d.regions);
        (d.boot_hartid, d.next_addr, d.next_arg1, d.next_mode)
    };
    if hartid == boot_hartid {
        hsm::mark_started(hartid);
        hal::switch_mode(hartid, arg1, addr, mode)
    } else {
        hsm::hart_stop()
    }
}

/// 宿主构建只承载测试套件
#[cfg(not(target_os = "none"))]
fn main() {
    println!("cute-sbi: host build, run `cargo test`");
}
