//! 固件控制台输出模块
//!
//! 提供 `print!`/`println!` 宏以及 `log` 门面的后端实现。
//! 所有输出最终通过 HAL 的 `console_putchar` 写到平台串口
//! （宿主构建时写到测试输出缓冲）。
//!
//! # Overview
//! - `Stdout` 实现 `core::fmt::Write`，逐字节下发到 HAL。
//! - `ConsoleLogger` 实现 `log::Log`，按日志级别着色输出。
//! - `init()` 在冷启动阶段安装 logger，日志级别由编译期 `LOG` 环境变量决定。
//!
//! # Concurrency Model
//! - 输出只用于诊断，多 hart 下行与行之间可能交错，不做跨 hart 串行化。

use core::fmt::{self, Write};

use log::{Level, LevelFilter, Log, Metadata, Record};

struct Stdout;

impl Write for Stdout {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        for c in s.bytes() {
            crate::hal::console_putchar(c);
        }
        Ok(())
    }
}

pub fn print(args: fmt::Arguments) {
    Stdout.write_fmt(args).ok();
}

#[macro_export]
macro_rules! print {
    ($fmt: literal $(, $($arg: tt)+)?) => {
        $crate::console::print(format_args!($fmt $(, $($arg)+)?))
    };
}

#[macro_export]
macro_rules! println {
    ($fmt: literal $(, $($arg: tt)+)?) => {
        $crate::console::print(format_args!(concat!($fmt, "\n") $(, $($arg)+)?))
    };
}

struct ConsoleLogger;

static LOGGER: ConsoleLogger = ConsoleLogger;

impl Log for ConsoleLogger {
    fn enabled(&self, _metadata: &Metadata) -> bool {
        true
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        // ANSI 颜色：错误红、警告黄、信息蓝、调试绿
        let color = match record.level() {
            Level::Error => 31,
            Level::Warn => 93,
            Level::Info => 34,
            Level::Debug => 32,
            Level::Trace => 90,
        };
        println!(
            "\u{1B}[{}m[{:>5}] {}\u{1B}[0m",
            color,
            record.level(),
            record.args()
        );
    }

    fn flush(&self) {}
}

/// 安装控制台 logger
///
/// 日志级别来自编译期环境变量 `LOG`，缺省为 `info`。
/// 重复调用是无害的（`set_logger` 的后续调用被忽略）。
pub fn init() {
    log::set_logger(&LOGGER).ok();
    log::set_max_level(match option_env!("LOG") {
        Some("error") => LevelFilter::Error,
        Some("warn") => LevelFilter::Warn,
        Some("debug") => LevelFilter::Debug,
        Some("trace") => LevelFilter::Trace,
        _ => LevelFilter::Info,
    });
}
