//! 架构后端选择
//!
//! 裸机构建使用真实的 RISC-V 后端，其余构建（含宿主测试）
//! 使用模拟 hart 后端。两个后端导出同一组接口。

#[cfg(all(target_arch = "riscv64", target_os = "none"))]
pub mod riscv;
#[cfg(all(target_arch = "riscv64", target_os = "none"))]
pub use self::riscv::*;

#[cfg(not(all(target_arch = "riscv64", target_os = "none")))]
pub mod host;
#[cfg(not(all(target_arch = "riscv64", target_os = "none")))]
pub use self::host::*;
