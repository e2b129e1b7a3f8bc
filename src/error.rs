//! SBI 错误码模块
//! # Overview
//! 本模块定义固件内部统一使用的错误类型 `SbiError`，
//! 以及 ecall 边界上按 SBI 规范返回的 `(error, value)` 寄存器对 `SbiRet`。
//!
//! # Design
//! - 固件内部所有可失败操作返回 `Result<T, SbiError>`，用 `?` 传播。
//! - 只有 ecall 分发层把 `SbiError` 折算成寄存器值，其余模块不接触裸错误码。
//! - 错误码数值与 SBI 规范的错误枚举一一对应，不引入私有错误码。

/// SBI 规范定义的错误枚举
///
/// `NoMem` 是规范之外的固件内部错误码，只在初始化阶段出现。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SbiError {
    Failed,
    NotSupported,
    InvalidParam,
    Denied,
    InvalidAddress,
    AlreadyAvailable,
    AlreadyStarted,
    AlreadyStopped,
    NoShmem,
    NoMem,
}

impl SbiError {
    /// 对应的 SBI 错误码数值
    pub fn code(self) -> isize {
        match self {
            SbiError::Failed => -1,
            SbiError::NotSupported => -2,
            SbiError::InvalidParam => -3,
            SbiError::Denied => -4,
            SbiError::InvalidAddress => -5,
            SbiError::AlreadyAvailable => -6,
            SbiError::AlreadyStarted => -7,
            SbiError::AlreadyStopped => -8,
            SbiError::NoShmem => -9,
            SbiError::NoMem => -1006,
        }
    }
}

/// 固件内部统一的返回类型
pub type SbiResult<T = ()> = Result<T, SbiError>;

/// ecall 返回的 `(a0, a1)` 寄存器对
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SbiRet {
    pub error: isize,
    pub value: isize,
}

impl SbiRet {
    /// 成功，携带一个返回值
    pub fn ok(value: isize) -> Self {
        Self { error: 0, value }
    }

    /// 失败，value 按规范置零
    pub fn err(e: SbiError) -> Self {
        Self {
            error: e.code(),
            value: 0,
        }
    }
}

impl From<SbiResult<isize>> for SbiRet {
    fn from(r: SbiResult<isize>) -> Self {
        match r {
            Ok(v) => SbiRet::ok(v),
            Err(e) => SbiRet::err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_codes_match_sbi_spec() {
        assert_eq!(SbiError::Failed.code(), -1);
        assert_eq!(SbiError::NotSupported.code(), -2);
        assert_eq!(SbiError::InvalidParam.code(), -3);
        assert_eq!(SbiError::AlreadyAvailable.code(), -6);
        assert_eq!(SbiError::NoShmem.code(), -9);
    }

    #[test]
    fn sbiret_from_result() {
        let ok: SbiRet = Ok(7).into();
        assert_eq!(ok, SbiRet { error: 0, value: 7 });
        let err: SbiRet = SbiResult::<isize>::Err(SbiError::InvalidParam).into();
        assert_eq!(err.error, -3);
        assert_eq!(err.value, 0);
    }
}
