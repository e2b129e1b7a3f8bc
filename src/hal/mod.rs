pub mod arch;
pub mod context;

pub use arch::{console_putchar, shutdown};
pub use arch::{clear_ipi, send_ipi, wait_for_interrupt};
pub use arch::{csr_swap_state, trap_frame_ptr};
pub use arch::{current_hartindex, machine_init, switch_mode};
pub use arch::{machine_intr_enabled, machine_intr_off, machine_intr_on};
pub use arch::{pmp_configure, pmp_count, pmp_disable};
pub use context::{GeneralRegs, Mode, PmpRegion, RegionPerm, SCsrState, TrapFrame, TRAP_FRAME_SIZE};

#[cfg(not(all(target_arch = "riscv64", target_os = "none")))]
pub use arch::{
    console_take, frame_snapshot, frame_store, pmp_snapshot, read_scsrs, sent_ipis, set_hartindex,
    write_scsrs,
};
