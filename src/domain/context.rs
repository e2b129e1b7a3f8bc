//! # 域上下文管理模块
//!
//! ## Overview
//! 本模块实现 hart 在互相隔离的域之间的同步协作式切换：
//! - 每个（参与上下文管理的域，可能的 hart）组合对应一个上下文槽，
//!   保存该域在该 hart 上被换出时的 S 态 CSR 与 trap frame；
//! - 初始化时为未被认领的域构造每 hart 一条的“启动链”，
//!   保证每个待初始化的域上下文恰好被启动一次；
//! - `enter` 把当前 hart 借给目标域（过程调用语义），
//!   `exit` 沿链返回调用者、推进启动链或回落到根域。
//!
//! ## Design
//! 槽间链接采用前向 `next` 链：初始化时它串起启动链，运行期
//! `enter` 用它记录调用者，`exit` 统一沿 `next` 返回。后继槽
//! 永远与当前槽同属一个 hart，因此链接只需记录后继的域索引。
//!
//! 切换的相位顺序是规范性的：
//! 1. 域归属移交（assigned 位与 hart → 域映射）；
//! 2. 先逐条关闭全部 PMP 表项，再按目标域编程：PMP 表项无法
//!    原子替换，新旧区域交叠时不先关闭会出现瞬时越权窗口；
//! 3. 逐个原子交换 S 态 CSR（单条 `csrrw`，换出值写入旧槽）；
//! 4. 活动 trap frame（`mscratch - TRAP_FRAME_SIZE` 处）与槽中
//!    frame 互换，trap 返回路径据此弹出目标域的现场；
//! 5. 旧槽标记为已初始化。
//!
//! ## Assumptions
//! - 整个切换在持有全局域表锁且屏蔽 M 态中断的临界区内执行；
//! - 每个槽只被它所属索引的 hart 读写；
//! - 切换点只出现在显式的 `enter`/`exit`，没有抢占。
//!
//! ## Invariants
//! - 初始化完成后，每个受管域在其全部可能 hart 上都有槽；
//! - 每 hart 的启动链无环，遍历最终落在根域的槽上；
//! - 标记为已初始化的槽包含完整可恢复的现场，未初始化的槽
//!   全零且不会被当作现场恢复（首次进入走启动路径）；
//! - 失败的 `enter`/`exit` 不改变任何硬件与归属状态。

use crate::config::MAX_HARTS;
use crate::domain::{DomainId, DomainTable, HartMask, DOMAINS, ROOT_DOMAIN_ID};
use crate::error::{SbiError, SbiResult};
use crate::hal::{self, Mode, SCsrState, TrapFrame};
use crate::hsm;
use crate::mm;
use crate::sync::IntrMaskGuard;

/// 一个（域，hart）组合的上下文槽
///
/// 槽在 `init` 中一次性分配，生存期与固件相同。
pub struct DomainContext {
    /// 换出时的 trap frame（通用寄存器、mepc、mstatus）
    pub regs: TrapFrame,
    /// 换出时的 S 态 CSR
    pub csrs: SCsrState,
    /// 所属域（域表索引，槽装入域表后恒有效）
    pub dom: DomainId,
    /// 后继槽所属的域：启动链的下一跳，或运行期的调用者
    pub next: Option<DomainId>,
    /// 首次成功保存后置位；未初始化的槽不包含可恢复现场
    pub initialized: bool,
}

impl DomainContext {
    /// 全零的空白槽
    fn fresh(dom: DomainId) -> Self {
        Self {
            regs: TrapFrame::default(),
            csrs: SCsrState::default(),
            dom,
            next: None,
            initialized: false,
        }
    }
}

/// 启动一个全新域上下文所需的参数
///
/// 从域表摘抄而来，使启动动作可以在释放域表锁之后执行
/// （停靠的 hart 不能抱着锁等待）。
#[derive(Debug)]
pub(crate) struct StartupPlan {
    name: &'static str,
    boot_hartid: usize,
    possible_harts: HartMask,
    assigned_harts: HartMask,
    next_addr: usize,
    next_arg1: usize,
    next_mode: Mode,
}

/// 初始化域上下文管理：分配所有槽并构造每 hart 的启动链
///
/// 冷启动 hart 在根域注册完成后调用一次。
pub fn init() -> SbiResult {
    context_mgmt_init(&mut DOMAINS.lock())
}

/// 进入目标域，目标退出后在此返回
pub fn enter(target: DomainId) -> SbiResult {
    let _guard = IntrMaskGuard::enter();
    let mut table = DOMAINS.lock();
    domain_context_enter(&mut table, target)
}

/// 离开当前域：返回调用者、推进启动链或回落到根域
pub fn exit() -> SbiResult {
    let _guard = IntrMaskGuard::enter();
    let plan = {
        let mut table = DOMAINS.lock();
        domain_context_exit(&mut table)?
    };
    match plan {
        None => Ok(()),
        // 目标槽未初始化：锁已释放，走启动路径，不再返回
        Some(plan) => startup_domain_context(plan),
    }
}

/// 构造启动链并分配全部上下文槽
///
/// 处理顺序：
/// 1. 根域的槽先行分配，其被认领的 hart 以根域槽作为链头
///    （冷启动时这些 hart 运行的就是根域）；
/// 2. 其余受管域按注册序处理，被认领的 hart 以本域槽为链头，
///    未认领的经校验后追加到链尾；
/// 3. 根域在未被自己认领的 hart 上的槽最后追加，终结这些链。
pub(crate) fn context_mgmt_init(table: &mut DomainTable) -> SbiResult {
    if table.context_init_done {
        // 重复初始化会泄漏槽分配，直接拒绝
        return Err(SbiError::InvalidParam);
    }
    if table.is_empty() {
        return Err(SbiError::InvalidParam);
    }

    // 每 hart 的链尾游标，用于追加
    let mut tails: [Option<DomainId>; MAX_HARTS] = [None; MAX_HARTS];

    // 根域槽与链头
    {
        let possible = table.get(ROOT_DOMAIN_ID).possible_harts;
        for h in possible.iter() {
            let slot = match mm::zalloc_box(DomainContext::fresh(ROOT_DOMAIN_ID)) {
                Some(slot) => slot,
                None => {
                    rollback_domain(table, ROOT_DOMAIN_ID);
                    return Err(SbiError::NoMem);
                }
            };
            table.get_mut(ROOT_DOMAIN_ID).install_context(h, slot);
            if table.get(ROOT_DOMAIN_ID).assigned_harts.test(h) {
                tails[h] = Some(ROOT_DOMAIN_ID);
            }
        }
    }

    for id in 1..table.len() {
        if !table.get(id).context_mgmt {
            continue;
        }
        setup_domain_context(table, id, &mut tails)?;
    }

    // 根域槽终结每条链
    let possible = table.get(ROOT_DOMAIN_ID).possible_harts;
    let assigned = table.get(ROOT_DOMAIN_ID).assigned_harts;
    for h in possible.iter() {
        if assigned.test(h) {
            continue;
        }
        if let Some(tail) = tails[h] {
            table.get_mut(tail).context_mut(h).unwrap().next = Some(ROOT_DOMAIN_ID);
        }
    }

    table.context_init_done = true;
    Ok(())
}

/// 为一个非根受管域分配槽并接入启动链
///
/// 失败时释放本域已分配的槽后返回；初始化失败对固件是致命的，
/// 更早处理的域不再回收。
fn setup_domain_context(
    table: &mut DomainTable,
    id: DomainId,
    tails: &mut [Option<DomainId>; MAX_HARTS],
) -> SbiResult {
    let possible = table.get(id).possible_harts;
    for h in possible.iter() {
        let slot = match mm::zalloc_box(DomainContext::fresh(id)) {
            Some(slot) => slot,
            None => {
                rollback_domain(table, id);
                return Err(SbiError::NoMem);
            }
        };
        table.get_mut(id).install_context(h, slot);

        let d = table.get(id);
        // 被认领的 hart：本域槽是该 hart 链的头
        if d.assigned_harts.test(h) {
            tails[h] = Some(id);
            continue;
        }
        // 未认领：启动链要能把这个 hart 送进本域，先校验配置
        if !d.assigned_harts.test(d.boot_hartid) {
            log::error!(
                "{}: possible hart {} is unassigned at boot time, \
                 whose context can't be initialized",
                d.name,
                h
            );
            rollback_domain(table, id);
            return Err(SbiError::InvalidParam);
        }
        let Some(tail) = tails[h] else {
            log::error!(
                "{}: possible hart {} is unassignable, \
                 domain contexts will never be started up",
                d.name,
                h
            );
            rollback_domain(table, id);
            return Err(SbiError::InvalidParam);
        };
        table.get_mut(tail).context_mut(h).unwrap().next = Some(id);
        tails[h] = Some(id);
    }
    Ok(())
}

fn rollback_domain(table: &mut DomainTable, id: DomainId) {
    let possible = table.get(id).possible_harts;
    for h in possible.iter() {
        table.get_mut(id).drop_context(h);
    }
}

/// 把当前 hart 从所属域切换到目标域
///
/// 前置条件：持有域表锁、M 态中断已屏蔽、当前域与目标域在本
/// hart 上的槽都已存在、目标不等于当前域。
/// 返回目标槽此前是否未初始化（需要走启动路径）。
fn switch_context(table: &mut DomainTable, target: DomainId) -> bool {
    let hartindex = hal::current_hartindex();
    let current = table.domain_of_hart(hartindex);
    debug_assert_ne!(current, target);

    // 1. 域归属移交
    table.assign_hart(target, hartindex);

    // 2. PMP：先全部关闭，再按目标域编程
    for i in 0..hal::pmp_count() {
        hal::pmp_disable(i);
    }
    {
        let d = table.get(target);
        hal::pmp_configure(&d.regions);
    }

    // 3 + 4. CSR 与 trap frame 交换。目标槽的保存值先整体取出，
    // 换出的现场写入旧槽；未初始化槽的全零 CSR 即是已知的干净状态。
    let (incoming_csrs, incoming_regs, was_initialized) = {
        let slot = table.get(target).context(hartindex).unwrap();
        (slot.csrs, slot.regs, slot.initialized)
    };
    let out = table.get_mut(current).context_mut(hartindex).unwrap();
    hal::csr_swap_state(&mut out.csrs, &incoming_csrs);
    let frame = hal::trap_frame_ptr();
    unsafe {
        out.regs = *frame;
        *frame = incoming_regs;
    }

    // 5. 旧槽现在持有完整现场
    out.initialized = true;

    !was_initialized
}

/// 进入目标域（严格模式）
///
/// 目标槽必须存在且已初始化；全新域只能经由 `exit` 的启动链
/// 拉起。任何校验失败都不触碰硬件状态。
pub(crate) fn domain_context_enter(table: &mut DomainTable, target: DomainId) -> SbiResult {
    let hartindex = hal::current_hartindex();
    if target >= table.len() {
        return Err(SbiError::InvalidParam);
    }
    let current = table.domain_of_hart(hartindex);
    // 同域重入不支持
    if target == current {
        return Err(SbiError::InvalidParam);
    }
    if !table.get(target).context_mgmt {
        return Err(SbiError::InvalidParam);
    }
    match table.get(target).context(hartindex) {
        None => return Err(SbiError::InvalidParam),
        Some(slot) if !slot.initialized => return Err(SbiError::InvalidParam),
        Some(_) => {}
    }
    // 当前 hart 的活动槽必须存在，否则无处保存现场
    if table.thishart_context().is_none() {
        return Err(SbiError::InvalidParam);
    }

    // 在目标槽上记下调用者，配对的 exit 沿此返回
    table.get_mut(target).context_mut(hartindex).unwrap().next = Some(current);

    let startup = switch_context(table, target);
    debug_assert!(!startup);
    Ok(())
}

/// 选择 exit 的后继域
///
/// 依次：显式的 `next` 链接（调用者或启动链下一跳）；
/// 非根域回落到本 hart 的根域槽；根域自身无后继。
pub(crate) fn exit_successor(table: &DomainTable, hartindex: usize) -> Option<DomainId> {
    let current = table.domain_of_hart(hartindex);
    let slot = table.get(current).context(hartindex)?;
    if let Some(next) = slot.next {
        return Some(next);
    }
    if current != ROOT_DOMAIN_ID && table.get(ROOT_DOMAIN_ID).context(hartindex).is_some() {
        return Some(ROOT_DOMAIN_ID);
    }
    None
}

/// 离开当前域
///
/// 返回 `Some(plan)` 表示切入了未初始化的槽，调用方须在释放
/// 域表锁后执行启动计划（不再返回）。
pub(crate) fn domain_context_exit(table: &mut DomainTable) -> SbiResult<Option<StartupPlan>> {
    let hartindex = hal::current_hartindex();
    if table.is_empty() {
        return Err(SbiError::InvalidParam);
    }
    if table.thishart_context().is_none() {
        return Err(SbiError::InvalidParam);
    }
    let Some(target) = exit_successor(table, hartindex) else {
        return Err(SbiError::InvalidParam);
    };

    if !switch_context(table, target) {
        return Ok(None);
    }
    let d = table.get(target);
    Ok(Some(StartupPlan {
        name: d.name,
        boot_hartid: d.boot_hartid,
        possible_harts: d.possible_harts,
        assigned_harts: d.assigned_harts,
        next_addr: d.next_addr,
        next_arg1: d.next_arg1,
        next_mode: d.next_mode,
    }))
}

/// 启动一个全新的域上下文
///
/// - 目标域还有可能的 hart 未就位时，当前 hart 停靠等待；
/// - 当前 hart 是目标域的引导 hart 时，直接跳入其入口；
/// - 否则通过 HSM 拉起引导 hart，然后停靠当前 hart，
///   引导 hart 之后会按 HSM 协议启动它。
fn startup_domain_context(plan: StartupPlan) -> ! {
    for h in plan.possible_harts.iter() {
        if !plan.assigned_harts.test(h) {
            hsm::hart_stop();
        }
    }

    let me = hal::current_hartindex();
    if me != plan.boot_hartid {
        if let Err(e) = hsm::hart_start(
            plan.boot_hartid,
            plan.next_addr,
            plan.next_mode,
            plan.next_arg1,
        ) {
            log::error!(
                "failed to start boot hart {} for domain {} ({:?})",
                plan.boot_hartid,
                plan.name,
                e
            );
        }
        hsm::hart_stop();
    }

    hal::switch_mode(plan.boot_hartid, plan.next_arg1, plan.next_addr, plan.next_mode)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Domain;
    use crate::hal::{GeneralRegs, PmpRegion, RegionPerm};

    fn region(base: usize) -> PmpRegion {
        PmpRegion::new(base, 21, RegionPerm::RWX)
    }

    fn domain(
        name: &'static str,
        possible: &[usize],
        assigned: &[usize],
        boot: usize,
        managed: bool,
        addr: usize,
    ) -> Domain {
        Domain::new(
            name,
            HartMask::from_indices(possible),
            HartMask::from_indices(assigned),
            boot,
            addr,
            0x1234,
            Mode::Supervisor,
            managed,
            vec![region(0x8000_0000 + ((addr >> 20) & 0xf) * 0x20_0000)],
        )
    }

    fn table_with(domains: Vec<Domain>) -> DomainTable {
        let mut table = DomainTable::new();
        for d in domains {
            table.register(d).unwrap();
        }
        table
    }

    /// 场景二配置：hart0 归 secure，hart1 归 root
    fn scenario_two_table() -> DomainTable {
        let mut table = table_with(vec![
            domain("root", &[0, 1], &[1], 0, false, 0x8020_0000),
            domain("secure", &[0, 1], &[0], 0, true, 0x8030_0000),
        ]);
        context_mgmt_init(&mut table).unwrap();
        table
    }

    fn assert_single_assignment(table: &DomainTable, harts: &[usize]) {
        for &h in harts {
            let owner = table.domain_of_hart(h);
            for id in 0..table.len() {
                assert_eq!(
                    table.get(id).assigned_harts.test(h),
                    id == owner,
                    "hart {} ownership inconsistent for domain {}",
                    h,
                    id
                );
            }
        }
    }

    #[test]
    fn init_populates_every_possible_slot() {
        let table = scenario_two_table();
        for id in 0..table.len() {
            let d = table.get(id);
            for h in d.possible_harts.iter() {
                let slot = d.context(h).expect("slot missing after init");
                assert_eq!(slot.dom, id);
                assert!(!slot.initialized);
            }
        }
        assert_single_assignment(&table, &[0, 1]);
    }

    #[test]
    fn init_builds_scenario_two_chains() {
        let table = scenario_two_table();
        let secure = 1;
        // hart 1：root 槽是链头，后继是 secure
        assert_eq!(table.get(ROOT_DOMAIN_ID).context(1).unwrap().next, Some(secure));
        assert_eq!(table.get(secure).context(1).unwrap().next, None);
        // hart 0：secure 槽是链头，根域槽终结该链
        assert_eq!(table.get(secure).context(0).unwrap().next, Some(ROOT_DOMAIN_ID));
        assert_eq!(table.get(ROOT_DOMAIN_ID).context(0).unwrap().next, None);
    }

    #[test]
    fn init_rejects_unassigned_boot_hart() {
        crate::console::init();
        // secure 的引导 hart 2 不在 assigned 中（场景三）
        let mut table = table_with(vec![
            domain("root", &[0, 1, 2], &[1], 0, false, 0x8020_0000),
            domain("secure", &[0, 2], &[0], 2, true, 0x8030_0000),
        ]);
        crate::hal::console_take();
        assert_eq!(
            context_mgmt_init(&mut table).unwrap_err(),
            SbiError::InvalidParam
        );
        let diag = crate::hal::console_take();
        assert!(diag.contains("secure"), "diagnostic must name the domain: {diag}");
        assert!(diag.contains('2'), "diagnostic must name the hart: {diag}");
    }

    #[test]
    fn init_rejects_orphan_hart() {
        crate::console::init();
        // hart 2 不属于任何先行域，secure 的上下文永远无法被启动（场景四）
        let mut table = table_with(vec![
            domain("root", &[0, 1], &[1], 0, false, 0x8020_0000),
            domain("secure", &[0, 2], &[0], 0, true, 0x8030_0000),
        ]);
        crate::hal::console_take();
        assert_eq!(
            context_mgmt_init(&mut table).unwrap_err(),
            SbiError::InvalidParam
        );
        let diag = crate::hal::console_take();
        assert!(diag.contains("never be started up"), "got: {diag}");
    }

    #[test]
    fn init_twice_is_refused() {
        let mut table = table_with(vec![domain("root", &[0], &[0], 0, false, 0x8020_0000)]);
        context_mgmt_init(&mut table).unwrap();
        assert_eq!(
            context_mgmt_init(&mut table).unwrap_err(),
            SbiError::InvalidParam
        );
    }

    #[test]
    fn failed_validation_frees_domain_slots() {
        let mut table = table_with(vec![
            domain("root", &[0, 1], &[1], 0, false, 0x8020_0000),
            domain("secure", &[0, 2], &[0], 0, true, 0x8030_0000),
        ]);
        context_mgmt_init(&mut table).unwrap_err();
        // 失败域的槽应当全部回收
        assert!(table.get(1).context(0).is_none());
        assert!(table.get(1).context(2).is_none());
    }

    /// 手工装配“secure 曾经运行并退出”的状态，
    /// 使严格模式的 enter 可以直接测试。
    fn round_trip_table() -> (DomainTable, DomainId, SCsrState, TrapFrame) {
        hal::set_hartindex(0);
        let mut table = table_with(vec![
            domain("root", &[0], &[0], 0, false, 0x8020_0000),
            domain("secure", &[0], &[], 0, true, 0x8030_0000),
        ]);
        let secure = 1;
        table
            .get_mut(ROOT_DOMAIN_ID)
            .install_context(0, mm::zalloc_box(DomainContext::fresh(ROOT_DOMAIN_ID)).unwrap());
        let mut slot = mm::zalloc_box(DomainContext::fresh(secure)).unwrap();
        let target_csrs = SCsrState {
            sstatus: 0x8000_0000_0000_0000,
            sie: 0x222,
            stvec: 0x8030_1000,
            sscratch: 0x8030_2000,
            sepc: 0x8030_0404,
            scause: 9,
            stval: 0x55,
            sip: 0x2,
            satp: 0x8000_0000_0008_3000,
            scounteren: 0x7,
            senvcfg: 0x1,
        };
        let mut target_regs = TrapFrame::default();
        target_regs.general_regs.sp = 0x8030_f000;
        target_regs.mepc = 0x8030_0404;
        slot.csrs = target_csrs;
        slot.regs = target_regs;
        slot.initialized = true;
        table.get_mut(secure).install_context(0, slot);
        (table, secure, target_csrs, target_regs)
    }

    #[test]
    fn enter_exit_round_trip_restores_caller_state() {
        let (mut table, secure, target_csrs, target_regs) = round_trip_table();

        // 调用者现场：每个 CSR、通用寄存器都放入可区分的哨兵值
        let caller_csrs = SCsrState {
            sstatus: 0x8000_0000_0006_0000,
            sie: 0x20,
            stvec: 0x8020_1000,
            sscratch: 0x8020_2000,
            sepc: 0x8020_0abc,
            scause: 8,
            stval: 0xaa,
            sip: 0x20,
            satp: 0x8000_0000_0008_1000,
            scounteren: 0x3,
            senvcfg: 0x0,
        };
        let mut caller_frame = TrapFrame {
            general_regs: GeneralRegs::default(),
            mepc: 0x8020_0abc,
            mstatus: 0x1800,
        };
        caller_frame.general_regs.a0 = 0x11;
        caller_frame.general_regs.sp = 0x8020_f000;
        caller_frame.general_regs.s11 = 0xdead_beef;
        hal::write_scsrs(caller_csrs);
        hal::frame_store(caller_frame);

        domain_context_enter(&mut table, secure).unwrap();

        // 目标域的现场与权限已生效
        assert_eq!(hal::read_scsrs(), target_csrs);
        assert_eq!(hal::frame_snapshot(), target_regs);
        let pmp = hal::pmp_snapshot();
        assert_eq!(pmp[0], Some(table.get(secure).regions[0]));
        assert!(pmp[1..].iter().all(|e| e.is_none()));
        assert_single_assignment(&table, &[0]);
        assert_eq!(table.domain_of_hart(0), secure);
        // 调用者现场完整保存，槽已初始化，调用链接好
        let saved = table.get(ROOT_DOMAIN_ID).context(0).unwrap();
        assert!(saved.initialized);
        assert_eq!(saved.csrs, caller_csrs);
        assert_eq!(saved.regs, caller_frame);
        assert_eq!(
            table.get(secure).context(0).unwrap().next,
            Some(ROOT_DOMAIN_ID)
        );

        // 配对的 exit 原样恢复调用者（往返定律）
        let plan = domain_context_exit(&mut table).unwrap();
        assert!(plan.is_none(), "root slot is initialized, no startup");
        assert_eq!(hal::read_scsrs(), caller_csrs);
        assert_eq!(hal::frame_snapshot(), caller_frame);
        let pmp = hal::pmp_snapshot();
        assert_eq!(pmp[0], Some(table.get(ROOT_DOMAIN_ID).regions[0]));
        assert!(pmp[1..].iter().all(|e| e.is_none()));
        assert_eq!(table.domain_of_hart(0), ROOT_DOMAIN_ID);
        assert_single_assignment(&table, &[0]);
    }

    #[test]
    fn enter_rejects_invalid_targets_without_side_effects() {
        let (mut table, secure, _, _) = round_trip_table();
        let unmanaged = table
            .register(domain("fixed", &[0], &[], 0, false, 0x8040_0000))
            .unwrap();

        let csrs = SCsrState {
            stvec: 0x8020_1000,
            ..SCsrState::default()
        };
        hal::write_scsrs(csrs);
        let before_pmp = hal::pmp_snapshot();

        // 域索引越界
        assert_eq!(
            domain_context_enter(&mut table, 99).unwrap_err(),
            SbiError::InvalidParam
        );
        // 同域重入
        assert_eq!(
            domain_context_enter(&mut table, ROOT_DOMAIN_ID).unwrap_err(),
            SbiError::InvalidParam
        );
        // 目标未启用上下文管理
        assert_eq!(
            domain_context_enter(&mut table, unmanaged).unwrap_err(),
            SbiError::InvalidParam
        );
        // 目标槽未初始化（严格模式）
        table.get_mut(secure).context_mut(0).unwrap().initialized = false;
        assert_eq!(
            domain_context_enter(&mut table, secure).unwrap_err(),
            SbiError::InvalidParam
        );

        // 错误路径不触碰硬件与归属
        assert_eq!(hal::read_scsrs(), csrs);
        assert_eq!(hal::pmp_snapshot(), before_pmp);
        assert_eq!(table.domain_of_hart(0), ROOT_DOMAIN_ID);
    }

    #[test]
    fn enter_rejects_missing_target_slot() {
        hal::set_hartindex(1);
        let mut table = table_with(vec![
            domain("root", &[0, 1], &[0, 1], 0, false, 0x8020_0000),
            domain("secure", &[0], &[], 0, true, 0x8030_0000),
        ]);
        table
            .get_mut(ROOT_DOMAIN_ID)
            .install_context(1, mm::zalloc_box(DomainContext::fresh(ROOT_DOMAIN_ID)).unwrap());
        // secure 在 hart 1 上没有槽
        assert_eq!(
            domain_context_enter(&mut table, 1).unwrap_err(),
            SbiError::InvalidParam
        );
    }

    #[test]
    fn exit_falls_back_to_root_when_chain_is_exhausted() {
        let (mut table, secure, _, _) = round_trip_table();
        domain_context_enter(&mut table, secure).unwrap();
        // 模拟链接丢失：secure 槽没有显式后继
        table.get_mut(secure).context_mut(0).unwrap().next = None;
        assert_eq!(exit_successor(&table, 0), Some(ROOT_DOMAIN_ID));
        let plan = domain_context_exit(&mut table).unwrap();
        assert!(plan.is_none());
        assert_eq!(table.domain_of_hart(0), ROOT_DOMAIN_ID);
    }

    #[test]
    fn exit_from_root_without_successor_is_rejected() {
        hal::set_hartindex(0);
        let mut table = table_with(vec![domain("root", &[0], &[0], 0, false, 0x8020_0000)]);
        context_mgmt_init(&mut table).unwrap();
        let before = hal::pmp_snapshot();
        assert_eq!(
            domain_context_exit(&mut table).unwrap_err(),
            SbiError::InvalidParam
        );
        assert_eq!(hal::pmp_snapshot(), before);
        assert_eq!(table.domain_of_hart(0), ROOT_DOMAIN_ID);
    }

    #[test]
    #[should_panic(expected = "hart 1 parked")]
    fn exit_advances_chain_and_parks_non_boot_hart() {
        hal::set_hartindex(1);
        let mut table = scenario_two_table();
        // hart 1 从根域退出：链的下一跳是未初始化的 secure(1)，
        // 当前 hart 不是 secure 的引导 hart，启动后自身停靠
        let plan = domain_context_exit(&mut table).unwrap();
        let plan = plan.expect("uninitialized successor requires startup");
        assert_eq!(table.domain_of_hart(1), 1);
        assert!(table.get(ROOT_DOMAIN_ID).context(1).unwrap().initialized);
        drop(table);
        startup_domain_context(plan);
    }

    #[test]
    #[should_panic(expected = "enters Supervisor at 0x80300000, a0 = 0x0, a1 = 0x1234")]
    fn exit_startup_jumps_on_boot_hart() {
        hal::set_hartindex(0);
        let mut table = table_with(vec![
            domain("root", &[0], &[0], 0, false, 0x8020_0000),
            domain("secure", &[0], &[], 0, true, 0x8030_0000),
        ]);
        table
            .get_mut(ROOT_DOMAIN_ID)
            .install_context(0, mm::zalloc_box(DomainContext::fresh(ROOT_DOMAIN_ID)).unwrap());
        table
            .get_mut(1)
            .install_context(0, mm::zalloc_box(DomainContext::fresh(1)).unwrap());
        table.get_mut(ROOT_DOMAIN_ID).context_mut(0).unwrap().next = Some(1);

        let plan = domain_context_exit(&mut table).unwrap().unwrap();
        drop(table);
        startup_domain_context(plan);
    }

    #[test]
    #[should_panic(expected = "hart 0 parked")]
    fn startup_parks_until_all_possible_harts_arrive() {
        hal::set_hartindex(0);
        let mut table = table_with(vec![
            domain("root", &[0, 1], &[0, 1], 0, false, 0x8020_0000),
            domain("secure", &[0, 1], &[], 0, true, 0x8030_0000),
        ]);
        table
            .get_mut(ROOT_DOMAIN_ID)
            .install_context(0, mm::zalloc_box(DomainContext::fresh(ROOT_DOMAIN_ID)).unwrap());
        table
            .get_mut(1)
            .install_context(0, mm::zalloc_box(DomainContext::fresh(1)).unwrap());
        table.get_mut(ROOT_DOMAIN_ID).context_mut(0).unwrap().next = Some(1);

        // hart 1 尚未抵达 secure，先到的 hart 0 必须停靠等待
        let plan = domain_context_exit(&mut table).unwrap().unwrap();
        drop(table);
        startup_domain_context(plan);
    }

    #[test]
    fn thishart_context_follows_assignment() {
        let (mut table, secure, _, _) = round_trip_table();
        assert_eq!(table.thishart_context().unwrap().dom, ROOT_DOMAIN_ID);
        domain_context_enter(&mut table, secure).unwrap();
        assert_eq!(table.thishart_context().unwrap().dom, secure);
    }
}
