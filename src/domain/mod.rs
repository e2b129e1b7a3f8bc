//! # 域管理模块
//!
//! ## Overview
//! 本模块维护固件中全部隔离域（domain）的注册表：每个域是一组
//! 预先配置的内存/IO 权限（由 PMP 执行）加上启动入口和特权级。
//! 同时维护 hart 与域之间的双向关系：
//! - 每个域记录可能运行它的 hart 集合（`possible_harts`）与当前
//!   正在其中执行的 hart 集合（`assigned_harts`）；
//! - 全局的 hart 索引 → 域映射记录每个 hart 此刻归属的域。
//!
//! ## Assumptions
//! - 域在冷启动阶段由单个 hart 注册完毕，之后注册表结构不再增删；
//! - 运行期对 `assigned_harts` 的修改只发生在域切换的临界区内，
//!   且每个 hart 只改写自己对应的位。
//!
//! ## Invariants
//! - 索引 0 恒为根域（ROOT），它是所有 hart 的缺省归属；
//! - 任一时刻每个 hart 恰好属于一个域：`hart_to_domain[h]` 所指域
//!   的 `assigned_harts` 包含 `h`，其他域都不包含；
//! - 任一 hart 至多出现在一个域的 `assigned_harts` 配置中
//!   （注册时校验）。

pub mod context;
pub mod hartmask;

use alloc::boxed::Box;
use alloc::vec::Vec;

use lazy_static::lazy_static;
use spin::Mutex;

use crate::config::{
    MAX_HARTS, MEMORY_BASE, MEMORY_SIZE, ROOT_NEXT_ADDR,
};
use crate::error::{SbiError, SbiResult};
use crate::hal::{Mode, PmpRegion, RegionPerm};
use context::DomainContext;
pub use hartmask::HartMask;

/// 域在注册表中的索引
pub type DomainId = usize;

/// 根域恒为 0 号
pub const ROOT_DOMAIN_ID: DomainId = 0;

/// 一个隔离域的全部静态配置与运行状态
pub struct Domain {
    /// 诊断用名字
    pub name: &'static str,
    /// 可能运行本域的 hart 集合
    pub possible_harts: HartMask,
    /// 当前正在本域中执行的 hart 集合
    pub assigned_harts: HartMask,
    /// 首次进入本域时执行跳转的 hart
    pub boot_hartid: usize,
    /// 启动入口地址
    pub next_addr: usize,
    /// 启动参数，进入时装入 a1
    pub next_arg1: usize,
    /// 启动特权级
    pub next_mode: Mode,
    /// 是否参与域上下文管理（false 表示永久占住所属 hart）
    pub context_mgmt: bool,
    /// 本域的 PMP 区域列表
    pub regions: Vec<PmpRegion>,
    /// hart 索引 → 本域上下文槽，由上下文管理器在 init 时填充
    contexts: Vec<Option<Box<DomainContext>>>,
}

impl Domain {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        name: &'static str,
        possible_harts: HartMask,
        assigned_harts: HartMask,
        boot_hartid: usize,
        next_addr: usize,
        next_arg1: usize,
        next_mode: Mode,
        context_mgmt: bool,
        regions: Vec<PmpRegion>,
    ) -> Self {
        let mut contexts = Vec::with_capacity(MAX_HARTS);
        contexts.resize_with(MAX_HARTS, || None);
        Self {
            name,
            possible_harts,
            assigned_harts,
            boot_hartid,
            next_addr,
            next_arg1,
            next_mode,
            context_mgmt,
            regions,
            contexts,
        }
    }

    /// 本域在 hart `h` 上的上下文槽
    pub fn context(&self, hartindex: usize) -> Option<&DomainContext> {
        self.contexts.get(hartindex)?.as_deref()
    }

    pub fn context_mut(&mut self, hartindex: usize) -> Option<&mut DomainContext> {
        self.contexts.get_mut(hartindex)?.as_deref_mut()
    }

    pub(crate) fn install_context(
        &mut self,
        hartindex: usize,
        slot: Box<DomainContext>,
    ) {
        self.contexts[hartindex] = Some(slot);
    }

    pub(crate) fn drop_context(&mut self, hartindex: usize) {
        self.contexts[hartindex] = None;
    }
}

/// 域注册表加上 hart 归属映射
pub struct DomainTable {
    domains: Vec<Domain>,
    hart_to_domain: [DomainId; MAX_HARTS],
    /// 上下文管理器是否已完成初始化（拒绝重复 init）
    pub(crate) context_init_done: bool,
}

impl DomainTable {
    pub fn new() -> Self {
        Self {
            domains: Vec::new(),
            hart_to_domain: [ROOT_DOMAIN_ID; MAX_HARTS],
            context_init_done: false,
        }
    }

    /// 注册一个域，返回其索引
    ///
    /// 第一个注册的域必须是根域。校验：
    /// - `assigned_harts ⊆ possible_harts`；
    /// - 任一 hart 不得同时出现在两个域的 `assigned_harts` 中；
    /// - `boot_hartid` 必须是本域可能的 hart。
    pub fn register(&mut self, domain: Domain) -> SbiResult<DomainId> {
        if self.context_init_done {
            return Err(SbiError::Denied);
        }
        if !domain.possible_harts.test(domain.boot_hartid) {
            log::error!(
                "domain {}: boot hart {} is not a possible hart",
                domain.name,
                domain.boot_hartid
            );
            return Err(SbiError::InvalidParam);
        }
        for h in domain.assigned_harts.iter() {
            if !domain.possible_harts.test(h) {
                log::error!("domain {}: assigned hart {} is not possible", domain.name, h);
                return Err(SbiError::InvalidParam);
            }
            if self.domains.iter().any(|d| d.assigned_harts.test(h)) {
                log::error!("domain {}: hart {} already assigned elsewhere", domain.name, h);
                return Err(SbiError::InvalidParam);
            }
        }
        let id = self.domains.len();
        // 已被其他域认领的 hart 不再归根域
        for h in domain.assigned_harts.iter() {
            self.hart_to_domain[h] = id;
        }
        self.domains.push(domain);
        Ok(id)
    }

    pub fn len(&self) -> usize {
        self.domains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.domains.is_empty()
    }

    pub fn get(&self, id: DomainId) -> &Domain {
        &self.domains[id]
    }

    pub fn get_mut(&mut self, id: DomainId) -> &mut Domain {
        &mut self.domains[id]
    }

    /// hart 当前归属的域
    pub fn domain_of_hart(&self, hartindex: usize) -> DomainId {
        self.hart_to_domain[hartindex]
    }

    /// 域切换第一阶段：把 hart 从当前域移交给目标域
    ///
    /// 依次：清除旧域的 assigned 位、更新 hart → 域映射、
    /// 设置新域的 assigned 位。完成前 trap 处理不得依赖域归属。
    pub(crate) fn assign_hart(&mut self, target: DomainId, hartindex: usize) {
        let current = self.hart_to_domain[hartindex];
        self.domains[current].assigned_harts.clear(hartindex);
        self.hart_to_domain[hartindex] = target;
        self.domains[target].assigned_harts.set(hartindex);
    }

    /// 当前 hart 的活动上下文槽（即所属域在本 hart 上的槽）
    pub fn thishart_context(&self) -> Option<&DomainContext> {
        let h = crate::hal::current_hartindex();
        self.get(self.domain_of_hart(h)).context(h)
    }
}

lazy_static! {
    /// 全局域注册表
    ///
    /// 冷启动 hart 在 `init` 中填充；运行期域切换在持锁且屏蔽
    /// 中断的临界区内读写。
    pub static ref DOMAINS: Mutex<DomainTable> = Mutex::new(DomainTable::new());
}

/// 注册根域
///
/// 根域覆盖整个物理内存，拥有所有 hart，载荷入口与启动参数
/// 来自平台配置。设备树定义的附加域由外部协作者注册，不在
/// 本模块职责内。
pub fn init(dtb: usize) -> SbiResult {
    let mut all_harts = HartMask::EMPTY;
    for h in 0..MAX_HARTS {
        all_harts.set(h);
    }
    let root = Domain::new(
        "root",
        all_harts,
        all_harts,
        crate::config::COLD_BOOT_HARTID,
        ROOT_NEXT_ADDR,
        dtb,
        Mode::Supervisor,
        false,
        alloc::vec![PmpRegion::new(
            MEMORY_BASE,
            MEMORY_SIZE.trailing_zeros(),
            RegionPerm::RWX
        )],
    );
    let id = DOMAINS.lock().register(root)?;
    debug_assert_eq!(id, ROOT_DOMAIN_ID);
    log::info!("root domain registered, payload entry {:#x}", ROOT_NEXT_ADDR);
    Ok(())
}
