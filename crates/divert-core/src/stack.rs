//! 重定向栈：写时复制的有序重定向集合与当前根目标。
//!
//! # 设计背景（Why）
//! - **热插拔安全切换**：测试代码可能在调用进行中插入、移除重定向或替换根目标；读路径（分发）
//!   必须始终看到完整一致的版本，而写路径不能阻塞读路径；
//! - **快照语义**：每次分发在入口处钉住一个 [`StackSnapshot`]，整条调用链（包括所有 `next()` /
//!   `original()` 转发）只使用这份快照，之后的变更不会回溯影响进行中的链路。
//!
//! # 逻辑解析（How）
//! - 当前版本存放在 [`ArcSwap`] 中；读操作 `load_full` 取得 `Arc`，O(1) 且无锁；
//! - 写操作通过 `rcu` 以“读取-复制-比较交换”方式发布新快照，多个写者竞争时自动重试；
//! - 重定向以“最新在前”的顺序保存，分发时只需过滤、无需排序。
//!
//! # 契约说明（What）
//! - `insert_redirect` 在注册点校验约束，误配置立即返回 [`DivertError`]；
//! - `retarget` 只替换根目标，不影响已安装的重定向；
//! - `reset` 清空重定向并恢复构造时的根目标；
//! - 每次成功变更都会递增快照的 `version`。
//!
//! # 风险与考量（Trade-offs）
//! - 每次写入复制整条重定向列表，写成本 O(n)；测试替身场景下 n 很小，换取读路径零锁。

use alloc::{sync::Arc, vec::Vec};
use core::{
    fmt,
    sync::atomic::{AtomicU64, Ordering},
};

use arc_swap::ArcSwap;
use tracing::{debug, warn};

use crate::{
    contract::ContractId,
    error::DivertError,
    matcher::CallConstraint,
    options::ViaOptions,
    redirect::{Redirect, RedirectHandler, RedirectId},
    target::RootTarget,
};

/// 重定向栈的不可变版本。
#[derive(Clone)]
pub struct StackSnapshot {
    root: RootTarget,
    redirects: Arc<[Arc<Redirect>]>,
    version: u64,
    strict: bool,
}

impl StackSnapshot {
    fn initial(root: RootTarget, strict: bool) -> Self {
        Self {
            root,
            redirects: Arc::from(Vec::new()),
            version: 0,
            strict,
        }
    }

    /// 当前根目标。
    pub fn root(&self) -> &RootTarget {
        &self.root
    }

    /// 全部重定向，最新安装的在前。
    pub fn redirects(&self) -> &[Arc<Redirect>] {
        &self.redirects
    }

    /// 版本号，每次变更递增。
    pub fn version(&self) -> u64 {
        self.version
    }

    /// 重定向数量。
    pub fn len(&self) -> usize {
        self.redirects.len()
    }

    /// 是否没有任何重定向。
    pub fn is_empty(&self) -> bool {
        self.redirects.is_empty()
    }

    /// 是否严格模式。
    pub fn is_strict(&self) -> bool {
        self.strict
    }

    /// 按插入序号降序放入新重定向；并发写者的发布顺序可能与序号顺序不同。
    fn with_redirect(&self, redirect: Arc<Redirect>) -> Self {
        let at = self
            .redirects
            .partition_point(|existing| existing.sequence() > redirect.sequence());
        let mut redirects = Vec::with_capacity(self.redirects.len() + 1);
        redirects.extend(self.redirects[..at].iter().cloned());
        redirects.push(redirect);
        redirects.extend(self.redirects[at..].iter().cloned());
        let redirects = redirects.into();
        Self {
            root: self.root.clone(),
            redirects,
            version: self.version + 1,
            strict: self.strict,
        }
    }

    fn without(&self, id: RedirectId) -> Option<Self> {
        if !self.redirects.iter().any(|redirect| redirect.id() == id) {
            return None;
        }
        let redirects = self
            .redirects
            .iter()
            .filter(|redirect| redirect.id() != id)
            .cloned()
            .collect();
        Some(Self {
            root: self.root.clone(),
            redirects,
            version: self.version + 1,
            strict: self.strict,
        })
    }

    fn retargeted(&self, root: RootTarget) -> Self {
        Self {
            root,
            redirects: Arc::clone(&self.redirects),
            version: self.version + 1,
            strict: self.strict,
        }
    }

    fn cleared(&self, root: RootTarget) -> Self {
        Self {
            root,
            redirects: Arc::from(Vec::new()),
            version: self.version + 1,
            strict: self.strict,
        }
    }
}

impl fmt::Debug for StackSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StackSnapshot")
            .field("root", &self.root)
            .field("redirects", &self.redirects.len())
            .field("version", &self.version)
            .finish()
    }
}

/// 单个契约的重定向栈。
pub struct RedirectStack {
    contract: ContractId,
    options: ViaOptions,
    initial_root: RootTarget,
    current: ArcSwap<StackSnapshot>,
    sequence: AtomicU64,
}

impl RedirectStack {
    /// 以初始根目标与配置构造。
    pub fn new(contract: ContractId, root: RootTarget, options: ViaOptions) -> Self {
        let snapshot = StackSnapshot::initial(root.clone(), options.strict);
        Self {
            contract,
            options,
            initial_root: root,
            current: ArcSwap::from_pointee(snapshot),
            sequence: AtomicU64::new(0),
        }
    }

    /// 所服务的契约。
    pub fn contract(&self) -> ContractId {
        self.contract
    }

    /// 构造时的配置。
    pub fn options(&self) -> &ViaOptions {
        &self.options
    }

    fn label(&self) -> &str {
        self.options
            .label
            .as_deref()
            .unwrap_or_else(|| self.contract.name())
    }

    /// 安装重定向；它会先于所有已安装的重定向被考虑。
    pub fn insert_redirect(
        &self,
        constraint: CallConstraint,
        handler: Arc<dyn RedirectHandler>,
    ) -> Result<RedirectId, DivertError> {
        if let Err(err) = self.check_constraint(&constraint) {
            warn!(via = self.label(), code = err.code(), error = %err, "rejecting redirect");
            return Err(err);
        }

        let sequence = self.sequence.fetch_add(1, Ordering::SeqCst) + 1;
        let redirect = Arc::new(Redirect::new(sequence, constraint, handler));
        let previous = self
            .current
            .rcu(|current| current.with_redirect(Arc::clone(&redirect)));
        debug!(
            via = self.label(),
            redirect_id = redirect.id().raw(),
            version = previous.version() + 1,
            "redirect inserted"
        );
        Ok(redirect.id())
    }

    fn check_constraint(&self, constraint: &CallConstraint) -> Result<(), DivertError> {
        constraint.validate()?;
        if let Some(signature) = constraint.signature() {
            if signature.contract() != self.contract {
                return Err(DivertError::ContractMismatch {
                    expected: self.contract.name(),
                    actual: signature.contract().name(),
                });
            }
        }
        Ok(())
    }

    /// 移除重定向；已在进行中的调用链不受影响。
    pub fn remove_redirect(&self, id: RedirectId) -> Result<(), DivertError> {
        let previous = self.current.rcu(|current| match current.without(id) {
            Some(next) => Arc::new(next),
            None => Arc::clone(current),
        });
        if !previous.redirects().iter().any(|redirect| redirect.id() == id) {
            warn!(via = self.label(), redirect_id = id.raw(), "redirect not installed");
            return Err(DivertError::RedirectNotFound { id });
        }
        debug!(
            via = self.label(),
            redirect_id = id.raw(),
            version = previous.version() + 1,
            "redirect removed"
        );
        Ok(())
    }

    /// 替换根目标，保留全部重定向。
    pub fn retarget(&self, root: RootTarget) {
        let previous = self.current.rcu(|current| current.retargeted(root.clone()));
        debug!(
            via = self.label(),
            absent = root.is_absent(),
            version = previous.version() + 1,
            "root retargeted"
        );
    }

    /// 清空重定向并恢复构造时的根目标。
    pub fn reset(&self) {
        let previous = self
            .current
            .rcu(|current| current.cleared(self.initial_root.clone()));
        debug!(
            via = self.label(),
            dropped = previous.len(),
            version = previous.version() + 1,
            "stack reset"
        );
    }

    /// 当前快照，O(1) 且不阻塞写者。
    pub fn snapshot(&self) -> Arc<StackSnapshot> {
        self.current.load_full()
    }

    /// 当前版本号。
    pub fn version(&self) -> u64 {
        self.current.load().version()
    }
}

impl fmt::Debug for RedirectStack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedirectStack")
            .field("contract", &self.contract)
            .field("snapshot", &*self.current.load())
            .finish()
    }
}
