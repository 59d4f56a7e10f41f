//! # ViaSet：按契约管理重定向栈与代理
//!
//! ## 核心意图（Why）
//! - 一组测试替身通常跨多个契约协作，`ViaSet` 为每个契约维护唯一的 [`Via`]，并统一复位；
//! - 代理生成依赖宿主类型系统，本 crate 只定义单一的能力接口 [`ProxyFactory`]，
//!   由上层（宏、手写适配器等）注册进来，核心逻辑从不关心代理如何生成。
//!
//! ## 行为契约（What）
//! - `via::<C>()`：首次访问时创建，之后始终返回同一个栈；
//! - `proxy::<C>()`：契约未注册工厂时返回 [`DivertError::NotProxyable`]；
//! - `via_of(&proxy)`：实例不是本集合生成的代理时返回 [`DivertError::NotAProxy`]；
//! - 所有操作以 [`ContractId`] 为索引，基于 `DashMap` 并发安全。
//!
//! ## 风险提示（Trade-offs）
//! - 代理登记按地址索引并保存弱引用；代理释放后条目在下一次生成代理时清理。

use alloc::{
    boxed::Box,
    sync::{Arc, Weak},
};
use core::any::Any;

use dashmap::{DashMap, mapref::entry::Entry};
use tracing::{debug, warn};

use crate::{
    contract::ContractId,
    error::DivertError,
    options::ViaOptions,
    target::{RootTarget, Target},
    via::Via,
};

/// 代理生成能力。
///
/// # 教案式注释
/// - **意图 (Why)**：把“生成一个实现契约、并把每次成员调用折叠为 [`Call`](crate::call::Call)
///   交给 [`Via::dispatch`] 的对象”这一宿主相关能力隔离在单一接口后；
/// - **契约 (What)**：
///   - `create_proxy`：返回的代理对每个成员调用 `via.dispatch`，并把分发结果作为成员结果；
///     没有根目标也没有匹配重定向时，成员必须返回缺省值而不是失败；
///   - `create_root`：把真实实例适配为 [`Target`]，按成员名路由到具体方法。
pub trait ProxyFactory<C: ?Sized>: Send + Sync {
    /// 生成转发到 `via` 的代理。
    fn create_proxy(&self, via: Via) -> Arc<C>;

    /// 把真实实例适配为根目标。
    fn create_root(&self, instance: Arc<C>) -> Arc<dyn Target>;
}

struct ProxyRecord {
    via: Via,
    contract: ContractId,
    proxy: Box<dyn Any + Send + Sync>,
    alive: Box<dyn Fn() -> bool + Send + Sync>,
}

/// 按契约管理的 Via 集合。
#[derive(Default)]
pub struct ViaSet {
    options: ViaOptions,
    vias: DashMap<ContractId, Via>,
    factories: DashMap<ContractId, Box<dyn Any + Send + Sync>>,
    proxies: DashMap<usize, ProxyRecord>,
}

impl ViaSet {
    /// 以默认配置创建。
    pub fn new() -> Self {
        Self::default()
    }

    /// 以统一配置创建，之后创建的每个 Via 都使用该配置。
    pub fn with_options(options: ViaOptions) -> Self {
        Self {
            options,
            ..Self::default()
        }
    }

    /// 注册契约 `C` 的代理工厂，覆盖已有注册。
    pub fn register_factory<C, F>(&self, factory: F)
    where
        C: ?Sized + 'static,
        F: ProxyFactory<C> + 'static,
    {
        let contract = ContractId::of::<C>();
        let erased: Arc<dyn ProxyFactory<C>> = Arc::new(factory);
        self.factories.insert(contract, Box::new(erased));
        debug!(contract = contract.name(), "proxy factory registered");
    }

    /// 契约 `C` 的 Via，首次访问时以缺席根目标创建。
    pub fn via<C: ?Sized + 'static>(&self) -> Via {
        self.vias
            .entry(ContractId::of::<C>())
            .or_insert_with(|| Via::with_options::<C>(RootTarget::absent(), self.options.clone()))
            .value()
            .clone()
    }

    /// 契约 `C` 的 Via；首次创建时以 `instance` 作为初始根目标（`reset` 会恢复到它），
    /// 已存在时把 `instance` 设为当前根目标。
    pub fn via_with_root<C>(&self, instance: Arc<C>) -> Result<Via, DivertError>
    where
        C: ?Sized + Send + Sync + 'static,
    {
        let root = RootTarget::new(self.factory::<C>()?.create_root(instance));
        // 查询与创建必须在同一个分片锁内完成，否则并发创建者会让 `root` 丢失。
        let existing = match self.vias.entry(ContractId::of::<C>()) {
            Entry::Occupied(entry) => entry.get().clone(),
            Entry::Vacant(entry) => {
                let via = Via::with_options::<C>(root, self.options.clone());
                entry.insert(via.clone());
                return Ok(via);
            }
        };
        existing.retarget(root);
        Ok(existing)
    }

    /// 以真实实例替换契约 `C` 的当前根目标。
    pub fn retarget<C>(&self, instance: Arc<C>) -> Result<(), DivertError>
    where
        C: ?Sized + Send + Sync + 'static,
    {
        let root = self.factory::<C>()?.create_root(instance);
        self.via::<C>().retarget(RootTarget::new(root));
        Ok(())
    }

    /// 生成契约 `C` 的代理。
    pub fn proxy<C>(&self) -> Result<Arc<C>, DivertError>
    where
        C: ?Sized + Send + Sync + 'static,
    {
        let factory = self.factory::<C>()?;
        let via = self.via::<C>();
        let proxy = factory.create_proxy(via.clone());
        self.track(&proxy, via);
        Ok(proxy)
    }

    /// 查询代理背后的 Via。
    pub fn via_of<C>(&self, proxy: &Arc<C>) -> Result<Via, DivertError>
    where
        C: ?Sized + Send + Sync + 'static,
    {
        let contract = ContractId::of::<C>();
        let found = self.proxies.get(&address_of(proxy)).and_then(|record| {
            let live = record
                .proxy
                .downcast_ref::<Weak<C>>()
                .and_then(Weak::upgrade)?;
            (record.contract == contract && address_of(&live) == address_of(proxy))
                .then(|| record.via.clone())
        });
        found.ok_or_else(|| {
            warn!(contract = contract.name(), "instance is not a tracked proxy");
            DivertError::NotAProxy {
                contract: contract.name(),
            }
        })
    }

    /// 复位全部 Via。
    pub fn reset_all(&self) {
        for entry in self.vias.iter() {
            entry.value().reset();
        }
        debug!(vias = self.vias.len(), "all vias reset");
    }

    /// 已创建的 Via 数量。
    pub fn len(&self) -> usize {
        self.vias.len()
    }

    /// 是否尚未创建任何 Via。
    pub fn is_empty(&self) -> bool {
        self.vias.is_empty()
    }

    fn factory<C: ?Sized + 'static>(&self) -> Result<Arc<dyn ProxyFactory<C>>, DivertError> {
        let contract = ContractId::of::<C>();
        let factory = self.factories.get(&contract).and_then(|entry| {
            let erased: &(dyn Any + Send + Sync) = &**entry.value();
            erased.downcast_ref::<Arc<dyn ProxyFactory<C>>>().cloned()
        });
        factory.ok_or_else(|| {
            warn!(contract = contract.name(), "no proxy factory registered");
            DivertError::NotProxyable {
                contract: contract.name(),
            }
        })
    }

    fn track<C>(&self, proxy: &Arc<C>, via: Via)
    where
        C: ?Sized + Send + Sync + 'static,
    {
        self.proxies.retain(|_, record| (record.alive)());
        let weak = Arc::downgrade(proxy);
        let probe = weak.clone();
        self.proxies.insert(
            address_of(proxy),
            ProxyRecord {
                via,
                contract: ContractId::of::<C>(),
                proxy: Box::new(weak),
                alive: Box::new(move || probe.strong_count() > 0),
            },
        );
    }
}

fn address_of<C: ?Sized>(value: &Arc<C>) -> usize {
    Arc::as_ptr(value).cast::<()>() as usize
}
