//! 重定向：约束 + Handler + 插入序号。

use alloc::sync::Arc;
use core::fmt;

use crate::{call::Call, error::CallResult, matcher::CallConstraint, relay::Relay};

/// 重定向句柄，由 [`RedirectStack`](crate::stack::RedirectStack) 分配，可用于移除。
///
/// 数值即插入序号：越大越新，在流水线中越靠前。
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RedirectId(u64);

impl RedirectId {
    /// 由原始序号构造，主要供诊断与测试使用。
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// 原始序号。
    pub fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for RedirectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "redirect#{}", self.0)
    }
}

/// 重定向处理器。
///
/// # 契约维度速览
/// - **语义**：收到当前调用的 [`Relay`]，可以直接返回值、调用 `relay.next()` 交给下一个匹配者，
///   或调用 `relay.original()` 直达根目标；
/// - **错误**：返回的错误原样成为代理调用的错误；
/// - **并发**：同一 Handler 可能被多个线程同时调用，也可能在自身执行期间被递归调用；
/// - **异步**：异步成员的 Handler 返回一个 [`AsyncReturn`](crate::call::AsyncReturn)，
///   在 Future 中持有克隆出的 `Relay` 即可跨挂起点继续转发。
pub trait RedirectHandler: Send + Sync {
    /// 处理一次调用。
    fn handle(&self, relay: Relay) -> CallResult;
}

/// 以闭包实现 [`RedirectHandler`]。
pub struct FnHandler<F>(F);

impl<F> RedirectHandler for FnHandler<F>
where
    F: Fn(Relay) -> CallResult + Send + Sync,
{
    fn handle(&self, relay: Relay) -> CallResult {
        (self.0)(relay)
    }
}

/// 把闭包包装为 [`RedirectHandler`]。
pub fn handler_fn<F>(f: F) -> FnHandler<F>
where
    F: Fn(Relay) -> CallResult + Send + Sync,
{
    FnHandler(f)
}

/// 已安装的重定向，创建后不可变。
pub struct Redirect {
    id: RedirectId,
    constraint: CallConstraint,
    handler: Arc<dyn RedirectHandler>,
}

impl Redirect {
    pub(crate) fn new(
        sequence: u64,
        constraint: CallConstraint,
        handler: Arc<dyn RedirectHandler>,
    ) -> Self {
        Self {
            id: RedirectId(sequence),
            constraint,
            handler,
        }
    }

    /// 句柄。
    pub fn id(&self) -> RedirectId {
        self.id
    }

    /// 插入序号。
    pub fn sequence(&self) -> u64 {
        self.id.0
    }

    /// 匹配约束。
    pub fn constraint(&self) -> &CallConstraint {
        &self.constraint
    }

    /// 是否处理该调用。
    pub fn matches(&self, call: &Call) -> bool {
        self.constraint.matches(call)
    }

    pub(crate) fn invoke(&self, relay: Relay) -> CallResult {
        self.handler.handle(relay)
    }
}

impl fmt::Debug for Redirect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Redirect")
            .field("id", &self.id)
            .field("constraint", &self.constraint)
            .finish()
    }
}
