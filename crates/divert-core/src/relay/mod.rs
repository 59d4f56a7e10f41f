//! Relay：调用链内的转发上下文。
//!
//! # 设计背景（Why）
//! - Handler 需要“继续交给下一个匹配者”和“直达原始目标”两种续接能力；
//! - 调用可能递归（Handler 通过同一个代理再次调用自己）、并发（多线程同时调用同一个代理）
//!   或跨越挂起点（异步 Handler 在 `await` 之后才转发），因此“当前位置”不能放在任何共享、
//!   全局或线程局部的槽位里。
//!
//! # 逻辑解析（How）
//! - [`Relay`] 是一个值：它自带流水线、游标、根目标与调用本身，随 Handler 的闭包或 Future 一起移动；
//! - `next()` 构造一个游标加一的新 Relay 交给下一个候选者，流水线耗尽时落到根目标；
//! - `original()` 直接调用根目标，不移动游标、不重新过滤；
//! - 链路的流水线与根目标来自分发入口钉住的快照，之后的栈变更对本链路不可见。
//!
//! # 契约说明（What）
//! - `next()` / `original()` 可以被调用任意多次，每次都是对剩余链路的一次独立调用；
//! - 转发返回的错误原样透传；
//! - [`RelayState`] 由同一条链路上的所有 Relay 共享，嵌套的代理调用得到全新的链路与状态袋。

mod state;

pub use state::RelayState;

use alloc::sync::Arc;
use core::fmt;

use crate::{
    call::{ArgumentTuple, Call, CallArguments, CallSignature},
    error::{CallError, CallResult},
    redirect::Redirect,
    target::RootTarget,
};

/// 一条调用链共享的不可变部分。
struct RelayChain {
    pipeline: Arc<[Arc<Redirect>]>,
    root: RootTarget,
    strict: bool,
    version: u64,
    state: RelayState,
}

/// 单次调用链上某个候选者看到的转发上下文。
///
/// 克隆开销为一次引用计数加若干 `Arc` 复制，可放心移动进 `async move` 块。
#[derive(Clone)]
pub struct Relay {
    chain: Arc<RelayChain>,
    cursor: usize,
    call: Call,
}

impl Relay {
    pub(crate) fn start(
        pipeline: Arc<[Arc<Redirect>]>,
        root: RootTarget,
        strict: bool,
        version: u64,
        call: Call,
    ) -> Self {
        Self {
            chain: Arc::new(RelayChain {
                pipeline,
                root,
                strict,
                version,
                state: RelayState::new(),
            }),
            cursor: 0,
            call,
        }
    }

    /// 以当前游标上的候选者处理调用。
    pub(crate) fn run(self) -> CallResult {
        let redirect = Arc::clone(&self.chain.pipeline[self.cursor]);
        redirect.invoke(self)
    }

    /// 当前调用。
    pub fn call(&self) -> &Call {
        &self.call
    }

    /// 调用签名。
    pub fn signature(&self) -> &CallSignature {
        self.call.signature()
    }

    /// 只读实参视图。
    pub fn args(&self) -> &CallArguments {
        self.call.args()
    }

    /// 克隆出类型化实参元组。
    pub fn typed_args<A: ArgumentTuple>(&self) -> Option<A> {
        self.call.args().typed()
    }

    /// 链路私有状态袋。
    pub fn state(&self) -> &RelayState {
        &self.chain.state
    }

    /// 当前候选者在流水线中的位置，0 表示最外层。
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// 流水线长度（匹配本次调用的重定向数量）。
    pub fn depth(&self) -> usize {
        self.chain.pipeline.len()
    }

    /// 正在处理调用的重定向。
    pub fn redirect(&self) -> &Redirect {
        &self.chain.pipeline[self.cursor]
    }

    /// 分发入口钉住的快照版本。
    pub fn version(&self) -> u64 {
        self.chain.version
    }

    /// 交给下一个匹配的重定向；流水线耗尽时调用根目标。
    pub fn next(&self) -> CallResult {
        self.forward(self.call.clone())
    }

    /// 以改写后的实参交给下一个候选者。
    ///
    /// 实参形状必须与签名一致，否则返回 `ArgumentShapeMismatch`；流水线不会重新过滤。
    pub fn next_with(&self, args: CallArguments) -> CallResult {
        let call = self.rewrite(args)?;
        self.forward(call)
    }

    /// 直接调用根目标，跳过剩余全部重定向。
    pub fn original(&self) -> CallResult {
        self.chain.root.invoke(&self.call, self.chain.strict)
    }

    /// 以改写后的实参直接调用根目标。
    pub fn original_with(&self, args: CallArguments) -> CallResult {
        let call = self.rewrite(args)?;
        self.chain.root.invoke(&call, self.chain.strict)
    }

    /// [`Relay::next`] 的类型化版本。
    pub fn next_as<R: 'static>(&self) -> Result<R, CallError> {
        Ok(self.next()?.into_typed::<R>(self.call.member())?)
    }

    /// [`Relay::original`] 的类型化版本。
    pub fn original_as<R: 'static>(&self) -> Result<R, CallError> {
        Ok(self.original()?.into_typed::<R>(self.call.member())?)
    }

    fn rewrite(&self, args: CallArguments) -> Result<Call, CallError> {
        self.call.signature().check_arguments(&args)?;
        Ok(self.call.with_arguments(args))
    }

    fn forward(&self, call: Call) -> CallResult {
        let next = self.cursor + 1;
        if next < self.chain.pipeline.len() {
            let relay = Relay {
                chain: Arc::clone(&self.chain),
                cursor: next,
                call,
            };
            return relay.run();
        }
        self.chain.root.invoke(&call, self.chain.strict)
    }
}

impl fmt::Debug for Relay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Relay")
            .field("call", self.call.signature())
            .field("cursor", &self.cursor)
            .field("depth", &self.chain.pipeline.len())
            .field("version", &self.chain.version)
            .finish()
    }
}
