#![deny(unsafe_code)]
#![doc = "divert-core: 面向测试替身的重定向栈、调用分发与 Relay 转发引擎。"]
#![doc = ""]
#![doc = "== 引擎模型 =="]
#![doc = "代理把每次成员调用折叠为 `Call` 交给 `Via::dispatch`；分发器钉住重定向栈的当前快照，"]
#![doc = "按“最新安装在前”的顺序过滤出候选流水线，并以 `Relay` 驱动 Handler 之间的转发。"]
#![doc = "Handler 可以直接返回值、调用 `relay.next()` 交给下一个候选者，或调用 `relay.original()` 直达根目标。"]
#![doc = ""]
#![doc = "== 并发与异步 =="]
#![doc = "调用链位置随 `Relay` 值本身移动，不存放在任何共享、全局或线程局部槽位中；"]
#![doc = "因此递归调用、并发调用以及跨 `await` 的异步 Handler 互不干扰。"]

extern crate alloc;

/// 调用模型：签名、实参与返回值。
pub mod call;
pub mod contract;
pub mod dispatch;
pub mod error;
pub mod matcher;
pub mod options;
pub mod redirect;
pub mod relay;
pub mod stack;
pub mod target;
pub mod via;
pub mod via_set;

pub use call::{
    Argument, ArgumentTuple, AsyncReturn, Call, CallArguments, CallSignature, ReturnShape,
    ReturnValue, SignatureBuilder, TypeShape,
};
pub use contract::ContractId;
pub use dispatch::{dispatch, pipeline_for};
pub use error::{CallError, CallResult, DivertError};
pub use matcher::{ArgumentPredicate, CallConstraint};
pub use options::ViaOptions;
pub use redirect::{FnHandler, Redirect, RedirectHandler, RedirectId, handler_fn};
pub use relay::{Relay, RelayState};
pub use stack::{RedirectStack, StackSnapshot};
pub use target::{FnTarget, RootTarget, Target, target_fn};
pub use via::{RedirectBuilder, Via};
pub use via_set::{ProxyFactory, ViaSet};
