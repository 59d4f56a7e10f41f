//! 根目标：每条 Relay 链的终点。
//!
//! # 设计背景（Why）
//! - 每条调用链最终都要落到“真实对象”或者“没有对象”；后者意味着成员返回类型默认值，
//!   这使得未配置的测试替身依旧可用；
//! - 真实对象与代理之间的适配（按成员名路由到具体方法）属于代理生成后端，本模块只约定 [`Target`] 接口。
//!
//! # 契约说明（What）
//! - [`RootTarget::invoke`] 对缺席根目标返回签名缺省值；严格模式下改为返回
//!   [`DivertError::StrictViolation`]；
//! - 根目标返回的错误原样透传，不做包装。

use alloc::sync::Arc;
use core::fmt;

use crate::{
    call::Call,
    error::{CallResult, DivertError},
};

/// 根目标接口：把一次类型擦除的调用落到真实实现。
pub trait Target: Send + Sync {
    /// 执行调用。
    fn invoke(&self, call: &Call) -> CallResult;
}

/// 以闭包实现 [`Target`]。
pub struct FnTarget<F>(F);

impl<F> Target for FnTarget<F>
where
    F: Fn(&Call) -> CallResult + Send + Sync,
{
    fn invoke(&self, call: &Call) -> CallResult {
        (self.0)(call)
    }
}

/// 把闭包包装为 [`Target`]。
pub fn target_fn<F>(f: F) -> FnTarget<F>
where
    F: Fn(&Call) -> CallResult + Send + Sync,
{
    FnTarget(f)
}

/// 具体根目标或“缺席”。
#[derive(Clone, Default)]
pub struct RootTarget {
    target: Option<Arc<dyn Target>>,
}

impl RootTarget {
    /// 缺席根目标：所有未被处理的调用返回缺省值。
    pub fn absent() -> Self {
        Self::default()
    }

    /// 以具体目标构造。
    pub fn new(target: Arc<dyn Target>) -> Self {
        Self {
            target: Some(target),
        }
    }

    /// 以闭包构造。
    pub fn from_fn<F>(f: F) -> Self
    where
        F: Fn(&Call) -> CallResult + Send + Sync + 'static,
    {
        Self::new(Arc::new(target_fn(f)))
    }

    /// 是否缺席。
    pub fn is_absent(&self) -> bool {
        self.target.is_none()
    }

    /// 取得具体目标。
    pub fn target(&self) -> Option<&Arc<dyn Target>> {
        self.target.as_ref()
    }

    /// 执行调用，缺席时按 `strict` 决定返回缺省值或严格模式违例。
    pub fn invoke(&self, call: &Call, strict: bool) -> CallResult {
        match &self.target {
            Some(target) => target.invoke(call),
            None if strict => Err(DivertError::StrictViolation {
                contract: call.signature().contract().name(),
                member: call.member().to_owned(),
            }
            .into()),
            None => Ok(call.signature().default_return()),
        }
    }
}

impl fmt::Debug for RootTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.target {
            Some(_) => f.write_str("RootTarget(present)"),
            None => f.write_str("RootTarget(absent)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::call::{CallSignature, ReturnValue};

    trait Clock {}

    fn now() -> Call {
        Call::with_args(
            CallSignature::builder::<dyn Clock>("now").returns::<u64>().build(),
            (),
        )
    }

    #[test]
    fn absent_root_yields_default() {
        let value = RootTarget::absent().invoke(&now(), false).expect("缺省值");
        assert_eq!(value.downcast::<u64>().expect("u64"), 0);
    }

    #[test]
    fn absent_root_in_strict_mode_fails() {
        let err = RootTarget::absent()
            .invoke(&now(), true)
            .expect_err("严格模式应失败");
        let err = err.downcast_ref::<DivertError>().expect("DivertError");
        assert_eq!(err.code(), "divert.call.strict");
    }

    #[test]
    fn present_root_forwards_failures_unchanged() {
        #[derive(Debug)]
        struct Broken;
        impl fmt::Display for Broken {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("broken clock")
            }
        }
        impl std::error::Error for Broken {}

        let ok = RootTarget::from_fn(|_| Ok(ReturnValue::new(42_u64)));
        assert_eq!(
            ok.invoke(&now(), true).expect("ok").downcast::<u64>().expect("u64"),
            42
        );

        let failing = RootTarget::from_fn(|_| Err(Broken.into()));
        let err = failing.invoke(&now(), false).expect_err("应透传错误");
        assert!(err.downcast_ref::<Broken>().is_some());
    }
}
