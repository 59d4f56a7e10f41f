//! 集成测试共用的计算器契约：手写代理、根目标适配器与代理工厂。
//!
//! 代理生成后端在真实工程中由宏完成；这里手写一份，保证测试只依赖公开 API。
#![allow(dead_code)]

use std::sync::{Arc, OnceLock};

use divert_core::{
    AsyncReturn, Call, CallError, CallResult, CallSignature, ProxyFactory, ReturnValue,
    RootTarget, Target, Via,
};
use futures::FutureExt;

/// 被替身化的契约。
pub trait Calculator: Send + Sync {
    fn fib(&self, n: u64) -> Result<u64, CallError>;
    fn add(&self, a: i64, b: i64) -> Result<i64, CallError>;
    fn name(&self) -> Result<String, CallError>;
    fn fib_async(&self, n: u64) -> AsyncReturn<u64>;
}

macro_rules! signature {
    ($fn_name:ident, $member:literal, |$builder:ident| $build:expr) => {
        pub fn $fn_name() -> CallSignature {
            static SIGNATURE: OnceLock<CallSignature> = OnceLock::new();
            SIGNATURE
                .get_or_init(|| {
                    let $builder = CallSignature::builder::<dyn Calculator>($member);
                    $build
                })
                .clone()
        }
    };
}

/// 成员签名。
pub mod sig {
    use super::*;

    signature!(fib, "fib", |b| b.param::<u64>().returns::<u64>().build());
    signature!(add, "add", |b| b
        .param::<i64>()
        .param::<i64>()
        .returns::<i64>()
        .build());
    signature!(name, "name", |b| b.returns::<String>().build());
    signature!(fib_async, "fib_async", |b| b
        .param::<u64>()
        .returns_async::<u64>()
        .build());
}

/// 把每个成员折叠为 `Call` 交给 Via 的代理。
#[derive(Clone)]
pub struct CalculatorProxy {
    via: Via,
}

impl CalculatorProxy {
    pub fn new(via: Via) -> Self {
        Self { via }
    }

    pub fn via(&self) -> &Via {
        &self.via
    }
}

impl Calculator for CalculatorProxy {
    fn fib(&self, n: u64) -> Result<u64, CallError> {
        self.via.dispatch_as(Call::with_args(sig::fib(), (n,)))
    }

    fn add(&self, a: i64, b: i64) -> Result<i64, CallError> {
        self.via.dispatch_as(Call::with_args(sig::add(), (a, b)))
    }

    fn name(&self) -> Result<String, CallError> {
        self.via.dispatch_as(Call::with_args(sig::name(), ()))
    }

    fn fib_async(&self, n: u64) -> AsyncReturn<u64> {
        match self
            .via
            .dispatch_as::<AsyncReturn<u64>>(Call::with_args(sig::fib_async(), (n,)))
        {
            Ok(future) => future,
            Err(err) => futures::future::ready(Err(err)).boxed(),
        }
    }
}

/// 把真实实例按成员名路由的根目标适配器。
pub struct CalculatorTarget(pub Arc<dyn Calculator>);

impl Target for CalculatorTarget {
    fn invoke(&self, call: &Call) -> CallResult {
        let args = call.args();
        match call.member() {
            "fib" => {
                let (n,) = args.typed::<(u64,)>().ok_or("fib expects (u64,)")?;
                Ok(ReturnValue::new(self.0.fib(n)?))
            }
            "add" => {
                let (a, b) = args.typed::<(i64, i64)>().ok_or("add expects (i64, i64)")?;
                Ok(ReturnValue::new(self.0.add(a, b)?))
            }
            "name" => Ok(ReturnValue::new(self.0.name()?)),
            "fib_async" => {
                let (n,) = args.typed::<(u64,)>().ok_or("fib_async expects (u64,)")?;
                Ok(ReturnValue::new(self.0.fib_async(n)))
            }
            other => Err(format!("calculator has no member `{other}`").into()),
        }
    }
}

/// 真实实现。
#[derive(Clone, Copy, Debug, Default)]
pub struct RealCalculator;

pub fn fib_value(n: u64) -> u64 {
    let (mut a, mut b) = (0_u64, 1_u64);
    for _ in 0..n {
        (a, b) = (b, a + b);
    }
    a
}

impl Calculator for RealCalculator {
    fn fib(&self, n: u64) -> Result<u64, CallError> {
        Ok(fib_value(n))
    }

    fn add(&self, a: i64, b: i64) -> Result<i64, CallError> {
        Ok(a + b)
    }

    fn name(&self) -> Result<String, CallError> {
        Ok("real".to_owned())
    }

    fn fib_async(&self, n: u64) -> AsyncReturn<u64> {
        futures::future::ready(Ok(fib_value(n))).boxed()
    }
}

/// 以真实实现为根目标。
pub fn real_root() -> RootTarget {
    RootTarget::new(Arc::new(CalculatorTarget(Arc::new(RealCalculator))))
}

/// 计算器契约的代理工厂。
#[derive(Clone, Copy, Debug, Default)]
pub struct CalculatorFactory;

impl ProxyFactory<dyn Calculator> for CalculatorFactory {
    fn create_proxy(&self, via: Via) -> Arc<dyn Calculator> {
        Arc::new(CalculatorProxy::new(via))
    }

    fn create_root(&self, instance: Arc<dyn Calculator>) -> Arc<dyn Target> {
        Arc::new(CalculatorTarget(instance))
    }
}
