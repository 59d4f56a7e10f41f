//! Via：面向配置层的重定向栈句柄。
//!
//! # 教案式说明
//! - **意图（Why）**：配置层（选择器解析、测试 DSL）与代理后端都只需要一个可克隆的句柄：
//!   前者用它安装重定向，后者用它分发调用；
//! - **逻辑（How）**：`Via` 只是 `Arc<RedirectStack>` 的外壳，[`Via::to`] 返回一次性的
//!   [`RedirectBuilder`]，把约束与 Handler 组装后交给栈；
//! - **契约（What）**：所有注册期误用在 `redirect*` 调用处同步返回 [`DivertError`]。

use alloc::sync::Arc;
use core::any::type_name;

use crate::{
    call::{Call, ReturnValue, TypeShape},
    contract::ContractId,
    dispatch::dispatch,
    error::{CallError, CallResult, DivertError},
    matcher::CallConstraint,
    options::ViaOptions,
    redirect::{RedirectHandler, RedirectId, handler_fn},
    relay::Relay,
    stack::{RedirectStack, StackSnapshot},
    target::RootTarget,
};

/// 单个契约的重定向栈句柄。
#[derive(Clone, Debug)]
pub struct Via {
    stack: Arc<RedirectStack>,
}

impl Via {
    /// 契约 `C` 的 Via，根目标缺席。
    pub fn new<C: ?Sized + 'static>() -> Self {
        Self::with_root::<C>(RootTarget::absent())
    }

    /// 契约 `C` 的 Via，带初始根目标。
    pub fn with_root<C: ?Sized + 'static>(root: RootTarget) -> Self {
        Self::with_options::<C>(root, ViaOptions::default())
    }

    /// 契约 `C` 的 Via，带初始根目标与配置。
    pub fn with_options<C: ?Sized + 'static>(root: RootTarget, options: ViaOptions) -> Self {
        Self::from_stack(Arc::new(RedirectStack::new(
            ContractId::of::<C>(),
            root,
            options,
        )))
    }

    /// 包装已有的栈。
    pub fn from_stack(stack: Arc<RedirectStack>) -> Self {
        Self { stack }
    }

    /// 所服务的契约。
    pub fn contract(&self) -> ContractId {
        self.stack.contract()
    }

    /// 底层栈。
    pub fn stack(&self) -> &Arc<RedirectStack> {
        &self.stack
    }

    /// 为满足 `constraint` 的调用准备重定向。
    pub fn to(&self, constraint: CallConstraint) -> RedirectBuilder<'_> {
        RedirectBuilder {
            via: self,
            constraint,
        }
    }

    /// 为任意调用准备兜底重定向。
    pub fn to_any(&self) -> RedirectBuilder<'_> {
        self.to(CallConstraint::any())
    }

    /// 替换根目标。
    pub fn retarget(&self, root: RootTarget) {
        self.stack.retarget(root);
    }

    /// 移除重定向。
    pub fn remove(&self, id: RedirectId) -> Result<(), DivertError> {
        self.stack.remove_redirect(id)
    }

    /// 清空重定向并恢复初始根目标。
    pub fn reset(&self) {
        self.stack.reset();
    }

    /// 当前快照。
    pub fn snapshot(&self) -> Arc<StackSnapshot> {
        self.stack.snapshot()
    }

    /// 代理入口：钉住当前快照并分发调用。
    pub fn dispatch(&self, call: Call) -> CallResult {
        let snapshot = self.stack.snapshot();
        dispatch(call, &snapshot)
    }

    /// 分发并取出类型化返回值。
    pub fn dispatch_as<R: 'static>(&self, call: Call) -> Result<R, CallError> {
        let member = call.member().to_owned();
        Ok(self.dispatch(call)?.into_typed::<R>(&member)?)
    }
}

/// 一次性的重定向装配器，由 [`Via::to`] 创建。
pub struct RedirectBuilder<'a> {
    via: &'a Via,
    constraint: CallConstraint,
}

impl RedirectBuilder<'_> {
    /// 以类型擦除的闭包安装重定向。
    pub fn redirect<F>(self, handler: F) -> Result<RedirectId, DivertError>
    where
        F: Fn(Relay) -> CallResult + Send + Sync + 'static,
    {
        self.redirect_handler(Arc::new(handler_fn(handler)))
    }

    /// 以 Handler 对象安装重定向。
    pub fn redirect_handler(
        self,
        handler: Arc<dyn RedirectHandler>,
    ) -> Result<RedirectId, DivertError> {
        self.via.stack.insert_redirect(self.constraint, handler)
    }

    /// 以类型化闭包安装重定向；`R` 必须等于签名的返回类型。
    ///
    /// 兜底约束没有签名，类型化 Handler 会被拒绝并返回 [`DivertError::UntypedCatchAll`]。
    pub fn redirect_typed<R, F>(self, handler: F) -> Result<RedirectId, DivertError>
    where
        R: Send + 'static,
        F: Fn(Relay) -> Result<R, CallError> + Send + Sync + 'static,
    {
        let expected = TypeShape::of::<R>();
        let declared = self
            .constraint
            .signature()
            .map(|signature| (signature.member().to_owned(), signature.returns().shape()));
        match declared {
            Some((_, shape)) if shape == expected => {}
            Some((member, shape)) => {
                return Err(DivertError::ReturnTypeMismatch {
                    member,
                    expected: expected.name(),
                    declared: shape.name(),
                });
            }
            None => {
                return Err(DivertError::UntypedCatchAll {
                    expected: type_name::<R>(),
                });
            }
        }
        self.redirect(move |relay| handler(relay).map(ReturnValue::new))
    }

    /// 安装一个固定返回值的重定向。
    pub fn returns<R>(self, value: R) -> Result<RedirectId, DivertError>
    where
        R: Clone + Send + Sync + 'static,
    {
        self.redirect_typed(move |_| Ok(value.clone()))
    }
}
