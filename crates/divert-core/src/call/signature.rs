//! 调用签名：契约成员的身份与参数/返回形状。
//!
//! # 设计背景（Why）
//! - 匹配引擎只需要一个稳定、可比较的“成员身份”，选择器表达式最终都会落到这里；
//! - 根目标缺席时，引擎要为成员合成默认返回值，因此签名同时携带返回值的默认构造器。
//!
//! # 契约说明（What）
//! - 相等性 = 契约 + 成员名 + 参数类型序列 + 返回类型；默认构造器不参与比较；
//! - 签名内部以 `Arc` 共享，克隆为常数开销，可放入 `static`。

use alloc::{borrow::Cow, sync::Arc, vec::Vec};
use core::{
    any::{TypeId, type_name},
    fmt,
    hash::{Hash, Hasher},
};

use futures::FutureExt;

use crate::{
    contract::ContractId,
    error::{CallError, DivertError},
};

use super::{
    arguments::CallArguments,
    value::{AsyncReturn, ReturnValue},
};

/// 类型形状：`TypeId` 加上可读类型名。
#[derive(Clone, Copy)]
pub struct TypeShape {
    id: TypeId,
    name: &'static str,
}

impl TypeShape {
    /// 取得 `T` 的形状。
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: type_name::<T>(),
        }
    }

    /// 底层 `TypeId`。
    pub fn id(&self) -> TypeId {
        self.id
    }

    /// 可读类型名。
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl PartialEq for TypeShape {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeShape {}

impl Hash for TypeShape {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for TypeShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

type DefaultFactory = Arc<dyn Fn() -> ReturnValue + Send + Sync>;

/// 返回值形状与缺省值构造器。
///
/// # 教案式说明
/// - **意图（Why）**：根目标缺席时，引擎必须为每个成员给出“类型默认值”：
///   引用类返回 `None`/空值，数值返回零，异步成员返回一个已完成的默认 Future；
/// - **逻辑（How）**：在签名构造时把 `R::default` 捕获为闭包，调用期直接执行，无需反射；
/// - **契约（What）**：`shape` 参与签名比较，`default` 不参与。
#[derive(Clone)]
pub struct ReturnShape {
    shape: TypeShape,
    default: DefaultFactory,
}

impl ReturnShape {
    /// 同步成员，缺省值为 `R::default()`。
    pub fn of<R: Default + Send + 'static>() -> Self {
        Self {
            shape: TypeShape::of::<R>(),
            default: Arc::new(|| ReturnValue::new(R::default())),
        }
    }

    /// 异步成员，返回 [`AsyncReturn<R>`]，缺省值为已完成的 `Ok(R::default())`。
    pub fn of_async<R: Default + Send + 'static>() -> Self {
        Self {
            shape: TypeShape::of::<AsyncReturn<R>>(),
            default: Arc::new(|| {
                let completed: AsyncReturn<R> =
                    futures::future::ready(Ok::<R, CallError>(R::default())).boxed();
                ReturnValue::new(completed)
            }),
        }
    }

    /// 由调用方提供缺省值构造器，适用于未实现 `Default` 的返回类型。
    pub fn with_default<R, F>(make: F) -> Self
    where
        R: Send + 'static,
        F: Fn() -> R + Send + Sync + 'static,
    {
        Self {
            shape: TypeShape::of::<R>(),
            default: Arc::new(move || ReturnValue::new(make())),
        }
    }

    /// 返回值类型。
    pub fn shape(&self) -> TypeShape {
        self.shape
    }

    /// 构造一份缺省返回值。
    pub fn default_value(&self) -> ReturnValue {
        (self.default)()
    }
}

impl fmt::Debug for ReturnShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ReturnShape").field(&self.shape).finish()
    }
}

struct SignatureInner {
    contract: ContractId,
    member: Cow<'static, str>,
    params: Vec<TypeShape>,
    returns: ReturnShape,
}

/// 契约成员的调用签名。
///
/// # 契约说明（What）
/// - 通过 [`CallSignature::builder`] 构造；构造本身不会失败，合法性在注册重定向时由
///   [`CallSignature::validate`] 检查（空成员名即为误配置）；
/// - 代理后端为每个成员持有一个签名实例，分发时按值相等比较，`Arc` 指针相同时走快速路径。
#[derive(Clone)]
pub struct CallSignature {
    inner: Arc<SignatureInner>,
}

impl CallSignature {
    /// 为契约 `C` 的成员 `member` 开始构造签名。
    pub fn builder<C: ?Sized + 'static>(member: impl Into<Cow<'static, str>>) -> SignatureBuilder {
        SignatureBuilder {
            contract: ContractId::of::<C>(),
            member: member.into(),
            params: Vec::new(),
            returns: None,
        }
    }

    /// 所属契约。
    pub fn contract(&self) -> ContractId {
        self.inner.contract
    }

    /// 成员名。
    pub fn member(&self) -> &str {
        &self.inner.member
    }

    /// 参数类型序列。
    pub fn params(&self) -> &[TypeShape] {
        &self.inner.params
    }

    /// 参数个数。
    pub fn arity(&self) -> usize {
        self.inner.params.len()
    }

    /// 返回值形状。
    pub fn returns(&self) -> &ReturnShape {
        &self.inner.returns
    }

    /// 成员的缺省返回值。
    pub fn default_return(&self) -> ReturnValue {
        self.inner.returns.default_value()
    }

    /// 注册期合法性检查。
    pub fn validate(&self) -> Result<(), DivertError> {
        if self.inner.member.trim().is_empty() {
            return Err(DivertError::EmptyMemberName {
                contract: self.inner.contract.name(),
            });
        }
        Ok(())
    }

    /// 检查参数列表是否符合本签名的参数形状（个数与逐位类型）。
    pub fn check_arguments(&self, args: &CallArguments) -> Result<(), DivertError> {
        let fits = args.len() == self.arity()
            && args
                .shapes()
                .zip(self.params().iter())
                .all(|(actual, declared)| actual == *declared);
        if fits {
            return Ok(());
        }
        Err(DivertError::ArgumentShapeMismatch {
            member: self.member().to_owned(),
            expected: describe(self.params().iter().copied()),
            actual: describe(args.shapes()),
        })
    }
}

fn describe(shapes: impl Iterator<Item = TypeShape>) -> String {
    shapes
        .map(|shape| shape.name())
        .collect::<Vec<_>>()
        .join(", ")
}

impl PartialEq for CallSignature {
    fn eq(&self, other: &Self) -> bool {
        if Arc::ptr_eq(&self.inner, &other.inner) {
            return true;
        }
        self.inner.contract == other.inner.contract
            && self.inner.member == other.inner.member
            && self.inner.params == other.inner.params
            && self.inner.returns.shape == other.inner.returns.shape
    }
}

impl Eq for CallSignature {}

impl Hash for CallSignature {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.inner.contract.hash(state);
        self.inner.member.hash(state);
        self.inner.params.hash(state);
        self.inner.returns.shape.hash(state);
    }
}

impl fmt::Debug for CallSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}::{}({}) -> {}",
            self.inner.contract.name(),
            self.inner.member,
            describe(self.inner.params.iter().copied()),
            self.inner.returns.shape.name()
        )
    }
}

/// [`CallSignature`] 构造器；未声明返回类型时默认为 `()`。
pub struct SignatureBuilder {
    contract: ContractId,
    member: Cow<'static, str>,
    params: Vec<TypeShape>,
    returns: Option<ReturnShape>,
}

impl SignatureBuilder {
    /// 追加一个参数类型。
    pub fn param<T: 'static>(mut self) -> Self {
        self.params.push(TypeShape::of::<T>());
        self
    }

    /// 同步返回类型。
    pub fn returns<R: Default + Send + 'static>(mut self) -> Self {
        self.returns = Some(ReturnShape::of::<R>());
        self
    }

    /// 异步返回类型，成员实际返回 [`AsyncReturn<R>`]。
    pub fn returns_async<R: Default + Send + 'static>(mut self) -> Self {
        self.returns = Some(ReturnShape::of_async::<R>());
        self
    }

    /// 自定义缺省值的返回类型。
    pub fn returns_with<R, F>(mut self, make: F) -> Self
    where
        R: Send + 'static,
        F: Fn() -> R + Send + Sync + 'static,
    {
        self.returns = Some(ReturnShape::with_default(make));
        self
    }

    /// 完成构造。
    pub fn build(self) -> CallSignature {
        CallSignature {
            inner: Arc::new(SignatureInner {
                contract: self.contract,
                member: self.member,
                params: self.params,
                returns: self.returns.unwrap_or_else(ReturnShape::of::<()>),
            }),
        }
    }
}
