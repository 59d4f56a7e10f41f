use core::{
    any::{Any, type_name},
    fmt,
};

use futures::future::BoxFuture;

use crate::{error::CallError, error::DivertError};

use super::signature::TypeShape;

/// 异步成员的返回类型：一个已装箱、可跨线程移动的 Future。
///
/// 代理把它当作普通返回值搬运；挂起与恢复全部发生在 Handler 自己的 Future 内部。
pub type AsyncReturn<R> = BoxFuture<'static, Result<R, CallError>>;

/// 类型擦除后的成员返回值。
///
/// # 教案式说明
/// - **意图（Why）**：分发路径对所有成员统一处理，返回值在引擎内部以 `dyn Any` 形态流转；
/// - **逻辑（How）**：构造时记录 [`TypeShape`]，以便类型不符时给出可读诊断；
/// - **契约（What）**：取值使用 [`ReturnValue::downcast`] 或 [`ReturnValue::into_typed`]，
///   前者失败时把自身原样还给调用方。
pub struct ReturnValue {
    value: Box<dyn Any + Send>,
    shape: TypeShape,
}

impl ReturnValue {
    /// 包装一个具体返回值。
    pub fn new<T: Send + 'static>(value: T) -> Self {
        Self {
            value: Box::new(value),
            shape: TypeShape::of::<T>(),
        }
    }

    /// `()` 返回值。
    pub fn unit() -> Self {
        Self::new(())
    }

    /// 值的实际类型。
    pub fn shape(&self) -> TypeShape {
        self.shape
    }

    /// 判断值是否为 `T`。
    pub fn is<T: 'static>(&self) -> bool {
        self.value.is::<T>()
    }

    /// 以共享引用读取值。
    pub fn downcast_ref<T: 'static>(&self) -> Option<&T> {
        self.value.downcast_ref::<T>()
    }

    /// 取出值；类型不符时返回原值。
    pub fn downcast<T: 'static>(self) -> Result<T, ReturnValue> {
        let shape = self.shape;
        match self.value.downcast::<T>() {
            Ok(value) => Ok(*value),
            Err(value) => Err(ReturnValue { value, shape }),
        }
    }

    /// 取出值；类型不符时给出 [`DivertError::ReturnTypeMismatch`]。
    pub fn into_typed<T: 'static>(self, member: &str) -> Result<T, DivertError> {
        self.downcast::<T>()
            .map_err(|value| DivertError::ReturnTypeMismatch {
                member: member.to_owned(),
                expected: type_name::<T>(),
                declared: value.shape.name(),
            })
    }
}

impl fmt::Debug for ReturnValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ReturnValue({})", self.shape.name())
    }
}
