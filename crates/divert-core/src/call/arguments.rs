use alloc::{sync::Arc, vec::Vec};
use core::{any::Any, fmt};

use super::signature::TypeShape;

/// 单个实参：共享的类型擦除值及其类型形状。
#[derive(Clone)]
pub struct Argument {
    value: Arc<dyn Any + Send + Sync>,
    shape: TypeShape,
}

impl Argument {
    /// 包装实参。
    pub fn new<T: Send + Sync + 'static>(value: T) -> Self {
        Self {
            value: Arc::new(value),
            shape: TypeShape::of::<T>(),
        }
    }

    /// 实参类型。
    pub fn shape(&self) -> TypeShape {
        self.shape
    }

    /// 以 `T` 读取实参。
    pub fn downcast_ref<T: 'static>(&self) -> Option<&T> {
        self.value.downcast_ref::<T>()
    }
}

impl fmt::Debug for Argument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.shape.name())
    }
}

/// 一次调用的有序实参列表。
///
/// # 教案式说明
/// - **意图（Why）**：实参需要在同一调用链的多个 Handler 之间、以及跨异步挂起点共享，
///   因此整体以 `Arc<[Argument]>` 保存，克隆只增加引用计数；
/// - **契约（What）**：
///   - 只读；改写参数请构造新列表并通过 `Relay::next_with` 转发；
///   - [`CallArguments::get`] 提供按位置的类型化视图，类型不符返回 `None`；
///   - [`CallArguments::typed`] 一次性克隆出整个元组，个数或类型不符返回 `None`。
#[derive(Clone, Default)]
pub struct CallArguments {
    values: Arc<[Argument]>,
}

impl CallArguments {
    /// 空参数列表。
    pub fn empty() -> Self {
        Self::default()
    }

    /// 由已包装的实参构造。
    pub fn from_parts(values: Vec<Argument>) -> Self {
        Self {
            values: values.into(),
        }
    }

    /// 参数个数。
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// 是否无参数。
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// 按位置取得未类型化的实参。
    pub fn argument(&self, index: usize) -> Option<&Argument> {
        self.values.get(index)
    }

    /// 按位置以 `T` 读取实参。
    pub fn get<T: 'static>(&self, index: usize) -> Option<&T> {
        self.values.get(index).and_then(Argument::downcast_ref::<T>)
    }

    /// 逐位实参类型。
    pub fn shapes(&self) -> impl Iterator<Item = TypeShape> + '_ {
        self.values.iter().map(Argument::shape)
    }

    /// 克隆出类型化元组。
    pub fn typed<A: ArgumentTuple>(&self) -> Option<A> {
        A::from_arguments(self)
    }
}

impl fmt::Debug for CallArguments {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.values.iter()).finish()
    }
}

/// 元组与 [`CallArguments`] 之间的转换。
///
/// 为 0 到 6 元组实现，元素需 `Clone + Send + Sync + 'static`。
pub trait ArgumentTuple: Sized {
    /// 打包为参数列表。
    fn into_arguments(self) -> CallArguments;

    /// 从参数列表克隆出元组；个数或类型不符时返回 `None`。
    fn from_arguments(args: &CallArguments) -> Option<Self>;

    /// 元组的逐位类型。
    fn shapes() -> Vec<TypeShape>;
}

macro_rules! impl_argument_tuple {
    ($($name:ident : $idx:tt),*) => {
        impl<$($name: Clone + Send + Sync + 'static),*> ArgumentTuple for ($($name,)*) {
            #[allow(unused_variables)]
            fn into_arguments(self) -> CallArguments {
                CallArguments::from_parts(vec![$(Argument::new(self.$idx)),*])
            }

            fn from_arguments(args: &CallArguments) -> Option<Self> {
                if args.len() != Self::shapes().len() {
                    return None;
                }
                Some(($(args.get::<$name>($idx)?.clone(),)*))
            }

            fn shapes() -> Vec<TypeShape> {
                vec![$(TypeShape::of::<$name>()),*]
            }
        }
    };
}

impl_argument_tuple!();
impl_argument_tuple!(A: 0);
impl_argument_tuple!(A: 0, B: 1);
impl_argument_tuple!(A: 0, B: 1, C: 2);
impl_argument_tuple!(A: 0, B: 1, C: 2, D: 3);
impl_argument_tuple!(A: 0, B: 1, C: 2, D: 3, E: 4);
impl_argument_tuple!(A: 0, B: 1, C: 2, D: 3, E: 4, F: 5);
