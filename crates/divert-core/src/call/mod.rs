//! 调用模型：签名、实参与返回值。
//!
//! # 模块定位（Why）
//! - 代理后端把每次成员调用折叠为一个 [`Call`]，分发器只认识这里定义的类型；
//! - 类型擦除集中在本模块，其余模块只通过类型化视图读写参数与返回值。
//!
//! # 结构概览（What）
//! - [`signature`]：成员身份、参数/返回形状与缺省值；
//! - [`arguments`]：共享只读的实参列表与元组转换；
//! - [`value`]：类型擦除的返回值与异步返回类型别名。

pub mod arguments;
pub mod signature;
pub mod value;

pub use arguments::{Argument, ArgumentTuple, CallArguments};
pub use signature::{CallSignature, ReturnShape, SignatureBuilder, TypeShape};
pub use value::{AsyncReturn, ReturnValue};

/// 代理交给引擎的一次成员调用。
///
/// 克隆只复制两个 `Arc`，可以随 Relay 跨线程、跨挂起点传递。
#[derive(Clone, Debug)]
pub struct Call {
    signature: CallSignature,
    args: CallArguments,
}

impl Call {
    /// 由签名与实参构造调用。
    pub fn new(signature: CallSignature, args: CallArguments) -> Self {
        Self { signature, args }
    }

    /// 由签名与实参元组构造调用。
    pub fn with_args<A: ArgumentTuple>(signature: CallSignature, args: A) -> Self {
        Self::new(signature, args.into_arguments())
    }

    /// 调用签名。
    pub fn signature(&self) -> &CallSignature {
        &self.signature
    }

    /// 成员名。
    pub fn member(&self) -> &str {
        self.signature.member()
    }

    /// 实参。
    pub fn args(&self) -> &CallArguments {
        &self.args
    }

    /// 同一签名、替换实参后的新调用。
    pub(crate) fn with_arguments(&self, args: CallArguments) -> Self {
        Self {
            signature: self.signature.clone(),
            args,
        }
    }
}
