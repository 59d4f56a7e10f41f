//! 调用约束：签名加参数谓词。
//!
//! # 设计背景（Why）
//! - 选择器表达式解析不在本 crate 范围内，它最终产出的只是 “(成员身份, 参数谓词)” 二元组；
//!   [`CallConstraint`] 就是这个二元组，同时也是一个足够好用的手写构造器；
//! - 误配置必须在注册时暴露，所以位置型约束会记录“期望类型”，由 [`CallConstraint::validate`]
//!   对照签名检查下标与类型。
//!
//! # 契约说明（What）
//! - 无签名的约束是兜底约束（catch-all），对任意调用只执行谓词；
//! - 谓词之间为“与”关系，按添加顺序短路求值；
//! - 匹配过程纯函数化，不持有锁，可被任意线程并发调用。

use alloc::{sync::Arc, vec::Vec};
use core::fmt;

use crate::{
    call::{Call, CallArguments, CallSignature, TypeShape},
    error::DivertError,
};

/// 参数谓词。
pub type ArgumentPredicate = Arc<dyn Fn(&CallArguments) -> bool + Send + Sync>;

#[derive(Clone)]
struct ArgumentCheck {
    position: Option<(usize, TypeShape)>,
    predicate: ArgumentPredicate,
}

/// 一条重定向的匹配条件。
#[derive(Clone)]
pub struct CallConstraint {
    signature: Option<CallSignature>,
    checks: Vec<ArgumentCheck>,
}

impl CallConstraint {
    /// 只匹配 `signature` 的调用，参数不限。
    pub fn new(signature: CallSignature) -> Self {
        Self {
            signature: Some(signature),
            checks: Vec::new(),
        }
    }

    /// 兜底约束：匹配任意调用。
    pub fn any() -> Self {
        Self {
            signature: None,
            checks: Vec::new(),
        }
    }

    /// 要求第 `index` 个实参等于 `expected`。
    pub fn arg_eq<T>(self, index: usize, expected: T) -> Self
    where
        T: PartialEq + Send + Sync + 'static,
    {
        self.arg_where::<T, _>(index, move |actual| *actual == expected)
    }

    /// 要求第 `index` 个实参满足 `predicate`。
    pub fn arg_where<T, F>(mut self, index: usize, predicate: F) -> Self
    where
        T: 'static,
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        self.checks.push(ArgumentCheck {
            position: Some((index, TypeShape::of::<T>())),
            predicate: Arc::new(move |args: &CallArguments| {
                args.get::<T>(index).is_some_and(&predicate)
            }),
        });
        self
    }

    /// 追加一个作用于整个实参列表的谓词。
    pub fn when<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&CallArguments) -> bool + Send + Sync + 'static,
    {
        self.checks.push(ArgumentCheck {
            position: None,
            predicate: Arc::new(predicate),
        });
        self
    }

    /// 约束的签名；兜底约束返回 `None`。
    pub fn signature(&self) -> Option<&CallSignature> {
        self.signature.as_ref()
    }

    /// 是否为兜底约束。
    pub fn is_catch_all(&self) -> bool {
        self.signature.is_none()
    }

    /// 注册期检查：签名自身合法，且位置型约束的下标、类型与签名一致。
    ///
    /// 兜底约束没有参数形状可供对照，位置型约束在调用期按类型不符视为不匹配。
    pub fn validate(&self) -> Result<(), DivertError> {
        let Some(signature) = &self.signature else {
            return Ok(());
        };
        signature.validate()?;
        for (index, expected) in self.checks.iter().filter_map(|check| check.position) {
            let Some(declared) = signature.params().get(index) else {
                return Err(DivertError::ArgumentIndexOutOfRange {
                    member: signature.member().to_owned(),
                    index,
                    arity: signature.arity(),
                });
            };
            if *declared != expected {
                return Err(DivertError::ArgumentTypeMismatch {
                    member: signature.member().to_owned(),
                    index,
                    expected: expected.name(),
                    declared: declared.name(),
                });
            }
        }
        Ok(())
    }

    /// 判断调用是否满足约束。
    pub fn matches(&self, call: &Call) -> bool {
        if let Some(signature) = &self.signature {
            if signature != call.signature() {
                return false;
            }
        }
        self.checks
            .iter()
            .all(|check| (check.predicate)(call.args()))
    }
}

impl fmt::Debug for CallConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.signature {
            Some(signature) => write!(f, "CallConstraint({signature:?}, {} checks)", self.checks.len()),
            None => write!(f, "CallConstraint(*, {} checks)", self.checks.len()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::call::ArgumentTuple;

    trait Store {}

    fn get() -> CallSignature {
        CallSignature::builder::<dyn Store>("get")
            .param::<String>()
            .param::<u32>()
            .returns::<Option<String>>()
            .build()
    }

    fn call(key: &str, version: u32) -> Call {
        Call::new(get(), (key.to_owned(), version).into_arguments())
    }

    #[test]
    fn signature_and_argument_checks_combine() {
        let constraint = CallConstraint::new(get())
            .arg_eq(0, "alpha".to_owned())
            .arg_where::<u32, _>(1, |version| *version > 1);
        assert!(constraint.validate().is_ok());
        assert!(constraint.matches(&call("alpha", 2)));
        assert!(!constraint.matches(&call("alpha", 1)));
        assert!(!constraint.matches(&call("beta", 2)));

        let other = CallSignature::builder::<dyn Store>("put").build();
        assert!(!constraint.matches(&Call::with_args(other, ())));
    }

    #[test]
    fn catch_all_matches_everything_its_predicates_allow() {
        let everything = CallConstraint::any();
        assert!(everything.is_catch_all());
        assert!(everything.matches(&call("x", 0)));

        let non_empty = CallConstraint::any().when(|args| !args.is_empty());
        let put = CallSignature::builder::<dyn Store>("put").build();
        assert!(!non_empty.matches(&Call::with_args(put, ())));
    }

    #[test]
    fn malformed_constraints_are_rejected() {
        let out_of_range = CallConstraint::new(get()).arg_eq(2, 1_u32);
        assert_eq!(
            out_of_range.validate().expect_err("越界").code(),
            "divert.config.argument_index"
        );

        let wrong_type = CallConstraint::new(get()).arg_eq(1, 1_u64);
        match wrong_type.validate().expect_err("类型不符") {
            DivertError::ArgumentTypeMismatch {
                index,
                expected,
                declared,
                ..
            } => {
                assert_eq!(index, 1);
                assert_eq!(expected, "u64");
                assert_eq!(declared, "u32");
            }
            other => panic!("unexpected error: {other:?}"),
        }

        let unnamed = CallConstraint::new(CallSignature::builder::<dyn Store>("").build());
        assert!(unnamed.validate().is_err());
    }
}
