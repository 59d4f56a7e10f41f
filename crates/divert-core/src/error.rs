//! # error 模块说明
//!
//! ## 角色定位（Why）
//! - 为引擎对外暴露的“配置期误用”提供唯一的错误域 [`DivertError`]，保证误配置在注册点即时失败；
//! - 调用期失败（Handler 或根目标抛出的错误）不属于本错误域，而是以 [`CallError`] 原样透传。
//!
//! ## 设计要求（What）
//! - `DivertError` 派生 `thiserror::Error`，每个变体都映射到稳定错误码 `divert.*`；
//! - `CallError` 只是承载体：引擎从不包装、吞掉或重试调用期错误，调用方可用 `downcast_ref` 取回原始类型。
//!
//! ## 风险提示（Trade-offs）
//! - `StrictViolation` 是唯一可能在调用期出现的 `DivertError`，且仅在显式开启严格模式时出现。

use thiserror::Error;

use crate::{call::ReturnValue, redirect::RedirectId};

/// 调用期失败的承载类型。
///
/// 与 Handler/根目标返回的错误一一对应，引擎只负责搬运。
pub type CallError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// 一次分发（或一次 `next()`/`original()` 转发）的结果。
pub type CallResult = Result<ReturnValue, CallError>;

/// 重定向引擎的配置错误域。
///
/// # 教案式说明
/// - **意图 (Why)**：把注册期可检测的误用集中为一个可匹配的枚举，方便测试代码断言具体原因；
/// - **契约 (What)**：
///   - 所有变体均为 `Clone + Send + Sync + 'static`，可安全跨线程传播；
///   - [`DivertError::code`] 返回稳定错误码，遵循 `divert.<阶段>.<语义>` 命名；
/// - **风险 (Trade-offs)**：成员名以 `String` 保存，牺牲少量分配换取可读诊断。
#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum DivertError {
    /// 调用签名未提供成员名称。
    #[error("call signature on contract `{contract}` has an empty member name")]
    EmptyMemberName { contract: &'static str },

    /// 参数约束引用了签名之外的位置。
    #[error("argument index {index} is out of range for `{member}` (arity {arity})")]
    ArgumentIndexOutOfRange {
        member: String,
        index: usize,
        arity: usize,
    },

    /// 参数约束期望的类型与签名声明的参数类型不一致。
    #[error("argument {index} of `{member}` is declared as `{declared}`, constraint expects `{expected}`")]
    ArgumentTypeMismatch {
        member: String,
        index: usize,
        expected: &'static str,
        declared: &'static str,
    },

    /// 类型化 Handler 或类型化读取与签名返回类型不一致。
    #[error("`{member}` returns `{declared}`, caller expects `{expected}`")]
    ReturnTypeMismatch {
        member: String,
        expected: &'static str,
        declared: &'static str,
    },

    /// 签名所属契约与 Via 服务的契约不同。
    #[error("signature belongs to contract `{actual}`, via serves `{expected}`")]
    ContractMismatch {
        expected: &'static str,
        actual: &'static str,
    },

    /// 契约没有注册代理工厂，无法生成代理。
    #[error("contract `{contract}` has no registered proxy factory")]
    NotProxyable { contract: &'static str },

    /// 实例并非由当前 `ViaSet` 生成的代理。
    #[error("instance is not a `{contract}` proxy produced by this via set")]
    NotAProxy { contract: &'static str },

    /// 改写后的参数列表与签名形状不符。
    #[error("`{member}` expects arguments ({expected}), got ({actual})")]
    ArgumentShapeMismatch {
        member: String,
        expected: String,
        actual: String,
    },

    /// 兜底约束没有返回类型可供对照，不能安装类型化 Handler。
    #[error("catch-all redirect cannot be typed as `{expected}`; install an untyped handler instead")]
    UntypedCatchAll { expected: &'static str },

    /// 试图移除未安装（或已移除）的重定向。
    #[error("{id} is not installed")]
    RedirectNotFound { id: RedirectId },

    /// 配置文本无法解析为 `ViaOptions`。
    #[error("invalid via options: {detail}")]
    InvalidOptions { detail: String },

    /// 严格模式下调用既无匹配重定向也无根目标。
    #[error("strict via `{contract}` has no redirect or root target for `{member}`")]
    StrictViolation {
        contract: &'static str,
        member: String,
    },
}

impl DivertError {
    /// 返回稳定错误码，供日志聚合与测试断言使用。
    pub fn code(&self) -> &'static str {
        match self {
            DivertError::EmptyMemberName { .. } => "divert.config.empty_member",
            DivertError::ArgumentIndexOutOfRange { .. } => "divert.config.argument_index",
            DivertError::ArgumentTypeMismatch { .. } => "divert.config.argument_type",
            DivertError::ReturnTypeMismatch { .. } => "divert.config.return_type",
            DivertError::ContractMismatch { .. } => "divert.config.contract_mismatch",
            DivertError::NotProxyable { .. } => "divert.config.not_proxyable",
            DivertError::NotAProxy { .. } => "divert.config.not_a_proxy",
            DivertError::ArgumentShapeMismatch { .. } => "divert.config.argument_shape",
            DivertError::UntypedCatchAll { .. } => "divert.config.untyped_catch_all",
            DivertError::RedirectNotFound { .. } => "divert.config.redirect_missing",
            DivertError::InvalidOptions { .. } => "divert.config.options",
            DivertError::StrictViolation { .. } => "divert.call.strict",
        }
    }

    /// 是否为调用期错误（目前仅严格模式违例）。
    pub fn is_call_time(&self) -> bool {
        matches!(self, DivertError::StrictViolation { .. })
    }
}
