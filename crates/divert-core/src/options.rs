//! Via 配置项。
//!
//! # 教案式说明
//! - **意图（Why）**：测试工程常把替身行为写进配置文件，集中声明“哪些契约必须严格配置”；
//! - **逻辑（How）**：`serde` 反序列化，缺省字段取 `Default`，TOML 文本可直接加载；
//! - **契约（What）**：配置在 `RedirectStack` 构造时固化，运行期不可变。

use serde::{Deserialize, Serialize};

use crate::error::DivertError;

/// 单个 Via（重定向栈）的行为开关。
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViaOptions {
    /// 开启后，落到缺席根目标的调用返回 `StrictViolation` 错误而非缺省值。
    pub strict: bool,
    /// 日志中使用的可读名称。
    pub label: Option<String>,
}

impl ViaOptions {
    /// 严格模式配置。
    pub fn strict() -> Self {
        Self {
            strict: true,
            ..Self::default()
        }
    }

    /// 附加日志名称。
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// 从 TOML 文本加载。
    pub fn from_toml_str(text: &str) -> Result<Self, DivertError> {
        toml::from_str(text).map_err(|err| DivertError::InvalidOptions {
            detail: err.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toml_fields_default_when_missing() {
        let options = ViaOptions::from_toml_str("strict = true").expect("合法配置");
        assert_eq!(options, ViaOptions::strict());

        let labelled = ViaOptions::from_toml_str("label = \"billing\"").expect("合法配置");
        assert!(!labelled.strict);
        assert_eq!(labelled.label.as_deref(), Some("billing"));
    }

    #[test]
    fn malformed_toml_is_a_configuration_error() {
        let err = ViaOptions::from_toml_str("strict = \"yes\"").expect_err("类型错误");
        assert_eq!(err.code(), "divert.config.options");
    }
}
