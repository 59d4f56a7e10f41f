//! 可代理契约的身份标识。

use core::{
    any::{TypeId, type_name},
    fmt,
    hash::{Hash, Hasher},
};

/// `ContractId` 标识一个可被代理的契约（通常是 `dyn Trait`）。
///
/// # 教案式说明
/// - **意图（Why）**：`ViaSet` 以契约为键维护重定向栈，需要一个可哈希、可比较且便于打印的键；
/// - **逻辑（How）**：相等性与哈希只取 `TypeId`，`name` 仅用于诊断输出；
/// - **契约（What）**：`ContractId::of::<dyn Calculator>()` 在进程内稳定，可拷贝。
#[derive(Clone, Copy)]
pub struct ContractId {
    type_id: TypeId,
    name: &'static str,
}

impl ContractId {
    /// 取得类型 `C` 的契约标识。
    pub fn of<C: ?Sized + 'static>() -> Self {
        Self {
            type_id: TypeId::of::<C>(),
            name: type_name::<C>(),
        }
    }

    /// 底层 `TypeId`。
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// 人类可读的类型名。
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl PartialEq for ContractId {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id
    }
}

impl Eq for ContractId {}

impl Hash for ContractId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.type_id.hash(state);
    }
}

impl fmt::Debug for ContractId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContractId({})", self.name)
    }
}

impl fmt::Display for ContractId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}
