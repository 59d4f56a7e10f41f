use alloc::{boxed::Box, collections::BTreeMap, sync::Arc};
use core::any::{Any, TypeId};

use parking_lot::Mutex;

type Slots = BTreeMap<TypeId, Box<dyn Any + Send + Sync>>;

/// 调用链私有的状态袋，以类型为键。
///
/// # 教案式说明
/// - **意图（Why）**：同一逻辑拦截由多个协作重定向组成时，需要在链路内部传递信息，
///   又不能借助任何全局或线程局部存储；
/// - **逻辑（How）**：分发时创建一份空袋，随 Relay 克隆共享；嵌套的代理调用会得到全新的袋；
/// - **契约（What）**：每种类型至多一个值；锁只在单个方法内部持有，不会跨越挂起点；
/// - **风险（Trade-offs）**：[`RelayState::update`] 的闭包内不可再访问同一个状态袋，否则会死锁。
#[derive(Clone, Default)]
pub struct RelayState {
    slots: Arc<Mutex<Slots>>,
}

impl RelayState {
    /// 空状态袋。
    pub fn new() -> Self {
        Self::default()
    }

    /// 写入值，返回同类型的旧值。
    pub fn insert<T: Send + Sync + 'static>(&self, value: T) -> Option<T> {
        self.slots
            .lock()
            .insert(TypeId::of::<T>(), Box::new(value))
            .and_then(|previous| previous.downcast::<T>().ok())
            .map(|previous| *previous)
    }

    /// 克隆读取。
    pub fn get<T: Clone + Send + Sync + 'static>(&self) -> Option<T> {
        self.slots
            .lock()
            .get(&TypeId::of::<T>())
            .and_then(|slot| slot.downcast_ref::<T>())
            .cloned()
    }

    /// 原地修改已有值。
    pub fn update<T, R>(&self, f: impl FnOnce(&mut T) -> R) -> Option<R>
    where
        T: Send + Sync + 'static,
    {
        let mut slots = self.slots.lock();
        slots
            .get_mut(&TypeId::of::<T>())
            .and_then(|slot| slot.downcast_mut::<T>())
            .map(f)
    }

    /// 取出值。
    pub fn remove<T: Send + Sync + 'static>(&self) -> Option<T> {
        self.slots
            .lock()
            .remove(&TypeId::of::<T>())
            .and_then(|previous| previous.downcast::<T>().ok())
            .map(|previous| *previous)
    }

    /// 是否存在 `T`。
    pub fn contains<T: 'static>(&self) -> bool {
        self.slots.lock().contains_key(&TypeId::of::<T>())
    }

    /// 条目数量。
    pub fn len(&self) -> usize {
        self.slots.lock().len()
    }

    /// 是否为空。
    pub fn is_empty(&self) -> bool {
        self.slots.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Debug, PartialEq)]
    struct Hops(u32);

    #[test]
    fn typed_slots() {
        let state = RelayState::new();
        assert!(state.is_empty());
        assert_eq!(state.insert(Hops(1)), None);
        assert_eq!(state.insert(Hops(2)), Some(Hops(1)));
        assert_eq!(state.update::<Hops, _>(|hops| { hops.0 += 1; hops.0 }), Some(3));
        assert_eq!(state.get::<Hops>(), Some(Hops(3)));
        assert!(state.contains::<Hops>());
        assert_eq!(state.update::<String, _>(|_| ()), None);
        assert_eq!(state.remove::<Hops>(), Some(Hops(3)));
        assert_eq!(state.len(), 0);
    }

    #[test]
    fn distinct_types_use_distinct_slots() {
        let state = RelayState::new();
        state.insert(1_u8);
        state.insert(2_u16);
        state.insert(Hops(3));
        assert_eq!(state.len(), 3);
        assert_eq!(state.get::<u8>(), Some(1));
        assert_eq!(state.get::<u16>(), Some(2));
        assert_eq!(state.remove::<u16>(), Some(2));
        assert_eq!(state.get::<Hops>(), Some(Hops(3)));
        assert!(!state.contains::<u16>());
    }

    #[test]
    fn clones_share_slots() {
        let state = RelayState::new();
        let shared = state.clone();
        shared.insert(7_u8);
        assert_eq!(state.get::<u8>(), Some(7));
    }
}
