//! 分发器：为一次调用构建候选流水线并启动 Relay 链。
//!
//! # 逻辑解析（How）
//! 1. 按快照中“最新在前”的顺序过滤出接受本次签名与实参的重定向；
//! 2. 没有候选者时直接调用根目标（缺席则返回缺省值）；
//! 3. 否则以游标 0 的 Relay 调用第一个候选者，其返回值或错误即分发结果。
//!
//! # 契约说明（What）
//! - 过滤发生在快照之上，同一次调用的视图不受并发变更影响；
//! - 分发器自身不阻塞、不持锁、不重试。

use alloc::sync::Arc;

use tracing::trace;

use crate::{
    call::Call,
    error::CallResult,
    redirect::Redirect,
    relay::Relay,
    stack::StackSnapshot,
};

/// 过滤出匹配调用的重定向，保持“最新在前”的顺序。
pub fn pipeline_for(call: &Call, snapshot: &StackSnapshot) -> Arc<[Arc<Redirect>]> {
    snapshot
        .redirects()
        .iter()
        .filter(|redirect| redirect.matches(call))
        .cloned()
        .collect()
}

/// 基于给定快照分发一次调用。
pub fn dispatch(call: Call, snapshot: &StackSnapshot) -> CallResult {
    let pipeline = pipeline_for(&call, snapshot);
    trace!(
        contract = call.signature().contract().name(),
        member = call.member(),
        candidates = pipeline.len(),
        version = snapshot.version(),
        "dispatching call"
    );
    if pipeline.is_empty() {
        return snapshot.root().invoke(&call, snapshot.is_strict());
    }
    Relay::start(
        pipeline,
        snapshot.root().clone(),
        snapshot.is_strict(),
        snapshot.version(),
        call,
    )
    .run()
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::{
        call::{ArgumentTuple, CallSignature, ReturnValue},
        contract::ContractId,
        matcher::CallConstraint,
        options::ViaOptions,
        redirect::handler_fn,
        stack::RedirectStack,
        target::RootTarget,
    };

    trait Counter {}

    fn bump() -> CallSignature {
        CallSignature::builder::<dyn Counter>("bump")
            .param::<u32>()
            .returns::<u32>()
            .build()
    }

    fn recording_stack(log: &Arc<Mutex<Vec<&'static str>>>) -> RedirectStack {
        let root_log = Arc::clone(log);
        RedirectStack::new(
            ContractId::of::<dyn Counter>(),
            RootTarget::from_fn(move |call| {
                root_log.lock().expect("log").push("root");
                Ok(ReturnValue::new(*call.args().get::<u32>(0).expect("u32")))
            }),
            ViaOptions::default(),
        )
    }

    fn layer(
        stack: &RedirectStack,
        log: &Arc<Mutex<Vec<&'static str>>>,
        name: &'static str,
        original: bool,
    ) {
        let log = Arc::clone(log);
        stack
            .insert_redirect(
                CallConstraint::new(bump()),
                Arc::new(handler_fn(move |relay| {
                    log.lock().expect("log").push(name);
                    if original {
                        relay.original()
                    } else {
                        relay.next()
                    }
                })),
            )
            .expect("注册成功");
    }

    #[test]
    fn most_recent_redirect_runs_first_and_chains_to_root() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let stack = recording_stack(&log);
        layer(&stack, &log, "r1", false);
        layer(&stack, &log, "r2", false);

        let value = dispatch(Call::with_args(bump(), (3_u32,)), &stack.snapshot())
            .expect("分发成功");
        assert_eq!(value.downcast::<u32>().expect("u32"), 3);
        assert_eq!(*log.lock().expect("log"), ["r2", "r1", "root"]);
    }

    #[test]
    fn original_skips_remaining_candidates() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let stack = recording_stack(&log);
        layer(&stack, &log, "r1", false);
        layer(&stack, &log, "r2", true);

        dispatch(Call::with_args(bump(), (1_u32,)), &stack.snapshot()).expect("分发成功");
        assert_eq!(*log.lock().expect("log"), ["r2", "root"]);
    }

    #[test]
    fn next_may_be_called_more_than_once() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let stack = recording_stack(&log);
        layer(&stack, &log, "r1", false);
        stack
            .insert_redirect(
                CallConstraint::new(bump()),
                Arc::new(handler_fn(|relay| {
                    let first = relay.next_as::<u32>()?;
                    let second = relay.next_as::<u32>()?;
                    Ok(ReturnValue::new(first + second))
                })),
            )
            .expect("注册成功");

        let value = dispatch(Call::with_args(bump(), (4_u32,)), &stack.snapshot())
            .expect("分发成功");
        assert_eq!(value.downcast::<u32>().expect("u32"), 8);
        assert_eq!(*log.lock().expect("log"), ["r1", "root", "r1", "root"]);
    }

    #[test]
    fn unmatched_calls_go_straight_to_root() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let stack = recording_stack(&log);
        stack
            .insert_redirect(
                CallConstraint::new(bump()).arg_eq(0, 9_u32),
                Arc::new(handler_fn(|_| Ok(ReturnValue::new(0_u32)))),
            )
            .expect("注册成功");

        let call = Call::with_args(bump(), (2_u32,));
        assert!(pipeline_for(&call, &stack.snapshot()).is_empty());
        let value = dispatch(call, &stack.snapshot()).expect("分发成功");
        assert_eq!(value.downcast::<u32>().expect("u32"), 2);
        assert_eq!(*log.lock().expect("log"), ["root"]);
    }

    #[test]
    fn rewritten_arguments_reach_the_root() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let stack = recording_stack(&log);
        stack
            .insert_redirect(
                CallConstraint::new(bump()),
                Arc::new(handler_fn(|relay| {
                    let (n,) = relay.typed_args::<(u32,)>().ok_or("missing argument")?;
                    relay.next_with((n * 10,).into_arguments())
                })),
            )
            .expect("注册成功");

        let value = dispatch(Call::with_args(bump(), (5_u32,)), &stack.snapshot())
            .expect("分发成功");
        assert_eq!(value.downcast::<u32>().expect("u32"), 50);
    }

    #[test]
    fn mismatched_rewrite_is_reported_through_the_call() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let stack = recording_stack(&log);
        stack
            .insert_redirect(
                CallConstraint::new(bump()),
                Arc::new(handler_fn(|relay| relay.original_with(("ten",).into_arguments()))),
            )
            .expect("注册成功");

        let err = dispatch(Call::with_args(bump(), (5_u32,)), &stack.snapshot())
            .expect_err("参数形状不符");
        assert_eq!(
            err.downcast_ref::<crate::error::DivertError>()
                .map(crate::error::DivertError::code),
            Some("divert.config.argument_shape")
        );
        assert!(log.lock().expect("log").is_empty());
    }
}
