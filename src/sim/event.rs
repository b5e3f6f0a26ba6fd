//! 事件与世界
//!
//! 事件是一次性的，执行时拿到仿真器（用于继续调度）和世界（业务状态）。
//! 周期行为由事件在执行时重新调度自身实现。

use std::any::Any;

use super::simulator::Simulator;

/// 可调度的事件。`self: Box<Self>` 让事件在执行时把字段移出来。
pub trait Event: Send + 'static {
    fn execute(self: Box<Self>, sim: &mut Simulator, world: &mut dyn World);
}

/// 仿真世界：由业务层实现，事件通过 `as_any_mut` 向下转型拿到具体类型。
pub trait World: Any {
    fn as_any_mut(&mut self) -> &mut dyn Any;

    /// 每个事件执行完后回调一次
    fn on_tick(&mut self, _sim: &mut Simulator) {}
}

/// 把闭包包装成事件
pub struct FnEvent<F>(pub F);

impl<F> Event for FnEvent<F>
where
    F: FnOnce(&mut Simulator, &mut dyn World) + Send + 'static,
{
    fn execute(self: Box<Self>, sim: &mut Simulator, world: &mut dyn World) {
        (self.0)(sim, world)
    }
}
