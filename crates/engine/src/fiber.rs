//! Fiber transition function.

use chainterm_types::{FiberState, FiberTransition};

/// Applies a transition requested by a successful command to the current
/// fiber state. Pure; the only caller is the context update.
///
/// There is no direct fiber-to-fiber hop: entry tokens are not resolvable
/// inside a fiber, so an `Enter` arriving while one is active is ignored
/// rather than honored.
pub fn apply_transition(state: &FiberState, transition: &FiberTransition) -> FiberState {
    match (state, transition) {
        (FiberState::Global, FiberTransition::Enter(protocol)) => FiberState::Fiber(protocol.clone()),
        (FiberState::Fiber(current), FiberTransition::Enter(_)) => FiberState::Fiber(current.clone()),
        (_, FiberTransition::Exit) => FiberState::Global,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enter_moves_global_into_the_fiber() {
        let next = apply_transition(&FiberState::Global, &FiberTransition::Enter("1inch".into()));
        assert_eq!(next, FiberState::Fiber("1inch".into()));
    }

    #[test]
    fn exit_returns_to_global_from_anywhere() {
        assert_eq!(
            apply_transition(&FiberState::Fiber("1inch".into()), &FiberTransition::Exit),
            FiberState::Global
        );
        assert_eq!(apply_transition(&FiberState::Global, &FiberTransition::Exit), FiberState::Global);
    }

    #[test]
    fn no_direct_fiber_to_fiber_hop() {
        let next = apply_transition(&FiberState::Fiber("1inch".into()), &FiberTransition::Enter("uniswap-v4".into()));
        assert_eq!(next, FiberState::Fiber("1inch".into()));
    }
}
