//! Follows an estimate stream until shutdown.

use stable_lp_execution::stream::EstimateState;
use std::future::Future;
use tokio::sync::watch;

/// Calls `show` for every settled state that differs from the last one shown.
///
/// Returns when `shutdown` resolves or the stream is dropped. `shutdown` is
/// created once by the caller, so a signal that lands while a state is being
/// shown is still seen on the next turn.
pub async fn follow<T, F>(
    mut states: watch::Receiver<EstimateState<T>>,
    shutdown: F,
    mut show: impl FnMut(&EstimateState<T>),
) where
    T: Clone + PartialEq,
    F: Future,
{
    tokio::pin!(shutdown);
    let mut last: Option<EstimateState<T>> = None;
    loop {
        tokio::select! {
            changed = states.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = states.borrow_and_update().clone();
                if !state.is_settled() || last.as_ref() == Some(&state) {
                    continue;
                }
                show(&state);
                last = Some(state);
            }
            _ = &mut shutdown => break,
        }
    }
}
