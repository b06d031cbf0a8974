//! Optimistic list updates with a rollback snapshot.

use std::future::Future;

use log::warn;

/// Request failed; the state was put back to `snapshot`.
#[derive(Debug)]
pub struct Rollback<T, E> {
    pub error: E,
    pub snapshot: T,
}

/// Applies `mutate` to `state` right away, then awaits `request`. When the request fails the
/// pre-update snapshot is restored and returned alongside the error.
pub async fn optimistic_update<T, R, E, M, Fut>(
    state: &mut T,
    mutate: M,
    request: Fut,
) -> Result<R, Rollback<T, E>>
where
    T: Clone,
    M: FnOnce(&mut T),
    Fut: Future<Output = Result<R, E>>,
    E: std::fmt::Display,
{
    let snapshot = state.clone();
    mutate(state);

    match request.await {
        Ok(value) => Ok(value),
        Err(error) => {
            warn!("Optimistic update rolled back: {error}");
            *state = snapshot.clone();
            Err(Rollback { error, snapshot })
        }
    }
}

/// Removes the element with `id` from `items` before the backend confirms the delete.
pub async fn optimistic_remove<T, E, F, Fut>(
    items: &mut Vec<T>,
    id: &str,
    id_of: F,
    request: Fut,
) -> Result<(), Rollback<Vec<T>, E>>
where
    T: Clone,
    F: Fn(&T) -> &str,
    Fut: Future<Output = Result<(), E>>,
    E: std::fmt::Display,
{
    optimistic_update(items, |items| items.retain(|item| id_of(item) != id), request).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn success_keeps_tentative_state() {
        let mut items = vec!["a".to_string(), "b".to_string()];
        let result: Result<(), Rollback<_, String>> =
            optimistic_remove(&mut items, "a", |s| s.as_str(), async { Ok(()) }).await;
        assert!(result.is_ok());
        assert_eq!(items, vec!["b".to_string()]);
    }

    #[tokio::test]
    async fn failure_restores_snapshot() {
        let mut items = vec!["a".to_string(), "b".to_string()];
        let result = optimistic_remove(&mut items, "b", |s| s.as_str(), async {
            Err::<(), _>("network down".to_string())
        })
        .await;
        let rollback = result.unwrap_err();
        assert_eq!(rollback.error, "network down");
        assert_eq!(items, vec!["a".to_string(), "b".to_string()]);
        assert_eq!(rollback.snapshot, items);
    }

    #[tokio::test]
    async fn generic_update_rolls_back_counter() {
        let mut counter = 10;
        let result = optimistic_update(&mut counter, |c| *c += 5, async {
            Err::<(), _>("rejected")
        })
        .await;
        assert!(result.is_err());
        assert_eq!(counter, 10);
    }
}
