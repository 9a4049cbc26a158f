//! Run a batch of keyed futures to completion and split them by outcome

use std::future::Future;

use futures::future::join_all;

/// Outcomes of a settled batch, each side in input order
#[derive(Debug)]
pub struct Settled<K, T, E> {
    pub ok: Vec<(K, T)>,
    pub err: Vec<(K, E)>,
}

/// Await every future; one failure never cancels the others
pub async fn settle_all<K, T, E, F>(tasks: impl IntoIterator<Item = (K, F)>) -> Settled<K, T, E>
where
    F: Future<Output = Result<T, E>>,
{
    let (keys, futures): (Vec<K>, Vec<F>) = tasks.into_iter().unzip();
    let outcomes = join_all(futures).await;

    let mut settled = Settled {
        ok: Vec::new(),
        err: Vec::new(),
    };
    for (key, outcome) in keys.into_iter().zip(outcomes) {
        match outcome {
            Ok(value) => settled.ok.push((key, value)),
            Err(e) => settled.err.push((key, e)),
        }
    }
    settled
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::time::sleep;

    #[tokio::test]
    async fn settle_all_partitions_and_keeps_order() {
        let tasks = [("a", 30u64, true), ("b", 0, false), ("c", 10, true), ("d", 5, false)]
            .into_iter()
            .map(|(key, delay, succeed)| {
                (key, async move {
                    sleep(Duration::from_millis(delay)).await;
                    if succeed { Ok(delay) } else { Err(format!("{key} failed")) }
                })
            });

        let settled = settle_all(tasks).await;

        assert_eq!(settled.ok, vec![("a", 30), ("c", 10)]);
        assert_eq!(
            settled.err,
            vec![("b", "b failed".to_string()), ("d", "d failed".to_string())]
        );
    }

    #[tokio::test]
    async fn settle_all_handles_empty_batch() {
        let tasks: Vec<(&str, futures::future::Ready<Result<(), ()>>)> = Vec::new();

        let settled = settle_all(tasks).await;

        assert!(settled.ok.is_empty());
        assert!(settled.err.is_empty());
    }
}
