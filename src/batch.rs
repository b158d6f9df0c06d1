//! Bounded-concurrency batches of single-key operations.
//!
//! At most `concurrency_limit` exchanges are in flight for one batch; the
//! next operation starts as soon as a slot frees. Results are reported in
//! input order. After the first failure no further operations start, the
//! ones already started run to completion, and the batch resolves with that
//! first error.

use std::future::Future;

use futures::stream::{FuturesUnordered, StreamExt};
use tracing::{debug, warn};

use crate::client::Client;
use crate::error::{Error, Result};
use crate::types::{ObjectResponse, PutRequest};

impl Client {
    async fn run_batch<I, T, F, Fut>(&self, items: Vec<I>, op: F) -> Result<Vec<T>>
    where
        F: Fn(I) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let total = items.len();
        let limit = self.config().concurrency_limit.max(1);
        debug!(total, limit, "starting riak batch");

        let dispatch = |(position, item): (usize, I)| {
            let pending = op(item);
            async move { (position, pending.await) }
        };

        let mut queued = items.into_iter().enumerate();
        let mut in_flight: FuturesUnordered<_> = queued.by_ref().take(limit).map(&dispatch).collect();

        let mut slots: Vec<Option<T>> = (0..total).map(|_| None).collect();
        let mut first_error: Option<Error> = None;

        while let Some((position, result)) = in_flight.next().await {
            match result {
                Ok(value) => slots[position] = Some(value),
                Err(e) => {
                    warn!(position, error = %e, "riak batch operation failed");
                    first_error.get_or_insert(e);
                }
            }

            if first_error.is_none() {
                if let Some(next) = queued.next() {
                    in_flight.push(dispatch(next));
                }
            }
        }

        if let Some(e) = first_error {
            return Err(e);
        }

        // Every position completed exactly once
        Ok(slots.into_iter().flatten().collect())
    }

    /// Fetch every key, at most `concurrency_limit` at a time.
    ///
    /// # Example
    /// ```rust,no_run
    /// # use riak_http::Client;
    /// # #[tokio::main]
    /// # async fn main() -> Result<(), riak_http::Error> {
    /// # let client = Client::new("users")?;
    /// let results = client.batch_get(&["alice", "bob"]).await?;
    /// for (key, result) in ["alice", "bob"].iter().zip(&results) {
    ///     println!("{}: empty={}", key, result.value.is_empty());
    /// }
    /// # Ok(())
    /// # }
    /// ```
    pub async fn batch_get<K: AsRef<str>>(&self, keys: &[K]) -> Result<Vec<ObjectResponse>> {
        let keys: Vec<&str> = keys.iter().map(AsRef::as_ref).collect();
        self.run_batch(keys, |key| self.get(key)).await
    }

    /// Store every request, at most `concurrency_limit` at a time.
    pub async fn batch_put(&self, requests: Vec<PutRequest>) -> Result<Vec<ObjectResponse>> {
        self.run_batch(requests, move |request| async move {
            self.put(&request.key, request.body, request.headers).await
        })
        .await
    }

    /// Delete every key, at most `concurrency_limit` at a time.
    pub async fn batch_delete<K: AsRef<str>>(&self, keys: &[K]) -> Result<()> {
        let keys: Vec<&str> = keys.iter().map(AsRef::as_ref).collect();
        self.run_batch(keys, |key| self.delete(key)).await.map(|_| ())
    }
}
