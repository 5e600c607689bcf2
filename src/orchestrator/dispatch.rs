//! Fail-open validator dispatch.
//!
//! Every validator call is isolated: an `Err` or a panic becomes a failing
//! [`ValidationResult`] for that dimension and never aborts its siblings.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use futures::FutureExt;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::validation::{RegisteredValidator, ValidationContext, ValidationResult};

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Run one validator, converting crashes into failing results.
pub async fn invoke(entry: &RegisteredValidator, ctx: &ValidationContext) -> ValidationResult {
    let start = Instant::now();
    let outcome = AssertUnwindSafe(entry.validator.validate(ctx)).catch_unwind().await;
    let elapsed = start.elapsed().as_millis() as u64;

    let mut result = match outcome {
        Ok(Ok(result)) => result,
        Ok(Err(e)) => {
            tracing::warn!(dimension = %entry.dimension, tier = %entry.tier, error = %e, "Validator failed");
            ValidationResult::error(&entry.dimension, entry.tier, e)
        }
        Err(payload) => {
            let msg = panic_message(payload.as_ref());
            tracing::warn!(dimension = %entry.dimension, tier = %entry.tier, panic = %msg, "Validator panicked");
            ValidationResult::error(&entry.dimension, entry.tier, format!("validator panicked: {}", msg))
        }
    };

    // the registry decides where a result is filed
    result.dimension = entry.dimension.clone();
    result.tier = entry.tier;
    if result.duration_ms == 0 {
        result.duration_ms = elapsed;
    }
    if result.agent.is_none() {
        result.agent = entry.validator.agent().map(str::to_string);
    }

    tracing::debug!(
        dimension = %entry.dimension,
        tier = %entry.tier,
        passed = result.passed,
        duration_ms = result.duration_ms,
        "Validator finished"
    );
    result
}

/// Run validators one after another, in registration order.
pub async fn run_sequential(entries: &[RegisteredValidator], ctx: &ValidationContext) -> Vec<ValidationResult> {
    let mut results = Vec::with_capacity(entries.len());
    for entry in entries {
        results.push(invoke(entry, ctx).await);
    }
    results
}

/// Run validators on a bounded pool of `min(len, max_workers)` tasks.
///
/// Waits for every task. Results come back in registration order. Without a
/// tokio runtime this falls back to [`run_sequential`].
pub async fn run_parallel(
    entries: &[RegisteredValidator],
    ctx: &ValidationContext,
    max_workers: usize,
) -> Vec<ValidationResult> {
    if entries.len() < 2 {
        return run_sequential(entries, ctx).await;
    }
    if tokio::runtime::Handle::try_current().is_err() {
        log::warn!("No tokio runtime available, running {} validators sequentially", entries.len());
        return run_sequential(entries, ctx).await;
    }

    let workers = max_workers.clamp(1, entries.len());
    let semaphore = Arc::new(Semaphore::new(workers));
    let ctx = Arc::new(ctx.clone());
    let mut join_set = JoinSet::new();

    for (idx, entry) in entries.iter().cloned().enumerate() {
        let semaphore = Arc::clone(&semaphore);
        let ctx = Arc::clone(&ctx);
        join_set.spawn(async move {
            let _permit = semaphore.acquire_owned().await.ok();
            (idx, invoke(&entry, &ctx).await)
        });
    }

    let mut slots: Vec<Option<ValidationResult>> = vec![None; entries.len()];
    while let Some(joined) = join_set.join_next().await {
        match joined {
            Ok((idx, result)) => slots[idx] = Some(result),
            Err(e) => log::warn!("Validator task failed to join: {}", e),
        }
    }

    entries
        .iter()
        .zip(slots)
        .map(|(entry, slot)| {
            slot.unwrap_or_else(|| ValidationResult::error(&entry.dimension, entry.tier, "validator task did not complete"))
        })
        .collect()
}
