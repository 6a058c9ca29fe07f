//! Shared load/save of JSON ledger objects

use crate::error::{CoreError, Result};
use crate::store::{ObjectStore, PutObject};
use serde::Serialize;
use serde::de::DeserializeOwned;

pub const LEDGER_FORMAT_VERSION: &str = "1.0";

/// Reads a ledger object. An absent object is `Ok(None)`, a malformed one is an error.
pub(crate) async fn load<T: DeserializeOwned>(
    store: &dyn ObjectStore,
    bucket: &str,
    key: &str,
) -> Result<Option<T>> {
    let Some(object) = store.get_object(bucket, key, None).await? else {
        tracing::debug!("Ledger s3://{}/{} not found", bucket, key);
        return Ok(None);
    };

    let ledger = serde_json::from_slice(&object.content).map_err(|e| {
        CoreError::Storage(format!("malformed ledger s3://{}/{}: {}", bucket, key, e))
    })?;
    Ok(Some(ledger))
}

pub(crate) async fn save<T: Serialize>(
    store: &dyn ObjectStore,
    bucket: &str,
    key: &str,
    ledger: &T,
) -> Result<()> {
    let content = serde_json::to_vec_pretty(ledger)?;
    let size = content.len();
    store
        .put_object(
            PutObject::new(bucket, key, content).with_content_type("application/json"),
        )
        .await?;
    tracing::debug!("Saved ledger s3://{}/{} ({} bytes)", bucket, key, size);
    Ok(())
}

/// Rejects ledgers written by a newer format than this build understands.
pub(crate) fn check_format_version(found: &str, key: &str) -> Result<()> {
    let parse = |v: &str| -> Option<(u32, u32)> {
        let (major, minor) = v.split_once('.').unwrap_or((v, "0"));
        Some((major.parse().ok()?, minor.parse().ok()?))
    };

    let supported = parse(LEDGER_FORMAT_VERSION).unwrap_or((1, 0));
    match parse(found) {
        Some(version) if version <= supported => Ok(()),
        Some(_) => Err(CoreError::Storage(format!(
            "ledger {} has format version {}, newer than supported version {}",
            key, found, LEDGER_FORMAT_VERSION
        ))),
        None => Err(CoreError::Storage(format!(
            "ledger {} has invalid format version '{}'",
            key, found
        ))),
    }
}
