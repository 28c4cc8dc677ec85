//! Fee table editor.

use serde_json::{Map, Number, Value};
use tracing::{debug, info};

use super::{AdminPanel, Outcome};
use crate::error::{Error, Result};
use crate::messages::{Message, Task};
use crate::model::{validate_fee, ClassCode};
use crate::store::LICENSE_FEES_PATH;

/// Largest integer a JSON number carries exactly.
const MAX_EXACT_INTEGER: f64 = 9_007_199_254_740_992.0;

/// Encode a fee, writing whole amounts as JSON integers.
fn fee_value(fee: f64) -> Result<Value> {
    if fee.fract() == 0.0 && fee.abs() < MAX_EXACT_INTEGER {
        // Whole and within the exact range, so the cast is lossless.
        #[allow(clippy::cast_possible_truncation)]
        return Ok(Value::from(fee as i64));
    }
    Number::from_f64(fee)
        .map(Value::Number)
        .ok_or_else(|| Error::validation("fee", "must be a finite number"))
}

impl AdminPanel {
    /// Write one fee to the shared table.
    ///
    /// Only the given class code is written; other entries are untouched.
    /// The local table is refreshed by the subscription, not here.
    pub async fn update_fee(&mut self, code: ClassCode, fee: f64) -> Outcome {
        let value = match validate_fee(fee).and_then(|()| fee_value(fee)) {
            Ok(value) => value,
            Err(err) => return Self::invalid(Task::UpdateFee, err),
        };
        debug!(%code, fee, "updating license fee");

        let mut updates = Map::new();
        updates.insert(code.as_str().to_string(), value);
        match self.store.update(LICENSE_FEES_PATH, updates).await {
            Ok(()) => {
                info!(%code, fee, "license fee updated");
                self.succeed(&Message::FeeUpdated(code))
            }
            Err(err) => self.fail(Task::UpdateFee, err),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use serde_json::json;

    use super::super::testing::*;
    use super::*;
    use crate::store::testing::FailingStore;
    use crate::store::{MemoryStore, RealtimeStore};

    #[test]
    fn test_fee_value_encoding() {
        assert_eq!(fee_value(250.0).unwrap(), json!(250));
        assert_eq!(fee_value(99.5).unwrap(), json!(99.5));
        assert_eq!(fee_value(0.0).unwrap(), json!(0));
    }

    #[tokio::test]
    async fn test_update_merges_single_field() {
        let store = MemoryStore::with_root(json!({"licenseFees": {"B": 100, "A1": 200}}));
        let mut fx = Fixture::new(store).await;

        assert!(fx.panel.update_fee(ClassCode::A1, 250.0).await.is_completed());

        assert_eq!(
            fx.store.get("licenseFees").await.unwrap(),
            Some(json!({"B": 100, "A1": 250}))
        );
        let table = fx.panel.license_fees();
        assert_eq!(table.get(ClassCode::B), Some(100.0));
        assert_eq!(table.get(ClassCode::A1), Some(250.0));
        assert_eq!(fx.only_message(), "A1 sınıfı için ehliyet ücreti güncellendi.");
    }

    #[tokio::test]
    async fn test_update_adds_missing_code() {
        let store = MemoryStore::with_root(json!({"licenseFees": {"B": 100}}));
        let mut fx = Fixture::new(store).await;

        assert!(fx
            .panel
            .update_fee(ClassCode::BakanlikA1, 1250.75)
            .await
            .is_completed());
        assert_eq!(
            fx.store.get("licenseFees").await.unwrap(),
            Some(json!({"B": 100, "BAKANLIK_A1": 1250.75}))
        );
    }

    #[tokio::test]
    async fn test_invalid_fee_is_rejected_without_write() {
        let mut fx = Fixture::new(FailingStore::new(MemoryStore::new())).await;

        for fee in [-1.0, f64::NAN, f64::INFINITY] {
            let outcome = fx.panel.update_fee(ClassCode::B, fee).await;
            assert!(outcome.error().unwrap().is_validation());
        }
        assert_eq!(fx.store.write_count(), 0);
        assert!(fx.notifier.notifications().is_empty());
    }

    #[tokio::test]
    async fn test_failed_update_is_reported() {
        let store = MemoryStore::with_root(json!({"licenseFees": {"B": 100}}));
        let mut fx = Fixture::new(FailingStore::new(store)).await;
        fx.store.fail_update.store(true, Ordering::SeqCst);

        let outcome = fx.panel.update_fee(ClassCode::B, 300.0).await;
        assert!(matches!(outcome, Outcome::Failed(_)));
        assert_eq!(fx.panel.license_fees().get(ClassCode::B), Some(100.0));
        assert!(fx
            .only_message()
            .starts_with("Ehliyet ücreti güncellenirken bir hata oluştu: "));
    }
}
