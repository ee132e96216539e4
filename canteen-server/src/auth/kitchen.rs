//! Kitchen PIN store
//!
//! 厨房端登录用的 4 位 PIN 集合，始终包含出厂 PIN。
//! 存储在 `settings/kitchen_pins` 文档：`{ "pins": [...] }`。

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use shared::models::PinRequest;

use crate::store::{Collection, Store, encode, read_or_default, settings_keys};
use crate::utils::{AppError, AppResult, ErrorCode};

/// Factory PIN, always present
pub const FACTORY_PIN: &str = "9028";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct KitchenPinsDoc {
    #[serde(default)]
    pins: Vec<String>,
}

#[derive(Clone)]
pub struct KitchenPins {
    store: Arc<dyn Store>,
}

impl std::fmt::Debug for KitchenPins {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KitchenPins").finish_non_exhaustive()
    }
}

impl KitchenPins {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Current PINs (factory PIN restored when missing)
    pub async fn list_kitchen_pins(&self) -> AppResult<Vec<String>> {
        let stored: Option<KitchenPinsDoc> =
            read_or_default(self.store.as_ref(), Collection::Settings, settings_keys::KITCHEN_PINS)
                .await?;

        let mut pins = stored.map(|doc| doc.pins).unwrap_or_default();
        pins.retain(|p| is_valid_pin(p));
        if pins.iter().any(|p| p == FACTORY_PIN) {
            return Ok(pins);
        }
        pins.push(FACTORY_PIN.to_string());
        self.save(&pins).await?;
        Ok(pins)
    }

    pub async fn verify_kitchen_pin(&self, pin: &str) -> AppResult<bool> {
        let pin = pin.trim();
        Ok(self.list_kitchen_pins().await?.iter().any(|p| p == pin))
    }

    /// Add a PIN; duplicates are ignored
    pub async fn add_kitchen_pin(&self, pin: &str) -> AppResult<Vec<String>> {
        let pin = pin.trim();
        if !is_valid_pin(pin) {
            return Err(AppError::with_message(
                ErrorCode::InvalidPin,
                "Kitchen PIN must be 4 digits",
            ));
        }
        let mut pins = self.list_kitchen_pins().await?;
        if !pins.iter().any(|p| p == pin) {
            pins.push(pin.to_string());
            self.save(&pins).await?;
            tracing::info!("Kitchen PIN added");
        }
        Ok(pins)
    }

    /// Remove a PIN; removing the last one restores the factory PIN
    pub async fn remove_kitchen_pin(&self, pin: &str) -> AppResult<Vec<String>> {
        let pin = pin.trim();
        let mut pins = self.list_kitchen_pins().await?;
        pins.retain(|p| p != pin);
        if pins.is_empty() {
            pins.push(FACTORY_PIN.to_string());
        }
        self.save(&pins).await?;
        // 出厂 PIN 会在读取时补回
        self.list_kitchen_pins().await
    }

    /// Convenience for the HTTP payload
    pub async fn verify_request(&self, request: &PinRequest) -> AppResult<bool> {
        self.verify_kitchen_pin(&request.pin).await
    }

    async fn save(&self, pins: &[String]) -> AppResult<()> {
        let doc = KitchenPinsDoc {
            pins: pins.to_vec(),
        };
        self.store
            .put(Collection::Settings, settings_keys::KITCHEN_PINS, encode(&doc)?)
            .await?;
        Ok(())
    }
}

/// `^\d{4}$`
fn is_valid_pin(pin: &str) -> bool {
    pin.len() == 4 && pin.bytes().all(|b| b.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::ChangeBus;
    use crate::store::LocalStore;
    use serde_json::json;

    fn pins() -> KitchenPins {
        KitchenPins::new(Arc::new(LocalStore::open_in_memory(ChangeBus::new()).unwrap()))
    }

    #[tokio::test]
    async fn test_factory_pin_always_present() {
        let pins = pins();
        assert_eq!(pins.list_kitchen_pins().await.unwrap(), vec![FACTORY_PIN]);
        assert!(pins.verify_kitchen_pin("9028").await.unwrap());
        assert!(!pins.verify_kitchen_pin("1234").await.unwrap());
    }

    #[tokio::test]
    async fn test_add_validates_and_deduplicates() {
        let pins = pins();
        pins.add_kitchen_pin("4321").await.unwrap();
        let list = pins.add_kitchen_pin(" 4321 ").await.unwrap();
        assert_eq!(list, vec!["9028", "4321"]);

        for bad in ["123", "12345", "12a4", ""] {
            let err = pins.add_kitchen_pin(bad).await.unwrap_err();
            assert_eq!(err.code, ErrorCode::InvalidPin);
        }
        assert!(pins.verify_kitchen_pin("4321").await.unwrap());
    }

    #[tokio::test]
    async fn test_removing_last_pin_restores_factory() {
        let pins = pins();
        pins.add_kitchen_pin("1111").await.unwrap();
        let list = pins.remove_kitchen_pin("9028").await.unwrap();
        assert_eq!(list, vec!["1111", "9028"]);

        let list = pins.remove_kitchen_pin("1111").await.unwrap();
        assert_eq!(list, vec!["9028"]);
    }

    #[tokio::test]
    async fn test_corrupt_document_falls_back_to_factory() {
        let pins = pins();
        pins.store
            .put(Collection::Settings, settings_keys::KITCHEN_PINS, json!({"pins": "9028"}))
            .await
            .unwrap();
        assert_eq!(pins.list_kitchen_pins().await.unwrap(), vec![FACTORY_PIN]);
    }
}
