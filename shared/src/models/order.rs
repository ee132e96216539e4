//! Order Model

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Default preparation estimate shown to the customer
pub const DEFAULT_ESTIMATED_MINUTES: u32 = 15;

/// Order status (订单状态)
///
/// ```text
/// placed -> preparing -> ready -> served
///   \__________\___________\-----> cancelled | rejected
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    #[default]
    Placed,
    Preparing,
    Ready,
    Served,
    Rejected,
    Cancelled,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 6] = [
        OrderStatus::Placed,
        OrderStatus::Preparing,
        OrderStatus::Ready,
        OrderStatus::Served,
        OrderStatus::Rejected,
        OrderStatus::Cancelled,
    ];

    /// 进行中: placed / preparing / ready
    pub fn is_active(self) -> bool {
        matches!(self, Self::Placed | Self::Preparing | Self::Ready)
    }

    /// 终态: served / rejected / cancelled
    pub fn is_terminal(self) -> bool {
        !self.is_active()
    }

    /// Statuses counted as committed revenue
    pub fn is_revenue_bearing(self) -> bool {
        matches!(
            self,
            Self::Placed | Self::Preparing | Self::Ready | Self::Served
        )
    }

    /// Transition table. Nothing leaves a terminal state, and a status never
    /// transitions to itself.
    pub fn can_transition_to(self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        match (self, next) {
            (Placed, Preparing) | (Preparing, Ready) | (Ready, Served) => true,
            (from, Cancelled | Rejected) => from.is_active(),
            _ => false,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Placed => "placed",
            Self::Preparing => "preparing",
            Self::Ready => "ready",
            Self::Served => "served",
            Self::Rejected => "rejected",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s.trim())
            .ok_or_else(|| format!("unknown order status: {s}"))
    }
}

/// Order line, captured at order time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLine {
    /// Menu item id
    pub id: String,
    pub name: String,
    /// Unit price in currency unit
    pub price: u32,
    pub quantity: u32,
}

impl OrderLine {
    pub fn line_total(&self) -> u64 {
        u64::from(self.price) * u64::from(self.quantity)
    }
}

/// Order entity (订单)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    /// Storage-assigned id
    #[serde(default)]
    pub id: String,
    pub table_number: u32,
    /// `AGM-NNN`, reset daily
    pub order_number: String,
    pub status: OrderStatus,
    pub items: Vec<OrderLine>,
    pub total_amount: u64,
    pub created_at: i64,
    pub updated_at: i64,
    #[serde(default)]
    pub served_at: Option<i64>,
    #[serde(default = "default_estimated_minutes")]
    pub estimated_minutes: u32,
    #[serde(default)]
    pub rating_id: Option<String>,
}

fn default_estimated_minutes() -> u32 {
    DEFAULT_ESTIMATED_MINUTES
}

impl Order {
    /// Σ price × quantity over the lines
    pub fn items_total(items: &[OrderLine]) -> u64 {
        items.iter().map(OrderLine::line_total).sum()
    }

    /// Format a daily sequence value as an order number
    pub fn format_number(sequence: u64) -> String {
        format!("AGM-{:03}", sequence)
    }
}

/// Place order payload
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceOrderRequest {
    pub table_number: u32,
    pub items: Vec<OrderLine>,
    pub total_amount: u64,
}

/// Status change payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusUpdate {
    pub status: OrderStatus,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forward_edges() {
        assert!(OrderStatus::Placed.can_transition_to(OrderStatus::Preparing));
        assert!(OrderStatus::Preparing.can_transition_to(OrderStatus::Ready));
        assert!(OrderStatus::Ready.can_transition_to(OrderStatus::Served));
        assert!(!OrderStatus::Placed.can_transition_to(OrderStatus::Served));
        assert!(!OrderStatus::Ready.can_transition_to(OrderStatus::Preparing));
    }

    #[test]
    fn test_terminal_states_have_no_exit() {
        for from in OrderStatus::ALL.into_iter().filter(|s| s.is_terminal()) {
            for to in OrderStatus::ALL {
                assert!(!from.can_transition_to(to), "{from} -> {to}");
            }
        }
    }

    #[test]
    fn test_any_active_state_can_cancel_or_reject() {
        for from in OrderStatus::ALL.into_iter().filter(|s| s.is_active()) {
            assert!(from.can_transition_to(OrderStatus::Cancelled));
            assert!(from.can_transition_to(OrderStatus::Rejected));
            assert!(!from.can_transition_to(from));
        }
    }

    #[test]
    fn test_status_wire_format() {
        let json = serde_json::to_string(&OrderStatus::Preparing).unwrap();
        assert_eq!(json, "\"preparing\"");
        assert_eq!("served".parse::<OrderStatus>(), Ok(OrderStatus::Served));
        assert!("done".parse::<OrderStatus>().is_err());
    }

    #[test]
    fn test_order_number_format() {
        assert_eq!(Order::format_number(1), "AGM-001");
        assert_eq!(Order::format_number(42), "AGM-042");
        assert_eq!(Order::format_number(1234), "AGM-1234");
    }

    #[test]
    fn test_items_total() {
        let items = vec![
            OrderLine {
                id: "tea".into(),
                name: "Tea".into(),
                price: 10,
                quantity: 2,
            },
            OrderLine {
                id: "vada-pav".into(),
                name: "Vada Pav".into(),
                price: 20,
                quantity: 1,
            },
        ];
        assert_eq!(Order::items_total(&items), 40);
    }

    #[test]
    fn test_order_defaults_on_decode() {
        let raw = serde_json::json!({
            "tableNumber": 3,
            "orderNumber": "AGM-001",
            "status": "placed",
            "items": [],
            "totalAmount": 0,
            "createdAt": 1,
            "updatedAt": 1
        });
        let order: Order = serde_json::from_value(raw).unwrap();
        assert_eq!(order.estimated_minutes, 15);
        assert!(order.served_at.is_none());
        assert!(order.rating_id.is_none());
        assert!(order.id.is_empty());
    }
}
