use chrono::Utc;
use rand::Rng;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// Item identifier.
///
/// Documents written by older clients carry numeric ids (sometimes with a
/// fractional part), so ids are kept exactly as they were read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ItemId {
  Number(serde_json::Number),
  Text(String),
}

impl ItemId {
  /// Millisecond timestamp with three random trailing digits.
  pub fn generate() -> Self {
    let millis = Utc::now().timestamp_millis().max(0) as u64;
    let jitter: u64 = rand::thread_rng().gen_range(0..1000);
    ItemId::Number(serde_json::Number::from(millis * 1000 + jitter))
  }

  /// Compare against an id typed by the user.
  pub fn matches(&self, raw: &str) -> bool {
    self.to_string() == raw.trim()
  }
}

impl fmt::Display for ItemId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      ItemId::Number(n) => write!(f, "{}", n),
      ItemId::Text(s) => f.write_str(s),
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
  #[default]
  Ungraded,
  Graded,
  Sealed,
  /// Set on items marked sold; the previous value moves to `original_category`.
  Sold,
}

impl Category {
  /// Categories an active item can live in.
  pub const ACTIVE: [Category; 3] = [Category::Ungraded, Category::Graded, Category::Sealed];

  pub fn as_str(&self) -> &'static str {
    match self {
      Category::Ungraded => "ungraded",
      Category::Graded => "graded",
      Category::Sealed => "sealed",
      Category::Sold => "sold",
    }
  }

  pub fn label(&self) -> &'static str {
    match self {
      Category::Ungraded => "Ungraded Singles",
      Category::Graded => "Graded Cards",
      Category::Sealed => "Sealed Products",
      Category::Sold => "Sales History",
    }
  }

  /// File name fragment used by category exports.
  pub fn slug(&self) -> &'static str {
    match self {
      Category::Ungraded => "ungraded-singles",
      Category::Graded => "graded-cards",
      Category::Sealed => "sealed-products",
      Category::Sold => "sales-history",
    }
  }
}

impl fmt::Display for Category {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for Category {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "ungraded" => Ok(Category::Ungraded),
      "graded" => Ok(Category::Graded),
      "sealed" => Ok(Category::Sealed),
      "sold" => Ok(Category::Sold),
      other => Err(format!("unknown category '{}'", other)),
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemStatus {
  Sold,
}

/// Sub-grades reported by BGS-style graders.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Subgrades {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub centering: Option<f64>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub corners: Option<f64>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub edges: Option<f64>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub surface: Option<f64>,
}

/// One tracked card or sealed product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
  #[serde(default = "ItemId::generate")]
  pub id: ItemId,
  #[serde(default)]
  pub name: String,
  #[serde(default)]
  pub set: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub card_number: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub rarity: Option<String>,
  #[serde(default)]
  pub condition: String,
  #[serde(default)]
  pub category: Category,
  #[serde(
    default,
    skip_serializing_if = "Option::is_none",
    deserialize_with = "deserialize_status"
  )]
  pub status: Option<ItemStatus>,
  #[serde(default, deserialize_with = "deserialize_price")]
  pub price: f64,
  #[serde(
    default,
    skip_serializing_if = "Option::is_none",
    deserialize_with = "deserialize_optional_price"
  )]
  pub sale_price: Option<f64>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub sale_date: Option<String>,
  #[serde(default)]
  pub purchase_date: String,
  #[serde(default)]
  pub purchase_location: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub notes: Option<String>,
  #[serde(default)]
  pub image: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub certification_number: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub grading_company: Option<String>,
  /// Product type: "single" for cards, "booster_box", "tin", ... for sealed
  #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
  pub product_type: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub subgrades: Option<Subgrades>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub original_category: Option<Category>,
  // Fields written by other clients that we don't model
  #[serde(flatten)]
  pub extra: Map<String, Value>,
}

impl Item {
  pub fn new(name: impl Into<String>, set: impl Into<String>, category: Category) -> Self {
    Self {
      id: ItemId::generate(),
      name: name.into(),
      set: set.into(),
      card_number: None,
      rarity: None,
      condition: String::new(),
      category,
      status: None,
      price: 0.0,
      sale_price: None,
      sale_date: None,
      purchase_date: String::new(),
      purchase_location: String::new(),
      notes: None,
      image: String::new(),
      certification_number: None,
      grading_company: None,
      product_type: None,
      subgrades: None,
      original_category: None,
      extra: Map::new(),
    }
  }

  pub fn is_sold(&self) -> bool {
    self.status == Some(ItemStatus::Sold)
  }

  /// Sale minus purchase price, only when both are set and non-zero.
  pub fn profit(&self) -> Option<f64> {
    match self.sale_price {
      Some(sale) if sale != 0.0 && self.price != 0.0 => Some(sale - self.price),
      _ => None,
    }
  }
}

/// Older clients stored `"active"` (or an empty string) for unsold items.
fn deserialize_status<'de, D>(deserializer: D) -> Result<Option<ItemStatus>, D::Error>
where
  D: Deserializer<'de>,
{
  let raw: Option<String> = Option::deserialize(deserializer)?;
  Ok(match raw.as_deref() {
    Some("sold") => Some(ItemStatus::Sold),
    _ => None,
  })
}

/// Prices arrive as numbers, numeric strings (CSV imports of older clients)
/// or empty strings.
fn deserialize_price<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
  D: Deserializer<'de>,
{
  Ok(deserialize_optional_price(deserializer)?.unwrap_or(0.0))
}

fn deserialize_optional_price<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
  D: Deserializer<'de>,
{
  let value = Value::deserialize(deserializer)?;
  match value {
    Value::Null => Ok(None),
    Value::Number(n) => Ok(n.as_f64()),
    Value::String(s) if s.trim().is_empty() => Ok(None),
    Value::String(s) => s
      .trim()
      .parse::<f64>()
      .map(Some)
      .map_err(|_| serde::de::Error::custom(format!("invalid price '{}'", s))),
    other => Err(serde::de::Error::custom(format!(
      "invalid price {}",
      other
    ))),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn test_numeric_and_fractional_ids_survive() {
    let item: Item = serde_json::from_value(json!({ "id": 1712345678901.25, "name": "Mew" })).unwrap();
    assert!(item.id.matches("1712345678901.25"));

    let item: Item = serde_json::from_value(json!({ "id": 7, "name": "Mew" })).unwrap();
    assert_eq!(serde_json::to_value(&item).unwrap()["id"], json!(7));
  }

  #[test]
  fn test_string_id() {
    let item: Item = serde_json::from_value(json!({ "id": "abc", "name": "Mew" })).unwrap();
    assert_eq!(item.id, ItemId::Text("abc".to_string()));
  }

  #[test]
  fn test_legacy_active_status_is_absent() {
    let item: Item =
      serde_json::from_value(json!({ "id": 1, "status": "active", "price": "12.50" })).unwrap();
    assert_eq!(item.status, None);
    assert_eq!(item.price, 12.5);
  }

  #[test]
  fn test_empty_price_string_is_zero() {
    let item: Item = serde_json::from_value(json!({ "id": 1, "price": "", "salePrice": "" })).unwrap();
    assert_eq!(item.price, 0.0);
    assert_eq!(item.sale_price, None);
  }

  #[test]
  fn test_unknown_fields_are_preserved() {
    let item: Item =
      serde_json::from_value(json!({ "id": 1, "name": "Mew", "language": "JP" })).unwrap();
    let value = serde_json::to_value(&item).unwrap();
    assert_eq!(value["language"], json!("JP"));
    assert_eq!(value["type"], Value::Null);
  }

  #[test]
  fn test_profit_requires_both_prices() {
    let mut item = Item::new("Mew", "Promo", Category::Ungraded);
    item.price = 10.0;
    assert_eq!(item.profit(), None);
    item.sale_price = Some(25.0);
    assert_eq!(item.profit(), Some(15.0));
    item.price = 0.0;
    assert_eq!(item.profit(), None);
  }

  #[test]
  fn test_generated_ids_are_numeric() {
    let id = ItemId::generate();
    assert!(matches!(id, ItemId::Number(_)));
    assert!(id.to_string().parse::<u64>().is_ok());
  }
}
