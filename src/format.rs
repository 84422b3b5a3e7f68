//! Plain-text formatting helpers for CLI output.

use chrono::{DateTime, Local, Utc};

/// Truncate a string to a maximum length in characters, adding "..." if truncated
pub fn truncate(s: &str, max_len: usize) -> String {
  if s.chars().count() <= max_len {
    s.to_string()
  } else {
    let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
    format!("{}...", kept)
  }
}

/// `$1,234.50`, with a leading minus for losses
pub fn price(value: f64) -> String {
  let sign = if value < 0.0 { "-" } else { "" };
  let cents = (value.abs() * 100.0).round() as u64;
  let whole = (cents / 100).to_string();

  let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
  for (i, digit) in whole.chars().enumerate() {
    if i > 0 && (whole.len() - i) % 3 == 0 {
      grouped.push(',');
    }
    grouped.push(digit);
  }
  format!("{}${}.{:02}", sign, grouped, cents % 100)
}

/// Signed price for profit columns
pub fn profit(value: f64) -> String {
  if value > 0.0 {
    format!("+{}", price(value))
  } else {
    price(value)
  }
}

pub fn timestamp(stamp: Option<DateTime<Utc>>) -> String {
  match stamp {
    Some(stamp) => stamp
      .with_timezone(&Local)
      .format("%Y-%m-%d %H:%M:%S")
      .to_string(),
    None => "never".to_string(),
  }
}
