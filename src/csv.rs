//! CSV export and import of the collection.
//!
//! The column set is fixed; see `HEADERS`. Import maps columns by header
//! text, so files with reordered or extra columns still load.

use chrono::NaiveDate;
use std::borrow::Cow;

use crate::collection::{Category, Item, ItemStatus};
use crate::error::Error;

pub const HEADERS: [&str; 17] = [
  "Name",
  "Category",
  "Set",
  "Card Number",
  "Rarity",
  "Condition",
  "Grading Company",
  "Certification Number",
  "Product Type",
  "Purchase Price",
  "Purchase Date",
  "Sale Price",
  "Sale Date",
  "Profit/Loss",
  "Status",
  "Notes",
  "Image URL",
];

/// Full CSV document, header first, rows joined with `\n`.
pub fn export<'a>(items: impl IntoIterator<Item = &'a Item>) -> String {
  let mut rows = vec![HEADERS.join(",")];
  rows.extend(items.into_iter().map(row));
  rows.join("\n")
}

/// `collection-YYYY-MM-DD.csv`, or with the category slug before the date.
pub fn export_filename(category: Option<Category>, today: NaiveDate) -> String {
  let date = today.format("%Y-%m-%d");
  match category {
    Some(category) => format!("collection-{}-{}.csv", category.slug(), date),
    None => format!("collection-{}.csv", date),
  }
}

fn row(item: &Item) -> String {
  let text = |value: Option<&str>| escape(value.unwrap_or("")).into_owned();
  let sale_price = item
    .sale_price
    .filter(|p| *p != 0.0)
    .map(|p| p.to_string())
    .unwrap_or_default();
  let status = match item.status {
    Some(ItemStatus::Sold) => "sold",
    None => "active",
  };

  [
    text(Some(&item.name)),
    text(Some(item.category.as_str())),
    text(Some(&item.set)),
    text(item.card_number.as_deref()),
    text(item.rarity.as_deref()),
    text(Some(&item.condition)),
    text(item.grading_company.as_deref()),
    text(item.certification_number.as_deref()),
    text(item.product_type.as_deref()),
    item.price.to_string(),
    text(Some(&item.purchase_date)),
    sale_price,
    text(item.sale_date.as_deref()),
    item.profit().map(|p| p.to_string()).unwrap_or_default(),
    status.to_string(),
    text(item.notes.as_deref()),
    text(Some(&item.image)),
  ]
  .join(",")
}

fn escape(value: &str) -> Cow<'_, str> {
  if value.contains(|c| matches!(c, ',' | '"' | '\n' | '\r')) {
    Cow::Owned(format!("\"{}\"", value.replace('"', "\"\"")))
  } else {
    Cow::Borrowed(value)
  }
}

/// Result of reading a CSV file. Bad rows do not stop the import.
#[derive(Debug, Default)]
pub struct ImportReport {
  pub items: Vec<Item>,
  /// One `Error::Validation` per rejected row
  pub errors: Vec<Error>,
}

/// Parse `text` into items. Each item gets a fresh id.
pub fn import(text: &str) -> ImportReport {
  let mut report = ImportReport::default();
  let mut records = parse_records(text).into_iter();

  let headers: Vec<String> = match records.next() {
    Some(record) => record
      .fields
      .iter()
      .map(|h| h.trim_start_matches('\u{feff}').trim().to_string())
      .collect(),
    None => return report,
  };

  for record in records {
    match item_from_record(&headers, &record.fields) {
      Ok(item) => report.items.push(item),
      Err(message) => report.errors.push(Error::Validation {
        line: record.line,
        message,
      }),
    }
  }
  report
}

struct Record {
  /// Physical line the record starts on, 1-based
  line: usize,
  fields: Vec<String>,
}

/// RFC 4180 style: quoted fields may hold commas, `""` and line breaks.
fn parse_records(text: &str) -> Vec<Record> {
  let mut records = Vec::new();
  let mut fields = Vec::new();
  let mut field = String::new();
  let mut in_quotes = false;
  let mut line = 1;
  let mut record_line = 1;

  let mut chars = text.chars().peekable();
  while let Some(c) = chars.next() {
    match c {
      '"' if in_quotes && chars.peek() == Some(&'"') => {
        field.push('"');
        chars.next();
      }
      '"' => in_quotes = !in_quotes,
      ',' if !in_quotes => fields.push(std::mem::take(&mut field)),
      '\r' if !in_quotes && chars.peek() == Some(&'\n') => {}
      '\n' if !in_quotes => {
        fields.push(std::mem::take(&mut field));
        finish_record(&mut records, std::mem::take(&mut fields), record_line);
        line += 1;
        record_line = line;
      }
      '\n' => {
        field.push(c);
        line += 1;
      }
      _ => field.push(c),
    }
  }

  if !field.is_empty() || !fields.is_empty() {
    fields.push(field);
    finish_record(&mut records, fields, record_line);
  }
  records
}

fn finish_record(records: &mut Vec<Record>, fields: Vec<String>, line: usize) {
  let blank = fields.iter().all(|f| f.trim().is_empty());
  if !blank {
    records.push(Record { line, fields });
  }
}

fn item_from_record(headers: &[String], fields: &[String]) -> Result<Item, String> {
  let column = |name: &str| column_value(headers, fields, name);
  let optional = |name: &str| Some(column(name).to_string()).filter(|v| !v.is_empty());

  let name = column("Name");
  if name.trim().is_empty() {
    return Err("missing Name".to_string());
  }

  let category: Category = column("Category").trim().parse()?;

  let status = match column("Status").trim() {
    "" | "active" => None,
    "sold" => Some(ItemStatus::Sold),
    other => return Err(format!("unknown status '{}'", other)),
  };

  let price = match column("Purchase Price").trim() {
    "" => 0.0,
    raw => raw
      .parse::<f64>()
      .map_err(|_| format!("Purchase Price '{}' is not a number", raw))?,
  };

  let sale_price = match column("Sale Price").trim() {
    "" => None,
    raw => Some(
      raw
        .parse::<f64>()
        .map_err(|_| format!("Sale Price '{}' is not a number", raw))?,
    ),
  };

  let mut item = Item::new(name, column("Set"), category);
  item.card_number = optional("Card Number");
  item.rarity = optional("Rarity");
  item.condition = column("Condition").to_string();
  item.grading_company = optional("Grading Company");
  item.certification_number = optional("Certification Number");
  item.product_type = optional("Product Type");
  item.price = price;
  item.purchase_date = column("Purchase Date").to_string();
  item.sale_price = sale_price;
  item.sale_date = optional("Sale Date");
  item.status = status;
  item.notes = optional("Notes");
  item.image = column("Image URL").to_string();
  Ok(item)
}

/// Missing columns and short rows read as empty.
fn column_value<'a>(headers: &[String], fields: &'a [String], name: &str) -> &'a str {
  headers
    .iter()
    .position(|h| h == name)
    .and_then(|i| fields.get(i))
    .map(String::as_str)
    .unwrap_or("")
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::collection::seed;

  #[test]
  fn test_header_row() {
    let csv = export(std::iter::empty());
    assert_eq!(
      csv,
      "Name,Category,Set,Card Number,Rarity,Condition,Grading Company,Certification Number,\
       Product Type,Purchase Price,Purchase Date,Sale Price,Sale Date,Profit/Loss,Status,Notes,Image URL"
    );
  }

  #[test]
  fn test_row_formatting() {
    let mut item = Item::new("Pikachu, \"Yellow Cheeks\"", "Base Set", Category::Ungraded);
    item.price = 12.5;
    item.sale_price = Some(20.0);
    item.status = Some(ItemStatus::Sold);
    item.notes = Some("line one\nline two".to_string());

    let csv = export([&item]);
    let row = csv.split_once('\n').unwrap().1;
    assert!(row.starts_with("\"Pikachu, \"\"Yellow Cheeks\"\"\",ungraded,Base Set,,"));
    assert!(row.contains(",12.5,,20,,7.5,sold,\"line one\nline two\","));
  }

  #[test]
  fn test_unpriced_active_row() {
    let item = Item::new("Mew", "Promo", Category::Sealed);
    let csv = export([&item]);
    let row = csv.lines().nth(1).unwrap();
    assert_eq!(row, "Mew,sealed,Promo,,,,,,,0,,,,,active,,");
  }

  #[test]
  fn test_export_filename() {
    let today = NaiveDate::from_ymd_opt(2024, 5, 17).unwrap();
    assert_eq!(export_filename(None, today), "collection-2024-05-17.csv");
    assert_eq!(
      export_filename(Some(Category::Graded), today),
      "collection-graded-cards-2024-05-17.csv"
    );
    assert_eq!(
      export_filename(Some(Category::Sold), today),
      "collection-sales-history-2024-05-17.csv"
    );
  }

  #[test]
  fn test_round_trip_keeps_exported_fields() {
    let original = seed();
    let report = import(&export(&original));

    assert!(report.errors.is_empty(), "{:?}", report.errors);
    assert_eq!(report.items.len(), original.len());

    for (before, after) in original.iter().zip(&report.items) {
      assert_ne!(before.id, after.id);
      assert_eq!(before.name, after.name);
      assert_eq!(before.category, after.category);
      assert_eq!(before.set, after.set);
      assert_eq!(before.card_number, after.card_number);
      assert_eq!(before.rarity, after.rarity);
      assert_eq!(before.condition, after.condition);
      assert_eq!(before.grading_company, after.grading_company);
      assert_eq!(before.certification_number, after.certification_number);
      assert_eq!(before.product_type, after.product_type);
      assert_eq!(before.price, after.price);
      assert_eq!(before.purchase_date, after.purchase_date);
      assert_eq!(before.status, after.status);
      assert_eq!(before.notes, after.notes);
      assert_eq!(before.image, after.image);
    }
  }

  #[test]
  fn test_round_trip_sold_item() {
    let mut item = Item::new("Gengar", "Fossil", Category::Sold);
    item.status = Some(ItemStatus::Sold);
    item.price = 10.0;
    item.sale_price = Some(25.5);
    item.sale_date = Some("2024-04-01".to_string());
    item.notes = Some("sold at \"show\", table 4".to_string());

    let report = import(&export([&item]));
    let back = &report.items[0];
    assert_eq!(back.sale_price, Some(25.5));
    assert_eq!(back.sale_date.as_deref(), Some("2024-04-01"));
    assert_eq!(back.notes, item.notes);
    assert!(back.is_sold());
  }

  #[test]
  fn test_import_reordered_columns_and_crlf() {
    let text = "Set,Name,Category,Extra\r\nJungle,Scyther,ungraded,ignored\r\n\r\n";
    let report = import(text);
    assert!(report.errors.is_empty());
    assert_eq!(report.items.len(), 1);
    assert_eq!(report.items[0].name, "Scyther");
    assert_eq!(report.items[0].set, "Jungle");
    assert_eq!(report.items[0].price, 0.0);
  }

  #[test]
  fn test_import_collects_row_errors() {
    let text = "Name,Category,Purchase Price,Status\n\
                Good,ungraded,5,active\n\
                ,graded,1,\n\
                Pricey,graded,abc,\n\
                Odd,binder,1,\n\
                Strange,sealed,1,lost\n\
                Fine,sealed,,sold";
    let report = import(text);

    assert_eq!(report.items.len(), 2);
    let lines: Vec<usize> = report
      .errors
      .iter()
      .map(|e| match e {
        Error::Validation { line, .. } => *line,
        other => panic!("unexpected error {other:?}"),
      })
      .collect();
    assert_eq!(lines, vec![3, 4, 5, 6]);
  }

  #[test]
  fn test_import_line_numbers_follow_quoted_newlines() {
    let text = "Name,Category,Notes\nA,ungraded,\"two\nlines\"\n,ungraded,";
    let report = import(text);
    assert_eq!(report.items[0].notes.as_deref(), Some("two\nlines"));
    assert!(matches!(report.errors[0], Error::Validation { line: 4, .. }));
  }

  #[test]
  fn test_import_empty_input() {
    let report = import("");
    assert!(report.items.is_empty());
    assert!(report.errors.is_empty());
  }
}
