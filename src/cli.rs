//! Subcommand definitions and their execution against the `App`.

use clap::{Args, Subcommand};
use color_eyre::{eyre::eyre, Result};
use std::path::PathBuf;

use crate::app::{App, ImportMode};
use crate::collection::{distinct_sets, Category, CollectionStats, Item, ItemFilter, View};
use crate::format::{price, profit, timestamp, truncate};
use crate::sync::SyncOutcome;

#[derive(Subcommand, Debug)]
pub enum Cmd {
  /// List items
  List {
    /// all (unsold), ungraded, graded, sealed or sold
    #[arg(short, long, default_value = "all")]
    view: View,
    /// Case-insensitive match on name, set or card number
    #[arg(short, long)]
    search: Option<String>,
    /// Exact set name
    #[arg(long)]
    set: Option<String>,
  },
  /// Show every field of one item
  Show { id: String },
  /// Add an item
  Add {
    #[command(flatten)]
    fields: ItemFields,
    /// Pre-fill from a PSA certification number
    #[arg(long)]
    from_cert: Option<String>,
  },
  /// Change fields of an item
  Edit {
    id: String,
    #[command(flatten)]
    fields: ItemFields,
  },
  /// Remove an item
  Remove { id: String },
  /// Add a copy of an item as a new unsold entry
  Duplicate { id: String },
  /// Mark an item sold
  Sell {
    id: String,
    /// Sale price
    #[arg(long)]
    price: f64,
    /// Sale date, YYYY-MM-DD (default today)
    #[arg(long)]
    date: Option<String>,
  },
  /// Collection value and sales totals
  Stats,
  /// List the sets present in the collection
  Sets,
  /// Export to CSV
  Export {
    /// Only items of this category
    #[arg(long)]
    category: Option<Category>,
    /// Output file or directory (default: dated file in the current directory)
    #[arg(short, long)]
    output: Option<PathBuf>,
  },
  /// Import items from a CSV file
  Import {
    path: PathBuf,
    /// Replace the collection instead of adding to it
    #[arg(long)]
    replace: bool,
  },
  /// Reconcile with the repository; the newer side wins
  Sync,
  /// Write the collection to the repository now
  Push,
  /// Upload a JSON backup to Google Drive
  Backup,
  /// Look up a PSA certification number
  Lookup { cert: String },
  /// Manage the stored repository token
  Token {
    #[command(subcommand)]
    action: TokenAction,
  },
  /// Interactive shell
  Shell,
}

#[derive(Subcommand, Debug)]
pub enum TokenAction {
  /// Store a repository token
  Set { token: String },
  /// Forget the stored token
  Clear,
}

/// Item fields settable from the command line
#[derive(Args, Debug, Default, Clone)]
pub struct ItemFields {
  #[arg(long)]
  pub name: Option<String>,
  #[arg(long)]
  pub set: Option<String>,
  /// ungraded, graded or sealed
  #[arg(long)]
  pub category: Option<Category>,
  #[arg(long)]
  pub card_number: Option<String>,
  #[arg(long)]
  pub rarity: Option<String>,
  #[arg(long)]
  pub condition: Option<String>,
  /// Purchase price
  #[arg(long)]
  pub price: Option<f64>,
  #[arg(long)]
  pub purchase_date: Option<String>,
  #[arg(long)]
  pub purchase_location: Option<String>,
  #[arg(long)]
  pub notes: Option<String>,
  /// Image URL
  #[arg(long)]
  pub image: Option<String>,
  #[arg(long)]
  pub grading_company: Option<String>,
  #[arg(long)]
  pub cert: Option<String>,
  /// Product type: single, booster_box, booster_pack, theme_deck, ...
  #[arg(long = "type")]
  pub product_type: Option<String>,
}

impl ItemFields {
  /// Copy every given field onto `item`.
  ///
  /// `sold` is never taken as a category; only `sell` moves an item there.
  /// A sold item keeps its category and takes the new one as the category
  /// it returns to.
  pub fn apply(self, item: &mut Item) -> Result<()> {
    if self.category == Some(Category::Sold) {
      return Err(eyre!("Use `sell` to move an item into sales history"));
    }
    if let Some(v) = self.name {
      item.name = v;
    }
    if let Some(v) = self.set {
      item.set = v;
    }
    if let Some(v) = self.category {
      if item.is_sold() {
        item.original_category = Some(v);
      } else {
        item.category = v;
      }
    }
    if let Some(v) = self.condition {
      item.condition = v;
    }
    if let Some(v) = self.price {
      item.price = v;
    }
    if let Some(v) = self.purchase_date {
      item.purchase_date = v;
    }
    if let Some(v) = self.purchase_location {
      item.purchase_location = v;
    }
    if let Some(v) = self.image {
      item.image = v;
    }
    set_optional(&mut item.card_number, self.card_number);
    set_optional(&mut item.rarity, self.rarity);
    set_optional(&mut item.notes, self.notes);
    set_optional(&mut item.grading_company, self.grading_company);
    set_optional(&mut item.certification_number, self.cert);
    set_optional(&mut item.product_type, self.product_type);
    Ok(())
  }
}

/// An empty value clears the field
fn set_optional(field: &mut Option<String>, value: Option<String>) {
  if let Some(value) = value {
    *field = Some(value).filter(|v| !v.is_empty());
  }
}

/// Run one subcommand. Errors carry the failure notice for the user.
pub async fn run(app: &mut App, cmd: Cmd) -> Result<()> {
  match cmd {
    Cmd::List { view, search, set } => {
      let filter = ItemFilter { view, search, set };
      print_items(&filter.apply(app.collection().items()));
    }
    Cmd::Show { id } => {
      let item = app
        .collection()
        .get(&id)
        .ok_or_else(|| eyre!("No item with id {}", id))?;
      print_item(item);
    }
    Cmd::Add { fields, from_cert } => {
      let mut item = match from_cert {
        Some(cert) => {
          let card = app.lookup(&cert).await?;
          println!("Found {} ({}) in {}", card.name, card.grade, card.set);
          card.to_item()
        }
        None => {
          if fields.name.as_deref().map_or(true, str::is_empty) {
            return Err(eyre!("--name is required"));
          }
          Item::new("", "", Category::Ungraded)
        }
      };
      fields.apply(&mut item)?;
      let name = item.name.clone();
      let id = app.add(item)?;
      println!("Added {} ({})", name, id);
    }
    Cmd::Edit { id, fields } => {
      let mut item = app
        .collection()
        .get(&id)
        .cloned()
        .ok_or_else(|| eyre!("No item with id {}", id))?;
      fields.apply(&mut item)?;
      app.update(item)?;
      println!("Updated {}", id);
    }
    Cmd::Remove { id } => {
      let removed = app.remove(&id)?;
      println!("Removed {} ({})", removed.name, removed.id);
    }
    Cmd::Duplicate { id } => {
      let new_id = app.duplicate(&id)?;
      println!("Duplicated {} as {}", id, new_id);
    }
    Cmd::Sell { id, price: sale_price, date } => {
      app.mark_sold(&id, sale_price, date)?;
      println!("Marked {} sold for {}", id, price(sale_price));
    }
    Cmd::Stats => print_stats(&CollectionStats::compute(app.collection().items())),
    Cmd::Sets => {
      for set in distinct_sets(app.collection().items()) {
        println!("{}", set);
      }
    }
    Cmd::Export { category, output } => {
      let summary = app.export_csv(category, output.as_deref()).await?;
      println!("Exported {} items to {}", summary.count, summary.path.display());
    }
    Cmd::Import { path, replace } => {
      let mode = if replace {
        ImportMode::Replace
      } else {
        ImportMode::Merge
      };
      let summary = app.import_csv(&path, mode).await?;
      println!(
        "Imported {} items ({} in collection)",
        summary.imported, summary.total
      );
      for error in &summary.rejected {
        println!("  skipped {}", error);
      }
    }
    Cmd::Sync => match app.sync().await? {
      SyncOutcome::Pulled { cards, last_updated } => println!(
        "Loaded {} cards from repository (updated {})",
        cards.len(),
        timestamp(last_updated)
      ),
      SyncOutcome::Pushed(receipt) => println!(
        "Saved {} cards to repository (commit {})",
        app.collection().len(),
        short_sha(&receipt.commit_sha)
      ),
    },
    Cmd::Push => {
      let receipt = app.push().await?;
      println!(
        "Saved {} cards to repository (commit {})",
        app.collection().len(),
        short_sha(&receipt.commit_sha)
      );
      if let Some(url) = receipt.url {
        println!("{}", url);
      }
    }
    Cmd::Backup => {
      let receipt = app.backup().await?;
      println!("Backed up to Drive as {}", receipt.filename);
      println!("{}", receipt.url);
    }
    Cmd::Lookup { cert } => {
      let card = app.lookup(&cert).await?;
      print_graded(&card);
    }
    Cmd::Token { action } => match action {
      TokenAction::Set { token } => {
        app.set_credential(&token)?;
        println!("Repository token stored");
      }
      TokenAction::Clear => {
        app.clear_credential()?;
        println!("Repository token removed");
      }
    },
    Cmd::Shell => return Err(eyre!("Already in the shell")),
  }
  Ok(())
}

fn short_sha(sha: &str) -> &str {
  sha.get(..7).unwrap_or(sha)
}

fn print_items(items: &[&Item]) {
  if items.is_empty() {
    println!("No items");
    return;
  }

  println!(
    "{:<16} {:<28} {:<20} {:<9} {:<14} {:>12}",
    "ID", "NAME", "SET", "CATEGORY", "CONDITION", "PRICE"
  );
  for item in items {
    let value = match item.sale_price {
      Some(sale) if item.is_sold() => price(sale),
      _ => price(item.price),
    };
    println!(
      "{:<16} {:<28} {:<20} {:<9} {:<14} {:>12}",
      truncate(&item.id.to_string(), 16),
      truncate(&item.name, 28),
      truncate(&item.set, 20),
      item.original_category.unwrap_or(item.category).as_str(),
      truncate(&item.condition, 14),
      value
    );
  }
  println!("{} items", items.len());
}

fn print_item(item: &Item) {
  let row = |label: &str, value: &str| {
    if !value.is_empty() {
      println!("{:<18} {}", label, value);
    }
  };

  row("ID", &item.id.to_string());
  row("Name", &item.name);
  row("Set", &item.set);
  row("Card number", item.card_number.as_deref().unwrap_or(""));
  row("Rarity", item.rarity.as_deref().unwrap_or(""));
  row("Condition", &item.condition);
  row("Category", item.category.label());
  row("Type", item.product_type.as_deref().unwrap_or(""));
  row("Grading company", item.grading_company.as_deref().unwrap_or(""));
  row("Certification", item.certification_number.as_deref().unwrap_or(""));
  if let Some(subgrades) = &item.subgrades {
    let parts: Vec<String> = [
      ("centering", subgrades.centering),
      ("corners", subgrades.corners),
      ("edges", subgrades.edges),
      ("surface", subgrades.surface),
    ]
    .iter()
    .filter_map(|(name, grade)| grade.map(|g| format!("{} {}", name, g)))
    .collect();
    row("Subgrades", &parts.join(", "));
  }
  row("Purchase price", &price(item.price));
  row("Purchased", &item.purchase_date);
  row("Purchased at", &item.purchase_location);
  if item.is_sold() {
    row("Status", "sold");
    row("Sale price", &item.sale_price.map(price).unwrap_or_default());
    row("Sale date", item.sale_date.as_deref().unwrap_or(""));
    row("Profit", &item.profit().map(profit).unwrap_or_default());
    if let Some(original) = item.original_category {
      row("Sold from", original.label());
    }
  }
  row("Notes", item.notes.as_deref().unwrap_or(""));
  row("Image", &item.image);
}

fn print_stats(stats: &CollectionStats) {
  println!("Active items    {:>6}   {:>14}", stats.active_count, price(stats.active_value));
  for category in &stats.by_category {
    println!(
      "  {:<14}{:>6}   {:>14}",
      category.category.label(),
      category.count,
      price(category.value)
    );
  }
  println!("Sold items      {:>6}   {:>14}", stats.sold_count, price(stats.sales_revenue));
  println!("Realized profit          {:>14}", profit(stats.realized_profit));
}

fn print_graded(card: &crate::remote::GradedCard) {
  println!("{} {}  cert {}", card.company, card.grade, card.cert_number);
  println!("{}", card.name);
  println!("{} #{}  {}", card.set, card.card_number, card.rarity);
  if let Some(year) = &card.year {
    println!("Year {}", year);
  }
  if let Some(spec) = &card.spec_number {
    println!("Spec {}", spec);
  }
  if let Some(total) = card.total_population {
    println!(
      "Population {} ({} higher)",
      total,
      card.population_higher.unwrap_or(0)
    );
  }
  if let Some(image) = &card.image_url {
    println!("{}", image);
  }
}
