use super::item::{Category, Item};

#[derive(Debug, Clone, PartialEq)]
pub struct CategoryStat {
  pub category: Category,
  pub count: usize,
  /// Purchase value for active categories, sale revenue for `Sold`
  pub value: f64,
}

/// Aggregate valuation, keeping the active collection apart from sales history.
#[derive(Debug, Clone, PartialEq)]
pub struct CollectionStats {
  pub active_count: usize,
  pub active_value: f64,
  pub sold_count: usize,
  pub sales_revenue: f64,
  pub realized_profit: f64,
  pub by_category: Vec<CategoryStat>,
}

impl CollectionStats {
  pub fn compute(items: &[Item]) -> Self {
    let (sold, active): (Vec<&Item>, Vec<&Item>) = items.iter().partition(|item| item.is_sold());

    let mut by_category: Vec<CategoryStat> = Category::ACTIVE
      .iter()
      .map(|category| {
        let members = active.iter().filter(|item| item.category == *category);
        CategoryStat {
          category: *category,
          count: members.clone().count(),
          value: members.map(|item| item.price).sum(),
        }
      })
      .collect();

    let sales_revenue: f64 = sold.iter().filter_map(|item| item.sale_price).sum();
    by_category.push(CategoryStat {
      category: Category::Sold,
      count: sold.len(),
      value: sales_revenue,
    });

    Self {
      active_count: active.len(),
      active_value: active.iter().map(|item| item.price).sum(),
      sold_count: sold.len(),
      sales_revenue,
      realized_profit: sold.iter().filter_map(|item| item.profit()).sum(),
      by_category,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::collection::Collection;

  #[test]
  fn test_stats_split_active_and_sold() {
    let mut collection = Collection::default();

    let mut raw = Item::new("Charizard", "Base Set", Category::Ungraded);
    raw.price = 100.0;
    let raw_id = collection.add(raw);

    let mut slab = Item::new("Pikachu", "Base Set", Category::Graded);
    slab.price = 50.0;
    collection.add(slab);

    let mut sealed = Item::new("Tin", "Jungle", Category::Sealed);
    sealed.price = 30.0;
    collection.add(sealed);

    collection.mark_sold(&raw_id.to_string(), 160.0, None).unwrap();

    let stats = CollectionStats::compute(collection.items());
    assert_eq!(stats.active_count, 2);
    assert_eq!(stats.active_value, 80.0);
    assert_eq!(stats.sold_count, 1);
    assert_eq!(stats.sales_revenue, 160.0);
    assert_eq!(stats.realized_profit, 60.0);

    assert_eq!(stats.by_category.len(), 4);
    assert_eq!(stats.by_category[0].category, Category::Ungraded);
    assert_eq!(stats.by_category[0].count, 0);
    assert_eq!(stats.by_category[1].value, 50.0);
    assert_eq!(stats.by_category[3].category, Category::Sold);
    assert_eq!(stats.by_category[3].value, 160.0);
  }

  #[test]
  fn test_empty_collection() {
    let stats = CollectionStats::compute(&[]);
    assert_eq!(stats.active_count, 0);
    assert_eq!(stats.realized_profit, 0.0);
  }
}
