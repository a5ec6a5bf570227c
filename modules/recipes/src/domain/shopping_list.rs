use crate::contract::model::ShoppingListItem;

/// Order lines by ingredient name, then unit.
pub fn sort_items(items: &mut [ShoppingListItem]) {
    items.sort_by(|a, b| {
        a.name
            .cmp(&b.name)
            .then_with(|| a.measurement_unit.cmp(&b.measurement_unit))
    });
}

/// Render the downloadable plain-text list: a title line, a blank line, then
/// one `"<name> - <total> <unit>."` line per item.
pub fn render(title: &str, items: &[ShoppingListItem]) -> String {
    let mut out = String::with_capacity(title.len() + 2 + items.len() * 32);
    out.push_str(title);
    out.push_str("\n\n");
    for item in items {
        out.push_str(&format!(
            "{} - {} {}.\n",
            item.name, item.total_amount, item.measurement_unit
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(name: &str, unit: &str, total: i64) -> ShoppingListItem {
        ShoppingListItem {
            name: name.into(),
            measurement_unit: unit.into(),
            total_amount: total,
        }
    }

    #[test]
    fn render_lines_in_order() {
        let items = vec![item("flour", "g", 500), item("sugar", "g", 100)];
        assert_eq!(
            render("Shopping list", &items),
            "Shopping list\n\nflour - 500 g.\nsugar - 100 g.\n"
        );
    }

    #[test]
    fn render_empty_list_has_only_title() {
        assert_eq!(render("Buy", &[]), "Buy\n\n");
    }

    #[test]
    fn sort_by_name_then_unit() {
        let mut items = vec![
            item("salt", "pinch", 1),
            item("egg", "pcs", 2),
            item("salt", "g", 5),
        ];
        sort_items(&mut items);
        let keys: Vec<_> = items
            .iter()
            .map(|i| (i.name.as_str(), i.measurement_unit.as_str()))
            .collect();
        assert_eq!(keys, vec![("egg", "pcs"), ("salt", "g"), ("salt", "pinch")]);
    }
}
