//! Validation helpers shared by the order and sale creation paths

use rust_decimal::Decimal;

/// A requested line item must carry a strictly positive quantity
pub fn validate_item_quantity(quantity: i32) -> Result<(), &'static str> {
    if quantity <= 0 {
        return Err("La quantité doit être positive");
    }
    Ok(())
}

/// Orders and sales must contain at least one line item
pub fn validate_has_items<T>(items: &[T]) -> Result<(), &'static str> {
    if items.is_empty() {
        return Err("Au moins un article est requis");
    }
    Ok(())
}

/// Discounts cannot be negative
pub fn validate_discount(discount: Decimal) -> Result<(), &'static str> {
    if discount < Decimal::ZERO {
        return Err("La remise ne peut pas être négative");
    }
    Ok(())
}

/// Sum of `quantity × unit_price` over line items
pub fn items_total(items: &[(i32, Decimal)]) -> Decimal {
    items
        .iter()
        .map(|(qty, price)| Decimal::from(*qty) * *price)
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_and_negative_quantities_are_rejected() {
        assert!(validate_item_quantity(0).is_err());
        assert!(validate_item_quantity(-5).is_err());
        assert!(validate_item_quantity(1).is_ok());
    }

    #[test]
    fn empty_item_list_is_rejected() {
        assert!(validate_has_items::<i32>(&[]).is_err());
        assert!(validate_has_items(&[1]).is_ok());
    }

    #[test]
    fn total_sums_item_subtotals() {
        let items = [(3, Decimal::from(500)), (1, Decimal::from(1200))];
        assert_eq!(items_total(&items), Decimal::from(2700));
    }
}
