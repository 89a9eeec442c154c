//! Order lines shared by point orders and distribution orders.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use livebase_core::{DomainError, DomainResult, line_amount, sum_amounts};
use livebase_products::GoodsId;

/// Order line: goods, quantity, unit price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SalesLine {
    pub line_no: u32,
    pub goods_id: GoodsId,
    pub quantity: i64,
    /// Price in minor units.
    pub unit_price: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SalesLineInput {
    pub goods_id: GoodsId,
    pub quantity: i64,
    pub unit_price: i64,
}

/// Validate and number lines; repeated goods with the same price are merged.
pub fn build_lines(inputs: &[SalesLineInput]) -> DomainResult<Vec<SalesLine>> {
    if inputs.is_empty() {
        return Err(DomainError::validation("order needs at least one line"));
    }
    let mut lines: Vec<SalesLine> = Vec::with_capacity(inputs.len());
    for input in inputs {
        if input.quantity <= 0 {
            return Err(DomainError::validation("quantity must be positive"));
        }
        if input.unit_price < 0 {
            return Err(DomainError::validation("unit_price must not be negative"));
        }
        match lines.iter_mut().find(|l| l.goods_id == input.goods_id) {
            Some(line) if line.unit_price == input.unit_price => {
                line.quantity = line
                    .quantity
                    .checked_add(input.quantity)
                    .ok_or_else(|| DomainError::validation("quantity overflow"))?;
            }
            Some(_) => {
                return Err(DomainError::validation(format!(
                    "goods {} appears twice with different prices",
                    input.goods_id
                )));
            }
            None => lines.push(SalesLine {
                line_no: lines.len() as u32 + 1,
                goods_id: input.goods_id,
                quantity: input.quantity,
                unit_price: input.unit_price,
            }),
        }
    }
    Ok(lines)
}

pub fn total(lines: &[SalesLine]) -> DomainResult<i64> {
    sum_amounts(
        lines
            .iter()
            .map(|l| line_amount(l.quantity, l.unit_price))
            .collect::<DomainResult<Vec<_>>>()?,
    )
}

/// Quantity per goods.
pub fn quantities(lines: &[SalesLine]) -> BTreeMap<GoodsId, i64> {
    let mut out = BTreeMap::new();
    for l in lines {
        *out.entry(l.goods_id).or_insert(0) += l.quantity;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(goods: GoodsId, quantity: i64, unit_price: i64) -> SalesLineInput {
        SalesLineInput {
            goods_id: goods,
            quantity,
            unit_price,
        }
    }

    #[test]
    fn merges_and_totals() {
        let g = GoodsId::new();
        let lines = build_lines(&[input(g, 1, 10), input(GoodsId::new(), 2, 5), input(g, 2, 10)]).unwrap();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].quantity, 3);
        assert_eq!(total(&lines).unwrap(), 40);
        assert_eq!(quantities(&lines)[&g], 3);
    }

    #[test]
    fn rejects_invalid_lines() {
        let g = GoodsId::new();
        assert!(build_lines(&[]).is_err());
        assert!(build_lines(&[input(g, -1, 1)]).is_err());
        assert!(build_lines(&[input(g, 1, -1)]).is_err());
        assert!(build_lines(&[input(g, 1, 1), input(g, 1, 2)]).is_err());
    }
}
