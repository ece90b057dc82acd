//! Production feasibility.
//!
//! Decides whether the raw-material stock covers a production order, given the
//! product's bill-of-material lines. The check is pure: it never touches stock,
//! it only produces the consumption plan that a caller applies inside its own
//! transaction.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// One bill-of-material line joined with its material's current stock.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MaterialRequirement {
    pub material_id: i64,
    pub material_name: String,
    pub required_per_unit: i32,
    pub available_stock: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MaterialShortfall {
    pub material_id: i64,
    pub material_name: String,
    pub required: i64,
    pub available: i64,
}

impl MaterialShortfall {
    pub fn missing(&self) -> i64 {
        self.required - self.available
    }
}

impl std::fmt::Display for MaterialShortfall {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} (id {}): requires {}, available {}",
            self.material_name, self.material_id, self.required, self.available
        )
    }
}

/// Quantity of one material consumed when the order starts.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MaterialConsumption {
    pub material_id: i64,
    pub material_name: String,
    pub quantity: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FeasibilityError {
    #[error("order quantity must be positive, got {0}")]
    InvalidQuantity(i32),

    #[error("insufficient stock for {}", describe_shortfalls(.0))]
    InsufficientStock(Vec<MaterialShortfall>),

    #[error("required quantity of material {material_id} is out of range")]
    RequirementOverflow { material_id: i64 },
}

fn describe_shortfalls(shortfalls: &[MaterialShortfall]) -> String {
    shortfalls
        .iter()
        .map(|s| s.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Checks that every material required by `lines` is available for
/// `order_quantity` units.
///
/// Lines naming the same material are summed before comparison. All
/// shortfalls are reported, ordered by material id. A total that does not fit
/// in an `i64` fails with `RequirementOverflow`.
pub fn check_feasibility(
    order_quantity: i32,
    lines: &[MaterialRequirement],
) -> Result<Vec<MaterialConsumption>, FeasibilityError> {
    if order_quantity <= 0 {
        return Err(FeasibilityError::InvalidQuantity(order_quantity));
    }

    // material id -> (name, available, required total)
    let mut totals: BTreeMap<i64, (String, i64, i64)> = BTreeMap::new();
    for line in lines {
        let required = i64::from(line.required_per_unit) * i64::from(order_quantity);
        let entry = totals
            .entry(line.material_id)
            .or_insert_with(|| (line.material_name.clone(), i64::from(line.available_stock), 0));
        entry.2 = entry
            .2
            .checked_add(required)
            .ok_or(FeasibilityError::RequirementOverflow {
                material_id: line.material_id,
            })?;
    }

    let shortfalls: Vec<MaterialShortfall> = totals
        .iter()
        .filter(|(_, (_, available, required))| required > available)
        .map(|(id, (name, available, required))| MaterialShortfall {
            material_id: *id,
            material_name: name.clone(),
            required: *required,
            available: *available,
        })
        .collect();

    if !shortfalls.is_empty() {
        return Err(FeasibilityError::InsufficientStock(shortfalls));
    }

    Ok(totals
        .into_iter()
        .map(|(material_id, (material_name, _, quantity))| MaterialConsumption {
            material_id,
            material_name,
            quantity,
        })
        .collect())
}

/// Read-only answer to "could this order start now?".
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FeasibilityReport {
    pub production_order_id: i64,
    pub product_id: i64,
    pub quantity: i32,
    pub feasible: bool,
    pub consumption: Vec<MaterialConsumption>,
    pub shortfalls: Vec<MaterialShortfall>,
}

impl FeasibilityReport {
    pub fn evaluate(
        production_order_id: i64,
        product_id: i64,
        quantity: i32,
        lines: &[MaterialRequirement],
    ) -> Self {
        let (feasible, consumption, shortfalls) = match check_feasibility(quantity, lines) {
            Ok(plan) => (true, plan, Vec::new()),
            Err(FeasibilityError::InsufficientStock(shortfalls)) => (false, Vec::new(), shortfalls),
            Err(FeasibilityError::InvalidQuantity(_) | FeasibilityError::RequirementOverflow { .. }) => {
                (false, Vec::new(), Vec::new())
            }
        };
        Self {
            production_order_id,
            product_id,
            quantity,
            feasible,
            consumption,
            shortfalls,
        }
    }
}
