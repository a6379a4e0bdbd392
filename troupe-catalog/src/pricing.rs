use serde::{Deserialize, Serialize};

use crate::destination::DiscountPolicy;

/// Snapshot of every input and output of a group quote. Stored on the Group
/// at formation so the price shown before matching can be reproduced after.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceBreakdown {
    pub base_price: f64,
    pub group_size: u32,
    pub discount_per_member: f64,
    pub max_discount: f64,
    /// Effective discount fraction actually applied.
    pub discount: f64,
    pub final_price_per_person: f64,
}

/// Group discount pricing.
///
/// Pure and deterministic: identical inputs always produce the identical
/// quote. Inputs are validated by callers before they get here.
pub struct PricingEngine;

impl PricingEngine {
    pub fn new() -> Self {
        Self
    }

    /// Discount fraction for a group of `group_size` travelers:
    /// `min(max_discount, discount_per_member * (group_size - 1))`.
    /// A party of one gets no discount.
    pub fn discount(&self, group_size: u32, policy: &DiscountPolicy) -> f64 {
        if group_size <= 1 {
            return 0.0;
        }
        let accrued = policy.discount_per_member * f64::from(group_size - 1);
        accrued.min(policy.max_discount)
    }

    /// Final per-person price, rounded to 2 decimal places.
    pub fn quote(&self, base_price: f64, group_size: u32, policy: &DiscountPolicy) -> PriceBreakdown {
        let discount = self.discount(group_size, policy);
        let final_price = round2(base_price * (1.0 - discount));
        PriceBreakdown {
            base_price,
            group_size,
            discount_per_member: policy.discount_per_member,
            max_discount: policy.max_discount,
            discount,
            final_price_per_person: final_price,
        }
    }
}

impl Default for PricingEngine {
    fn default() -> Self {
        Self::new()
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
