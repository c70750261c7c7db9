use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

const GRAMS_PER_KG: Decimal = Decimal::ONE_THOUSAND;
const MINUTES_PER_HOUR: Decimal = Decimal::from_parts(60, 0, 0, false, 0);

/// Physical parameters of one printed item.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemInput {
    pub grams: Decimal,
    pub print_minutes: Decimal,
    pub labor_minutes: Decimal,
    pub quantity: Decimal,
    pub cost_per_kg: Decimal,
}

/// Shop-wide rates plus the per-quote percentages and pass-through costs.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalInput {
    pub machine_hourly_rate: Decimal,
    pub labor_per_minute: Decimal,
    pub overhead_fixed: Decimal,
    pub overhead_percent: Decimal,
    pub failure_rate_percent: Decimal,
    pub waste_percent: Decimal,
    pub margin_percent: Decimal,
    pub tax_enabled: bool,
    pub tax_percent: Decimal,
    pub packaging_cost: Decimal,
    pub shipping_cost: Decimal,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Breakdown {
    pub material_cost: Decimal,
    pub machine_cost: Decimal,
    pub labor_cost: Decimal,
    pub subtotal: Decimal,
    pub overhead: Decimal,
    pub failure_insurance: Decimal,
    pub packaging_cost: Decimal,
    pub shipping_cost: Decimal,
    pub margin: Decimal,
    pub tax: Decimal,
}

impl Breakdown {
    /// Sum of every component that reaches the customer price.
    pub fn total(&self) -> Decimal {
        [
            self.overhead,
            self.failure_insurance,
            self.packaging_cost,
            self.shipping_cost,
            self.margin,
            self.tax,
        ]
        .into_iter()
        .fold(self.subtotal, Decimal::saturating_add)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Totals {
    pub total: Decimal,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingResult {
    pub breakdown: Breakdown,
    pub totals: Totals,
}

pub trait PricingEngine: Send + Sync {
    fn price(&self, item: &ItemInput, global: &GlobalInput) -> PricingResult;
    fn price_batch(&self, items: &[ItemInput], global: &GlobalInput) -> PricingResult;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct DeterministicPricingEngine;

impl PricingEngine for DeterministicPricingEngine {
    fn price(&self, item: &ItemInput, global: &GlobalInput) -> PricingResult {
        calculate(item, global)
    }

    fn price_batch(&self, items: &[ItemInput], global: &GlobalInput) -> PricingResult {
        calculate_batch(items, global)
    }
}

/// Prices a single item. Material, machine and labor are reported per unit;
/// the subtotal carries the quantity.
///
/// Arithmetic saturates at `Decimal::MAX`/`Decimal::MIN` instead of panicking,
/// so the engine is total over any input; validation keeps real requests far
/// below that range.
pub fn calculate(item: &ItemInput, global: &GlobalInput) -> PricingResult {
    let unit = unit_costs(item, global);
    let subtotal = unit.sum().saturating_mul(item.quantity);

    apply_batch_costs(unit, subtotal, global)
}

/// Prices several items as one quote. Components are accumulated already
/// scaled by each item's quantity, so `subtotal == material + machine + labor`.
/// Overhead, failure insurance, margin and tax are applied once to the batch.
pub fn calculate_batch(items: &[ItemInput], global: &GlobalInput) -> PricingResult {
    let mut scaled = UnitCosts::default();
    for item in items {
        let unit = unit_costs(item, global).scaled(item.quantity);
        scaled.material = scaled.material.saturating_add(unit.material);
        scaled.machine = scaled.machine.saturating_add(unit.machine);
        scaled.labor = scaled.labor.saturating_add(unit.labor);
    }
    let subtotal = scaled.sum();

    apply_batch_costs(scaled, subtotal, global)
}

#[derive(Clone, Copy, Debug, Default)]
struct UnitCosts {
    material: Decimal,
    machine: Decimal,
    labor: Decimal,
}

impl UnitCosts {
    fn sum(&self) -> Decimal {
        self.material.saturating_add(self.machine).saturating_add(self.labor)
    }

    fn scaled(self, quantity: Decimal) -> Self {
        Self {
            material: self.material.saturating_mul(quantity),
            machine: self.machine.saturating_mul(quantity),
            labor: self.labor.saturating_mul(quantity),
        }
    }
}

fn unit_costs(item: &ItemInput, global: &GlobalInput) -> UnitCosts {
    UnitCosts {
        material: (item.grams / GRAMS_PER_KG)
            .saturating_mul(item.cost_per_kg)
            .saturating_mul(Decimal::ONE.saturating_add(percent(global.waste_percent))),
        machine: (item.print_minutes / MINUTES_PER_HOUR)
            .saturating_mul(global.machine_hourly_rate),
        labor: item.labor_minutes.saturating_mul(global.labor_per_minute),
    }
}

fn apply_batch_costs(
    components: UnitCosts,
    subtotal: Decimal,
    global: &GlobalInput,
) -> PricingResult {
    let overhead = global
        .overhead_fixed
        .saturating_add(subtotal.saturating_mul(percent(global.overhead_percent)));
    let failure_insurance = subtotal.saturating_mul(percent(global.failure_rate_percent));

    // Packaging and shipping are pass-through: no margin, no tax.
    let cost = subtotal.saturating_add(overhead).saturating_add(failure_insurance);
    let margin = percent(global.margin_percent).saturating_mul(cost);
    let tax = if global.tax_enabled {
        percent(global.tax_percent).saturating_mul(cost.saturating_add(margin))
    } else {
        Decimal::ZERO
    };

    let breakdown = Breakdown {
        material_cost: components.material,
        machine_cost: components.machine,
        labor_cost: components.labor,
        subtotal,
        overhead,
        failure_insurance,
        packaging_cost: global.packaging_cost,
        shipping_cost: global.shipping_cost,
        margin,
        tax,
    };
    let totals = Totals { total: breakdown.total() };

    PricingResult { breakdown, totals }
}

fn percent(value: Decimal) -> Decimal {
    value / Decimal::ONE_HUNDRED
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::{
        calculate, calculate_batch, DeterministicPricingEngine, GlobalInput, ItemInput,
        PricingEngine,
    };

    fn dec(value: i64) -> Decimal {
        Decimal::from(value)
    }

    fn kilo_of_ten() -> ItemInput {
        ItemInput {
            grams: dec(1000),
            quantity: dec(1),
            cost_per_kg: dec(10),
            ..ItemInput::default()
        }
    }

    #[test]
    fn quantity_scales_the_summed_unit_costs() {
        let item = ItemInput {
            grams: dec(200),
            print_minutes: dec(30),
            labor_minutes: dec(10),
            quantity: dec(3),
            cost_per_kg: dec(20),
        };
        let global = GlobalInput {
            machine_hourly_rate: dec(60),
            labor_per_minute: Decimal::new(5, 1),
            ..GlobalInput::default()
        };

        let result = calculate(&item, &global);

        assert_eq!(result.breakdown.material_cost, dec(4));
        assert_eq!(result.breakdown.machine_cost, dec(30));
        assert_eq!(result.breakdown.labor_cost, dec(5));
        assert_eq!(result.breakdown.subtotal, dec(117));
        assert_eq!(result.totals.total, dec(117));
    }

    #[test]
    fn waste_percent_inflates_material_only() {
        let without_waste = calculate(&kilo_of_ten(), &GlobalInput::default());
        let with_waste = calculate(
            &kilo_of_ten(),
            &GlobalInput { waste_percent: dec(5), ..GlobalInput::default() },
        );

        assert_eq!(without_waste.breakdown.material_cost, dec(10));
        assert_eq!(with_waste.breakdown.material_cost, Decimal::new(105, 1));
        assert_eq!(without_waste.totals.total, dec(10));
        assert_eq!(with_waste.totals.total, Decimal::new(105, 1));
    }

    #[test]
    fn zero_waste_material_cost_is_exact_kilograms_times_rate() {
        let item = ItemInput {
            grams: dec(333),
            quantity: dec(1),
            cost_per_kg: Decimal::new(2799, 2),
            ..ItemInput::default()
        };

        let result = calculate(&item, &GlobalInput::default());

        assert_eq!(result.breakdown.material_cost, (dec(333) / dec(1000)) * Decimal::new(2799, 2));
    }

    #[test]
    fn margin_applies_to_cost_before_pass_through() {
        let without_margin = calculate(&kilo_of_ten(), &GlobalInput::default());
        let with_margin = calculate(
            &kilo_of_ten(),
            &GlobalInput {
                margin_percent: dec(30),
                packaging_cost: dec(7),
                shipping_cost: dec(11),
                ..GlobalInput::default()
            },
        );

        assert_eq!(without_margin.breakdown.margin, Decimal::ZERO);
        assert_eq!(with_margin.breakdown.margin, dec(3));
        assert_eq!(with_margin.totals.total, dec(31));
    }

    #[test]
    fn tax_is_zero_when_disabled_regardless_of_rate() {
        let global = GlobalInput {
            margin_percent: dec(30),
            tax_percent: dec(16),
            ..GlobalInput::default()
        };
        let without_tax = calculate(&kilo_of_ten(), &global);
        let with_tax =
            calculate(&kilo_of_ten(), &GlobalInput { tax_enabled: true, ..global.clone() });

        assert_eq!(without_tax.breakdown.tax, Decimal::ZERO);
        assert_eq!(with_tax.breakdown.tax, Decimal::new(208, 2));
        assert_eq!(without_tax.totals.total, dec(13));
        assert_eq!(with_tax.totals.total, Decimal::new(1508, 2));
    }

    #[test]
    fn overhead_combines_fixed_and_percent_of_subtotal() {
        let item = ItemInput {
            grams: dec(500),
            print_minutes: dec(60),
            labor_minutes: dec(15),
            quantity: dec(2),
            cost_per_kg: dec(20),
        };
        let global = GlobalInput {
            machine_hourly_rate: dec(30),
            labor_per_minute: dec(1),
            overhead_fixed: dec(10),
            overhead_percent: dec(20),
            ..GlobalInput::default()
        };

        let result = calculate(&item, &global);

        assert_eq!(result.breakdown.subtotal, dec(110));
        assert_eq!(result.breakdown.overhead, dec(32));
        assert_eq!(result.totals.total, dec(142));
    }

    #[test]
    fn failure_insurance_is_a_cut_of_the_subtotal() {
        let result = calculate(
            &kilo_of_ten(),
            &GlobalInput { failure_rate_percent: dec(10), ..GlobalInput::default() },
        );

        assert_eq!(result.breakdown.failure_insurance, dec(1));
        assert_eq!(result.totals.total, dec(11));
    }

    #[test]
    fn zero_quantity_yields_zero_variable_costs() {
        let item = ItemInput { quantity: Decimal::ZERO, ..kilo_of_ten() };
        let global = GlobalInput { margin_percent: dec(50), ..GlobalInput::default() };
        let result = calculate(&item, &global);

        assert_eq!(result.breakdown.subtotal, Decimal::ZERO);
        assert_eq!(result.totals.total, Decimal::ZERO);
    }

    #[test]
    fn total_matches_breakdown_sum_for_a_full_configuration() {
        let item = ItemInput {
            grams: dec(137),
            print_minutes: dec(47),
            labor_minutes: dec(12),
            quantity: dec(4),
            cost_per_kg: Decimal::new(8550, 2),
        };
        let global = GlobalInput {
            machine_hourly_rate: dec(2500),
            labor_per_minute: dec(300),
            overhead_fixed: dec(1500),
            overhead_percent: dec(8),
            failure_rate_percent: dec(5),
            waste_percent: dec(7),
            margin_percent: dec(35),
            tax_enabled: true,
            tax_percent: dec(19),
            packaging_cost: dec(2000),
            shipping_cost: dec(12000),
        };

        let result = calculate(&item, &global);
        let b = &result.breakdown;

        assert_eq!(b.subtotal, (b.material_cost + b.machine_cost + b.labor_cost) * dec(4));
        assert_eq!(
            result.totals.total,
            b.subtotal
                + b.overhead
                + b.failure_insurance
                + b.packaging_cost
                + b.shipping_cost
                + b.margin
                + b.tax
        );
    }

    #[test]
    fn batch_applies_overhead_once_over_combined_subtotal() {
        let items = vec![
            ItemInput {
                grams: dec(500),
                quantity: dec(2),
                cost_per_kg: dec(20),
                ..ItemInput::default()
            },
            ItemInput { labor_minutes: dec(10), quantity: dec(3), ..ItemInput::default() },
        ];
        let global = GlobalInput {
            labor_per_minute: dec(1),
            overhead_fixed: dec(10),
            overhead_percent: dec(10),
            ..GlobalInput::default()
        };

        let result = calculate_batch(&items, &global);
        let b = &result.breakdown;

        assert_eq!(b.material_cost, dec(20));
        assert_eq!(b.labor_cost, dec(30));
        assert_eq!(b.subtotal, dec(50));
        assert_eq!(b.subtotal, b.material_cost + b.machine_cost + b.labor_cost);
        assert_eq!(b.overhead, dec(15));
        assert_eq!(result.totals.total, dec(65));
    }

    #[test]
    fn single_item_batch_matches_single_item_totals() {
        let item = ItemInput {
            grams: dec(200),
            print_minutes: dec(30),
            labor_minutes: dec(10),
            quantity: dec(3),
            cost_per_kg: dec(20),
        };
        let global = GlobalInput {
            machine_hourly_rate: dec(60),
            labor_per_minute: Decimal::new(5, 1),
            margin_percent: dec(20),
            tax_enabled: true,
            tax_percent: dec(19),
            ..GlobalInput::default()
        };

        let single = calculate(&item, &global);
        let batch = calculate_batch(std::slice::from_ref(&item), &global);

        assert_eq!(single.breakdown.subtotal, batch.breakdown.subtotal);
        assert_eq!(single.totals, batch.totals);
    }

    #[test]
    fn overflowing_inputs_saturate_instead_of_panicking() {
        let item = ItemInput {
            labor_minutes: Decimal::from_scientific("1e27").expect("decimal"),
            quantity: dec(1),
            ..ItemInput::default()
        };
        let global = GlobalInput {
            labor_per_minute: dec(300),
            margin_percent: dec(50),
            tax_enabled: true,
            tax_percent: dec(19),
            ..GlobalInput::default()
        };

        let single = calculate(&item, &global);
        assert_eq!(single.breakdown.labor_cost, Decimal::MAX);
        assert_eq!(single.totals.total, Decimal::MAX);

        let batch = calculate_batch(&[item.clone(), item], &global);
        assert_eq!(batch.breakdown.subtotal, Decimal::MAX);
        assert_eq!(batch.totals.total, Decimal::MAX);
    }

    #[test]
    fn engine_trait_delegates_to_pure_functions() {
        let engine = DeterministicPricingEngine;
        let global = GlobalInput::default();

        assert_eq!(engine.price(&kilo_of_ten(), &global), calculate(&kilo_of_ten(), &global));
        assert_eq!(
            engine.price_batch(&[kilo_of_ten()], &global).totals.total,
            calculate(&kilo_of_ten(), &global).totals.total
        );
    }
}
