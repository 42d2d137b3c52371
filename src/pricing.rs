// Price calculator - what to charge per hour, day and month
// to cover fixed costs and a target salary, plus margin and taxes

use crate::money::Amount;
use serde::{Deserialize, Serialize};

pub const DEFAULT_SALARY: f64 = 5000.0;
pub const DEFAULT_HOURS_PER_MONTH: f64 = 160.0;
pub const DEFAULT_MARGIN_PERCENT: f64 = 30.0;
pub const DEFAULT_TAX_PERCENT: f64 = 15.0;
pub const HOURS_PER_DAY: f64 = 8.0;

/// Calculator inputs, as read from the form.
///
/// A zero in salary, hours, margin or taxes means "not filled in" and is
/// replaced by the default, so a 0% margin cannot be expressed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PricingInput {
    pub rent: f64,
    pub internet: f64,
    pub software: f64,
    pub other_costs: f64,
    pub desired_salary: f64,
    pub hours_per_month: f64,
    pub margin_percent: f64,
    pub tax_percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceQuote {
    pub hourly: f64,
    pub daily: f64,
    pub monthly: f64,
}

impl PricingInput {
    pub fn fixed_costs(&self) -> f64 {
        self.rent + self.internet + self.software + self.other_costs
    }

    pub fn quote(&self) -> PriceQuote {
        let salary = or_default(self.desired_salary, DEFAULT_SALARY);
        let hours = or_default(self.hours_per_month, DEFAULT_HOURS_PER_MONTH);
        let margin = or_default(self.margin_percent, DEFAULT_MARGIN_PERCENT);
        let taxes = or_default(self.tax_percent, DEFAULT_TAX_PERCENT);

        let total_cost = self.fixed_costs() + salary;
        let with_margin = total_cost * (1.0 + margin / 100.0);
        let monthly = with_margin * (1.0 + taxes / 100.0);

        let hourly = monthly / hours;

        PriceQuote {
            hourly,
            daily: hourly * HOURS_PER_DAY,
            monthly,
        }
    }
}

impl PriceQuote {
    pub fn hourly_amount(&self) -> Amount {
        Amount::from_f64(self.hourly)
    }

    pub fn daily_amount(&self) -> Amount {
        Amount::from_f64(self.daily)
    }

    pub fn monthly_amount(&self) -> Amount {
        Amount::from_f64(self.monthly)
    }

    pub fn summary(&self) -> String {
        format!(
            "Hora: {} | Dia: {} | Mês: {}",
            self.hourly_amount(),
            self.daily_amount(),
            self.monthly_amount()
        )
    }
}

fn or_default(value: f64, default: f64) -> f64 {
    if value == 0.0 || value.is_nan() {
        default
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-6
    }

    #[test]
    fn test_defaults_apply_to_empty_form() {
        let quote = PricingInput::default().quote();

        // 5000 * 1.30 * 1.15
        assert!(close(quote.monthly, 7475.0));
        assert!(close(quote.hourly, 7475.0 / 160.0));
        assert!(close(quote.daily, 7475.0 / 160.0 * 8.0));
    }

    #[test]
    fn test_fixed_costs_are_added_before_margin() {
        let input = PricingInput {
            rent: 1000.0,
            internet: 100.0,
            software: 200.0,
            other_costs: 700.0,
            desired_salary: 8000.0,
            hours_per_month: 100.0,
            margin_percent: 20.0,
            tax_percent: 10.0,
        };

        let quote = input.quote();

        assert!(close(input.fixed_costs(), 2000.0));
        assert!(close(quote.monthly, 10_000.0 * 1.2 * 1.1));
        assert!(close(quote.hourly, 132.0));
        assert!(close(quote.daily, 1056.0));
    }

    #[test]
    fn test_summary_uses_currency_mask() {
        let quote = PricingInput::default().quote();
        assert_eq!(quote.monthly_amount().to_string(), "R$ 7.475,00");
        assert_eq!(quote.summary(), "Hora: R$ 46,72 | Dia: R$ 373,75 | Mês: R$ 7.475,00");
    }
}
