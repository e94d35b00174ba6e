use pnptv_bot::models::Plan;
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup};
use url::Url;

pub fn build_plans_keyboard(plans: &[Plan]) -> InlineKeyboardMarkup {
    let rows: Vec<Vec<InlineKeyboardButton>> = plans
        .iter()
        .map(|plan| {
            let label = if plan.is_lifetime() {
                format!("{} — {} {} (lifetime)", plan.name, plan.price, plan.currency)
            } else {
                format!(
                    "{} — {} {} / {} days",
                    plan.name,
                    plan.price,
                    plan.currency,
                    plan.duration_days.unwrap_or(0)
                )
            };
            vec![InlineKeyboardButton::callback(
                label,
                format!("plan:{}", plan.id),
            )]
        })
        .collect();

    InlineKeyboardMarkup::new(rows)
}

pub fn build_checkout_keyboard(checkout_url: &str) -> Option<InlineKeyboardMarkup> {
    let url = Url::parse(checkout_url).ok()?;

    Some(InlineKeyboardMarkup::new(vec![vec![
        InlineKeyboardButton::url("💳 Pay now", url),
    ]]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use bigdecimal::BigDecimal;
    use chrono::Utc;
    use std::str::FromStr;

    fn plan(id: &str, name: &str, duration_days: Option<i32>) -> Plan {
        Plan {
            id: id.to_string(),
            name: name.to_string(),
            price: BigDecimal::from_str("14.99").unwrap(),
            currency: "USD".to_string(),
            duration_days,
            tier: "basic".to_string(),
            is_active: true,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn one_row_per_plan() {
        let plans = vec![
            plan("basic-30", "Basic", Some(30)),
            plan("premium-lifetime", "Premium Lifetime", None),
        ];

        let markup = build_plans_keyboard(&plans);
        assert_eq!(markup.inline_keyboard.len(), 2);
        assert!(markup.inline_keyboard[0][0].text.contains("Basic"));
        assert!(markup.inline_keyboard[0][0].text.contains("30 days"));
        assert!(markup.inline_keyboard[1][0].text.contains("lifetime"));
    }

    #[test]
    fn checkout_keyboard_requires_a_valid_url() {
        assert!(build_checkout_keyboard("https://pay.daimo.com/p/abc").is_some());
        assert!(build_checkout_keyboard("not a url").is_none());
    }
}
