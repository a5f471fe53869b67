use anyhow::Result;
use serde_json::json;

use itr_calc::config::Config;
use itr_calc::models::TransactionKind;
use itr_calc::normalize::{parse_date, RawCell};
use itr_calc::valuation::Valuator;

use super::load_rates;
use crate::cli::formatters::format_rate_lookup;

pub async fn dispatch_rate(date: &str, config: &Config, json_output: bool) -> Result<()> {
    let transaction_date = parse_date(&RawCell::Text(date.to_string()))?;
    let rates = load_rates(config).await?;
    let valuator = Valuator::new(&rates);

    let month_end = valuator.convert_on(TransactionKind::Dividend.reference_date(transaction_date));
    let exact = valuator.convert_on(transaction_date);

    if json_output {
        let value = json!({
            "transaction_date": transaction_date,
            "month_end": month_end,
            "exact": exact,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
    } else {
        print!("{}", format_rate_lookup(transaction_date, &month_end, &exact));
    }
    Ok(())
}
