use super::ui;
use crate::core::analyzer::AnalysisReport;
use crate::core::{AnalyzeError, Analyzer, AssumptionOverrides};
use anyhow::{Result, bail};
use comfy_table::Cell;
use futures::future::join_all;
use tracing::{error, info};

impl AnalysisReport {
    pub fn display_as_table(&self) -> String {
        let data = &self.data;

        let mut valuation = ui::new_styled_table();
        valuation.set_header(vec![
            ui::header_cell("Price"),
            ui::header_cell("Intrinsic Value"),
            ui::header_cell("Upside"),
            ui::header_cell("Recommendation"),
        ]);
        valuation.add_row(vec![
            ui::number_cell(format!("{:.2}", data.current_price)),
            ui::number_cell(format!("{:.2}", data.valuation.intrinsic_value)),
            ui::upside_cell(data.valuation.upside),
            ui::recommendation_cell(data.valuation.recommendation),
        ]);

        let mut dcf = ui::new_styled_table();
        dcf.set_header(vec![ui::header_cell("DCF"), ui::header_cell("Value")]);
        for (label, value) in [
            ("Enterprise Value", data.dcf.enterprise_value),
            ("Equity Value", data.dcf.equity_value),
            ("PV of 5Y FCF", data.dcf.pv_fcf_5_year),
            ("PV of Terminal Value", data.dcf.pv_terminal_value),
            ("Terminal Value", data.dcf.terminal_value),
            ("Revenue (LTM)", data.financials.revenue_ltm),
            ("Market Cap", data.financials.market_cap),
        ] {
            dcf.add_row(vec![ui::label_cell(label), ui::millions_cell(value)]);
        }

        let mut projections = ui::new_styled_table();
        let mut header = vec![ui::header_cell("")];
        header.extend(
            (1..=data.dcf.fcf_projections.len()).map(|year| ui::header_cell(&format!("Year {year}"))),
        );
        projections.set_header(header);
        let mut row = vec![ui::label_cell("FCF")];
        row.extend(data.dcf.fcf_projections.iter().map(|fcf| ui::millions_cell(*fcf)));
        projections.add_row(row);

        let assumptions = &data.assumptions;
        let mut assumption_table = ui::new_styled_table();
        assumption_table.set_header(vec![
            ui::header_cell("Growth"),
            ui::header_cell("Terminal"),
            ui::header_cell("Margin"),
            ui::header_cell("Tax"),
            ui::header_cell("CapEx"),
            ui::header_cell("NWC"),
            ui::header_cell("WACC"),
            ui::header_cell("Beta"),
        ]);
        assumption_table.add_row(vec![
            ui::percent_cell(assumptions.revenue_growth),
            ui::percent_cell(assumptions.terminal_growth),
            ui::percent_cell(assumptions.operating_margin),
            ui::percent_cell(assumptions.tax_rate),
            ui::percent_cell(assumptions.capex_pct),
            ui::percent_cell(assumptions.nwc_pct),
            ui::percent_cell(assumptions.wacc),
            ui::number_cell(format!("{:.2}", data.financials.beta)),
        ]);

        let mut output = format!(
            "{} ({})\n\n",
            ui::style_text(&data.company_name, ui::StyleType::Title),
            ui::style_text(&data.ticker, ui::StyleType::TotalLabel)
        );
        output.push_str(&valuation.to_string());
        output.push_str("\n\n");
        output.push_str(&dcf.to_string());
        output.push_str("\n\n");
        output.push_str(&projections.to_string());
        output.push_str("\n\nAssumptions\n");
        output.push_str(&assumption_table.to_string());
        output.push_str(&format!(
            "\n\n{}",
            ui::style_text(
                &format!("Analysis ID: {}", self.analysis_id),
                ui::StyleType::Subtle
            )
        ));
        output
    }
}

fn display_failures(failures: &[(String, AnalyzeError)]) {
    let mut table = ui::new_styled_table();
    table.set_header(vec![ui::header_cell("Ticker"), ui::header_cell("Error")]);
    for (ticker, e) in failures {
        table.add_row(vec![
            Cell::new(ticker),
            Cell::new(ui::style_text(&e.to_string(), ui::StyleType::Error)),
        ]);
    }
    println!("{table}");
}

/// Values every ticker concurrently. Fails only if no ticker could be valued.
pub async fn run(
    analyzer: &Analyzer,
    tickers: &[String],
    overrides: Option<&AssumptionOverrides>,
    json: bool,
) -> Result<()> {
    if tickers.is_empty() {
        bail!("No tickers given");
    }
    info!("Analyzing {} ticker(s)...", tickers.len());

    let pb = ui::new_progress_bar(tickers.len() as u64);
    pb.set_message("Valuing");
    let futures = tickers.iter().map(|ticker| {
        let pb = pb.clone();
        async move {
            let result = analyzer.analyze(ticker, overrides).await;
            pb.inc(1);
            (ticker.clone(), result)
        }
    });
    let results = join_all(futures).await;
    pb.finish_and_clear();

    let mut reports = Vec::new();
    let mut failures = Vec::new();
    for (ticker, result) in results {
        match result {
            Ok(report) => reports.push(report),
            Err(e) => {
                error!(%ticker, error = %e, "Analysis failed");
                failures.push((ticker, e));
            }
        }
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&reports)?);
    } else {
        let count = reports.len();
        for (i, report) in reports.iter().enumerate() {
            println!("{}", report.display_as_table());
            if i + 1 < count {
                ui::print_separator();
            }
        }
        if !failures.is_empty() {
            println!();
            display_failures(&failures);
        }
    }

    if reports.is_empty() {
        bail!("All {} analyses failed", failures.len());
    }
    Ok(())
}
