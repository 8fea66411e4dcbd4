use super::ui;
use crate::core::{AnalysisSummary, Analyzer};
use anyhow::{Result, bail};
use comfy_table::Cell;

pub fn display_as_table(summaries: &[AnalysisSummary]) -> String {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Date"),
        ui::header_cell("Ticker"),
        ui::header_cell("Company"),
        ui::header_cell("Price"),
        ui::header_cell("Intrinsic Value"),
        ui::header_cell("Recommendation"),
        ui::header_cell("Saved"),
        ui::header_cell("ID"),
    ]);
    for summary in summaries {
        table.add_row(vec![
            Cell::new(summary.analysis_date.format("%Y-%m-%d %H:%M")),
            Cell::new(&summary.ticker),
            Cell::new(&summary.company_name),
            ui::number_cell(format!("{:.2}", summary.current_price)),
            ui::number_cell(format!("{:.2}", summary.intrinsic_value)),
            ui::recommendation_cell(summary.recommendation),
            Cell::new(if summary.saved { "yes" } else { "" }),
            Cell::new(ui::style_text(&summary.id, ui::StyleType::Subtle)),
        ]);
    }
    table.to_string()
}

pub async fn run(analyzer: &Analyzer, limit: usize) -> Result<()> {
    let summaries = analyzer.history(limit).await?;
    if summaries.is_empty() {
        println!("No analyses found.");
        return Ok(());
    }
    println!(
        "{}\n",
        ui::style_text("Recent analyses", ui::StyleType::Title)
    );
    println!("{}", display_as_table(&summaries));
    Ok(())
}

pub async fn save(analyzer: &Analyzer, id: &str) -> Result<()> {
    match analyzer.save(id).await? {
        Some(analysis) => {
            println!(
                "Saved analysis of {} ({})",
                ui::style_text(&analysis.ticker, ui::StyleType::TotalLabel),
                analysis.id
            );
            Ok(())
        }
        None => bail!("Analysis not found: {id}"),
    }
}

pub async fn delete(analyzer: &Analyzer, id: &str) -> Result<()> {
    if !analyzer.delete(id).await? {
        bail!("Analysis not found: {id}");
    }
    println!("Deleted analysis {id}");
    Ok(())
}

pub async fn purge(analyzer: &Analyzer) -> Result<()> {
    let purged = analyzer.purge().await?;
    println!("Purged {purged} expired analyses");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::analysis::fixtures;
    use chrono::Utc;

    #[test]
    fn test_history_table_lists_each_analysis() {
        let first = fixtures::analysis("AAPL", Utc::now()).summary();
        let mut second = fixtures::analysis("MSFT", Utc::now()).summary();
        second.saved = true;

        let rendered = display_as_table(&[first.clone(), second]);
        assert!(rendered.contains("AAPL"));
        assert!(rendered.contains("MSFT"));
        assert!(rendered.contains("yes"));
        assert!(rendered.contains(first.recommendation.as_str()));
    }
}
