//! `pharmabot search` — Rank the live inventory against a query.

use pharmabot_agent::Ranker;

pub async fn run(query: String, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config()?;
    let source = pharmabot_inventory::source_from_config(&config.inventory);

    let products = source
        .fetch()
        .await
        .map_err(|e| format!("Inventory fetch failed ({}): {e}", source.name()))?;

    let ranker = Ranker::new(config.ranking.clone());
    let matches = ranker.rank_scored(&query, &products);

    if json {
        println!("{}", serde_json::to_string_pretty(&matches)?);
        return Ok(());
    }

    println!(
        "🔎 \"{query}\" — {} match(es) from {} product(s)",
        matches.len(),
        products.len()
    );
    println!("   Terms: {}", ranker.expand_terms(&query).join(", "));
    println!();

    if matches.is_empty() {
        println!("  No matching products.");
        return Ok(());
    }

    for (i, m) in matches.iter().enumerate() {
        let price = m.record.price().map(|p| format!("  ({p})")).unwrap_or_default();
        println!("  {:>2}. [{:>3}] {}{price}", i + 1, m.score, m.record.name());
    }

    Ok(())
}
