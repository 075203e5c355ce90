//! `pharmabot inventory` — Fetch the product list and show a sample.

use std::time::Instant;

pub async fn run(limit: usize) -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config()?;
    let source = pharmabot_inventory::source_from_config(&config.inventory);

    let location = match &config.inventory.file {
        Some(path) => path.display().to_string(),
        None => config.inventory.url.clone(),
    };
    println!("📦 Inventory ({}): {location}", source.name());

    let started = Instant::now();
    let products = source
        .fetch()
        .await
        .map_err(|e| format!("Inventory fetch failed: {e}"))?;

    println!(
        "   {} product(s) in {} ms",
        products.len(),
        started.elapsed().as_millis()
    );
    println!();

    for product in products.iter().take(limit) {
        let name = product.name();
        let name = if name.is_empty() { "(unnamed)" } else { name.as_str() };
        match product.price() {
            Some(price) => println!("  • {name} — {price}"),
            None => println!("  • {name}"),
        }
    }

    if products.len() > limit {
        println!("  … and {} more", products.len() - limit);
    }

    Ok(())
}
