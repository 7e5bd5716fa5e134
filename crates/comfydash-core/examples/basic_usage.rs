//! Basic usage example - scan a ComfyUI installation without writing a catalog

use comfydash_core::{CancellationToken, CatalogScanner, Result, ScanRequest};

#[tokio::main]
async fn main() -> Result<()> {
    // Get path from args or use current directory
    let path = std::env::args().nth(1).unwrap_or_else(|| ".".to_string());

    println!("Scanning {}", path);

    let request = ScanRequest::new(&path).persist(false);
    let outcome = CatalogScanner::scan_async(request, CancellationToken::new()).await?;

    if outcome.catalog.items.is_empty() {
        println!("No models found.");
    } else {
        println!("Found {} models:", outcome.catalog.item_count);
        for item in &outcome.catalog.items {
            println!(
                "  - [{}] {} ({}, {})",
                item.category, item.display_name, item.base_model, item.id
            );
        }
    }

    Ok(())
}
