// medcart_server/src/db/seed.rs

use crate::errors::Result;
use medcart::{NewProduct, ProductStore};

/// `(name, description, price_cents, stock)`
const DEMO_CATALOG: &[(&str, &str, i64, i32)] = &[
  ("Digital Stethoscope", "Amplified acoustic stethoscope with noise reduction.", 18_900, 25),
  ("Pulse Oximeter", "Fingertip SpO2 and pulse-rate monitor.", 2_999, 120),
  ("Blood Pressure Monitor", "Automatic upper-arm cuff with memory for two users.", 5_450, 60),
  ("Infrared Thermometer", "Non-contact forehead thermometer, one-second reading.", 3_200, 90),
  ("Nitrile Examination Gloves (100)", "Powder-free, latex-free, size M.", 1_250, 400),
  ("Portable Nebulizer", "Quiet mesh nebulizer for adults and children.", 7_800, 35),
  ("Folding Wheelchair", "Lightweight aluminium frame, 18 inch seat.", 42_000, 8),
  ("First Aid Kit", "Workplace kit with 150 pieces.", 2_650, 75),
];

/// Inserts the demo catalog when no product exists yet. Returns how many
/// products were created.
pub async fn seed_products(products: &dyn ProductStore) -> Result<usize> {
  if !products.list().await?.is_empty() {
    tracing::info!("Catalog already populated, skipping seed.");
    return Ok(0);
  }

  for (name, description, price_cents, stock) in DEMO_CATALOG {
    let product = NewProduct {
      category_id: None,
      name: (*name).to_string(),
      description: Some((*description).to_string()),
      price_cents: *price_cents,
      stock: *stock,
      image_url: None,
    };
    let created = products.create(product).await?;
    tracing::debug!(product_id = %created.id, name = %created.name, "Seeded product.");
  }
  tracing::info!(count = DEMO_CATALOG.len(), "Demo catalog seeded.");
  Ok(DEMO_CATALOG.len())
}
