//! Criterion benchmarks for the garden fill engine.
//!
//! Run with: `cargo bench`

use criterion::{criterion_group, criterion_main, Criterion};
use garden_engine::collision::CircleGeometry;
use garden_engine::fill::{fill, fill_garden};
use garden_engine::garden::Garden;
use garden_engine::growth::NutrientModel;
use garden_engine::inventory::Inventory;
use garden_engine::types::{FillConfig, FillParams};

/// Three species, two radii, a garden with room for a few dozen plants.
const MIXED_BED_JSON: &str = r#"{
  "width": 16.0,
  "height": 12.0,
  "catalog": [
    {
      "item": {
        "name": "azalea",
        "species": "rhododendron",
        "radius": 1.0,
        "nutrients": { "r": 1.0, "g": -0.3, "b": -0.2 }
      },
      "quantity": 12
    },
    {
      "item": {
        "name": "cranesbill",
        "species": "geranium",
        "radius": 1.0,
        "nutrients": { "r": -0.3, "g": 1.0, "b": -0.2 }
      },
      "quantity": 12
    },
    {
      "item": {
        "name": "wax begonia",
        "species": "begonia",
        "radius": 1.5,
        "nutrients": { "r": -0.2, "g": -0.2, "b": 1.2 }
      },
      "quantity": 8
    }
  ],
  "config": {
    "max_turns": 40,
    "min_turns": 8,
    "finegrained_turns": 80,
    "workers": 4
  }
}"#;

fn bench_mixed_bed(c: &mut Criterion) {
    let params: FillParams = serde_json::from_str(MIXED_BED_JSON).unwrap();
    c.bench_function("fill_mixed_bed", |b| {
        b.iter(|| fill(&params));
    });
}

fn bench_mixed_bed_serial(c: &mut Criterion) {
    let json = MIXED_BED_JSON.replace("\"workers\": 4", "\"workers\": 1");
    let params: FillParams = serde_json::from_str(&json).unwrap();
    c.bench_function("fill_mixed_bed_serial", |b| {
        b.iter(|| fill(&params));
    });
}

fn bench_without_pattern_grouping(c: &mut Criterion) {
    let json = MIXED_BED_JSON.replace(
        "\"workers\": 4",
        "\"workers\": 4,\n    \"pattern_grouping\": false",
    );
    let params: FillParams = serde_json::from_str(&json).unwrap();
    c.bench_function("fill_mixed_bed_no_grouping", |b| {
        b.iter(|| fill(&params));
    });
}

/// Seeded random stock of nine varieties, default search settings.
fn bench_random_stock(c: &mut Criterion) {
    let config = FillConfig {
        max_turns: 40,
        min_turns: 8,
        finegrained_turns: 80,
        ..FillConfig::default()
    };
    let geometry = CircleGeometry::new(config.tolerance);
    let growth = NutrientModel::default();
    c.bench_function("fill_random_stock_seed_7", |b| {
        b.iter(|| {
            let garden = Garden::new(14.0, 14.0).unwrap();
            let inventory = Inventory::random(7, 10);
            fill_garden(garden, inventory, &config, &geometry, &growth)
        });
    });
}

criterion_group!(
    benches,
    bench_mixed_bed,
    bench_mixed_bed_serial,
    bench_without_pattern_grouping,
    bench_random_stock
);
criterion_main!(benches);
