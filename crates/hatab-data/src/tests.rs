//! Integration tests for `DataLayer` over in-memory CSV fixtures.

use std::fs;

use hatab_core::{
  level::{Dimension, Domain, Filter, Level},
  quality,
  rules::ColumnRule,
  service,
  source::KpiSource,
  table::Scalar,
};

use crate::{DataConfig, DataLayer, Error, SourceConfig, catalog, loader};

const FACTORY_CSV: &str = "\
factory_id,line_id,timestamp,prod_actual_qty,prod_plan_qty,defect_qty,scrap_qty,batch_size_units
F_DUBAI_1,Bread_Line_01,2025-01-01 06:00:00,90,100,2,3,100
F_DUBAI_1,Bread_Line_01,2025-01-01 07:00:00,95,100,1,2,100
F_DUBAI_1,Bread_Line_01,2025-01-02 06:00:00,80,100,4,-1,100
F_DUBAI_1,Cake_Line_02,2025-01-01 06:00:00,50,60,0,1,80
F_RIYADH_NORTH,Bread_Line_01,2025-01-01 06:00:00,40,50,1,0,60
,Bread_Line_01,2025-01-01 06:00:00,10,10,0,0,10
";

const DC_CSV: &str = "\
dc_id,sku_id,date,hour,forecast_hour_offset,opening_stock_units,predicted_demand
DC_JEDDAH,SKU_101,2025-01-01,0,1,100,-5
DC_JEDDAH,SKU_101,2025-01-01,1,1,40,60
DC_JEDDAH,SKU_101,2025-01-01,1,2,999,1
DC_JEDDAH,SKU_102,2025-01-01,0,1,0,30
DC_RIYADH,SKU_101,2025-01-01,0,1,50,0
DC_RIYADH,SKU_101,2025-01-01,1,1,abc,10
";

const STORE_CSV: &str = "\
store_id,sku_id,date,hour,on_shelf_units,planogram_capacity_units,predicted_demand
ST_RIYADH_MALL,SKU_101,2025-01-01,0,20,30,25
ST_RIYADH_MALL,SKU_101,2025-01-01,1,0,30,10
ST_RIYADH_MALL,SKU_102,2025-01-01,0,45,40,20
ST_JEDDAH_CORNICHE,SKU_101,2025-01-01,0,30,30,30
";

fn fixtures() -> Vec<(Domain, &'static str)> {
  vec![
    (Domain::Factory, FACTORY_CSV),
    (Domain::Dc, DC_CSV),
    (Domain::Store, STORE_CSV),
  ]
}

fn layer_with(config: &DataConfig) -> crate::Result<DataLayer> {
  let mut raw = Vec::new();
  for (domain, csv) in fixtures() {
    raw.push((domain, loader::read_csv(domain.as_str(), csv.as_bytes())?));
  }
  DataLayer::from_raw_tables(raw, config)
}

fn layer() -> DataLayer { layer_with(&DataConfig::default()).expect("fixture layer") }

fn close(a: f64, b: f64) -> bool { (a - b).abs() <= 1e-9 * b.abs().max(1.0) }

// ─── Cleaning ────────────────────────────────────────────────────────────────

#[test]
fn negative_demand_is_clipped_and_counted() {
  let layer = layer();
  let report = layer.quality_report(Domain::Dc).unwrap();
  assert_eq!(report.invalid_values["predicted_demand"], 1);
  assert_eq!(report.invalid_values["opening_stock_units"], 1);

  let hourly = layer.table(Level::DcSkuDateHour).unwrap();
  let rows = hourly.filter(
    &Filter::new()
      .with(Dimension::DcId, "DC_JEDDAH")
      .with(Dimension::SkuId, "SKU_101")
      .with(Dimension::Hour, "0"),
  );
  assert_eq!(rows.len(), 1);
  assert_eq!(hourly.value(rows[0], "predicted_demand"), Some(0.0));
  assert_eq!(hourly.dimension(rows[0], Dimension::Date), Some("2025-01-01"));

  let sku = service::dc_kpi_rows(&layer, Some("DC_JEDDAH"), Some("SKU_101"));
  assert_eq!(sku.len(), 1);
  // 0 + 60; the horizon-2 row is not counted.
  assert_eq!(sku[0].metrics.predicted_demand, 60.0);
  assert_eq!(sku[0].metrics.opening_stock_units, 140.0);
}

#[test]
fn rows_missing_a_key_are_dropped() {
  let report = layer().quality_report(Domain::Factory).cloned().unwrap();
  assert_eq!(report.original_rows, 6);
  assert_eq!(report.final_rows, 5);
  assert_eq!(report.rows_dropped, 1);
  assert_eq!(report.missing_values["factory_id"], 1);
  assert_eq!(report.invalid_values["scrap_qty"], 1);
}

#[test]
fn quality_scores_are_bounded() {
  let layer = layer();
  let reports = layer.quality_reports();
  assert_eq!(reports.len(), 3);
  for report in reports.values() {
    assert!((0.0..=1.0).contains(&report.quality_score), "{}", report.table);
  }
  assert_eq!(reports[&Domain::Store].quality_score, 1.0);
}

#[test]
fn cleaned_quantities_are_never_negative() {
  for (domain, csv) in fixtures() {
    let raw = loader::read_csv(domain.as_str(), csv.as_bytes()).unwrap();
    let rules = catalog::default_rules(domain);
    let (cleaned, _) = quality::clean(&raw, &rules).unwrap();
    for rule in rules.iter().filter(|r| r.minimum.is_some()) {
      let Some(cells) = cleaned.column(&rule.column) else { continue };
      for cell in cells {
        if let Some(v) = cell.as_f64() {
          assert!(v >= 0.0, "{} in {domain}", rule.column);
        }
      }
    }
  }
}

// ─── Aggregation ─────────────────────────────────────────────────────────────

#[test]
fn aggregated_values_are_never_negative() {
  let layer = layer();
  for level in Level::ALL {
    let table = layer.table(level).unwrap();
    for row in &table.rows {
      assert!(row.values.iter().all(|v| *v >= 0.0), "{level}: {row:?}");
    }
  }
}

#[test]
fn every_adjacent_level_pair_is_consistent() {
  let layer = layer();
  for domain in Domain::ALL {
    for pair in domain.levels().windows(2) {
      let fine = layer.table(pair[0]).unwrap();
      let coarse = layer.table(pair[1]).unwrap();
      assert!(!coarse.rows.is_empty());

      for row in &coarse.rows {
        let filter = coarse
          .level
          .dimensions()
          .iter()
          .zip(&row.key)
          .fold(Filter::new(), |f, (d, v)| f.with(*d, v.clone()));
        let members = fine.filter(&filter);

        for column in fine.additive_columns() {
          let summed: f64 = members.iter().filter_map(|r| fine.value(r, column)).sum();
          let want = coarse.value(row, column).unwrap();
          assert!(
            close(summed, want),
            "{} {:?} {column}: {summed} != {want}",
            coarse.level,
            row.key
          );
        }

        let rolled = fine.rollup(&members).unwrap();

        for (column, (got, want)) in coarse.columns.iter().zip(rolled.values.iter().zip(&row.values)) {
          assert!(
            close(*got, *want),
            "{} {:?} {column}: {got} != {want}",
            coarse.level,
            row.key
          );
        }
      }
    }
  }
}

#[test]
fn get_returns_matching_rows_only() {
  let layer = layer();
  let jeddah = layer.get(Level::DcSku, &Filter::new().with(Dimension::DcId, "DC_JEDDAH"));
  assert_eq!(jeddah.len(), 2);
  assert!(jeddah.iter().all(|r| r.key[0] == "DC_JEDDAH"));

  let hour = layer.get(
    Level::DcSkuDateHour,
    &Filter::new().with(Dimension::DcId, "DC_RIYADH").with(Dimension::Hour, "00"),
  );
  assert_eq!(hour.len(), 1);

  assert!(layer
    .get(Level::DcSku, &Filter::new().with(Dimension::DcId, "DC_DAMMAM"))
    .is_empty());

  let raw = vec![(Domain::Dc, loader::read_csv("dc", DC_CSV.as_bytes()).unwrap())];
  let dc_only = DataLayer::from_raw_tables(raw, &DataConfig::default()).unwrap();
  assert!(dc_only.get(Level::Store, &Filter::new()).is_empty());
  assert_eq!(dc_only.get(Level::Dc, &Filter::new()).len(), 2);
}

#[test]
fn keys_are_unique_per_table() {
  let layer = layer();
  for level in layer.levels() {
    let table = layer.table(level).unwrap();
    let mut keys: Vec<&Vec<String>> = table.rows.iter().map(|r| &r.key).collect();
    keys.sort();
    keys.dedup();
    assert_eq!(keys.len(), table.rows.len(), "{level}");
  }
}

#[test]
fn days_cover_is_defined_for_zero_demand() {
  let layer = layer();
  for level in Domain::Dc.levels() {
    let table = layer.table(*level).unwrap();
    for row in &table.rows {
      assert!(table.value(row, "days_cover").unwrap().is_finite());
    }
  }

  let cover = service::dc_days_cover(&layer, Some("DC_RIYADH"), None);
  assert_eq!(cover.len(), 1);
  // 50 units against 0 + 10 demand.
  assert_eq!(cover[0].days_cover, 5.0);

  let hourly = layer.table(Level::DcSkuDateHour).unwrap();
  let zero = hourly
    .rows
    .iter()
    .find(|r| r.key[0] == "DC_RIYADH" && r.key[3] == "0")
    .unwrap();
  assert_eq!(hourly.value(zero, "days_cover"), Some(0.0));
}

#[test]
fn build_is_deterministic() {
  assert_eq!(layer(), layer());
}

#[test]
fn horizon_filter_can_be_disabled() {
  let config = DataConfig { forecast_hour_offset: None, ..DataConfig::default() };
  let layer = layer_with(&config).unwrap();
  let rows = service::dc_kpi_rows(&layer, Some("DC_JEDDAH"), Some("SKU_101"));
  assert_eq!(rows[0].metrics.opening_stock_units, 1139.0);
}

// ─── Services ────────────────────────────────────────────────────────────────

#[test]
fn factory_filters_are_specific() {
  let layer = layer();

  let line = service::factory_kpi_rows(&layer, Some("F_DUBAI_1"), Some("Bread_Line_01"));
  assert_eq!(line.len(), 1);
  assert_eq!(line[0].factory_id, "F_DUBAI_1");
  assert_eq!(line[0].line_id.as_deref(), Some("Bread_Line_01"));
  assert_eq!(line[0].metrics.prod_actual_qty, 265.0);

  let all = service::factory_kpi_rows(&layer, None, None);
  let ids: Vec<&str> = all.iter().map(|r| r.factory_id.as_str()).collect();
  assert_eq!(ids, ["F_DUBAI_1", "F_RIYADH_NORTH"]);

  let kpis = service::factory_kpis(&layer, Some("F_DUBAI_1"), Some("Bread_Line_01"));
  assert_eq!(kpis.production_adherence, 88.3);
  assert_eq!(kpis.waste_units, 5);
  assert_eq!(kpis.waste_sar, 50.0);
}

#[test]
fn dc_summary() {
  let kpis = service::dc_kpis(&layer(), Some("DC_JEDDAH"), None);
  // serviced 0 + 40 + 0 of demand 0 + 60 + 30
  assert_eq!(kpis.service_level, 44.4);
  // excess 100 of stock 140
  assert_eq!(kpis.waste_pct, 71.4);
  assert_eq!(kpis.backorder_units, 30);
  assert_eq!(kpis.days_cover, 1.56);
}

#[test]
fn store_summary_and_shelf_performance() {
  let layer = layer();
  let kpis = service::store_kpis(&layer, Some("ST_RIYADH_MALL"), None);
  assert_eq!(kpis.on_shelf_availability, 65.0);
  assert_eq!(kpis.stockout_incidents, 1);
  assert_eq!(kpis.waste_units, 5);
  assert_eq!(kpis.waste_sar, 50.0);

  let shelf = service::store_shelf_performance(&layer, Some("ST_RIYADH_MALL"));
  let skus: Vec<&str> = shelf.iter().map(|s| s.sku_id.as_str()).collect();
  assert_eq!(skus, ["SKU_101", "SKU_102"]);
  assert_eq!(shelf[1].on_shelf_availability, 112.5);
}

#[test]
fn global_kpis_cover_the_network() {
  let layer = layer();
  let g = service::global_kpis(&layer, layer.unit_cost_sar());
  // |355 - 410| / 410
  assert_eq!(g.forecast_accuracy, 86.6);
  // (6 scrap + 150 excess + 5 shelf overflow) × 10
  assert_eq!(g.waste_cost, 1610.0);
  // mean of 40.0 and 95 / 130
  assert_eq!(g.service_level, 56.5);
  assert_eq!(g.on_shelf_availability, 73.1);
}

#[test]
fn node_health_lists_every_node() {
  let nodes = service::node_health(&layer());
  let names: Vec<&str> = nodes.iter().map(|n| n.name.as_str()).collect();
  assert_eq!(names, [
    "Dubai 1 Factory",
    "Riyadh North Factory",
    "Jeddah DC",
    "Riyadh DC",
    "Riyadh Mall Store",
    "Jeddah Corniche Store",
  ]);
}

// ─── Errors ──────────────────────────────────────────────────────────────────

#[test]
fn missing_required_column_is_fatal() {
  let raw = loader::read_csv("factory", "factory_id,line_id,date,hour\n".as_bytes()).unwrap();
  let err = DataLayer::from_raw_tables([(Domain::Factory, raw)], &DataConfig::default())
    .unwrap_err();
  assert!(matches!(
    err,
    Error::Core(hatab_core::Error::MissingColumn { ref column, .. }) if column == "prod_actual_qty"
  ));
}

#[test]
fn formula_over_an_absent_column_is_fatal() {
  let mut config = DataConfig::default();
  let mut rules = catalog::default_rules(Domain::Factory);
  for rule in &mut rules {
    if rule.column == "defect_qty" {
      *rule = ColumnRule::number("defect_qty").optional();
    }
  }
  config.factory.rules = Some(rules);

  let csv = "factory_id,line_id,date,hour,prod_actual_qty,prod_plan_qty,scrap_qty,batch_size_units\n";
  let raw = loader::read_csv("factory", csv.as_bytes()).unwrap();
  let err = DataLayer::from_raw_tables([(Domain::Factory, raw)], &config).unwrap_err();
  assert!(matches!(err, Error::Core(hatab_core::Error::UnknownColumn { .. })));
}

#[test]
fn build_reads_files_from_the_data_dir() {
  let dir = std::env::temp_dir().join(format!("hatab-data-{}", std::process::id()));
  fs::create_dir_all(&dir).unwrap();
  let config = DataConfig::default().with_data_dir(&dir);
  for (domain, csv) in fixtures() {
    fs::write(config.path(domain), csv).unwrap();
  }

  let built = DataLayer::build(&config).unwrap();
  assert_eq!(built, layer());

  let missing = DataConfig {
    store: SourceConfig::new("nope.csv"),
    ..config
  };
  assert!(matches!(DataLayer::build(&missing), Err(Error::Io { .. })));

  fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn unparseable_timestamps_lose_their_rows() {
  let csv = "factory_id,line_id,timestamp,prod_actual_qty,prod_plan_qty,defect_qty,scrap_qty,batch_size_units\n\
             F_A,L1,later,1,1,0,0,1\n\
             F_A,L1,2025-01-01 00:00:00,1,1,0,0,1\n";
  let raw = loader::read_csv("factory", csv.as_bytes()).unwrap();
  assert_eq!(raw.rows[0][raw.column_index("date").unwrap()], Scalar::Missing);
  let layer = DataLayer::from_raw_tables([(Domain::Factory, raw)], &DataConfig::default()).unwrap();
  assert_eq!(layer.quality_report(Domain::Factory).unwrap().rows_dropped, 1);
  assert!(layer.table(Level::Dc).is_none());
}
