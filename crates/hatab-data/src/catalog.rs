//! Per-domain defaults: column rules, measures, KPI formulas and levels.

use hatab_core::{
  aggregate::{AggregationSpec, Kpi, Measure},
  expr::{Expr, col, lit, when},
  kpi::columns::{FORECAST_HOUR_OFFSET, RECORDS, dc, factory, store},
  level::{Dimension, Domain},
  rules::ColumnRule,
  source::DEFAULT_UNIT_COST_SAR,
  table::RawTable,
};

/// Formula parameters that come from configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Params {
  pub unit_cost_sar:        f64,
  /// Keep only rows with this horizon, when the table has one.
  pub forecast_hour_offset: Option<i64>,
}

impl Default for Params {
  fn default() -> Self {
    Self {
      unit_cost_sar:        DEFAULT_UNIT_COST_SAR,
      forecast_hour_offset: Some(1),
    }
  }
}

fn dimension_rules(dims: &[Dimension]) -> Vec<ColumnRule> {
  dims
    .iter()
    .map(|d| match d {
      Dimension::Date => ColumnRule::date(d.column()).key(),
      Dimension::Hour => ColumnRule::integer(d.column()).min(0.0).key(),
      _ => ColumnRule::text(d.column()).key(),
    })
    .collect()
}

fn quantity_rules(columns: &[&str]) -> impl Iterator<Item = ColumnRule> {
  columns.iter().map(|c| ColumnRule::number(*c).min(0.0))
}

/// The rule set applied to `domain`'s source table unless configuration
/// replaces it.
pub fn default_rules(domain: Domain) -> Vec<ColumnRule> {
  use Dimension::*;
  match domain {
    Domain::Factory => {
      let mut rules = dimension_rules(&[FactoryId, LineId, Date, Hour]);
      rules.extend(quantity_rules(&[
        factory::PROD_ACTUAL_QTY,
        factory::PROD_PLAN_QTY,
        factory::DEFECT_QTY,
        factory::SCRAP_QTY,
        factory::BATCH_SIZE_UNITS,
      ]));
      rules
    }
    Domain::Dc => {
      let mut rules = dimension_rules(&[DcId, SkuId, Date, Hour]);
      rules.extend(quantity_rules(&[dc::OPENING_STOCK_UNITS, dc::PREDICTED_DEMAND]));
      rules.push(ColumnRule::integer(FORECAST_HOUR_OFFSET).optional());
      rules
    }
    Domain::Store => {
      let mut rules = dimension_rules(&[StoreId, SkuId, Date, Hour]);
      rules.extend(quantity_rules(&[
        store::ON_SHELF_UNITS,
        store::PLANOGRAM_CAPACITY_UNITS,
        store::PREDICTED_DEMAND,
      ]));
      rules.push(ColumnRule::integer(FORECAST_HOUR_OFFSET).optional());
      rules
    }
  }
}

fn percent(numerator: &str, denominator: &str) -> Expr {
  col(numerator).safe_div(col(denominator)) * lit(100.0)
}

fn summed(columns: &[&str]) -> impl Iterator<Item = Measure> {
  columns.iter().map(|c| Measure::sum(*c, col(*c)))
}

/// Horizon filter, only when `table` carries a horizon column.
fn horizon_filter(table: &RawTable, params: &Params) -> Option<Expr> {
  let offset = params.forecast_hour_offset?;
  table
    .has_column(FORECAST_HOUR_OFFSET)
    .then(|| col(FORECAST_HOUR_OFFSET).equals(lit(offset as f64)))
}

/// Measures, KPI formulas and levels for `domain`.
///
/// `table` is the cleaned source; it decides whether the horizon filter
/// applies.
pub fn aggregation_spec(domain: Domain, table: &RawTable, params: &Params) -> AggregationSpec {
  let levels = domain.levels().to_vec();
  let cost = lit(params.unit_cost_sar);

  match domain {
    Domain::Factory => {
      use factory::*;
      let mut measures: Vec<Measure> = summed(&[
        PROD_ACTUAL_QTY,
        PROD_PLAN_QTY,
        DEFECT_QTY,
        SCRAP_QTY,
        BATCH_SIZE_UNITS,
      ])
      .collect();
      measures.push(Measure::count(RECORDS));

      AggregationSpec {
        levels,
        filter: None,
        measures,
        kpis: vec![
          Kpi::new(LINE_UTILIZATION_PCT, percent(PROD_ACTUAL_QTY, BATCH_SIZE_UNITS)),
          Kpi::new(PRODUCTION_ADHERENCE_PCT, percent(PROD_ACTUAL_QTY, PROD_PLAN_QTY)),
          Kpi::new(DEFECT_RATE_PCT, percent(DEFECT_QTY, PROD_ACTUAL_QTY)),
          Kpi::new(WASTE_UNITS, col(SCRAP_QTY)),
          Kpi::new(WASTE_SAR, col(WASTE_UNITS) * cost),
        ],
      }
    }

    Domain::Dc => {
      use dc::*;
      let stock = || col(OPENING_STOCK_UNITS);
      let demand = || col(PREDICTED_DEMAND);
      let mut measures: Vec<Measure> = summed(&[OPENING_STOCK_UNITS, PREDICTED_DEMAND]).collect();
      measures.extend([
        Measure::sum(SERVICED_UNITS, stock().min(demand())),
        Measure::sum(EXCESS_UNITS, (stock() - demand()).clip_zero()),
        Measure::sum(BACKORDER_UNITS, when(stock().le(lit(0.0)), demand(), lit(0.0))),
        Measure::count(RECORDS),
      ]);

      AggregationSpec {
        levels,
        filter: horizon_filter(table, params),
        measures,
        kpis: vec![
          Kpi::new(SERVICE_LEVEL_PCT, percent(SERVICED_UNITS, PREDICTED_DEMAND)),
          Kpi::new(WASTE_PCT, percent(EXCESS_UNITS, OPENING_STOCK_UNITS)),
          Kpi::new(DAYS_COVER, stock().safe_div(demand())),
        ],
      }
    }

    Domain::Store => {
      use store::*;
      let on_shelf = || col(ON_SHELF_UNITS);
      let mut measures: Vec<Measure> =
        summed(&[ON_SHELF_UNITS, PLANOGRAM_CAPACITY_UNITS, PREDICTED_DEMAND]).collect();
      measures.extend([
        Measure::sum(STOCKOUT_INCIDENTS, when(on_shelf().le(lit(0.0)), lit(1.0), lit(0.0))),
        Measure::sum(WASTE_UNITS, (on_shelf() - col(PLANOGRAM_CAPACITY_UNITS)).clip_zero()),
        Measure::count(RECORDS),
      ]);

      AggregationSpec {
        levels,
        filter: horizon_filter(table, params),
        measures,
        kpis: vec![
          Kpi::new(
            ON_SHELF_AVAILABILITY_PCT,
            percent(ON_SHELF_UNITS, PLANOGRAM_CAPACITY_UNITS),
          ),
          Kpi::new(WASTE_SAR, col(WASTE_UNITS) * cost),
        ],
      }
    }
  }
}
