//! Moving-average crossover: long while the fast SMA is above the slow SMA.
//!
//! `preprocess` adds `sma_{fast}` and `sma_{slow}` columns to the shared
//! dataset, so strategies later in the run can reuse them. The score is the
//! spread in percent of the slow average. Attached factors are carried along
//! as extra columns and do not influence the signal.

use crate::components::{param_usize, ComponentError, FactorSet, Params, Strategy};
use crate::domain::{MarketFrame, Signal, SignalRow, SignalTable};
use crate::series;

use super::{factor_columns, row_values};

#[derive(Debug)]
pub struct MaCrossover {
    name: String,
    params: Params,
    factors: FactorSet,
    fast: usize,
    slow: usize,
}

impl MaCrossover {
    pub fn new(name: impl Into<String>, fast: usize, slow: usize) -> Result<Self, ComponentError> {
        let name = name.into();
        if fast == 0 || slow <= fast {
            return Err(ComponentError::InvalidParam {
                component: name,
                param: "slow".to_string(),
                reason: format!("need 0 < fast < slow, got fast={fast} slow={slow}"),
            });
        }
        let mut params = Params::new();
        params.insert("fast".into(), fast.into());
        params.insert("slow".into(), slow.into());
        Ok(Self {
            name,
            params,
            factors: FactorSet::new(),
            fast,
            slow,
        })
    }

    pub fn from_params(name: &str, params: &Params) -> Result<Self, ComponentError> {
        let mut strategy = Self::new(
            name,
            param_usize(params, "fast", 10),
            param_usize(params, "slow", 50),
        )?;
        strategy.params.extend(params.clone());
        Ok(strategy)
    }

    pub fn fast_column(&self) -> String {
        format!("sma_{}", self.fast)
    }

    pub fn slow_column(&self) -> String {
        format!("sma_{}", self.slow)
    }
}

impl Strategy for MaCrossover {
    fn name(&self) -> &str {
        &self.name
    }

    fn params(&self) -> &Params {
        &self.params
    }

    fn factors(&self) -> &FactorSet {
        &self.factors
    }

    fn factors_mut(&mut self) -> &mut FactorSet {
        &mut self.factors
    }

    fn preprocess(&self, mut data: MarketFrame) -> Result<MarketFrame, ComponentError> {
        let closes = data.field("close").unwrap_or_default();
        for (column, window) in [(self.fast_column(), self.fast), (self.slow_column(), self.slow)] {
            let values = data.map_per_symbol(&closes, |c| series::sma(c, window));
            data.insert_column(column, values)?;
        }
        Ok(data)
    }

    fn validate(&self, data: &MarketFrame) -> bool {
        if data.is_empty() {
            return false;
        }
        let required = [
            "close".to_string(),
            self.fast_column(),
            self.slow_column(),
        ];
        if !data.missing_fields(&required).is_empty() {
            return false;
        }
        data.symbol_ranges()
            .iter()
            .all(|(_, range)| range.len() >= self.slow)
            && self.factors.iter().all(|f| f.validate(data))
    }

    fn generate_signals(&self, data: &MarketFrame) -> Result<SignalTable, ComponentError> {
        let missing = |field: String| ComponentError::MissingField {
            component: self.name.clone(),
            field,
        };
        let fast = data
            .column(&self.fast_column())
            .ok_or_else(|| missing(self.fast_column()))?;
        let slow = data
            .column(&self.slow_column())
            .ok_or_else(|| missing(self.slow_column()))?;
        let columns = factor_columns(&self.factors, data)?;

        let mut table = SignalTable::new(self.required_factors());
        for (i, bar) in data.bars().iter().enumerate() {
            let (f, s) = (fast[i], slow[i]);
            if !(f.is_finite() && s.is_finite()) || s == 0.0 {
                continue;
            }
            let score = (f - s) / s * 100.0;
            table.push(SignalRow {
                symbol: bar.symbol.clone(),
                date: bar.date,
                signal: Signal::from_score(score, 0.0, 0.0),
                score,
                factors: row_values(&columns, i),
            })?;
        }
        Ok(table)
    }
}
