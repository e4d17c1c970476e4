//! Factor score strategy: average the attached factors and threshold the mean.
//!
//! Rows where any factor is undefined (warmup) emit no signal.

use crate::components::{param_bool, param_f64, ComponentError, FactorSet, Params, Strategy};
use crate::domain::{MarketFrame, Signal, SignalRow, SignalTable};

use super::{factor_columns, row_values};

#[derive(Debug)]
pub struct FactorScore {
    name: String,
    params: Params,
    factors: FactorSet,
    long_threshold: f64,
    short_threshold: f64,
    latest_only: bool,
}

impl FactorScore {
    pub fn new(
        name: impl Into<String>,
        long_threshold: f64,
        short_threshold: f64,
    ) -> Result<Self, ComponentError> {
        let name = name.into();
        for (param, value) in [
            ("long_threshold", long_threshold),
            ("short_threshold", short_threshold),
        ] {
            if !value.is_finite() {
                return Err(ComponentError::InvalidParam {
                    component: name,
                    param: param.to_string(),
                    reason: format!("must be a finite number, got {value}"),
                });
            }
        }
        if short_threshold > long_threshold {
            return Err(ComponentError::InvalidParam {
                component: name,
                param: "short_threshold".to_string(),
                reason: format!("{short_threshold} is above long_threshold {long_threshold}"),
            });
        }
        let mut params = Params::new();
        params.insert("long_threshold".into(), long_threshold.into());
        params.insert("short_threshold".into(), short_threshold.into());
        Ok(Self {
            name,
            params,
            factors: FactorSet::new(),
            long_threshold,
            short_threshold,
            latest_only: false,
        })
    }

    pub fn from_params(name: &str, params: &Params) -> Result<Self, ComponentError> {
        let mut strategy = Self::new(
            name,
            param_f64(params, "long_threshold", 0.0),
            param_f64(params, "short_threshold", 0.0),
        )?;
        strategy.latest_only = param_bool(params, "latest_only", false);
        strategy.params.extend(params.clone());
        Ok(strategy)
    }

    /// Keep only each symbol's most recent signal.
    pub fn latest_only(mut self, latest_only: bool) -> Self {
        self.latest_only = latest_only;
        self.params.insert("latest_only".into(), latest_only.into());
        self
    }
}

impl Strategy for FactorScore {
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

    fn generate_signals(&self, data: &MarketFrame) -> Result<SignalTable, ComponentError> {
        let columns = factor_columns(&self.factors, data)?;
        let mut table = SignalTable::new(self.required_factors());

        for (i, bar) in data.bars().iter().enumerate() {
            let values = row_values(&columns, i);
            if values.is_empty() || values.iter().any(|v| !v.is_finite()) {
                continue;
            }
            let score = values.iter().sum::<f64>() / values.len() as f64;
            table.push(SignalRow {
                symbol: bar.symbol.clone(),
                date: bar.date,
                signal: Signal::from_score(score, self.long_threshold, self.short_threshold),
                score,
                factors: values,
            })?;
        }
        Ok(table)
    }

    fn validate(&self, data: &MarketFrame) -> bool {
        if data.is_empty() || self.factors.is_empty() {
            return false;
        }
        self.factors.iter().all(|f| f.validate(data))
    }

    fn postprocess(&self, signals: SignalTable) -> Result<SignalTable, ComponentError> {
        if self.latest_only {
            Ok(signals.latest_per_symbol())
        } else {
            Ok(signals)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::factors::{make_frame, Momentum};

    fn strategy() -> FactorScore {
        let mut s = FactorScore::new("score", 5.0, -5.0).unwrap();
        s.add_factor(Box::new(Momentum::new("mom", 1).unwrap()));
        s
    }

    #[test]
    fn thresholds_classify_mean_score() {
        let data = make_frame(&[("A", &[100.0, 110.0, 111.0, 100.0])]);
        let s = strategy();
        assert!(s.validate(&data));

        let table = s.generate_signals(&data).unwrap();
        // Warmup row has no signal.
        assert_eq!(table.len(), 3);
        let signals: Vec<Signal> = table.rows().iter().map(|r| r.signal).collect();
        assert_eq!(signals, vec![Signal::Long, Signal::Flat, Signal::Short]);
        assert_eq!(table.factor_names(), ["mom".to_string()]);
    }

    #[test]
    fn no_factors_fails_validation() {
        let data = make_frame(&[("A", &[1.0, 2.0])]);
        let s = FactorScore::new("score", 0.0, 0.0).unwrap();
        assert!(!s.validate(&data));
        assert!(!strategy().validate(&MarketFrame::default()));
    }

    #[test]
    fn latest_only_keeps_one_row_per_symbol() {
        let data = make_frame(&[("A", &[1.0, 2.0, 3.0]), ("B", &[3.0, 2.0, 1.0])]);
        let s = strategy().latest_only(true);
        let table = s.postprocess(s.generate_signals(&data).unwrap()).unwrap();

        assert_eq!(table.len(), 2);
        assert_eq!(table.rows()[0].symbol, "A");
        assert_eq!(table.rows()[0].signal, Signal::Long);
        assert_eq!(table.rows()[1].symbol, "B");
        assert_eq!(table.rows()[1].signal, Signal::Short);
    }

    #[test]
    fn non_finite_thresholds_are_rejected() {
        for (long, short) in [
            (f64::NAN, 0.0),
            (0.0, f64::NAN),
            (f64::INFINITY, 0.0),
            (0.0, f64::NEG_INFINITY),
        ] {
            match FactorScore::new("s", long, short) {
                Err(ComponentError::InvalidParam { reason, .. }) => {
                    assert!(reason.contains("finite"), "{reason}")
                }
                other => panic!("expected InvalidParam for ({long}, {short}), got {other:?}"),
            }
        }
    }

    #[test]
    fn inverted_thresholds_are_rejected() {
        assert!(FactorScore::new("s", -1.0, 1.0).is_err());
    }
}
