use crate::{
    core::XIndex,
    error::{SimvizError, SimvizResult},
    model::{Condition, Series},
    scale::ColorScale,
};

/// Reserved order sentinel: the band fills 100% of the element and ignores
/// level geometry.
pub const ORDER_FULL: f64 = 1.01;

/// Normalized output of evaluating one condition at one time index.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct PropertyTuple {
    pub order: f64,
    pub color: String,
    pub opacity: f64,
    pub overlay: Option<String>,
}

/// What one condition contributes to its element at index `x`.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub enum Evaluation {
    Tuples(Vec<PropertyTuple>),
    Visibility(bool),
    Skip,
}

/// A condition paired with its derived color scale, built exactly once at
/// element construction. Evaluation is a pure function of `(self, x)`.
#[derive(Clone, Debug, serde::Serialize)]
pub struct CompiledCondition {
    condition: Condition,
    scale: Option<ColorScale>,
    /// Fixed at construction from the first time step's shape; a condition's
    /// dimensionality must not change across the series.
    num_sections: usize,
}

impl CompiledCondition {
    pub fn compile(condition: Condition) -> SimvizResult<Self> {
        let scale = condition
            .scale_spec()
            .map(ColorScale::from_spec)
            .transpose()?;
        let num_sections = match &condition {
            Condition::EqualY(c) => c.data.first_section_count(),
            _ => 1,
        };
        Ok(Self {
            condition,
            scale,
            num_sections,
        })
    }

    pub fn condition(&self) -> &Condition {
        &self.condition
    }

    pub fn scale(&self) -> Option<&ColorScale> {
        self.scale.as_ref()
    }

    pub fn num_sections(&self) -> usize {
        self.num_sections
    }

    pub fn evaluate(&self, x: XIndex) -> SimvizResult<Evaluation> {
        match &self.condition {
            Condition::Background(c) => {
                let d = series_at(&c.data, x)?;
                let scale = self.require_scale()?;
                Ok(Evaluation::Tuples(vec![PropertyTuple {
                    order: ORDER_FULL,
                    color: scale.color(d).to_string(),
                    opacity: c.meta.opacity,
                    overlay: c.meta.overlay.clone(),
                }]))
            }
            Condition::LevelStatic(c) => {
                let d = series_at(&c.data, x)?;
                Ok(Evaluation::Tuples(vec![PropertyTuple {
                    order: level_order(d, c.min_height, c.max_height)?,
                    color: c.color.clone(),
                    opacity: c.meta.opacity,
                    overlay: c.meta.overlay.clone(),
                }]))
            }
            Condition::LevelDynamic(c) => {
                let d = series_at(&c.data, x)?;
                let color_val = series_at(&c.data_dynamic, x)?;
                let scale = self.require_scale()?;
                Ok(Evaluation::Tuples(vec![PropertyTuple {
                    order: level_order(d, c.min_height, c.max_height)?,
                    color: scale.color(color_val).to_string(),
                    opacity: c.meta.opacity,
                    overlay: c.meta.overlay.clone(),
                }]))
            }
            Condition::Logical(c) => {
                let d = series_at(&c.data, x)?;
                let color = if d != 0.0 {
                    c.true_color.clone()
                } else {
                    c.false_color.clone()
                };
                Ok(Evaluation::Tuples(vec![PropertyTuple {
                    order: ORDER_FULL,
                    color,
                    opacity: c.meta.opacity,
                    overlay: c.meta.overlay.clone(),
                }]))
            }
            Condition::ZonalY(c) => {
                let zones = rows_at(&c.data, x, "zonal_y.data")?;
                let colors = rows_at(&c.data_dynamic, x, "zonal_y.data_dynamic")?;
                if zones.len() != colors.len() {
                    return Err(SimvizError::evaluation(
                        "zonal_y: level and color zone counts diverge",
                    ));
                }
                let scale = self.require_scale()?;
                let tuples = zones
                    .iter()
                    .zip(colors)
                    .map(|(&level, &color_val)| {
                        Ok(PropertyTuple {
                            order: level_order(level, c.min_height, c.max_height)?,
                            color: scale.color(color_val).to_string(),
                            opacity: c.meta.opacity,
                            overlay: c.meta.overlay.clone(),
                        })
                    })
                    .collect::<SimvizResult<Vec<_>>>()?;
                Ok(Evaluation::Tuples(tuples))
            }
            Condition::EqualY(c) => {
                let scale = self.require_scale()?;
                let n = self.num_sections;
                let tuples = match &c.data {
                    Series::Scalar(v) => {
                        let d = series_at(v, x)?;
                        vec![PropertyTuple {
                            order: 1.0,
                            color: scale.color(d).to_string(),
                            opacity: c.meta.opacity,
                            overlay: c.meta.overlay.clone(),
                        }]
                    }
                    Series::PerSection(v) => {
                        let row = rows_at(v, x, "equal_y.data")?;
                        if row.len() != n {
                            return Err(SimvizError::evaluation(format!(
                                "equal_y: section count changed from {n} to {}",
                                row.len()
                            )));
                        }
                        row.iter()
                            .enumerate()
                            .map(|(j, &d)| PropertyTuple {
                                order: (j + 1) as f64 / n as f64,
                                color: scale.color(d).to_string(),
                                opacity: c.meta.opacity,
                                overlay: c.meta.overlay.clone(),
                            })
                            .collect()
                    }
                };
                Ok(Evaluation::Tuples(tuples))
            }
            Condition::ShowHide(c) => {
                let d = series_at(&c.data, x)?;
                Ok(Evaluation::Visibility(d != 0.0))
            }
            // Heatmap data is consumed structurally by the heatmap element;
            // the remaining kinds have no per-tick visual contribution.
            Condition::Heatmap(_)
            | Condition::Info(_)
            | Condition::TabularInfo(_)
            | Condition::ColorScale(_) => Ok(Evaluation::Skip),
            Condition::Unknown => {
                tracing::debug!("skipping condition of unknown type");
                Ok(Evaluation::Skip)
            }
        }
    }

    fn require_scale(&self) -> SimvizResult<&ColorScale> {
        self.scale.as_ref().ok_or_else(|| {
            SimvizError::evaluation(format!(
                "condition '{}' has no color scale",
                self.condition.kind()
            ))
        })
    }
}

fn series_at(data: &[f64], x: XIndex) -> SimvizResult<f64> {
    data.get(x.0).copied().ok_or_else(|| {
        SimvizError::evaluation(format!("index {} out of bounds (len {})", x.0, data.len()))
    })
}

fn rows_at<'a>(data: &'a [Vec<f64>], x: XIndex, what: &str) -> SimvizResult<&'a [f64]> {
    data.get(x.0).map(Vec::as_slice).ok_or_else(|| {
        SimvizError::evaluation(format!(
            "{what}: index {} out of bounds (len {})",
            x.0,
            data.len()
        ))
    })
}

/// Normalized level order, clamped to `[0, 1]`; out-of-range data saturates.
fn level_order(d: f64, min_height: f64, max_height: f64) -> SimvizResult<f64> {
    let span = max_height - min_height;
    if span <= 0.0 {
        return Err(SimvizError::evaluation(
            "max_height must exceed min_height",
        ));
    }
    Ok(((d - min_height) / span).clamp(0.0, 1.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{
        ConditionMeta, LevelStaticCondition, LogicalCondition, ScaleSpec, ShowHideCondition,
        ZonalYCondition,
    };

    fn compile(condition: Condition) -> CompiledCondition {
        CompiledCondition::compile(condition).unwrap()
    }

    fn level_static() -> CompiledCondition {
        compile(Condition::LevelStatic(LevelStaticCondition {
            meta: ConditionMeta::default(),
            data: vec![0.0, 5.0, 10.0],
            color: "#fff".to_string(),
            min_height: 0.0,
            max_height: 10.0,
        }))
    }

    #[test]
    fn level_static_midpoint() {
        let eval = level_static().evaluate(XIndex(1)).unwrap();
        let Evaluation::Tuples(tuples) = eval else {
            panic!("expected tuples");
        };
        assert_eq!(tuples.len(), 1);
        assert_eq!(tuples[0].order, 0.5);
        assert_eq!(tuples[0].color, "#fff");
        assert_eq!(tuples[0].opacity, 1.0);
        assert_eq!(tuples[0].overlay, None);
    }

    #[test]
    fn level_order_saturates() {
        let c = compile(Condition::LevelStatic(LevelStaticCondition {
            meta: ConditionMeta::default(),
            data: vec![-5.0, 25.0],
            color: "#fff".to_string(),
            min_height: 0.0,
            max_height: 10.0,
        }));
        let Evaluation::Tuples(low) = c.evaluate(XIndex(0)).unwrap() else {
            panic!()
        };
        let Evaluation::Tuples(high) = c.evaluate(XIndex(1)).unwrap() else {
            panic!()
        };
        assert_eq!(low[0].order, 0.0);
        assert_eq!(high[0].order, 1.0);
    }

    #[test]
    fn zero_height_span_is_an_evaluation_error() {
        let c = compile(Condition::LevelStatic(LevelStaticCondition {
            meta: ConditionMeta::default(),
            data: vec![1.0],
            color: "#fff".to_string(),
            min_height: 5.0,
            max_height: 5.0,
        }));
        assert!(matches!(
            c.evaluate(XIndex(0)),
            Err(SimvizError::Evaluation(_))
        ));
    }

    #[test]
    fn logical_picks_color_by_truth() {
        let c = compile(Condition::Logical(LogicalCondition {
            meta: ConditionMeta::default(),
            data: vec![0.0, 1.0, 0.0],
            true_color: "#0f0".to_string(),
            false_color: "#f00".to_string(),
        }));
        let Evaluation::Tuples(on) = c.evaluate(XIndex(1)).unwrap() else {
            panic!()
        };
        assert_eq!(on[0].order, ORDER_FULL);
        assert_eq!(on[0].color, "#0f0");

        let Evaluation::Tuples(off) = c.evaluate(XIndex(0)).unwrap() else {
            panic!()
        };
        assert_eq!(off[0].color, "#f00");
    }

    #[test]
    fn zonal_emits_one_tuple_per_zone() {
        let c = compile(Condition::ZonalY(ZonalYCondition {
            meta: ConditionMeta::default(),
            data: vec![vec![2.0, 8.0]],
            data_dynamic: vec![vec![0.0, 90.0]],
            scale: ScaleSpec {
                palette: vec!["cold".to_string(), "hot".to_string()],
                levels: vec![0.0, 100.0],
            },
            min_height: 0.0,
            max_height: 10.0,
        }));
        let Evaluation::Tuples(tuples) = c.evaluate(XIndex(0)).unwrap() else {
            panic!()
        };
        assert_eq!(tuples.len(), 2);
        assert_eq!(tuples[0].order, 0.2);
        assert_eq!(tuples[0].color, "cold");
        assert_eq!(tuples[1].order, 0.8);
        assert_eq!(tuples[1].color, "hot");
    }

    #[test]
    fn equal_y_orders_sections() {
        let json = r#"{
            "type": "equal_y",
            "data": [[10.0, 40.0, 90.0]],
            "palette": ["a", "b", "c"],
            "levels": [0.0, 90.0]
        }"#;
        let c = compile(serde_json::from_str(json).unwrap());
        assert_eq!(c.num_sections(), 3);
        let Evaluation::Tuples(tuples) = c.evaluate(XIndex(0)).unwrap() else {
            panic!()
        };
        let orders: Vec<f64> = tuples.iter().map(|t| t.order).collect();
        assert_eq!(orders, vec![1.0 / 3.0, 2.0 / 3.0, 1.0]);
        assert_eq!(tuples[0].color, "a");
        assert_eq!(tuples[2].color, "c");
    }

    #[test]
    fn show_hide_is_a_visibility_scalar() {
        let c = compile(Condition::ShowHide(ShowHideCondition {
            meta: ConditionMeta::default(),
            data: vec![0.0, 2.0],
        }));
        assert_eq!(c.evaluate(XIndex(0)).unwrap(), Evaluation::Visibility(false));
        assert_eq!(c.evaluate(XIndex(1)).unwrap(), Evaluation::Visibility(true));
    }

    #[test]
    fn evaluation_is_deterministic() {
        let c = level_static();
        assert_eq!(c.evaluate(XIndex(2)).unwrap(), c.evaluate(XIndex(2)).unwrap());
    }

    #[test]
    fn unknown_condition_evaluates_to_skip() {
        let c = compile(Condition::Unknown);
        assert_eq!(c.evaluate(XIndex(0)).unwrap(), Evaluation::Skip);
    }
}
