use std::path::Path;

use anyhow::anyhow;
use fasttext::FastText;

/// Country selector for the per-country classifier fleet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Country {
    Chile,
    Colombia,
    Mexico,
}

impl Country {
    pub const ALL: [Country; 3] = [Country::Chile, Country::Colombia, Country::Mexico];

    /// Exact-match parse of the wire code. Anything outside the fixed set is
    /// rejected by the caller with a soft error, not a panic.
    pub fn parse(code: &str) -> Option<Country> {
        match code {
            "CL" => Some(Country::Chile),
            "COL" => Some(Country::Colombia),
            "MX" => Some(Country::Mexico),
            _ => None,
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            Country::Chile => "CL",
            Country::Colombia => "COL",
            Country::Mexico => "MX",
        }
    }
}

/// One ranked candidate straight from the model, label still in its raw
/// `__label__<code>` form.
#[derive(Debug, Clone)]
pub struct ModelPrediction {
    pub label: String,
    pub confidence: f32,
}

/// Inference seam: the serving layer only needs ranked (label, confidence)
/// pairs, so tests can stand in for the fastText artifact.
pub trait Classifier {
    fn predict(&self, text: &str, k: usize) -> anyhow::Result<Vec<ModelPrediction>>;
}

pub struct FastTextModel {
    inner: FastText,
}

// The loaded model is plain heap state with no thread affinity; request
// handlers serialize access through a mutex in the serving state.
unsafe impl Send for FastTextModel {}

impl FastTextModel {
    pub fn load(path: &Path) -> anyhow::Result<FastTextModel> {
        let file = path
            .to_str()
            .ok_or_else(|| anyhow!("model path {} is not valid UTF-8", path.display()))?;
        let mut inner = FastText::new();
        inner
            .load_model(file)
            .map_err(|e| anyhow!("load fasttext model {}: {e}", path.display()))?;
        Ok(FastTextModel { inner })
    }
}

impl Classifier for FastTextModel {
    fn predict(&self, text: &str, k: usize) -> anyhow::Result<Vec<ModelPrediction>> {
        let ranked = self
            .inner
            .predict(text, k as i32, 0.0)
            .map_err(|e| anyhow!("fasttext predict: {e}"))?;
        Ok(ranked
            .into_iter()
            .map(|p| ModelPrediction {
                label: p.label,
                confidence: p.prob,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_the_fixed_country_set() {
        assert_eq!(Country::parse("CL"), Some(Country::Chile));
        assert_eq!(Country::parse("COL"), Some(Country::Colombia));
        assert_eq!(Country::parse("MX"), Some(Country::Mexico));
    }

    #[test]
    fn rejects_everything_else() {
        for code in ["XX", "cl", "Col", "MEX", "", " CL"] {
            assert_eq!(Country::parse(code), None, "{code:?} should not parse");
        }
    }

    #[test]
    fn codes_round_trip() {
        for country in Country::ALL {
            assert_eq!(Country::parse(country.code()), Some(country));
        }
    }
}
