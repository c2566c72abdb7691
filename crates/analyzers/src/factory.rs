use crate::Analyzer;
use crate::error::AnalyzerError;
use crate::price_target::PriceTargetAnalyzer;
use crate::risk_profile::RiskAnalyzer;
use crate::technicals::TechnicalsAnalyzer;
use configuration::Config;
use core_types::{AnalyzerId, PriceHistory};

/// Creates a new analyzer instance based on the provided ID and configuration.
///
/// `benchmark` is only consulted by the risk analyzer, for beta.
pub fn create_analyzer(
    id: AnalyzerId,
    config: &Config,
    benchmark: Option<&PriceHistory>,
) -> Result<Box<dyn Analyzer>, AnalyzerError> {
    match id {
        AnalyzerId::Technicals => Ok(Box::new(TechnicalsAnalyzer::new(
            config.technicals.clone(),
        )?)),
        AnalyzerId::Risk => {
            let analyzer = RiskAnalyzer::new(config.risk.clone());
            Ok(Box::new(match benchmark {
                Some(history) => analyzer.with_benchmark(history.clone()),
                None => analyzer,
            }))
        }
        AnalyzerId::PriceTarget => Ok(Box::new(PriceTargetAnalyzer::new(
            config.price_target.clone(),
        )?)),
    }
}

/// Builds every analyzer enabled in `config.aggregation.analyzers`, in order.
pub fn create_analyzers(
    config: &Config,
    benchmark: Option<&PriceHistory>,
) -> Result<Vec<Box<dyn Analyzer>>, AnalyzerError> {
    config
        .aggregation
        .analyzers
        .iter()
        .map(|id| create_analyzer(*id, config, benchmark))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_builds_all_three_in_order() {
        let analyzers = create_analyzers(&Config::default(), None).unwrap();
        let names: Vec<_> = analyzers.iter().map(|a| a.name().to_string()).collect();
        assert_eq!(
            names,
            vec!["Technical Analysis", "Risk Manager", "Price Target Analysis"]
        );
    }

    #[test]
    fn names_match_analyzer_ids() {
        for id in AnalyzerId::ALL {
            let analyzer = create_analyzer(id, &Config::default(), None).unwrap();
            assert_eq!(analyzer.name(), id.display_name());
        }
    }
}
